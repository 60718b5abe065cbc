// RGB888 -> packed 16-bit colour via per-channel lookup tables.
// Destination word layout (GRB555 + intensity bit):
//   bits 11-15 green, 6-10 red, 1-5 blue, bit 0 always set.
// Tables are built once per decoder from the brightness setting.

const GREEN_SHIFT: u32 = 11;
const RED_SHIFT: u32 = 6;
const BLUE_SHIFT: u32 = 1;
const INTENSITY: u16 = 1;

pub struct ColorLookup {
    r: [u16; 256],
    g: [u16; 256],
    b: [u16; 256],
}

impl ColorLookup {
    /// `brightness` is a percentage, 1-100.
    pub fn build(brightness: u8) -> Self {
        let pct = brightness.min(100) as u32;
        let mut r = [0u16; 256];
        let mut g = [0u16; 256];
        let mut b = [0u16; 256];
        for c in 0..256u32 {
            // 0..=31
            let scaled = (c * 32 * pct / 100) >> 8;
            r[c as usize] = ((scaled << RED_SHIFT) as u16) | INTENSITY;
            g[c as usize] = ((scaled << GREEN_SHIFT) as u16) | INTENSITY;
            b[c as usize] = ((scaled << BLUE_SHIFT) as u16) | INTENSITY;
        }
        Self { r, g, b }
    }

    #[inline]
    pub fn lookup(&self, r: u8, g: u8, b: u8) -> u16 {
        self.r[r as usize] | self.g[g as usize] | self.b[b as usize]
    }
}

/// Split a packed colour back into 5-bit (r, g, b).
#[inline]
pub const fn unpack(color: u16) -> (u8, u8, u8) {
    (
        ((color >> RED_SHIFT) & 0x1F) as u8,
        ((color >> GREEN_SHIFT) & 0x1F) as u8,
        ((color >> BLUE_SHIFT) & 0x1F) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_brightness_extremes() {
        let lut = ColorLookup::build(100);
        assert_eq!(lut.lookup(0, 0, 0), 0x0001);
        assert_eq!(lut.lookup(255, 255, 255), 0xFFFF);
        assert_eq!(lut.lookup(255, 0, 0), (31 << 6) | 1);
        assert_eq!(lut.lookup(0, 255, 0), (31 << 11) | 1);
        assert_eq!(lut.lookup(0, 0, 255), (31 << 1) | 1);
    }

    #[test]
    fn brightness_scales_channels() {
        let lut = ColorLookup::build(50);
        // 255 * 32 * 50 / 100 = 4080, >> 8 = 15
        assert_eq!(unpack(lut.lookup(255, 255, 255)), (15, 15, 15));
        // 128 * 32 = 4096, >> 8 = 16
        assert_eq!(unpack(ColorLookup::build(100).lookup(128, 8, 7)), (16, 1, 0));
    }

    #[test]
    fn unpack_ignores_intensity_bit() {
        let lut = ColorLookup::build(100);
        assert_eq!(unpack(lut.lookup(16, 64, 200)), (2, 8, 25));
    }
}
