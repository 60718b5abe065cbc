// Placement of the decoded image on the destination surface.
// Offsets are fixed once per image; anything falling outside the canvas is
// cropped at emission time.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasGeometry {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl CanvasGeometry {
    /// Centre an image of `width` x `height` on the canvas when `centering`
    /// is set and the image fits along that axis; otherwise top-left.
    pub fn new(
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
        centering: bool,
    ) -> Self {
        let (offset_x, offset_y) = if centering {
            (
                centre(width, canvas_width),
                centre(height, canvas_height),
            )
        } else {
            (0, 0)
        };
        Self {
            canvas_width,
            canvas_height,
            offset_x,
            offset_y,
        }
    }

    /// Canvas y of image row `row`, if that row lands on the canvas.
    #[inline]
    pub fn target_row(&self, row: u32) -> Option<u32> {
        self.offset_y
            .checked_add(row)
            .filter(|&y| y < self.canvas_height)
    }

    /// Canvas x of image column `col`, if that column lands on the canvas.
    #[inline]
    pub fn target_col(&self, col: u32) -> Option<u32> {
        self.offset_x
            .checked_add(col)
            .filter(|&x| x < self.canvas_width)
    }
}

#[inline]
fn centre(len: u32, canvas: u32) -> u32 {
    if len <= canvas { (canvas - len) >> 1 } else { 0 }
}
