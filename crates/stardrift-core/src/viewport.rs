//! Terminal viewport and pointer coordinates.

/// Width of a terminal cell relative to its height.
pub const CELL_ASPECT: f32 = 0.5;

/// Size of the drawing area in terminal cells, plus sub-cell sampling density.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub columns: u16,
    pub rows: u16,
    /// Samples per cell along each axis.
    pub pixel_ratio: u8,
}

impl Viewport {
    pub fn new(columns: u16, rows: u16, pixel_ratio: u8) -> Self {
        Self {
            columns,
            rows,
            pixel_ratio: pixel_ratio.max(1),
        }
    }

    /// Same pixel ratio, new size.
    pub fn resized(self, columns: u16, rows: u16) -> Self {
        Self {
            columns,
            rows,
            ..self
        }
    }

    /// Physical aspect ratio (width / height), corrected for tall cells.
    pub fn aspect(&self) -> f32 {
        self.columns.max(1) as f32 * CELL_ASPECT / self.rows.max(1) as f32
    }

    /// Number of cells.
    pub fn area(&self) -> usize {
        self.columns as usize * self.rows as usize
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(80, 24, 2)
    }
}

/// Pointer position normalized to `[-1, 1]` on both axes, y pointing up.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
}

impl PointerState {
    /// Normalize a cell position within `viewport`.
    pub fn from_cell(column: u16, row: u16, viewport: Viewport) -> Self {
        let width = viewport.columns.max(1) as f32;
        let height = viewport.rows.max(1) as f32;
        Self {
            x: ((column as f32 / width) * 2.0 - 1.0).clamp(-1.0, 1.0),
            y: (-(row as f32 / height) * 2.0 + 1.0).clamp(-1.0, 1.0),
        }
    }
}
