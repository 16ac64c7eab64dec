//! The drawing surface the backdrop renders into.
//!
//! A surface fills the viewport, sits behind every other widget and never
//! takes input. It is a cheap shared handle: the renderer writes cells into
//! it, the host draws it as a widget.

use std::cell::RefCell;
use std::rc::Rc;

use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};
use stardrift_core::Rgb;

/// One rendered cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceCell {
    pub glyph: char,
    pub fg: Rgb,
    /// `None` keeps whatever is underneath.
    pub bg: Option<Rgb>,
}

#[derive(Debug, Default)]
struct SurfaceInner {
    initialized: bool,
    columns: u16,
    rows: u16,
    cells: Vec<Option<SurfaceCell>>,
}

/// Shared handle to a drawing surface.
#[derive(Debug, Clone, Default)]
pub struct DrawingSurface {
    inner: Rc<RefCell<SurfaceInner>>,
}

impl DrawingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a backdrop currently owns this surface.
    pub fn is_initialized(&self) -> bool {
        self.inner.borrow().initialized
    }

    /// Mark the surface as initialized, unless it already is.
    ///
    /// The returned claim clears the mark when dropped.
    pub fn claim(&self) -> Option<SurfaceClaim> {
        let mut inner = self.inner.borrow_mut();
        if inner.initialized {
            return None;
        }
        inner.initialized = true;
        Some(SurfaceClaim {
            surface: self.clone(),
        })
    }

    /// Output size in cells.
    pub fn size(&self) -> (u16, u16) {
        let inner = self.inner.borrow();
        (inner.columns, inner.rows)
    }

    /// Reallocate for a new size; all cells become transparent.
    pub fn resize(&self, columns: u16, rows: u16) {
        let mut inner = self.inner.borrow_mut();
        inner.columns = columns;
        inner.rows = rows;
        inner.cells.clear();
        inner.cells.resize(columns as usize * rows as usize, None);
    }

    /// Replace every cell. `cells` is row-major and must match the size.
    pub fn write(&self, cells: impl IntoIterator<Item = Option<SurfaceCell>>) {
        let mut inner = self.inner.borrow_mut();
        let len = inner.cells.len();
        for (slot, cell) in inner.cells.iter_mut().zip(cells.into_iter().take(len)) {
            *slot = cell;
        }
    }

    pub fn cell(&self, column: u16, row: u16) -> Option<SurfaceCell> {
        let inner = self.inner.borrow();
        if column >= inner.columns || row >= inner.rows {
            return None;
        }
        inner.cells[row as usize * inner.columns as usize + column as usize]
    }

    /// Number of non-transparent cells.
    pub fn lit_cells(&self) -> usize {
        self.inner.borrow().cells.iter().flatten().count()
    }

    /// Drop all cell storage.
    pub fn release(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.columns = 0;
        inner.rows = 0;
        inner.cells = Vec::new();
    }
}

/// Exclusive ownership of a surface's initialized mark.
#[derive(Debug)]
pub struct SurfaceClaim {
    surface: DrawingSurface,
}

impl Drop for SurfaceClaim {
    fn drop(&mut self) {
        self.surface.inner.borrow_mut().initialized = false;
    }
}

impl Widget for &DrawingSurface {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = self.inner.borrow();
        let columns = inner.columns.min(area.width);
        let rows = inner.rows.min(area.height);
        for row in 0..rows {
            for column in 0..columns {
                let index = row as usize * inner.columns as usize + column as usize;
                let Some(cell) = inner.cells[index] else {
                    continue;
                };
                if let Some(target) = buf.cell_mut((area.x + column, area.y + row)) {
                    target.set_char(cell.glyph).set_fg(cell.fg.into());
                    if let Some(bg) = cell.bg {
                        target.set_bg(bg.into());
                    }
                }
            }
        }
    }
}
