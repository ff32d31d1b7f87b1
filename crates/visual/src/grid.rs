//! Grid geometry used to sample screenshots cell by cell
//!
//! Cells are `block_width × block_height` rectangles placed every
//! `block + 1` pixels, so one row and one column of pixels between
//! neighbouring cells is never sampled. The grid does not tile the image.

use serde::{Deserialize, Serialize};

/// Number of cells a screenshot is divided into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub columns: u32,
    pub rows: u32,
}

impl Grid {
    /// Grid used for production/staging comparison
    pub const COMPARISON: Grid = Grid { columns: 60, rows: 80 };

    /// Coarser grid drawn by the cell visualization helper
    pub const DEBUG: Grid = Grid { columns: 30, rows: 40 };

    pub fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Lay this grid over an image of the given size
    pub fn geometry(&self, width: u32, height: u32) -> GridGeometry {
        GridGeometry {
            width,
            height,
            block_width: block_size(width, self.columns),
            block_height: block_size(height, self.rows),
        }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::COMPARISON
    }
}

/// `ceil(dimension / count)`, never less than one pixel
fn block_size(dimension: u32, count: u32) -> u32 {
    let count = count.max(1);
    dimension.saturating_sub(1) / count + 1
}

/// A grid laid over a concrete image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub width: u32,
    pub height: u32,
    pub block_width: u32,
    pub block_height: u32,
}

impl GridGeometry {
    fn stride_x(&self) -> usize {
        self.block_width as usize + 1
    }

    fn stride_y(&self) -> usize {
        self.block_height as usize + 1
    }

    /// Cells in row-major order, including edge cells that extend past
    /// the image bounds.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).step_by(self.stride_y()).flat_map(move |y| {
            (0..self.width).step_by(self.stride_x()).map(move |x| Cell {
                x,
                y,
                width: self.block_width,
                height: self.block_height,
            })
        })
    }

    /// Number of cells `cells()` yields
    pub fn cell_count(&self) -> usize {
        let across = (self.width as usize).div_ceil(self.stride_x());
        let down = (self.height as usize).div_ceil(self.stride_y());
        across * down
    }
}

/// One sampled rectangle of a screenshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Cell {
    /// Whether every pixel of the cell lies inside a `width × height` image
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}
