// SPDX-License-Identifier: MPL-2.0

//! Precomputed per-resolution pixel index lists and neighbor topologies
//!
//! Pure function of the active capture mode; rebuilt only on mode change.
//! Neighbor ids use the fixed 3x3 layout (interior pixels only, no
//! wraparound; -1 marks an off-grid neighbor):
//!
//! ```text
//! A B C
//! D X E
//! F G H
//! ```

use serde::{Deserialize, Serialize};

use crate::capture::ModeInfo;

/// Neighbor topology class used by the local filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Left/right neighbors (D, E)
    Horizontal2,
    /// Top/bottom neighbors (B, G)
    Vertical2,
    /// Axis neighbors (B, D, E, G)
    #[default]
    Four,
    /// Full 3x3 ring (A..H)
    Eight,
}

/// Linear index plus (col, row) of one depth pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelCoord {
    pub index: usize,
    pub col: u32,
    pub row: u32,
}

/// Precomputed index tables for one depth resolution
#[derive(Debug, Clone, Default)]
pub struct IndexTables {
    pub depth_width: u32,
    pub depth_height: u32,
    /// All depth-pixel linear indices, raster order
    pub depths_1d: Vec<usize>,
    /// Same list minus the outer 1-pixel border
    pub depths_1d_no_borders: Vec<usize>,
    /// (index, col, row) triples for width/height-based filters
    pub coords: Vec<PixelCoord>,
    /// Per-pixel (D, E) neighbor ids
    pub neighbours_2h: Vec<[i32; 2]>,
    /// Per-pixel (B, G) neighbor ids
    pub neighbours_2v: Vec<[i32; 2]>,
    /// Per-pixel (B, D, E, G) neighbor ids
    pub neighbours_4: Vec<[i32; 4]>,
    /// Per-pixel (A, B, C, D, E, F, G, H) neighbor ids
    pub neighbours_8: Vec<[i32; 8]>,
}

impl IndexTables {
    /// Build all tables for the mode's depth resolution
    pub fn build(mode: &ModeInfo) -> Self {
        let width = mode.depth_width() as usize;
        let height = mode.depth_height() as usize;
        let size = width * height;

        let mut tables = Self {
            depth_width: mode.depth_width(),
            depth_height: mode.depth_height(),
            depths_1d: (0..size).collect(),
            depths_1d_no_borders: Vec::with_capacity(size.saturating_sub(2 * (width + height))),
            coords: Vec::with_capacity(size),
            neighbours_2h: Vec::with_capacity(size),
            neighbours_2v: Vec::with_capacity(size),
            neighbours_4: Vec::with_capacity(size),
            neighbours_8: Vec::with_capacity(size),
        };

        let mut id = 0usize;
        for row in 0..height {
            for col in 0..width {
                tables.coords.push(PixelCoord {
                    index: id,
                    col: col as u32,
                    row: row as u32,
                });

                let not_left = col > 0;
                let not_right = col < width - 1;
                let not_top = row > 0;
                let not_bottom = row < height - 1;

                let mut a = -1i32;
                let mut b = -1i32;
                let mut c = -1i32;
                let mut d = -1i32;
                let mut e = -1i32;
                let mut f = -1i32;
                let mut g = -1i32;
                let mut h = -1i32;

                if not_left {
                    d = (id - 1) as i32;
                    if not_top {
                        a = (id - width - 1) as i32;
                    }
                    if not_bottom {
                        f = (id + width - 1) as i32;
                    }
                }
                if not_right {
                    e = (id + 1) as i32;
                    if not_top {
                        c = (id - width + 1) as i32;
                    }
                    if not_bottom {
                        h = (id + width + 1) as i32;
                    }
                }
                if not_top {
                    b = (id - width) as i32;
                }
                if not_bottom {
                    g = (id + width) as i32;
                }

                tables.neighbours_2h.push([d, e]);
                tables.neighbours_2v.push([b, g]);
                tables.neighbours_4.push([b, d, e, g]);
                tables.neighbours_8.push([a, b, c, d, e, f, g, h]);

                if not_left && not_right && not_top && not_bottom {
                    tables.depths_1d_no_borders.push(id);
                }

                id += 1;
            }
        }

        tables
    }

    /// Number of depth pixels covered by the tables
    pub fn depth_size(&self) -> usize {
        self.depths_1d.len()
    }

    /// Neighbor ids of `id` for the given connectivity class
    pub fn neighbours(&self, connectivity: Connectivity, id: usize) -> &[i32] {
        match connectivity {
            Connectivity::Horizontal2 => &self.neighbours_2h[id],
            Connectivity::Vertical2 => &self.neighbours_2v[id],
            Connectivity::Four => &self.neighbours_4[id],
            Connectivity::Eight => &self.neighbours_8[id],
        }
    }
}
