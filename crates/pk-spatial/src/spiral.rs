//! Outward square-spiral ordering of grid-cell offsets.
//!
//! ```text
//!  radius 3 (x right, y up):   4 3 2
//!                              5 0 1
//!                              6 7 8
//! ```
//!
//! Offset `k` is visited before every offset in a farther Chebyshev ring, so
//! a search that stops at its first hit never skips a nearer cell.

/// The first `radius²` offsets of the spiral around `(0, 0)`.
pub fn spiral_coords(radius: u32) -> Vec<(i32, i32)> {
    let n = radius as usize * radius as usize;
    let mut coords = Vec::with_capacity(n);
    let (mut x, mut y) = (0i32, 0i32);
    let (mut dx, mut dy) = (0i32, -1i32);

    for _ in 0..n {
        coords.push((x, y));
        if x == y || (x < 0 && x == -y) || (x > 0 && x == 1 - y) {
            let t = dx;
            dx = -dy;
            dy = t;
        }
        x += dx;
        y += dy;
    }
    coords
}

/// Memoised spiral.  Grows to the largest radius requested and serves every
/// smaller radius as a prefix.
#[derive(Default)]
pub struct SpiralCache {
    coords: Vec<(i32, i32)>,
    radius: u32,
}

impl SpiralCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `radius²` offsets for `radius`.
    pub fn coords(&mut self, radius: u32) -> &[(i32, i32)] {
        if radius > self.radius {
            self.coords = spiral_coords(radius);
            self.radius = radius;
        }
        &self.coords[..radius as usize * radius as usize]
    }

    pub fn cached_radius(&self) -> u32 {
        self.radius
    }
}
