//! Least-resistance growth on a square grid, rendered as a heat map.
//!
//! - [`grid`]: the density field, positions and directions.
//! - [`model`]: the walker, its configuration and run statistics.
//! - [`palette`]: the "hot" colour map.
//! - [`imgdata`]: turning a grid into a PNG heat map.

pub mod grid;
pub mod imgdata;
pub mod model;
pub mod palette;
