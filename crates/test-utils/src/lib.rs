//! Fixtures and helpers for the tiler test suites.
//!
//! - `generators`: deterministic pixel buffers and in-memory GeoTIFF files
//! - `fixtures`: well-known bounds, points and raster shapes
//! - `paths`: scratch directories and `{z}/{x}/{y}` tree listings
//!
//! Pulled in as a dev-dependency:
//!
//! ```ignore
//! use test_utils::{create_world_geotiff, fixtures, list_tile_files};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Asserts `|left - right| <= epsilon` after widening both sides to `f64`.
///
/// ```ignore
/// assert_approx_eq!(156543.0339, 156543.03392804062, 1e-3);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (l, r, eps) = ($left as f64, $right as f64, $epsilon as f64);
        let delta = (l - r).abs();
        assert!(
            delta <= eps,
            "assertion failed: {} is not within {} of {} (delta {})",
            l,
            eps,
            r,
            delta
        );
    }};
}

/// Component-wise [`assert_approx_eq!`] on `(x, y)` pairs.
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($x1:expr, $y1:expr), ($x2:expr, $y2:expr), $epsilon:expr) => {{
        $crate::assert_approx_eq!($x1, $x2, $epsilon);
        $crate::assert_approx_eq!($y1, $y2, $epsilon);
    }};
}
