//! # scanline-coverage
//!
//! Per-scanline anti-aliased coverage storage for polygon rasterization.
//!
//! A shape processor walks a polygon one scanline at a time and feeds the
//! horizontal extent of each edge crossing into a coverage line. The line
//! merges overlapping contributions, converts them to pixel runs, and hands
//! the runs to a paint callback.
//!
//! - Float boundaries with exact trapezoidal coverage
//! - Integer pixel runs with fuzzy boolean composition
//! - Packed-bit supersampling with population-count readback
//! - Delta accumulation for the single-shape fast path
//!
//! ## Architecture
//!
//! 1. **Accumulate**: `add_boundary` on a [`FloatBoundaryLine`],
//!    [`BitSuperSampleLine`] or [`AlphaAccumulatorLine`]
//! 2. **Flatten**: sort and merge into non-overlapping runs
//! 3. **Resample**: `copy_from_*` into an [`IntegerRunLine`]
//! 4. **Compose**: optional `booleen` of two integer lines
//! 5. **Raster**: each clipped run goes to a [`RasterInRun`] worker
//!
//! Every line is single-owner scratch storage for one scanline: fill it,
//! consume it, `reset` it and reuse its allocation for the next row.

// Foundation
pub mod basics;
pub mod raster;

// Coverage lines
pub mod alpha_line;
pub mod bit_line;
pub mod float_line;
pub mod int_line;

// Composition
pub mod scanline_boolean_algebra;

pub use alpha_line::{AlphaAccumulatorLine, AlphaStep};
pub use bit_line::BitSuperSampleLine;
pub use float_line::{FloatBoundary, FloatBoundaryLine, FloatRun};
pub use int_line::{IntBoundary, IntRun, IntegerRunLine};
pub use raster::{mask_worker, CoverageMask, RasterInRun, RasterInfo};
pub use scanline_boolean_algebra::BooleanOp;
