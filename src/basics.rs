//! Foundation constants and numeric helpers shared by every line type.
//!
//! The tolerances below are tuning knobs rather than contracts: they decide
//! when two float positions are "the same" boundary and when a coverage value
//! is small enough to count as empty.

// ============================================================================
// Tolerances
// ============================================================================

/// Two float boundary positions closer than this are treated as coincident.
pub const FLOAT_EPSILON: f64 = 1e-6;

/// Distance from an integer below which a float run end counts as
/// pixel-aligned when resampling to integer runs.
pub const COPY_TOLERANCE: f64 = 1e-5;

/// Tolerance used when merging neighbouring clamped runs in the threshold
/// filters of the float line.
pub const MERGE_EPSILON: f64 = 1e-5;

/// Coverage magnitude below which an accumulated alpha sum is considered empty.
pub const RASTER_EPSILON: f64 = 1e-6;

/// Largest pixel coordinate magnitude integer runs are built for. Leaves room
/// for the `x + 1` of a one-pixel run without overflowing `i32`.
pub const PIXEL_LIMIT: f64 = (i32::MAX - 1) as f64;

// ============================================================================
// Rounding
// ============================================================================

/// Floor of a double as a signed integer, saturating at the `i32` range.
/// NaN maps to 0.
#[inline]
pub fn ifloor(v: f64) -> i32 {
    v.floor() as i32
}

/// Ceiling of a double as a signed integer, saturating like [`ifloor`].
#[inline]
pub fn iceil(v: f64) -> i32 {
    v.ceil() as i32
}

// ============================================================================
// Run arithmetic
// ============================================================================

/// Value at `at` of the linear ramp going from `vst` at `st` to `ven` at `en`.
#[inline]
pub fn value_at(at: f64, st: f64, en: f64, vst: f64, ven: f64) -> f64 {
    if en <= st {
        return vst;
    }
    (vst * (en - at) + ven * (at - st)) / (en - st)
}

/// Integer-position flavour of [`value_at`], used by integer runs.
#[inline]
pub fn value_at_i(at: i32, st: i32, en: i32, vst: f32, ven: f32) -> f32 {
    if en <= st {
        return vst;
    }
    (vst * (en - at) as f32 + ven * (at - st) as f32) / (en - st) as f32
}

/// Area under the linear ramp `vst -> ven` over `[st, en]`.
#[inline]
pub fn trapezoid_area(st: f64, en: f64, vst: f64, ven: f64) -> f64 {
    0.5 * (vst + ven) * (en - st)
}

/// Position where the ramp `vst -> ven` over `[st, en]` crosses `threshold`.
///
/// Callers guarantee `vst != ven`.
#[inline]
pub fn crossing(st: f64, en: f64, vst: f64, ven: f64, threshold: f64) -> f64 {
    st + (threshold - vst) * (en - st) / (ven - vst)
}

// ============================================================================
// Tests
// ============================================================================
