//! Delta-accumulating coverage line.
//!
//! The single-shape fast path. Each boundary contributes a coverage step:
//! a ramp from `sval` to `eval` across `[spos, epos]`, held at its final
//! height to the right. The step is stored as a handful of per-pixel deltas
//! whose prefix sum is the exact pixel-averaged coverage, so insertion is
//! O(1) amortized and no merging is needed before painting.

use crate::basics::RASTER_EPSILON;
use crate::raster::{RasterInRun, RasterInfo};

/// Largest position magnitude a step is built for. Pixel indices and
/// fractional parts stay exact in `f64` below it.
pub const POSITION_LIMIT: f64 = (1u64 << 52) as f64;

/// Coverage change applied at pixel `x` and everything right of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaStep {
    pub x: i32,
    pub delta: f64,
}

/// Delta accumulator over pixels `[min, max)`.
#[derive(Debug, Clone)]
pub struct AlphaAccumulatorLine {
    min: i32,
    max: i32,
    cur_min: i32,
    cur_max: i32,
    steps: Vec<AlphaStep>,
    before: AlphaStep,
    after: AlphaStep,
}

impl AlphaAccumulatorLine {
    pub fn new(min: i32, max: i32) -> Self {
        let max = max.max(min.saturating_add(1));
        Self {
            min,
            max,
            cur_min: max,
            cur_max: min,
            steps: Vec::new(),
            before: AlphaStep { x: min.saturating_sub(1), delta: 0.0 },
            after: AlphaStep { x: max.saturating_add(1), delta: 0.0 },
        }
    }

    /// Clear steps and carried coverage, keeping the allocation.
    pub fn reset(&mut self) {
        self.steps.clear();
        self.cur_min = self.max;
        self.cur_max = self.min;
        self.before.delta = 0.0;
        self.after.delta = 0.0;
    }

    #[inline]
    pub fn steps(&self) -> &[AlphaStep] {
        &self.steps
    }

    /// Coverage carried in from the left of the line.
    #[inline]
    pub fn before(&self) -> &AlphaStep {
        &self.before
    }

    /// Coverage that went out past the right end of the line.
    #[inline]
    pub fn after(&self) -> &AlphaStep {
        &self.after
    }

    /// Range of pixels holding steps. Empty when `hi < lo`.
    #[inline]
    pub fn dirty_range(&self) -> (i32, i32) {
        (self.cur_min, self.cur_max)
    }

    #[inline]
    pub fn bounds(&self) -> (i32, i32) {
        (self.min, self.max)
    }

    // Pixel indices are computed in i64 so that positions far outside the
    // line cannot overflow; everything outside [min, max] is folded.
    fn push_step(&mut self, x: i64, delta: f64) {
        if delta == 0.0 {
            return;
        }
        if x < self.min as i64 {
            self.before.delta += delta;
        } else if x > self.max as i64 {
            self.after.delta += delta;
        } else {
            let x = x as i32;
            self.cur_min = self.cur_min.min(x);
            self.cur_max = self.cur_max.max(x);
            self.steps.push(AlphaStep { x, delta });
        }
    }

    /// Push `delta` at every pixel of `[x0, x1)`.
    fn push_constant(&mut self, x0: i64, x1: i64, delta: f64) {
        if x1 <= x0 || delta == 0.0 {
            return;
        }
        let lo = x0.max(self.min as i64);
        let hi = x1.min(self.max as i64 + 1);
        if x0 < lo {
            self.before.delta += delta * (lo.min(x1) - x0) as f64;
        }
        if hi < x1 {
            self.after.delta += delta * (x1 - hi.max(x0)) as f64;
        }
        if lo < hi {
            let (lo, hi) = (lo as i32, (hi - 1) as i32);
            self.steps.reserve((hi - lo) as usize + 1);
            self.steps.extend((lo..=hi).map(|x| AlphaStep { x, delta }));
            self.cur_min = self.cur_min.min(lo);
            self.cur_max = self.cur_max.max(hi);
        }
    }

    /// Add a coverage step ramping from `sval` at `spos` to `eval` at `epos`.
    ///
    /// `slope` is the per-pixel coverage increase inside the ramp, normally
    /// `(eval - sval) / (epos - spos)`. A zero-width step is kept; reversed
    /// or NaN intervals are dropped. Positions beyond `±POSITION_LIMIT`
    /// (infinities included) are pulled back to it.
    pub fn add_boundary(&mut self, spos: f64, sval: f64, epos: f64, eval: f64, slope: f64) {
        let h = eval - sval;
        if h == 0.0 {
            return;
        }
        if !(spos <= epos) {
            log::trace!("dropping reversed alpha step [{spos}, {epos}]");
            return;
        }
        let spos = spos.clamp(-POSITION_LIMIT, POSITION_LIMIT);
        let epos = epos.clamp(-POSITION_LIMIT, POSITION_LIMIT);
        let len = epos - spos;
        let st = spos.floor() as i64;
        let en = epos.floor() as i64;

        if st == en {
            let c_st = h * (0.5 * len + (st + 1) as f64 - epos);
            self.push_step(st, c_st);
            self.push_step(st + 1, h - c_st);
        } else if en == st + 1 {
            let d_st = (st + 1) as f64 - spos;
            let d_en = en as f64 - spos;
            let c_st = 0.5 * h * d_st * d_st / len;
            let c_en = h * ((len * len - d_en * d_en) / (2.0 * len) + (en + 1) as f64 - epos);
            self.push_step(st, c_st);
            self.push_step(en, c_en - c_st);
            self.push_step(en + 1, h - c_en);
        } else {
            let d_st = (st + 1) as f64 - spos;
            let d_en = en as f64 - spos;
            let c_st = 0.5 * h * d_st * d_st / len;
            let c_next = h * ((st + 1) as f64 + 0.5 - spos) / len;
            let c_en = h * ((len * len - d_en * d_en) / (2.0 * len) + (en + 1) as f64 - epos);
            let c_last = c_next + (en - st - 2) as f64 * slope;
            self.push_step(st, c_st);
            self.push_step(st + 1, c_next - c_st);
            self.push_constant(st + 2, en, slope);
            self.push_step(en, c_en - c_last);
            self.push_step(en + 1, h - c_en);
        }
    }

    /// Sort the steps by pixel position.
    ///
    /// Steps at the same pixel are ordered by delta, so closing (negative)
    /// steps come before opening ones. Order within a pixel never changes the
    /// prefix sums, only the layout of `steps()`.
    pub fn flatten(&mut self) {
        self.steps
            .sort_by(|a, b| a.x.cmp(&b.x).then(a.delta.total_cmp(&b.delta)));
    }

    /// Paint the accumulated coverage inside `[dest.start_pix, dest.end_pix)`.
    ///
    /// The running sum starts from the carried-in coverage; a constant span
    /// is handed to `worker` each time it is non-zero and the position
    /// advances. Must be called after [`flatten`](Self::flatten).
    pub fn raster<B, C, W>(&self, dest: &mut RasterInfo<'_, B>, color: &C, mut worker: W)
    where
        B: ?Sized,
        C: ?Sized,
        W: RasterInRun<B, C>,
    {
        let lo = if self.before.delta.abs() > RASTER_EPSILON {
            self.min
        } else {
            self.cur_min
        };
        let n_min = lo.max(dest.start_pix);
        let n_max = self.max.min(dest.end_pix);
        if n_max <= n_min {
            return;
        }

        let mut sum = self.before.delta;
        let first = self.steps.partition_point(|s| s.x <= n_min);
        sum += self.steps[..first].iter().map(|s| s.delta).sum::<f64>();

        let mut cur = n_min;
        for s in &self.steps[first..] {
            let x = s.x.min(n_max);
            if x > cur {
                if sum.abs() > RASTER_EPSILON {
                    worker.raster_run(dest, color, cur, sum as f32, x, sum as f32);
                }
                cur = x;
            }
            if x >= n_max {
                break;
            }
            sum += s.delta;
        }
        if cur < n_max && sum.abs() > RASTER_EPSILON {
            worker.raster_run(dest, color, cur, sum as f32, n_max, sum as f32);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
