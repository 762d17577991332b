//! Integer-boundary coverage line.
//!
//! Runs start and end on pixel boundaries, which is what the painter
//! consumes. This is the line that converts the other representations to
//! pixels (`copy_from_float`, `copy_from_bits`), combines two shapes
//! (`booleen`) and drives the paint callback (`raster`).

use crate::basics::{ifloor, trapezoid_area, value_at_i, COPY_TOLERANCE, PIXEL_LIMIT};
use crate::bit_line::BitSuperSampleLine;
use crate::float_line::{FloatBoundaryLine, FloatRun};
use crate::raster::{RasterInRun, RasterInfo};
use crate::scanline_boolean_algebra::{combine_span, BooleanOp};

/// Tolerance for treating two neighbouring runs as one linear piece.
const RUN_MERGE_EPSILON: f32 = 1e-5;

/// Set-bit count of every nibble value.
const NIBBLE_BITS: [u32; 16] = [0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4];

// ============================================================================
// IntBoundary / IntRun
// ============================================================================

/// One end of an integer coverage portion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntBoundary {
    pub pos: i32,
    pub val: f32,
    pub start: bool,
    /// Index of the paired boundary.
    pub other: usize,
    // Slot in the active set while flatten() scans this portion.
    act_inv: usize,
}

/// A span `[st, en)` of pixels with coverage interpolated from `vst` to `ven`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntRun {
    pub st: i32,
    pub en: i32,
    pub vst: f32,
    pub ven: f32,
}

impl IntRun {
    #[inline]
    pub fn value_at(&self, x: i32) -> f32 {
        value_at_i(x, self.st, self.en, self.vst, self.ven)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        trapezoid_area(self.st as f64, self.en as f64, self.vst as f64, self.ven as f64)
    }

    #[inline]
    fn slope(&self) -> f32 {
        (self.ven - self.vst) / (self.en - self.st) as f32
    }
}

#[inline]
fn count_bits(mut v: u32) -> u32 {
    let mut n = 0;
    while v != 0 {
        n += NIBBLE_BITS[(v & 0xF) as usize];
        v >>= 4;
    }
    n
}

/// The `k` sample bits of the pixel whose first bit is `rel_bit`, right-aligned.
#[inline]
fn pixel_bits(words: &[u32], rel_bit: usize, k: u32) -> u32 {
    let word = words[rel_bit / 32];
    let off = (rel_bit % 32) as u32;
    if k >= 32 {
        word
    } else {
        (word << off) >> (32 - k)
    }
}

/// Restrict a float run to the addressable pixel range.
fn clip_to_pixels(r: &FloatRun) -> Option<FloatRun> {
    if r.st >= -PIXEL_LIMIT && r.en <= PIXEL_LIMIT {
        return Some(*r);
    }
    let st = r.st.max(-PIXEL_LIMIT);
    let en = r.en.min(PIXEL_LIMIT);
    if !(st < en) {
        log::trace!("dropping run [{}, {}] outside the pixel range", r.st, r.en);
        return None;
    }
    Some(FloatRun {
        st,
        en,
        vst: r.value_at(st),
        ven: r.value_at(en),
        slope: r.slope,
    })
}

/// Turns per-pixel sample counts into runs, extending the current run while
/// the count stays the same.
struct CountRuns {
    start: i32,
    count: u32,
    open: bool,
    unit: f32,
}

impl CountRuns {
    fn new(unit: f32) -> Self {
        Self {
            start: 0,
            count: 0,
            open: false,
            unit,
        }
    }

    fn feed(&mut self, line: &mut IntegerRunLine, x: i32, count: u32) {
        if count == 0 {
            self.finish(line, x);
        } else if !self.open {
            self.start = x;
            self.count = count;
            self.open = true;
        } else if self.count != count {
            let v = self.count as f32 * self.unit;
            line.add_run(self.start, x, v, v);
            self.start = x;
            self.count = count;
        }
    }

    fn finish(&mut self, line: &mut IntegerRunLine, x: i32) {
        if self.open {
            let v = self.count as f32 * self.unit;
            line.add_run(self.start, x, v, v);
            self.open = false;
        }
    }
}

// ============================================================================
// IntegerRunLine
// ============================================================================

/// Scanline coverage with integer run boundaries.
#[derive(Debug, Clone, Default)]
pub struct IntegerRunLine {
    bords: Vec<IntBoundary>,
    order: Vec<usize>,
    active: Vec<usize>,
    runs: Vec<IntRun>,
}

impl IntegerRunLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop boundaries and runs, keeping the allocations.
    pub fn reset(&mut self) {
        self.bords.clear();
        self.order.clear();
        self.active.clear();
        self.runs.clear();
    }

    #[inline]
    pub fn runs(&self) -> &[IntRun] {
        &self.runs
    }

    #[inline]
    pub fn boundaries(&self) -> &[IntBoundary] {
        &self.bords
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Total area under the runs.
    pub fn total_area(&self) -> f64 {
        self.runs.iter().map(IntRun::area).sum()
    }

    /// Coverage at `x`, interpolated inside the run containing it.
    pub fn coverage_at(&self, x: f64) -> f32 {
        let i = self.runs.partition_point(|r| (r.en as f64) <= x);
        match self.runs.get(i) {
            Some(r) if (r.st as f64) <= x => {
                let t = (x - r.st as f64) / (r.en - r.st) as f64;
                r.vst + (r.ven - r.vst) * t as f32
            }
            _ => 0.0,
        }
    }

    // ========================================================================
    // Runs
    // ========================================================================

    /// Append a run. Empty or reversed spans are ignored.
    pub fn add_run(&mut self, st: i32, en: i32, vst: f32, ven: f32) -> Option<usize> {
        if st >= en {
            return None;
        }
        self.runs.push(IntRun { st, en, vst, ven });
        Some(self.runs.len() - 1)
    }

    /// Append a run, extending the previous one instead when the two touch
    /// and continue the same linear ramp.
    fn push_merged(&mut self, st: i32, en: i32, vst: f32, ven: f32) {
        if st >= en {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            let slope = (ven - vst) / (en - st) as f32;
            if last.en == st
                && (last.ven - vst).abs() <= RUN_MERGE_EPSILON
                && (last.slope() - slope).abs() <= RUN_MERGE_EPSILON
            {
                last.en = en;
                last.ven = ven;
                return;
            }
        }
        self.runs.push(IntRun { st, en, vst, ven });
    }

    // ========================================================================
    // Integer boundaries
    // ========================================================================

    /// Add a portion `[spos, epos)` ramping from `sval` to `eval`. Returns the
    /// index of its left boundary.
    pub fn add_boundary(&mut self, spos: i32, sval: f32, epos: i32, eval: f32) -> Option<usize> {
        if spos >= epos {
            log::trace!("dropping degenerate boundary [{spos}, {epos}]");
            return None;
        }
        let n = self.bords.len();
        self.bords.push(IntBoundary {
            pos: spos,
            val: sval,
            start: true,
            other: n + 1,
            act_inv: 0,
        });
        self.bords.push(IntBoundary {
            pos: epos,
            val: eval,
            start: false,
            other: n,
            act_inv: 0,
        });
        Some(n)
    }

    fn enqueue(&mut self, end: usize) {
        self.bords[end].act_inv = self.active.len();
        self.active.push(end);
    }

    fn dequeue(&mut self, end: usize) {
        let k = self.bords[end].act_inv;
        if k >= self.active.len() || self.active[k] != end {
            return;
        }
        self.active.swap_remove(k);
        if let Some(&moved) = self.active.get(k) {
            self.bords[moved].act_inv = k;
        }
    }

    /// Sum of the coverage, at `at`, of every active portion.
    fn remaining_val_at(&self, at: i32) -> f32 {
        self.active
            .iter()
            .map(|&e| {
                let end = &self.bords[e];
                let start = &self.bords[end.other];
                value_at_i(at, start.pos, end.pos, start.val, end.val)
            })
            .sum()
    }

    /// Merge the integer boundaries into non-overlapping runs.
    pub fn flatten(&mut self) {
        self.runs.clear();
        self.active.clear();
        if self.bords.len() <= 1 {
            return;
        }

        self.order.clear();
        self.order.extend(0..self.bords.len());
        let bords = &self.bords;
        self.order
            .sort_by(|&i, &j| bords[i].pos.cmp(&bords[j].pos).then(bords[i].start.cmp(&bords[j].start)));

        let mut last_start = 0;
        let mut last_val = 0.0;
        let mut start_exists = false;

        let mut i = 0;
        while i < self.order.len() {
            let cur = self.bords[self.order[i]].pos;
            let mut left_v = 0.0;
            let mut right_v = 0.0;

            while i < self.order.len() {
                let k = self.order[i];
                let b = self.bords[k];
                if b.pos != cur || b.start {
                    break;
                }
                self.dequeue(k);
                left_v += b.val;
                i += 1;
            }
            let mid_v = self.remaining_val_at(cur);
            while i < self.order.len() {
                let k = self.order[i];
                let b = self.bords[k];
                if b.pos != cur || !b.start {
                    break;
                }
                right_v += b.val;
                self.enqueue(b.other);
                i += 1;
            }

            if start_exists {
                self.add_run(last_start, cur, last_val, left_v + mid_v);
            }
            if self.active.is_empty() {
                start_exists = false;
            } else {
                start_exists = true;
                last_val = mid_v + right_v;
                last_start = cur;
            }
        }
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Replace the content with the runs of another integer line.
    pub fn copy_from(&mut self, a: &IntegerRunLine) {
        self.reset();
        self.runs.extend_from_slice(&a.runs);
    }

    /// Resample the runs of a flattened float line to pixel boundaries.
    ///
    /// Pixel-aligned middles are copied as-is. The fractional ends become
    /// single-pixel runs holding the area of the coverage inside that pixel;
    /// contributions of neighbouring runs to the same pixel are summed. Total
    /// area is preserved for runs inside `±PIXEL_LIMIT`; parts beyond it
    /// cannot be addressed by pixel runs and are dropped.
    pub fn copy_from_float(&mut self, a: &FloatBoundaryLine) {
        self.reset();
        let mut pix: Option<(i32, f64)> = None;

        for r in a.runs().iter().filter_map(clip_to_pixels) {
            let rs = r.st.round();
            let st_aligned = (r.st - rs).abs() < COPY_TOLERANCE;
            let s_int = if st_aligned { rs as i32 } else { ifloor(r.st) + 1 };
            let re = r.en.round();
            let en_aligned = (r.en - re).abs() < COPY_TOLERANCE;
            let e_int = if en_aligned { re as i32 } else { ifloor(r.en) };

            if s_int > e_int {
                self.add_pixel_area(&mut pix, ifloor(r.st), r.area());
                continue;
            }

            let v_at = |x: i32| {
                if st_aligned && x == s_int {
                    r.vst
                } else if en_aligned && x == e_int {
                    r.ven
                } else {
                    r.value_at(x as f64)
                }
            };
            let vs = v_at(s_int);
            let ve = v_at(e_int);

            if !st_aligned {
                let area = trapezoid_area(r.st, s_int as f64, r.vst, vs);
                self.add_pixel_area(&mut pix, s_int - 1, area);
            }
            if s_int < e_int {
                if let Some((p, area)) = pix.take() {
                    self.add_run(p, p + 1, area as f32, area as f32);
                }
                self.add_run(s_int, e_int, vs as f32, ve as f32);
            }
            if !en_aligned {
                let area = trapezoid_area(e_int as f64, r.en, ve, r.ven);
                self.add_pixel_area(&mut pix, e_int, area);
            }
        }

        if let Some((p, area)) = pix {
            self.add_run(p, p + 1, area as f32, area as f32);
        }
        log::debug!("resampled {} float runs into {} pixel runs", a.runs().len(), self.runs.len());
    }

    fn add_pixel_area(&mut self, pix: &mut Option<(i32, f64)>, x: i32, area: f64) {
        if let Some((p, acc)) = pix.as_mut() {
            if *p == x {
                *acc += area;
                return;
            }
        }
        if let Some((p, acc)) = pix.replace((x, area)) {
            self.add_run(p, p + 1, acc as f32, acc as f32);
        }
    }

    /// Convert a supersampled bit line to coverage runs.
    ///
    /// Coverage of a pixel is its number of covered samples over the number
    /// of samples per pixel. Whole words that are empty or full are handled
    /// without counting.
    pub fn copy_from_bits(&mut self, a: &BitSuperSampleLine) {
        self.reset();
        let (lo, hi) = a.dirty_range();
        if hi <= lo {
            return;
        }

        let k = a.samples_per_pixel();
        let px_per_word = (32 / k) as i32;
        let words = a.part_words();
        let mut acc = CountRuns::new(1.0 / k as f32);

        let mut x = lo;
        while x < hi {
            let rel = (x - a.start()) as usize * k as usize;
            let word = words[rel / 32];
            if rel % 32 == 0 && i64::from(hi) - i64::from(x) >= i64::from(px_per_word) && (word == 0 || word == u32::MAX) {
                let count = if word == 0 { 0 } else { k };
                acc.feed(self, x, count);
                x += px_per_word;
                continue;
            }
            acc.feed(self, x, count_bits(pixel_bits(words, rel, k)));
            x += 1;
        }
        acc.finish(self, hi);
    }

    /// Convert `lines.len()` vertically stacked bit lines (sub-scanlines of
    /// one pixel row) to coverage runs: covered samples over
    /// `samples_per_pixel * lines.len()`.
    ///
    /// All lines are expected to share the geometry of the first one; lines
    /// that do not are skipped.
    pub fn copy_from_bits_multi(&mut self, lines: &[&BitSuperSampleLine]) {
        let first = match lines {
            [] => {
                self.reset();
                return;
            }
            [one] => {
                self.copy_from_bits(one);
                return;
            }
            [first, ..] => *first,
        };
        self.reset();

        let k = first.samples_per_pixel();
        let same = |l: &&BitSuperSampleLine| {
            l.start() == first.start() && l.end() == first.end() && l.samples_per_pixel() == k
        };
        if lines.iter().any(|l| !same(l)) {
            log::warn!("skipping bit lines whose geometry differs from the first one");
        }

        let mut nb_sub = 0u32;
        let mut lo = i32::MAX;
        let mut hi = i32::MIN;
        for l in lines.iter().filter(|l| same(l)) {
            nb_sub += 1;
            let (l_lo, l_hi) = l.dirty_range();
            if l_lo < l_hi {
                lo = lo.min(l_lo);
                hi = hi.max(l_hi);
            }
        }
        if hi <= lo {
            return;
        }

        let full = k * nb_sub;
        let px_per_word = (32 / k) as i32;
        let mut acc = CountRuns::new(1.0 / full as f32);

        let mut x = lo;
        while x < hi {
            let rel = (x - first.start()) as usize * k as usize;
            if rel % 32 == 0 && i64::from(hi) - i64::from(x) >= i64::from(px_per_word) {
                let w = rel / 32;
                let mut all_empty = true;
                let mut all_full = true;
                for l in lines.iter().filter(|l| same(l)) {
                    let word = l.part_words()[w];
                    all_empty &= word == 0;
                    all_full &= word == u32::MAX;
                }
                if all_empty || all_full {
                    acc.feed(self, x, if all_full { full } else { 0 });
                    x += px_per_word;
                    continue;
                }
            }
            let count = lines
                .iter()
                .filter(|l| same(l))
                .map(|l| count_bits(pixel_bits(l.part_words(), rel, k)))
                .sum();
            acc.feed(self, x, count);
            x += 1;
        }
        acc.finish(self, hi);
    }

    // ========================================================================
    // Boolean composition
    // ========================================================================

    /// Compose two flattened lines into this one.
    ///
    /// Both run lists are walked jointly; between consecutive run boundaries
    /// each side's coverage is interpolated at both ends and combined with the
    /// unclamped rules of [`combine_span`]. Touching result pieces that
    /// continue the same ramp are merged.
    pub fn booleen(&mut self, a: &IntegerRunLine, b: &IntegerRunLine, op: BooleanOp) {
        self.reset();
        let (ra, rb) = (&a.runs, &b.runs);
        if ra.is_empty() && rb.is_empty() {
            return;
        }
        if ra.is_empty() {
            if op.keeps_b() {
                self.copy_from(b);
            }
            return;
        }
        if rb.is_empty() {
            if op.keeps_a() {
                self.copy_from(a);
            }
            return;
        }

        let mut ia = 0;
        let mut ib = 0;
        let mut cur = ra[0].st.min(rb[0].st);

        loop {
            while ia < ra.len() && ra[ia].en <= cur {
                ia += 1;
            }
            while ib < rb.len() && rb[ib].en <= cur {
                ib += 1;
            }
            let run_a = ra.get(ia);
            let run_b = rb.get(ib);

            let next_of = |r: &IntRun| if cur < r.st { r.st } else { r.en };
            let next = match (run_a.map(next_of), run_b.map(next_of)) {
                (Some(x), Some(y)) => x.min(y),
                (Some(x), None) | (None, Some(x)) => x,
                (None, None) => break,
            };

            let span_of = |r: Option<&IntRun>| {
                r.filter(|r| r.st <= cur && cur < r.en)
                    .map(|r| (r.value_at(cur), r.value_at(next)))
            };
            if let Some((v0, v1)) = combine_span(op, span_of(run_a), span_of(run_b)) {
                self.push_merged(cur, next, v0, v1);
            }
            cur = next;
        }
    }

    // ========================================================================
    // Rasterization
    // ========================================================================

    /// Hand every run overlapping `[dest.start_pix, dest.end_pix)` to `worker`,
    /// clipping the first and last one with interpolated end values.
    pub fn raster<B, C, W>(&self, dest: &mut RasterInfo<'_, B>, color: &C, mut worker: W)
    where
        B: ?Sized,
        C: ?Sized,
        W: RasterInRun<B, C>,
    {
        if self.runs.is_empty() || dest.is_empty() {
            return;
        }
        let (sp, ep) = (dest.start_pix, dest.end_pix);
        let first = self.runs.partition_point(|r| r.en <= sp);

        for r in &self.runs[first..] {
            if r.st >= ep {
                break;
            }
            let (st, vst) = if r.st < sp { (sp, r.value_at(sp)) } else { (r.st, r.vst) };
            let (en, ven) = if r.en > ep { (ep, r.value_at(ep)) } else { (r.en, r.ven) };
            if st < en {
                worker.raster_run(dest, color, st, vst, en, ven);
            }
        }
    }

    /// Log the runs at debug level.
    pub fn dump(&self) {
        log::debug!("{} runs:", self.runs.len());
        for r in &self.runs {
            log::debug!("  ({} {} -> {} {})", r.st, r.vst, r.en, r.ven);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
