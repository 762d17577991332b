//! Float-precision coverage line.
//!
//! Coverage contributions arrive as trapezoids `[spos, epos]` whose value
//! ramps linearly from `sval` to `eval`. Each one is stored as a pair of
//! boundaries in a position-sorted, index-linked list; `flatten()` sweeps the
//! list once and produces sorted, non-overlapping [`FloatRun`]s.
//!
//! The list lives in an append-only arena: boundaries are never removed
//! individually, only dropped all at once by `reset()`, which keeps the
//! backing storage for the next scanline.

use core::cmp::Ordering;

use crate::basics::{crossing, trapezoid_area, value_at, FLOAT_EPSILON, MERGE_EPSILON};
use crate::int_line::IntegerRunLine;

// ============================================================================
// FloatBoundary / FloatRun
// ============================================================================

/// One end of a coverage trapezoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatBoundary {
    pub pos: f64,
    pub val: f64,
    /// `true` for the left end of the trapezoid.
    pub start: bool,
    /// Coverage increase per unit length over the trapezoid.
    pub slope: f64,
    /// Index of the paired boundary.
    pub other: usize,
    pub prev: Option<usize>,
    pub next: Option<usize>,
    // Slot in the pending set while flatten() scans this trapezoid.
    pend_inv: usize,
}

/// A span `[st, en)` over which coverage varies linearly from `vst` to `ven`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRun {
    pub st: f64,
    pub en: f64,
    pub vst: f64,
    pub ven: f64,
    pub slope: f64,
}

impl FloatRun {
    /// Coverage at `x` (interpolated; not clipped to the run).
    #[inline]
    pub fn value_at(&self, x: f64) -> f64 {
        value_at(x, self.st, self.en, self.vst, self.ven)
    }

    /// Area under the run.
    #[inline]
    pub fn area(&self) -> f64 {
        trapezoid_area(self.st, self.en, self.vst, self.ven)
    }
}

/// Boundary order: by position, and at (nearly) equal positions ends
/// come before starts so that touching trapezoids do not overlap.
fn cmp_boundary(a: &FloatBoundary, b: &FloatBoundary) -> Ordering {
    if (a.pos - b.pos).abs() < FLOAT_EPSILON {
        match (a.start, b.start) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    } else {
        a.pos.total_cmp(&b.pos)
    }
}

// ============================================================================
// FloatBoundaryLine
// ============================================================================

/// Scanline coverage with floating-point boundaries.
///
/// Usage protocol:
/// 1. `add_boundary()` / `append_boundary()`: accumulate trapezoids
/// 2. `flatten()`: merge them into runs (once per scanline)
/// 3. read `runs()`, or hand the line to `IntegerRunLine::copy_from_float()`
/// 4. `reset()`: prepare for the next scanline
#[derive(Debug, Clone)]
pub struct FloatBoundaryLine {
    bords: Vec<FloatBoundary>,
    runs: Vec<FloatRun>,
    first: Option<usize>,
    last: Option<usize>,
    pending: Vec<usize>,
    min: f64,
    max: f64,
    before: f64,
    after: f64,
}

impl FloatBoundaryLine {
    /// Create an unbounded line.
    pub fn new() -> Self {
        Self::with_bounds(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Create a line clipped to `[min, max]`. Coverage falling outside is
    /// folded into `before()` / `after()` instead of producing runs.
    pub fn with_bounds(min: f64, max: f64) -> Self {
        Self {
            bords: Vec::new(),
            runs: Vec::new(),
            first: None,
            last: None,
            pending: Vec::new(),
            min,
            max: if max < min { min } else { max },
            before: 0.0,
            after: 0.0,
        }
    }

    /// Drop boundaries, runs and accumulators, keeping the allocations.
    pub fn reset(&mut self) {
        self.bords.clear();
        self.runs.clear();
        self.pending.clear();
        self.first = None;
        self.last = None;
        self.before = 0.0;
        self.after = 0.0;
    }

    #[inline]
    pub fn runs(&self) -> &[FloatRun] {
        &self.runs
    }

    /// Boundaries in insertion order. Use [`sorted_boundaries`](Self::sorted_boundaries)
    /// for list order.
    #[inline]
    pub fn boundaries(&self) -> &[FloatBoundary] {
        &self.bords
    }

    /// Boundaries following the sorted linked list.
    pub fn sorted_boundaries(&self) -> impl Iterator<Item = &FloatBoundary> + '_ {
        let mut cur = self.first;
        core::iter::from_fn(move || {
            let i = cur?;
            let b = &self.bords[i];
            cur = b.next;
            Some(b)
        })
    }

    #[inline]
    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Area of contributions clipped off on the left.
    #[inline]
    pub fn before(&self) -> f64 {
        self.before
    }

    /// Area of contributions clipped off on the right.
    #[inline]
    pub fn after(&self) -> f64 {
        self.after
    }

    /// Total area under the runs.
    pub fn total_area(&self) -> f64 {
        self.runs.iter().map(FloatRun::area).sum()
    }

    /// Coverage at `x` according to the runs.
    pub fn coverage_at(&self, x: f64) -> f64 {
        let i = self.runs.partition_point(|r| r.en <= x);
        match self.runs.get(i) {
            Some(r) if r.st <= x => r.value_at(x),
            _ => 0.0,
        }
    }

    // ========================================================================
    // Adding coverage
    // ========================================================================

    /// Add the trapezoid `(spos, sval) -> (epos, eval)`.
    ///
    /// `hint` is a boundary index to start the sorted-insertion search from,
    /// typically the value returned by the previous call. Returns the index of
    /// the right boundary, or `None` when the interval is degenerate or lies
    /// entirely outside the bounds.
    pub fn add_boundary(
        &mut self,
        spos: f64,
        sval: f64,
        epos: f64,
        eval: f64,
        hint: Option<usize>,
    ) -> Option<usize> {
        if !(spos < epos) {
            log::trace!("dropping degenerate boundary [{spos}, {epos}]");
            return None;
        }
        let slope = (eval - sval) / (epos - spos);
        self.add_boundary_with_slope(spos, sval, epos, eval, slope, hint)
    }

    /// [`add_boundary`](Self::add_boundary) with an explicit slope.
    pub fn add_boundary_with_slope(
        &mut self,
        spos: f64,
        sval: f64,
        epos: f64,
        eval: f64,
        slope: f64,
        hint: Option<usize>,
    ) -> Option<usize> {
        let hint = self.valid_hint(hint);
        let (spos, sval, epos, eval) = self.clip(spos, sval, epos, eval, slope)?;
        let (s, e) = self.push_pair(spos, sval, epos, eval, slope);
        self.insert(s, hint);
        self.insert(e, Some(s));
        Some(e)
    }

    /// Like [`add_boundary_with_slope`](Self::add_boundary_with_slope), but
    /// `hint` locates the right boundary, which is inserted first. Returns the
    /// index of the left boundary.
    pub fn add_boundary_rev(
        &mut self,
        spos: f64,
        sval: f64,
        epos: f64,
        eval: f64,
        slope: f64,
        hint: Option<usize>,
    ) -> Option<usize> {
        let hint = self.valid_hint(hint);
        let (spos, sval, epos, eval) = self.clip(spos, sval, epos, eval, slope)?;
        let (s, e) = self.push_pair(spos, sval, epos, eval, slope);
        self.insert(e, hint);
        self.insert(s, Some(e));
        Some(s)
    }

    /// Append a trapezoid known to lie right of every boundary already in the
    /// line (left-to-right sweeps). Skips the sorted search entirely.
    pub fn append_boundary(&mut self, spos: f64, sval: f64, epos: f64, eval: f64, slope: f64) -> Option<usize> {
        let (spos, sval, epos, eval) = self.clip(spos, sval, epos, eval, slope)?;
        let (s, e) = self.push_pair(spos, sval, epos, eval, slope);
        self.bords[s].prev = self.last;
        self.bords[s].next = Some(e);
        self.bords[e].prev = Some(s);
        self.bords[e].next = None;
        match self.last {
            Some(l) => self.bords[l].next = Some(s),
            None => self.first = Some(s),
        }
        self.last = Some(e);
        Some(e)
    }

    fn valid_hint(&self, hint: Option<usize>) -> Option<usize> {
        hint.filter(|&h| h < self.bords.len())
    }

    /// Clip a trapezoid to the bounds, folding the excess into the
    /// accumulators. `None` if nothing (wide enough) remains.
    fn clip(
        &mut self,
        mut spos: f64,
        mut sval: f64,
        mut epos: f64,
        mut eval: f64,
        slope: f64,
    ) -> Option<(f64, f64, f64, f64)> {
        if !(spos < epos) {
            log::trace!("dropping degenerate boundary [{spos}, {epos}]");
            return None;
        }
        if spos < self.min {
            let cut = epos.min(self.min);
            let vcut = if cut == epos { eval } else { sval + (cut - spos) * slope };
            self.before += trapezoid_area(spos, cut, sval, vcut);
            if epos <= self.min {
                return None;
            }
            spos = cut;
            sval = vcut;
        }
        if epos > self.max {
            let cut = spos.max(self.max);
            let vcut = if cut == spos { sval } else { sval + (cut - spos) * slope };
            self.after += trapezoid_area(cut, epos, vcut, eval);
            if spos >= self.max {
                return None;
            }
            epos = cut;
            eval = vcut;
        }
        if epos - spos < FLOAT_EPSILON {
            log::trace!("dropping sub-epsilon boundary [{spos}, {epos}]");
            return None;
        }
        Some((spos, sval, epos, eval))
    }

    fn push_pair(&mut self, spos: f64, sval: f64, epos: f64, eval: f64, slope: f64) -> (usize, usize) {
        let n = self.bords.len();
        self.bords.push(FloatBoundary {
            pos: spos,
            val: sval,
            start: true,
            slope,
            other: n + 1,
            prev: None,
            next: None,
            pend_inv: 0,
        });
        self.bords.push(FloatBoundary {
            pos: epos,
            val: eval,
            start: false,
            slope,
            other: n,
            prev: None,
            next: None,
            pend_inv: 0,
        });
        (n, n + 1)
    }

    // ========================================================================
    // Linked-list maintenance
    // ========================================================================

    fn insert(&mut self, no: usize, hint: Option<usize>) {
        if self.first.is_none() {
            self.first = Some(no);
            self.last = Some(no);
            self.bords[no].prev = None;
            self.bords[no].next = None;
            return;
        }

        let start = match hint {
            Some(h) => h,
            None => {
                self.insert_forward(no, self.first);
                return;
            }
        };

        match cmp_boundary(&self.bords[start], &self.bords[no]) {
            Ordering::Equal => self.link_before(no, start),
            Ordering::Greater => {
                let mut c = Some(start);
                while let Some(k) = c {
                    if cmp_boundary(&self.bords[k], &self.bords[no]) != Ordering::Greater {
                        break;
                    }
                    c = self.bords[k].prev;
                }
                match c {
                    Some(k) => self.link_after(no, k),
                    None => self.link_front(no),
                }
            }
            Ordering::Less => self.insert_forward(no, Some(start)),
        }
    }

    fn insert_forward(&mut self, no: usize, from: Option<usize>) {
        let mut c = from;
        while let Some(k) = c {
            if cmp_boundary(&self.bords[k], &self.bords[no]) != Ordering::Less {
                break;
            }
            c = self.bords[k].next;
        }
        match c {
            Some(k) => self.link_before(no, k),
            None => self.link_back(no),
        }
    }

    fn link_before(&mut self, no: usize, c: usize) {
        let p = self.bords[c].prev;
        self.bords[no].prev = p;
        self.bords[no].next = Some(c);
        self.bords[c].prev = Some(no);
        match p {
            Some(p) => self.bords[p].next = Some(no),
            None => self.first = Some(no),
        }
    }

    fn link_after(&mut self, no: usize, c: usize) {
        let n = self.bords[c].next;
        self.bords[no].next = n;
        self.bords[no].prev = Some(c);
        self.bords[c].next = Some(no);
        match n {
            Some(n) => self.bords[n].prev = Some(no),
            None => self.last = Some(no),
        }
    }

    fn link_front(&mut self, no: usize) {
        self.bords[no].prev = None;
        self.bords[no].next = self.first;
        if let Some(f) = self.first {
            self.bords[f].prev = Some(no);
        }
        self.first = Some(no);
    }

    fn link_back(&mut self, no: usize) {
        self.bords[no].next = None;
        self.bords[no].prev = self.last;
        if let Some(l) = self.last {
            self.bords[l].next = Some(no);
        }
        self.last = Some(no);
    }

    // ========================================================================
    // Flatten
    // ========================================================================

    /// Sum of the coverage, at `at`, of every trapezoid currently scanned.
    fn remaining_val_at(&self, at: f64) -> f64 {
        self.pending
            .iter()
            .map(|&k| {
                let b = &self.bords[k];
                b.val + (at - b.pos) * b.slope
            })
            .sum()
    }

    fn remove_pending(&mut self, start: usize) {
        let k = self.bords[start].pend_inv;
        if k >= self.pending.len() || self.pending[k] != start {
            return;
        }
        self.pending.swap_remove(k);
        if let Some(&moved) = self.pending.get(k) {
            self.bords[moved].pend_inv = k;
        }
    }

    /// Merge the boundaries into non-overlapping runs.
    ///
    /// Sweeps left to right; at each distinct position ends are closed before
    /// starts are opened, and a run is emitted between consecutive positions
    /// while at least one trapezoid is open. The coverage at each emission
    /// point is recomputed from the open set so rounding does not accumulate.
    pub fn flatten(&mut self) {
        self.runs.clear();
        self.pending.clear();
        let Some(head) = self.first else {
            return;
        };

        let mut tot_slope = 0.0;
        let mut tot_start = 0.0;
        let mut tot_x = self.bords[head].pos;
        let mut start_exists = false;
        let mut last_start = 0.0;
        let mut last_val = 0.0;

        let mut cursor = Some(head);
        while let Some(i0) = cursor {
            let cur = self.bords[i0].pos;
            let mut left_v = 0.0;
            let mut right_v = 0.0;
            let mut left_p = 0.0;
            let mut right_p = 0.0;

            let mut i = Some(i0);
            while let Some(k) = i {
                let b = self.bords[k];
                if b.start || (b.pos - cur).abs() >= FLOAT_EPSILON {
                    break;
                }
                left_v += b.val;
                left_p += b.slope;
                self.remove_pending(b.other);
                i = b.next;
            }
            while let Some(k) = i {
                let b = self.bords[k];
                if !b.start || (b.pos - cur).abs() >= FLOAT_EPSILON {
                    break;
                }
                right_v += b.val;
                right_p += b.slope;
                self.bords[k].pend_inv = self.pending.len();
                self.pending.push(k);
                i = b.next;
            }
            cursor = i;

            tot_start += tot_slope * (cur - tot_x);
            if start_exists {
                self.add_run_with_slope(last_start, cur, last_val, tot_start, tot_slope);
            }
            tot_slope += right_p - left_p;
            tot_start += right_v - left_v;
            tot_x = cur;

            if self.pending.is_empty() {
                start_exists = false;
                tot_start = 0.0;
                tot_slope = 0.0;
            } else {
                start_exists = true;
                tot_start = self.remaining_val_at(cur);
                last_val = tot_start;
                last_start = cur;
            }
        }

        log::debug!(
            "flattened {} boundaries into {} runs",
            self.bords.len(),
            self.runs.len()
        );
    }

    // ========================================================================
    // Runs
    // ========================================================================

    /// Append a run; the slope is derived from the end values.
    pub fn add_run(&mut self, st: f64, en: f64, vst: f64, ven: f64) -> Option<usize> {
        if !(st < en) {
            return None;
        }
        self.add_run_with_slope(st, en, vst, ven, (ven - vst) / (en - st))
    }

    pub fn add_run_with_slope(&mut self, st: f64, en: f64, vst: f64, ven: f64, slope: f64) -> Option<usize> {
        if !(st < en) {
            return None;
        }
        self.runs.push(FloatRun {
            st,
            en,
            vst,
            ven,
            slope,
        });
        Some(self.runs.len() - 1)
    }

    /// Replace the content with the runs of another float line.
    pub fn copy_from(&mut self, a: &FloatBoundaryLine) {
        self.reset();
        self.runs.extend_from_slice(&a.runs);
        self.before = a.before;
        self.after = a.after;
    }

    /// Replace the content with the runs of an integer line.
    pub fn copy_from_int(&mut self, a: &IntegerRunLine) {
        self.reset();
        for r in a.runs() {
            self.add_run(r.st as f64, r.en as f64, r.vst as f64, r.ven as f64);
        }
    }

    // ========================================================================
    // Threshold filters
    // ========================================================================

    /// Clamp coverage from below: parts at or below `threshold` become a flat
    /// run at `threshold` when `add_it`, and are removed otherwise.
    pub fn min(&mut self, a: &FloatBoundaryLine, threshold: f64, add_it: bool) {
        self.clamp_filter(a, threshold, |v| v <= threshold, add_it, true);
    }

    /// Clamp coverage from above: parts at or above `threshold` become a flat
    /// run at `threshold` when `add_it`, and are removed otherwise.
    pub fn max(&mut self, a: &FloatBoundaryLine, threshold: f64, add_it: bool) {
        self.clamp_filter(a, threshold, |v| v >= threshold, add_it, true);
    }

    /// Keep only the parts at or above `threshold`, as flat runs at `threshold`.
    /// Crossings are located by interpolation.
    pub fn over(&mut self, a: &FloatBoundaryLine, threshold: f64) {
        self.clamp_filter(a, threshold, |v| v >= threshold, true, false);
    }

    /// Partition `a` around `threshold`: this line receives the parts below,
    /// `over` (if given) the parts at or above.
    pub fn split(&mut self, a: &FloatBoundaryLine, threshold: f64, mut over: Option<&mut FloatBoundaryLine>) {
        self.reset();
        if let Some(o) = over.as_deref_mut() {
            o.reset();
        }
        for r in &a.runs {
            let above_s = r.vst >= threshold;
            let above_e = r.ven >= threshold;
            match (above_s, above_e) {
                (true, true) => {
                    if let Some(o) = over.as_deref_mut() {
                        o.add_run(r.st, r.en, r.vst, r.ven);
                    }
                }
                (true, false) => {
                    let cut = crossing(r.st, r.en, r.vst, r.ven, threshold);
                    if let Some(o) = over.as_deref_mut() {
                        o.add_run(r.st, cut, r.vst, threshold);
                    }
                    self.add_run(cut, r.en, threshold, r.ven);
                }
                (false, true) => {
                    let cut = crossing(r.st, r.en, r.vst, r.ven, threshold);
                    self.add_run(r.st, cut, r.vst, threshold);
                    if let Some(o) = over.as_deref_mut() {
                        o.add_run(cut, r.en, threshold, r.ven);
                    }
                }
                (false, false) => {
                    self.add_run(r.st, r.en, r.vst, r.ven);
                }
            }
        }
    }

    /// Shared walk of the threshold filters. Spans where `clamped(v)` holds
    /// are gathered (touching spans merged) and emitted flat at `threshold`
    /// when `keep_clamped`; the remaining parts are copied when `keep_free`.
    fn clamp_filter(
        &mut self,
        a: &FloatBoundaryLine,
        threshold: f64,
        clamped: impl Fn(f64) -> bool,
        keep_clamped: bool,
        keep_free: bool,
    ) {
        self.reset();
        let mut held: Option<(f64, f64)> = None;

        for r in &a.runs {
            match (clamped(r.vst), clamped(r.ven)) {
                (true, true) => {
                    held = Some(match held {
                        Some((s, e)) if e >= r.st - MERGE_EPSILON => (s, r.en),
                        Some((s, e)) => {
                            self.flush_clamped(s, e, threshold, keep_clamped);
                            (r.st, r.en)
                        }
                        None => (r.st, r.en),
                    });
                }
                (true, false) => {
                    let cut = crossing(r.st, r.en, r.vst, r.ven, threshold);
                    let (s, e) = match held.take() {
                        Some((s, e)) if e >= r.st - MERGE_EPSILON => (s, cut),
                        Some((s, e)) => {
                            self.flush_clamped(s, e, threshold, keep_clamped);
                            (r.st, cut)
                        }
                        None => (r.st, cut),
                    };
                    self.flush_clamped(s, e, threshold, keep_clamped);
                    if keep_free {
                        self.add_run(cut, r.en, threshold, r.ven);
                    }
                }
                (false, true) => {
                    if let Some((s, e)) = held.take() {
                        self.flush_clamped(s, e, threshold, keep_clamped);
                    }
                    let cut = crossing(r.st, r.en, r.vst, r.ven, threshold);
                    if keep_free {
                        self.add_run(r.st, cut, r.vst, threshold);
                    }
                    held = Some((cut, r.en));
                }
                (false, false) => {
                    if let Some((s, e)) = held.take() {
                        self.flush_clamped(s, e, threshold, keep_clamped);
                    }
                    if keep_free {
                        self.add_run_with_slope(r.st, r.en, r.vst, r.ven, r.slope);
                    }
                }
            }
        }

        if let Some((s, e)) = held {
            self.flush_clamped(s, e, threshold, keep_clamped);
        }
    }

    #[inline]
    fn flush_clamped(&mut self, s: f64, e: f64, threshold: f64, keep: bool) {
        if keep {
            self.add_run_with_slope(s, e, threshold, threshold, 0.0);
        }
    }

    /// Log boundaries and runs at debug level.
    pub fn dump(&self) {
        log::debug!("{} boundaries:", self.bords.len());
        for b in self.sorted_boundaries() {
            log::debug!("  ({} {} {} {})", b.pos, b.val, b.slope, b.start as u8);
        }
        log::debug!("{} runs:", self.runs.len());
        for r in &self.runs {
            log::debug!("  ({} {} -> {} {} / {})", r.st, r.vst, r.en, r.ven, r.slope);
        }
    }
}

impl Default for FloatBoundaryLine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
