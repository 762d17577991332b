//! Supersampled bit coverage line.
//!
//! Each pixel of `[start, end)` is split into `samples_per_pixel` horizontal
//! samples stored MSB-first in 32-bit words. Two parallel bitsets are kept:
//! samples touched by any boundary ("partially covered") and samples inside
//! a boundary flagged as solid ("fully covered"). The fully covered set is
//! always a subset of the partially covered one.
//!
//! Coverage is read back by population counting, see
//! [`IntegerRunLine::copy_from_bits`](crate::int_line::IntegerRunLine::copy_from_bits).

use crate::basics::{iceil, ifloor};

/// Samples per pixel used when the requested scale is unusable.
const DEFAULT_SAMPLES: u32 = 4;

/// Largest supported resolution: one word per pixel.
const MAX_SAMPLES: u32 = 32;

/// Packed-bit supersampled coverage accumulator for one scanline.
#[derive(Debug, Clone)]
pub struct BitSuperSampleLine {
    st: i32,
    en: i32,
    scale: f64,
    samples: u32,
    st_bit: i64,
    en_bit: i64,
    full: Vec<u32>,
    part: Vec<u32>,
    cur_min: i32,
    cur_max: i32,
    before: f64,
    after: f64,
}

/// Set bits `[b0, b1)` (relative to the start of `words`), MSB first.
fn set_bits(words: &mut [u32], b0: usize, b1: usize) {
    if b1 <= b0 {
        return;
    }
    let w0 = b0 / 32;
    let w1 = (b1 - 1) / 32;
    let head = u32::MAX >> (b0 % 32);
    let r = b1 - w1 * 32;
    let tail = if r == 32 { u32::MAX } else { !(u32::MAX >> r) };

    if w0 == w1 {
        words[w0] |= head & tail;
    } else if w0 + 1 == w1 {
        words[w0] |= head;
        words[w1] |= tail;
    } else {
        words[w0] |= head;
        words[w0 + 1..w1].fill(u32::MAX);
        words[w1] |= tail;
    }
}

#[inline]
fn test_bit(words: &[u32], bit: usize) -> bool {
    words
        .get(bit / 32)
        .map_or(false, |w| w & (0x8000_0000 >> (bit % 32)) != 0)
}

impl BitSuperSampleLine {
    /// Create a line over pixels `[st, en)` with sample width `scale`
    /// (in pixels). Samples per pixel are rounded to a power of two in
    /// `1..=32`.
    pub fn new(st: i32, en: i32, scale: f64) -> Self {
        let en = en.max(st.saturating_add(1));
        let samples = Self::samples_for(scale);
        let st_bit = st as i64 * samples as i64;
        let en_bit = en as i64 * samples as i64;
        let nwords = ((en_bit - st_bit) as usize + 31) / 32 + 1;
        Self {
            st,
            en,
            scale: 1.0 / samples as f64,
            samples,
            st_bit,
            en_bit,
            full: vec![0; nwords],
            part: vec![0; nwords],
            cur_min: en,
            cur_max: st,
            before: 0.0,
            after: 0.0,
        }
    }

    fn samples_for(scale: f64) -> u32 {
        if !(scale > 0.0) || !scale.is_finite() {
            log::warn!("invalid supersampling scale {scale}, using {DEFAULT_SAMPLES} samples per pixel");
            return DEFAULT_SAMPLES;
        }
        let wanted = (1.0 / scale).round();
        let samples = (wanted.clamp(1.0, MAX_SAMPLES as f64) as u32).next_power_of_two();
        if samples as f64 != wanted {
            log::warn!("supersampling scale {scale} adjusted to {samples} samples per pixel");
        }
        samples
    }

    /// Clear both bitsets and the dirty range, keeping the allocation.
    pub fn reset(&mut self) {
        self.full.fill(0);
        self.part.fill(0);
        self.cur_min = self.en;
        self.cur_max = self.st;
        self.before = 0.0;
        self.after = 0.0;
    }

    #[inline]
    pub fn start(&self) -> i32 {
        self.st
    }

    #[inline]
    pub fn end(&self) -> i32 {
        self.en
    }

    /// Effective sample width in pixels.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn samples_per_pixel(&self) -> u32 {
        self.samples
    }

    #[inline]
    pub fn full_words(&self) -> &[u32] {
        &self.full
    }

    #[inline]
    pub fn part_words(&self) -> &[u32] {
        &self.part
    }

    /// Whether absolute sample `bit` lies in a solid span.
    pub fn fully_covered(&self, bit: i64) -> bool {
        self.rel_bit(bit).map_or(false, |b| test_bit(&self.full, b))
    }

    /// Whether absolute sample `bit` is touched by any span.
    pub fn partially_covered(&self, bit: i64) -> bool {
        self.rel_bit(bit).map_or(false, |b| test_bit(&self.part, b))
    }

    fn rel_bit(&self, bit: i64) -> Option<usize> {
        if bit < self.st_bit || bit >= self.en_bit {
            return None;
        }
        Some((bit - self.st_bit) as usize)
    }

    /// Pixels `[lo, hi)` touched since the last reset. Empty when `hi <= lo`.
    #[inline]
    pub fn dirty_range(&self) -> (i32, i32) {
        (self.cur_min, self.cur_max)
    }

    /// Length of span input that fell left of the line.
    #[inline]
    pub fn before(&self) -> f64 {
        self.before
    }

    /// Length of span input that fell right of the line.
    #[inline]
    pub fn after(&self) -> f64 {
        self.after
    }

    /// Mark the samples of `[spos, epos)` as covered.
    ///
    /// The sample range is `[floor(spos * n), ceil(epos * n))` for `n`
    /// samples per pixel. Solid spans (`full`) set both bitsets; the others
    /// only the partially covered one.
    pub fn add_boundary(&mut self, spos: f64, epos: f64, full: bool) {
        if !(spos < epos) {
            log::trace!("dropping empty bit span [{spos}, {epos}]");
            return;
        }
        let (stf, enf) = (self.st as f64, self.en as f64);
        if spos < stf {
            self.before += epos.min(stf) - spos;
        }
        if epos > enf {
            self.after += epos - spos.max(enf);
        }
        if epos <= stf || spos >= enf {
            return;
        }

        let k = self.samples as f64;
        let b0 = ((spos * k).floor() as i64).clamp(self.st_bit, self.en_bit);
        let b1 = ((epos * k).ceil() as i64).clamp(self.st_bit, self.en_bit);
        if b1 <= b0 {
            return;
        }
        let (r0, r1) = ((b0 - self.st_bit) as usize, (b1 - self.st_bit) as usize);
        set_bits(&mut self.part, r0, r1);
        if full {
            set_bits(&mut self.full, r0, r1);
        }

        self.cur_min = self.cur_min.min(ifloor(spos.max(stf)));
        self.cur_max = self.cur_max.max(iceil(epos.min(enf)));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_word_layout() {
        let mut line = BitSuperSampleLine::new(0, 16, 0.25);
        line.add_boundary(2.0, 6.0, true);
        assert_eq!(line.samples_per_pixel(), 4);
        assert_eq!(line.full_words()[0], 0x00FF_FF00);
        assert_eq!(line.part_words()[0], 0x00FF_FF00);
        assert_eq!(line.dirty_range(), (2, 6));
        assert!(line.fully_covered(8));
        assert!(line.fully_covered(23));
        assert!(!line.fully_covered(24));
    }

    #[test]
    fn test_partial_span_leaves_full_clear() {
        let mut line = BitSuperSampleLine::new(0, 16, 0.25);
        line.add_boundary(1.1, 2.9, false);
        assert!(line.partially_covered(4));
        assert!(line.partially_covered(11));
        assert!(!line.partially_covered(12));
        assert!(line.full_words().iter().all(|&w| w == 0));
    }

    #[test]
    fn test_full_subset_of_partial() {
        let mut line = BitSuperSampleLine::new(-4, 60, 0.125);
        line.add_boundary(-1.3, 5.7, true);
        line.add_boundary(9.2, 40.6, false);
        line.add_boundary(30.0, 59.5, true);
        for (f, p) in line.full_words().iter().zip(line.part_words()) {
            assert_eq!(f & !p, 0);
        }
    }

    #[test]
    fn test_set_bits_branches() {
        let mut w = [0u32; 4];
        set_bits(&mut w, 4, 8);
        assert_eq!(w[0], 0x0F00_0000);

        let mut w = [0u32; 4];
        set_bits(&mut w, 28, 36);
        assert_eq!(w[0], 0x0000_000F);
        assert_eq!(w[1], 0xF000_0000);

        let mut w = [0u32; 4];
        set_bits(&mut w, 16, 112);
        assert_eq!(w, [0x0000_FFFF, u32::MAX, u32::MAX, 0xFFFF_0000]);

        let mut w = [0u32; 2];
        set_bits(&mut w, 0, 32);
        assert_eq!(w, [u32::MAX, 0]);
    }

    #[test]
    fn test_out_of_range_folds() {
        let mut line = BitSuperSampleLine::new(0, 8, 0.25);
        line.add_boundary(-3.0, 1.0, true);
        line.add_boundary(7.0, 10.0, true);
        assert_eq!(line.before(), 3.0);
        assert_eq!(line.after(), 2.0);
        assert_eq!(line.dirty_range(), (0, 8));

        line.add_boundary(-9.0, -5.0, true);
        assert_eq!(line.before(), 7.0);
    }

    #[test]
    fn test_far_out_of_range_is_clamped() {
        let mut line = BitSuperSampleLine::new(0, 16, 0.25);
        line.add_boundary(-3.0e9, 3.0e9, true);
        assert_eq!(line.dirty_range(), (0, 16));
        assert_eq!(line.before(), 3.0e9);
        assert_eq!(line.after(), 3.0e9 - 16.0);
        assert_eq!(line.full_words()[..2], [u32::MAX, u32::MAX]);
        assert_eq!(line.full_words()[2], 0);

        let mut line = BitSuperSampleLine::new(0, 16, 0.25);
        line.add_boundary(f64::NEG_INFINITY, 4.0, true);
        line.add_boundary(12.0, f64::INFINITY, false);
        assert_eq!(line.dirty_range(), (0, 16));
        assert!(line.fully_covered(15));
        assert!(!line.fully_covered(16));
        assert!(line.partially_covered(63));
        assert!(!line.fully_covered(63));
    }

    #[test]
    fn test_degenerate_span_dropped() {
        let mut line = BitSuperSampleLine::new(0, 8, 0.25);
        line.add_boundary(3.0, 3.0, true);
        line.add_boundary(5.0, 2.0, true);
        let (lo, hi) = line.dirty_range();
        assert!(hi <= lo);
        assert!(line.part_words().iter().all(|&w| w == 0));
    }

    #[test]
    fn test_scale_normalisation() {
        assert_eq!(BitSuperSampleLine::new(0, 4, 0.3).samples_per_pixel(), 4);
        assert_eq!(BitSuperSampleLine::new(0, 4, 0.01).samples_per_pixel(), 32);
        assert_eq!(BitSuperSampleLine::new(0, 4, 2.0).samples_per_pixel(), 1);
        assert_eq!(BitSuperSampleLine::new(0, 4, f64::NAN).samples_per_pixel(), 4);
        assert_eq!(BitSuperSampleLine::new(0, 4, 0.125).scale(), 0.125);
    }

    #[test]
    fn test_reset() {
        let mut line = BitSuperSampleLine::new(0, 8, 0.25);
        line.add_boundary(-1.0, 5.0, true);
        line.reset();
        assert!(line.full_words().iter().all(|&w| w == 0));
        assert!(line.part_words().iter().all(|&w| w == 0));
        assert_eq!(line.before(), 0.0);
        assert_eq!(line.dirty_range(), (8, 0));
    }
}
