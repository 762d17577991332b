//! Run rasterization interface.
//!
//! Lines never touch pixels themselves. They hand each clipped run to a
//! [`RasterInRun`] worker together with the destination window and an opaque
//! color, keeping the coverage code independent of any pixel format.

// ============================================================================
// RasterInfo
// ============================================================================

/// Destination of a rasterization pass: the horizontal pixel window
/// `[start_pix, end_pix)` of scanline `y`, plus the buffer runs are blended into.
pub struct RasterInfo<'a, B: ?Sized> {
    pub start_pix: i32,
    pub end_pix: i32,
    pub y: i32,
    pub buffer: &'a mut B,
}

impl<'a, B: ?Sized> RasterInfo<'a, B> {
    pub fn new(buffer: &'a mut B, y: i32, start_pix: i32, end_pix: i32) -> Self {
        Self {
            start_pix,
            end_pix,
            y,
            buffer,
        }
    }

    /// Whether the window is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end_pix <= self.start_pix
    }
}

// ============================================================================
// RasterInRun
// ============================================================================

/// Paints one run: blend `color` into `dest.buffer[st..en)` with coverage
/// interpolated linearly from `vst` at `st` to `ven` at `en`.
///
/// Workers are never called with `st >= en`, and never twice for
/// overlapping ranges of the same scanline.
pub trait RasterInRun<B: ?Sized, C: ?Sized> {
    fn raster_run(&mut self, dest: &mut RasterInfo<'_, B>, color: &C, st: i32, vst: f32, en: i32, ven: f32);
}

impl<B, C, F> RasterInRun<B, C> for F
where
    B: ?Sized,
    C: ?Sized,
    F: FnMut(&mut RasterInfo<'_, B>, &C, i32, f32, i32, f32),
{
    #[inline]
    fn raster_run(&mut self, dest: &mut RasterInfo<'_, B>, color: &C, st: i32, vst: f32, en: i32, ven: f32) {
        self(dest, color, st, vst, en, ven)
    }
}

// ============================================================================
// CoverageMask
// ============================================================================

/// A single-row coverage buffer.
///
/// Serves as the reference [`RasterInRun`] target: each run adds
/// `color * coverage` to the pixels it spans, sampling the ramp at pixel
/// starts the same way a span blender walks its covers.
#[derive(Debug, Clone)]
pub struct CoverageMask {
    x0: i32,
    values: Vec<f32>,
}

impl CoverageMask {
    /// Create an empty mask covering pixels `[x0, x0 + width)`.
    pub fn new(x0: i32, width: usize) -> Self {
        Self {
            x0,
            values: vec![0.0; width],
        }
    }

    pub fn x0(&self) -> i32 {
        self.x0
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Coverage stored at pixel `x`, zero outside the mask.
    pub fn get(&self, x: i32) -> f32 {
        let i = x - self.x0;
        if i < 0 || i as usize >= self.values.len() {
            return 0.0;
        }
        self.values[i as usize]
    }

    /// Sum of all stored coverage.
    pub fn total(&self) -> f64 {
        self.values.iter().map(|&v| v as f64).sum()
    }

    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Blend a run of coverage scaled by `weight`.
    pub fn blend_run(&mut self, weight: f32, st: i32, vst: f32, en: i32, ven: f32) {
        if en <= st {
            return;
        }
        let len = (en - st) as f32;
        for x in st..en {
            let i = x - self.x0;
            if i < 0 || i as usize >= self.values.len() {
                continue;
            }
            let t = (x - st) as f32 / len;
            self.values[i as usize] += weight * (vst + (ven - vst) * t);
        }
    }
}

/// Worker blending into a [`CoverageMask`] with an `f32` weight as color.
pub fn mask_worker(dest: &mut RasterInfo<'_, CoverageMask>, color: &f32, st: i32, vst: f32, en: i32, ven: f32) {
    dest.buffer.blend_run(*color, st, vst, en, ven);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_info_empty() {
        let mut mask = CoverageMask::new(0, 4);
        let info = RasterInfo::new(&mut mask, 0, 3, 3);
        assert!(info.is_empty());
    }

    #[test]
    fn test_closure_is_worker() {
        let mut calls = Vec::new();
        let mut worker = |_: &mut RasterInfo<'_, ()>, c: &u8, st: i32, vst: f32, en: i32, ven: f32| {
            calls.push((*c, st, vst, en, ven));
        };
        let mut unit = ();
        let mut info = RasterInfo::new(&mut unit, 0, 0, 10);
        worker.raster_run(&mut info, &7u8, 1, 0.5, 4, 0.5);
        assert_eq!(calls, vec![(7, 1, 0.5, 4, 0.5)]);
    }

    #[test]
    fn test_mask_blend_constant() {
        let mut mask = CoverageMask::new(10, 10);
        mask.blend_run(1.0, 12, 0.5, 15, 0.5);
        assert_eq!(mask.get(11), 0.0);
        assert_eq!(mask.get(12), 0.5);
        assert_eq!(mask.get(14), 0.5);
        assert_eq!(mask.get(15), 0.0);
        assert!((mask.total() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_mask_blend_clips_outside() {
        let mut mask = CoverageMask::new(0, 4);
        mask.blend_run(2.0, -3, 1.0, 6, 1.0);
        assert_eq!(mask.values(), &[2.0, 2.0, 2.0, 2.0]);
        mask.clear();
        assert_eq!(mask.total(), 0.0);
    }

    #[test]
    fn test_mask_worker() {
        let mut mask = CoverageMask::new(0, 8);
        {
            let mut info = RasterInfo::new(&mut mask, 0, 0, 8);
            mask_worker(&mut info, &1.0, 2, 1.0, 4, 1.0);
        }
        assert_eq!(mask.get(2), 1.0);
        assert_eq!(mask.get(3), 1.0);
    }
}
