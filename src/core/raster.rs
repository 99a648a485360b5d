//! Rasters: rectangular blocks of pixel samples with an explicit origin.
//!
//! A [`Raster`] is a cheap, immutable view: a rectangle in some coordinate
//! space plus a shared handle to sample storage. Re-origining a raster or
//! taking a sub-view never copies samples, so operators that only change the
//! coordinate interpretation of their input can hand back upstream storage.
//!
//! Writes go through [`WritableRaster`], which owns its buffer, and
//! [`RasterMut`], a borrowed writable view that can itself be re-origined.

use crate::core::error::{RasterError, RasterResult};
use crate::core::geometry::Rect;
use crate::core::layout::SampleLayout;
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::fmt;
use std::sync::Arc;

/// Offset into a pixel-interleaved buffer covering `storage`.
///
/// A re-origined storage rectangle may sit partly outside the `i32` range,
/// so its corner is kept modulo 2^32. `(x, y)` always lies inside it, which
/// makes the wrapped differences exact.
fn sample_index(storage: &Rect, bands: usize, x: i32, y: i32) -> usize {
    let row = y.wrapping_sub(storage.y) as u32 as usize;
    let col = x.wrapping_sub(storage.x) as u32 as usize;
    (row * storage.width as usize + col) * bands
}

fn check_bounds(bounds: &Rect) -> RasterResult<()> {
    if bounds.is_empty() {
        return Err(RasterError::invalid(format!("raster bounds {} are empty", bounds)));
    }
    if !bounds.is_representable() {
        return Err(RasterError::invalid(format!(
            "raster bounds {} end past the coordinate range",
            bounds
        )));
    }
    Ok(())
}

/// An immutable raster view over shared sample storage.
#[derive(Clone)]
pub struct Raster {
    bounds: Rect,
    layout: SampleLayout,
    storage: Arc<[u8]>,
    /// Rectangle covered by `storage`, in this raster's coordinates.
    storage_rect: Rect,
}

impl Raster {
    /// Wrap `data` (row-major, pixel-interleaved) as a raster covering
    /// `bounds`.
    pub fn new(bounds: Rect, layout: SampleLayout, data: Vec<u8>) -> RasterResult<Self> {
        check_bounds(&bounds)?;
        let expected = layout.buffer_len(bounds.width, bounds.height);
        if data.len() != expected {
            return Err(RasterError::invalid(format!(
                "raster {} needs {} samples, got {}",
                bounds,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            bounds,
            layout,
            storage: data.into(),
            storage_rect: bounds,
        })
    }

    /// A raster where every pixel holds `samples`.
    pub fn filled(bounds: Rect, layout: SampleLayout, samples: &[u8]) -> RasterResult<Self> {
        Ok(WritableRaster::filled(bounds, layout, samples)?.into_raster())
    }

    /// Rectangle covered by this view.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Minimum x coordinate.
    pub fn min_x(&self) -> i32 {
        self.bounds.x
    }

    /// Minimum y coordinate.
    pub fn min_y(&self) -> i32 {
        self.bounds.y
    }

    /// Width in pixels.
    pub fn width(&self) -> i32 {
        self.bounds.width
    }

    /// Height in pixels.
    pub fn height(&self) -> i32 {
        self.bounds.height
    }

    /// Sample layout.
    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    /// A view of the same samples whose minimum corner is `(x, y)`.
    pub fn translated_child(&self, x: i32, y: i32) -> Raster {
        let dx = x.wrapping_sub(self.bounds.x);
        let dy = y.wrapping_sub(self.bounds.y);
        Raster {
            bounds: Rect::new(x, y, self.bounds.width, self.bounds.height),
            layout: self.layout,
            storage: Arc::clone(&self.storage),
            storage_rect: self.storage_rect.wrapping_translated(dx, dy),
        }
    }

    /// A view restricted to `rect`, which must lie inside this raster.
    pub fn child(&self, rect: Rect) -> RasterResult<Raster> {
        if !self.bounds.contains_rect(&rect) {
            return Err(RasterError::RegionOutOfBounds {
                region: rect,
                bounds: self.bounds,
            });
        }
        Ok(Raster {
            bounds: rect,
            ..self.clone()
        })
    }

    /// Samples of the pixel at `(x, y)`.
    pub fn pixel(&self, x: i32, y: i32) -> RasterResult<&[u8]> {
        if !self.bounds.contains(x, y) {
            return Err(RasterError::RegionOutOfBounds {
                region: Rect::new(x, y, 1, 1),
                bounds: self.bounds,
            });
        }
        let bands = self.layout.bands();
        let start = sample_index(&self.storage_rect, bands, x, y);
        Ok(&self.storage[start..start + bands])
    }

    /// Samples for the span `[x0, x1)` of row `y`. Caller guarantees the span
    /// lies inside the bounds.
    fn span(&self, y: i32, x0: i32, x1: i32) -> &[u8] {
        let bands = self.layout.bands();
        let start = sample_index(&self.storage_rect, bands, x0, y);
        &self.storage[start..start + (x1 - x0) as usize * bands]
    }

    /// Iterate rows of this view, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (self.bounds.min_y()..self.bounds.max_y())
            .map(move |y| self.span(y, self.bounds.min_x(), self.bounds.max_x()))
    }

    /// Contiguous copy of the samples inside the bounds.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.layout.buffer_len(self.width(), self.height()));
        for row in self.rows() {
            out.extend_from_slice(row);
        }
        out
    }

    /// Whether both views are backed by the same storage.
    pub fn shares_storage(&self, other: &Raster) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Same bounds, same layout and identical samples.
    pub fn samples_equal(&self, other: &Raster) -> bool {
        self.bounds == other.bounds
            && self.layout == other.layout
            && self.rows().zip(other.rows()).all(|(a, b)| a == b)
    }

    /// Copy into a freshly owned writable raster.
    pub fn to_writable(&self) -> WritableRaster {
        WritableRaster {
            bounds: self.bounds,
            layout: self.layout,
            data: self.to_vec(),
        }
    }

    /// Wrap a decoded image, placing its top-left pixel at `(x, y)`.
    ///
    /// The image is converted to 8-bit RGBA.
    pub fn from_image(image: &DynamicImage, x: i32, y: i32) -> RasterResult<Raster> {
        let (width, height) = image.dimensions();
        let bounds = Rect::new(x, y, width as i32, height as i32);
        Raster::new(bounds, SampleLayout::RGBA, image.to_rgba8().into_raw())
    }

    /// Convert to an 8-bit RGBA image. Gray bands are replicated and a
    /// missing alpha band becomes opaque.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let bands = self.layout.bands();
        let mut out = Vec::with_capacity(self.width() as usize * self.height() as usize * 4);
        for row in self.rows() {
            for px in row.chunks_exact(bands) {
                let rgba = match bands {
                    1 => [px[0], px[0], px[0], 255],
                    2 => [px[0], px[0], px[0], px[1]],
                    3 => [px[0], px[1], px[2], 255],
                    _ => [px[0], px[1], px[2], px[3]],
                };
                out.extend_from_slice(&rgba);
            }
        }
        // Dimensions and buffer length agree by construction.
        RgbaImage::from_raw(self.width() as u32, self.height() as u32, out)
            .unwrap_or_else(|| RgbaImage::new(self.width() as u32, self.height() as u32))
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("bounds", &self.bounds)
            .field("layout", &self.layout)
            .field("storage_rect", &self.storage_rect)
            .finish()
    }
}

/// A raster that owns its samples and may be written.
#[derive(Clone)]
pub struct WritableRaster {
    bounds: Rect,
    layout: SampleLayout,
    data: Vec<u8>,
}

impl WritableRaster {
    /// A zero-filled raster covering `bounds`.
    pub fn new(bounds: Rect, layout: SampleLayout) -> RasterResult<Self> {
        check_bounds(&bounds)?;
        Ok(Self {
            bounds,
            layout,
            data: vec![0; layout.buffer_len(bounds.width, bounds.height)],
        })
    }

    /// A raster where every pixel holds `samples`.
    pub fn filled(bounds: Rect, layout: SampleLayout, samples: &[u8]) -> RasterResult<Self> {
        let mut raster = Self::new(bounds, layout)?;
        raster.as_mut().fill(samples)?;
        Ok(raster)
    }

    /// Rectangle covered.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Sample layout.
    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    /// Samples of the pixel at `(x, y)`.
    pub fn pixel(&self, x: i32, y: i32) -> RasterResult<&[u8]> {
        if !self.bounds.contains(x, y) {
            return Err(RasterError::RegionOutOfBounds {
                region: Rect::new(x, y, 1, 1),
                bounds: self.bounds,
            });
        }
        let bands = self.layout.bands();
        let start = sample_index(&self.bounds, bands, x, y);
        Ok(&self.data[start..start + bands])
    }

    /// Borrow as a writable view in this raster's own coordinates.
    pub fn as_mut(&mut self) -> RasterMut<'_> {
        RasterMut {
            bounds: self.bounds,
            layout: self.layout,
            storage_rect: self.bounds,
            data: &mut self.data,
        }
    }

    /// Freeze into an immutable raster without copying.
    pub fn into_raster(self) -> Raster {
        Raster {
            bounds: self.bounds,
            layout: self.layout,
            storage: self.data.into(),
            storage_rect: self.bounds,
        }
    }
}

impl fmt::Debug for WritableRaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WritableRaster")
            .field("bounds", &self.bounds)
            .field("layout", &self.layout)
            .finish()
    }
}

/// A borrowed writable view over a [`WritableRaster`]'s samples.
pub struct RasterMut<'a> {
    bounds: Rect,
    layout: SampleLayout,
    storage_rect: Rect,
    data: &'a mut [u8],
}

impl<'a> RasterMut<'a> {
    /// Rectangle covered by this view.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Sample layout.
    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    /// A writable view of the same samples whose minimum corner is `(x, y)`.
    pub fn translated_child(&mut self, x: i32, y: i32) -> RasterMut<'_> {
        let dx = x.wrapping_sub(self.bounds.x);
        let dy = y.wrapping_sub(self.bounds.y);
        RasterMut {
            bounds: Rect::new(x, y, self.bounds.width, self.bounds.height),
            layout: self.layout,
            storage_rect: self.storage_rect.wrapping_translated(dx, dy),
            data: &mut *self.data,
        }
    }

    /// A writable view restricted to `rect`, which must lie inside this view.
    pub fn child(&mut self, rect: Rect) -> RasterResult<RasterMut<'_>> {
        if !self.bounds.contains_rect(&rect) {
            return Err(RasterError::RegionOutOfBounds {
                region: rect,
                bounds: self.bounds,
            });
        }
        Ok(RasterMut {
            bounds: rect,
            layout: self.layout,
            storage_rect: self.storage_rect,
            data: &mut *self.data,
        })
    }

    /// Samples of the pixel at `(x, y)`.
    pub fn pixel(&self, x: i32, y: i32) -> RasterResult<&[u8]> {
        if !self.bounds.contains(x, y) {
            return Err(RasterError::RegionOutOfBounds {
                region: Rect::new(x, y, 1, 1),
                bounds: self.bounds,
            });
        }
        let bands = self.layout.bands();
        let start = sample_index(&self.storage_rect, bands, x, y);
        Ok(&self.data[start..start + bands])
    }

    /// Overwrite the pixel at `(x, y)`.
    pub fn set_pixel(&mut self, x: i32, y: i32, samples: &[u8]) -> RasterResult<()> {
        self.check_samples(samples)?;
        if !self.bounds.contains(x, y) {
            return Err(RasterError::RegionOutOfBounds {
                region: Rect::new(x, y, 1, 1),
                bounds: self.bounds,
            });
        }
        let start = sample_index(&self.storage_rect, samples.len(), x, y);
        self.data[start..start + samples.len()].copy_from_slice(samples);
        Ok(())
    }

    /// Mutable samples for the span `[x0, x1)` of row `y`.
    fn span_mut(&mut self, y: i32, x0: i32, x1: i32) -> &mut [u8] {
        let bands = self.layout.bands();
        let start = sample_index(&self.storage_rect, bands, x0, y);
        &mut self.data[start..start + (x1 - x0) as usize * bands]
    }

    /// Set every pixel in the view to `samples`.
    pub fn fill(&mut self, samples: &[u8]) -> RasterResult<()> {
        let bounds = self.bounds;
        self.fill_rect(bounds, samples)
    }

    /// Set every pixel in the overlap of `rect` and the view to `samples`.
    pub fn fill_rect(&mut self, rect: Rect, samples: &[u8]) -> RasterResult<()> {
        self.check_samples(samples)?;
        let Some(overlap) = self.bounds.intersection(&rect) else {
            return Ok(());
        };
        for y in overlap.min_y()..overlap.max_y() {
            for px in self
                .span_mut(y, overlap.min_x(), overlap.max_x())
                .chunks_exact_mut(samples.len())
            {
                px.copy_from_slice(samples);
            }
        }
        Ok(())
    }

    /// Apply `f` to the samples of every pixel in the view, row by row.
    pub fn for_each_pixel_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut [u8]),
    {
        let bands = self.layout.bands();
        let bounds = self.bounds;
        for y in bounds.min_y()..bounds.max_y() {
            for px in self
                .span_mut(y, bounds.min_x(), bounds.max_x())
                .chunks_exact_mut(bands)
            {
                f(px);
            }
        }
    }

    /// Copy the overlap of `src` and this view into this view.
    ///
    /// Pixels outside the overlap are left untouched. Returns the rectangle
    /// that was written, `None` when the two do not overlap.
    pub fn set_rect(&mut self, src: &Raster) -> RasterResult<Option<Rect>> {
        if src.layout() != self.layout {
            return Err(RasterError::LayoutMismatch {
                expected: self.layout,
                got: src.layout(),
            });
        }
        let Some(overlap) = self.bounds.intersection(&src.bounds()) else {
            return Ok(None);
        };
        for y in overlap.min_y()..overlap.max_y() {
            let row = src.span(y, overlap.min_x(), overlap.max_x());
            self.span_mut(y, overlap.min_x(), overlap.max_x())
                .copy_from_slice(row);
        }
        Ok(Some(overlap))
    }

    fn check_samples(&self, samples: &[u8]) -> RasterResult<()> {
        if samples.len() != self.layout.bands() {
            let got = SampleLayout::new(samples.len()).ok_or_else(|| {
                RasterError::invalid(format!("{} samples do not form a pixel", samples.len()))
            })?;
            return Err(RasterError::LayoutMismatch {
                expected: self.layout,
                got,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for RasterMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterMut")
            .field("bounds", &self.bounds)
            .field("layout", &self.layout)
            .field("storage_rect", &self.storage_rect)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(bounds: Rect) -> Raster {
        let mut data = Vec::new();
        for y in 0..bounds.height {
            for x in 0..bounds.width {
                data.push((y * bounds.width + x) as u8);
            }
        }
        Raster::new(bounds, SampleLayout::GRAY, data).unwrap()
    }

    #[test]
    fn test_new_checks_length() {
        let err = Raster::new(Rect::new(0, 0, 2, 2), SampleLayout::RGB, vec![0; 11]);
        assert!(matches!(err, Err(RasterError::InvalidConstruction { .. })));
        assert!(Raster::new(Rect::new(0, 0, 0, 2), SampleLayout::GRAY, vec![]).is_err());
    }

    #[test]
    fn test_translated_child_shares_storage() {
        let r = gradient(Rect::new(0, 0, 4, 4));
        let moved = r.translated_child(100, -50);
        assert_eq!(moved.bounds(), Rect::new(100, -50, 4, 4));
        assert!(moved.shares_storage(&r));
        assert_eq!(moved.pixel(101, -49).unwrap(), r.pixel(1, 1).unwrap());
        assert!(moved.pixel(0, 0).is_err());
    }

    #[test]
    fn test_child_view() {
        let r = gradient(Rect::new(10, 10, 4, 4));
        let sub = r.child(Rect::new(11, 12, 2, 2)).unwrap();
        assert_eq!(sub.to_vec(), vec![9, 10, 13, 14]);
        assert!(sub.shares_storage(&r));
        assert!(r.child(Rect::new(11, 12, 4, 2)).is_err());
    }

    #[test]
    fn test_rejects_unrepresentable_bounds() {
        let bounds = Rect::new(i32::MAX - 5, 0, 10, 1);
        assert!(matches!(
            Raster::new(bounds, SampleLayout::GRAY, vec![0; 10]),
            Err(RasterError::InvalidConstruction { .. })
        ));
        assert!(matches!(
            WritableRaster::new(Rect::new(0, i32::MAX, 1, 1), SampleLayout::GRAY),
            Err(RasterError::InvalidConstruction { .. })
        ));
    }

    #[test]
    fn test_reorigin_to_coordinate_limits() {
        let r = gradient(Rect::new(0, 0, 4, 4));
        // Storage to the right of the sub-view ends up past i32::MAX.
        let sub = r.child(Rect::new(0, 0, 2, 4)).unwrap();
        let far = sub.translated_child(i32::MAX - 2, i32::MIN);
        assert_eq!(far.bounds(), Rect::new(i32::MAX - 2, i32::MIN, 2, 4));
        assert_eq!(far.pixel(i32::MAX - 1, i32::MIN + 3).unwrap(), r.pixel(1, 3).unwrap());

        let back = far.translated_child(0, 0);
        assert!(back.samples_equal(&sub));

        let mut out = WritableRaster::new(Rect::new(0, 0, 4, 4), SampleLayout::GRAY).unwrap();
        let mut view = out.as_mut();
        let mut shifted = view.translated_child(i32::MIN, i32::MAX - 4);
        shifted.set_pixel(i32::MIN + 3, i32::MAX - 1, &[7]).unwrap();
        assert_eq!(out.pixel(3, 3).unwrap(), &[7]);
    }

    #[test]
    fn test_translated_child_of_child() {
        let r = gradient(Rect::new(0, 0, 4, 4));
        let sub = r.child(Rect::new(2, 2, 2, 2)).unwrap().translated_child(0, 0);
        assert_eq!(sub.to_vec(), vec![10, 11, 14, 15]);
    }

    #[test]
    fn test_set_rect_writes_overlap_only() {
        let mut dst = WritableRaster::filled(Rect::new(0, 0, 4, 4), SampleLayout::GRAY, &[9]).unwrap();
        let src = Raster::filled(Rect::new(2, 2, 4, 4), SampleLayout::GRAY, &[1]).unwrap();
        let written = dst.as_mut().set_rect(&src).unwrap();
        assert_eq!(written, Some(Rect::new(2, 2, 2, 2)));
        assert_eq!(dst.pixel(1, 1).unwrap(), &[9]);
        assert_eq!(dst.pixel(2, 2).unwrap(), &[1]);
        assert_eq!(dst.pixel(3, 3).unwrap(), &[1]);
    }

    #[test]
    fn test_set_rect_layout_mismatch() {
        let mut dst = WritableRaster::new(Rect::new(0, 0, 2, 2), SampleLayout::RGBA).unwrap();
        let src = Raster::filled(Rect::new(0, 0, 2, 2), SampleLayout::GRAY, &[1]).unwrap();
        assert!(matches!(
            dst.as_mut().set_rect(&src),
            Err(RasterError::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn test_writable_translated_child() {
        let mut dst = WritableRaster::new(Rect::new(100, 200, 3, 3), SampleLayout::GRAY).unwrap();
        {
            let mut view = dst.as_mut();
            let mut shifted = view.translated_child(0, 0);
            shifted.set_pixel(1, 2, &[42]).unwrap();
        }
        assert_eq!(dst.pixel(101, 202).unwrap(), &[42]);
    }

    #[test]
    fn test_into_raster_and_back() {
        let w = WritableRaster::filled(Rect::new(-3, -3, 2, 2), SampleLayout::RGB, &[1, 2, 3]).unwrap();
        let r = w.into_raster();
        assert_eq!(r.pixel(-2, -2).unwrap(), &[1, 2, 3]);
        let copy = r.to_writable().into_raster();
        assert!(copy.samples_equal(&r));
        assert!(!copy.shares_storage(&r));
    }

    #[test]
    fn test_to_rgba_image_expands_gray() {
        let r = Raster::filled(Rect::new(5, 5, 2, 1), SampleLayout::GRAY, &[7]).unwrap();
        let img = r.to_rgba_image();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(1, 0).0, [7, 7, 7, 255]);
    }

    #[test]
    fn test_from_image_places_origin() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 4])));
        let r = Raster::from_image(&img, -10, 40).unwrap();
        assert_eq!(r.bounds(), Rect::new(-10, 40, 3, 2));
        assert_eq!(r.pixel(-8, 41).unwrap(), &[1, 2, 3, 4]);
    }
}
