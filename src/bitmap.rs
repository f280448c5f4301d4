use egui::{Color32, ColorImage, Rect, Vec2};
use image::{RgbaImage, imageops::FilterType};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tiny_skia::{ColorU8, Pixmap, PixmapPaint, Transform};

use crate::error::{CanvasError, CanvasResult};

// Static counter for generating unique IDs
static NEXT_BITMAP_ID: AtomicUsize = AtomicUsize::new(1);

/// Fixed-size opaque RGBA raster.
///
/// Once a bitmap leaves the renderer it is never mutated again; every edit
/// produces a new one with a fresh id, so snapshots can be shared freely
/// between the canvas and its history.
#[derive(Clone)]
pub struct Bitmap {
    id: usize,
    pixmap: Pixmap,
}

// Define a reference-counted type alias for Bitmap
pub type BitmapRef = Arc<Bitmap>;

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

pub(crate) fn allocate(width: u32, height: u32) -> CanvasResult<Pixmap> {
    Pixmap::new(width, height).ok_or(CanvasError::ResourceExhausted { width, height })
}

pub(crate) fn skia_color(color: Color32) -> tiny_skia::Color {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    tiny_skia::Color::from_rgba8(r, g, b, a)
}

impl Bitmap {
    pub(crate) fn from_pixmap(pixmap: Pixmap) -> Self {
        let id = NEXT_BITMAP_ID.fetch_add(1, Ordering::SeqCst);
        Self { id, pixmap }
    }

    /// Creates a bitmap filled with `background`
    pub fn blank(width: u32, height: u32, background: Color32) -> CanvasResult<Self> {
        let mut pixmap = allocate(width, height)?;
        pixmap.fill(skia_color(background));
        Ok(Self::from_pixmap(pixmap))
    }

    /// Builds a `width`x`height` bitmap from a decoded image.
    ///
    /// The image is stretched to the requested size when it differs and is
    /// composited over `background`, so transparent areas come out opaque.
    pub fn from_rgba_image(
        image: &RgbaImage,
        width: u32,
        height: u32,
        background: Color32,
    ) -> CanvasResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CanvasError::InvalidImage(format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }

        let resized;
        let source = if image.dimensions() == (width, height) {
            image
        } else {
            log::debug!(
                "Resizing initial image from {}x{} to {}x{}",
                image.width(),
                image.height(),
                width,
                height
            );
            resized = image::imageops::resize(image, width, height, FilterType::Triangle);
            &resized
        };

        let mut overlay = allocate(width, height)?;
        for (dst, src) in overlay.pixels_mut().iter_mut().zip(source.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }

        let mut pixmap = allocate(width, height)?;
        pixmap.fill(skia_color(background));
        pixmap.draw_pixmap(
            0,
            0,
            overlay.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(Self::from_pixmap(pixmap))
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width() as f32, self.height() as f32)
    }

    pub(crate) fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Only for rasters still private to the renderer
    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Colour at `(x, y)`, or `None` outside the raster
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color32> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some(Color32::from_rgba_unmultiplied(
            c.red(),
            c.green(),
            c.blue(),
            c.alpha(),
        ))
    }

    /// Whether both bitmaps hold exactly the same pixels
    pub fn same_pixels(&self, other: &Bitmap) -> bool {
        self.width() == other.width()
            && self.height() == other.height()
            && self.pixmap.data() == other.pixmap.data()
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        let width = self.width();
        let pixels = self.pixmap.pixels();
        RgbaImage::from_fn(width, self.height(), |x, y| {
            let c = pixels[(y * width + x) as usize].demultiply();
            image::Rgba([c.red(), c.green(), c.blue(), c.alpha()])
        })
    }

    /// Texture-ready copy for display in egui
    pub fn to_color_image(&self) -> ColorImage {
        // Bitmaps are opaque, so premultiplied bytes equal straight ones
        ColorImage::from_rgba_unmultiplied(
            [self.width() as usize, self.height() as usize],
            self.pixmap.data(),
        )
    }

    /// Copy of the pixels under `region`, widened to whole pixels and clipped
    /// to the raster, together with its top-left corner. `None` when nothing
    /// of `region` lies on the raster.
    pub fn region_to_color_image(&self, region: Rect) -> Option<([usize; 2], ColorImage)> {
        let x0 = region.min.x.floor().max(0.0) as u32;
        let y0 = region.min.y.floor().max(0.0) as u32;
        let x1 = (region.max.x.ceil().max(0.0) as u32).min(self.width());
        let y1 = (region.max.y.ceil().max(0.0) as u32).min(self.height());
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        let stride = self.width() as usize * 4;
        let row_len = (x1 - x0) as usize * 4;
        let data = self.pixmap.data();
        let mut bytes = Vec::with_capacity(row_len * (y1 - y0) as usize);
        for y in y0..y1 {
            let start = y as usize * stride + x0 as usize * 4;
            bytes.extend_from_slice(&data[start..start + row_len]);
        }
        let size = [(x1 - x0) as usize, (y1 - y0) as usize];
        Some((
            [x0 as usize, y0 as usize],
            ColorImage::from_rgba_unmultiplied(size, &bytes),
        ))
    }
}
