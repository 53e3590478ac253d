//! Document building: pages and image draws, serialised to PDF at the end.
//!
//! `printpdf` documents are reference-counted internally and cannot cross
//! threads, so [`PdfCanvas`] only records what to draw. [`PdfCanvas::finish`]
//! builds and serialises the real document on the blocking pool in one go.

use crate::config::PageSize;
use crate::error::Img2PdfError;
use crate::layout::PageLayout;
use crate::pipeline::decode::{PageImage, PixelData, PixelEncoding};
use printpdf::lopdf::{Dictionary, Object};
use printpdf::{
    ColorBits, ColorSpace, Image, ImageFilter, ImageTransform, ImageXObject, Mm, PdfDocument, Pt,
    Px,
};
use tracing::debug;

/// The operations the assembler needs from a document under construction.
///
/// A fresh canvas already has one blank page; the assembler calls
/// [`new_page`](DocumentCanvas::new_page) before every image except the
/// first.
pub trait DocumentCanvas: Send {
    fn new_page(&mut self) -> Result<(), Img2PdfError>;

    fn draw_image(&mut self, image: PageImage, layout: PageLayout) -> Result<(), Img2PdfError>;

    fn page_count(&self) -> usize;
}

/// One recorded draw.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub image: PageImage,
    pub layout: PageLayout,
}

/// Canvas that produces a PDF with `printpdf`.
#[derive(Debug)]
pub struct PdfCanvas {
    page_size: PageSize,
    title: String,
    pages: Vec<Vec<DrawCall>>,
}

impl PdfCanvas {
    pub fn new(page_size: PageSize, title: impl Into<String>) -> Self {
        Self {
            page_size,
            title: title.into(),
            pages: vec![Vec::new()],
        }
    }

    /// Build the document and serialise it.
    pub async fn finish(self) -> Result<Vec<u8>, Img2PdfError> {
        tokio::task::spawn_blocking(move || self.render())
            .await
            .map_err(|e| Img2PdfError::Internal(format!("PDF task panicked: {e}")))?
    }

    /// Blocking body of [`finish`](Self::finish).
    pub fn render(self) -> Result<Vec<u8>, Img2PdfError> {
        let page_w = self.page_size.width();
        let page_h = self.page_size.height();
        let width = Mm::from(Pt(page_w as f32));
        let height = Mm::from(Pt(page_h as f32));

        let (doc, first_page, first_layer) =
            PdfDocument::new(self.title.as_str(), width, height, "Page 1");
        let doc = doc
            .with_title(self.title.as_str())
            .with_creator(concat!("img2pdf ", env!("CARGO_PKG_VERSION")))
            .with_producer(concat!("img2pdf ", env!("CARGO_PKG_VERSION")));

        for (index, draws) in self.pages.into_iter().enumerate() {
            let (page, layer) = if index == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(width, height, format!("Page {}", index + 1))
            };
            let page = doc.get_page(page);
            page.extend_with(page_boxes(page_w, page_h));
            let layer = page.get_layer(layer);

            for draw in draws {
                let transform = image_transform(&draw, page_h);
                Image::from(xobject(draw.image)).add_to_layer(layer.clone(), transform);
            }
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| Img2PdfError::Assembly(format!("PDF serialisation failed: {e}")))?;
        debug!("Serialised PDF: {} bytes", bytes.len());
        Ok(bytes)
    }
}

impl DocumentCanvas for PdfCanvas {
    fn new_page(&mut self) -> Result<(), Img2PdfError> {
        self.pages.push(Vec::new());
        Ok(())
    }

    fn draw_image(&mut self, image: PageImage, layout: PageLayout) -> Result<(), Img2PdfError> {
        if image.width_px == 0 || image.height_px == 0 {
            return Err(Img2PdfError::Assembly("cannot draw an empty image".into()));
        }
        let page = self
            .pages
            .last_mut()
            .ok_or_else(|| Img2PdfError::Internal("canvas has no page".into()))?;
        page.push(DrawCall { image, layout });
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Page boxes in exact points.
///
/// printpdf stores page sizes as millimetres in `f32`, which turns 595 pt
/// into 595.0004 pt; these entries replace the converted ones.
fn page_boxes(page_width: f64, page_height: f64) -> Dictionary {
    let rect = || {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page_width as f32),
            Object::Real(page_height as f32),
        ])
    };
    let mut boxes = Dictionary::new();
    boxes.set("MediaBox", rect());
    boxes.set("TrimBox", rect());
    boxes.set("CropBox", rect());
    boxes
}

/// Image positions still pass through `Mm`, so they can be off by a few
/// thousandths of a point.
///
/// At 72 dpi one pixel is one point, so the scale factor is simply the
/// placed size over the pixel size. PDF's origin is bottom-left.
fn image_transform(draw: &DrawCall, page_height: f64) -> ImageTransform {
    let layout = draw.layout;
    ImageTransform {
        translate_x: Some(Mm::from(Pt(layout.x as f32))),
        translate_y: Some(Mm::from(Pt(layout.bottom(page_height) as f32))),
        scale_x: Some((layout.width / f64::from(draw.image.width_px)) as f32),
        scale_y: Some((layout.height / f64::from(draw.image.height_px)) as f32),
        dpi: Some(72.0),
        ..Default::default()
    }
}

fn xobject(image: PageImage) -> ImageXObject {
    let (color_space, image_filter) = match image.encoding {
        PixelEncoding::Rgb8 => (ColorSpace::Rgb, None),
        PixelEncoding::JpegRgb => (ColorSpace::Rgb, Some(ImageFilter::DCT)),
        PixelEncoding::JpegGray => (ColorSpace::Greyscale, Some(ImageFilter::DCT)),
    };
    ImageXObject {
        width: Px(image.width_px as usize),
        height: Px(image.height_px as usize),
        color_space,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: image.data.into_vec(),
        image_filter,
        smask: None,
        clipping_bbox: None,
    }
}

/// Canvas that only records pages and draws.
///
/// Produces the same page structure as [`PdfCanvas`] without serialising
/// anything; useful to check geometry.
#[derive(Debug)]
pub struct RecordingCanvas {
    pub pages: Vec<Vec<DrawCall>>,
}

impl Default for RecordingCanvas {
    fn default() -> Self {
        Self {
            pages: vec![Vec::new()],
        }
    }
}

impl DocumentCanvas for RecordingCanvas {
    fn new_page(&mut self) -> Result<(), Img2PdfError> {
        self.pages.push(Vec::new());
        Ok(())
    }

    fn draw_image(&mut self, image: PageImage, layout: PageLayout) -> Result<(), Img2PdfError> {
        if let Some(page) = self.pages.last_mut() {
            page.push(DrawCall { image, layout });
        }
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red(width: u32, height: u32) -> PageImage {
        PageImage {
            width_px: width,
            height_px: height,
            encoding: PixelEncoding::Rgb8,
            data: PixelData::Owned(vec![255u8, 0, 0].repeat((width * height) as usize)),
        }
    }

    fn layout(x: f64, y: f64, w: f64, h: f64) -> PageLayout {
        PageLayout {
            x,
            y,
            width: w,
            height: h,
        }
    }

    #[test]
    fn transform_flips_y_and_scales_to_layout() {
        let draw = DrawCall {
            image: red(400, 300),
            layout: layout(20.0, 212.875, 555.0, 416.25),
        };
        let t = image_transform(&draw, 842.0);
        assert_eq!(t.dpi, Some(72.0));
        assert!((t.scale_x.unwrap() - 555.0 / 400.0).abs() < 1e-6);
        assert!((t.scale_y.unwrap() - 416.25 / 300.0).abs() < 1e-6);
        let bottom_pt = t.translate_y.unwrap().into_pt().0;
        assert!((bottom_pt - 212.875).abs() < 0.01, "got {bottom_pt}");
    }

    #[test]
    fn jpeg_pixels_keep_the_dct_filter() {
        let jpeg = PageImage {
            encoding: PixelEncoding::JpegGray,
            ..red(2, 2)
        };
        let x = xobject(jpeg);
        assert!(matches!(x.image_filter, Some(ImageFilter::DCT)));
        assert!(matches!(x.color_space, ColorSpace::Greyscale));
    }

    #[test]
    fn canvas_starts_with_one_page() {
        let mut canvas = PdfCanvas::new(PageSize::A4, "t");
        assert_eq!(canvas.page_count(), 1);
        canvas.new_page().unwrap();
        assert_eq!(canvas.page_count(), 2);
    }

    #[tokio::test]
    async fn finish_produces_a_pdf() {
        let mut canvas = PdfCanvas::new(PageSize::A4, "Test");
        canvas
            .draw_image(red(4, 4), layout(295.5, 419.0, 4.0, 4.0))
            .unwrap();
        canvas.new_page().unwrap();
        canvas
            .draw_image(red(8, 2), layout(293.5, 420.0, 8.0, 2.0))
            .unwrap();

        let bytes = canvas.finish().await.unwrap();
        assert!(bytes.starts_with(b"%PDF-"));

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[tokio::test]
    async fn media_box_is_exact_in_points() {
        let mut canvas = PdfCanvas::new(PageSize::A4, "Boxes");
        canvas.new_page().unwrap();
        let bytes = canvas.finish().await.unwrap();

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        for (_, page_id) in doc.get_pages() {
            let page = doc.get_dictionary(page_id).unwrap();
            let media_box: Vec<f32> = page
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(|o| o.as_float().unwrap())
                .collect();
            assert_eq!(media_box, [0.0, 0.0, 595.0, 842.0]);
        }
    }

    #[test]
    fn recording_canvas_keeps_draw_order() {
        let mut canvas = RecordingCanvas::default();
        canvas.draw_image(red(1, 1), layout(0.0, 0.0, 1.0, 1.0)).unwrap();
        canvas.new_page().unwrap();
        canvas.draw_image(red(2, 2), layout(0.0, 0.0, 2.0, 2.0)).unwrap();
        assert_eq!(canvas.pages.len(), 2);
        assert_eq!(canvas.pages[1][0].image.width_px, 2);
    }
}
