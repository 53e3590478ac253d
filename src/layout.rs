//! Page layout: where one image goes on one page.
//!
//! Images are never upscaled. An image wider than the usable area is first
//! scaled down to the usable width; if it is then still taller than the
//! usable height it is scaled again to the usable height. The result is
//! centred on the full page, so the margin is a minimum, not a fixed offset.

use crate::config::PageSize;
use serde::{Deserialize, Serialize};

/// Intrinsic size of a decoded image, in pixels (one pixel maps to one point).
///
/// Both dimensions are finite and strictly positive; an image that failed to
/// decode has no `ImageSize` and can never reach [`fit_to_page`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    width: f64,
    height: f64,
}

impl ImageSize {
    pub fn new(width: f64, height: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        (valid(width) && valid(height)).then_some(Self { width, height })
    }

    pub fn from_pixels(width: u32, height: u32) -> Option<Self> {
        Self::new(f64::from(width), f64::from(height))
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Placement rectangle of an image on a page, in points.
///
/// `x`/`y` locate the top-left corner, measured from the page's top-left
/// corner. PDF canvases flip `y` when drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageLayout {
    /// Distance from the page's bottom edge to the image's bottom edge.
    pub fn bottom(&self, page_height: f64) -> f64 {
        page_height - self.y - self.height
    }
}

/// Fit an image inside the margin box of a page and centre it.
///
/// `margin * 2` must be smaller than both page dimensions;
/// [`crate::config::ConversionConfigBuilder::build`] enforces this.
pub fn fit_to_page(image: ImageSize, page: PageSize, margin: f64) -> PageLayout {
    let (page_width, page_height) = (page.width(), page.height());
    let max_width = page_width - 2.0 * margin;
    let max_height = page_height - 2.0 * margin;

    let mut width = image.width;
    let mut height = image.height;

    if width > max_width {
        height = height * max_width / width;
        width = max_width;
    }

    if height > max_height {
        width = width * max_height / height;
        height = max_height;
    }

    PageLayout {
        x: (page_width - width) / 2.0,
        y: (page_height - height) / 2.0,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const A4: PageSize = PageSize::A4;

    fn size(w: f64, h: f64) -> ImageSize {
        ImageSize::new(w, h).unwrap()
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert!(ImageSize::new(0.0, 10.0).is_none());
        assert!(ImageSize::new(10.0, -1.0).is_none());
        assert!(ImageSize::new(f64::NAN, 10.0).is_none());
        assert!(ImageSize::from_pixels(0, 0).is_none());
    }

    #[test]
    fn landscape_photo_is_fitted_to_width() {
        let l = fit_to_page(size(4000.0, 3000.0), A4, 20.0);
        assert_eq!(l.width, 555.0);
        assert_eq!(l.height, 416.25);
        assert_eq!(l.x, 20.0);
        assert_eq!(l.y, (842.0 - 416.25) / 2.0);
    }

    #[test]
    fn small_image_is_only_centred() {
        let l = fit_to_page(size(300.0, 300.0), A4, 20.0);
        assert_eq!(
            l,
            PageLayout {
                x: 147.5,
                y: 271.0,
                width: 300.0,
                height: 300.0
            }
        );
    }

    #[test]
    fn tall_image_is_fitted_to_height() {
        // 500 wide fits, 2000 tall does not: only the second step applies.
        let l = fit_to_page(size(500.0, 2000.0), A4, 20.0);
        assert_eq!(l.height, 802.0);
        assert_eq!(l.width, 500.0 * 802.0 / 2000.0);
        assert_eq!(l.y, 20.0);
    }

    #[test]
    fn both_steps_apply_to_a_huge_portrait() {
        let l = fit_to_page(size(1000.0, 10000.0), A4, 20.0);
        assert!(l.width <= 555.0 && l.height <= 802.0);
        assert!((l.width / l.height - 0.1).abs() < 1e-9);
    }

    #[test]
    fn bottom_flips_the_y_axis() {
        let l = fit_to_page(size(300.0, 300.0), A4, 20.0);
        assert_eq!(l.bottom(842.0), 271.0);
    }

    proptest! {
        #[test]
        fn fitting_images_are_untouched(w in 1.0f64..=555.0, h in 1.0f64..=802.0) {
            let l = fit_to_page(size(w, h), A4, 20.0);
            prop_assert_eq!(l.width, w);
            prop_assert_eq!(l.height, h);
            prop_assert_eq!(l.x, (595.0 - w) / 2.0);
            prop_assert_eq!(l.y, (842.0 - h) / 2.0);
        }

        #[test]
        fn oversized_images_keep_aspect_and_stay_inside(
            w in 1.0f64..20000.0,
            h in 1.0f64..20000.0,
            margin in 0.0f64..100.0,
        ) {
            let l = fit_to_page(size(w, h), A4, margin);
            let eps = 1e-9;
            prop_assert!(l.width <= 595.0 - 2.0 * margin + eps);
            prop_assert!(l.height <= 842.0 - 2.0 * margin + eps);
            prop_assert!(l.x >= margin - eps && l.y >= margin - eps);
            let ratio_in = w / h;
            let ratio_out = l.width / l.height;
            prop_assert!((ratio_in - ratio_out).abs() / ratio_in < 1e-9);
        }

        #[test]
        fn layout_is_deterministic(w in 1.0f64..9000.0, h in 1.0f64..9000.0) {
            let a = fit_to_page(size(w, h), PageSize::Letter, 36.0);
            let b = fit_to_page(size(w, h), PageSize::Letter, 36.0);
            prop_assert_eq!(a, b);
        }
    }
}
