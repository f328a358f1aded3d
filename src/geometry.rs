//! Page geometry and page slicing.
//!
//! The captured bitmap is scaled to the full page width and drawn, whole, on
//! every page. Each page shifts the image up by one page height so that the
//! page's media box shows the next vertical slice. Everything in this module
//! is pure arithmetic and can be tested without a browser.
//!
//! ```text
//!            image (scaled to page width)
//!   page 0   ┌───────────┐  offset = pad
//!            │ rows 0..  │
//!   page 1   ├───────────┤  offset = pad - Ph
//!            │           │
//!   page 2   ├───────────┤  offset = pad - 2*Ph
//!            │           │
//!            └───────────┘
//! ```

use serde::Serialize;

/// Magnification factor applied when rasterizing the capture target.
pub const CAPTURE_SCALE: f64 = 3.0;

/// Vertical offset of the image on the first page, in millimetres.
pub const TOP_PADDING_MM: f32 = 10.0;

/// Tolerance used when comparing millimetre values.
///
/// Absorbs the float noise of `height * width / width` so that an image that
/// is exactly `k` pages tall is not counted as needing page `k + 1`.
const EPSILON_MM: f32 = 1e-3;

/// Physical page size in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    /// Page width in millimetres.
    pub width_mm: f32,
    /// Page height in millimetres.
    pub height_mm: f32,
}

impl PageGeometry {
    /// A4 in landscape orientation (297 x 210 mm).
    pub const A4_LANDSCAPE: PageGeometry = PageGeometry {
        width_mm: 297.0,
        height_mm: 210.0,
    };

    /// Lay out a bitmap of the given pixel size on pages of this geometry,
    /// using the fixed [`TOP_PADDING_MM`].
    pub fn layout(&self, bitmap_width: u32, bitmap_height: u32) -> PageLayout {
        self.layout_with_padding(bitmap_width, bitmap_height, TOP_PADDING_MM)
    }

    /// Lay out a bitmap with an explicit top padding.
    pub fn layout_with_padding(
        &self,
        bitmap_width: u32,
        bitmap_height: u32,
        top_padding: f32,
    ) -> PageLayout {
        let image_height_mm = scaled_image_height(bitmap_width, bitmap_height, self.width_mm);
        let offsets = compute_page_offsets(image_height_mm, self.height_mm, top_padding);

        log::trace!(
            "Layout {}x{} px -> {:.2}x{:.2} mm over {} page(s)",
            bitmap_width,
            bitmap_height,
            self.width_mm,
            image_height_mm,
            offsets.len()
        );

        PageLayout {
            image_width_mm: self.width_mm,
            image_height_mm,
            offsets,
        }
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4_LANDSCAPE
    }
}

/// Result of slicing one image across pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLayout {
    /// Width the image is drawn at (always the page width).
    pub image_width_mm: f32,
    /// Height the image is drawn at, preserving aspect ratio.
    pub image_height_mm: f32,
    /// Vertical offset of the image top from the page top, one per page.
    pub offsets: Vec<f32>,
}

impl PageLayout {
    /// Number of pages in the layout.
    pub fn page_count(&self) -> usize {
        self.offsets.len()
    }
}

/// Height of the image once scaled to `page_width`, preserving aspect ratio.
///
/// Returns `0.0` for a zero-width bitmap.
///
/// ```rust
/// use region2pdf::geometry::scaled_image_height;
///
/// assert_eq!(scaled_image_height(3000, 9000, 297.0), 891.0);
/// ```
pub fn scaled_image_height(bitmap_width: u32, bitmap_height: u32, page_width: f32) -> f32 {
    if bitmap_width == 0 {
        return 0.0;
    }
    (bitmap_height as f64 * page_width as f64 / bitmap_width as f64) as f32
}

/// Number of pages needed so that every row of an image `image_height` tall,
/// drawn `top_padding` below the top of the first page, lands on some page.
///
/// Always at least one.
pub fn page_count(image_height: f32, page_height: f32, top_padding: f32) -> usize {
    if !page_height.is_finite() || page_height <= 0.0 || !image_height.is_finite() {
        return 1;
    }
    let covered = image_height.max(0.0) + top_padding.max(0.0) - EPSILON_MM;
    let pages = (covered / page_height).ceil();
    if pages < 1.0 { 1 } else { pages as usize }
}

/// Vertical offsets at which the full image is drawn on each page.
///
/// The first page draws the image at `top_padding`; every later page draws
/// it exactly one `page_height` higher than the page before. Page `k`
/// therefore shows image rows `[k * page_height - top_padding,
/// (k + 1) * page_height - top_padding)`, so the slices tile the image with
/// no gap and no overlap.
///
/// ```rust
/// use region2pdf::geometry::compute_page_offsets;
///
/// let offsets = compute_page_offsets(891.0, 210.0, 10.0);
/// assert_eq!(offsets, vec![10.0, -200.0, -410.0, -620.0, -830.0]);
/// ```
pub fn compute_page_offsets(image_height: f32, page_height: f32, top_padding: f32) -> Vec<f32> {
    if !page_height.is_finite() || page_height <= 0.0 {
        return vec![top_padding];
    }
    let count = page_count(image_height, page_height, top_padding);
    (0..count)
        .map(|page| top_padding - page as f32 * page_height)
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PH: f32 = 210.0;
    const PW: f32 = 297.0;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_a4_landscape_dimensions() {
        let geometry = PageGeometry::A4_LANDSCAPE;
        assert_eq!(geometry.width_mm, 297.0);
        assert_eq!(geometry.height_mm, 210.0);
        assert_eq!(PageGeometry::default(), geometry);
    }

    #[test]
    fn test_scaled_height_preserves_aspect_ratio() {
        assert!(approx(scaled_image_height(3000, 9000, PW), 891.0));
        assert!(approx(scaled_image_height(1000, 500, PW), 148.5));
        assert!(approx(scaled_image_height(1234, 5678, PW), 5678.0 * PW / 1234.0));
    }

    #[test]
    fn test_scaled_height_zero_width() {
        assert_eq!(scaled_image_height(0, 100, PW), 0.0);
    }

    #[test]
    fn test_short_image_is_one_page() {
        let offsets = compute_page_offsets(100.0, PH, TOP_PADDING_MM);
        assert_eq!(offsets, vec![TOP_PADDING_MM]);
    }

    #[test]
    fn test_empty_image_is_one_page() {
        assert_eq!(compute_page_offsets(0.0, PH, TOP_PADDING_MM).len(), 1);
    }

    #[test]
    fn test_page_count_is_ceil_of_ratio() {
        for k in [1.5_f32, 2.25, 3.5, 4.1, 7.6] {
            let offsets = compute_page_offsets(k * PH, PH, TOP_PADDING_MM);
            assert_eq!(offsets.len(), k.ceil() as usize, "k = {}", k);
        }
    }

    #[test]
    fn test_padding_spill_adds_page() {
        // The last 10 mm of an exact two-page image are pushed past page 2
        // by the top padding.
        assert_eq!(compute_page_offsets(2.0 * PH, PH, TOP_PADDING_MM).len(), 3);
        // Without padding an exact multiple needs exactly k pages.
        assert_eq!(compute_page_offsets(2.0 * PH, PH, 0.0).len(), 2);
    }

    #[test]
    fn test_offsets_decrease_by_page_height() {
        let offsets = compute_page_offsets(1000.0, PH, TOP_PADDING_MM);
        assert_eq!(offsets[0], TOP_PADDING_MM);
        for pair in offsets.windows(2) {
            assert!(approx(pair[0] - pair[1], PH));
        }
    }

    #[test]
    fn test_slices_tile_without_gap_or_overlap() {
        let image_height = 891.0;
        let offsets = compute_page_offsets(image_height, PH, TOP_PADDING_MM);

        // Visible image rows on a page are [-offset, PH - offset).
        let mut covered_to = 0.0_f32;
        for offset in &offsets {
            let start = (-offset).max(0.0);
            let end = PH - offset;
            assert!(approx(start, covered_to), "gap or overlap at {}", start);
            covered_to = end;
        }
        assert!(covered_to >= image_height);
    }

    #[test]
    fn test_end_to_end_a4_landscape() {
        let layout = PageGeometry::A4_LANDSCAPE.layout(3000, 9000);
        assert!(approx(layout.image_height_mm, 891.0));
        assert!(approx(layout.image_width_mm, 297.0));
        // ceil((891 + 10) / 210) = 5
        assert_eq!(layout.page_count(), 5);
        assert_eq!(layout.offsets.last().copied(), Some(10.0 - 4.0 * PH));
    }

    #[test]
    fn test_degenerate_page_height() {
        assert_eq!(compute_page_offsets(500.0, 0.0, TOP_PADDING_MM), vec![TOP_PADDING_MM]);
        assert_eq!(compute_page_offsets(500.0, -1.0, TOP_PADDING_MM), vec![TOP_PADDING_MM]);
        assert_eq!(compute_page_offsets(500.0, f32::NAN, TOP_PADDING_MM), vec![TOP_PADDING_MM]);
        assert_eq!(
            compute_page_offsets(500.0, f32::INFINITY, TOP_PADDING_MM),
            vec![TOP_PADDING_MM]
        );
        assert!(compute_page_offsets(500.0, f32::NAN, TOP_PADDING_MM)[0].is_finite());
    }

    #[test]
    fn test_layout_serializes() {
        let layout = PageGeometry::A4_LANDSCAPE.layout(1000, 500);
        let json = serde_json::to_value(&layout).unwrap();
        assert_eq!(json["offsets"].as_array().map(|a| a.len()), Some(1));
    }
}
