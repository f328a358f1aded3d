//! PDF composition.
//!
//! Every page carries the same image XObject, drawn at the full page width
//! and shifted by the page's offset from [`compute_page_offsets`]. The page
//! media box clips the image so each page shows exactly one slice.
//!
//! [`compute_page_offsets`]: crate::geometry::compute_page_offsets

use printpdf::{Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Pt, XObjectTransform};

use crate::error::{ExportError, Result};
use crate::geometry::{PageGeometry, PageLayout};
use crate::raster::RasterImage;

/// Resolution the image XObject is registered at.
///
/// Only the ratio between the natural size at this DPI and the target size
/// matters; the transform rescales to the page width.
const IMAGE_DPI: f32 = 300.0;

const MM_PER_INCH: f32 = 25.4;

/// A finished PDF and how it was laid out.
#[derive(Debug, Clone)]
pub struct ExportedPdf {
    /// Raw PDF bytes.
    pub data: Vec<u8>,
    /// File name the document is saved under.
    pub filename: String,
    /// Page slicing used for this document.
    pub layout: PageLayout,
}

impl ExportedPdf {
    /// Size of the document in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.layout.page_count()
    }

    /// Whether the data starts with the `%PDF-` header.
    pub fn is_valid_pdf(&self) -> bool {
        self.data.starts_with(b"%PDF-")
    }
}

/// Compose a paginated PDF from a raster image.
///
/// # Arguments
///
/// * `raster` - The captured bitmap
/// * `geometry` - Page size
/// * `top_padding` - Offset of the image on the first page, in millimetres
/// * `title` - Document title
/// * `filename` - Name the document will be saved under
///
/// # Errors
///
/// Returns [`ExportError::PdfGeneration`] if the serializer produced no output.
pub fn compose_pdf(
    raster: &RasterImage,
    geometry: PageGeometry,
    top_padding: f32,
    title: &str,
    filename: &str,
) -> Result<ExportedPdf> {
    let layout = geometry.layout_with_padding(raster.width(), raster.height(), top_padding);

    let mut doc = PdfDocument::new(title);
    let image_id = doc.add_image(&raster.to_raw_image());

    let natural_width_mm = raster.width() as f32 * MM_PER_INCH / IMAGE_DPI;
    let natural_height_mm = raster.height() as f32 * MM_PER_INCH / IMAGE_DPI;
    let scale_x = layout.image_width_mm / natural_width_mm;
    let scale_y = layout.image_height_mm / natural_height_mm;

    let pages: Vec<PdfPage> = layout
        .offsets
        .iter()
        .map(|offset| {
            // PDF space grows upwards from the bottom-left corner.
            let bottom: Pt = Mm(geometry.height_mm - offset - layout.image_height_mm).into();
            let ops = vec![Op::UseXobject {
                id: image_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(bottom),
                    rotate: None,
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    dpi: Some(IMAGE_DPI),
                },
            }];
            PdfPage::new(Mm(geometry.width_mm), Mm(geometry.height_mm), ops)
        })
        .collect();

    let mut warnings = Vec::new();
    let data = doc
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut warnings);

    if !warnings.is_empty() {
        log::debug!("PDF serializer reported {} warning(s)", warnings.len());
    }

    if data.is_empty() {
        log::error!("❌ PDF serializer produced no output");
        return Err(ExportError::PdfGeneration(
            "serializer produced an empty document".to_string(),
        ));
    }

    log::debug!(
        "Composed {} page(s), {} bytes (image {}x{} px -> {:.1}x{:.1} mm)",
        layout.page_count(),
        data.len(),
        raster.width(),
        raster.height(),
        layout.image_width_mm,
        layout.image_height_mm
    );

    Ok(ExportedPdf {
        data,
        filename: filename.to_string(),
        layout,
    })
}

// ============================================================================
// Unit Tests
// ============================================================================
