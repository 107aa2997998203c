//! PDF certificate generation.
//!
//! Output is deterministic for identical inputs: text placement is computed
//! by the pure `overlay_placements` function, so two calls with the same
//! name/title/date overlay the exact same operations (the PDF container
//! itself may embed a creation timestamp).

use std::io::BufWriter;
use std::path::PathBuf;

use chrono::NaiveDate;
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument};
use thiserror::Error;

pub type CertificateResult<T> = std::result::Result<T, CertificateError>;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("template image error: {0}")]
    ImageError(#[from] printpdf::image_crate::ImageError),
    #[error("pdf error: {0}")]
    PdfError(#[from] printpdf::Error),
}

// A4 landscape.
pub const PAGE_WIDTH_MM: f64 = 297.0;
pub const PAGE_HEIGHT_MM: f64 = 210.0;

/// The recipient name may not span more than this share of the page width;
/// the font shrinks until it fits.
pub const NAME_MAX_WIDTH_RATIO: f64 = 0.70;

const HEADING: &str = "CERTIFICAT DE FORMATION";
const SUBHEADING: &str = "a suivi avec succès la formation";

const HEADING_SIZE_PT: f64 = 28.0;
const NAME_BASE_SIZE_PT: f64 = 36.0;
const NAME_MIN_SIZE_PT: f64 = 12.0;
const BODY_SIZE_PT: f64 = 18.0;
const DATE_SIZE_PT: f64 = 14.0;

const HEADING_BASELINE_MM: f64 = 165.0;
const NAME_BASELINE_MM: f64 = 120.0;
const SUBHEADING_BASELINE_MM: f64 = 100.0;
const TITLE_BASELINE_MM: f64 = 85.0;
const DATE_BASELINE_MM: f64 = 55.0;

const MM_PER_PT: f64 = 25.4 / 72.0;
// Average Helvetica advance, in em. Close enough for centering and the 70%
// width cap; exact glyph metrics are not worth carrying for this.
const AVG_GLYPH_EM: f64 = 0.52;

#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub text: String,
    pub x_mm: f64,
    pub y_mm: f64,
    pub size_pt: f64,
}

pub fn estimated_width_mm(text: &str, size_pt: f64) -> f64 {
    text.chars().count() as f64 * size_pt * AVG_GLYPH_EM * MM_PER_PT
}

fn centered(text: &str, y_mm: f64, size_pt: f64) -> TextPlacement {
    TextPlacement {
        text: text.to_string(),
        x_mm: (PAGE_WIDTH_MM - estimated_width_mm(text, size_pt)) / 2.0,
        y_mm,
        size_pt,
    }
}

/// Shrinks `base_size` in 1pt steps until the text fits the width cap.
fn fitted_size(text: &str, base_size: f64, min_size: f64) -> f64 {
    let max_width = PAGE_WIDTH_MM * NAME_MAX_WIDTH_RATIO;
    let mut size = base_size;
    while size > min_size && estimated_width_mm(text, size) > max_width {
        size -= 1.0;
    }
    size
}

/// Pure placement of the overlay text; the whole determinism contract of the
/// issuer reduces to this function.
pub fn overlay_placements(
    recipient_name: &str,
    course_title: &str,
    completion_date: NaiveDate,
) -> Vec<TextPlacement> {
    let name_size = fitted_size(recipient_name, NAME_BASE_SIZE_PT, NAME_MIN_SIZE_PT);
    let title_size = fitted_size(course_title, BODY_SIZE_PT, NAME_MIN_SIZE_PT);
    let date_text = format!("Fait le {}", completion_date.format("%d/%m/%Y"));

    vec![
        centered(HEADING, HEADING_BASELINE_MM, HEADING_SIZE_PT),
        centered(recipient_name, NAME_BASELINE_MM, name_size),
        centered(SUBHEADING, SUBHEADING_BASELINE_MM, BODY_SIZE_PT),
        centered(course_title, TITLE_BASELINE_MM, title_size),
        centered(&date_text, DATE_BASELINE_MM, DATE_SIZE_PT),
    ]
}

pub struct CertificateIssuer {
    template: Option<PathBuf>,
}

impl CertificateIssuer {
    pub fn new(template: Option<PathBuf>) -> Self {
        Self { template }
    }

    /// Renders the certificate PDF: optional raster template stretched to
    /// the full page, then the text overlay.
    pub fn issue(
        &self,
        recipient_name: &str,
        course_title: &str,
        completion_date: NaiveDate,
    ) -> CertificateResult<Vec<u8>> {
        let (doc, page, layer) = PdfDocument::new(
            "Certificat de formation",
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "overlay",
        );
        let layer = doc.get_page(page).get_layer(layer);

        if let Some(path) = &self.template {
            let background = printpdf::image_crate::open(path)?;
            let (px_w, px_h) = (background.width() as f64, background.height() as f64);
            let image = Image::from_dynamic_image(&background);

            // stretch to cover the page; images are placed at 300 dpi
            let dpi = 300.0;
            let native_w_mm = px_w * 25.4 / dpi;
            let native_h_mm = px_h * 25.4 / dpi;
            image.add_to_layer(
                layer.clone(),
                ImageTransform {
                    scale_x: Some(PAGE_WIDTH_MM / native_w_mm),
                    scale_y: Some(PAGE_HEIGHT_MM / native_h_mm),
                    dpi: Some(dpi),
                    ..Default::default()
                },
            );
        }

        let font = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        for p in overlay_placements(recipient_name, course_title, completion_date) {
            layer.use_text(p.text, p.size_pt, Mm(p.x_mm), Mm(p.y_mm), &font);
        }

        let mut bytes = Vec::new();
        doc.save(&mut BufWriter::new(&mut bytes))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn placements_are_deterministic() {
        let a = overlay_placements("Jeanne Dupont", "Irrigation raisonnée", date());
        let b = overlay_placements("Jeanne Dupont", "Irrigation raisonnée", date());
        assert_eq!(a, b);
    }

    #[test]
    fn long_name_shrinks_to_fit() {
        let short = overlay_placements("Jo", "Formation", date());
        let long = overlay_placements(
            "Jean-Baptiste Alexandre de la Rochefoucauld-Montmorency",
            "Formation",
            date(),
        );
        assert!(long[1].size_pt < short[1].size_pt);
        assert!(
            estimated_width_mm(&long[1].text, long[1].size_pt)
                <= PAGE_WIDTH_MM * NAME_MAX_WIDTH_RATIO
                || long[1].size_pt == NAME_MIN_SIZE_PT
        );
    }

    #[test]
    fn short_name_keeps_base_size() {
        let placements = overlay_placements("Jo", "Formation", date());
        assert_eq!(placements[1].size_pt, NAME_BASE_SIZE_PT);
    }

    #[test]
    fn date_is_rendered_french_style() {
        let placements = overlay_placements("Jo", "Formation", date());
        assert_eq!(placements[4].text, "Fait le 14/03/2025");
    }

    #[test]
    fn issue_produces_a_pdf() {
        let issuer = CertificateIssuer::new(None);
        let bytes = issuer.issue("Jeanne Dupont", "Irrigation raisonnée", date()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
