//! PDF report for one record
//!
//! [`ReportLayout::build`] decides what goes on the page and in which order;
//! [`render_pdf`] draws it on A4 pages. The layout is a plain value so its
//! content can be tested without parsing PDF output.

use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use rnc_common::db::{Attachment, NonConformity, Stage};
use rnc_common::{Error, Result};
use tracing::warn;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const TOP: f32 = PAGE_HEIGHT - 20.0;
const BOTTOM: f32 = 20.0;

const TITLE_SIZE: f32 = 14.0;
const HEADING_SIZE: f32 = 10.0;
const TEXT_SIZE: f32 = 9.0;
const LINE_HEIGHT: f32 = 5.0;

/// Characters per line of a full-width block
const WRAP_BUDGET: usize = 100;
/// Characters per line of a header field (two fields per row)
const FIELD_BUDGET: usize = 48;
const SECOND_COLUMN: f32 = 110.0;

const PHOTO_WIDTH: f32 = 60.0;
const PHOTO_HEIGHT: f32 = 45.0;
const PHOTO_GAP: f32 = 6.0;
const PHOTO_DPI: f32 = 300.0;

const LOGO_WIDTH: f32 = 35.0;
const LOGO_HEIGHT: f32 = 15.0;

pub const REPORT_TITLE: &str = "RNC - NON-CONFORMITY REPORT";

/// A photo carried into the report
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub attachment_id: i64,
    pub data: Vec<u8>,
}

/// One block of the report, in page order
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// Label/value pairs laid out two per row
    Fields(Vec<(&'static str, String)>),
    /// Bold heading followed by wrapped text
    Block { heading: &'static str, text: String },
    /// Photo grid for one lifecycle stage, never empty
    Photos {
        heading: &'static str,
        stage: Stage,
        photos: Vec<Photo>,
    },
}

/// Everything a report shows, in order
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub rnc_number: String,
    pub sections: Vec<Section>,
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn opt_or_dash(value: Option<&str>) -> String {
    or_dash(value.unwrap_or(""))
}

fn date_text<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn photo_heading(stage: Stage) -> &'static str {
    match stage {
        Stage::Opening => "Opening photos:",
        Stage::Closing => "Closing evidence:",
        Stage::Reopening => "Reopening photos:",
    }
}

impl ReportLayout {
    /// Lay out a record and its photos. Stages without photos get no section.
    pub fn build(record: &NonConformity, attachments: Vec<(Attachment, Vec<u8>)>) -> Self {
        let mut by_stage: Vec<(Stage, Vec<Photo>)> =
            Stage::ALL.iter().map(|s| (*s, Vec::new())).collect();
        for (attachment, data) in attachments {
            if let Some((_, photos)) = by_stage.iter_mut().find(|(s, _)| *s == attachment.stage) {
                photos.push(Photo {
                    attachment_id: attachment.id,
                    data,
                });
            }
        }
        let mut take_photos = |stage: Stage| -> Option<Section> {
            let (_, photos) = by_stage.iter_mut().find(|(s, _)| *s == stage)?;
            if photos.is_empty() {
                return None;
            }
            Some(Section::Photos {
                heading: photo_heading(stage),
                stage,
                photos: std::mem::take(photos),
            })
        };

        let mut sections = vec![
            Section::Fields(vec![
                ("RNC Nº", record.rnc_number.clone()),
                ("Date", date_text(record.occurred_on)),
                ("Issuer", or_dash(&record.issuer)),
                ("Status", record.status.to_string()),
                ("Area/Location", or_dash(&record.area)),
                ("Severity", date_text(record.severity)),
                ("Project", opt_or_dash(record.project_code.as_deref())),
                ("Category", or_dash(&record.category)),
                ("Inspector", or_dash(&record.inspector)),
                ("Action owner", or_dash(&record.action_owner)),
            ]),
            Section::Block {
                heading: "Title:",
                text: or_dash(&record.title),
            },
            Section::Block {
                heading: "Non-conformity description:",
                text: or_dash(&record.description),
            },
            Section::Block {
                heading: "References:",
                text: or_dash(&record.references),
            },
            Section::Block {
                heading: "Cause:",
                text: or_dash(&record.cause),
            },
            Section::Block {
                heading: "Process involved:",
                text: or_dash(&record.process),
            },
            Section::Block {
                heading: "Origin:",
                text: or_dash(&record.origin),
            },
            Section::Block {
                heading: "Corrective action:",
                text: or_dash(&record.corrective_action),
            },
        ];
        sections.extend(take_photos(Stage::Opening));

        if record.closed_at.is_some() || record.closed_by.is_some() {
            sections.push(Section::Fields(vec![
                ("Closed at", date_text(record.closed_at.map(|t| t.format("%Y-%m-%d %H:%M UTC")))),
                ("Closed by", opt_or_dash(record.closed_by.as_deref())),
                ("Effectiveness", date_text(record.effectiveness)),
            ]));
            sections.push(Section::Block {
                heading: "Closing notes:",
                text: opt_or_dash(record.closing_notes.as_deref()),
            });
        }
        sections.extend(take_photos(Stage::Closing));

        if record.reopened_at.is_some() || record.reopened_by.is_some() {
            sections.push(Section::Fields(vec![
                ("Reopened at", date_text(record.reopened_at.map(|t| t.format("%Y-%m-%d %H:%M UTC")))),
                ("Reopened by", opt_or_dash(record.reopened_by.as_deref())),
            ]));
            sections.push(Section::Block {
                heading: "Reopening reason:",
                text: opt_or_dash(record.reopening_reason.as_deref()),
            });
        }
        sections.extend(take_photos(Stage::Reopening));

        if record.cancelled_at.is_some() || record.cancelled_by.is_some() {
            sections.push(Section::Fields(vec![
                ("Cancelled at", date_text(record.cancelled_at.map(|t| t.format("%Y-%m-%d %H:%M UTC")))),
                ("Cancelled by", opt_or_dash(record.cancelled_by.as_deref())),
            ]));
            sections.push(Section::Block {
                heading: "Cancellation reason:",
                text: opt_or_dash(record.cancel_reason.as_deref()),
            });
        }

        Self {
            rnc_number: record.rnc_number.clone(),
            sections,
        }
    }

    /// Number of photo sections (stages that have at least one photo)
    pub fn photo_section_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| matches!(s, Section::Photos { .. }))
            .count()
    }
}

/// Split text into lines of at most `budget` characters.
///
/// Existing line breaks are kept; words longer than the budget are cut.
pub fn wrap(text: &str, budget: usize) -> Vec<String> {
    let budget = budget.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > budget {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(budget);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();

            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > budget {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        lines.push("-".to_string());
    }
    lines
}

/// Drawing cursor over a growing document
struct Canvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl Canvas {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_fault)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_fault)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: TOP,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
    }

    /// Start a new page unless `height` still fits above the bottom margin
    fn ensure_room(&mut self, height: f32) {
        if self.y - height < BOTTOM {
            self.new_page();
        }
    }

    fn text_at(&self, text: &str, size: f32, x: f32, y: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_room(LINE_HEIGHT);
        self.text_at(text, size, MARGIN, self.y, bold);
        self.y -= LINE_HEIGHT;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    /// Draw an image scaled to fit the box whose lower-left corner is (x, y)
    fn image(&self, image: &DynamicImage, x: f32, y: f32, max_w: f32, max_h: f32) {
        let (px_w, px_h) = image.dimensions();
        if px_w == 0 || px_h == 0 {
            return;
        }
        let native_w = px_w as f32 / PHOTO_DPI * 25.4;
        let native_h = px_h as f32 / PHOTO_DPI * 25.4;
        let scale = (max_w / native_w).min(max_h / native_h);

        Image::from_dynamic_image(image).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(PHOTO_DPI),
                ..Default::default()
            },
        );
    }

    fn finish(self) -> Result<Vec<u8>> {
        self.doc.save_to_bytes().map_err(pdf_fault)
    }
}

fn pdf_fault(err: printpdf::Error) -> Error {
    Error::Internal(format!("PDF generation failed: {}", err))
}

/// Decode and shrink a photo for embedding; `None` if it is not an image
/// we can read
fn prepare_image(data: &[u8], max_w_mm: f32, max_h_mm: f32) -> Option<DynamicImage> {
    let decoded = image_crate::load_from_memory(data).ok()?;
    let max_w_px = (max_w_mm / 25.4 * PHOTO_DPI).ceil() as u32;
    let max_h_px = (max_h_mm / 25.4 * PHOTO_DPI).ceil() as u32;
    let fitted = if decoded.width() > max_w_px || decoded.height() > max_h_px {
        decoded.thumbnail(max_w_px, max_h_px)
    } else {
        decoded
    };
    // Alpha channels are flattened; the PDF image is plain RGB
    Some(DynamicImage::ImageRgb8(fitted.to_rgb8()))
}

/// Render a layout to PDF bytes, with the company logo in the header if given
pub fn render_pdf(layout: &ReportLayout, logo: Option<&[u8]>) -> Result<Vec<u8>> {
    let mut canvas = Canvas::new(&format!("RNC {}", layout.rnc_number))?;

    if let Some(bytes) = logo {
        match prepare_image(bytes, LOGO_WIDTH, LOGO_HEIGHT) {
            Some(image) => canvas.image(&image, MARGIN, TOP - LOGO_HEIGHT + 4.0, LOGO_WIDTH, LOGO_HEIGHT),
            None => warn!("Stored logo could not be decoded; report rendered without it"),
        }
    }
    canvas.text_at(REPORT_TITLE, TITLE_SIZE, 60.0, canvas.y, true);
    canvas.gap(15.0);

    for section in &layout.sections {
        match section {
            Section::Fields(pairs) => draw_fields(&mut canvas, pairs),
            Section::Block { heading, text } => draw_block(&mut canvas, heading, text),
            Section::Photos {
                heading, photos, ..
            } => draw_photos(&mut canvas, &layout.rnc_number, heading, photos),
        }
    }

    canvas.finish()
}

fn draw_fields(canvas: &mut Canvas, pairs: &[(&'static str, String)]) {
    for row in pairs.chunks(2) {
        let cells: Vec<Vec<String>> = row
            .iter()
            .map(|(label, value)| wrap(&format!("{}: {}", label, value), FIELD_BUDGET))
            .collect();
        let height = cells.iter().map(Vec::len).max().unwrap_or(1) as f32 * LINE_HEIGHT;

        canvas.ensure_room(height);
        for (column, lines) in cells.iter().enumerate() {
            let x = if column == 0 { MARGIN } else { SECOND_COLUMN };
            for (i, line) in lines.iter().enumerate() {
                canvas.text_at(line, TEXT_SIZE, x, canvas.y - i as f32 * LINE_HEIGHT, false);
            }
        }
        canvas.gap(height + 1.0);
    }
    canvas.gap(3.0);
}

fn draw_block(canvas: &mut Canvas, heading: &str, text: &str) {
    // Keep the heading with at least its first line
    canvas.ensure_room(2.0 * LINE_HEIGHT);
    canvas.line(heading, HEADING_SIZE, true);
    for line in wrap(text, WRAP_BUDGET) {
        canvas.line(&line, TEXT_SIZE, false);
    }
    canvas.gap(3.0);
}

fn draw_photos(canvas: &mut Canvas, rnc_number: &str, heading: &str, photos: &[Photo]) {
    let images: Vec<DynamicImage> = photos
        .iter()
        .filter_map(|photo| {
            let image = prepare_image(&photo.data, PHOTO_WIDTH, PHOTO_HEIGHT);
            if image.is_none() {
                warn!(
                    "RNC {}: attachment {} is not a readable image; left out of the report",
                    rnc_number, photo.attachment_id
                );
            }
            image
        })
        .collect();
    if images.is_empty() {
        return;
    }

    canvas.ensure_room(LINE_HEIGHT + PHOTO_HEIGHT);
    canvas.line(heading, HEADING_SIZE, true);

    let mut x = MARGIN;
    let mut row_open = false;
    for image in &images {
        if x + PHOTO_WIDTH > PAGE_WIDTH - MARGIN {
            x = MARGIN;
            canvas.gap(PHOTO_HEIGHT + PHOTO_GAP);
            row_open = false;
        }
        if !row_open {
            canvas.ensure_room(PHOTO_HEIGHT);
            row_open = true;
        }
        canvas.image(image, x, canvas.y - PHOTO_HEIGHT, PHOTO_WIDTH, PHOTO_HEIGHT);
        x += PHOTO_WIDTH + PHOTO_GAP;
    }
    canvas.gap(PHOTO_HEIGHT + PHOTO_GAP);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use printpdf::image_crate::{ImageFormat, RgbImage};
    use rnc_common::db::Effectiveness;
    use rnc_common::Status;
    use std::io::Cursor;

    fn record() -> NonConformity {
        NonConformity {
            id: 3,
            rnc_number: "2024-003".to_string(),
            occurred_on: chrono::NaiveDate::from_ymd_opt(2024, 5, 2),
            issuer: "Ana".to_string(),
            area: "Workshop".to_string(),
            project_code: None,
            title: "Missing torque marks".to_string(),
            inspector: "Bruno".to_string(),
            description: "Flange bolts without torque marks on line 4".to_string(),
            references: String::new(),
            cause: "Supplier".to_string(),
            process: String::new(),
            origin: String::new(),
            corrective_action: String::new(),
            severity: None,
            category: String::new(),
            action_owner: String::new(),
            status: Status::Open,
            opened_at: None,
            closed_at: None,
            closed_by: None,
            closing_notes: None,
            effectiveness: None,
            reopened_at: None,
            reopened_by: None,
            reopening_reason: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
        }
    }

    fn attachment(id: i64, stage: Stage) -> Attachment {
        Attachment {
            id,
            record_id: 3,
            stage,
            filename: None,
            mime_type: "image/png".to_string(),
            size: 0,
            created_at: None,
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_wrap_respects_budget() {
        let lines = wrap("one two three four five six", 9);
        assert_eq!(lines, vec!["one two", "three", "four five", "six"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 9));
    }

    #[test]
    fn test_wrap_keeps_paragraphs_and_cuts_long_words() {
        let lines = wrap("abcdefghij\nxy", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_wrap_blank_is_dash() {
        assert_eq!(wrap("   ", 10), vec!["-"]);
    }

    #[test]
    fn test_layout_without_attachments_has_no_photo_sections() {
        let layout = ReportLayout::build(&record(), Vec::new());
        assert_eq!(layout.photo_section_count(), 0);
        assert!(!layout
            .sections
            .iter()
            .any(|s| matches!(s, Section::Block { heading, .. } if *heading == "Closing notes:")));
    }

    #[test]
    fn test_layout_orders_stages() {
        let mut r = record();
        r.status = Status::Reopened;
        r.closed_at = Some(Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap());
        r.closed_by = Some("Carla".to_string());
        r.closing_notes = Some("Marked".to_string());
        r.effectiveness = Some(Effectiveness::NotEffective);
        r.reopened_at = Some(Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap());
        r.reopened_by = Some("Ana".to_string());
        r.reopening_reason = Some("Marks faded".to_string());

        let attachments = vec![
            (attachment(9, Stage::Reopening), vec![1]),
            (attachment(7, Stage::Opening), vec![2]),
            (attachment(8, Stage::Closing), vec![3]),
        ];
        let layout = ReportLayout::build(&r, attachments);

        let stages: Vec<Stage> = layout
            .sections
            .iter()
            .filter_map(|s| match s {
                Section::Photos { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec![Stage::Opening, Stage::Closing, Stage::Reopening]);

        let headings: Vec<&str> = layout
            .sections
            .iter()
            .filter_map(|s| match s {
                Section::Block { heading, .. } => Some(*heading),
                _ => None,
            })
            .collect();
        let closing = headings.iter().position(|h| *h == "Closing notes:").unwrap();
        let reopening = headings.iter().position(|h| *h == "Reopening reason:").unwrap();
        assert!(closing < reopening);
        assert!(!headings.contains(&"Cancellation reason:"));
    }

    #[test]
    fn test_layout_is_deterministic() {
        let a = ReportLayout::build(&record(), vec![(attachment(1, Stage::Opening), vec![1, 2])]);
        let b = ReportLayout::build(&record(), vec![(attachment(1, Stage::Opening), vec![1, 2])]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_without_photos() {
        let layout = ReportLayout::build(&record(), Vec::new());
        let bytes = render_pdf(&layout, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_with_photos_logo_and_bad_image() {
        let mut r = record();
        r.description = "word ".repeat(2000);
        let attachments = vec![
            (attachment(1, Stage::Opening), png(40, 30)),
            (attachment(2, Stage::Opening), b"not an image".to_vec()),
            (attachment(3, Stage::Opening), png(30, 40)),
            (attachment(4, Stage::Opening), png(10, 10)),
        ];
        let layout = ReportLayout::build(&r, attachments);
        let logo = png(70, 30);

        let bytes = render_pdf(&layout, Some(&logo)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
