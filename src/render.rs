use image::DynamicImage;
use log::{debug, info, warn};
use printpdf::{
    BuiltinFont, Color, Greyscale, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point,
};
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};
use crate::i18n::{Language, Text};
use crate::record::{DETAIL_FIELDS, Field, ProductRecord};

const PT_TO_MM: f32 = 25.4 / 72.0;
const IMAGE_DPI: f32 = 300.0;

const TITLE_SIZE: f32 = 14.0;
const SUBTITLE_SIZE: f32 = 9.0;
const MODEL_SIZE: f32 = 12.0;
const FIELD_SIZE: f32 = 10.0;
const PLACEHOLDER_SIZE: f32 = 8.0;
// Offsets below the model line, in points
const FIRST_FIELD_DROP: f32 = 14.0;
const FIELD_STEP: f32 = 12.0;

/// Page and record-band dimensions, all in millimetres
#[derive(Clone, Debug)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Distance from the top margin to the first record
    pub header_height: f32,
    pub image_max_width: f32,
    pub image_max_height: f32,
    /// Gap between the image box and the text column
    pub text_offset: f32,
    /// Space after each record
    pub record_gap: f32,
    /// Text allowance added to the image height when testing for a page break
    pub text_reserve: f32,
}

impl Default for PageGeometry {
    /// A4 portrait with 15 mm margins and a 70×42 mm image box
    fn default() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin: 15.0,
            header_height: 12.0,
            image_max_width: 70.0,
            image_max_height: 42.0,
            text_offset: 10.0,
            record_gap: 6.0,
            text_reserve: 32.0,
        }
    }
}

impl PageGeometry {
    fn first_record_top(&self) -> f32 {
        self.height - self.margin - self.header_height
    }

    fn needs_break(&self, top: f32) -> bool {
        top < self.margin + self.image_max_height + self.text_reserve
    }

    fn text_x(&self) -> f32 {
        self.margin + self.image_max_width + self.text_offset
    }
}

/// One record placed on a page
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedRecord<'a> {
    pub record: &'a ProductRecord,
    /// Baseline of the model line, measured from the page bottom
    pub top: f32,
    pub title: String,
    /// Non-empty `label: value` lines in print order
    pub lines: Vec<String>,
}

impl PlacedRecord<'_> {
    /// Height taken by the model line and the field lines
    pub fn text_height(&self) -> f32 {
        (FIRST_FIELD_DROP + FIELD_STEP * self.lines.len() as f32) * PT_TO_MM
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageLayout<'a> {
    pub records: Vec<PlacedRecord<'a>>,
}

/// `label: value` lines for the detail fields that are not blank
pub fn detail_lines(record: &ProductRecord, language: Language) -> Vec<String> {
    DETAIL_FIELDS
        .iter()
        .filter_map(|f| {
            let value = record.get(*f).trim();
            (!value.is_empty()).then(|| format!("{}: {}", language.label(*f), value))
        })
        .collect()
}

/// Assign records to pages
///
/// Each record takes a band as tall as its image box or its text, whichever
/// is taller, plus the record gap. A new page starts when the next band's top
/// falls below the bottom margin plus image height and text reserve.
pub fn layout<'a>(records: &[&'a ProductRecord], language: Language, geometry: &PageGeometry) -> Vec<PageLayout<'a>> {
    let mut pages = vec![PageLayout::default()];
    let mut top = geometry.first_record_top();

    for record in records {
        if geometry.needs_break(top) && pages.last().is_some_and(|p| !p.records.is_empty()) {
            debug!("page {} full, starting a new page", pages.len());
            pages.push(PageLayout::default());
            top = geometry.first_record_top();
        }

        let placed = PlacedRecord {
            record,
            top,
            title: format!("{}: {}", language.label(Field::Model), record.model),
            lines: detail_lines(record, language),
        };
        top -= placed.text_height().max(geometry.image_max_height) + geometry.record_gap;

        if let Some(page) = pages.last_mut() {
            page.records.push(placed);
        }
    }

    pages
}

/// Options for [`render_catalog`]
#[derive(Clone, Debug, Default)]
pub struct RenderOptions {
    pub language: Language,
    /// Directory relative image paths are resolved against
    pub base_dir: PathBuf,
    /// TrueType font to embed; the built-in Helvetica faces are used otherwise
    pub font_path: Option<PathBuf>,
    pub geometry: PageGeometry,
}

/// Load and decode an image for placement in the catalog
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| CatalogError::ImageLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// What a record's image box ended up holding
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Drawn {
    /// Decoded image, drawn at this size in millimetres
    Image { width: f32, height: f32 },
    Placeholder,
}

/// A rendered catalog and, per record in print order, what its image box holds
#[derive(Clone, Debug)]
pub struct RenderedCatalog {
    pub bytes: Vec<u8>,
    pub drawn: Vec<Drawn>,
}

/// Size in millimetres of a `px_w`×`px_h` image scaled to fit the image box
///
/// The aspect ratio is kept; one side always touches the box edge.
pub fn fit_image(px_w: u32, px_h: u32, geometry: &PageGeometry) -> (f32, f32) {
    let natural_w = px_w.max(1) as f32 / IMAGE_DPI * 25.4;
    let natural_h = px_h.max(1) as f32 / IMAGE_DPI * 25.4;
    let scale = (geometry.image_max_width / natural_w).min(geometry.image_max_height / natural_h);
    (natural_w * scale, natural_h * scale)
}

/// Render records into a paginated PDF catalog held in memory
///
/// Missing or undecodable images are replaced by a bordered "no image" box.
pub fn render_catalog(records: &[&ProductRecord], options: &RenderOptions) -> Result<Vec<u8>> {
    render_with_report(records, options).map(|rendered| rendered.bytes)
}

/// Same as [`render_catalog`], also reporting image versus placeholder per record
pub fn render_with_report(records: &[&ProductRecord], options: &RenderOptions) -> Result<RenderedCatalog> {
    let geometry = &options.geometry;
    let language = options.language;
    let pages = layout(records, language, geometry);

    let (doc, first_page, first_layer) = PdfDocument::new(
        language.text(Text::PdfTitle),
        Mm(geometry.width),
        Mm(geometry.height),
        "Layer 1",
    );
    let fonts = Fonts::load(&doc, options.font_path.as_deref())?;
    let mut drawn = Vec::with_capacity(records.len());

    for (index, page) in pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(geometry.width), Mm(geometry.height), format!("Page {}", index + 1));
            doc.get_page(page_index).get_layer(layer_index)
        };

        draw_header(&layer, &fonts, language, geometry);
        for placed in &page.records {
            drawn.push(draw_image_or_placeholder(&layer, &fonts, placed, options));
            draw_text(&layer, &fonts, placed, geometry);
        }
    }

    let bytes = doc.save_to_bytes().map_err(pdf_error)?;
    info!("rendered catalog: {} records on {} pages", records.len(), pages.len());
    Ok(RenderedCatalog { bytes, drawn })
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference, font_path: Option<&Path>) -> Result<Self> {
        match font_path {
            Some(path) => {
                let data = std::fs::read(path)?;
                let regular = doc.add_external_font(data.as_slice()).map_err(pdf_error)?;
                Ok(Fonts {
                    bold: regular.clone(),
                    regular,
                })
            }
            None => Ok(Fonts {
                regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
                bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
            }),
        }
    }
}

fn draw_header(layer: &PdfLayerReference, fonts: &Fonts, language: Language, geometry: &PageGeometry) {
    let top = geometry.height - geometry.margin;
    layer.use_text(language.text(Text::PdfTitle), TITLE_SIZE, Mm(geometry.margin), Mm(top + 2.0), &fonts.bold);
    layer.use_text(
        language.text(Text::PdfSubtitle),
        SUBTITLE_SIZE,
        Mm(geometry.margin),
        Mm(top - 3.0),
        &fonts.regular,
    );

    let rule_y = top - 5.0;
    layer.set_outline_color(Color::Greyscale(Greyscale::new(0.0, None)));
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(geometry.margin), Mm(rule_y)), false),
            (Point::new(Mm(geometry.width - geometry.margin), Mm(rule_y)), false),
        ],
        is_closed: false,
    });
}

fn draw_image_or_placeholder(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    placed: &PlacedRecord,
    options: &RenderOptions,
) -> Drawn {
    let geometry = &options.geometry;
    let raw_path = placed.record.image_path.trim();

    if !raw_path.is_empty() {
        let path = options.base_dir.join(raw_path);
        match load_image(&path) {
            Ok(img) => return place_image(layer, &img, placed.top, geometry),
            Err(e) => warn!("{}; drawing placeholder for {}", e, placed.record.model),
        }
    }

    let (x, y) = (geometry.margin, placed.top - geometry.image_max_height);
    let (w, h) = (geometry.image_max_width, geometry.image_max_height);
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x), Mm(y)), false),
            (Point::new(Mm(x + w), Mm(y)), false),
            (Point::new(Mm(x + w), Mm(y + h)), false),
            (Point::new(Mm(x), Mm(y + h)), false),
        ],
        is_closed: true,
    });

    let label = options.language.text(Text::NoImage);
    let label_x = x + (w - text_width(label, PLACEHOLDER_SIZE)) / 2.0;
    layer.use_text(label, PLACEHOLDER_SIZE, Mm(label_x), Mm(y + h / 2.0), &fonts.regular);
    Drawn::Placeholder
}

// Top-aligned with the model line.
fn place_image(layer: &PdfLayerReference, img: &DynamicImage, top: f32, geometry: &PageGeometry) -> Drawn {
    let (width, height) = fit_image(img.width(), img.height(), geometry);
    let scale = width / (img.width().max(1) as f32 / IMAGE_DPI * 25.4);

    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    Image::from_dynamic_image(&rgb).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(geometry.margin)),
            translate_y: Some(Mm(top - height)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
    Drawn::Image { width, height }
}

fn draw_text(layer: &PdfLayerReference, fonts: &Fonts, placed: &PlacedRecord, geometry: &PageGeometry) {
    let x = Mm(geometry.text_x());
    layer.use_text(placed.title.as_str(), MODEL_SIZE, x, Mm(placed.top), &fonts.bold);

    let mut y = placed.top - FIRST_FIELD_DROP * PT_TO_MM;
    for line in &placed.lines {
        layer.use_text(line.as_str(), FIELD_SIZE, x, Mm(y), &fonts.regular);
        y -= FIELD_STEP * PT_TO_MM;
    }
}

fn pdf_error(e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Pdf(e.to_string())
}

// Rough advance width: half an em for ASCII, a full em otherwise.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars()
        .map(|c| if c.is_ascii() { 0.5 } else { 1.0 })
        .sum::<f32>()
        * size
        * PT_TO_MM
}
