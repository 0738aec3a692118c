//! Page serialization.
//!
//! A [`PageSink`] receives a laid-out [`PageSequence`] page by page through
//! [`PageSequence::emit`].  [`PdfSink`] draws the pages with `printpdf`, either
//! embedding a TrueType family or using the PDF base-14 fonts; [`OutlineSink`]
//! writes a plain-text summary.

use std::collections::BTreeMap;
use std::io::{self, BufWriter, Write};

use printpdf::{
    BuiltinFont, Color as PdfColor, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};

use crate::error::{Error, Result};
use crate::fonts::FontFiles;
use crate::geometry::{pt_to_mm, PageGeometry};
use crate::layout::{Page, PageSequence, PlacedContent, PlacedImage, PlacedTable, Placement};
use crate::shaping::{ShapedText, TextShaper};
use crate::style::{Color, HorizontalAlignment, ResolvedStyle};

/// Consumer of laid-out pages.
pub trait PageSink {
    /// Starts a new page of the given geometry.
    fn begin_page(&mut self, page: &Page, geometry: &PageGeometry) -> Result<()>;

    /// Draws one placement on the current page.
    fn place(&mut self, placement: &Placement) -> Result<()>;

    /// Finishes the current page.
    fn end_page(&mut self, page: &Page) -> Result<()>;
}

impl<T: PageSink + ?Sized> PageSink for &mut T {
    fn begin_page(&mut self, page: &Page, geometry: &PageGeometry) -> Result<()> {
        (**self).begin_page(page, geometry)
    }

    fn place(&mut self, placement: &Placement) -> Result<()> {
        (**self).place(placement)
    }

    fn end_page(&mut self, page: &Page) -> Result<()> {
        (**self).end_page(page)
    }
}

impl PageSequence {
    /// Hands every page and placement to `sink`, in order.
    pub fn emit<S: PageSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        for page in self.pages() {
            sink.begin_page(page, self.geometry())?;
            for placement in page.placements() {
                sink.place(placement)?;
            }
            sink.end_page(page)?;
        }
        Ok(())
    }
}

fn serialize_error(err: impl std::fmt::Display) -> Error {
    Error::Serialize(err.to_string())
}

fn pdf_color(color: Color) -> PdfColor {
    let (r, g, b) = color.to_unit();
    PdfColor::Rgb(Rgb::new(r, g, b, None))
}

/// Picks the base-14 face for a family name and inline emphasis.
fn standard_face(family: &str, bold: bool, italic: bool) -> (&'static str, BuiltinFont) {
    let lower = family.to_ascii_lowercase();
    let bold = bold || lower.contains("bold");
    let italic = italic || lower.contains("italic") || lower.contains("oblique");

    if lower.starts_with("courier") {
        match (bold, italic) {
            (false, false) => ("Courier", BuiltinFont::Courier),
            (true, false) => ("Courier-Bold", BuiltinFont::CourierBold),
            (false, true) => ("Courier-Oblique", BuiltinFont::CourierOblique),
            (true, true) => ("Courier-BoldOblique", BuiltinFont::CourierBoldOblique),
        }
    } else if lower.starts_with("times") {
        match (bold, italic) {
            (false, false) => ("Times-Roman", BuiltinFont::TimesRoman),
            (true, false) => ("Times-Bold", BuiltinFont::TimesBold),
            (false, true) => ("Times-Italic", BuiltinFont::TimesItalic),
            (true, true) => ("Times-BoldItalic", BuiltinFont::TimesBoldItalic),
        }
    } else {
        match (bold, italic) {
            (false, false) => ("Helvetica", BuiltinFont::Helvetica),
            (true, false) => ("Helvetica-Bold", BuiltinFont::HelveticaBold),
            (false, true) => ("Helvetica-Oblique", BuiltinFont::HelveticaOblique),
            (true, true) => ("Helvetica-BoldOblique", BuiltinFont::HelveticaBoldOblique),
        }
    }
}

/// Renders pages into a PDF document with `printpdf`.
///
/// The shaper must be the one used for layout so that aligned and justified
/// lines land where the paginator measured them: a
/// [`crate::fonts::TrueTypeShaper`] over the embedded faces, or
/// [`crate::shaping::StandardFontShaper`] for the base-14 fonts.
pub struct PdfSink<S> {
    title: String,
    shaper: S,
    embedded: Option<FontFiles>,
    document: Option<PdfDocumentReference>,
    layer: Option<PdfLayerReference>,
    fonts: BTreeMap<String, IndirectFontRef>,
    page_height: f64,
}

impl<S: TextShaper> PdfSink<S> {
    /// Draws with the base-14 fonts.
    pub fn new(title: impl Into<String>, shaper: S) -> Self {
        Self {
            title: title.into(),
            shaper,
            embedded: None,
            document: None,
            layer: None,
            fonts: BTreeMap::new(),
            page_height: 0.0,
        }
    }

    /// Draws every style with the faces of `files`, embedded in the document.
    pub fn with_embedded_fonts(mut self, files: FontFiles) -> Self {
        self.embedded = Some(files);
        self
    }

    /// Serializes the document; fails when no page was emitted.
    pub fn finish(self) -> Result<Vec<u8>> {
        let document = self
            .document
            .ok_or_else(|| Error::Serialize("no pages were emitted".to_owned()))?;
        let mut writer = BufWriter::new(Vec::new());
        document.save(&mut writer).map_err(serialize_error)?;
        writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))
    }

    fn layer(&self) -> Result<PdfLayerReference> {
        self.layer
            .clone()
            .ok_or_else(|| Error::Serialize("placement outside of a page".to_owned()))
    }

    fn font(
        &mut self,
        style: &ResolvedStyle,
        bold: bool,
        italic: bool,
    ) -> Result<IndirectFontRef> {
        let (standard_name, builtin) = standard_face(&style.font_family, bold, italic);
        let bold = bold || style.is_bold_family();
        let italic = italic || style.is_italic_family();
        let name = match &self.embedded {
            Some(files) => files.face_name(bold, italic),
            None => standard_name.to_owned(),
        };
        if let Some(font) = self.fonts.get(&name) {
            return Ok(font.clone());
        }
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| Error::Serialize("font requested before the first page".to_owned()))?;
        let font = match &self.embedded {
            Some(files) => document.add_external_font(files.face(bold, italic)),
            None => document.add_builtin_font(builtin),
        }
        .map_err(serialize_error)?;
        self.fonts.insert(name, font.clone());
        Ok(font)
    }

    fn point(&self, x: f64, y: f64) -> Point {
        Point::new(Mm(pt_to_mm(x)), Mm(pt_to_mm(self.page_height - y)))
    }

    fn fill_rect(
        &self,
        layer: &PdfLayerReference,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Color,
    ) {
        layer.set_fill_color(pdf_color(color));
        layer.add_shape(Line {
            points: vec![
                (self.point(x, y), false),
                (self.point(x + width, y), false),
                (self.point(x + width, y + height), false),
                (self.point(x, y + height), false),
            ],
            is_closed: true,
            has_fill: true,
            has_stroke: false,
            is_clipping_path: false,
        });
    }

    fn stroke(&self, layer: &PdfLayerReference, from: (f64, f64), to: (f64, f64)) {
        layer.add_shape(Line {
            points: vec![
                (self.point(from.0, from.1), false),
                (self.point(to.0, to.1), false),
            ],
            is_closed: false,
            has_fill: false,
            has_stroke: true,
            is_clipping_path: false,
        });
    }

    fn draw_text(
        &mut self,
        x: f64,
        top: f64,
        width: f64,
        text: &ShapedText,
        style: &ResolvedStyle,
    ) -> Result<()> {
        let layer = self.layer()?;
        let count = text.line_count();

        for (line_index, line) in text.lines().iter().enumerate() {
            let baseline = top + line_index as f64 * text.leading() + style.font_size;
            let slack = (width - line.width).max(0.0);
            let gaps = line
                .runs
                .iter()
                .map(|run| run.text().matches(' ').count())
                .sum::<usize>();
            let last_line = line_index + 1 == count || line.hard_break;
            let (mut cursor, extra) = match style.alignment {
                HorizontalAlignment::Left => (x, 0.0),
                HorizontalAlignment::Center => (x + slack / 2.0, 0.0),
                HorizontalAlignment::Right => (x + slack, 0.0),
                HorizontalAlignment::Justified if !last_line && gaps > 0 => {
                    (x, slack / gaps as f64)
                }
                HorizontalAlignment::Justified => (x, 0.0),
            };

            for run in &line.runs {
                let (bold, italic) = (run.is_bold(), run.is_italic());
                let font = self.font(style, bold, italic)?;
                layer.set_fill_color(pdf_color(run.color().unwrap_or(style.text_color)));
                let space = self.shaper.run_width(" ", style, bold, italic);

                for (word_index, word) in run.text().split(' ').enumerate() {
                    if word_index > 0 {
                        cursor += space + extra;
                    }
                    if !word.is_empty() {
                        layer.use_text(
                            word,
                            style.font_size,
                            Mm(pt_to_mm(cursor)),
                            Mm(pt_to_mm(self.page_height - baseline)),
                            &font,
                        );
                        cursor += self.shaper.run_width(word, style, bold, italic);
                    }
                }
            }
        }
        Ok(())
    }

    fn draw_table(&mut self, placement: &Placement, table: &PlacedTable) -> Result<()> {
        let layer = self.layer()?;
        let padding = table.style.padding();
        let (left, top) = (placement.position.x, placement.position.y);
        let width: f64 = table.column_widths.iter().sum();

        let mut y = top;
        for (row_index, (row, height)) in table.rows.iter().zip(&table.row_heights).enumerate() {
            if let Some(background) = table.style.row_background(row_index) {
                self.fill_rect(&layer, left, y, width, *height, background);
            }
            let mut x = left;
            for (cell, column_width) in row.iter().zip(&table.column_widths) {
                let inner = (column_width - padding.horizontal() - cell.style.left_indent).max(0.0);
                self.draw_text(
                    x + padding.left + cell.style.left_indent,
                    y + padding.top,
                    inner,
                    &cell.text,
                    &cell.style,
                )?;
                x += column_width;
            }
            y += height;
        }

        if let Some(grid) = table.style.grid() {
            layer.set_outline_color(pdf_color(grid.color));
            layer.set_outline_thickness(grid.width);
            let bottom = top + placement.size.height;
            let mut y = top;
            self.stroke(&layer, (left, y), (left + width, y));
            for height in &table.row_heights {
                y += height;
                self.stroke(&layer, (left, y), (left + width, y));
            }
            let mut x = left;
            self.stroke(&layer, (x, top), (x, bottom));
            for column_width in &table.column_widths {
                x += column_width;
                self.stroke(&layer, (x, top), (x, bottom));
            }
        }
        Ok(())
    }

    fn draw_image(&mut self, placement: &Placement, image: &PlacedImage) -> Result<()> {
        let layer = self.layer()?;
        let dynamic = image.data.to_dynamic().ok_or_else(|| {
            Error::Serialize(format!("image `{}` has an invalid pixel buffer", image.source))
        })?;
        let scale_x = placement.size.width / f64::from(image.data.width());
        let scale_y = placement.size.height / f64::from(image.data.height());
        printpdf::Image::from_dynamic_image(&dynamic).add_to_layer(
            layer,
            Some(Mm(pt_to_mm(placement.position.x))),
            Some(Mm(pt_to_mm(self.page_height - placement.bottom()))),
            None,
            Some(scale_x),
            Some(scale_y),
            Some(72.0),
        );
        Ok(())
    }
}

impl<S: TextShaper> PageSink for PdfSink<S> {
    fn begin_page(&mut self, page: &Page, geometry: &PageGeometry) -> Result<()> {
        let (width, height) = (Mm(pt_to_mm(geometry.width)), Mm(pt_to_mm(geometry.height)));
        let layer_name = format!("Page {}", page.number());
        let layer = match &self.document {
            Some(document) => {
                let (page_index, layer_index) = document.add_page(width, height, layer_name);
                document.get_page(page_index).get_layer(layer_index)
            }
            None => {
                let (document, page_index, layer_index) =
                    PdfDocument::new(self.title.as_str(), width, height, layer_name);
                let layer = document.get_page(page_index).get_layer(layer_index);
                self.document = Some(document);
                layer
            }
        };
        self.layer = Some(layer);
        self.page_height = geometry.height;
        Ok(())
    }

    fn place(&mut self, placement: &Placement) -> Result<()> {
        match &placement.content {
            PlacedContent::Text(text) => self.draw_text(
                placement.position.x,
                placement.position.y,
                placement.size.width,
                &text.text,
                &text.style,
            ),
            PlacedContent::Table(table) => self.draw_table(placement, table),
            PlacedContent::Image(image) => self.draw_image(placement, image),
            PlacedContent::Spacer | PlacedContent::PageBreak => Ok(()),
        }
    }

    fn end_page(&mut self, _page: &Page) -> Result<()> {
        self.layer = None;
        Ok(())
    }
}

/// Writes a line-per-placement summary of the pages.
pub struct OutlineSink<W> {
    writer: W,
}

impl<W: Write> OutlineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn preview(text: &ShapedText) -> String {
    const LIMIT: usize = 48;
    let first = text
        .lines()
        .first()
        .map(|line| line.plain_text())
        .unwrap_or_default();
    if first.chars().count() > LIMIT {
        let cut: String = first.chars().take(LIMIT).collect();
        format!("{cut}...")
    } else {
        first
    }
}

impl<W: Write> PageSink for OutlineSink<W> {
    fn begin_page(&mut self, page: &Page, _geometry: &PageGeometry) -> Result<()> {
        writeln!(self.writer, "page {}", page.number())?;
        Ok(())
    }

    fn place(&mut self, placement: &Placement) -> Result<()> {
        write!(
            self.writer,
            "  block {}.{} {} at ({:.1}, {:.1}) size {:.1}x{:.1}",
            placement.block_index,
            placement.fragment,
            placement.content.kind(),
            placement.position.x,
            placement.position.y,
            placement.size.width,
            placement.size.height,
        )?;
        match &placement.content {
            PlacedContent::Text(text) => writeln!(
                self.writer,
                " [{}, {} lines] {:?}",
                text.style.name,
                text.text.line_count(),
                preview(&text.text)
            )?,
            PlacedContent::Table(table) => writeln!(
                self.writer,
                " [{} rows x {} columns]",
                table.rows.len(),
                table.column_widths.len()
            )?,
            PlacedContent::Image(image) => writeln!(
                self.writer,
                " [{} ({}x{} px)]",
                image.source,
                image.data.width(),
                image.data.height()
            )?,
            PlacedContent::Spacer | PlacedContent::PageBreak => writeln!(self.writer)?,
        }
        Ok(())
    }

    fn end_page(&mut self, page: &Page) -> Result<()> {
        if page.is_blank() {
            writeln!(self.writer, "  (blank)")?;
        }
        Ok(())
    }
}

/// Renders the outline of `pages` into a string.
pub fn outline(pages: &PageSequence) -> Result<String> {
    let mut sink = OutlineSink::new(Vec::new());
    pages.emit(&mut sink)?;
    String::from_utf8(sink.into_inner())
        .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
}
