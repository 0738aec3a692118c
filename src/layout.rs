//! Greedy single-pass pagination.
//!
//! [`paginate`] walks the blocks of a [`Document`] from top to bottom, keeping a
//! cursor that starts at the top margin of the current page.  Every block is
//! measured at the usable width, then either placed at the cursor or pushed to
//! a fresh page.  Tables, images, spacers and page breaks are atomic; text is
//! cut at line boundaries and continues on the next page.
//!
//! Positions in the resulting [`PageSequence`] use a top-left origin with `y`
//! growing downward (see [`crate::geometry`]).

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::geometry::{PageGeometry, Position, Size};
use crate::images::{missing_image_text, ImageData, ImageResolver};
use crate::model::{Block, Document, ImageBlock, TableBlock, TableStyle};
use crate::richtext::{to_markup, Span};
use crate::shaping::{ShapedText, TextShaper};
use crate::style::{ResolvedStyle, StyleSheet};

const EPSILON: f64 = 1e-9;

/// Style used for placeholder text when none is configured and the sheet has it.
pub const DEFAULT_PLACEHOLDER_STYLE: &str = "BodyText";

/// Knobs that change pagination policy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutOptions {
    /// Lets a page break that directly follows another page break stay on the
    /// current page instead of producing an empty page.
    pub suppress_consecutive_breaks: bool,
    /// Style of the text substituted for unavailable images.
    pub placeholder_style: Option<String>,
    /// Additionally caps image widths at the usable page width.
    pub clamp_images_to_frame: bool,
}

impl LayoutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suppress_consecutive_breaks(mut self, suppress: bool) -> Self {
        self.suppress_consecutive_breaks = suppress;
        self
    }

    pub fn with_placeholder_style(mut self, style: impl Into<String>) -> Self {
        self.placeholder_style = Some(style.into());
        self
    }

    pub fn with_clamp_images_to_frame(mut self, clamp: bool) -> Self {
        self.clamp_images_to_frame = clamp;
        self
    }
}

/// Text placed on a page, already wrapped.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedText {
    pub text: ShapedText,
    pub style: ResolvedStyle,
    /// Reference of the image this text stands in for, if it is a placeholder.
    pub missing_image: Option<String>,
}

/// One wrapped table cell.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedCell {
    pub text: ShapedText,
    pub style: ResolvedStyle,
}

/// A measured table.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedTable {
    pub column_widths: Vec<f64>,
    pub row_heights: Vec<f64>,
    pub rows: Vec<Vec<PlacedCell>>,
    pub style: TableStyle,
}

/// A scaled image with its pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedImage {
    pub source: String,
    pub data: ImageData,
}

/// What a placement draws.
#[derive(Clone, Debug, PartialEq)]
pub enum PlacedContent {
    Text(PlacedText),
    Table(PlacedTable),
    Image(PlacedImage),
    Spacer,
    PageBreak,
}

impl PlacedContent {
    /// Short name of the content kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PlacedContent::Text(text) if text.missing_image.is_some() => "placeholder",
            PlacedContent::Text(_) => "text",
            PlacedContent::Table(_) => "table",
            PlacedContent::Image(_) => "image",
            PlacedContent::Spacer => "spacer",
            PlacedContent::PageBreak => "page break",
        }
    }
}

/// A block (or a fragment of a text block) at its final position.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    /// Index of the source block in the document.
    pub block_index: usize,
    /// Zero for whole blocks and first fragments, counting up for continuations.
    pub fragment: usize,
    /// Top-left corner of the placed box.
    pub position: Position,
    /// Rendered extent.
    pub size: Size,
    pub content: PlacedContent,
}

impl Placement {
    /// Offset of the bottom edge from the top of the page.
    pub fn bottom(&self) -> f64 {
        self.position.y + self.size.height
    }
}

/// One laid-out page.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    number: usize,
    placements: Vec<Placement>,
}

impl Page {
    /// One-based page number.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Whether the page holds nothing but break markers.
    pub fn is_blank(&self) -> bool {
        self.placements
            .iter()
            .all(|placement| matches!(placement.content, PlacedContent::PageBreak))
    }
}

/// Ordered pages produced by [`paginate`].
#[derive(Clone, Debug, PartialEq)]
pub struct PageSequence {
    geometry: PageGeometry,
    pages: Vec<Page>,
}

impl PageSequence {
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// All placements of block `index`, in page order.
    pub fn placements_of(&self, index: usize) -> impl Iterator<Item = (&Page, &Placement)> {
        self.pages.iter().flat_map(move |page| {
            page.placements
                .iter()
                .filter(move |placement| placement.block_index == index)
                .map(move |placement| (page, placement))
        })
    }

    /// One-based number of the first page showing block `index`.
    pub fn page_of_block(&self, index: usize) -> Option<usize> {
        self.placements_of(index).next().map(|(page, _)| page.number)
    }
}

/// Lays out `document` onto pages.
///
/// The document is validated first; any invalid block, unresolvable style, or
/// atomic block taller than a page aborts the whole run.  Unavailable images are
/// replaced with placeholder text and do not fail the run.
pub fn paginate<S, R>(
    document: Document,
    shaper: &S,
    resolver: &R,
    options: &LayoutOptions,
) -> Result<PageSequence>
where
    S: TextShaper + ?Sized,
    R: ImageResolver + ?Sized,
{
    document.validate()?;
    let (blocks, geometry, styles) = document.into_parts();
    let mut paginator = Paginator::new(geometry, styles, shaper, resolver, options);

    for (index, block) in blocks.into_iter().enumerate() {
        match block {
            Block::Text(text) => {
                let style = paginator.style(text.style())?;
                paginator.place_text(index, text.text(), style, None)?;
            }
            Block::Table(table) => paginator.place_table(index, &table)?,
            Block::Image(image) => paginator.place_image(index, &image)?,
            Block::Spacer(height) => paginator.place_spacer(index, height)?,
            Block::PageBreak => paginator.place_break(index),
        }
    }

    Ok(paginator.finish())
}

struct Paginator<'a, S: ?Sized, R: ?Sized> {
    geometry: PageGeometry,
    styles: StyleSheet,
    resolved: BTreeMap<String, ResolvedStyle>,
    shaper: &'a S,
    resolver: &'a R,
    options: &'a LayoutOptions,
    pages: Vec<Page>,
    current: Vec<Placement>,
    cursor: f64,
    after_break: bool,
}

impl<'a, S, R> Paginator<'a, S, R>
where
    S: TextShaper + ?Sized,
    R: ImageResolver + ?Sized,
{
    fn new(
        geometry: PageGeometry,
        styles: StyleSheet,
        shaper: &'a S,
        resolver: &'a R,
        options: &'a LayoutOptions,
    ) -> Self {
        Self {
            geometry,
            styles,
            resolved: BTreeMap::new(),
            shaper,
            resolver,
            options,
            pages: Vec::new(),
            current: Vec::new(),
            cursor: geometry.content_top(),
            after_break: false,
        }
    }

    fn style(&mut self, name: &str) -> Result<ResolvedStyle> {
        if let Some(style) = self.resolved.get(name) {
            return Ok(style.clone());
        }
        let style = self.styles.resolve(name)?;
        self.resolved.insert(name.to_owned(), style.clone());
        Ok(style)
    }

    fn placeholder_style(&mut self) -> Result<ResolvedStyle> {
        match self.options.placeholder_style.clone() {
            Some(name) => self.style(&name),
            None if self.styles.contains(DEFAULT_PLACEHOLDER_STYLE) => {
                self.style(DEFAULT_PLACEHOLDER_STYLE)
            }
            None => Ok(self.styles.base().clone()),
        }
    }

    fn shape(
        &self,
        index: usize,
        markup: &str,
        style: &ResolvedStyle,
        width: f64,
    ) -> Result<ShapedText> {
        self.shaper
            .shape(markup, style, width)
            .map_err(|err| Error::InvalidBlock {
                index,
                reason: format!("malformed markup: {err}"),
            })
    }

    fn remaining(&self) -> f64 {
        (self.geometry.content_bottom() - self.cursor).max(0.0)
    }

    fn at_page_top(&self) -> bool {
        self.cursor <= self.geometry.content_top() + EPSILON
    }

    fn advance(&mut self, distance: f64) {
        self.cursor = (self.cursor + distance).min(self.geometry.content_bottom());
    }

    fn new_page(&mut self) {
        let number = self.pages.len() + 1;
        let placements = std::mem::take(&mut self.current);
        debug!("closing page {} with {} placements", number, placements.len());
        self.pages.push(Page { number, placements });
        self.cursor = self.geometry.content_top();
    }

    fn place(
        &mut self,
        block_index: usize,
        fragment: usize,
        x: f64,
        size: Size,
        content: PlacedContent,
    ) {
        self.current.push(Placement {
            block_index,
            fragment,
            position: Position::new(x, self.cursor),
            size,
            content,
        });
        self.advance(size.height);
    }

    /// Horizontal offset that centers a box of `width` in the frame.
    fn centered_x(&self, width: f64) -> f64 {
        self.geometry.margins.left + ((self.geometry.usable_width() - width) / 2.0).max(0.0)
    }

    fn place_atomic(
        &mut self,
        index: usize,
        x: f64,
        size: Size,
        content: PlacedContent,
    ) -> Result<()> {
        let available = self.geometry.usable_height();
        if size.height > available + EPSILON {
            return Err(Error::BlockTooLarge {
                index,
                height: size.height,
                available,
            });
        }
        if size.height > self.remaining() + EPSILON {
            debug!("block {index} ({}) moves to a new page", content.kind());
            self.new_page();
        }
        self.place(index, 0, x, size, content);
        self.after_break = false;
        Ok(())
    }

    fn place_text(
        &mut self,
        index: usize,
        markup: &str,
        style: ResolvedStyle,
        missing_image: Option<String>,
    ) -> Result<()> {
        let frame_width = (self.geometry.usable_width() - style.left_indent).max(0.0);
        let x = self.geometry.margins.left + style.left_indent;
        let mut shaped = self.shape(index, markup, &style, frame_width)?;
        let mut fragment = 0;

        loop {
            let space_before = if fragment == 0 && !self.at_page_top() {
                style.space_before
            } else {
                0.0
            };
            let available = self.remaining() - space_before;
            let fitting = shaped.lines_within(available);

            if fitting >= shaped.line_count() {
                self.advance(space_before);
                let size = Size::new(frame_width, shaped.height());
                let content = PlacedContent::Text(PlacedText {
                    text: shaped,
                    style: style.clone(),
                    missing_image,
                });
                self.place(index, fragment, x, size, content);
                self.advance(style.space_after);
                break;
            }

            // Every split places at least one line and leaves at least one behind.
            let fitting = fitting.min(shaped.line_count() - 1);
            if fitting == 0 {
                if self.at_page_top() {
                    return Err(Error::BlockTooLarge {
                        index,
                        height: shaped.leading(),
                        available: self.geometry.usable_height(),
                    });
                }
                self.new_page();
                continue;
            }

            if let Some((placed, rest)) = shaped.split_at(fitting) {
                debug!(
                    "block {index} split after {fitting} of {} lines",
                    shaped.line_count()
                );
                self.advance(space_before);
                let size = Size::new(frame_width, placed.height());
                let content = PlacedContent::Text(PlacedText {
                    text: placed,
                    style: style.clone(),
                    missing_image: missing_image.clone(),
                });
                self.place(index, fragment, x, size, content);
                shaped = rest;
                fragment += 1;
            }
            self.new_page();
        }

        self.after_break = false;
        Ok(())
    }

    fn place_table(&mut self, index: usize, table: &TableBlock) -> Result<()> {
        let padding = table.style().padding();
        let header_style = table
            .style()
            .header()
            .and_then(|header| header.text_style.clone());

        let mut rows = Vec::with_capacity(table.rows().len());
        let mut row_heights = Vec::with_capacity(table.rows().len());
        for (row_index, row) in table.rows().iter().enumerate() {
            let mut cells = Vec::with_capacity(row.len());
            let mut tallest: f64 = 0.0;
            for (cell, column_width) in row.iter().zip(table.column_widths()) {
                let style_name = match (&header_style, row_index) {
                    (Some(name), 0) => name.as_str(),
                    _ => cell.style(),
                };
                let style = self.style(style_name)?;
                let width = (column_width - padding.horizontal() - style.left_indent).max(0.0);
                let text = self.shape(index, cell.text(), &style, width)?;
                tallest = tallest.max(text.height());
                cells.push(PlacedCell { text, style });
            }
            row_heights.push(tallest + padding.vertical());
            rows.push(cells);
        }

        let size = Size::new(table.width(), row_heights.iter().sum());
        let x = self.centered_x(size.width);
        let content = PlacedContent::Table(PlacedTable {
            column_widths: table.column_widths().to_vec(),
            row_heights,
            rows,
            style: table.style().clone(),
        });
        self.place_atomic(index, x, size, content)
    }

    fn place_image(&mut self, index: usize, image: &ImageBlock) -> Result<()> {
        let data = match self.resolver.resolve(image.source()) {
            Ok(data) => data,
            Err(unavailable) => {
                warn!("{unavailable}; substituting placeholder text for block {index}");
                let style = self.placeholder_style()?;
                let text = to_markup(&[Span::new(missing_image_text(image.source()))]);
                return self.place_text(index, &text, style, Some(image.source().to_owned()));
            }
        };

        let (width, height) = if self.options.clamp_images_to_frame {
            image.scaled_size_within(self.geometry.usable_width())
        } else {
            image.scaled_size()
        };
        let x = self.centered_x(width);
        let content = PlacedContent::Image(PlacedImage {
            source: image.source().to_owned(),
            data,
        });
        self.place_atomic(index, x, Size::new(width, height), content)
    }

    fn place_spacer(&mut self, index: usize, height: f64) -> Result<()> {
        let x = self.geometry.margins.left;
        let size = Size::new(self.geometry.usable_width(), height);
        self.place_atomic(index, x, size, PlacedContent::Spacer)
    }

    fn place_break(&mut self, index: usize) {
        if self.options.suppress_consecutive_breaks && self.after_break {
            debug!("page break {index} follows another break; staying on the current page");
        } else {
            self.new_page();
        }
        let x = self.geometry.margins.left;
        self.place(index, 0, x, Size::default(), PlacedContent::PageBreak);
        self.after_break = true;
    }

    fn finish(mut self) -> PageSequence {
        self.new_page();
        PageSequence {
            geometry: self.geometry,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Margins;
    use crate::images::MemoryImageResolver;
    use crate::shaping::StandardFontShaper;
    use crate::style::Style;

    fn document(blocks: Vec<Block>) -> Document {
        Document::new(
            blocks,
            PageGeometry::letter().with_margins(Margins::uniform(36.0)),
            StyleSheet::sample(),
        )
    }

    fn run(blocks: Vec<Block>, options: &LayoutOptions) -> Result<PageSequence> {
        paginate(
            document(blocks),
            &StandardFontShaper::new(),
            &MemoryImageResolver::new(),
            options,
        )
    }

    #[test]
    fn empty_document_yields_one_blank_page() {
        let pages = run(Vec::new(), &LayoutOptions::default()).expect("lays out");
        assert_eq!(pages.len(), 1);
        assert!(pages.pages()[0].is_blank());
    }

    #[test]
    fn cursor_starts_at_top_margin_and_accumulates() {
        let pages = run(
            vec![Block::spacer(100.0), Block::paragraph("Hello", "Normal")],
            &LayoutOptions::default(),
        )
        .expect("lays out");
        let placements = pages.pages()[0].placements();
        assert_eq!(placements[0].position, Position::new(36.0, 36.0));
        assert_eq!(placements[1].position.y, 136.0);
        assert_eq!(placements[1].size.height, 12.0);
    }

    #[test]
    fn space_before_is_dropped_at_page_top() {
        let pages = run(
            vec![
                Block::paragraph("First", "BodyText"),
                Block::paragraph("Second", "BodyText"),
            ],
            &LayoutOptions::default(),
        )
        .expect("lays out");
        let placements = pages.pages()[0].placements();
        assert_eq!(placements[0].position.y, 36.0);
        assert_eq!(placements[1].position.y, 36.0 + 12.0 + 6.0);
    }

    #[test]
    fn suppressed_breaks_share_a_page() {
        let options = LayoutOptions::new().with_suppress_consecutive_breaks(true);
        let pages = run(
            vec![
                Block::paragraph("Cover", "Title"),
                Block::PageBreak,
                Block::PageBreak,
                Block::paragraph("Body", "BodyText"),
            ],
            &options,
        )
        .expect("lays out");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages.pages()[1].placements().len(), 3);
    }

    #[test]
    fn unknown_style_aborts() {
        let err = run(
            vec![Block::paragraph("Hello", "Nope")],
            &LayoutOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownStyle { style } if style == "Nope"));
    }

    #[test]
    fn oversized_spacer_is_rejected() {
        let err = run(vec![Block::spacer(721.0)], &LayoutOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::BlockTooLarge { index: 0, available, .. } if available == 720.0
        ));
    }

    fn edge_run(height: f64) -> PageSequence {
        let edge = Style::new("Edge").with_parent("Normal").with_leading(12.1);
        let styles = StyleSheet::sample().with_style(edge);
        let document = Document::new(
            vec![Block::paragraph("a<br/>b<br/>c<br/>d<br/>e", "Edge")],
            PageGeometry::new(200.0, height).with_margins(Margins::uniform(0.0)),
            styles,
        );
        paginate(
            document,
            &StandardFontShaper::new(),
            &MemoryImageResolver::new(),
            &LayoutOptions::default(),
        )
        .expect("lays out")
    }

    #[test]
    fn text_filling_the_frame_to_rounding_stays_whole() {
        let pages = edge_run(12.1 * 5.0 - 1e-10);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages.placements_of(0).count(), 1);
    }

    #[test]
    fn text_slightly_taller_than_the_frame_places_a_line_per_split() {
        let pages = edge_run(60.4);
        assert_eq!(pages.len(), 2);
        let lines: Vec<_> = pages
            .placements_of(0)
            .map(|(_, placement)| match &placement.content {
                PlacedContent::Text(text) => text.text.line_count(),
                other => panic!("expected text, got {other:?}"),
            })
            .collect();
        assert_eq!(lines, vec![4, 1]);
    }

    #[test]
    fn clamped_images_fit_the_frame() {
        let resolver = MemoryImageResolver::new().with_image(
            "Wide.png",
            ImageData::solid(8, 4, crate::style::Color::WHITE),
        );
        let options = LayoutOptions::new().with_clamp_images_to_frame(true);
        let pages = paginate(
            document(vec![Block::image("Wide.png", 2000.0, 1000.0, 1000.0)]),
            &StandardFontShaper::new(),
            &resolver,
            &options,
        )
        .expect("lays out");
        let placement = &pages.pages()[0].placements()[0];
        assert_eq!(placement.size, Size::new(540.0, 270.0));
        assert_eq!(placement.position.x, 36.0);
    }
}
