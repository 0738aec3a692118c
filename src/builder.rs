//! High-level manual construction.
//!
//! [`ManualBuilder`] collects blocks and sections, then runs the
//! validate, paginate and emit pipeline in one call.

use log::{info, warn};

use crate::error::Result;
use crate::fonts::{FontFiles, TrueTypeShaper};
use crate::geometry::{Margins, PageGeometry, Size};
use crate::images::{missing_image_text, probe_image, ImageResolver};
use crate::layout::{paginate, LayoutOptions, PageSequence, DEFAULT_PLACEHOLDER_STYLE};
use crate::model::{Block, Document, Section, TableBlock};
use crate::richtext::{to_markup, Span};
use crate::shaping::TextShaper;
use crate::sink::PdfSink;
use crate::style::StyleSheet;

/// Where a section heading ended up in the block list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionMark {
    pub title: String,
    pub identifier: Option<String>,
    /// Index of the heading block.
    pub block_index: usize,
}

/// Output of a full render.
#[derive(Clone, Debug)]
pub struct RenderedManual {
    /// Serialized PDF.
    pub bytes: Vec<u8>,
    /// The page sequence the PDF was drawn from.
    pub pages: PageSequence,
    /// First page of every section, in section order.
    pub section_pages: Vec<Option<usize>>,
}

/// Image block sized from the resolver's pixel dimensions of `reference`.
///
/// Falls back to placeholder text in `placeholder_style` when the image cannot be probed.
pub fn screenshot_block<R: ImageResolver + ?Sized>(
    resolver: &R,
    reference: &str,
    max_width: f64,
    placeholder_style: &str,
) -> Block {
    match probe_image(resolver, reference, max_width) {
        Ok(image) => Block::Image(image),
        Err(unavailable) => {
            warn!("{unavailable}; substituting placeholder text");
            let text = to_markup(&[Span::new(missing_image_text(reference))]);
            Block::paragraph(text, placeholder_style)
        }
    }
}

/// Builder for manuals with the sample style sheet and letter pages by default.
#[derive(Clone, Debug)]
pub struct ManualBuilder {
    title: String,
    geometry: PageGeometry,
    styles: StyleSheet,
    options: LayoutOptions,
    blocks: Vec<Block>,
    sections: Vec<SectionMark>,
}

impl Default for ManualBuilder {
    fn default() -> Self {
        Self::new("Manual")
    }
}

impl ManualBuilder {
    /// Creates a new builder; `title` ends up in the PDF metadata.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            geometry: PageGeometry::default(),
            styles: StyleSheet::sample(),
            options: LayoutOptions::default(),
            blocks: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// Sets the page size, keeping the current margins.
    pub fn with_paper_size(mut self, size: Size) -> Self {
        self.geometry =
            PageGeometry::new(size.width, size.height).with_margins(self.geometry.margins);
        self
    }

    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.geometry = self.geometry.with_margins(margins);
        self
    }

    pub fn with_styles(mut self, styles: StyleSheet) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_options(mut self, options: LayoutOptions) -> Self {
        self.options = options;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn sections(&self) -> &[SectionMark] {
        &self.sections
    }

    /// Appends a block in place.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Appends a block and returns the updated builder.
    pub fn block(mut self, block: Block) -> Self {
        self.push(block);
        self
    }

    /// Appends a text block with inline markup.
    pub fn paragraph(self, text: impl Into<String>, style: impl Into<String>) -> Self {
        self.block(Block::paragraph(text, style))
    }

    /// Appends plain text as a heading, escaping any markup characters.
    pub fn heading(self, text: &str, style: impl Into<String>) -> Self {
        self.block(Block::paragraph(to_markup(&[Span::new(text)]), style))
    }

    pub fn table(self, table: TableBlock) -> Self {
        self.block(Block::Table(table))
    }

    pub fn spacer(self, height: f64) -> Self {
        self.block(Block::spacer(height))
    }

    pub fn page_break(self) -> Self {
        self.block(Block::PageBreak)
    }

    /// Appends the image at `reference`, sized from the resolver's pixel dimensions.
    ///
    /// When the image cannot be probed, placeholder text is appended instead.
    pub fn screenshot<R: ImageResolver + ?Sized>(
        mut self,
        reference: &str,
        max_width: f64,
        resolver: &R,
    ) -> Self {
        self.push_screenshot(reference, max_width, resolver);
        self
    }

    /// In-place variant of [`ManualBuilder::screenshot`].
    pub fn push_screenshot<R: ImageResolver + ?Sized>(
        &mut self,
        reference: &str,
        max_width: f64,
        resolver: &R,
    ) {
        let style = self
            .options
            .placeholder_style
            .as_deref()
            .unwrap_or(DEFAULT_PLACEHOLDER_STYLE);
        let block = screenshot_block(resolver, reference, max_width, style);
        self.push(block);
    }

    /// Appends a section, recording where its heading lands.
    pub fn section(mut self, section: Section) -> Self {
        self.push_section(section);
        self
    }

    /// In-place variant of [`ManualBuilder::section`].
    pub fn push_section(&mut self, section: Section) {
        let title = section.title().to_owned();
        let identifier = section.identifier().map(str::to_owned);
        let (blocks, heading_offset) = section.into_blocks();
        self.sections.push(SectionMark {
            title,
            identifier,
            block_index: self.blocks.len() + heading_offset,
        });
        self.blocks.extend(blocks);
    }

    /// Assembles the document without laying it out.
    pub fn build(&self) -> Document {
        Document::new(self.blocks.clone(), self.geometry, self.styles.clone())
    }

    /// Lays the manual out without serializing it.
    pub fn layout<S, R>(&self, shaper: &S, resolver: &R) -> Result<PageSequence>
    where
        S: TextShaper + ?Sized,
        R: ImageResolver + ?Sized,
    {
        paginate(self.build(), shaper, resolver, &self.options)
    }

    /// Lays out the manual with `shaper` and renders it with the PDF base-14 fonts.
    pub fn render<S, R>(&self, shaper: &S, resolver: &R) -> Result<RenderedManual>
    where
        S: TextShaper,
        R: ImageResolver + ?Sized,
    {
        let pages = self.layout(shaper, resolver)?;
        self.emit_pdf(pages, PdfSink::new(self.title.as_str(), shaper))
    }

    /// Lays out and renders the manual in the TrueType family `fonts`, embedding its faces.
    pub fn render_embedded<R>(&self, fonts: &FontFiles, resolver: &R) -> Result<RenderedManual>
    where
        R: ImageResolver + ?Sized,
    {
        let shaper = TrueTypeShaper::from_files(fonts)?;
        let pages = self.layout(&shaper, resolver)?;
        let sink = PdfSink::new(self.title.as_str(), &shaper).with_embedded_fonts(fonts.clone());
        self.emit_pdf(pages, sink)
    }

    fn emit_pdf<S: TextShaper>(
        &self,
        pages: PageSequence,
        mut sink: PdfSink<S>,
    ) -> Result<RenderedManual> {
        pages.emit(&mut sink)?;
        let bytes = sink.finish()?;
        info!(
            "rendered '{}' to {} pages ({} bytes)",
            self.title,
            pages.len(),
            bytes.len()
        );

        let section_pages = self
            .sections
            .iter()
            .map(|section| pages.page_of_block(section.block_index))
            .collect();
        Ok(RenderedManual {
            bytes,
            pages,
            section_pages,
        })
    }

    /// Renders the manual with `shaper` and adds a bookmark per section.
    #[cfg(feature = "bookmarks")]
    pub fn render_with_bookmarks<S, R>(&self, shaper: &S, resolver: &R) -> Result<RenderedManual>
    where
        S: TextShaper,
        R: ImageResolver + ?Sized,
    {
        let rendered = self.render(shaper, resolver)?;
        self.add_bookmarks(rendered)
    }

    /// Adds an outline entry for every placed section to an already rendered manual.
    #[cfg(feature = "bookmarks")]
    pub fn add_bookmarks(&self, mut rendered: RenderedManual) -> Result<RenderedManual> {
        let bookmarks: Vec<_> = self
            .sections
            .iter()
            .zip(&rendered.section_pages)
            .filter_map(|(section, page)| {
                page.map(|page| crate::bookmarks::Bookmark {
                    title: section.title.clone(),
                    identifier: section.identifier.clone(),
                    page,
                })
            })
            .collect();
        rendered.bytes = crate::bookmarks::apply_bookmarks(&rendered.bytes, &bookmarks)?;
        Ok(rendered)
    }
}
