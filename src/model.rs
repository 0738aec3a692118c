//! Data structures describing the logical content of a manual.
//!
//! The types in this module are plain values: a [`Document`] is an ordered list
//! of [`Block`]s plus the page geometry and style sheet they are laid out with.
//! Nothing here measures text or touches image files; that happens in
//! [`crate::layout`] through the capabilities it is handed.

use crate::geometry::PageGeometry;
use crate::richtext;
use crate::style::{Color, StyleSheet};

/// A run of text with inline markup, drawn in a named style.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    text: String,
    style: String,
}

impl TextBlock {
    /// Creates a text block using the style registered under `style`.
    pub fn new(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: style.into(),
        }
    }

    /// Returns the text, including any inline markup.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the style name.
    pub fn style(&self) -> &str {
        &self.style
    }
}

/// Padding applied inside every table cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellPadding {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl CellPadding {
    /// Same padding on all sides.
    pub fn uniform(padding: f64) -> Self {
        Self {
            top: padding,
            bottom: padding,
            left: padding,
            right: padding,
        }
    }

    /// Separate vertical and horizontal padding.
    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            bottom: vertical,
            left: horizontal,
            right: horizontal,
        }
    }

    /// Combined top and bottom padding.
    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }

    /// Combined left and right padding.
    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }
}

impl Default for CellPadding {
    fn default() -> Self {
        Self::uniform(6.0)
    }
}

/// Styling of the first table row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderRule {
    /// Fill behind the header cells.
    pub background: Option<Color>,
    /// Style replacing the cells' own style for header text.
    pub text_style: Option<String>,
}

/// Grid lines drawn around every cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLines {
    pub width: f64,
    pub color: Color,
}

impl Default for GridLines {
    fn default() -> Self {
        Self {
            width: 1.0,
            color: Color::GREY,
        }
    }
}

/// Per-region style rules of a table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableStyle {
    header: Option<HeaderRule>,
    banding: Vec<Color>,
    grid: Option<GridLines>,
    padding: CellPadding,
}

impl TableStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treats the first row as a header.
    pub fn with_header(mut self, header: HeaderRule) -> Self {
        self.header = Some(header);
        self
    }

    /// Cycles the given backgrounds over the body rows.
    pub fn with_banding(mut self, colors: impl IntoIterator<Item = Color>) -> Self {
        self.banding = colors.into_iter().collect();
        self
    }

    pub fn with_grid(mut self, grid: GridLines) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_padding(mut self, padding: CellPadding) -> Self {
        self.padding = padding;
        self
    }

    pub fn header(&self) -> Option<&HeaderRule> {
        self.header.as_ref()
    }

    pub fn banding(&self) -> &[Color] {
        &self.banding
    }

    pub fn grid(&self) -> Option<GridLines> {
        self.grid
    }

    pub fn padding(&self) -> CellPadding {
        self.padding
    }

    /// Background of row `row`, taking the header rule and banding into account.
    pub fn row_background(&self, row: usize) -> Option<Color> {
        match (&self.header, row) {
            (Some(header), 0) => header.background,
            (Some(_), body) => self.band(body - 1),
            (None, body) => self.band(body),
        }
    }

    fn band(&self, body_row: usize) -> Option<Color> {
        if self.banding.is_empty() {
            None
        } else {
            Some(self.banding[body_row % self.banding.len()])
        }
    }
}

/// A grid of text cells with fixed column widths.
#[derive(Clone, Debug, PartialEq)]
pub struct TableBlock {
    rows: Vec<Vec<TextBlock>>,
    column_widths: Vec<f64>,
    style: TableStyle,
}

impl TableBlock {
    /// Creates a table from rows of cells and the width of each column.
    pub fn new(rows: Vec<Vec<TextBlock>>, column_widths: Vec<f64>) -> Self {
        Self {
            rows,
            column_widths,
            style: TableStyle::default(),
        }
    }

    /// Builds a table whose cells all share one style.
    pub fn from_strings<R, C, S>(rows: R, column_widths: Vec<f64>, style: &str) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| TextBlock::new(cell, style))
                    .collect()
            })
            .collect();
        Self::new(rows, column_widths)
    }

    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.style = style;
        self
    }

    pub fn rows(&self) -> &[Vec<TextBlock>] {
        &self.rows
    }

    pub fn column_widths(&self) -> &[f64] {
        &self.column_widths
    }

    pub fn style(&self) -> &TableStyle {
        &self.style
    }

    /// Total width of all columns.
    pub fn width(&self) -> f64 {
        self.column_widths.iter().sum()
    }
}

/// An image referenced by name, scaled to fit a maximum width.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    source: String,
    intrinsic_width: f64,
    intrinsic_height: f64,
    max_width: f64,
}

impl ImageBlock {
    /// Creates an image block from its reference, intrinsic size and target maximum width.
    pub fn new(
        source: impl Into<String>,
        intrinsic_width: f64,
        intrinsic_height: f64,
        max_width: f64,
    ) -> Self {
        Self {
            source: source.into(),
            intrinsic_width,
            intrinsic_height,
            max_width,
        }
    }

    /// Returns the source reference handed to the image resolver.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn intrinsic_width(&self) -> f64 {
        self.intrinsic_width
    }

    pub fn intrinsic_height(&self) -> f64 {
        self.intrinsic_height
    }

    /// Returns the width the image must not exceed.
    pub fn max_width(&self) -> f64 {
        self.max_width
    }

    /// Size after scaling down to the target width, never scaling up.
    ///
    /// The width is `min(intrinsic_width, max_width)` and the height follows the
    /// intrinsic aspect ratio.
    pub fn scaled_size(&self) -> (f64, f64) {
        self.scaled_size_within(self.max_width)
    }

    /// Like [`ImageBlock::scaled_size`], with an additional width ceiling.
    pub fn scaled_size_within(&self, ceiling: f64) -> (f64, f64) {
        let width = self.intrinsic_width.min(self.max_width).min(ceiling);
        let height = self.intrinsic_height * (width / self.intrinsic_width);
        (width, height)
    }
}

/// Individual content blocks that make up a document.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Styled, splittable text.
    Text(TextBlock),
    /// Atomic table.
    Table(TableBlock),
    /// Atomic image.
    Image(ImageBlock),
    /// Fixed vertical space.
    Spacer(f64),
    /// Explicit page break request.
    PageBreak,
}

impl Block {
    /// Convenience helper for building a text block.
    pub fn paragraph(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self::Text(TextBlock::new(text, style))
    }

    /// Convenience helper for building an image block.
    pub fn image(source: impl Into<String>, width: f64, height: f64, max_width: f64) -> Self {
        Self::Image(ImageBlock::new(source, width, height, max_width))
    }

    /// Convenience helper for building a spacer.
    pub fn spacer(height: f64) -> Self {
        Self::Spacer(height)
    }

    /// Convenience helper that yields an explicit page break block.
    pub fn page_break() -> Self {
        Self::PageBreak
    }

    /// Whether the block must be placed whole on a single page.
    pub fn is_atomic(&self) -> bool {
        !matches!(self, Block::Text(_))
    }

    /// Short name of the block kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Text(_) => "text",
            Block::Table(_) => "table",
            Block::Image(_) => "image",
            Block::Spacer(_) => "spacer",
            Block::PageBreak => "page break",
        }
    }

    /// Checks the structural invariants of the block.
    ///
    /// Style names are not checked here; they are resolved against the style
    /// sheet during layout.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Block::Text(text) => validate_markup(text),
            Block::Table(table) => validate_table(table),
            Block::Image(image) => validate_image(image),
            Block::Spacer(height) => {
                if height.is_finite() && *height >= 0.0 {
                    Ok(())
                } else {
                    Err(format!("spacer height {height} must be finite and non-negative"))
                }
            }
            Block::PageBreak => Ok(()),
        }
    }
}

fn validate_markup(text: &TextBlock) -> Result<(), String> {
    richtext::parse_markup(text.text())
        .map(|_| ())
        .map_err(|err| format!("malformed markup: {err}"))
}

fn validate_table(table: &TableBlock) -> Result<(), String> {
    if table.rows.is_empty() {
        return Err("table has no rows".to_owned());
    }
    let columns = table.column_widths.len();
    if columns == 0 {
        return Err("table has no columns".to_owned());
    }
    if let Some(width) = table
        .column_widths
        .iter()
        .find(|width| !width.is_finite() || **width <= 0.0)
    {
        return Err(format!("column width {width} must be positive"));
    }
    for (row_index, row) in table.rows.iter().enumerate() {
        if row.len() != columns {
            return Err(format!(
                "row {row_index} has {} cells but the table declares {columns} columns",
                row.len()
            ));
        }
        for (column, cell) in row.iter().enumerate() {
            validate_markup(cell).map_err(|err| format!("cell ({row_index}, {column}): {err}"))?;
        }
    }
    Ok(())
}

fn validate_image(image: &ImageBlock) -> Result<(), String> {
    let positive = |value: f64| value.is_finite() && value > 0.0;
    if !positive(image.intrinsic_width) || !positive(image.intrinsic_height) {
        return Err(format!(
            "image `{}` has invalid intrinsic size {}x{}",
            image.source, image.intrinsic_width, image.intrinsic_height
        ));
    }
    if !positive(image.max_width) {
        return Err(format!(
            "image `{}` has invalid target width {}",
            image.source, image.max_width
        ));
    }
    Ok(())
}

/// Ordered content blocks together with the geometry and styles used to lay them out.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
    geometry: PageGeometry,
    styles: StyleSheet,
}

impl Document {
    /// Creates a document from its parts.
    pub fn new(blocks: Vec<Block>, geometry: PageGeometry, styles: StyleSheet) -> Self {
        Self {
            blocks,
            geometry,
            styles,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    /// Validates the geometry and every block, reporting the first failure.
    pub fn validate(&self) -> crate::Result<()> {
        self.geometry.validate()?;
        for (index, block) in self.blocks.iter().enumerate() {
            block
                .validate()
                .map_err(|reason| crate::Error::InvalidBlock { index, reason })?;
        }
        Ok(())
    }

    /// Splits the document back into its parts.
    pub fn into_parts(self) -> (Vec<Block>, PageGeometry, StyleSheet) {
        (self.blocks, self.geometry, self.styles)
    }
}

/// Logical grouping of blocks under a heading.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    identifier: Option<String>,
    title: String,
    heading_style: String,
    blocks: Vec<Block>,
    start_on_new_page: bool,
}

impl Section {
    /// Creates a new section with the provided title, rendered in `Heading2`.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            identifier: None,
            title: title.into(),
            heading_style: "Heading2".to_owned(),
            blocks: Vec::new(),
            start_on_new_page: false,
        }
    }

    /// Returns the section identifier used for bookmarks or cross references.
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn heading_style(&self) -> &str {
        &self.heading_style
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Whether a page break is inserted before the heading.
    pub fn starts_on_new_page(&self) -> bool {
        self.start_on_new_page
    }

    /// Sets the identifier and returns the updated section.
    pub fn with_identifier(mut self, identifier: impl Into<Option<String>>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Sets the heading style and returns the updated section.
    pub fn with_heading_style(mut self, style: impl Into<String>) -> Self {
        self.heading_style = style.into();
        self
    }

    /// Appends a block and returns the updated section.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Extends the section with additional blocks and returns the updated instance.
    pub fn with_blocks<I>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        self.blocks.extend(blocks);
        self
    }

    /// Requests a page break ahead of the heading.
    pub fn start_on_new_page(mut self, start_on_new_page: bool) -> Self {
        self.start_on_new_page = start_on_new_page;
        self
    }

    /// Flattens the section into blocks, returning them with the offset of the heading.
    ///
    /// A leading break is skipped when the section's own first block already is one.
    pub fn into_blocks(self) -> (Vec<Block>, usize) {
        let mut blocks = Vec::with_capacity(self.blocks.len() + 2);
        let mut body = self.blocks.into_iter().peekable();
        if self.start_on_new_page {
            blocks.push(Block::PageBreak);
            if matches!(body.peek(), Some(Block::PageBreak)) {
                body.next();
            }
        }
        let heading_offset = blocks.len();
        blocks.push(Block::paragraph(self.title, self.heading_style));
        blocks.extend(body);
        (blocks, heading_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_never_upscales() {
        let small = ImageBlock::new("icon.png", 120.0, 60.0, 396.0);
        assert_eq!(small.scaled_size(), (120.0, 60.0));

        let large = ImageBlock::new("Dashboard.png", 2000.0, 1000.0, 396.0);
        assert_eq!(large.scaled_size(), (396.0, 198.0));
    }

    #[test]
    fn ragged_table_is_invalid() {
        let table = TableBlock::from_strings(
            vec![vec!["Column Name", "Data Type"], vec!["Id"]],
            vec![80.0, 80.0],
            "BodyText",
        );
        let reason = Block::Table(table).validate().unwrap_err();
        assert!(reason.contains("row 1 has 1 cells"));
    }

    #[test]
    fn zero_sized_image_is_invalid() {
        assert!(Block::image("Login.png", 0.0, 300.0, 400.0).validate().is_err());
        assert!(Block::image("Login.png", 300.0, 0.0, 400.0).validate().is_err());
        assert!(Block::image("Login.png", 300.0, 200.0, 400.0).validate().is_ok());
    }

    #[test]
    fn document_reports_offending_index() {
        let document = Document::new(
            vec![Block::paragraph("fine", "BodyText"), Block::spacer(-1.0)],
            PageGeometry::letter(),
            StyleSheet::sample(),
        );
        assert!(matches!(
            document.validate(),
            Err(crate::Error::InvalidBlock { index: 1, .. })
        ));
    }

    #[test]
    fn banding_skips_header_row() {
        let style = TableStyle::new()
            .with_header(HeaderRule {
                background: Some(Color::rgb(0x66, 0x7e, 0xea)),
                text_style: None,
            })
            .with_banding([Color::WHITE, Color::rgb(0xf0, 0xf4, 0xff)]);
        assert_eq!(style.row_background(0), Some(Color::rgb(0x66, 0x7e, 0xea)));
        assert_eq!(style.row_background(1), Some(Color::WHITE));
        assert_eq!(style.row_background(2), Some(Color::rgb(0xf0, 0xf4, 0xff)));
        assert_eq!(style.row_background(3), Some(Color::WHITE));
    }

    #[test]
    fn section_inserts_single_page_break() {
        let (blocks, heading) = Section::new("Intro")
            .start_on_new_page(true)
            .with_block(Block::PageBreak)
            .with_block(Block::paragraph("Body", "BodyText"))
            .into_blocks();

        assert_eq!(heading, 1);
        assert!(matches!(blocks[0], Block::PageBreak));
        assert!(matches!(&blocks[1], Block::Text(text) if text.text() == "Intro"));
        assert_eq!(blocks.len(), 3);
    }
}
