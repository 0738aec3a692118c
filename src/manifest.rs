//! TOML content manifests.
//!
//! A manifest describes a whole manual: page setup, layout options, extra
//! styles and the ordered blocks.  Lengths are in points.
//!
//! ```toml
//! title = "Contact Management System"
//! paper = "a4"
//! margins = 50.4
//!
//! [options]
//! suppress_consecutive_breaks = true
//!
//! [[styles]]
//! name = "HeadingStyle"
//! parent = "Heading2"
//! text_color = "#0EA5E9"
//!
//! [[blocks]]
//! kind = "heading"
//! text = "1) Login"
//! style = "HeadingStyle"
//!
//! [[blocks]]
//! kind = "image"
//! source = "Login.png"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::builder::ManualBuilder;
use crate::error::{Error, Result};
use crate::geometry::{Margins, PageGeometry};
use crate::images::ImageResolver;
use crate::layout::LayoutOptions;
use crate::model::{Block, CellPadding, GridLines, HeaderRule, Section, TableBlock, TableStyle};
use crate::style::{Color, HorizontalAlignment, Style, StyleSheet};

fn default_title() -> String {
    "Manual".to_owned()
}

fn default_text_style() -> String {
    "BodyText".to_owned()
}

fn default_heading_style() -> String {
    "Heading2".to_owned()
}

fn default_grid_width() -> f64 {
    1.0
}

/// Paper sizes a manifest can name.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Paper {
    #[default]
    Letter,
    A4,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MarginSpec {
    Uniform(f64),
    Sides {
        top: f64,
        bottom: f64,
        left: f64,
        right: f64,
    },
}

impl From<MarginSpec> for Margins {
    fn from(spec: MarginSpec) -> Self {
        match spec {
            MarginSpec::Uniform(value) => Margins::uniform(value),
            MarginSpec::Sides {
                top,
                bottom,
                left,
                right,
            } => Margins::trbl(top, right, bottom, left),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsSpec {
    pub suppress_consecutive_breaks: bool,
    pub placeholder_style: Option<String>,
    pub clamp_images_to_frame: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentSpec {
    Left,
    Center,
    Right,
    Justified,
}

impl From<AlignmentSpec> for HorizontalAlignment {
    fn from(spec: AlignmentSpec) -> Self {
        match spec {
            AlignmentSpec::Left => HorizontalAlignment::Left,
            AlignmentSpec::Center => HorizontalAlignment::Center,
            AlignmentSpec::Right => HorizontalAlignment::Right,
            AlignmentSpec::Justified => HorizontalAlignment::Justified,
        }
    }
}

/// A named style overriding some attributes of its parent.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StyleSpec {
    pub name: String,
    pub parent: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub text_color: Option<String>,
    pub alignment: Option<AlignmentSpec>,
    pub space_before: Option<f64>,
    pub space_after: Option<f64>,
    pub leading: Option<f64>,
    pub left_indent: Option<f64>,
}

fn parse_color(value: &str) -> Result<Color> {
    Color::from_hex(value)
        .ok_or_else(|| Error::Manifest(format!("invalid color `{value}`, expected #RRGGBB")))
}

impl StyleSpec {
    fn to_style(&self) -> Result<Style> {
        let mut style = Style::new(self.name.as_str());
        if let Some(parent) = &self.parent {
            style = style.with_parent(parent.as_str());
        }
        if let Some(family) = &self.font_family {
            style = style.with_font_family(family.as_str());
        }
        if let Some(size) = self.font_size {
            style = style.with_font_size(size);
        }
        if let Some(color) = &self.text_color {
            style = style.with_text_color(parse_color(color)?);
        }
        if let Some(alignment) = self.alignment {
            style = style.with_alignment(alignment.into());
        }
        if let Some(space) = self.space_before {
            style = style.with_space_before(space);
        }
        if let Some(space) = self.space_after {
            style = style.with_space_after(space);
        }
        if let Some(leading) = self.leading {
            style = style.with_leading(leading);
        }
        if let Some(indent) = self.left_indent {
            style = style.with_left_indent(indent);
        }
        Ok(style)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HeaderSpec {
    pub background: Option<String>,
    pub style: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GridSpec {
    #[serde(default = "default_grid_width")]
    pub width: f64,
    pub color: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    pub rows: Vec<Vec<String>>,
    pub column_widths: Vec<f64>,
    #[serde(default = "default_text_style")]
    pub style: String,
    pub header: Option<HeaderSpec>,
    #[serde(default)]
    pub banding: Vec<String>,
    pub grid: Option<GridSpec>,
    pub padding: Option<f64>,
}

impl TableSpec {
    fn to_block(&self) -> Result<TableBlock> {
        let mut style = TableStyle::new();
        if let Some(header) = &self.header {
            style = style.with_header(HeaderRule {
                background: header.background.as_deref().map(parse_color).transpose()?,
                text_style: header.style.clone(),
            });
        }
        if !self.banding.is_empty() {
            let colors = self
                .banding
                .iter()
                .map(|color| parse_color(color))
                .collect::<Result<Vec<_>>>()?;
            style = style.with_banding(colors);
        }
        if let Some(grid) = &self.grid {
            let color = match &grid.color {
                Some(color) => parse_color(color)?,
                None => GridLines::default().color,
            };
            style = style.with_grid(GridLines {
                width: grid.width,
                color,
            });
        }
        if let Some(padding) = self.padding {
            style = style.with_padding(CellPadding::uniform(padding));
        }
        Ok(
            TableBlock::from_strings(self.rows.clone(), self.column_widths.clone(), &self.style)
                .with_style(style),
        )
    }
}

/// One entry of `[[blocks]]`, tagged by `kind`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum BlockSpec {
    Text {
        text: String,
        #[serde(default = "default_text_style")]
        style: String,
    },
    /// A heading that also opens a bookmarked section.
    Heading {
        text: String,
        #[serde(default = "default_heading_style")]
        style: String,
        id: Option<String>,
        #[serde(default)]
        new_page: bool,
    },
    Table(TableSpec),
    /// An image; without `width` and `height` its size is probed through the resolver.
    Image {
        source: String,
        width: Option<f64>,
        height: Option<f64>,
        max_width: Option<f64>,
    },
    Spacer {
        height: f64,
    },
    PageBreak,
}

/// A deserialized manifest.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub paper: Paper,
    pub margins: Option<MarginSpec>,
    #[serde(default)]
    pub options: OptionsSpec,
    #[serde(default)]
    pub styles: Vec<StyleSpec>,
    #[serde(default)]
    pub blocks: Vec<BlockSpec>,
}

impl Manifest {
    /// Parses a manifest from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| Error::Manifest(err.to_string()))
    }

    /// Reads and parses the manifest at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
            .map_err(|err| Error::Manifest(format!("{}: {err}", path.display())))
    }

    pub fn geometry(&self) -> PageGeometry {
        let paper = match self.paper {
            Paper::Letter => PageGeometry::letter(),
            Paper::A4 => PageGeometry::a4(),
        };
        match self.margins {
            Some(margins) => paper.with_margins(margins),
            None => paper,
        }
    }

    pub fn options(&self) -> LayoutOptions {
        LayoutOptions {
            suppress_consecutive_breaks: self.options.suppress_consecutive_breaks,
            placeholder_style: self.options.placeholder_style.clone(),
            clamp_images_to_frame: self.options.clamp_images_to_frame,
        }
    }

    /// The sample sheet extended with the manifest's styles.
    pub fn style_sheet(&self) -> Result<StyleSheet> {
        let mut sheet = StyleSheet::sample();
        for spec in &self.styles {
            sheet.insert(spec.to_style()?);
        }
        Ok(sheet)
    }

    /// Turns the manifest into a builder, probing undeclared image sizes through `resolver`.
    pub fn to_builder<R: ImageResolver + ?Sized>(&self, resolver: &R) -> Result<ManualBuilder> {
        let geometry = self.geometry();
        let default_max_width = geometry.usable_width();
        let mut builder = ManualBuilder::new(self.title.as_str())
            .with_geometry(geometry)
            .with_styles(self.style_sheet()?)
            .with_options(self.options());

        for spec in &self.blocks {
            match spec {
                BlockSpec::Text { text, style } => {
                    builder.push(Block::paragraph(text.as_str(), style.as_str()))
                }
                BlockSpec::Heading {
                    text,
                    style,
                    id,
                    new_page,
                } => builder.push_section(
                    Section::new(text.as_str())
                        .with_heading_style(style.as_str())
                        .with_identifier(id.clone())
                        .start_on_new_page(*new_page),
                ),
                BlockSpec::Table(table) => builder.push(Block::Table(table.to_block()?)),
                BlockSpec::Image {
                    source,
                    width,
                    height,
                    max_width,
                } => {
                    let max_width = max_width.unwrap_or(default_max_width);
                    match (width, height) {
                        (Some(width), Some(height)) => {
                            builder.push(Block::image(source.as_str(), *width, *height, max_width))
                        }
                        (None, None) => builder.push_screenshot(source, max_width, resolver),
                        _ => {
                            return Err(Error::Manifest(format!(
                                "image `{source}` must declare both width and height or neither"
                            )))
                        }
                    }
                }
                BlockSpec::Spacer { height } => builder.push(Block::spacer(*height)),
                BlockSpec::PageBreak => builder.push(Block::PageBreak),
            }
        }
        Ok(builder)
    }
}
