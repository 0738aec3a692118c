//! Paragraph styles and their inheritance.
//!
//! A [`Style`] only records the attributes it overrides together with the name
//! of its parent.  [`StyleSheet::resolve`] walks that chain and fills the gaps,
//! ending at the sheet's base style, which defines every attribute.  Styles are
//! plain data: nothing here knows how text is measured or drawn.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};

/// An 8-bit RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GREY: Color = Color::rgb(128, 128, 128);
    pub const WHITESMOKE: Color = Color::rgb(245, 245, 245);

    /// Creates a color from its components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses a `#RRGGBB` (or `RRGGBB`) hexadecimal color.
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.strip_prefix('#').unwrap_or(value);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let component = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self::rgb(component(0..2)?, component(2..4)?, component(4..6)?))
    }

    /// Components scaled to the `0.0..=1.0` range.
    pub fn to_unit(self) -> (f64, f64, f64) {
        (
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Horizontal alignment of the lines of a paragraph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    /// Lines start at the left edge.
    #[default]
    Left,
    /// Lines are centered.
    Center,
    /// Lines end at the right edge.
    Right,
    /// Lines fill the full width; the last line of a paragraph stays left aligned.
    Justified,
}

/// A style with every attribute defined.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStyle {
    /// Name of the style this was resolved from.
    pub name: String,
    pub font_family: String,
    pub font_size: f64,
    pub text_color: Color,
    pub alignment: HorizontalAlignment,
    pub space_before: f64,
    pub space_after: f64,
    /// Distance between consecutive baselines.
    pub leading: f64,
    pub left_indent: f64,
}

impl ResolvedStyle {
    /// Whether the font family name selects a bold face.
    pub fn is_bold_family(&self) -> bool {
        self.font_family.contains("Bold")
    }

    /// Whether the font family name selects an italic or oblique face.
    pub fn is_italic_family(&self) -> bool {
        self.font_family.contains("Italic") || self.font_family.contains("Oblique")
    }
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            name: "Base".to_owned(),
            font_family: "Helvetica".to_owned(),
            font_size: 10.0,
            text_color: Color::BLACK,
            alignment: HorizontalAlignment::Left,
            space_before: 0.0,
            space_after: 0.0,
            leading: 12.0,
            left_indent: 0.0,
        }
    }
}

/// A named style that overrides some attributes of its parent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Style {
    name: String,
    parent: Option<String>,
    font_family: Option<String>,
    font_size: Option<f64>,
    text_color: Option<Color>,
    alignment: Option<HorizontalAlignment>,
    space_before: Option<f64>,
    space_after: Option<f64>,
    leading: Option<f64>,
    left_indent: Option<f64>,
}

impl Style {
    /// Creates a style that inherits everything from the base style.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the style name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent style name, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = Some(color);
        self
    }

    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn with_space_before(mut self, space: f64) -> Self {
        self.space_before = Some(space);
        self
    }

    pub fn with_space_after(mut self, space: f64) -> Self {
        self.space_after = Some(space);
        self
    }

    pub fn with_leading(mut self, leading: f64) -> Self {
        self.leading = Some(leading);
        self
    }

    pub fn with_left_indent(mut self, indent: f64) -> Self {
        self.left_indent = Some(indent);
        self
    }

    /// Copies every attribute set on `self` that is still unset in `target`.
    fn fill(&self, target: &mut PartialStyle) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(value);
            }
        }
        take(&mut target.font_family, &self.font_family);
        take(&mut target.font_size, &self.font_size);
        take(&mut target.text_color, &self.text_color);
        take(&mut target.alignment, &self.alignment);
        take(&mut target.space_before, &self.space_before);
        take(&mut target.space_after, &self.space_after);
        take(&mut target.leading, &self.leading);
        take(&mut target.left_indent, &self.left_indent);
    }
}

#[derive(Default)]
struct PartialStyle {
    font_family: Option<String>,
    font_size: Option<f64>,
    text_color: Option<Color>,
    alignment: Option<HorizontalAlignment>,
    space_before: Option<f64>,
    space_after: Option<f64>,
    leading: Option<f64>,
    left_indent: Option<f64>,
}

impl PartialStyle {
    fn finish(self, name: &str, base: &ResolvedStyle) -> ResolvedStyle {
        ResolvedStyle {
            name: name.to_owned(),
            font_family: self.font_family.unwrap_or_else(|| base.font_family.clone()),
            font_size: self.font_size.unwrap_or(base.font_size),
            text_color: self.text_color.unwrap_or(base.text_color),
            alignment: self.alignment.unwrap_or(base.alignment),
            space_before: self.space_before.unwrap_or(base.space_before),
            space_after: self.space_after.unwrap_or(base.space_after),
            leading: self.leading.unwrap_or(base.leading),
            left_indent: self.left_indent.unwrap_or(base.left_indent),
        }
    }
}

/// A named collection of styles resolved against a complete base style.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleSheet {
    base: ResolvedStyle,
    styles: BTreeMap<String, Style>,
}

impl StyleSheet {
    /// Creates an empty sheet on top of the given base style.
    pub fn new(base: ResolvedStyle) -> Self {
        Self {
            base,
            styles: BTreeMap::new(),
        }
    }

    /// The classic sample sheet: `Normal`, `BodyText`, `Title`, `Heading1..3` and `Code`.
    pub fn sample() -> Self {
        Self::new(ResolvedStyle::default())
            .with_style(
                Style::new("Normal")
                    .with_font_family("Helvetica")
                    .with_font_size(10.0)
                    .with_leading(12.0),
            )
            .with_style(
                Style::new("BodyText")
                    .with_parent("Normal")
                    .with_space_before(6.0),
            )
            .with_style(
                Style::new("Title")
                    .with_parent("Normal")
                    .with_font_family("Helvetica-Bold")
                    .with_font_size(18.0)
                    .with_leading(22.0)
                    .with_alignment(HorizontalAlignment::Center)
                    .with_space_after(6.0),
            )
            .with_style(
                Style::new("Heading1")
                    .with_parent("Normal")
                    .with_font_family("Helvetica-Bold")
                    .with_font_size(18.0)
                    .with_leading(22.0)
                    .with_space_after(6.0),
            )
            .with_style(
                Style::new("Heading2")
                    .with_parent("Normal")
                    .with_font_family("Helvetica-Bold")
                    .with_font_size(14.0)
                    .with_leading(18.0)
                    .with_space_before(12.0)
                    .with_space_after(6.0),
            )
            .with_style(
                Style::new("Heading3")
                    .with_parent("Normal")
                    .with_font_family("Helvetica-BoldOblique")
                    .with_font_size(12.0)
                    .with_leading(14.0)
                    .with_space_before(12.0)
                    .with_space_after(6.0),
            )
            .with_style(
                Style::new("Code")
                    .with_parent("Normal")
                    .with_font_family("Courier")
                    .with_font_size(8.0)
                    .with_leading(8.8)
                    .with_left_indent(36.0),
            )
    }

    /// Returns the base style every parentless style inherits from.
    pub fn base(&self) -> &ResolvedStyle {
        &self.base
    }

    /// Registers a style, replacing any previous style with the same name.
    pub fn insert(&mut self, style: Style) {
        self.styles.insert(style.name.clone(), style);
    }

    /// Registers a style and returns the updated sheet.
    pub fn with_style(mut self, style: Style) -> Self {
        self.insert(style);
        self
    }

    /// Returns the unresolved style registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Style> {
        self.styles.get(name)
    }

    /// Whether a style named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.styles.contains_key(name)
    }

    /// Flattens the style named `name` by walking its parent chain.
    pub fn resolve(&self, name: &str) -> Result<ResolvedStyle> {
        let mut partial = PartialStyle::default();
        let mut visited = BTreeSet::new();
        let mut current = Some(name);

        while let Some(style_name) = current {
            if !visited.insert(style_name) {
                return Err(Error::StyleCycle {
                    style: style_name.to_owned(),
                });
            }
            let style = self.styles.get(style_name).ok_or_else(|| Error::UnknownStyle {
                style: style_name.to_owned(),
            })?;
            style.fill(&mut partial);
            current = style.parent.as_deref();
        }

        Ok(partial.finish(name, &self.base))
    }
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self::sample()
    }
}
