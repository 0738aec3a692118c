//! Inline markup for text blocks.
//!
//! Paragraph text may carry a small tag vocabulary that only affects how runs
//! of characters are drawn, never how blocks are laid out:
//!
//! - `<b>bold</b>` and `<i>italic</i>`
//! - `<font color="#RRGGBB">colored</font>`
//! - `<br/>` (or a literal newline) for a hard line break
//! - the entities `&amp;`, `&lt;`, `&gt;` and `&quot;`
//!
//! [`parse_markup`] turns such a string into [`Span`]s; [`to_markup`] turns spans
//! back into a string the parser accepts, which is how split paragraphs are
//! re-emitted.

use std::fmt;

use crate::style::Color;

/// A slice of text together with inline style attributes.
///
/// Hard line breaks are kept as `'\n'` characters inside the text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    text: String,
    bold: bool,
    italic: bool,
    color: Option<Color>,
}

impl Span {
    /// Creates a new span with the provided text and no styles applied.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Returns the raw text contained in this span.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    pub fn is_italic(&self) -> bool {
        self.italic
    }

    /// Returns the configured color for the span, if any.
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Marks the span as bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Marks the span as italic.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Assigns a color to the span.
    pub fn colored(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Whether `other` carries exactly the same inline attributes.
    pub fn same_style(&self, other: &Span) -> bool {
        self.bold == other.bold && self.italic == other.italic && self.color == other.color
    }

    /// Returns a span with the same attributes and different text.
    pub fn with_text(&self, text: impl Into<String>) -> Span {
        Span {
            text: text.into(),
            ..self.clone()
        }
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }
}

/// Parse errors produced by [`parse_markup`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    index: usize,
    message: String,
}

impl ParseError {
    fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }

    /// Byte index in the original input string where the error was detected.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Human-readable description of the parsing error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at byte {})", self.message, self.index)
    }
}

impl std::error::Error for ParseError {}

#[derive(Clone, Copy, Debug, Default)]
struct StyleState {
    bold: bool,
    italic: bool,
    color: Option<Color>,
}

impl StyleState {
    fn to_span(self, text: impl Into<String>) -> Span {
        Span {
            text: text.into(),
            bold: self.bold,
            italic: self.italic,
            color: self.color,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Marker {
    Bold,
    Italic,
    Font,
}

impl Marker {
    fn closing_token(self) -> &'static str {
        match self {
            Marker::Bold => "</b>",
            Marker::Italic => "</i>",
            Marker::Font => "</font>",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Marker::Bold => "`<b>` span",
            Marker::Italic => "`<i>` span",
            Marker::Font => "`<font>` span",
        }
    }
}

const LINE_BREAKS: &[&str] = &["<br/>", "<br />", "<br>"];

const ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
];

/// Parses inline markup into a list of [`Span`]s.
///
/// Adjacent text with identical attributes ends up in a single span.  Malformed
/// input (unterminated or unknown tags, stray closing tags, bad colors) yields a
/// [`ParseError`] with the byte position of the problem.
pub fn parse_markup(input: &str) -> Result<Vec<Span>, ParseError> {
    let (spans, idx) = parse_inner(input, 0, StyleState::default(), None)?;
    debug_assert_eq!(idx, input.len());
    Ok(merge_adjacent(spans))
}

fn parse_inner(
    input: &str,
    mut index: usize,
    state: StyleState,
    closing_marker: Option<Marker>,
) -> Result<(Vec<Span>, usize), ParseError> {
    let mut spans = Vec::new();
    let mut buffer = String::new();

    while index < input.len() {
        let rest = &input[index..];

        if let Some(marker) = closing_marker {
            if rest.starts_with(marker.closing_token()) {
                flush_buffer(&mut buffer, &mut spans, state);
                index += marker.closing_token().len();
                return Ok((spans, index));
            }
        }

        if let Some(token) = LINE_BREAKS.iter().find(|token| rest.starts_with(**token)) {
            buffer.push('\n');
            index += token.len();
            continue;
        }

        if let Some((entity, ch)) = ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            buffer.push(*ch);
            index += entity.len();
            continue;
        }

        if rest.starts_with("<b>") || rest.starts_with("<i>") {
            flush_buffer(&mut buffer, &mut spans, state);
            let mut nested_state = state;
            let marker = if rest.starts_with("<b>") {
                nested_state.bold = true;
                Marker::Bold
            } else {
                nested_state.italic = true;
                Marker::Italic
            };
            let (nested, new_index) = parse_inner(input, index + 3, nested_state, Some(marker))?;
            spans.extend(nested);
            index = new_index;
            continue;
        }

        if rest.starts_with("<font") {
            let (color, after_tag) = parse_font_tag(input, index)?;
            flush_buffer(&mut buffer, &mut spans, state);
            let mut nested_state = state;
            nested_state.color = Some(color);
            let (nested, new_index) =
                parse_inner(input, after_tag, nested_state, Some(Marker::Font))?;
            spans.extend(nested);
            index = new_index;
            continue;
        }

        if rest.starts_with("</") {
            return Err(ParseError::new(
                index,
                "unexpected closing tag without a matching opening tag",
            ));
        }

        if rest.starts_with('<') {
            return Err(ParseError::new(
                index,
                "unsupported tag; expected <b>, <i>, <font color=...> or <br/>",
            ));
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        buffer.push(ch);
        index += ch.len_utf8();
    }

    if let Some(marker) = closing_marker {
        Err(ParseError::new(
            index,
            format!("unterminated {}", marker.description()),
        ))
    } else {
        flush_buffer(&mut buffer, &mut spans, state);
        Ok((spans, index))
    }
}

fn flush_buffer(buffer: &mut String, spans: &mut Vec<Span>, state: StyleState) {
    if buffer.is_empty() {
        return;
    }
    spans.push(state.to_span(std::mem::take(buffer)));
}

fn merge_adjacent(spans: Vec<Span>) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if last.same_style(&span) => last.push_str(&span.text),
            _ => merged.push(span),
        }
    }
    merged
}

fn parse_font_tag(input: &str, index: usize) -> Result<(Color, usize), ParseError> {
    let Some(close) = input[index..].find('>') else {
        return Err(ParseError::new(index, "unterminated `<font` tag"));
    };
    let tag_end = index + close;
    let attributes = &input[index + "<font".len()..tag_end];

    let Some(color_at) = attributes.find("color=") else {
        return Err(ParseError::new(
            index,
            "`<font>` tag requires a `color` attribute",
        ));
    };
    let value = attributes[color_at + "color=".len()..]
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    let value = value.split_whitespace().next().unwrap_or_default();
    let value = value.trim_matches(|c| c == '"' || c == '\'');

    let color = Color::from_hex(value).ok_or_else(|| {
        ParseError::new(
            index,
            format!("invalid color `{value}`; expected #RRGGBB with hexadecimal digits"),
        )
    })?;

    Ok((color, tag_end + 1))
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Serializes spans back into markup accepted by [`parse_markup`].
///
/// Text without attributes is emitted as-is (apart from escaping), so plain
/// strings survive a parse/serialize cycle unchanged.
pub fn to_markup(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        let mut text = escape(&span.text);
        if span.italic {
            text = format!("<i>{text}</i>");
        }
        if span.bold {
            text = format!("<b>{text}</b>");
        }
        if let Some(color) = span.color {
            text = format!("<font color=\"{color}\">{text}</font>");
        }
        out.push_str(&text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_text() {
        let spans = parse_markup("Hello world").expect("parse succeeds");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text(), "Hello world");
        assert!(!spans[0].is_bold());
    }

    #[test]
    fn parse_nested_styles() {
        let spans = parse_markup("This is <b>very <i>cool</i></b>!").expect("parse succeeds");
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[0].text(), "This is ");
        assert!(spans[1].is_bold());
        assert_eq!(spans[1].text(), "very ");
        assert!(spans[2].is_bold());
        assert!(spans[2].is_italic());
        assert_eq!(spans[2].text(), "cool");
        assert_eq!(spans[3].text(), "!");
        assert!(!spans[3].is_bold());
    }

    #[test]
    fn line_breaks_and_entities() {
        let spans = parse_markup("<b>Frontend Layer:</b><br/>• Razor &amp; MVC").expect("parses");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text(), "Frontend Layer:");
        assert_eq!(spans[1].text(), "\n• Razor & MVC");
    }

    #[test]
    fn parse_font_color() {
        let spans = parse_markup("<font color=\"#ff0000\">Red</font> text").expect("parses");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text(), "Red");
        assert_eq!(spans[0].color(), Some(Color::rgb(0xff, 0x00, 0x00)));
        assert_eq!(spans[1].text(), " text");
    }

    #[test]
    fn serialized_markup_parses_back() {
        let source = "Plain <b>bold &amp; <i>both</i></b> <font color=\"#00ff00\">green</font>";
        let spans = parse_markup(source).expect("parses");
        let again = parse_markup(&to_markup(&spans)).expect("re-parses");
        assert_eq!(spans, again);
        assert_eq!(to_markup(&parse_markup("just words").unwrap()), "just words");
    }

    #[test]
    fn error_on_unterminated_bold() {
        let err = parse_markup("<b>oops").unwrap_err();
        assert!(err.message().contains("unterminated `<b>`"));
    }

    #[test]
    fn error_on_stray_closing_tag() {
        let err = parse_markup("text</i>").unwrap_err();
        assert_eq!(err.index(), 4);
    }

    #[test]
    fn error_on_invalid_color() {
        let err = parse_markup("<font color=\"#12FG34\">x</font>").unwrap_err();
        assert!(err.message().contains("invalid color"));
    }
}
