//! Text measurement and line breaking.
//!
//! The layout engine never looks at glyphs.  It asks a [`TextShaper`] how wide a
//! run of text is and relies on the provided methods of the trait to wrap a
//! paragraph into lines, report its height, and cut it at a height budget.
//! Implementations only have to supply [`TextShaper::run_width`].

use crate::richtext::{self, ParseError, Span};
use crate::style::ResolvedStyle;

const EPSILON: f64 = 1e-9;

/// Line count and total height of a wrapped paragraph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextMetrics {
    pub line_count: usize,
    pub height: f64,
}

/// One wrapped line of text.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapedLine {
    /// Styled runs making up the line, without leading or trailing spaces.
    pub runs: Vec<Span>,
    /// Measured width of the line.
    pub width: f64,
    /// Whether the line ends a hard-broken paragraph and another line follows.
    pub hard_break: bool,
}

impl ShapedLine {
    /// The line's characters without markup.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(Span::text).collect()
    }

    fn separator(&self) -> &'static str {
        if self.hard_break {
            "\n"
        } else {
            " "
        }
    }
}

/// A paragraph wrapped at a fixed width.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapedText {
    lines: Vec<ShapedLine>,
    leading: f64,
}

impl ShapedText {
    pub fn lines(&self) -> &[ShapedLine] {
        &self.lines
    }

    pub fn leading(&self) -> f64 {
        self.leading
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total rendered height: one leading per line.
    pub fn height(&self) -> f64 {
        self.leading * self.lines.len() as f64
    }

    /// Widest line.
    pub fn width(&self) -> f64 {
        self.lines.iter().fold(0.0, |acc, line| acc.max(line.width))
    }

    pub fn metrics(&self) -> TextMetrics {
        TextMetrics {
            line_count: self.line_count(),
            height: self.height(),
        }
    }

    /// Number of leading lines whose combined height stays within `budget`.
    pub fn lines_within(&self, budget: f64) -> usize {
        if self.leading <= 0.0 {
            return self.lines.len();
        }
        let fitting = ((budget + EPSILON) / self.leading).floor();
        if fitting <= 0.0 {
            0
        } else {
            (fitting as usize).min(self.lines.len())
        }
    }

    /// Splits after line `at`, returning the placed part and the remainder.
    ///
    /// Returns `None` unless both parts would keep at least one line.
    pub fn split_at(&self, at: usize) -> Option<(ShapedText, ShapedText)> {
        if at == 0 || at >= self.lines.len() {
            return None;
        }
        let mut placed = self.lines[..at].to_vec();
        if let Some(last) = placed.last_mut() {
            last.hard_break = false;
        }
        let remainder = self.lines[at..].to_vec();
        Some((
            ShapedText {
                lines: placed,
                leading: self.leading,
            },
            ShapedText {
                lines: remainder,
                leading: self.leading,
            },
        ))
    }

    /// Re-emits the wrapped text as markup, joining soft-wrapped lines with a single space.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for (index, line) in self.lines.iter().enumerate() {
            out.push_str(&richtext::to_markup(&line.runs));
            if index + 1 < self.lines.len() {
                out.push_str(line.separator());
            }
        }
        out
    }
}

/// Capability that measures styled text.
pub trait TextShaper {
    /// Width of `text` drawn in `style`, with the inline bold/italic flags applied on top.
    fn run_width(&self, text: &str, style: &ResolvedStyle, bold: bool, italic: bool) -> f64;

    /// Wraps markup `text` into lines no wider than `width` (single words may overflow).
    fn shape(
        &self,
        text: &str,
        style: &ResolvedStyle,
        width: f64,
    ) -> Result<ShapedText, ParseError> {
        wrap(self, text, style, width)
    }

    /// Line count and rendered height of `text` at `width`.
    fn measure(
        &self,
        text: &str,
        style: &ResolvedStyle,
        width: f64,
    ) -> Result<TextMetrics, ParseError> {
        Ok(self.shape(text, style, width)?.metrics())
    }

    /// Cuts `text` at the last line boundary that fits in `budget`.
    ///
    /// Returns the placed and remaining markup, or `None` when the whole text
    /// fits or not even one line does.
    fn split(
        &self,
        text: &str,
        style: &ResolvedStyle,
        width: f64,
        budget: f64,
    ) -> Result<Option<(String, String)>, ParseError> {
        let shaped = self.shape(text, style, width)?;
        let at = shaped.lines_within(budget);
        Ok(shaped
            .split_at(at)
            .map(|(placed, remainder)| (placed.to_markup(), remainder.to_markup())))
    }
}

impl<T: TextShaper + ?Sized> TextShaper for &T {
    fn run_width(&self, text: &str, style: &ResolvedStyle, bold: bool, italic: bool) -> f64 {
        (**self).run_width(text, style, bold, italic)
    }
}

impl<T: TextShaper + ?Sized> TextShaper for Box<T> {
    fn run_width(&self, text: &str, style: &ResolvedStyle, bold: bool, italic: bool) -> f64 {
        (**self).run_width(text, style, bold, italic)
    }
}

/// A word made of one or more differently styled pieces.
type Word = Vec<Span>;

fn push_char(word: &mut Word, template: &Span, ch: char) {
    match word.last_mut() {
        Some(last) if last.same_style(template) => {
            let mut buf = [0u8; 4];
            last.push_str(ch.encode_utf8(&mut buf));
        }
        _ => word.push(template.with_text(ch.to_string())),
    }
}

/// Splits spans into paragraphs (at hard breaks) of whitespace-separated words.
fn paragraphs(spans: &[Span]) -> Vec<Vec<Word>> {
    let mut paragraphs = vec![Vec::new()];
    let mut word: Word = Vec::new();

    for span in spans {
        for ch in span.text().chars() {
            if ch.is_whitespace() {
                if !word.is_empty() {
                    if let Some(paragraph) = paragraphs.last_mut() {
                        paragraph.push(std::mem::take(&mut word));
                    }
                }
                if ch == '\n' {
                    paragraphs.push(Vec::new());
                }
            } else {
                push_char(&mut word, span, ch);
            }
        }
    }
    if !word.is_empty() {
        if let Some(paragraph) = paragraphs.last_mut() {
            paragraph.push(word);
        }
    }
    paragraphs
}

fn word_width<S: TextShaper + ?Sized>(shaper: &S, word: &Word, style: &ResolvedStyle) -> f64 {
    word.iter()
        .map(|piece| shaper.run_width(piece.text(), style, piece.is_bold(), piece.is_italic()))
        .sum()
}

fn finish_line(words: &mut Vec<Word>, width: f64) -> ShapedLine {
    let mut runs: Vec<Span> = Vec::new();
    for (index, word) in words.drain(..).enumerate() {
        if index > 0 {
            if let Some(last) = runs.last_mut() {
                last.push_str(" ");
            }
        }
        for piece in word {
            match runs.last_mut() {
                Some(last) if last.same_style(&piece) => last.push_str(piece.text()),
                _ => runs.push(piece),
            }
        }
    }
    ShapedLine {
        runs,
        width,
        hard_break: false,
    }
}

fn wrap<S: TextShaper + ?Sized>(
    shaper: &S,
    text: &str,
    style: &ResolvedStyle,
    width: f64,
) -> Result<ShapedText, ParseError> {
    let spans = richtext::parse_markup(text)?;
    let mut lines = Vec::new();

    let blank = spans
        .iter()
        .all(|span| span.text().chars().all(char::is_whitespace));
    if !blank {
        let space = shaper.run_width(" ", style, false, false);
        let paragraphs = paragraphs(&spans);
        let last_paragraph = paragraphs.len() - 1;

        for (paragraph_index, words) in paragraphs.into_iter().enumerate() {
            let mut current: Vec<Word> = Vec::new();
            let mut current_width = 0.0;

            for word in words {
                let measured = word_width(shaper, &word, style);
                if current.is_empty() {
                    current_width = measured;
                    current.push(word);
                } else if current_width + space + measured <= width + EPSILON {
                    current_width += space + measured;
                    current.push(word);
                } else {
                    lines.push(finish_line(&mut current, current_width));
                    current_width = measured;
                    current.push(word);
                }
            }

            let mut line = finish_line(&mut current, current_width);
            line.hard_break = paragraph_index != last_paragraph;
            lines.push(line);
        }
    }

    Ok(ShapedText {
        lines,
        leading: style.leading,
    })
}

/// Glyph advances of Helvetica for the printable ASCII range, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667,
    611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, // 'a'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Glyph advances of Helvetica-Bold for the printable ASCII range, in 1/1000 em.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722, 667,
    611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556,
    333, 611, 556, 778, 556, 556, 500, // 'a'..'z'
    389, 280, 389, 584, // '{'..'~'
];

/// Glyph advances of Times-Roman for the printable ASCII range, in 1/1000 em.
const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, // ' '..'/'
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, // '0'..'9'
    278, 278, 564, 564, 564, 444, 921, // ':'..'@'
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, 556, 722, 667, 556,
    611, 722, 722, 944, 722, 722, 611, // 'A'..'Z'
    333, 278, 333, 469, 500, 333, // '['..'`'
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, 500, 500, 333, 389,
    278, 500, 500, 722, 500, 500, 444, // 'a'..'z'
    480, 200, 480, 541, // '{'..'~'
];

/// Glyph advances of Times-Bold for the printable ASCII range, in 1/1000 em.
const TIMES_BOLD_WIDTHS: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278, // ' '..'/'
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, // '0'..'9'
    333, 333, 570, 570, 570, 500, 930, // ':'..'@'
    722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778, 611, 778, 722, 556,
    667, 722, 722, 1000, 722, 722, 667, // 'A'..'Z'
    333, 278, 333, 581, 500, 333, // '['..'`'
    500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500, 556, 556, 444, 389,
    333, 556, 500, 722, 500, 500, 444, // 'a'..'z'
    394, 220, 394, 520, // '{'..'~'
];

/// Glyph advances of Times-Italic for the printable ASCII range, in 1/1000 em.
const TIMES_ITALIC_WIDTHS: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278, // ' '..'/'
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, // '0'..'9'
    333, 333, 675, 675, 675, 500, 920, // ':'..'@'
    611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722, 611, 722, 611, 500,
    556, 722, 611, 833, 611, 556, 556, // 'A'..'Z'
    389, 278, 389, 422, 500, 333, // '['..'`'
    500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500, 500, 500, 389, 389,
    278, 500, 444, 667, 444, 444, 389, // 'a'..'z'
    400, 275, 400, 541, // '{'..'~'
];

/// Glyph advances of Times-BoldItalic for the printable ASCII range, in 1/1000 em.
const TIMES_BOLD_ITALIC_WIDTHS: [u16; 95] = [
    250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570, 250, 333, 250, 278, // ' '..'/'
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, // '0'..'9'
    333, 333, 570, 570, 570, 500, 832, // ':'..'@'
    667, 667, 667, 722, 667, 667, 722, 778, 389, 500, 667, 611, 889, 722, 722, 611, 722, 667, 556,
    611, 722, 667, 889, 667, 611, 611, // 'A'..'Z'
    333, 278, 333, 570, 500, 333, // '['..'`'
    500, 500, 444, 500, 444, 333, 500, 556, 278, 278, 500, 278, 778, 556, 500, 500, 500, 389, 389,
    278, 556, 444, 667, 500, 444, 389, // 'a'..'z'
    348, 220, 348, 570, // '{'..'~'
];

const COURIER_WIDTH: u16 = 600;
const FALLBACK_WIDTH: u16 = 556;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StandardFamily {
    Helvetica,
    Times,
    Courier,
}

impl StandardFamily {
    fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("courier") {
            StandardFamily::Courier
        } else if lower.starts_with("times") {
            StandardFamily::Times
        } else {
            StandardFamily::Helvetica
        }
    }

    /// Width table of a face; `None` for the monospaced Courier.
    fn widths(self, bold: bool, italic: bool) -> Option<&'static [u16; 95]> {
        match (self, bold, italic) {
            (StandardFamily::Courier, _, _) => None,
            (StandardFamily::Helvetica, false, _) => Some(&HELVETICA_WIDTHS),
            (StandardFamily::Helvetica, true, _) => Some(&HELVETICA_BOLD_WIDTHS),
            (StandardFamily::Times, false, false) => Some(&TIMES_ROMAN_WIDTHS),
            (StandardFamily::Times, true, false) => Some(&TIMES_BOLD_WIDTHS),
            (StandardFamily::Times, false, true) => Some(&TIMES_ITALIC_WIDTHS),
            (StandardFamily::Times, true, true) => Some(&TIMES_BOLD_ITALIC_WIDTHS),
        }
    }
}

/// Shaper using the AFM advances of the PDF standard fonts.
///
/// Used with [`crate::sink::PdfSink::new`] when no TrueType family is
/// available.  Family names select Helvetica, Times or Courier the same way
/// the sink picks its built-in face; characters outside printable ASCII use an
/// average advance.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardFontShaper;

impl StandardFontShaper {
    pub fn new() -> Self {
        Self
    }
}

impl TextShaper for StandardFontShaper {
    fn run_width(&self, text: &str, style: &ResolvedStyle, bold: bool, italic: bool) -> f64 {
        let family = StandardFamily::from_name(&style.font_family);
        let table = family.widths(
            bold || style.is_bold_family(),
            italic || style.is_italic_family(),
        );
        let units: u32 = text
            .chars()
            .map(|ch| {
                let advance = match table {
                    None => COURIER_WIDTH,
                    Some(table) => match ch as u32 {
                        code @ 32..=126 => table[(code - 32) as usize],
                        _ => FALLBACK_WIDTH,
                    },
                };
                u32::from(advance)
            })
            .sum();
        f64::from(units) * style.font_size / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleSheet;

    /// Every character is exactly one point wide.
    struct UnitShaper;

    impl TextShaper for UnitShaper {
        fn run_width(&self, text: &str, _style: &ResolvedStyle, _bold: bool, _italic: bool) -> f64 {
            text.chars().count() as f64
        }
    }

    fn body() -> ResolvedStyle {
        StyleSheet::sample().resolve("BodyText").expect("sample style")
    }

    fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn wraps_greedily_at_width() {
        let shaped = UnitShaper
            .shape("aaa bbb ccc dddd", &body(), 7.0)
            .expect("shapes");
        let lines: Vec<_> = shaped.lines().iter().map(ShapedLine::plain_text).collect();
        assert_eq!(lines, vec!["aaa bbb", "ccc", "dddd"]);
        assert_eq!(shaped.height(), 36.0);
    }

    #[test]
    fn hard_breaks_start_new_lines() {
        let shaped = UnitShaper
            .shape("one<br/>two\nthree", &body(), 100.0)
            .expect("shapes");
        assert_eq!(shaped.line_count(), 3);
        assert!(shaped.lines()[0].hard_break);
        assert!(!shaped.lines()[2].hard_break);
        assert_eq!(shaped.to_markup(), "one\ntwo\nthree");
    }

    #[test]
    fn blank_text_has_no_height() {
        let metrics = UnitShaper.measure("  ", &body(), 100.0).expect("measures");
        assert_eq!(metrics.line_count, 0);
        assert_eq!(metrics.height, 0.0);
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let shaped = UnitShaper
            .shape("a supercalifragilistic b", &body(), 5.0)
            .expect("shapes");
        assert_eq!(shaped.line_count(), 3);
        assert_eq!(shaped.lines()[1].width, 20.0);
    }

    #[test]
    fn split_conserves_text() {
        let original = "The quick  brown fox jumps over\tthe lazy dog and keeps running far away";
        let (placed, remainder) = UnitShaper
            .split(original, &body(), 12.0, 30.0)
            .expect("valid markup")
            .expect("splits");
        assert_eq!(UnitShaper.measure(&placed, &body(), 12.0).unwrap().line_count, 2);
        assert_eq!(
            normalize(&format!("{placed} {remainder}")),
            normalize(original)
        );
    }

    #[test]
    fn split_keeps_inline_styles_on_both_sides() {
        let shaped = UnitShaper
            .shape("<b>alpha beta gamma delta</b>", &body(), 11.0)
            .expect("shapes");
        let (placed, remainder) = shaped.split_at(1).expect("splits");
        assert_eq!(placed.to_markup(), "<b>alpha beta</b>");
        assert_eq!(remainder.to_markup(), "<b>gamma delta</b>");
        assert!(remainder.lines()[0].runs[0].is_bold());
    }

    #[test]
    fn split_refuses_when_everything_or_nothing_fits() {
        let style = body();
        assert!(UnitShaper.split("short", &style, 100.0, 100.0).unwrap().is_none());
        assert!(UnitShaper
            .split("a b c d", &style, 1.0, 5.0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn standard_metrics_follow_font_family() {
        let sheet = StyleSheet::sample();
        let normal = sheet.resolve("Normal").unwrap();
        let code = sheet.resolve("Code").unwrap();
        let shaper = StandardFontShaper::new();
        assert!((shaper.run_width("Hello", &normal, false, false) - 22.78).abs() < 1e-9);
        assert!((shaper.run_width("Hello", &code, false, false) - 24.0).abs() < 1e-9);
        assert!(
            shaper.run_width("Hello", &normal, true, false)
                > shaper.run_width("Hello", &normal, false, false)
        );
    }

    #[test]
    fn times_faces_use_their_own_metrics() {
        let roman = ResolvedStyle {
            font_family: "Times-Roman".to_owned(),
            font_size: 10.0,
            ..ResolvedStyle::default()
        };
        let shaper = StandardFontShaper::new();
        assert!((shaper.run_width("mmmm", &roman, false, false) - 31.12).abs() < 1e-9);
        assert!((shaper.run_width("aaaa", &roman, false, false) - 17.76).abs() < 1e-9);
        assert!((shaper.run_width("A", &roman, false, true) - 6.11).abs() < 1e-9);
        assert!((shaper.run_width("W", &roman, true, false) - 10.0).abs() < 1e-9);

        let bold_italic = ResolvedStyle {
            font_family: "Times-BoldItalic".to_owned(),
            ..roman
        };
        assert!((shaper.run_width("m", &bold_italic, false, false) - 7.78).abs() < 1e-9);
    }
}
