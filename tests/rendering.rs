use manual_composer::builder::ManualBuilder;
use manual_composer::fonts::{self, TrueTypeShaper};
use manual_composer::images::{ImageData, MemoryImageResolver};
use manual_composer::model::{
    Block, CellPadding, GridLines, HeaderRule, Section, TableBlock, TableStyle,
};
use manual_composer::samples;
use manual_composer::shaping::StandardFontShaper;
use manual_composer::style::Color;
use sha2::{Digest, Sha256};

fn sample_builder(resolver: &MemoryImageResolver) -> ManualBuilder {
    let table = TableBlock::from_strings(
        vec![
            vec!["Column Name", "Data Type", "Description"],
            vec!["Id", "INT", "Primary key"],
            vec!["FirstName", "NVARCHAR(100)", "Given name"],
            vec!["Email", "NVARCHAR(255)", "Contact email address"],
        ],
        vec![120.0, 120.0, 200.0],
        "BodyText",
    )
    .with_style(
        TableStyle::new()
            .with_header(HeaderRule {
                background: Color::from_hex("#0EA5E9"),
                text_style: Some("Heading3".to_owned()),
            })
            .with_banding([Color::WHITE, Color::WHITESMOKE])
            .with_grid(GridLines::default())
            .with_padding(CellPadding::uniform(6.0)),
    );

    ManualBuilder::new("Contact Management System")
        .heading("Contact Management System", "Title")
        .section(
            Section::new("Login")
                .with_identifier(Some("login".to_owned()))
                .with_block(Block::paragraph(
                    "Enter your <b>username</b> and <i>password</i>, then click <font color=\"#0EA5E9\">Login</font>.",
                    "BodyText",
                )),
        )
        .screenshot("Login.png", 396.0, resolver)
        .screenshot("Dashboard.png", 396.0, resolver)
        .section(
            Section::new("Database Schema")
                .start_on_new_page(true)
                .with_block(Block::Table(table)),
        )
}

fn render_sample_pdf() -> Vec<u8> {
    let resolver = MemoryImageResolver::new()
        .with_image("Login.png", ImageData::solid(64, 48, Color::rgb(0x00, 0x3d, 0x82)));
    sample_builder(&resolver)
        .render(&StandardFontShaper::new(), &resolver)
        .expect("render sample pdf")
        .bytes
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Zeroes every value found between `open` and `close`.
fn blank_values(data: &mut [u8], open: &[u8], close: &[u8]) {
    let mut from = 0;
    while let Some(at) = find(&data[from..], open) {
        let start = from + at + open.len();
        let Some(len) = find(&data[start..], close) else {
            break;
        };
        data[start..start + len].fill(b'0');
        from = start + len + close.len();
    }
}

/// Blanks the timestamps and random document ids printpdf writes into the
/// info dictionary, the trailer and the XMP metadata.
fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    const VOLATILE: [(&[u8], &[u8]); 8] = [
        (b"/CreationDate(", b")"),
        (b"/ModDate(", b")"),
        (b"/ID[", b"]"),
        (b"<xmp:CreateDate>", b"</xmp:CreateDate>"),
        (b"<xmp:ModifyDate>", b"</xmp:ModifyDate>"),
        (b"<xmp:MetadataDate>", b"</xmp:MetadataDate>"),
        (b"<xmpMM:DocumentID>", b"</xmpMM:DocumentID>"),
        (b"<xmpMM:InstanceID>", b"</xmpMM:InstanceID>"),
    ];
    let mut normalized = bytes.to_vec();
    for (open, close) in VOLATILE {
        blank_values(&mut normalized, open, close);
    }
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    let normalized = scrub_pdf(bytes);
    let digest = Sha256::digest(&normalized);
    digest.into()
}

#[test]
fn renders_non_empty_output() {
    let bytes = render_sample_pdf();
    assert!(
        bytes.starts_with(b"%PDF-"),
        "rendered PDF should start with a header"
    );
}

#[test]
fn rendering_is_deterministic() {
    let bytes_a = render_sample_pdf();
    let bytes_b = render_sample_pdf();

    assert_eq!(bytes_a.len(), bytes_b.len(), "PDF sizes should match");

    let hash_a = normalized_hash(&bytes_a);
    let hash_b = normalized_hash(&bytes_b);

    assert_eq!(
        hash_a, hash_b,
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn section_pages_are_reported() {
    let resolver = MemoryImageResolver::new();
    let rendered = sample_builder(&resolver)
        .render(&StandardFontShaper::new(), &resolver)
        .expect("render sample pdf");
    assert_eq!(rendered.section_pages, vec![Some(1), Some(2)]);
    assert_eq!(rendered.pages.len(), 2);
}

#[test]
fn screenshot_manual_renders_without_screenshots() {
    let resolver = MemoryImageResolver::new();
    let rendered = samples::screenshot_manual(&resolver, Some("2024-01-31"))
        .render(&StandardFontShaper::new(), &resolver)
        .expect("render screenshot manual");
    assert_eq!(rendered.pages.len(), 8);
    assert!(rendered.bytes.starts_with(b"%PDF-"));
}

#[cfg(feature = "bookmarks")]
#[test]
fn bookmarked_render_keeps_pages() {
    let resolver = MemoryImageResolver::new();
    let rendered = sample_builder(&resolver)
        .render_with_bookmarks(&StandardFontShaper::new(), &resolver)
        .expect("render with bookmarks");
    assert!(rendered.bytes.starts_with(b"%PDF-"));
    assert_eq!(rendered.section_pages, vec![Some(1), Some(2)]);
}

#[test]
fn truetype_layout_matches_page_count() {
    if !fonts::default_fonts_available() {
        eprintln!(
            "Skipping truetype_layout_matches_page_count: bundled fonts missing. Set MANUAL_COMPOSER_FONTS_DIR or copy assets/fonts next to the binary."
        );
        return;
    }
    let shaper = TrueTypeShaper::from_default_fonts().expect("load fonts");
    let resolver = MemoryImageResolver::new();
    let pages = sample_builder(&resolver)
        .layout(&shaper, &resolver)
        .expect("layout with truetype metrics");
    assert_eq!(pages.len(), 2);
}
