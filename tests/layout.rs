use manual_composer::geometry::{Margins, PageGeometry};
use manual_composer::images::{ImageData, MemoryImageResolver};
use manual_composer::layout::{paginate, LayoutOptions, PageSequence, PlacedContent};
use manual_composer::model::{Block, CellPadding, Document, TableBlock, TableStyle};
use manual_composer::shaping::TextShaper;
use manual_composer::style::{Color, ResolvedStyle, Style, StyleSheet};
use manual_composer::Error;

/// Every character is half an em wide.
struct HalfEmShaper;

impl TextShaper for HalfEmShaper {
    fn run_width(&self, text: &str, style: &ResolvedStyle, _bold: bool, _italic: bool) -> f64 {
        text.chars().count() as f64 * style.font_size * 0.5
    }
}

fn geometry() -> PageGeometry {
    PageGeometry::letter().with_margins(Margins::uniform(36.0))
}

fn styles() -> StyleSheet {
    StyleSheet::sample()
        .with_style(Style::new("Tall").with_parent("Normal").with_leading(50.0))
        .with_style(Style::new("Cell").with_parent("Normal").with_leading(28.0))
        .with_style(Style::new("Poster").with_parent("Normal").with_leading(800.0))
}

fn layout_with(
    blocks: Vec<Block>,
    resolver: &MemoryImageResolver,
    options: &LayoutOptions,
) -> Result<PageSequence, Error> {
    paginate(
        Document::new(blocks, geometry(), styles()),
        &HalfEmShaper,
        resolver,
        options,
    )
}

fn layout(blocks: Vec<Block>) -> PageSequence {
    layout_with(blocks, &MemoryImageResolver::new(), &LayoutOptions::default()).expect("lays out")
}

fn lorem(words: usize) -> String {
    (0..words)
        .map(|index| format!("word{index}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn scenario_a_wide_image_is_scaled_and_fits() {
    let resolver = MemoryImageResolver::new()
        .with_image("Dashboard.png", ImageData::solid(20, 10, Color::WHITE));
    let pages = layout_with(
        vec![Block::image("Dashboard.png", 2000.0, 1000.0, 396.0)],
        &resolver,
        &LayoutOptions::default(),
    )
    .expect("lays out");

    assert_eq!(geometry().usable_height(), 720.0);
    assert_eq!(pages.len(), 1);
    let placement = &pages.pages()[0].placements()[0];
    assert!(matches!(placement.content, PlacedContent::Image(_)));
    assert_eq!((placement.size.width, placement.size.height), (396.0, 198.0));
    assert_eq!(placement.position.y, 36.0);
}

#[test]
fn scenario_b_table_moves_whole_to_next_page() {
    let tall_text = (0..10).map(|line| format!("line {line}")).collect::<Vec<_>>().join("<br/>");
    let rows: Vec<Vec<String>> = (0..10).map(|row| vec![format!("row {row}")]).collect();
    let table = TableBlock::from_strings(rows, vec![300.0], "Cell")
        .with_style(TableStyle::new().with_padding(CellPadding::uniform(6.0)));

    let pages = layout(vec![Block::paragraph(tall_text, "Tall"), Block::Table(table)]);

    let text = &pages.pages()[0].placements()[0];
    assert_eq!(text.size.height, 500.0);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages.page_of_block(1), Some(2));
    let placement = &pages.pages()[1].placements()[0];
    assert_eq!(placement.size.height, 400.0);
    assert_eq!(placement.position.y, 36.0);
    match &placement.content {
        PlacedContent::Table(table) => assert_eq!(table.row_heights, vec![40.0; 10]),
        other => panic!("expected a table, got {other:?}"),
    }
}

#[test]
fn scenario_c_consecutive_breaks_leave_an_empty_page() {
    let pages = layout(vec![
        Block::paragraph("Before", "Normal"),
        Block::PageBreak,
        Block::PageBreak,
        Block::paragraph("After", "Normal"),
    ]);
    assert_eq!(pages.len(), 3);
    assert!(!pages.pages()[0].is_blank());
    assert!(pages.pages()[1].is_blank());
    assert_eq!(pages.page_of_block(3), Some(3));
}

#[test]
fn scenario_d_missing_image_becomes_placeholder() {
    let pages = layout(vec![
        Block::paragraph("Intro", "Normal"),
        Block::image("Login.png", 640.0, 480.0, 396.0),
        Block::paragraph("Outro", "Normal"),
    ]);
    let placements = pages.pages()[0].placements();
    assert_eq!(placements.len(), 3);
    assert_eq!(placements[1].block_index, 1);
    match &placements[1].content {
        PlacedContent::Text(text) => {
            assert_eq!(text.missing_image.as_deref(), Some("Login.png"));
            assert_eq!(text.style.name, "BodyText");
            assert_eq!(text.text.lines()[0].plain_text(), "[Missing image: Login.png]");
        }
        other => panic!("expected placeholder text, got {other:?}"),
    }
}

#[test]
fn placeholder_style_is_configurable() {
    let options = LayoutOptions::new().with_placeholder_style("Code");
    let pages = layout_with(
        vec![Block::image("Login.png", 640.0, 480.0, 396.0)],
        &MemoryImageResolver::new(),
        &options,
    )
    .expect("lays out");
    match &pages.pages()[0].placements()[0].content {
        PlacedContent::Text(text) => assert_eq!(text.style.name, "Code"),
        other => panic!("expected placeholder text, got {other:?}"),
    }
}

#[test]
fn long_text_splits_without_losing_words() {
    let text = lorem(2000);
    let pages = layout(vec![Block::paragraph(text.clone(), "Normal")]);
    assert!(pages.len() > 1);

    let fragments: Vec<_> = pages.placements_of(0).collect();
    assert_eq!(fragments.len(), pages.len());
    let mut words = Vec::new();
    for (index, (_, placement)) in fragments.iter().enumerate() {
        assert_eq!(placement.fragment, index);
        match &placement.content {
            PlacedContent::Text(placed) => {
                for line in placed.text.lines() {
                    words.extend(line.plain_text().split(' ').map(str::to_owned));
                }
            }
            other => panic!("expected text, got {other:?}"),
        }
    }
    let expected: Vec<_> = text.split(' ').map(str::to_owned).collect();
    assert_eq!(words, expected);
}

#[test]
fn continuation_fragments_fill_whole_pages() {
    let pages = layout(vec![Block::paragraph(lorem(2000), "Normal")]);
    let first = &pages.pages()[0].placements()[0];
    assert_eq!(first.size.height, 720.0);
}

#[test]
fn placements_stay_inside_the_usable_area_in_order() {
    let resolver = MemoryImageResolver::new()
        .with_image("Login.png", ImageData::solid(8, 6, Color::WHITE));
    let mut blocks = Vec::new();
    for section in 0..12 {
        blocks.push(Block::paragraph(format!("Section {section}"), "Heading2"));
        blocks.push(Block::paragraph(lorem(120), "BodyText"));
        blocks.push(Block::image("Login.png", 800.0, 600.0, 400.0));
        blocks.push(Block::spacer(14.4));
    }
    let pages =
        layout_with(blocks.clone(), &resolver, &LayoutOptions::default()).expect("lays out");

    let geometry = geometry();
    for page in pages.pages() {
        let mut previous = geometry.content_top();
        for placement in page.placements() {
            assert!(placement.position.y >= previous - 1e-9);
            assert!(placement.bottom() <= geometry.content_bottom() + 1e-9);
            previous = placement.position.y;
        }
    }

    for (index, block) in blocks.iter().enumerate() {
        if block.is_atomic() {
            assert_eq!(pages.placements_of(index).count(), 1, "{} {index} split", block.kind());
        }
    }
}

#[test]
fn layout_is_deterministic() {
    let blocks = vec![
        Block::paragraph("Contacts", "Title"),
        Block::paragraph(lorem(900), "BodyText"),
        Block::PageBreak,
        Block::image("Missing.png", 300.0, 200.0, 396.0),
    ];
    let first = layout(blocks.clone());
    let second = layout(blocks);
    assert_eq!(first, second);
    assert_eq!(format!("{first:?}"), format!("{second:?}"));
}

#[test]
fn image_taller_than_a_page_is_rejected() {
    let resolver =
        MemoryImageResolver::new().with_image("Long.png", ImageData::solid(2, 8, Color::WHITE));
    let err = layout_with(
        vec![Block::image("Long.png", 200.0, 800.0, 396.0)],
        &resolver,
        &LayoutOptions::default(),
    )
    .unwrap_err();
    match err {
        Error::BlockTooLarge {
            index,
            height,
            available,
        } => assert_eq!((index, height, available), (0, 800.0, 720.0)),
        other => panic!("expected BlockTooLarge, got {other:?}"),
    }
}

#[test]
fn line_taller_than_a_page_is_rejected() {
    let err = layout_with(
        vec![Block::paragraph("Intro", "Normal"), Block::paragraph("Huge", "Poster")],
        &MemoryImageResolver::new(),
        &LayoutOptions::default(),
    )
    .unwrap_err();
    match err {
        Error::BlockTooLarge {
            index,
            height,
            available,
        } => assert_eq!((index, height, available), (1, 800.0, 720.0)),
        other => panic!("expected BlockTooLarge, got {other:?}"),
    }
}

#[test]
fn table_taller_than_a_page_is_rejected() {
    let rows: Vec<Vec<String>> = (0..20).map(|row| vec![format!("row {row}")]).collect();
    let table = TableBlock::from_strings(rows, vec![300.0], "Cell")
        .with_style(TableStyle::new().with_padding(CellPadding::uniform(6.0)));
    let err = layout_with(
        vec![Block::paragraph("Intro", "Normal"), Block::Table(table)],
        &MemoryImageResolver::new(),
        &LayoutOptions::default(),
    )
    .unwrap_err();
    match err {
        Error::BlockTooLarge {
            index,
            height,
            available,
        } => assert_eq!((index, height, available), (1, 800.0, 720.0)),
        other => panic!("expected BlockTooLarge, got {other:?}"),
    }
}

#[test]
fn invalid_block_is_reported_before_layout() {
    let err = layout_with(
        vec![Block::paragraph("fine", "Normal"), Block::spacer(-1.0)],
        &MemoryImageResolver::new(),
        &LayoutOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidBlock { index: 1, .. }));
}

#[test]
fn style_cycles_abort_layout() {
    let styles = StyleSheet::sample()
        .with_style(Style::new("A").with_parent("B"))
        .with_style(Style::new("B").with_parent("A"));
    let err = paginate(
        Document::new(vec![Block::paragraph("loop", "A")], geometry(), styles),
        &HalfEmShaper,
        &MemoryImageResolver::new(),
        &LayoutOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::StyleCycle { .. }));
}
