//! Built-in content for the contact management screenshot manual.

use crate::builder::{screenshot_block, ManualBuilder};
use crate::geometry::{inch, Margins, PageGeometry};
use crate::images::ImageResolver;
use crate::layout::DEFAULT_PLACEHOLDER_STYLE;
use crate::model::{Block, Section};
use crate::style::{Color, HorizontalAlignment, Style, StyleSheet};

/// Title shared by the PDF metadata and the cover page.
pub const MANUAL_TITLE: &str = "Contact Management System";

/// One screen described by the manual.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenSection {
    pub identifier: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    pub steps: &'static [&'static str],
    /// Screenshot file names, relative to the screenshot directory.
    pub images: &'static [&'static str],
}

pub const SCREEN_SECTIONS: &[ScreenSection] = &[
    ScreenSection {
        identifier: "login",
        title: "1) Login",
        summary: "Secure access to the system.",
        steps: &[
            "Enter your username.",
            "Enter your password.",
            "Click Login to continue.",
        ],
        images: &["Login.png"],
    },
    ScreenSection {
        identifier: "dashboard",
        title: "2) Dashboard",
        summary: "Overview of totals, shortcuts, and recent activity.",
        steps: &[
            "Review summary cards for quick status.",
            "Use shortcut buttons for common actions.",
            "Scroll to review recent contacts or updates.",
        ],
        images: &["Dashboard.png"],
    },
    ScreenSection {
        identifier: "all-contacts",
        title: "3) All Contacts - Main List",
        summary: "View all contacts and access common actions.",
        steps: &[
            "Use search to find contacts by name, phone, or email.",
            "Use action buttons to view, edit, or delete.",
            "Use pagination to move through pages.",
        ],
        images: &["All_Contacts_View.png", "All_Contacts_View_1.png"],
    },
    ScreenSection {
        identifier: "add-contact",
        title: "4) Add New Contact",
        summary: "Create a new contact record.",
        steps: &[
            "Enter First Name and/or Last Name (required).",
            "Fill email and phone numbers as needed.",
            "Add address and notes for more context.",
            "Click Create Contact to save.",
        ],
        images: &[
            "Add_New_Contact.png",
            "Add_New_Contact_1.png",
            "Add_New_Contact_2.png",
            "Add_New_Contact_3.png",
        ],
    },
    ScreenSection {
        identifier: "edit-contact",
        title: "5) Edit Contact Details",
        summary: "Update an existing contact.",
        steps: &[
            "Modify fields that changed.",
            "Review contact numbers and email for accuracy.",
            "Update address and optional fields if needed.",
            "Click Update Contact to save changes.",
        ],
        images: &[
            "Edit_Contact_Details.png",
            "Edit_Contact_Details_1.png",
            "Edit_Contact_Details_2.png",
            "Edit_Contact_Details_3.png",
        ],
    },
    ScreenSection {
        identifier: "view-contact",
        title: "6) View Contact Details",
        summary: "Review all information for a single contact.",
        steps: &[
            "Review contact info at the top.",
            "Scroll to see full address and details.",
            "Use action buttons to edit, delete, or manage items.",
        ],
        images: &[
            "View_Contact_Details.png",
            "View_Contact_Details_1.png",
            "View_Contact_Details_2.png",
        ],
    },
    ScreenSection {
        identifier: "import-contacts",
        title: "7) Import Contacts",
        summary: "Import contacts in bulk from Excel or CSV.",
        steps: &[
            "Download a template (Excel or CSV).",
            "Choose file type and select your file.",
            "Click Import Contacts and review the result.",
        ],
        images: &[
            "Import_Contacts.png",
            "Import_Contacts_1.png",
            "Import_Contacts_2.png",
        ],
    },
];

/// A4 with 0.7 inch margins.
pub fn screenshot_geometry() -> PageGeometry {
    PageGeometry::a4().with_margins(Margins::uniform(inch(0.7)))
}

/// The sample sheet plus `TitleStyle`, `HeadingStyle` and `DateStyle`.
pub fn screenshot_styles() -> StyleSheet {
    StyleSheet::sample()
        .with_style(
            Style::new("TitleStyle")
                .with_parent("Title")
                .with_alignment(HorizontalAlignment::Center)
                .with_text_color(Color::rgb(0x00, 0x3d, 0x82))
                .with_font_size(24.0)
                .with_leading(28.0)
                .with_space_after(12.0),
        )
        .with_style(
            Style::new("HeadingStyle")
                .with_parent("Heading2")
                .with_text_color(Color::rgb(0x0e, 0xa5, 0xe9))
                .with_space_before(12.0)
                .with_space_after(8.0),
        )
        .with_style(
            Style::new("DateStyle")
                .with_parent("BodyText")
                .with_alignment(HorizontalAlignment::Center),
        )
}

impl ScreenSection {
    /// Heading, summary, numbered steps and screenshots of this screen.
    pub fn to_section<R: ImageResolver + ?Sized>(&self, resolver: &R, max_width: f64) -> Section {
        let mut section = Section::new(self.title)
            .with_identifier(Some(self.identifier.to_owned()))
            .with_heading_style("HeadingStyle")
            .with_block(Block::paragraph(self.summary, "BodyText"))
            .with_block(Block::spacer(inch(0.1)))
            .with_block(Block::paragraph("Steps:", "BodyText"))
            .with_blocks(
                self.steps
                    .iter()
                    .enumerate()
                    .map(|(index, step)| {
                        Block::paragraph(format!("{}. {step}", index + 1), "BodyText")
                    }),
            )
            .with_block(Block::spacer(inch(0.1)));

        for image in self.images {
            let block = screenshot_block(resolver, image, max_width, DEFAULT_PLACEHOLDER_STYLE);
            let found = matches!(block, Block::Image(_));
            section = section.with_block(block);
            if found {
                section = section.with_block(Block::spacer(inch(0.2)));
            }
        }
        section
    }
}

/// Builds the screenshot manual: a cover page, then one page-separated section per screen.
///
/// Screenshots are looked up through `resolver`; missing ones become placeholder
/// text.  `generated_on` adds a centered date line to the cover.
pub fn screenshot_manual<R: ImageResolver + ?Sized>(
    resolver: &R,
    generated_on: Option<&str>,
) -> ManualBuilder {
    let geometry = screenshot_geometry();
    let max_width = geometry.usable_width();

    let mut builder = ManualBuilder::new(MANUAL_TITLE)
        .with_geometry(geometry)
        .with_styles(screenshot_styles())
        .heading(MANUAL_TITLE, "TitleStyle")
        .heading("Screenshot User Manual", "TitleStyle")
        .spacer(inch(0.2));
    if let Some(date) = generated_on {
        builder = builder.heading(&format!("Generated on {date}"), "DateStyle");
    }
    builder = builder
        .spacer(inch(0.4))
        .paragraph(
            "This manual explains each major screen and shows the corresponding screenshot.",
            "BodyText",
        )
        .page_break();

    for (index, screen) in SCREEN_SECTIONS.iter().enumerate() {
        if index > 0 {
            builder = builder.page_break();
        }
        builder = builder.section(screen.to_section(resolver, max_width));
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::{ImageData, MemoryImageResolver};
    use crate::shaping::StandardFontShaper;

    #[test]
    fn every_section_starts_on_its_own_page() {
        let resolver = MemoryImageResolver::new();
        let builder = screenshot_manual(&resolver, Some("2024-01-31"));
        let pages = builder
            .layout(&StandardFontShaper::new(), &resolver)
            .expect("lays out");
        let starts: Vec<_> = builder
            .sections()
            .iter()
            .map(|section| pages.page_of_block(section.block_index))
            .collect();
        assert_eq!(starts, (2..=8).map(Some).collect::<Vec<_>>());
        assert_eq!(pages.len(), 8);
    }

    #[test]
    fn missing_screenshots_become_placeholders() {
        let section = SCREEN_SECTIONS[0].to_section(&MemoryImageResolver::new(), 400.0);
        assert_eq!(
            section.blocks().last(),
            Some(&Block::paragraph("[Missing image: Login.png]", "BodyText"))
        );
    }

    #[test]
    fn screenshots_are_scaled_to_the_frame() {
        let resolver = MemoryImageResolver::new()
            .with_image("Login.png", ImageData::solid(1200, 600, Color::WHITE));
        let max_width = screenshot_geometry().usable_width();
        let section = SCREEN_SECTIONS[0].to_section(&resolver, max_width);
        let image = section
            .blocks()
            .iter()
            .find_map(|block| match block {
                Block::Image(image) => Some(image.clone()),
                _ => None,
            })
            .expect("image block");
        let (width, height) = image.scaled_size();
        assert!((width - max_width).abs() < 1e-9);
        assert!((height - max_width / 2.0).abs() < 1e-9);
        assert_eq!(section.blocks().last(), Some(&Block::spacer(inch(0.2))));
    }
}
