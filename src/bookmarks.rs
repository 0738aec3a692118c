//! PDF outline injection built on top of `lopdf`.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use thiserror::Error;

/// One outline entry pointing at a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    /// Stored as the entry's `/NM` name when present.
    pub identifier: Option<String>,
    /// One-based page number.
    pub page: usize,
}

/// Errors that can occur while embedding bookmarks into a rendered PDF document.
#[derive(Error, Debug)]
pub enum BookmarkError {
    /// The PDF bytes could not be parsed or written by `lopdf`.
    #[error("failed to process PDF bytes: {0}")]
    Pdf(#[from] lopdf::Error),
    /// A required catalog entry was missing from the document trailer.
    #[error("PDF catalog entry is missing")]
    MissingCatalog,
    /// The catalog object was not a dictionary, preventing outline injection.
    #[error("PDF catalog entry is not a dictionary")]
    InvalidCatalog,
    /// A referenced page number did not exist in the rendered document.
    #[error("bookmark `{title}` refers to missing page {page}")]
    MissingPage { title: String, page: usize },
}

/// Adds a flat `/Outlines` tree with one `/Dest [page /Fit]` entry per bookmark.
///
/// Bytes are returned unchanged when `bookmarks` is empty.
pub fn apply_bookmarks(
    pdf_bytes: &[u8],
    bookmarks: &[Bookmark],
) -> Result<Vec<u8>, BookmarkError> {
    if bookmarks.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let mut document = Document::load_mem(pdf_bytes)?;
    let pages = document.get_pages();
    let entries = collect_outline_entries(&mut document, bookmarks, &pages)?;

    let outlines_id = document.new_object_id();
    link_outline_entries(outlines_id, &mut document, &entries);
    insert_outlines_root(outlines_id, &mut document, &entries)?;

    let mut buffer = Vec::new();
    document
        .save_to(&mut buffer)
        .map_err(|err| BookmarkError::Pdf(err.into()))?;
    Ok(buffer)
}

struct OutlineEntry<'a> {
    object_id: ObjectId,
    page_ref: ObjectId,
    bookmark: &'a Bookmark,
}

fn collect_outline_entries<'a>(
    document: &mut Document,
    bookmarks: &'a [Bookmark],
    pages: &BTreeMap<u32, ObjectId>,
) -> Result<Vec<OutlineEntry<'a>>, BookmarkError> {
    bookmarks
        .iter()
        .map(|bookmark| {
            let page_ref = u32::try_from(bookmark.page)
                .ok()
                .and_then(|page| pages.get(&page).copied())
                .ok_or_else(|| BookmarkError::MissingPage {
                    title: bookmark.title.clone(),
                    page: bookmark.page,
                })?;
            Ok(OutlineEntry {
                object_id: document.new_object_id(),
                page_ref,
                bookmark,
            })
        })
        .collect()
}

fn link_outline_entries(
    outlines_id: ObjectId,
    document: &mut Document,
    entries: &[OutlineEntry<'_>],
) {
    for (index, entry) in entries.iter().enumerate() {
        let mut dictionary = Dictionary::new();
        dictionary.set("Title", Object::string_literal(entry.bookmark.title.as_str()));
        dictionary.set(
            "Dest",
            Object::Array(vec![
                Object::Reference(entry.page_ref),
                Object::Name("Fit".into()),
            ]),
        );
        dictionary.set("Parent", Object::Reference(outlines_id));

        if let Some(name) = &entry.bookmark.identifier {
            dictionary.set("NM", Object::string_literal(name.as_str()));
        }
        if let Some(previous) = index.checked_sub(1).and_then(|prev| entries.get(prev)) {
            dictionary.set("Prev", Object::Reference(previous.object_id));
        }
        if let Some(next) = entries.get(index + 1) {
            dictionary.set("Next", Object::Reference(next.object_id));
        }

        document
            .objects
            .insert(entry.object_id, Object::Dictionary(dictionary));
    }
}

fn insert_outlines_root(
    outlines_id: ObjectId,
    document: &mut Document,
    entries: &[OutlineEntry<'_>],
) -> Result<(), BookmarkError> {
    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| BookmarkError::MissingCatalog)?;

    let mut dictionary = Dictionary::new();
    dictionary.set("Type", Object::Name("Outlines".into()));
    dictionary.set("Count", Object::Integer(entries.len() as i64));
    if let Some(first) = entries.first() {
        dictionary.set("First", Object::Reference(first.object_id));
    }
    if let Some(last) = entries.last() {
        dictionary.set("Last", Object::Reference(last.object_id));
    }
    document
        .objects
        .insert(outlines_id, Object::Dictionary(dictionary));

    let catalog = document
        .objects
        .get_mut(&catalog_id)
        .ok_or(BookmarkError::MissingCatalog)?
        .as_dict_mut()
        .map_err(|_| BookmarkError::InvalidCatalog)?;
    catalog.set("Outlines", Object::Reference(outlines_id));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ManualBuilder;
    use crate::images::MemoryImageResolver;
    use crate::model::Section;
    use crate::shaping::StandardFontShaper;

    fn rendered() -> Vec<u8> {
        ManualBuilder::new("Contacts")
            .section(Section::new("Login"))
            .section(Section::new("Dashboard").start_on_new_page(true))
            .render(&StandardFontShaper::new(), &MemoryImageResolver::new())
            .expect("renders")
            .bytes
    }

    #[test]
    fn outline_points_at_pages() {
        let bookmarks = vec![
            Bookmark {
                title: "Login".into(),
                identifier: Some("login".into()),
                page: 1,
            },
            Bookmark {
                title: "Dashboard".into(),
                identifier: None,
                page: 2,
            },
        ];
        let bytes = apply_bookmarks(&rendered(), &bookmarks).expect("bookmarks");
        let document = Document::load_mem(&bytes).expect("reloads");
        let catalog_id = document
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .expect("catalog reference");
        let catalog = document.get_dictionary(catalog_id).expect("catalog");
        assert!(catalog.get(b"Outlines").is_ok());
    }

    #[test]
    fn missing_page_is_reported() {
        let bookmarks = vec![Bookmark {
            title: "Import Contacts".into(),
            identifier: None,
            page: 9,
        }];
        let err = apply_bookmarks(&rendered(), &bookmarks).unwrap_err();
        assert!(matches!(err, BookmarkError::MissingPage { page: 9, .. }));
    }
}
