//! Document composition and pagination for user-manual PDFs.
//!
//! A [`model::Document`] is an ordered list of blocks (styled text, tables,
//! images, spacers and page breaks).  [`layout::paginate`] places them onto
//! fixed-size pages and a [`sink::PageSink`] serializes the result, usually
//! through [`builder::ManualBuilder`] which runs the whole pipeline.

pub mod builder;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod images;
pub mod layout;
pub mod manifest;
pub mod model;
pub mod richtext;
pub mod samples;
pub mod shaping;
pub mod sink;
pub mod style;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use error::{Error, Result};
