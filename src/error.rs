//! Error types for the manual_composer crate.

use std::io;

use thiserror::Error;

/// Result type alias for manual composition.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors raised while validating, laying out, or serializing a document.
///
/// None of these produce partial output: a build either yields a complete page
/// sequence or one of the variants below.
#[derive(Error, Debug)]
pub enum Error {
    /// A content block is malformed.
    #[error("block {index} is invalid: {reason}")]
    InvalidBlock {
        /// Position of the block in the document.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// An atomic block is taller than the usable page height.
    #[error("block {index} needs {height:.2}pt but a page only offers {available:.2}pt")]
    BlockTooLarge {
        /// Position of the block in the document.
        index: usize,
        /// Rendered height of the block.
        height: f64,
        /// Usable page height.
        available: f64,
    },

    /// A style's parent chain loops back on itself.
    #[error("style inheritance cycle through `{style}`")]
    StyleCycle {
        /// First style name seen twice while walking the chain.
        style: String,
    },

    /// A style name is not registered in the style sheet.
    #[error("unknown style `{style}`")]
    UnknownStyle {
        /// The missing style name.
        style: String,
    },

    /// Page size and margins leave no usable area.
    #[error("invalid page geometry: {0}")]
    InvalidGeometry(String),

    /// The page sink failed to produce its artifact.
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// The content manifest could not be read.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Font assets could not be loaded.
    #[error("font loading failed: {0}")]
    FontLoad(String),

    /// The PDF outline could not be added.
    #[cfg(feature = "bookmarks")]
    #[error(transparent)]
    Bookmarks(#[from] crate::bookmarks::BookmarkError),

    /// I/O error while reading inputs or writing outputs.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
