//! pdftrans-parse: PDF parsing backend and content stream interpreter.
//!
//! Reads page geometry, resources and content streams through lopdf and
//! interprets the content, reporting positioned text runs and image
//! placements to a [`ContentHandler`]. Font decoding (simple encodings,
//! `/Differences`, Type0 two-byte codes and `/ToUnicode` CMaps) lives here
//! too, so callers only ever see Unicode text.

pub mod backend;
pub mod cmap;
pub mod encoding;
pub mod error;
pub mod font;
pub mod handler;
mod interpreter;
pub mod lopdf_backend;
pub mod standard_fonts;
pub mod state;

pub use backend::PdfBackend;
pub use cmap::CMap;
pub use error::BackendError;
pub use font::{FontKind, LoadedFont, ShownGlyph};
pub use handler::{ContentHandler, ImageEvent, TextRunEvent};
pub use lopdf_backend::{LopdfBackend, LopdfDocument, LopdfPage};
pub use pdftrans_core;
