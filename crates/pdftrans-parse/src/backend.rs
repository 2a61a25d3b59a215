//! PDF parsing backend trait.
//!
//! [`PdfBackend`] is the read-side seam: open a document, enumerate pages,
//! read page geometry and interpret page content into handler events.

use pdftrans_core::{ExtractOptions, PdfError};

use crate::handler::ContentHandler;
use crate::lopdf_backend::PageBox;

pub trait PdfBackend {
    type Document;

    type Page;

    type Error: std::error::Error + Into<PdfError>;

    /// Parse a document from bytes. Encrypted documents are rejected.
    fn open(bytes: &[u8]) -> Result<Self::Document, Self::Error>;

    fn page_count(doc: &Self::Document) -> usize;

    /// Get a page by 0-based index.
    fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error>;

    /// The page's MediaBox, inherited through the page tree if needed.
    fn page_media_box(doc: &Self::Document, page: &Self::Page) -> Result<PageBox, Self::Error>;

    /// Interpret the page's content streams, reporting to `handler`.
    fn interpret_page(
        doc: &Self::Document,
        page: &Self::Page,
        handler: &mut dyn ContentHandler,
        options: &ExtractOptions,
    ) -> Result<(), Self::Error>;
}
