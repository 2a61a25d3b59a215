//! A PDF opened for in-place rewriting.

use std::io::Write;
use std::path::Path;

use pdftrans_core::{ExtractOptions, PdfError};
use pdftrans_parse::lopdf_backend::PageBox;
use pdftrans_parse::{LopdfBackend, LopdfDocument, LopdfPage, PdfBackend};

/// A PDF document opened for translation.
///
/// Owns the parsed object graph; pages are edited in place and the whole
/// document is written out once by [`Document::save`].
///
/// # Example
///
/// ```ignore
/// let mut doc = Document::open_file("in.pdf", None)?;
/// let blocks = BlockExtractor::new(doc.options()).text_blocks(&doc, 0)?;
/// doc.save("out.pdf")?;
/// ```
pub struct Document {
    doc: LopdfDocument,
    options: ExtractOptions,
    /// Cached MediaBox of every page.
    page_boxes: Vec<PageBox>,
}

impl Document {
    /// Open a document from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::IoError`] if the file cannot be read, or any error
    /// of [`Document::open`].
    pub fn open_file(
        path: impl AsRef<Path>,
        options: Option<ExtractOptions>,
    ) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| PdfError::IoError(e.to_string()))?;
        Self::open(&bytes, options)
    }

    /// Open a document from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::PasswordRequired`] if the PDF is encrypted and
    /// [`PdfError::ParseError`] if the bytes are not a valid PDF or a page
    /// has no usable MediaBox.
    pub fn open(bytes: &[u8], options: Option<ExtractOptions>) -> Result<Self, PdfError> {
        let doc = LopdfBackend::open(bytes).map_err(PdfError::from)?;
        Self::from_doc(doc, options)
    }

    /// Wrap an already parsed lopdf document.
    pub fn from_lopdf(
        doc: lopdf::Document,
        options: Option<ExtractOptions>,
    ) -> Result<Self, PdfError> {
        let doc = LopdfDocument::from_document(doc).map_err(PdfError::from)?;
        Self::from_doc(doc, options)
    }

    fn from_doc(doc: LopdfDocument, options: Option<ExtractOptions>) -> Result<Self, PdfError> {
        let page_count = LopdfBackend::page_count(&doc);
        let mut page_boxes = Vec::with_capacity(page_count);
        for i in 0..page_count {
            let page = LopdfBackend::get_page(&doc, i).map_err(PdfError::from)?;
            page_boxes.push(LopdfBackend::page_media_box(&doc, &page).map_err(PdfError::from)?);
        }
        Ok(Self {
            doc,
            options: options.unwrap_or_default(),
            page_boxes,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_boxes.len()
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// MediaBox of a page.
    pub fn page_box(&self, index: usize) -> Result<PageBox, PdfError> {
        self.page_boxes
            .get(index)
            .copied()
            .ok_or_else(|| out_of_range(index, self.page_count()))
    }

    pub(crate) fn page(&self, index: usize) -> Result<LopdfPage, PdfError> {
        LopdfBackend::get_page(&self.doc, index).map_err(PdfError::from)
    }

    /// Object id of a page dictionary.
    pub fn page_id(&self, index: usize) -> Result<lopdf::ObjectId, PdfError> {
        self.doc
            .page_ids()
            .get(index)
            .copied()
            .ok_or_else(|| out_of_range(index, self.page_count()))
    }

    pub(crate) fn backend(&self) -> &LopdfDocument {
        &self.doc
    }

    pub fn lopdf(&self) -> &lopdf::Document {
        self.doc.inner()
    }

    pub fn lopdf_mut(&mut self) -> &mut lopdf::Document {
        self.doc.inner_mut()
    }

    /// Serialize the document to bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, PdfError> {
        let mut buf = Vec::new();
        self.doc
            .inner_mut()
            .save_to(&mut buf)
            .map_err(|e| PdfError::WriteError(e.to_string()))?;
        Ok(buf)
    }

    /// Write the document to `path` atomically.
    ///
    /// Missing parent directories are created. The bytes go to a temporary
    /// file in the destination directory, which is then renamed onto `path`,
    /// so a failed save never leaves a truncated output behind.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), PdfError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| write_error(dir, e))?;
        tmp.write_all(&bytes).map_err(|e| write_error(path, e))?;
        tmp.as_file().sync_all().map_err(|e| write_error(path, e))?;
        tmp.persist(path).map_err(|e| write_error(path, e.error))?;
        Ok(())
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("page_count", &self.page_count())
            .finish_non_exhaustive()
    }
}

fn out_of_range(index: usize, count: usize) -> PdfError {
    PdfError::Other(format!("page index {index} out of range (0..{count})"))
}

fn write_error(path: &Path, err: std::io::Error) -> PdfError {
    PdfError::WriteError(format!("{}: {err}", path.display()))
}
