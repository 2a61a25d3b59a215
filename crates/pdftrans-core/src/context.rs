//! Translation context assembly.
//!
//! The page-text cache is computed once per document; each page's request
//! pairs its blocks with the plain text of up to `window` pages on either
//! side. Windows are clipped at document boundaries and never wrap around.

use crate::block::TextBlock;
use crate::translation::{BlockPayload, TranslationRequest};

/// Plain text of every page, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTextCache {
    pages: Vec<String>,
}

impl PageTextCache {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, index: usize) -> Option<&str> {
        self.pages.get(index).map(String::as_str)
    }
}

/// Text of the `window` pages before and after `index`.
///
/// Returns `(previous, next)`, each in page order. The page at `index`
/// itself is never included.
pub fn neighbor_window(
    cache: &PageTextCache,
    index: usize,
    window: usize,
) -> (Vec<String>, Vec<String>) {
    let len = cache.len();
    if index >= len {
        return (Vec::new(), Vec::new());
    }
    let start = index.saturating_sub(window);
    let end = index.saturating_add(window).min(len - 1);

    let previous = cache.pages[start..index].to_vec();
    let next = cache.pages[index + 1..=end].to_vec();
    (previous, next)
}

/// Build the translation request for one page.
///
/// Returns `None` when the page has no translatable blocks; the page is then
/// left as it is.
pub fn assemble_request(
    page: usize,
    blocks: &[TextBlock],
    cache: &PageTextCache,
    window: usize,
    target_language: &str,
) -> Option<TranslationRequest> {
    if blocks.is_empty() {
        return None;
    }
    let (previous_pages, next_pages) = neighbor_window(cache, page, window);
    Some(TranslationRequest {
        page,
        target_language: target_language.to_string(),
        blocks: blocks.iter().map(BlockPayload::from).collect(),
        previous_pages,
        next_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockKind;
    use crate::geometry::BBox;
    use crate::style::{ExtractedStyle, TextStyle};

    fn cache(n: usize) -> PageTextCache {
        PageTextCache::new((0..n).map(|i| format!("page {i}")).collect())
    }

    fn block(id: usize, text: &str) -> TextBlock {
        TextBlock {
            id,
            bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            text: text.to_string(),
            kind: BlockKind::Text,
            style: ExtractedStyle::Styled(TextStyle::default()),
        }
    }

    #[test]
    fn middle_page_gets_true_neighbors() {
        let (prev, next) = neighbor_window(&cache(5), 2, 1);
        assert_eq!(prev, vec!["page 1"]);
        assert_eq!(next, vec!["page 3"]);
    }

    #[test]
    fn first_page_has_no_previous() {
        let (prev, next) = neighbor_window(&cache(3), 0, 1);
        assert!(prev.is_empty());
        assert_eq!(next, vec!["page 1"]);
    }

    #[test]
    fn last_page_has_no_next_and_no_wraparound() {
        let (prev, next) = neighbor_window(&cache(3), 2, 1);
        assert_eq!(prev, vec!["page 1"]);
        assert!(next.is_empty());
    }

    #[test]
    fn wide_window_is_clipped_at_boundaries() {
        let (prev, next) = neighbor_window(&cache(4), 1, 3);
        assert_eq!(prev, vec!["page 0"]);
        assert_eq!(next, vec!["page 2", "page 3"]);
    }

    #[test]
    fn zero_window_gives_no_context() {
        let (prev, next) = neighbor_window(&cache(4), 1, 0);
        assert!(prev.is_empty());
        assert!(next.is_empty());
    }

    #[test]
    fn single_page_document() {
        let (prev, next) = neighbor_window(&cache(1), 0, 1);
        assert!(prev.is_empty());
        assert!(next.is_empty());
    }

    #[test]
    fn out_of_range_index_is_empty() {
        let (prev, next) = neighbor_window(&cache(2), 7, 1);
        assert!(prev.is_empty() && next.is_empty());
    }

    #[test]
    fn request_reduces_blocks_to_id_and_text() {
        let blocks = vec![block(0, "Hello"), block(1, "World")];
        let req = assemble_request(1, &blocks, &cache(3), 1, "French").unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.target_language, "French");
        assert_eq!(
            req.blocks,
            vec![
                BlockPayload {
                    id: 0,
                    text: "Hello".to_string()
                },
                BlockPayload {
                    id: 1,
                    text: "World".to_string()
                },
            ]
        );
        assert_eq!(req.previous_pages, vec!["page 0"]);
        assert_eq!(req.next_pages, vec!["page 2"]);
    }

    #[test]
    fn no_blocks_short_circuits() {
        assert!(assemble_request(0, &[], &cache(3), 1, "French").is_none());
    }
}
