//! Page-owned resources and content streams.
//!
//! Resource dictionaries are often shared between pages or inherited from
//! the page tree. Before a page is edited its resources are copied into the
//! page dictionary, so edits never leak into other pages.

use lopdf::{Dictionary, Object, ObjectId, Stream, dictionary};
use pdftrans_core::PdfError;
use pdftrans_parse::lopdf_backend::{page_resources, resolve_ref};

/// Sub-dictionaries copied along with the resources themselves.
const OWNED_CATEGORIES: [&[u8]; 3] = [b"Font", b"XObject", b"ExtGState"];

fn parse_error(context: &str, err: impl std::fmt::Display) -> PdfError {
    PdfError::ParseError(format!("{context}: {err}"))
}

fn page_dict_mut(doc: &mut lopdf::Document, page_id: ObjectId) -> Result<&mut Dictionary, PdfError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| parse_error("page dictionary", e))
}

/// A direct copy of the page's effective resources, with the font, XObject
/// and ExtGState maps resolved into direct dictionaries too.
pub(crate) fn owned_resources_copy(
    doc: &lopdf::Document,
    page_id: ObjectId,
) -> Result<Dictionary, PdfError> {
    let mut resources = page_resources(doc, page_id).map_err(PdfError::from)?.clone();
    for key in OWNED_CATEGORIES {
        let resolved = match resources.get(key) {
            Ok(obj) => resolve_ref(doc, obj).as_dict().ok().cloned(),
            Err(_) => None,
        };
        if let Some(dict) = resolved {
            resources.set(key, Object::Dictionary(dict));
        }
    }
    Ok(resources)
}

/// Make the page's resources page-owned and return them for editing.
pub(crate) fn page_owned_resources(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
) -> Result<&mut Dictionary, PdfError> {
    let resources = owned_resources_copy(doc, page_id)?;
    let page = page_dict_mut(doc, page_id)?;
    page.set("Resources", Object::Dictionary(resources));
    page.get_mut(b"Resources")
        .and_then(Object::as_dict_mut)
        .map_err(|e| parse_error("page resources", e))
}

/// Set `/Resources /<category> /<name>` on a page.
pub(crate) fn set_page_resource(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
    value: Object,
) -> Result<(), PdfError> {
    let resources = page_owned_resources(doc, page_id)?;
    if !resources.has(category) {
        resources.set(category, Object::Dictionary(Dictionary::new()));
    }
    resources
        .get_mut(category)
        .and_then(Object::as_dict_mut)
        .map_err(|e| parse_error("resource category", e))?
        .set(name, value);
    Ok(())
}

/// The page's resource entry under `category`/`name`, unresolved.
pub(crate) fn page_resource<'a>(
    doc: &'a lopdf::Document,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
) -> Option<&'a Object> {
    page_resources(doc, page_id)
        .ok()
        .and_then(|r| r.get(category).ok())
        .and_then(|c| resolve_ref(doc, c).as_dict().ok())
        .and_then(|c| c.get(name.as_bytes()).ok())
}

/// Whether a page already carries a resource under `category`/`name`.
pub(crate) fn has_page_resource(
    doc: &lopdf::Document,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
) -> bool {
    page_resource(doc, page_id, category, name).is_some()
}

/// Replace all of a page's content streams with one new stream.
pub(crate) fn replace_page_content(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<ObjectId, PdfError> {
    let stream_id = doc.add_object(Stream::new(dictionary! {}, content));
    page_dict_mut(doc, page_id)?.set("Contents", Object::Reference(stream_id));
    Ok(stream_id)
}

/// Append a content stream after the page's existing ones.
pub(crate) fn append_page_content(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<ObjectId, PdfError> {
    let stream_id = doc.add_object(Stream::new(dictionary! {}, content));
    let page = page_dict_mut(doc, page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id), Object::Reference(stream_id)],
        Ok(Object::Array(items)) => {
            let mut items = items.clone();
            items.push(Object::Reference(stream_id));
            items
        }
        _ => vec![Object::Reference(stream_id)],
    };
    page.set("Contents", Object::Array(contents));
    Ok(stream_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdftrans_parse::lopdf_backend::page_content_bytes;

    /// Two pages sharing one resources object through the page tree.
    fn shared_resources_doc() -> (lopdf::Document, ObjectId, ObjectId) {
        let mut doc = lopdf::Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        });
        let c1 = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let p1 = doc.add_object(dictionary! { "Type" => "Page", "Contents" => Object::Reference(c1) });
        let p2 = doc.add_object(dictionary! { "Type" => "Page" });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(p1), Object::Reference(p2)],
            "Count" => Object::Integer(2),
            "Resources" => Object::Reference(resources_id),
        });
        for pid in [p1, p2] {
            if let Ok(dict) = doc.get_object_mut(pid).and_then(Object::as_dict_mut) {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }
        (doc, p1, p2)
    }

    #[test]
    fn editing_one_page_leaves_sibling_untouched() {
        let (mut doc, p1, p2) = shared_resources_doc();
        set_page_resource(&mut doc, p1, b"Font", "helv", Object::Null).unwrap();

        assert!(has_page_resource(&doc, p1, b"Font", "helv"));
        assert!(has_page_resource(&doc, p1, b"Font", "F1"));
        assert!(!has_page_resource(&doc, p2, b"Font", "helv"));
    }

    #[test]
    fn new_category_is_created() {
        let (mut doc, p1, _) = shared_resources_doc();
        set_page_resource(&mut doc, p1, b"ExtGState", "GS0", Object::Null).unwrap();
        assert!(has_page_resource(&doc, p1, b"ExtGState", "GS0"));
    }

    #[test]
    fn append_turns_single_reference_into_array() {
        let (mut doc, p1, p2) = shared_resources_doc();
        append_page_content(&mut doc, p1, b"q Q".to_vec()).unwrap();
        append_page_content(&mut doc, p2, b"q Q".to_vec()).unwrap();

        let page = doc.get_object(p1).and_then(Object::as_dict).unwrap();
        assert_eq!(page.get(b"Contents").unwrap().as_array().unwrap().len(), 2);
        let bytes = page_content_bytes(&doc, page).unwrap();
        assert_eq!(bytes, b"BT ET q Q".to_vec());

        let page2 = doc.get_object(p2).and_then(Object::as_dict).unwrap();
        assert_eq!(page2.get(b"Contents").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn replace_drops_previous_streams() {
        let (mut doc, p1, _) = shared_resources_doc();
        replace_page_content(&mut doc, p1, b"q Q".to_vec()).unwrap();
        let page = doc.get_object(p1).and_then(Object::as_dict).unwrap();
        assert_eq!(page_content_bytes(&doc, page).unwrap(), b"q Q".to_vec());
    }
}
