//! Whole-page redaction of text and vector marks.
//!
//! Text objects and painted paths are stripped from the page content and
//! from every Form XObject the page draws. Images, clipping paths and
//! graphics state changes survive. Forms are rewritten into copies owned by
//! the page, so other pages drawing the same form are unaffected.
//!
//! All rewritten content is computed before anything is written back; a
//! failure leaves the page exactly as it was.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use pdftrans_core::PdfError;
use pdftrans_parse::lopdf_backend::{decode_stream, dict_entry, page_content_bytes, resolve_ref};

use crate::resources::{owned_resources_copy, page_owned_resources, replace_page_content};

/// Form dictionary entries that do not carry over to a rewritten copy.
const STRIPPED_FORM_KEYS: [&[u8]; 4] = [b"Filter", b"DecodeParms", b"Length", b"Resources"];

/// What a redaction removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedactionSummary {
    /// `BT … ET` objects removed.
    pub text_objects: usize,
    /// Painted paths and shadings removed.
    pub paths: usize,
    /// Form XObjects rewritten into page-owned copies.
    pub forms: usize,
}

/// A rewritten Form XObject waiting to be committed, with the forms it draws.
struct FormCopy {
    dict: Dictionary,
    content: Vec<u8>,
    resources: Dictionary,
    children: Vec<(Vec<u8>, FormCopy)>,
}

fn interpreter_error(context: &str, err: impl std::fmt::Display) -> PdfError {
    PdfError::InterpreterError(format!("{context}: {err}"))
}

/// Remove all text and painted vector marks from a page.
///
/// The surviving content is wrapped in `q … Q` so text appended afterwards
/// starts from the default graphics state.
pub fn redact_page(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    max_form_depth: usize,
) -> Result<RedactionSummary, PdfError> {
    let mut summary = RedactionSummary::default();

    let page_dict = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| PdfError::ParseError(format!("page dictionary: {e}")))?;
    let content = page_content_bytes(doc, page_dict).map_err(PdfError::from)?;
    let resources = owned_resources_copy(doc, page_id)?;

    let ops = strip_marks(decode_ops(&content)?, &mut summary);
    let forms = copy_drawn_forms(doc, &ops, &resources, 1, max_form_depth, &mut summary)?;

    let mut wrapped = Vec::with_capacity(ops.len() + 2);
    wrapped.push(Operation::new("q", vec![]));
    wrapped.extend(ops);
    wrapped.push(Operation::new("Q", vec![]));
    let bytes = Content {
        operations: wrapped,
    }
    .encode()
    .map_err(|e| interpreter_error("failed to encode redacted content", e))?;

    // Commit.
    let mut xobjects = Vec::with_capacity(forms.len());
    for (name, form) in forms {
        xobjects.push((name, commit_form(doc, form)));
    }
    let owned = page_owned_resources(doc, page_id)?;
    if !xobjects.is_empty() {
        if let Ok(dict) = owned.get_mut(b"XObject").and_then(Object::as_dict_mut) {
            for (name, id) in xobjects {
                dict.set(name, Object::Reference(id));
            }
        }
    }
    replace_page_content(doc, page_id, bytes)?;

    tracing::debug!(
        text_objects = summary.text_objects,
        paths = summary.paths,
        forms = summary.forms,
        "page redacted"
    );
    Ok(summary)
}

fn decode_ops(bytes: &[u8]) -> Result<Vec<Operation>, PdfError> {
    Content::decode(bytes)
        .map(|c| c.operations)
        .map_err(|e| interpreter_error("failed to decode content stream", e))
}

/// Operators that change graphics state and remain legal outside text objects.
fn is_state_operator(op: &str) -> bool {
    matches!(
        op,
        "g" | "G"
            | "rg"
            | "RG"
            | "k"
            | "K"
            | "cs"
            | "CS"
            | "sc"
            | "SC"
            | "scn"
            | "SCN"
            | "gs"
            | "w"
            | "J"
            | "j"
            | "M"
            | "d"
            | "ri"
            | "i"
    )
}

/// Filter one operator list. Paths are buffered until their painting
/// operator: a clipping path is kept as `W n`, anything else is dropped.
fn strip_marks(ops: Vec<Operation>, summary: &mut RedactionSummary) -> Vec<Operation> {
    let mut out = Vec::with_capacity(ops.len());
    let mut in_text = false;
    let mut path: Vec<Operation> = Vec::new();
    let mut clip: Option<Operation> = None;

    for op in ops {
        match op.operator.as_str() {
            "BT" => {
                in_text = true;
                summary.text_objects += 1;
            }
            "ET" => in_text = false,
            name if in_text => {
                if is_state_operator(name) {
                    out.push(op);
                }
            }
            "Tj" | "TJ" | "'" | "\"" => {}
            "m" | "l" | "c" | "v" | "y" | "h" | "re" => path.push(op),
            "W" | "W*" => clip = Some(op),
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" => {
                if let Some(clip_op) = clip.take() {
                    out.append(&mut path);
                    out.push(clip_op);
                    out.push(Operation::new("n", vec![]));
                } else {
                    path.clear();
                }
                if op.operator != "n" {
                    summary.paths += 1;
                }
            }
            "sh" => summary.paths += 1,
            _ => out.push(op),
        }
    }
    out
}

fn form_stream<'a>(
    doc: &'a lopdf::Document,
    resources: &'a Dictionary,
    name: &[u8],
) -> Option<&'a Stream> {
    let stream = dict_entry(doc, resources, b"XObject")
        .and_then(|x| x.get(name).ok())
        .and_then(|o| resolve_ref(doc, o).as_stream().ok())?;
    let is_form = stream
        .dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .is_ok_and(|n| n == b"Form");
    is_form.then_some(stream)
}

/// Rewrite every Form XObject drawn by `ops`, keyed by resource name.
fn copy_drawn_forms(
    doc: &lopdf::Document,
    ops: &[Operation],
    resources: &Dictionary,
    depth: usize,
    max_depth: usize,
    summary: &mut RedactionSummary,
) -> Result<Vec<(Vec<u8>, FormCopy)>, PdfError> {
    let mut names: Vec<Vec<u8>> = Vec::new();
    for op in ops.iter().filter(|op| op.operator == "Do") {
        if let Some(Ok(name)) = op.operands.first().map(Object::as_name) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_vec());
            }
        }
    }

    let mut copies = Vec::new();
    if depth > max_depth {
        if !names.is_empty() {
            tracing::warn!(depth, "form nesting too deep, inner forms left unredacted");
        }
        return Ok(copies);
    }
    for name in names {
        if let Some(stream) = form_stream(doc, resources, &name) {
            let copy = copy_form(doc, stream, resources, depth, max_depth, summary)?;
            copies.push((name, copy));
        }
    }
    Ok(copies)
}

fn copy_form(
    doc: &lopdf::Document,
    stream: &Stream,
    parent_resources: &Dictionary,
    depth: usize,
    max_depth: usize,
    summary: &mut RedactionSummary,
) -> Result<FormCopy, PdfError> {
    let bytes = decode_stream(stream).map_err(PdfError::from)?;
    let ops = strip_marks(decode_ops(&bytes)?, summary);

    // Forms without resources draw with their parent's; the copy carries
    // them explicitly so its own XObject map can be rewritten.
    let mut resources = dict_entry(doc, &stream.dict, b"Resources")
        .unwrap_or(parent_resources)
        .clone();
    if let Some(xobjects) = dict_entry(doc, &resources, b"XObject").cloned() {
        resources.set("XObject", Object::Dictionary(xobjects));
    }

    let children = copy_drawn_forms(doc, &ops, &resources, depth + 1, max_depth, summary)?;
    let content = Content { operations: ops }
        .encode()
        .map_err(|e| interpreter_error("failed to encode form content", e))?;

    let mut dict = stream.dict.clone();
    for key in STRIPPED_FORM_KEYS {
        dict.remove(key);
    }
    summary.forms += 1;
    Ok(FormCopy {
        dict,
        content,
        resources,
        children,
    })
}

fn commit_form(doc: &mut lopdf::Document, form: FormCopy) -> ObjectId {
    let FormCopy {
        mut dict,
        content,
        mut resources,
        children,
    } = form;
    let mut committed = Vec::with_capacity(children.len());
    for (name, child) in children {
        committed.push((name, commit_form(doc, child)));
    }
    if let Ok(xobjects) = resources.get_mut(b"XObject").and_then(Object::as_dict_mut) {
        for (name, id) in committed {
            xobjects.set(name, Object::Reference(id));
        }
    }
    dict.set("Resources", Object::Dictionary(resources));
    doc.add_object(Stream::new(dict, content))
}
