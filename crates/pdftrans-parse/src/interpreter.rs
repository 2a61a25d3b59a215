//! Content stream interpreter.
//!
//! Walks decoded content operators, maintaining graphics and text state,
//! and reports shown strings and image placements to a [`ContentHandler`].
//! Form XObjects are interpreted recursively with their own resources.

use std::collections::{HashMap, HashSet};

use lopdf::Object;
use lopdf::content::Content;
use pdftrans_core::{Ctm, Diagnostic, DiagnosticCode, ExtractOptions, Point};

use crate::error::BackendError;
use crate::font::LoadedFont;
use crate::handler::{ContentHandler, ImageEvent, TextRunEvent};
use crate::lopdf_backend::{decode_stream, dict_entry, object_to_f64, resolve_ref};
use crate::state::{GraphicsState, TextState};

/// A `TJ` adjustment at or beyond this (in 1/1000 em, leftward negative)
/// is read as a word break.
const TJ_SPACE_THRESHOLD: f64 = -200.0;

/// Interpret a content stream and emit events to the handler.
#[allow(clippy::too_many_arguments)]
pub(crate) fn interpret_content_stream(
    doc: &lopdf::Document,
    stream_bytes: &[u8],
    resources: &lopdf::Dictionary,
    handler: &mut dyn ContentHandler,
    options: &ExtractOptions,
    depth: usize,
    gstate: &mut GraphicsState,
    tstate: &mut TextState,
) -> Result<(), BackendError> {
    let content = Content::decode(stream_bytes)
        .map_err(|e| BackendError::Interpreter(format!("failed to decode content stream: {e}")))?;
    let mut fonts = FontCache::default();
    let scope = Scope {
        doc,
        resources,
        options,
        depth,
    };

    for op in &content.operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => gstate.save(tstate),
            "Q" => gstate.restore(tstate),
            "cm" => {
                if let Some(m) = matrix(operands) {
                    gstate.concat(m);
                }
            }
            "gs" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    apply_ext_gstate(&scope, gstate, name);
                }
            }

            "g" | "rg" | "k" | "sc" | "scn" => {
                let components: Vec<f64> = operands
                    .iter()
                    .filter_map(|o| object_to_f64(o).ok())
                    .collect();
                gstate.set_fill_components(&components);
            }
            "cs" => gstate.fill = pdftrans_core::Rgb::BLACK,

            "BT" => tstate.begin_text(),
            "ET" => {}
            "Tf" => {
                if let (Some(name), Some(size)) = (
                    operands.first().and_then(|o| o.as_name().ok()),
                    number(operands, 1),
                ) {
                    let name = String::from_utf8_lossy(name).into_owned();
                    load_font(&scope, &mut fonts, &name, handler);
                    tstate.font_name = name;
                    tstate.font_size = size;
                }
            }
            "Tm" => {
                if let Some(m) = matrix(operands) {
                    tstate.set_matrix(m);
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                    tstate.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                    tstate.move_line_set_leading(tx, ty);
                }
            }
            "T*" => tstate.next_line(),
            "Tc" => set_number(operands, &mut tstate.char_spacing),
            "Tw" => set_number(operands, &mut tstate.word_spacing),
            "Tz" => set_number(operands, &mut tstate.h_scaling),
            "TL" => set_number(operands, &mut tstate.leading),
            "Ts" => set_number(operands, &mut tstate.rise),

            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    show(&scope, &mut fonts, gstate, tstate, handler, &[TjItem::Text(bytes)]);
                }
            }
            "'" => {
                tstate.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    show(&scope, &mut fonts, gstate, tstate, handler, &[TjItem::Text(bytes)]);
                }
            }
            "\"" => {
                if let [aw, ac, Object::String(bytes, _), ..] = operands {
                    if let Ok(aw) = object_to_f64(aw) {
                        tstate.word_spacing = aw;
                    }
                    if let Ok(ac) = object_to_f64(ac) {
                        tstate.char_spacing = ac;
                    }
                    tstate.next_line();
                    show(&scope, &mut fonts, gstate, tstate, handler, &[TjItem::Text(bytes)]);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let items: Vec<TjItem<'_>> = items
                        .iter()
                        .filter_map(|o| match o {
                            Object::String(bytes, _) => Some(TjItem::Text(bytes)),
                            other => object_to_f64(other).ok().map(TjItem::Adjust),
                        })
                        .collect();
                    show(&scope, &mut fonts, gstate, tstate, handler, &items);
                }
            }

            "Do" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    let name = String::from_utf8_lossy(name).into_owned();
                    handle_do(&scope, handler, gstate, tstate, &name)?;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Per-stream context shared by the operator handlers.
struct Scope<'a> {
    doc: &'a lopdf::Document,
    resources: &'a lopdf::Dictionary,
    options: &'a ExtractOptions,
    depth: usize,
}

impl Scope<'_> {
    fn warn(&self, handler: &mut dyn ContentHandler, warning: Diagnostic) {
        if self.options.collect_warnings {
            handler.on_warning(warning);
        }
    }
}

/// Fonts loaded by this stream, keyed by resource name.
#[derive(Default)]
struct FontCache {
    loaded: HashMap<String, LoadedFont>,
    /// Resource names already reported for undecodable codes.
    undecodable: HashSet<String>,
}

enum TjItem<'a> {
    Text(&'a [u8]),
    Adjust(f64),
}

fn number(operands: &[Object], index: usize) -> Option<f64> {
    operands.get(index).and_then(|o| object_to_f64(o).ok())
}

fn set_number(operands: &[Object], target: &mut f64) {
    if let Some(v) = number(operands, 0) {
        *target = v;
    }
}

fn matrix(operands: &[Object]) -> Option<Ctm> {
    if operands.len() < 6 {
        return None;
    }
    let v: Vec<f64> = operands[..6]
        .iter()
        .map(|o| object_to_f64(o).ok())
        .collect::<Option<_>>()?;
    Some(Ctm::new(v[0], v[1], v[2], v[3], v[4], v[5]))
}

fn load_font(
    scope: &Scope<'_>,
    fonts: &mut FontCache,
    name: &str,
    handler: &mut dyn ContentHandler,
) {
    if fonts.loaded.contains_key(name) {
        return;
    }
    let dict = dict_entry(scope.doc, scope.resources, b"Font")
        .and_then(|fonts| dict_entry(scope.doc, fonts, name.as_bytes()));

    let font = match dict {
        Some(dict) => {
            let font = LoadedFont::from_dict(scope.doc, dict);
            if let Some(err) = &font.to_unicode_error {
                scope.warn(
                    handler,
                    Diagnostic::new(
                        DiagnosticCode::EncodingFallback,
                        format!("unusable ToUnicode map, using font encoding: {err}"),
                    )
                    .with_font(font.base_name.clone()),
                );
            }
            font
        }
        None => {
            scope.warn(
                handler,
                Diagnostic::new(
                    DiagnosticCode::MissingFont,
                    "font not found in resources, using Helvetica metrics",
                )
                .with_font(name),
            );
            LoadedFont::fallback(name)
        }
    };
    fonts.loaded.insert(name.to_string(), font);
}

/// Show a sequence of strings and positioning adjustments as one run.
fn show(
    scope: &Scope<'_>,
    fonts: &mut FontCache,
    gstate: &GraphicsState,
    tstate: &mut TextState,
    handler: &mut dyn ContentHandler,
    items: &[TjItem<'_>],
) {
    let fallback;
    let font = match fonts.loaded.get(&tstate.font_name) {
        Some(font) => font,
        None => {
            fallback = LoadedFont::fallback(&tstate.font_name);
            &fallback
        }
    };

    let start = tstate.rendering_matrix(&gstate.ctm);
    let font_size = start.vertical_scale();
    let origin = start.transform_point(Point::new(0.0, 0.0));
    let th = tstate.h_scale();
    let mut text = String::new();
    let mut undecodable = false;

    for item in items {
        match item {
            TjItem::Text(bytes) => {
                for glyph in font.decode(bytes) {
                    if glyph.text.is_empty() {
                        text.push(char::REPLACEMENT_CHARACTER);
                        undecodable = true;
                    } else {
                        text.push_str(&glyph.text);
                    }
                    let word_spacing = if glyph.is_word_space {
                        tstate.word_spacing
                    } else {
                        0.0
                    };
                    let tx = ((glyph.width / 1000.0) * tstate.font_size
                        + tstate.char_spacing
                        + word_spacing)
                        * th;
                    tstate.advance(tx);
                }
            }
            TjItem::Adjust(adj) => {
                tstate.advance(-(adj / 1000.0) * tstate.font_size * th);
                if *adj <= TJ_SPACE_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
                    text.push(' ');
                }
            }
        }
    }

    if undecodable && fonts.undecodable.insert(tstate.font_name.clone()) {
        scope.warn(
            handler,
            Diagnostic::new(
                DiagnosticCode::EncodingFallback,
                "character codes without a Unicode mapping replaced by U+FFFD",
            )
            .with_font(font.base_name.clone()),
        );
    }
    if text.trim().is_empty() || !(font_size > 0.0) {
        return;
    }
    let end = tstate
        .rendering_matrix(&gstate.ctm)
        .transform_point(Point::new(0.0, 0.0));
    let font_name = if font.base_name.is_empty() {
        tstate.font_name.clone()
    } else {
        font.base_name.clone()
    };

    handler.on_text_run(TextRunEvent {
        text: text.trim_end().to_string(),
        font_name,
        resource_name: tstate.font_name.clone(),
        font_size,
        origin,
        end,
        descent: font.descent / 1000.0,
        fill: gstate.fill,
        alpha: gstate.fill_alpha,
    });
}

/// Apply `/ca` from a named ExtGState. Unknown names are ignored.
fn apply_ext_gstate(scope: &Scope<'_>, gstate: &mut GraphicsState, name: &[u8]) {
    let Some(ext) = dict_entry(scope.doc, scope.resources, b"ExtGState")
        .and_then(|all| dict_entry(scope.doc, all, name))
    else {
        return;
    };
    if let Some(alpha) = ext
        .get(b"ca")
        .ok()
        .and_then(|o| object_to_f64(resolve_ref(scope.doc, o)).ok())
    {
        gstate.fill_alpha = alpha.clamp(0.0, 1.0);
    }
}

fn handle_do(
    scope: &Scope<'_>,
    handler: &mut dyn ContentHandler,
    gstate: &mut GraphicsState,
    tstate: &mut TextState,
    name: &str,
) -> Result<(), BackendError> {
    let Some(stream) = dict_entry(scope.doc, scope.resources, b"XObject")
        .and_then(|xobjects| xobjects.get(name.as_bytes()).ok())
        .and_then(|o| resolve_ref(scope.doc, o).as_stream().ok())
    else {
        scope.warn(
            handler,
            Diagnostic::new(
                DiagnosticCode::MalformedObject,
                format!("XObject /{name} not found in resources"),
            ),
        );
        return Ok(());
    };

    let subtype = stream
        .dict
        .get(b"Subtype")
        .ok()
        .and_then(|o| o.as_name().ok())
        .unwrap_or(b"");

    match subtype {
        b"Image" => {
            let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
                .map(|(x, y)| gstate.ctm.transform_point(Point::new(x, y)));
            let min = corners
                .iter()
                .fold(Point::new(f64::INFINITY, f64::INFINITY), |acc, p| {
                    Point::new(acc.x.min(p.x), acc.y.min(p.y))
                });
            let max = corners
                .iter()
                .fold(Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY), |acc, p| {
                    Point::new(acc.x.max(p.x), acc.y.max(p.y))
                });
            handler.on_image(ImageEvent {
                name: name.to_string(),
                min,
                max,
            });
            Ok(())
        }
        b"Form" => {
            if scope.depth + 1 > scope.options.max_recursion_depth {
                #[cfg(feature = "tracing")]
                tracing::debug!(form = name, depth = scope.depth, "form nesting limit reached");
                scope.warn(
                    handler,
                    Diagnostic::new(
                        DiagnosticCode::MalformedObject,
                        format!(
                            "Form XObject /{name} nested deeper than {}, skipped",
                            scope.options.max_recursion_depth
                        ),
                    ),
                );
                return Ok(());
            }

            gstate.save(tstate);
            if let Some(m) = stream
                .dict
                .get(b"Matrix")
                .ok()
                .and_then(|o| o.as_array().ok())
                .and_then(|arr| matrix(arr))
            {
                gstate.concat(m);
            }
            let resources =
                dict_entry(scope.doc, &stream.dict, b"Resources").unwrap_or(scope.resources);
            let bytes = decode_stream(stream)?;
            let result = interpret_content_stream(
                scope.doc,
                &bytes,
                resources,
                handler,
                scope.options,
                scope.depth + 1,
                gstate,
                tstate,
            );
            gstate.restore(tstate);
            result
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::CollectingHandler;
    use lopdf::{Stream, dictionary};

    fn helvetica_resources(doc: &mut lopdf::Document) -> lopdf::Dictionary {
        let font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        dictionary! { "Font" => dictionary! { "F1" => Object::Reference(font) } }
    }

    fn run(doc: &lopdf::Document, resources: &lopdf::Dictionary, content: &[u8]) -> CollectingHandler {
        let mut handler = CollectingHandler::default();
        interpret_content_stream(
            doc,
            content,
            resources,
            &mut handler,
            &ExtractOptions::default(),
            0,
            &mut GraphicsState::default(),
            &mut TextState::default(),
        )
        .unwrap();
        handler
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn tj_reports_position_size_and_width() {
        let mut doc = lopdf::Document::with_version("1.5");
        let res = helvetica_resources(&mut doc);
        let h = run(&doc, &res, b"BT /F1 12 Tf 72 700 Td (Hi) Tj ET");
        assert_eq!(h.runs.len(), 1);
        let r = &h.runs[0];
        assert_eq!(r.text, "Hi");
        assert_eq!(r.font_name, "Helvetica");
        assert_eq!(r.resource_name, "F1");
        approx(r.font_size, 12.0);
        approx(r.origin.x, 72.0);
        approx(r.origin.y, 700.0);
        // H = 722, i = 222
        approx(r.end.x, 72.0 + 0.944 * 12.0);
        approx(r.descent, -0.207);
    }

    #[test]
    fn ctm_scales_effective_font_size() {
        let mut doc = lopdf::Document::with_version("1.5");
        let res = helvetica_resources(&mut doc);
        let h = run(&doc, &res, b"q 2 0 0 2 0 0 cm BT /F1 10 Tf 10 10 Td (A) Tj ET Q");
        approx(h.runs[0].font_size, 20.0);
        approx(h.runs[0].origin.x, 20.0);
    }

    #[test]
    fn tj_array_inserts_space_for_wide_gaps() {
        let mut doc = lopdf::Document::with_version("1.5");
        let res = helvetica_resources(&mut doc);
        let h = run(&doc, &res, b"BT /F1 12 Tf [(Hello) -300 (World) -20 (!)] TJ ET");
        assert_eq!(h.runs[0].text, "Hello World!");
    }

    #[test]
    fn fill_color_and_alpha_are_captured() {
        let mut doc = lopdf::Document::with_version("1.5");
        let mut res = helvetica_resources(&mut doc);
        res.set(
            "ExtGState",
            dictionary! { "GS1" => dictionary! { "ca" => Object::Real(0.5) } },
        );
        let h = run(&doc, &res, b"/GS1 gs 1 0 0 rg BT /F1 12 Tf (A) Tj ET");
        let r = &h.runs[0];
        assert_eq!(r.fill, pdftrans_core::Rgb::new(1.0, 0.0, 0.0));
        approx(r.alpha, 0.5);
    }

    #[test]
    fn restore_resets_color() {
        let mut doc = lopdf::Document::with_version("1.5");
        let res = helvetica_resources(&mut doc);
        let h = run(
            &doc,
            &res,
            b"q 0 0 1 rg BT /F1 12 Tf (A) Tj ET Q BT /F1 12 Tf (B) Tj ET",
        );
        assert_eq!(h.runs[0].fill, pdftrans_core::Rgb::new(0.0, 0.0, 1.0));
        assert_eq!(h.runs[1].fill, pdftrans_core::Rgb::BLACK);
    }

    #[test]
    fn missing_font_warns_and_uses_fallback() {
        let doc = lopdf::Document::with_version("1.5");
        let h = run(&doc, &lopdf::Dictionary::new(), b"BT /F9 12 Tf (A) Tj ET");
        assert_eq!(h.runs.len(), 1);
        assert_eq!(h.runs[0].font_name, "F9");
        assert_eq!(h.warnings.len(), 1);
        assert_eq!(h.warnings[0].code, DiagnosticCode::MissingFont);
    }

    #[test]
    fn whitespace_only_strings_are_not_reported() {
        let mut doc = lopdf::Document::with_version("1.5");
        let res = helvetica_resources(&mut doc);
        let h = run(&doc, &res, b"BT /F1 12 Tf (   ) Tj ET");
        assert!(h.runs.is_empty());
    }

    #[test]
    fn image_placement_uses_ctm() {
        let mut doc = lopdf::Document::with_version("1.5");
        let img = doc.add_object(Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Image" },
            vec![0u8; 3],
        ));
        let res = dictionary! { "XObject" => dictionary! { "Im0" => Object::Reference(img) } };
        let h = run(&doc, &res, b"q 100 0 0 50 10 20 cm /Im0 Do Q");
        assert_eq!(h.images.len(), 1);
        approx(h.images[0].min.x, 10.0);
        approx(h.images[0].min.y, 20.0);
        approx(h.images[0].max.x, 110.0);
        approx(h.images[0].max.y, 70.0);
    }

    #[test]
    fn form_xobject_text_is_transformed() {
        let mut doc = lopdf::Document::with_version("1.5");
        let font_res = helvetica_resources(&mut doc);
        let form = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "Matrix" => vec![
                    Object::Integer(1), Object::Integer(0), Object::Integer(0),
                    Object::Integer(1), Object::Integer(100), Object::Integer(0),
                ],
                "Resources" => font_res,
            },
            b"BT /F1 10 Tf 0 0 Td (Form) Tj ET".to_vec(),
        ));
        let res = dictionary! { "XObject" => dictionary! { "Fm0" => Object::Reference(form) } };
        let h = run(&doc, &res, b"/Fm0 Do");
        assert_eq!(h.runs.len(), 1);
        assert_eq!(h.runs[0].text, "Form");
        approx(h.runs[0].origin.x, 100.0);
    }

    #[test]
    fn self_referencing_form_stops_at_depth_limit() {
        let mut doc = lopdf::Document::with_version("1.5");
        let form_id = doc.new_object_id();
        let form = Stream::new(
            dictionary! {
                "Subtype" => "Form",
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Fm0" => Object::Reference(form_id) },
                },
            },
            b"/Fm0 Do".to_vec(),
        );
        doc.objects.insert(form_id, Object::Stream(form));
        let res = dictionary! { "XObject" => dictionary! { "Fm0" => Object::Reference(form_id) } };
        let h = run(&doc, &res, b"/Fm0 Do");
        assert_eq!(h.warnings.len(), 1);
        assert_eq!(h.warnings[0].code, DiagnosticCode::MalformedObject);
    }
}
