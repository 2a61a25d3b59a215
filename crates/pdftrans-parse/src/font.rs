//! Font loading and string decoding.
//!
//! A [`LoadedFont`] turns the bytes of a shown string into glyphs carrying
//! Unicode text and advance widths. Unicode resolution goes ToUnicode CMap,
//! then the font's byte encoding (simple fonts) or the code itself (Type0
//! with Identity encoding, where codes are Unicode code units).

use std::collections::HashMap;

use pdftrans_core::strip_subset_prefix;

use crate::cmap::CMap;
use crate::encoding::{BaseEncoding, ByteEncoding};
use crate::error::BackendError;
use crate::lopdf_backend::{decode_stream, dict_entry, object_to_f64, resolve_ref};
use crate::standard_fonts;

/// Simple (one byte per code) or composite (Type0, two bytes per code).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    Simple,
    Composite,
}

/// One glyph of a shown string.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownGlyph {
    pub code: u32,
    /// Unicode text; empty when the code has no mapping.
    pub text: String,
    /// Advance width in 1/1000 em.
    pub width: f64,
    /// Single-byte code 32, which receives word spacing.
    pub is_word_space: bool,
}

/// A font resource ready for decoding.
#[derive(Debug, Clone)]
pub struct LoadedFont {
    /// `/BaseFont`, subset tag kept.
    pub base_name: String,
    pub kind: FontKind,
    /// Ascent and descent in 1/1000 em.
    pub ascent: f64,
    pub descent: f64,
    widths: HashMap<u32, f64>,
    default_width: f64,
    encoding: ByteEncoding,
    to_unicode: Option<CMap>,
    /// Why the ToUnicode CMap could not be used, if it could not.
    pub to_unicode_error: Option<String>,
}

impl LoadedFont {
    /// Helvetica with WinAnsiEncoding, used when a resource is missing.
    pub fn fallback(base_name: &str) -> Self {
        let std = standard_fonts::fallback();
        Self {
            base_name: base_name.to_string(),
            kind: FontKind::Simple,
            ascent: f64::from(std.ascent),
            descent: f64::from(std.descent),
            widths: (0u32..256).map(|c| (c, std.width(c as u8))).collect(),
            default_width: 0.0,
            encoding: ByteEncoding::default(),
            to_unicode: None,
            to_unicode_error: None,
        }
    }

    /// Load a font dictionary.
    pub fn from_dict(doc: &lopdf::Document, dict: &lopdf::Dictionary) -> Self {
        let base_name = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        let is_type0 = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Type0");

        let (to_unicode, to_unicode_error) = match load_to_unicode(doc, dict) {
            Ok(cmap) => (cmap, None),
            Err(e) => (None, Some(e.to_string())),
        };

        let mut font = if is_type0 {
            load_composite(doc, dict, &base_name)
        } else {
            load_simple(doc, dict, &base_name)
        };
        font.base_name = base_name;
        font.to_unicode = to_unicode;
        font.to_unicode_error = to_unicode_error;
        font
    }

    pub fn has_to_unicode(&self) -> bool {
        self.to_unicode.is_some()
    }

    /// Width of a code in 1/1000 em.
    pub fn width(&self, code: u32) -> f64 {
        self.widths.get(&code).copied().unwrap_or(self.default_width)
    }

    /// Split a shown string into glyphs.
    pub fn decode(&self, bytes: &[u8]) -> Vec<ShownGlyph> {
        match self.kind {
            FontKind::Simple => bytes
                .iter()
                .map(|&b| {
                    let code = u32::from(b);
                    let text = self
                        .unicode_from_cmap(code)
                        .or_else(|| self.encoding.decode(b).map(String::from))
                        .unwrap_or_default();
                    ShownGlyph {
                        code,
                        text,
                        width: self.width(code),
                        is_word_space: b == b' ',
                    }
                })
                .collect(),
            FontKind::Composite => bytes
                .chunks_exact(2)
                .map(|pair| {
                    let code = u32::from(u16::from_be_bytes([pair[0], pair[1]]));
                    let text = self
                        .unicode_from_cmap(code)
                        .or_else(|| char::from_u32(code).filter(|c| !c.is_control()).map(String::from))
                        .unwrap_or_default();
                    ShownGlyph {
                        code,
                        text,
                        width: self.width(code),
                        is_word_space: false,
                    }
                })
                .collect(),
        }
    }

    fn unicode_from_cmap(&self, code: u32) -> Option<String> {
        self.to_unicode
            .as_ref()
            .and_then(|cmap| cmap.lookup(code))
            .map(str::to_string)
    }
}

fn load_to_unicode(
    doc: &lopdf::Document,
    dict: &lopdf::Dictionary,
) -> Result<Option<CMap>, BackendError> {
    let Ok(obj) = dict.get(b"ToUnicode") else {
        return Ok(None);
    };
    let Ok(stream) = resolve_ref(doc, obj).as_stream() else {
        // `/ToUnicode /Identity-H` and similar names carry no table.
        return Ok(None);
    };
    let data = decode_stream(stream)?;
    CMap::parse(&data).map(Some)
}

fn descriptor_metrics(
    doc: &lopdf::Document,
    dict: &lopdf::Dictionary,
    base_name: &str,
) -> (f64, f64) {
    let std = standard_fonts::lookup(strip_subset_prefix(base_name))
        .unwrap_or_else(standard_fonts::fallback);
    let mut ascent = f64::from(std.ascent);
    let mut descent = f64::from(std.descent);
    if let Some(fd) = dict_entry(doc, dict, b"FontDescriptor") {
        if let Some(a) = number(doc, fd, b"Ascent").filter(|a| *a > 0.0) {
            ascent = a;
        }
        if let Some(d) = number(doc, fd, b"Descent").filter(|d| *d <= 0.0) {
            descent = d;
        }
    }
    (ascent, descent)
}

fn number(doc: &lopdf::Document, dict: &lopdf::Dictionary, key: &[u8]) -> Option<f64> {
    let obj = dict.get(key).ok()?;
    object_to_f64(resolve_ref(doc, obj)).ok()
}

fn load_simple(doc: &lopdf::Document, dict: &lopdf::Dictionary, base_name: &str) -> LoadedFont {
    let (ascent, descent) = descriptor_metrics(doc, dict, base_name);

    let mut widths = HashMap::new();
    let first_char = number(doc, dict, b"FirstChar").unwrap_or(0.0) as u32;
    let explicit = dict
        .get(b"Widths")
        .ok()
        .and_then(|o| resolve_ref(doc, o).as_array().ok());
    if let Some(arr) = explicit {
        for (i, w) in arr.iter().enumerate() {
            let Some(code) = u32::try_from(i).ok().and_then(|i| first_char.checked_add(i)) else {
                break;
            };
            if let Ok(w) = object_to_f64(resolve_ref(doc, w)) {
                widths.insert(code, w);
            }
        }
    } else {
        let std = standard_fonts::lookup(strip_subset_prefix(base_name))
            .unwrap_or_else(standard_fonts::fallback);
        widths.extend((0u32..256).map(|c| (c, std.width(c as u8))));
    }
    let default_width = dict_entry(doc, dict, b"FontDescriptor")
        .and_then(|fd| number(doc, fd, b"MissingWidth"))
        .unwrap_or(0.0);

    let encoding = match dict.get(b"Encoding").map(|o| resolve_ref(doc, o)) {
        Ok(lopdf::Object::Name(name)) => {
            ByteEncoding::new(BaseEncoding::from_name(name).unwrap_or(BaseEncoding::WinAnsi))
        }
        Ok(lopdf::Object::Dictionary(enc)) => {
            let base = enc
                .get(b"BaseEncoding")
                .ok()
                .and_then(|o| o.as_name().ok())
                .and_then(BaseEncoding::from_name)
                .unwrap_or(BaseEncoding::Standard);
            let mut table = ByteEncoding::new(base);
            if let Some(diffs) = enc
                .get(b"Differences")
                .ok()
                .and_then(|o| resolve_ref(doc, o).as_array().ok())
            {
                table.apply_differences(diffs);
            }
            table
        }
        _ => ByteEncoding::default(),
    };

    LoadedFont {
        base_name: String::new(),
        kind: FontKind::Simple,
        ascent,
        descent,
        widths,
        default_width,
        encoding,
        to_unicode: None,
        to_unicode_error: None,
    }
}

/// First entry of `/DescendantFonts`.
pub fn descendant_font<'a>(
    doc: &'a lopdf::Document,
    dict: &'a lopdf::Dictionary,
) -> Option<&'a lopdf::Dictionary> {
    let arr = resolve_ref(doc, dict.get(b"DescendantFonts").ok()?)
        .as_array()
        .ok()?;
    resolve_ref(doc, arr.first()?).as_dict().ok()
}

fn load_composite(doc: &lopdf::Document, dict: &lopdf::Dictionary, base_name: &str) -> LoadedFont {
    let descendant = descendant_font(doc, dict);
    let (ascent, descent) = descendant
        .map(|d| descriptor_metrics(doc, d, base_name))
        .unwrap_or_else(|| descriptor_metrics(doc, dict, base_name));
    let default_width = descendant
        .and_then(|d| number(doc, d, b"DW"))
        .unwrap_or(1000.0);
    let widths = descendant
        .and_then(|d| d.get(b"W").ok())
        .and_then(|w| resolve_ref(doc, w).as_array().ok())
        .map(|w| parse_w_array(doc, w))
        .unwrap_or_default();

    LoadedFont {
        base_name: String::new(),
        kind: FontKind::Composite,
        ascent,
        descent,
        widths,
        default_width,
        encoding: ByteEncoding::default(),
        to_unicode: None,
        to_unicode_error: None,
    }
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` and `c_first c_last w` forms.
pub fn parse_w_array(doc: &lopdf::Document, items: &[lopdf::Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < items.len() {
        let Ok(start) = object_to_f64(resolve_ref(doc, &items[i])) else {
            i += 1;
            continue;
        };
        let start = start as u32;
        let Some(next) = items.get(i + 1).map(|o| resolve_ref(doc, o)) else {
            break;
        };
        if let Ok(list) = next.as_array() {
            for (j, w) in list.iter().enumerate() {
                let Some(cid) = u32::try_from(j).ok().and_then(|j| start.checked_add(j)) else {
                    break;
                };
                if let Ok(w) = object_to_f64(resolve_ref(doc, w)) {
                    widths.insert(cid, w);
                }
            }
            i += 2;
        } else if let Ok(end) = object_to_f64(next) {
            if let Some(Ok(w)) = items.get(i + 2).map(|o| object_to_f64(resolve_ref(doc, o))) {
                for cid in start..=(end as u32).min(start.saturating_add(0xFFFF)) {
                    widths.insert(cid, w);
                }
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    widths
}

/// Object id of the embedded TrueType program (`/FontFile2`), looking
/// through `/DescendantFonts` for Type0 fonts.
pub fn embedded_font_file(
    doc: &lopdf::Document,
    dict: &lopdf::Dictionary,
) -> Option<lopdf::ObjectId> {
    let holder = descendant_font(doc, dict).unwrap_or(dict);
    let fd = dict_entry(doc, holder, b"FontDescriptor")?;
    fd.get(b"FontFile2").ok()?.as_reference().ok()
}
