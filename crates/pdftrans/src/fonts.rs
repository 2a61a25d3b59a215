//! Font table and output font resolution.
//!
//! [`FontTable`] lists every font a document declares, keyed by normalized
//! identifier. [`FontResolver`] maps an original font identifier to a font
//! that re-inserted text can be written with: the original embedded
//! TrueType program registered as a Unicode (Identity-H) font, or standard
//! Helvetica when there is no usable program.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use encoding_rs::WINDOWS_1252;
use fontdue::{Font, FontSettings};
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat, dictionary};
use pdftrans_core::{FALLBACK_FONT, font_name_matches, normalize_font_id, strip_subset_prefix};
use pdftrans_parse::font::{descendant_font, embedded_font_file};
use pdftrans_parse::lopdf_backend::{decode_stream, dict_entry, page_resources, resolve_ref};
use pdftrans_parse::standard_fonts::{self, StandardFontData};

/// Form XObjects nested deeper than this are not scanned for fonts.
const MAX_FORM_DEPTH: usize = 10;

/// Ascent of Helvetica, in em.
const HELVETICA_ASCENT: f64 = 0.718;

/// Kind of font program embedded in a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontProgram {
    /// `/FontFile2`; usable for re-insertion.
    TrueType(ObjectId),
    /// `/FontFile` or `/FontFile3`; not re-used.
    Other,
    NotEmbedded,
}

impl FontProgram {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontProgram::TrueType(_) => "TrueType",
            FontProgram::Other => "other",
            FontProgram::NotEmbedded => "none",
        }
    }
}

/// One declared font.
#[derive(Debug, Clone, PartialEq)]
pub struct FontEntry {
    /// Name under `/Resources /Font`, e.g. `F1`.
    pub resource_name: String,
    /// `/BaseFont`, subset tag kept.
    pub base_font: String,
    /// `base_font` without subset tag.
    pub normalized_id: String,
    pub program: FontProgram,
}

/// Every font declared by a document's pages and the forms they draw.
#[derive(Debug, Clone, Default)]
pub struct FontTable {
    entries: Vec<FontEntry>,
    by_id: HashMap<String, usize>,
}

impl FontTable {
    /// Scan the whole document once.
    pub fn build(doc: &lopdf::Document) -> Self {
        let mut table = FontTable::default();
        let mut seen_fonts = HashSet::new();
        let mut seen_forms = HashSet::new();
        for page_id in doc.get_pages().values() {
            if let Ok(resources) = page_resources(doc, *page_id) {
                table.scan_resources(doc, resources, &mut seen_fonts, &mut seen_forms, 0);
            }
        }
        tracing::debug!(fonts = table.entries.len(), "font table built");
        table
    }

    fn scan_resources(
        &mut self,
        doc: &lopdf::Document,
        resources: &Dictionary,
        seen_fonts: &mut HashSet<ObjectId>,
        seen_forms: &mut HashSet<ObjectId>,
        depth: usize,
    ) {
        if let Some(fonts) = dict_entry(doc, resources, b"Font") {
            for (name, obj) in fonts.iter() {
                if let Object::Reference(id) = obj {
                    if !seen_fonts.insert(*id) {
                        continue;
                    }
                }
                if let Ok(dict) = resolve_ref(doc, obj).as_dict() {
                    self.push(FontEntry::read(doc, &String::from_utf8_lossy(name), dict));
                }
            }
        }

        if depth >= MAX_FORM_DEPTH {
            return;
        }
        let Some(xobjects) = dict_entry(doc, resources, b"XObject") else {
            return;
        };
        for obj in xobjects.iter().map(|(_, o)| o) {
            let Object::Reference(id) = obj else {
                continue;
            };
            if !seen_forms.insert(*id) {
                continue;
            }
            let Ok(stream) = doc.get_object(*id).and_then(Object::as_stream) else {
                continue;
            };
            let is_form = stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|n| n == b"Form");
            if let (true, Some(form_resources)) =
                (is_form, dict_entry(doc, &stream.dict, b"Resources"))
            {
                self.scan_resources(doc, form_resources, seen_fonts, seen_forms, depth + 1);
            }
        }
    }

    fn push(&mut self, entry: FontEntry) {
        let index = self.entries.len();
        self.by_id.entry(entry.normalized_id.clone()).or_insert(index);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[FontEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the font declared under an identifier.
    ///
    /// Exact match on the normalized identifier first, then substring match
    /// over base font and resource names, with and without subset tag.
    pub fn lookup(&self, id: &str) -> Option<&FontEntry> {
        let key = normalize_font_id(id);
        if key.is_empty() {
            return None;
        }
        if let Some(&i) = self.by_id.get(&key) {
            return Some(&self.entries[i]);
        }
        self.entries.iter().find(|e| {
            font_name_matches(&e.base_font, id)
                || font_name_matches(&e.base_font, &key)
                || font_name_matches(&e.resource_name, id)
        })
    }
}

impl FontEntry {
    fn read(doc: &lopdf::Document, resource_name: &str, dict: &Dictionary) -> Self {
        let base_font = dict
            .get(b"BaseFont")
            .and_then(Object::as_name)
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        let program = match embedded_font_file(doc, dict) {
            Some(id) => FontProgram::TrueType(id),
            None => {
                let holder = descendant_font(doc, dict).unwrap_or(dict);
                let other = dict_entry(doc, holder, b"FontDescriptor")
                    .is_some_and(|fd| fd.has(b"FontFile") || fd.has(b"FontFile3"));
                if other {
                    FontProgram::Other
                } else {
                    FontProgram::NotEmbedded
                }
            }
        };
        Self {
            resource_name: resource_name.to_string(),
            normalized_id: normalize_font_id(&base_font),
            base_font,
            program,
        }
    }
}

/// Why an embedded program could not be registered.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("font program {0:?} is unreadable: {1}")]
    Unreadable(ObjectId, String),
    #[error("font program {0:?} is not a parseable TrueType font: {1}")]
    Parse(ObjectId, String),
}

enum Metrics {
    Standard(&'static StandardFontData),
    Embedded(Box<Font>),
}

/// A font installed in the output document.
pub struct OutputFont {
    /// Name to use under `/Resources /Font`.
    pub resource_name: String,
    /// The font dictionary object.
    pub font_id: ObjectId,
    pub base_font: String,
    metrics: Metrics,
}

impl OutputFont {
    /// Whether this is the standard Helvetica fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self.metrics, Metrics::Standard(_))
    }

    /// Ascent in em.
    pub fn ascent(&self) -> f64 {
        match &self.metrics {
            Metrics::Standard(_) => HELVETICA_ASCENT,
            Metrics::Embedded(font) => font
                .horizontal_line_metrics(1.0)
                .map(|m| f64::from(m.ascent))
                .filter(|a| *a > 0.0)
                .unwrap_or(HELVETICA_ASCENT),
        }
    }

    /// Rendered width of `text` at `size` points.
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        match &self.metrics {
            Metrics::Standard(data) => {
                win_ansi_bytes(text).iter().map(|&b| data.width(b)).sum::<f64>() / 1000.0 * size
            }
            Metrics::Embedded(font) => text
                .chars()
                .map(|ch| f64::from(font.metrics(ch, 1000.0).advance_width))
                .sum::<f64>()
                / 1000.0
                * size,
        }
    }

    /// Characters of `text` the font cannot show. Whitespace never counts.
    pub fn missing_glyphs(&self, text: &str) -> Vec<char> {
        let mut missing: Vec<char> = text
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .filter(|&ch| match &self.metrics {
                Metrics::Standard(_) => win_ansi_byte(ch).is_none(),
                Metrics::Embedded(font) => {
                    u32::from(ch) > 0xFFFF || font.lookup_glyph_index(ch) == 0
                }
            })
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }

    /// Encode text as a string operand for this font.
    ///
    /// Helvetica gets WinAnsi bytes, with `?` for characters outside the
    /// encoding. Embedded fonts get UTF-16BE code units, which the
    /// registered Identity-H font maps one-to-one onto glyphs.
    pub fn encode(&self, text: &str) -> Object {
        match &self.metrics {
            Metrics::Standard(_) => Object::String(win_ansi_bytes(text), StringFormat::Literal),
            Metrics::Embedded(_) => {
                let bytes = text
                    .encode_utf16()
                    .flat_map(u16::to_be_bytes)
                    .collect::<Vec<u8>>();
                Object::String(bytes, StringFormat::Hexadecimal)
            }
        }
    }
}

impl std::fmt::Debug for OutputFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputFont")
            .field("resource_name", &self.resource_name)
            .field("font_id", &self.font_id)
            .field("base_font", &self.base_font)
            .field("fallback", &self.is_fallback())
            .finish()
    }
}

fn win_ansi_byte(ch: char) -> Option<u8> {
    let mut buf = [0u8; 4];
    let (bytes, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
    match (unmappable, bytes.as_ref()) {
        (false, [b]) => Some(*b),
        _ => None,
    }
}

fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars().map(|ch| win_ansi_byte(ch).unwrap_or(b'?')).collect()
}

/// Memoized original-font → output-font resolution for one document.
///
/// A cache hit never touches the document. A miss registers at most one new
/// font object; embedded programs shared by several identifiers are
/// registered once.
#[derive(Debug, Default)]
pub struct FontResolver {
    cache: HashMap<String, Rc<OutputFont>>,
    by_program: HashMap<ObjectId, Rc<OutputFont>>,
    fallback: Option<Rc<OutputFont>>,
    registrations: usize,
}

impl FontResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of font objects added to the document so far.
    pub fn registrations(&self) -> usize {
        self.registrations
    }

    /// Number of distinct identifiers resolved so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Resolve an original font identifier. Never fails: any problem yields
    /// the Helvetica fallback.
    pub fn resolve(
        &mut self,
        doc: &mut lopdf::Document,
        table: &FontTable,
        id: &str,
    ) -> Rc<OutputFont> {
        if let Some(font) = self.cache.get(id) {
            return Rc::clone(font);
        }

        let program = table.lookup(id).and_then(|entry| match entry.program {
            FontProgram::TrueType(program) => Some((entry.normalized_id.clone(), program)),
            _ => None,
        });
        let font = match program {
            Some((name, program)) => match self.embedded(doc, &name, program) {
                Ok(font) => font,
                Err(e) => {
                    tracing::debug!(font = id, error = %e, "embedded font unusable");
                    self.fallback(doc)
                }
            },
            None => self.fallback(doc),
        };
        self.cache.insert(id.to_string(), Rc::clone(&font));
        font
    }

    /// The standard Helvetica font, registered on first use.
    pub fn fallback(&mut self, doc: &mut lopdf::Document) -> Rc<OutputFont> {
        if let Some(font) = &self.fallback {
            return Rc::clone(font);
        }
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        self.registrations += 1;
        let font = Rc::new(OutputFont {
            resource_name: FALLBACK_FONT.to_string(),
            font_id,
            base_font: "Helvetica".to_string(),
            metrics: Metrics::Standard(standard_fonts::fallback()),
        });
        self.fallback = Some(Rc::clone(&font));
        font
    }

    fn embedded(
        &mut self,
        doc: &mut lopdf::Document,
        name: &str,
        program: ObjectId,
    ) -> Result<Rc<OutputFont>, FontError> {
        if let Some(font) = self.by_program.get(&program) {
            return Ok(Rc::clone(font));
        }
        let bytes = doc
            .get_object(program)
            .and_then(Object::as_stream)
            .map_err(|e| FontError::Unreadable(program, e.to_string()))
            .and_then(|s| {
                decode_stream(s).map_err(|e| FontError::Unreadable(program, e.to_string()))
            })?;
        let parsed = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| FontError::Parse(program, e.to_string()))?;

        let base_font = pdf_font_name(name);
        let font_id = register_type0(doc, &parsed, &base_font, program);
        self.registrations += 1;
        tracing::debug!(font = name, resource = %format!("TF{}", program.0), "registered embedded font");

        let font = Rc::new(OutputFont {
            resource_name: format!("TF{}", program.0),
            font_id,
            base_font,
            metrics: Metrics::Embedded(Box::new(parsed)),
        });
        self.by_program.insert(program, Rc::clone(&font));
        Ok(font)
    }
}

/// A PDF name-safe version of a font name.
fn pdf_font_name(raw: &str) -> String {
    let name: String = strip_subset_prefix(raw)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if name.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        name
    }
}

/// Register a Type0/Identity-H font over an existing TrueType program.
///
/// Codes are UTF-16 code units; `/CIDToGIDMap` sends each BMP code unit to
/// the program's glyph for that character and `/ToUnicode` is the identity.
fn register_type0(
    doc: &mut lopdf::Document,
    font: &Font,
    base_font: &str,
    program: ObjectId,
) -> ObjectId {
    let mut gid_map = vec![0u8; 0x1_0000 * 2];
    let mut widths: Vec<(u32, i64)> = Vec::new();
    for cid in 0u32..=0xFFFF {
        let Some(ch) = char::from_u32(cid) else {
            continue;
        };
        let gid = font.lookup_glyph_index(ch);
        if gid == 0 {
            continue;
        }
        let offset = cid as usize * 2;
        gid_map[offset..offset + 2].copy_from_slice(&gid.to_be_bytes());
        let advance = font.metrics_indexed(gid, 1000.0).advance_width;
        widths.push((cid, advance.round() as i64));
    }

    let line = font.horizontal_line_metrics(1000.0);
    let ascent = line.as_ref().map_or(718, |m| m.ascent.round() as i64);
    let descent = line.as_ref().map_or(-207, |m| m.descent.round() as i64);

    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(base_font.as_bytes().to_vec()),
        "Flags" => Object::Integer(4),
        "FontBBox" => vec![
            Object::Integer(0),
            Object::Integer(descent),
            Object::Integer(1000),
            Object::Integer(ascent),
        ],
        "ItalicAngle" => Object::Integer(0),
        "Ascent" => Object::Integer(ascent),
        "Descent" => Object::Integer(descent),
        "CapHeight" => Object::Integer(ascent),
        "StemV" => Object::Integer(80),
        "FontFile2" => Object::Reference(program),
    });
    let gid_map_id = doc.add_object(Stream::new(dictionary! {}, gid_map));
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => Object::Integer(0),
        },
        "FontDescriptor" => Object::Reference(descriptor_id),
        "DW" => Object::Integer(1000),
        "W" => w_array(&widths),
        "CIDToGIDMap" => Object::Reference(gid_map_id),
    });
    let to_unicode_id = doc.add_object(Stream::new(
        dictionary! {},
        IDENTITY_TO_UNICODE.as_bytes().to_vec(),
    ));
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => Object::Reference(to_unicode_id),
    })
}

/// `/W` array in `c [w1 w2 ...]` form, one run per consecutive CID range.
fn w_array(widths: &[(u32, i64)]) -> Object {
    let mut out = Vec::new();
    let mut run: Vec<Object> = Vec::new();
    let mut run_start = 0u32;
    let mut prev: Option<u32> = None;
    for &(cid, w) in widths {
        if prev.is_some_and(|p| p + 1 != cid) {
            out.push(Object::Integer(i64::from(run_start)));
            out.push(Object::Array(std::mem::take(&mut run)));
        }
        if run.is_empty() {
            run_start = cid;
        }
        run.push(Object::Integer(w));
        prev = Some(cid);
    }
    if !run.is_empty() {
        out.push(Object::Integer(i64::from(run_start)));
        out.push(Object::Array(run));
    }
    Object::Array(out)
}

const IDENTITY_TO_UNICODE: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<0000> <FFFF> <0000>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end";
