//! Single-byte font encodings.
//!
//! A simple font maps each byte to a character through its base encoding,
//! optionally patched by a `/Differences` array of glyph names.

use encoding_rs::{MACINTOSH, WINDOWS_1252};

/// Base encodings named by `/Encoding` or `/BaseEncoding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseEncoding {
    WinAnsi,
    MacRoman,
    Standard,
}

impl BaseEncoding {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"WinAnsiEncoding" => Some(BaseEncoding::WinAnsi),
            b"MacRomanEncoding" => Some(BaseEncoding::MacRoman),
            b"StandardEncoding" => Some(BaseEncoding::Standard),
            _ => None,
        }
    }
}

fn decode_single(encoding: &'static encoding_rs::Encoding, code: u8) -> Option<char> {
    let bytes = [code];
    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return None;
    }
    text.chars().next()
}

/// Byte → character table of a simple font.
#[derive(Debug, Clone, PartialEq)]
pub struct ByteEncoding {
    table: [Option<char>; 256],
}

impl ByteEncoding {
    pub fn new(base: BaseEncoding) -> Self {
        let mut table = [None; 256];
        for (code, slot) in table.iter_mut().enumerate() {
            let code = code as u8;
            *slot = match base {
                BaseEncoding::WinAnsi => decode_single(WINDOWS_1252, code),
                BaseEncoding::MacRoman => decode_single(MACINTOSH, code),
                BaseEncoding::Standard => match code {
                    0x27 => Some('\u{2019}'),
                    0x60 => Some('\u{2018}'),
                    0x20..=0x7E => Some(char::from(code)),
                    _ => decode_single(WINDOWS_1252, code),
                },
            };
            if code < 0x20 && !matches!(code, b'\t' | b'\n' | b'\r') {
                *slot = None;
            }
        }
        Self { table }
    }

    /// Apply a `/Differences` array: an integer starts a run, each following
    /// name takes the next code.
    pub fn apply_differences(&mut self, differences: &[lopdf::Object]) {
        let mut code: Option<u32> = None;
        for item in differences {
            match item {
                lopdf::Object::Integer(i) => code = u32::try_from(*i).ok(),
                lopdf::Object::Name(name) => {
                    if let Some(c) = code.filter(|c| *c < 256) {
                        let name = String::from_utf8_lossy(name);
                        if let Some(ch) = glyph_name_to_char(&name) {
                            self.table[c as usize] = Some(ch);
                        }
                    }
                    code = code.map(|c| c + 1);
                }
                _ => {}
            }
        }
    }

    pub fn decode(&self, code: u8) -> Option<char> {
        self.table[usize::from(code)]
    }
}

impl Default for ByteEncoding {
    fn default() -> Self {
        Self::new(BaseEncoding::WinAnsi)
    }
}

/// Map an Adobe glyph name to its character.
///
/// Handles `uniXXXX`, `uXXXX[XX]`, single-letter names and a table of
/// common names; suffixes such as `.sc` or `_alt` are ignored.
pub fn glyph_name_to_char(name: &str) -> Option<char> {
    let name = name.split(['.', '_']).next().unwrap_or(name);
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() == 4 {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_ascii_alphabetic() {
            return Some(ch);
        }
    }
    GLYPH_NAMES
        .binary_search_by_key(&name, |&(n, _)| n)
        .ok()
        .map(|i| GLYPH_NAMES[i].1)
}

// Sorted by name for binary search.
static GLYPH_NAMES: &[(&str, char)] = &[
    ("AE", 'Æ'),
    ("Aacute", 'Á'),
    ("Adieresis", 'Ä'),
    ("Agrave", 'À'),
    ("Ccedilla", 'Ç'),
    ("Eacute", 'É'),
    ("Egrave", 'È'),
    ("Euro", '€'),
    ("Ntilde", 'Ñ'),
    ("OE", 'Œ'),
    ("Odieresis", 'Ö'),
    ("Oslash", 'Ø'),
    ("Udieresis", 'Ü'),
    ("aacute", 'á'),
    ("acircumflex", 'â'),
    ("adieresis", 'ä'),
    ("ae", 'æ'),
    ("agrave", 'à'),
    ("ampersand", '&'),
    ("aring", 'å'),
    ("asciicircum", '^'),
    ("asciitilde", '~'),
    ("asterisk", '*'),
    ("at", '@'),
    ("backslash", '\\'),
    ("bar", '|'),
    ("braceleft", '{'),
    ("braceright", '}'),
    ("bracketleft", '['),
    ("bracketright", ']'),
    ("bullet", '•'),
    ("ccedilla", 'ç'),
    ("colon", ':'),
    ("comma", ','),
    ("copyright", '©'),
    ("dagger", '†'),
    ("degree", '°'),
    ("dollar", '$'),
    ("eacute", 'é'),
    ("ecircumflex", 'ê'),
    ("edieresis", 'ë'),
    ("egrave", 'è'),
    ("eight", '8'),
    ("ellipsis", '…'),
    ("emdash", '—'),
    ("endash", '–'),
    ("equal", '='),
    ("exclam", '!'),
    ("exclamdown", '¡'),
    ("fi", 'ﬁ'),
    ("five", '5'),
    ("fl", 'ﬂ'),
    ("four", '4'),
    ("germandbls", 'ß'),
    ("grave", '`'),
    ("greater", '>'),
    ("guillemotleft", '«'),
    ("guillemotright", '»'),
    ("hyphen", '-'),
    ("iacute", 'í'),
    ("icircumflex", 'î'),
    ("idieresis", 'ï'),
    ("less", '<'),
    ("minus", '−'),
    ("nbspace", '\u{00A0}'),
    ("nine", '9'),
    ("ntilde", 'ñ'),
    ("numbersign", '#'),
    ("oacute", 'ó'),
    ("ocircumflex", 'ô'),
    ("odieresis", 'ö'),
    ("oe", 'œ'),
    ("one", '1'),
    ("oslash", 'ø'),
    ("paragraph", '¶'),
    ("parenleft", '('),
    ("parenright", ')'),
    ("percent", '%'),
    ("period", '.'),
    ("periodcentered", '·'),
    ("plus", '+'),
    ("question", '?'),
    ("questiondown", '¿'),
    ("quotedbl", '"'),
    ("quotedblleft", '“'),
    ("quotedblright", '”'),
    ("quoteleft", '‘'),
    ("quoteright", '’'),
    ("quotesingle", '\''),
    ("registered", '®'),
    ("section", '§'),
    ("semicolon", ';'),
    ("seven", '7'),
    ("six", '6'),
    ("slash", '/'),
    ("space", ' '),
    ("sterling", '£'),
    ("three", '3'),
    ("trademark", '™'),
    ("two", '2'),
    ("uacute", 'ú'),
    ("ucircumflex", 'û'),
    ("udieresis", 'ü'),
    ("ugrave", 'ù'),
    ("underscore", '_'),
    ("yen", '¥'),
    ("zero", '0'),
];
