//! ToUnicode CMap parsing.
//!
//! Reads `bfchar` and `bfrange` sections of a `/ToUnicode` stream into a
//! code → Unicode table. Destination strings are UTF-16BE; a single code may
//! map to several characters (ligatures).

use std::collections::HashMap;

use crate::error::BackendError;

/// Upper bound on codes expanded from one `bfrange` line.
const MAX_RANGE_SPAN: u32 = 0x1_0000;

/// Code → Unicode table from a ToUnicode CMap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CMap {
    mappings: HashMap<u32, String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Hex(&'a str),
    Open,
    Close,
    Word(&'a str),
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => {
                let start = i + 1;
                let end = text[start..].find('>').map_or(bytes.len(), |e| start + e);
                tokens.push(Token::Hex(&text[start..end]));
                i = end + 1;
            }
            b'[' => {
                tokens.push(Token::Open);
                i += 1;
            }
            b']' => {
                tokens.push(Token::Close);
                i += 1;
            }
            b'%' => {
                while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
                    i += 1;
                }
            }
            c if c.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'<' | b'[' | b']')
                {
                    i += 1;
                }
                tokens.push(Token::Word(&text[start..i]));
            }
        }
    }
    tokens
}

fn hex_code(hex: &str) -> Result<u32, BackendError> {
    let cleaned: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    u32::from_str_radix(&cleaned, 16)
        .map_err(|e| BackendError::Font(format!("invalid CMap code <{hex}>: {e}")))
}

fn utf16_hex(hex: &str) -> Result<String, BackendError> {
    let mut cleaned: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    // One-byte destinations show up in sloppy producers.
    if cleaned.len() == 2 {
        cleaned.insert_str(0, "00");
    }
    if cleaned.len() % 4 != 0 {
        return Err(BackendError::Font(format!(
            "UTF-16BE destination <{hex}> has odd length"
        )));
    }
    let units = cleaned
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            std::str::from_utf8(chunk)
                .ok()
                .and_then(|s| u16::from_str_radix(s, 16).ok())
                .ok_or_else(|| BackendError::Font(format!("invalid UTF-16BE <{hex}>")))
        })
        .collect::<Result<Vec<u16>, _>>()?;
    Ok(String::from_utf16_lossy(&units))
}

/// Increment the last UTF-16 unit of a destination string, as bfrange
/// destinations do for consecutive codes.
fn offset_destination(start: &str, offset: u32) -> Option<String> {
    let mut units: Vec<u16> = start.encode_utf16().collect();
    let last = units.pop()?;
    let shifted = u32::from(last).checked_add(offset)?;
    if let Some(ch) = char::from_u32(shifted) {
        let mut out = String::from_utf16_lossy(&units);
        out.push(ch);
        Some(out)
    } else {
        None
    }
}

impl CMap {
    /// Parse a ToUnicode stream.
    ///
    /// Unknown sections (codespace ranges, CID mappings) are skipped.
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let text = String::from_utf8_lossy(data);
        let tokens = tokenize(&text);
        let mut mappings = HashMap::new();

        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                Token::Word("beginbfchar") => {
                    i += 1;
                    while i + 1 < tokens.len() {
                        match (&tokens[i], &tokens[i + 1]) {
                            (Token::Hex(src), Token::Hex(dst)) => {
                                mappings.insert(hex_code(src)?, utf16_hex(dst)?);
                                i += 2;
                            }
                            _ => break,
                        }
                    }
                }
                Token::Word("beginbfrange") => {
                    i += 1;
                    while i + 2 < tokens.len() {
                        let (Token::Hex(lo), Token::Hex(hi)) = (&tokens[i], &tokens[i + 1]) else {
                            break;
                        };
                        let lo = hex_code(lo)?;
                        let hi = hex_code(hi)?;
                        if hi < lo || hi - lo > MAX_RANGE_SPAN {
                            return Err(BackendError::Font(format!(
                                "bfrange <{lo:X}> <{hi:X}> is not a valid range"
                            )));
                        }
                        match &tokens[i + 2] {
                            Token::Hex(dst) => {
                                let start = utf16_hex(dst)?;
                                for offset in 0..=(hi - lo) {
                                    if let Some(s) = offset_destination(&start, offset) {
                                        mappings.insert(lo + offset, s);
                                    }
                                }
                                i += 3;
                            }
                            Token::Open => {
                                i += 3;
                                let mut code = lo;
                                while i < tokens.len() {
                                    match tokens[i] {
                                        Token::Hex(dst) => {
                                            if code <= hi {
                                                mappings.insert(code, utf16_hex(dst)?);
                                            }
                                            code = code.saturating_add(1);
                                            i += 1;
                                        }
                                        Token::Close => {
                                            i += 1;
                                            break;
                                        }
                                        _ => break,
                                    }
                                }
                            }
                            _ => break,
                        }
                    }
                }
                _ => i += 1,
            }
        }

        Ok(CMap { mappings })
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOILERPLATE: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
";

    fn parse(body: &str) -> CMap {
        CMap::parse(format!("{BOILERPLATE}{body}\nendcmap").as_bytes()).unwrap()
    }

    #[test]
    fn bfchar_maps_single_codes() {
        let cmap = parse("2 beginbfchar\n<0003> <0020>\n<0024> <0041>\nendbfchar");
        assert_eq!(cmap.lookup(3), Some(" "));
        assert_eq!(cmap.lookup(0x24), Some("A"));
        assert_eq!(cmap.len(), 2);
    }

    #[test]
    fn bfchar_ligature_and_surrogate_pair() {
        let cmap = parse("2 beginbfchar\n<01> <00660069>\n<02> <D835DC00>\nendbfchar");
        assert_eq!(cmap.lookup(1), Some("fi"));
        assert_eq!(cmap.lookup(2), Some("\u{1D400}"));
    }

    #[test]
    fn bfrange_with_incrementing_destination() {
        let cmap = parse("1 beginbfrange\n<0041> <0043> <0061>\nendbfrange");
        assert_eq!(cmap.lookup(0x41), Some("a"));
        assert_eq!(cmap.lookup(0x43), Some("c"));
        assert_eq!(cmap.lookup(0x44), None);
    }

    #[test]
    fn bfrange_with_array_destination() {
        let cmap = parse("1 beginbfrange\n<10> <11> [<0058> <0059>]\nendbfrange");
        assert_eq!(cmap.lookup(0x10), Some("X"));
        assert_eq!(cmap.lookup(0x11), Some("Y"));
    }

    #[test]
    fn identity_range_covers_bmp() {
        let cmap = parse("1 beginbfrange\n<0000> <FFFF> <0000>\nendbfrange");
        assert_eq!(cmap.lookup(0x65E5), Some("日"));
        assert_eq!(cmap.lookup(0x48), Some("H"));
    }

    #[test]
    fn several_sections_accumulate() {
        let cmap = parse(
            "1 beginbfchar\n<01> <0041>\nendbfchar\n1 beginbfchar\n<02> <0042>\nendbfchar\n\
             1 beginbfrange\n<03> <04> <0043>\nendbfrange",
        );
        assert_eq!(cmap.len(), 4);
        assert_eq!(cmap.lookup(4), Some("D"));
    }

    #[test]
    fn empty_stream_is_empty_map() {
        let cmap = CMap::parse(b"").unwrap();
        assert!(cmap.is_empty());
    }

    #[test]
    fn inverted_range_is_an_error() {
        let data = b"1 beginbfrange\n<0050> <0040> <0041>\nendbfrange";
        assert!(CMap::parse(data).is_err());
    }
}
