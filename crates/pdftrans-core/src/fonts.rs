//! Font identifier normalization.
//!
//! Subset-embedded fonts carry a six-letter tag (`ABCDEF+`) in front of the
//! real base font name. Identifiers are compared with that tag removed.

/// Strip a subset tag (six uppercase ASCII letters followed by `+`).
///
/// ```
/// use pdftrans_core::strip_subset_prefix;
/// assert_eq!(strip_subset_prefix("ABCDEF+ArialMT"), "ArialMT");
/// assert_eq!(strip_subset_prefix("ArialMT"), "ArialMT");
/// ```
pub fn strip_subset_prefix(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() > 7 && bytes[6] == b'+' && bytes[..6].iter().all(u8::is_ascii_uppercase) {
        &name[7..]
    } else {
        name
    }
}

/// Normalized lookup key for a font identifier.
///
/// Strips the subset tag and a leading `/`, and trims whitespace.
pub fn normalize_font_id(id: &str) -> String {
    let trimmed = id.trim().trim_start_matches('/');
    strip_subset_prefix(trimmed).to_string()
}

/// Whether a declared font name matches a requested identifier.
///
/// Matching is substring-based: the declared name must contain the
/// identifier, either as given or with its subset tag removed.
pub fn font_name_matches(declared: &str, id: &str) -> bool {
    let id = id.trim();
    if id.is_empty() {
        return false;
    }
    declared.contains(id) || declared.contains(strip_subset_prefix(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_six_letter_tag() {
        assert_eq!(strip_subset_prefix("BCDFEE+Calibri-Bold"), "Calibri-Bold");
    }

    #[test]
    fn keeps_names_without_tag() {
        assert_eq!(strip_subset_prefix("Helvetica"), "Helvetica");
        assert_eq!(strip_subset_prefix("abcdef+Arial"), "abcdef+Arial");
        assert_eq!(strip_subset_prefix("ABCDE+Arial"), "ABCDE+Arial");
        assert_eq!(strip_subset_prefix("ABCDEF+"), "ABCDEF+");
    }

    #[test]
    fn tag_must_be_at_start() {
        assert_eq!(strip_subset_prefix("Arial+ABCDEF"), "Arial+ABCDEF");
    }

    #[test]
    fn normalize_trims_and_strips() {
        assert_eq!(normalize_font_id(" /ABCDEF+Times-Roman "), "Times-Roman");
        assert_eq!(normalize_font_id("helv"), "helv");
    }

    #[test]
    fn matching_uses_stripped_identifier() {
        assert!(font_name_matches("XYZABC+ArialMT", "ABCDEF+ArialMT"));
        assert!(font_name_matches("ArialMT", "Arial"));
        assert!(!font_name_matches("Helvetica", "Arial"));
        assert!(!font_name_matches("Helvetica", ""));
    }
}
