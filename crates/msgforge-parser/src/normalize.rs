//! Name Normalizer: deterministic camelCase identifiers.
//!
//! Tokenizes on non-alphanumeric boundaries and internal case
//! transitions, lowercases the first token, Initial-Caps the rest, and
//! concatenates. Non-ASCII characters are transliterated via NFKD
//! decomposition with combining marks stripped — a Latin approximation
//! table for accented Latin script.

use unicode_normalization::UnicodeNormalization;

/// Unicode combining-diacritical-marks block; stripping these after NFKD
/// decomposition turns e.g. `é` into plain `e`.
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F)
}

fn transliterate(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

fn tokenize(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let lower_or_digit_to_upper = (prev.is_ascii_lowercase() || prev.is_ascii_digit())
                && c.is_ascii_uppercase();
            let acronym_boundary = prev.is_ascii_uppercase()
                && c.is_ascii_uppercase()
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if lower_or_digit_to_upper || acronym_boundary {
                tokens.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Produce the deterministic camelCase identifier for `original`.
#[must_use]
pub fn normalize_name(original: &str) -> String {
    let translit = transliterate(original);
    let tokens = tokenize(&translit);

    let mut out = String::new();
    for (i, tok) in tokens.iter().enumerate() {
        if i == 0 {
            out.push_str(&tok.to_lowercase());
        } else {
            let mut chars = tok.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(&chars.as_str().to_lowercase());
            }
        }
    }
    out
}

/// `Initial-Cap` form of a normalized name, used for generated class
/// names (`normalize_name` output with its first letter capitalized).
#[must_use]
pub fn class_name_for(normalized: &str) -> String {
    let mut chars = normalized.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Tokenization & casing ------------------------------------------

    #[test]
    fn simple_snake_case() {
        assert_eq!(normalize_name("create_application"), "createApplication");
    }

    #[test]
    fn simple_kebab_case() {
        assert_eq!(normalize_name("create-application"), "createApplication");
    }

    #[test]
    fn already_camel_case_is_stable() {
        assert_eq!(normalize_name("createApplication"), "createApplication");
    }

    #[test]
    fn pascal_case_lowercases_first_token() {
        assert_eq!(normalize_name("CreateApplication"), "createApplication");
    }

    #[test]
    fn acronym_boundary_splits_before_trailing_word() {
        assert_eq!(normalize_name("HTTPServer"), "httpServer");
    }

    #[test]
    fn digits_are_kept_as_part_of_tokens() {
        assert_eq!(normalize_name("field2Name"), "field2Name");
    }

    // -- 2. Transliteration -------------------------------------------------

    #[test]
    fn accented_latin_is_transliterated() {
        assert_eq!(normalize_name("direcci\u{00f3}n"), "direccion");
    }

    // -- 3. Class name derivation --------------------------------------------

    #[test]
    fn class_name_capitalizes_first_letter() {
        assert_eq!(class_name_for("createApplication"), "CreateApplication");
    }
}
