//! URL-safe slugs for catalog entries.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

fn non_alnum() -> &'static Regex {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"))
}

/// Lowercases, folds common accented letters, and collapses everything else to `-`.
pub fn slugify(text: &str) -> String {
    let folded: String = text.chars().flat_map(char::to_lowercase).map(fold_accent).collect();
    non_alnum()
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

/// Builds the slug for a new entry from its name and code.
///
/// A blank code falls back to the creation timestamp so two entries with the
/// same name still get distinct slugs.
pub fn generate_slug(name: &str, code: &str, created_at: DateTime<Utc>) -> String {
    let suffix = if code.trim().is_empty() {
        created_at.timestamp_millis().to_string()
    } else {
        code.to_string()
    };
    slugify(&format!("{name} {suffix}"))
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Charizard ex 125/197"), "charizard-ex-125-197");
        assert_eq!(slugify("  Pokémon -- Coleção! "), "pokemon-colecao");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_generate_slug_uses_code() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(generate_slug("Black Lotus", "LEA-232", at), "black-lotus-lea-232");
    }

    #[test]
    fn test_generate_slug_falls_back_to_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            generate_slug("Booster Box", " ", at),
            format!("booster-box-{}", at.timestamp_millis())
        );
    }
}
