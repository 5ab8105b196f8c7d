//! Name normalization for catalog matching.
//!
//! Every name comparison in the engine goes through [`normalize`]:
//! - Unicode NFD fold, dropping combining marks (é -> e)
//! - Lowercase conversion
//! - Gender/form marker stripping from a fixed suffix table
//! - Whitespace collapsing

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Trailing gender/form markers stripped before matching. Matched against
/// the already-lowercased, fold-normalized name.
const FORM_SUFFIXES: &[&str] = &[
    "♀",
    "♂",
    "-f",
    "-m",
    "(f)",
    "(m)",
    "(female)",
    "(male)",
];

/// Normalize a raw name for matching.
///
/// Idempotent: the output never lowercases, folds, or strips further.
///
/// # Examples
///
/// ```
/// use spawnwatch_notifier::catalog::normalize;
///
/// assert_eq!(normalize("Flabébé"), "flabebe");
/// assert_eq!(normalize("Nidoran♀"), "nidoran");
/// assert_eq!(normalize("  Mr.   Mime "), "mr. mime");
/// ```
pub fn normalize(name: &str) -> String {
    // Unicode NFD fold, dropping combining marks, then lowercase
    let folded: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    // Collapse runs of whitespace
    let mut collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");

    // Strip trailing gender/form markers until none remain, so a doubled
    // marker cannot survive one pass and break idempotence
    loop {
        let len_before = collapsed.len();
        for suffix in FORM_SUFFIXES {
            if let Some(rest) = collapsed.strip_suffix(suffix) {
                collapsed = rest.trim_end().to_string();
            }
        }
        if collapsed.len() == len_before {
            break;
        }
    }

    collapsed
}
