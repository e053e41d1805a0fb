use std::collections::HashSet;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::Delimiter;

pub const LABEL_SEPARATOR: char = '_';

/// Turns free header text into a stable key: diacritics stripped, lower-cased,
/// words joined with `_` (`"LOCAL DE REALIZAÇÃO"` becomes `local_de_realizacao`).
pub fn normalize_label(label: &str) -> String {
    let folded: String = label
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .map(|ch| if ch == '\u{a0}' { ' ' } else { ch })
        .collect::<String>()
        .to_lowercase();

    let mut key = String::with_capacity(folded.len());
    for word in folded.split_whitespace() {
        if !key.is_empty() {
            key.push(LABEL_SEPARATOR);
        }
        key.push_str(word);
    }
    key
}

/// Picks `;` or `,` by frequency on the first non-blank line. Ties go to `;`.
pub fn detect_delimiter(text: &str) -> Delimiter {
    let first_line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();

    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();

    if commas > semicolons {
        Delimiter::Comma
    } else {
        Delimiter::Semicolon
    }
}

/// Index of the first record containing one of `required` (already normalized)
/// among its normalized cells, scanning at most `search_rows` records.
pub fn find_header_row(
    records: &[Vec<String>],
    required: &[String],
    search_rows: usize,
) -> Option<usize> {
    records.iter().take(search_rows).position(|record| {
        record
            .iter()
            .map(|cell| normalize_label(cell))
            .any(|key| required.iter().any(|expected| *expected == key))
    })
}

/// Normalizes every header cell and suffixes repeats (`orgao`, `orgao_2`, ...).
/// Returns the unique keys and the keys that had to be renamed.
pub fn normalize_header(labels: &[String]) -> (Vec<String>, Vec<String>) {
    let mut seen: HashSet<String> = HashSet::with_capacity(labels.len());
    let mut columns = Vec::with_capacity(labels.len());
    let mut renamed = Vec::new();

    for (idx, label) in labels.iter().enumerate() {
        let mut key = normalize_label(label);
        if key.is_empty() {
            key = format!("column{LABEL_SEPARATOR}{}", idx + 1);
        }

        if seen.contains(&key) {
            let mut suffix = 2;
            let mut candidate = format!("{key}{LABEL_SEPARATOR}{suffix}");
            while seen.contains(&candidate) {
                suffix += 1;
                candidate = format!("{key}{LABEL_SEPARATOR}{suffix}");
            }
            renamed.push(candidate.clone());
            key = candidate;
        }

        seen.insert(key.clone());
        columns.push(key);
    }

    (columns, renamed)
}
