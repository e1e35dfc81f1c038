//! Textbook resolution against the reference tables.
//!
//! A cell encodes textbooks as comma-separated fragments; a fragment may
//! hold several `+`-joined co-author tokens. A token is underscore-delimited
//! (subject/grade/track/language/year/author/part-count) and expands into
//! one or more file basenames. Directory and extension are a deployment
//! concern; this module only deals in basenames.

use tracing::{debug, instrument};

use crate::domain::SubjectEntry;
use crate::reference::ReferenceLibrary;

/// Cell values meaning "no textbook assigned for this grade".
const SKIP_VALUES: [&str; 4] = ["", "/", "—", "X"];

/// Placeholder label when a token carries no author surname.
const UNKNOWN_AUTHOR: &str = "Неизвестный автор";

/// Map a grade/track code to its table column: tracks with an `-emn`/`-ogn`
/// suffix map to `{GRADE}_EMN`/`{GRADE}_OGN`, plain grades map to themselves.
pub fn map_grade_to_column(grade: &str) -> String {
  if let Some(base) = grade.strip_suffix("-emn") {
    format!("{}_EMN", base)
  } else if let Some(base) = grade.strip_suffix("-ogn") {
    format!("{}_OGN", base)
  } else {
    grade.to_string()
  }
}

fn should_skip_cell(cell: &str) -> bool {
  SKIP_VALUES.contains(&cell.trim())
}

fn comma_fragments(cell: &str) -> Vec<&str> {
  cell.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn plus_tokens(fragment: &str) -> Vec<&str> {
  fragment.split('+').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Author labels are built as "Surname Year"; strip the year suffix back off
/// before substring matching. A filter without the suffix is used as-is.
fn author_needle(filter: &str) -> String {
  let chars: Vec<char> = filter.chars().collect();
  let n = chars.len();
  let has_year_suffix =
    n > 5 && chars[n - 5] == ' ' && chars[n - 4..].iter().all(|c| c.is_ascii_digit());
  let needle: String = if has_year_suffix {
    chars[..n - 5].iter().collect()
  } else {
    filter.to_string()
  };
  needle.to_lowercase()
}

/// Strip a trailing `_<digits>` group, if any.
fn strip_trailing_number(token: &str) -> &str {
  match token.rfind('_') {
    Some(i) if i + 1 < token.len() && token[i + 1..].chars().all(|c| c.is_ascii_digit()) => {
      &token[..i]
    }
    _ => token,
  }
}

/// Expand one token into its output file basenames.
///
/// The trailing underscore field of a full token is the part count: absent
/// or non-numeric emits the token unchanged, zero emits the base with a
/// trailing `_0` stripped, and N > 0 emits `{base}_1..{base}_N` with the
/// trailing number stripped first. Tokens shorter than the
/// year/author-carrying form cannot hold a part count.
fn expand_token(token: &str) -> Vec<String> {
  let fields: Vec<&str> = token.split('_').collect();
  if fields.len() < 6 {
    return vec![token.to_string()];
  }
  let part_field = fields[fields.len() - 1];

  match part_field.parse::<u32>() {
    Err(_) => vec![token.to_string()],
    Ok(0) => vec![token.strip_suffix("_0").unwrap_or(token).to_string()],
    Ok(n) => {
      let base = strip_trailing_number(token);
      (1..=n).map(|i| format!("{}_{}", base, i)).collect()
    }
  }
}

/// Resolve the ordered textbook file list for a generation request.
///
/// Data absence at any step (unloaded table, unknown subject, sentinel
/// cell) resolves to an empty list, never an error; the prompt builder then
/// falls back to general knowledge. Order is fragment, then token, then
/// part; duplicates are kept.
#[instrument(level = "debug", skip(library), fields(%language, %grade, %subject_code))]
pub fn resolve(
  library: &ReferenceLibrary,
  language: &str,
  grade: &str,
  subject_code: &str,
  author: Option<&str>,
) -> Vec<String> {
  let Some(table) = library.table_for(language) else {
    debug!(target: "generate", %language, "Reference table not loaded; no textbooks");
    return Vec::new();
  };
  let Some(row) = table.find_row(subject_code) else {
    debug!(target: "generate", %subject_code, "Subject code not found; no textbooks");
    return Vec::new();
  };

  let column = map_grade_to_column(grade);
  let cell = row.cells.get(&column).map(String::as_str).unwrap_or("");
  if should_skip_cell(cell) {
    return Vec::new();
  }

  let needle = author.filter(|a| !a.is_empty()).map(author_needle);

  let mut files = Vec::new();
  for fragment in comma_fragments(cell) {
    for token in plus_tokens(fragment) {
      if let Some(needle) = &needle {
        if !token.to_lowercase().contains(needle.as_str()) {
          continue;
        }
      }
      files.extend(expand_token(token));
    }
  }
  debug!(target: "generate", count = files.len(), "Textbooks resolved");
  files
}

/// Subjects available for a language/grade pair: rows whose cell for that
/// grade column is not a skip sentinel.
pub fn available_subjects(library: &ReferenceLibrary, language: &str, grade: &str) -> Vec<SubjectEntry> {
  let Some(table) = library.table_for(language) else {
    return Vec::new();
  };
  let column = map_grade_to_column(grade);
  table
    .rows
    .iter()
    .filter(|row| !should_skip_cell(row.cells.get(&column).map(String::as_str).unwrap_or("")))
    .map(|row| SubjectEntry { code: row.code.clone(), name: row.name.clone() })
    .collect()
}

fn author_label(token: &str) -> String {
  let fields: Vec<&str> = token.split('_').collect();
  let year = fields.get(4).copied().unwrap_or("").trim();
  let author = fields.get(5).copied().unwrap_or("").trim();
  let author = if author.is_empty() { UNKNOWN_AUTHOR } else { author };
  if year.is_empty() {
    author.to_string()
  } else {
    format!("{} {}", author, year)
  }
}

/// Author labels for a language/grade/subject triple, one per fragment.
/// Co-author tokens are joined with " + " (e.g. "Иванов 2020 + Петров 2020").
pub fn authors_for(
  library: &ReferenceLibrary,
  language: &str,
  grade: &str,
  subject_code: &str,
) -> Vec<String> {
  let Some(table) = library.table_for(language) else {
    return Vec::new();
  };
  let Some(row) = table.find_row(subject_code) else {
    return Vec::new();
  };

  let column = map_grade_to_column(grade);
  let cell = row.cells.get(&column).map(String::as_str).unwrap_or("");
  if should_skip_cell(cell) {
    return Vec::new();
  }

  comma_fragments(cell)
    .iter()
    .map(|fragment| {
      plus_tokens(fragment)
        .iter()
        .map(|token| author_label(token))
        .collect::<Vec<_>>()
        .join(" + ")
    })
    .collect()
}
