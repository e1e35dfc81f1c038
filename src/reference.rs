//! Reference-table loading: the per-language textbook checklists.
//!
//! Each table is a semicolon-delimited text file with a header row. The
//! `Код` and `Предмет` columns identify the subject; every other column is
//! a grade/track (e.g. `9`, `10_EMN`) holding an encoded cell value.
//! Tables are loaded once at startup and never mutated afterwards.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

pub const CODE_COLUMN: &str = "Код";
pub const NAME_COLUMN: &str = "Предмет";

/// One subject row: code, display name, and the per-grade cells.
#[derive(Clone, Debug)]
pub struct ReferenceRow {
    pub code: String,
    pub name: String,
    pub cells: HashMap<String, String>,
}

/// An immutable reference table for one instruction language.
#[derive(Clone, Debug, Default)]
pub struct ReferenceTable {
    pub rows: Vec<ReferenceRow>,
}

impl ReferenceTable {
    /// Linear scan by subject code; tables hold tens of rows.
    pub fn find_row(&self, code: &str) -> Option<&ReferenceRow> {
        self.rows.iter().find(|r| r.code == code)
    }
}

/// Snapshot of both language tables, built once at startup and passed by
/// reference into the resolver. A table that failed to load stays `None`;
/// lookups against it resolve to "no textbooks" rather than an error.
#[derive(Clone, Debug, Default)]
pub struct ReferenceLibrary {
    pub kaz: Option<ReferenceTable>,
    pub rus: Option<ReferenceTable>,
}

impl ReferenceLibrary {
    /// `kaz` selects the Kazakh table; every other language uses the
    /// Russian one.
    pub fn table_for(&self, language: &str) -> Option<&ReferenceTable> {
        if language == "kaz" {
            self.kaz.as_ref()
        } else {
            self.rus.as_ref()
        }
    }
}

/// Parse a reference table from raw file content.
///
/// Tolerates a UTF-8 BOM and mixed line endings. Rows whose field count
/// does not match the header, and rows without a subject code, are dropped
/// with a warning instead of failing the whole load.
pub fn parse_reference_table(content: &str) -> ReferenceTable {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let content = content.replace("\r\n", "\n").replace('\r', "\n");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(|v| v.trim().to_string()).collect(),
        Err(e) => {
            warn!(target: "neurolab_backend", error = %e, "Reference table has no readable header row");
            return ReferenceTable::default();
        }
    };

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "neurolab_backend", row = idx + 1, error = %e, "Dropping malformed reference row");
                continue;
            }
        };
        let values: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }

        let mut code = String::new();
        let mut name = String::new();
        let mut cells = HashMap::new();
        for (header, value) in headers.iter().zip(values) {
            match header.as_str() {
                CODE_COLUMN => code = value,
                NAME_COLUMN => name = value,
                _ => {
                    cells.insert(header.clone(), value);
                }
            }
        }
        if code.is_empty() {
            warn!(target: "neurolab_backend", row = idx + 1, "Dropping reference row without a subject code");
            continue;
        }
        rows.push(ReferenceRow { code, name, cells });
    }

    ReferenceTable { rows }
}

/// Read and parse a table from disk.
pub fn load_reference_table(path: &Path) -> Result<ReferenceTable, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let table = parse_reference_table(&content);
    info!(target: "neurolab_backend", path = %path.display(), rows = table.rows.len(), "Reference table loaded");
    Ok(table)
}
