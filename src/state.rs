//! Application state: reference-table snapshot, prompts, OpenAI client.
//!
//! Everything here is built once at startup and read-only afterwards, so
//! the state is shared as a plain `Arc` without locks. A reference table
//! that fails to load stays `None` and lookups against it resolve to "no
//! textbooks" instead of failing requests.

use std::path::{Path, PathBuf};

use tracing::{error, info, instrument};

use crate::config::{load_prompts_config_from_env, Prompts};
use crate::openai::OpenAI;
use crate::reference::{load_reference_table, ReferenceLibrary, ReferenceTable};

#[derive(Clone)]
pub struct AppState {
    pub library: ReferenceLibrary,
    pub prompts: Prompts,
    pub openai: Option<OpenAI>,
}

impl AppState {
    /// Build state from env: load prompt config, both reference tables,
    /// and the optional OpenAI client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let prompts = load_prompts_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        let data_dir =
            PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".into()));
        let library = ReferenceLibrary {
            kaz: load_table(&data_dir.join("checklist_kaz.csv"), "kaz"),
            rus: load_table(&data_dir.join("checklist_rus.csv"), "rus"),
        };

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "neurolab_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "neurolab_backend", "OpenAI disabled (no OPENAI_API_KEY). Generation requests will fail.");
        }

        Self { library, prompts, openai }
    }
}

fn load_table(path: &Path, language: &str) -> Option<ReferenceTable> {
    match load_reference_table(path) {
        Ok(table) => {
            info!(target: "neurolab_backend", %language, subjects = table.rows.len(), "Startup reference inventory");
            Some(table)
        }
        Err(e) => {
            error!(target: "neurolab_backend", %language, error = %e, "Reference table unavailable; lookups will find no textbooks");
            None
        }
    }
}
