//! Document index configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[retrieval]`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// SQLite chunk store; `~` and `$VARS` are expanded
    pub database: Option<String>,
}

impl RetrievalConfig {
    /// Expanded database path, if configured
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.as_deref().map(|raw| {
            let expanded = shellexpand::full(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            PathBuf::from(expanded)
        })
    }

    pub fn merge(&mut self, other: Self) {
        if other.database.is_some() {
            self.database = other.database;
        }
    }
}
