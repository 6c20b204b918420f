//! People registry and query routing.
//!
//! The registry lists every person with their aliases, plus an optional
//! `default_student` used when a query names nobody:
//!
//! ```json
//! {
//!   "default_student": "Ana",
//!   "people": [
//!     { "name": "Ana", "aliases": ["ana", "ana perez"] },
//!     { "name": "Luis", "aliases": ["lucho"] }
//!   ]
//! }
//! ```
//!
//! Routing is a case-insensitive substring scan: a person is selected when
//! their name or any alias appears anywhere in the query.

use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{RagError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub default_student: Option<String>,
    #[serde(default)]
    pub people: Vec<Person>,
}

impl Registry {
    pub fn from_json(content: &str) -> Result<Self> {
        let registry: Registry = serde_json::from_str(content)
            .map_err(|e| RagError::Config(format!("invalid registry: {}", e)))?;
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<()> {
        if self.people.is_empty() {
            return Err(RagError::Config(
                "registry lists no people".to_string(),
            ));
        }
        if let Some(person) = self.people.iter().find(|p| p.name.trim().is_empty()) {
            return Err(RagError::Config(format!(
                "registry entry with empty name (aliases: {:?})",
                person.aliases
            )));
        }
        if let Some(default) = &self.default_student {
            if !self.people.iter().any(|p| &p.name == default) {
                warn!(default = %default, "default_student is not a registered person");
            }
        }
        Ok(())
    }

    /// Registered names in file order.
    pub fn names(&self) -> Vec<&str> {
        self.people.iter().map(|p| p.name.as_str()).collect()
    }

    /// `default_student` if set, else the first registered person.
    pub fn default_entity(&self) -> Result<&str> {
        self.default_student
            .as_deref()
            .or_else(|| self.people.first().map(|p| p.name.as_str()))
            .ok_or_else(|| RagError::Config("registry lists no people".to_string()))
    }

    /// People mentioned in `query`, in registry order without duplicates.
    /// Falls back to the default person when nobody matches.
    pub fn resolve_entities(&self, query: &str) -> Result<Vec<String>> {
        let query = query.to_lowercase();
        let mut selected: Vec<String> = Vec::new();

        for person in &self.people {
            let mentioned = std::iter::once(&person.name)
                .chain(person.aliases.iter())
                .map(|term| term.trim().to_lowercase())
                .filter(|term| !term.is_empty())
                .any(|term| query.contains(&term));
            if mentioned && !selected.contains(&person.name) {
                selected.push(person.name.clone());
            }
        }

        if selected.is_empty() {
            selected.push(self.default_entity()?.to_string());
        }
        debug!(entities = ?selected, "resolved query");
        Ok(selected)
    }
}

/// Read the registry file at `path`.
pub fn load_registry(path: &Path) -> Result<Registry> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RagError::Config(format!(
            "cannot read people registry {}: {}",
            path.display(),
            e
        ))
    })?;
    Registry::from_json(&content)
}
