use crate::codes::{normalize, segment_count, ITEM_DEPTH};
use crate::error::Result;
use crate::schema::{LineItem, Taxonomy};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only lookup of published classification names.
pub trait ClassificationOracle {
    fn lookup_name(&self, taxonomy: Taxonomy, code: &str) -> Option<String>;
}

impl<F> ClassificationOracle for F
where
    F: Fn(Taxonomy, &str) -> Option<String>,
{
    fn lookup_name(&self, taxonomy: Taxonomy, code: &str) -> Option<String> {
        self(taxonomy, code)
    }
}

/// Oracle that knows no names; every label falls back to the code.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClassificationNames;

impl ClassificationOracle for NoClassificationNames {
    fn lookup_name(&self, _taxonomy: Taxonomy, _code: &str) -> Option<String> {
        None
    }
}

/// Name tables keyed by normalized code, one per taxonomy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticClassificationTable {
    #[serde(default)]
    pub functional: BTreeMap<String, String>,
    #[serde(default)]
    pub economic: BTreeMap<String, String>,
}

impl StaticClassificationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, taxonomy: Taxonomy, code: &str, name: &str) {
        let table = match taxonomy {
            Taxonomy::Functional => &mut self.functional,
            Taxonomy::Economic => &mut self.economic,
        };
        table.insert(normalize(Some(code)), name.to_string());
    }

    #[must_use]
    pub fn with(mut self, taxonomy: Taxonomy, code: &str, name: &str) -> Self {
        self.insert(taxonomy, code, name);
        self
    }

    /// Parses `{"functional": {...}, "economic": {...}}`. Keys are normalized.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Self = serde_json::from_str(json)?;
        let mut table = Self::new();
        for (code, name) in &raw.functional {
            table.insert(Taxonomy::Functional, code, name);
        }
        for (code, name) in &raw.economic {
            table.insert(Taxonomy::Economic, code, name);
        }

        if table.is_empty() {
            warn!("Classification table is empty; labels will fall back to codes");
        } else {
            debug!("Loaded {} classification names", table.len());
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.functional.len() + self.economic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClassificationOracle for StaticClassificationTable {
    fn lookup_name(&self, taxonomy: Taxonomy, code: &str) -> Option<String> {
        let table = match taxonomy {
            Taxonomy::Functional => &self.functional,
            Taxonomy::Economic => &self.economic,
        };
        table.get(code).cloned()
    }
}

fn non_blank(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.trim().is_empty())
}

/// Label for a group code.
///
/// At item depth the data source's own name wins; otherwise the oracle is
/// consulted, and the code itself is the last resort.
pub fn resolve_label(
    oracle: &dyn ClassificationOracle,
    taxonomy: Taxonomy,
    code: &str,
    depth: u8,
    fallback_name: Option<&str>,
) -> String {
    if depth == ITEM_DEPTH {
        if let Some(name) = non_blank(fallback_name) {
            return name.to_string();
        }
    }

    oracle
        .lookup_name(taxonomy, code)
        .unwrap_or_else(|| code.to_string())
}

/// Label for a breadcrumb step. Item-level codes take the name of the first
/// item whose code matches exactly.
pub fn resolve_breadcrumb_label(
    oracle: &dyn ClassificationOracle,
    taxonomy: Taxonomy,
    code: &str,
    items: &[LineItem],
) -> String {
    let normalized = normalize(Some(code));

    if segment_count(&normalized) >= 3 {
        let from_items = items.iter().find_map(|item| {
            if normalize(item.code(taxonomy)) == normalized {
                non_blank(item.name(taxonomy))
            } else {
                None
            }
        });
        if let Some(name) = from_items {
            return name.to_string();
        }
    }

    oracle
        .lookup_name(taxonomy, &normalized)
        .unwrap_or(normalized)
}
