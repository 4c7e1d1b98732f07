//! The single filtering pass behind aggregation, exclusion totals and the
//! controller's dry run.
//!
//! Filter order per item:
//! 1. exclusion prefixes (either taxonomy)
//! 2. cross-taxonomy constraint
//! 3. drill path prefix in the active taxonomy
//! 4. group code at the requested depth, which must be non-empty and must
//!    differ from the path code

use crate::codes::{group_code, has_prefix, normalize};
use crate::schema::{Constraint, Exclusions, LineItem, Taxonomy};

/// Both codes of an item after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCodes {
    pub functional: String,
    pub economic: String,
}

impl NormalizedCodes {
    pub fn of(item: &LineItem) -> Self {
        Self {
            functional: normalize(item.functional_code.as_deref()),
            economic: normalize(item.economic_code.as_deref()),
        }
    }

    pub fn get(&self, taxonomy: Taxonomy) -> &str {
        match taxonomy {
            Taxonomy::Functional => &self.functional,
            Taxonomy::Economic => &self.economic,
        }
    }
}

fn normalize_prefixes(prefixes: &[String]) -> Vec<String> {
    prefixes
        .iter()
        .map(|p| normalize(Some(p)))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Everything that decides whether an item lands in a group.
#[derive(Debug, Clone)]
pub struct ItemScope {
    pub taxonomy: Taxonomy,
    pub depth: u8,
    constraint: Option<Constraint>,
    path_code: Option<String>,
    excluded_economic: Vec<String>,
    excluded_functional: Vec<String>,
}

impl ItemScope {
    pub fn new(taxonomy: Taxonomy, depth: u8) -> Self {
        Self {
            taxonomy,
            depth,
            constraint: None,
            path_code: None,
            excluded_economic: Vec::new(),
            excluded_functional: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: Option<&Constraint>) -> Self {
        self.constraint = constraint
            .map(|c| Constraint {
                taxonomy: c.taxonomy,
                code: normalize(Some(&c.code)),
            })
            .filter(|c| !c.code.is_empty());
        self
    }

    #[must_use]
    pub fn with_path_code(mut self, path_code: Option<&str>) -> Self {
        self.path_code = path_code
            .map(|p| normalize(Some(p)))
            .filter(|p| !p.is_empty());
        self
    }

    #[must_use]
    pub fn with_exclusions(mut self, exclusions: &Exclusions) -> Self {
        self.excluded_economic = normalize_prefixes(&exclusions.economic);
        self.excluded_functional = normalize_prefixes(&exclusions.functional);
        self
    }

    pub fn path_code(&self) -> Option<&str> {
        self.path_code.as_deref()
    }

    pub fn is_excluded(&self, codes: &NormalizedCodes) -> bool {
        self.excluded_economic
            .iter()
            .any(|p| has_prefix(&codes.economic, p))
            || self
                .excluded_functional
                .iter()
                .any(|p| has_prefix(&codes.functional, p))
    }

    /// Constraint and path filters only. Exclusions are not consulted.
    pub fn in_scope(&self, codes: &NormalizedCodes) -> bool {
        if let Some(constraint) = &self.constraint {
            if !has_prefix(codes.get(constraint.taxonomy), &constraint.code) {
                return false;
            }
        }

        if let Some(path_code) = &self.path_code {
            if !has_prefix(codes.get(self.taxonomy), path_code) {
                return false;
            }
        }

        true
    }

    /// Group code the item contributes to, or `None` if any filter drops it.
    pub fn group_for(&self, codes: &NormalizedCodes) -> Option<String> {
        if self.is_excluded(codes) || !self.in_scope(codes) {
            return None;
        }

        let code = group_code(codes.get(self.taxonomy), self.depth);
        if code.is_empty() {
            return None;
        }

        if self.path_code.as_deref() == Some(code.as_str()) {
            return None;
        }

        Some(code)
    }

    /// True as soon as one item would land in a group. Short-circuits.
    pub fn has_any_group(&self, items: &[LineItem]) -> bool {
        items
            .iter()
            .any(|item| self.group_for(&NormalizedCodes::of(item)).is_some())
    }
}
