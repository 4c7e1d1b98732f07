//! Drill-down state machine.
//!
//! The only state is the base taxonomy and the breadcrumb path. Everything
//! else (active taxonomy, constraint, depth) is derived from it by
//! [`derive_drill_context`], so the controller never holds stale values.
//!
//! The first path entry with three or more segments is the pivot: entries up
//! to and including it belong to the base taxonomy, entries after it to the
//! opposite one, and the pivot code becomes a constraint on the base taxonomy.

use crate::aggregator::AggregateOptions;
use crate::codes::{depth_of, has_prefix, is_supported_depth, normalize, CHAPTER_DEPTH, ITEM_DEPTH};
use crate::exclusions::ExclusionOptions;
use crate::filters::ItemScope;
use crate::labels::{resolve_breadcrumb_label, ClassificationOracle};
use crate::schema::{BreadcrumbEntry, Constraint, DrillDownConfig, Exclusions, LineItem, Taxonomy};
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillContext {
    pub base_taxonomy: Taxonomy,
    pub pivot_index: Option<usize>,
    pub active_taxonomy: Taxonomy,
    /// Path entries after the pivot. Empty when not pivoted.
    pub effective_path: Vec<String>,
    pub constraint: Option<Constraint>,
    /// Depth shown with no drill step in the active taxonomy.
    pub root_depth: u8,
    /// Code the active taxonomy is currently drilled into, if any.
    pub path_code: Option<String>,
    /// Depth to request from the aggregator.
    pub depth: u8,
}

impl DrillContext {
    pub fn is_pivoted(&self) -> bool {
        self.pivot_index.is_some()
    }

    /// False once the derived depth is past item level.
    pub fn can_drill(&self) -> bool {
        is_supported_depth(self.depth)
    }

    pub fn aggregate_options(&self, exclusions: &Exclusions) -> AggregateOptions {
        AggregateOptions {
            constraint: self.constraint.clone(),
            path_code: self.path_code.clone(),
            exclusions: exclusions.clone(),
        }
    }

    pub fn exclusion_options(&self) -> ExclusionOptions {
        ExclusionOptions {
            constraint: self.constraint.clone(),
            path_code: self.path_code.clone(),
            taxonomy: Some(self.active_taxonomy),
        }
    }

    pub fn scope(&self, exclusions: &Exclusions) -> ItemScope {
        ItemScope::new(self.active_taxonomy, self.depth)
            .with_constraint(self.constraint.as_ref())
            .with_path_code(self.path_code.as_deref())
            .with_exclusions(exclusions)
    }
}

pub fn pivot_index(path: &[String]) -> Option<usize> {
    path.iter().position(|code| depth_of(code) >= ITEM_DEPTH)
}

/// Derives every value the aggregator needs from `(base_taxonomy, path)`.
pub fn derive_drill_context(base_taxonomy: Taxonomy, path: &[String], root_depth: u8) -> DrillContext {
    let pivot = pivot_index(path);

    let (active_taxonomy, effective_path, constraint, effective_root) = match pivot {
        Some(i) => (
            base_taxonomy.opposite(),
            path[i + 1..].to_vec(),
            Some(Constraint {
                taxonomy: base_taxonomy,
                code: path[i].clone(),
            }),
            CHAPTER_DEPTH,
        ),
        None => (base_taxonomy, Vec::new(), None, root_depth),
    };

    let drill_path: &[String] = if pivot.is_some() { &effective_path } else { path };
    let path_code = drill_path.last().cloned();
    let depth = match &path_code {
        Some(code) => (depth_of(code) + 2).max(effective_root),
        None => effective_root,
    };

    DrillContext {
        base_taxonomy,
        pivot_index: pivot,
        active_taxonomy,
        effective_path,
        constraint,
        root_depth: effective_root,
        path_code,
        depth,
    }
}

/// Dry run: would `candidate_path` show at least one group?
pub fn can_advance(
    items: &[LineItem],
    base_taxonomy: Taxonomy,
    candidate_path: &[String],
    root_depth: u8,
    exclusions: &Exclusions,
) -> bool {
    let context = derive_drill_context(base_taxonomy, candidate_path, root_depth);
    if !context.can_drill() {
        return false;
    }
    context.scope(exclusions).has_any_group(items)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillDownController {
    base_taxonomy: Taxonomy,
    path: Vec<String>,
    root_depth: u8,
}

impl DrillDownController {
    pub fn new(base_taxonomy: Taxonomy, root_depth: u8) -> Self {
        Self {
            base_taxonomy,
            path: Vec::new(),
            root_depth,
        }
    }

    pub fn from_config(config: &DrillDownConfig) -> Self {
        Self::new(config.base_taxonomy, config.root_depth)
    }

    pub fn base_taxonomy(&self) -> Taxonomy {
        self.base_taxonomy
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn root_depth(&self) -> u8 {
        self.root_depth
    }

    pub fn context(&self) -> DrillContext {
        derive_drill_context(self.base_taxonomy, &self.path, self.root_depth)
    }

    pub fn select_base_taxonomy(&mut self, taxonomy: Taxonomy) {
        self.base_taxonomy = taxonomy;
        self.path.clear();
    }

    pub fn reset(&mut self) {
        self.path.clear();
    }

    /// Appends `code` to the path. Returns `false` and leaves the path
    /// untouched when the step is a no-op, does not descend below the
    /// current level, or would show no groups.
    ///
    /// A step descends when `code` is at least as deep as the groups on
    /// screen and, once the active taxonomy has a path entry, lies under that
    /// entry on whole segments.
    pub fn drill_into(&mut self, code: &str, items: &[LineItem], exclusions: &Exclusions) -> bool {
        let code = normalize(Some(code));
        if code.is_empty() {
            debug!("Rejected drill step: code is not classifiable");
            return false;
        }
        if self.path.last() == Some(&code) {
            debug!("Rejected drill step into {}: already the current level", code);
            return false;
        }

        let context = self.context();
        if depth_of(&code) < context.depth {
            debug!(
                "Rejected drill step into {}: shallower than the current depth {}",
                code, context.depth
            );
            return false;
        }
        if let Some(parent) = &context.path_code {
            if !has_prefix(&code, parent) {
                debug!("Rejected drill step into {}: not under {}", code, parent);
                return false;
            }
        }

        let mut candidate = self.path.clone();
        candidate.push(code);

        self.commit(candidate, items, exclusions)
    }

    /// Truncates the path to the clicked entry, or empties it when `code` is
    /// `None`. With an `index`, the entry at that position must carry `code`.
    pub fn click_breadcrumb(
        &mut self,
        code: Option<&str>,
        index: Option<usize>,
        items: &[LineItem],
        exclusions: &Exclusions,
    ) -> bool {
        let keep = match code {
            None => 0,
            Some(code) => {
                let code = normalize(Some(code));
                let position = match index {
                    Some(i) => (self.path.get(i) == Some(&code)).then_some(i),
                    None => self.path.iter().position(|entry| *entry == code),
                };
                match position {
                    Some(i) => i + 1,
                    None => {
                        debug!("Rejected breadcrumb {}: not on the current path", code);
                        return false;
                    }
                }
            }
        };

        if keep == self.path.len() {
            return false;
        }

        let candidate = self.path[..keep].to_vec();
        self.commit(candidate, items, exclusions)
    }

    fn commit(&mut self, candidate: Vec<String>, items: &[LineItem], exclusions: &Exclusions) -> bool {
        if !can_advance(items, self.base_taxonomy, &candidate, self.root_depth, exclusions) {
            debug!("Rejected navigation to {:?}: no groups at that level", candidate);
            return false;
        }

        self.path = candidate;
        true
    }

    /// One entry per path step, tagged with the taxonomy active when it was taken.
    pub fn breadcrumbs(&self, items: &[LineItem], oracle: &dyn ClassificationOracle) -> Vec<BreadcrumbEntry> {
        let pivot = pivot_index(&self.path);

        self.path
            .iter()
            .enumerate()
            .map(|(i, code)| {
                let taxonomy = match pivot {
                    Some(p) if i > p => self.base_taxonomy.opposite(),
                    _ => self.base_taxonomy,
                };
                BreadcrumbEntry {
                    code: code.clone(),
                    label: resolve_breadcrumb_label(oracle, taxonomy, code, items),
                    taxonomy,
                }
            })
            .collect()
    }
}
