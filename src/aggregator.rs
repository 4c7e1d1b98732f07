use crate::codes::SUBCHAPTER_DEPTH;
use crate::filters::{ItemScope, NormalizedCodes};
use crate::labels::{resolve_label, ClassificationOracle};
use crate::schema::{Constraint, Exclusions, Group, LineItem, Taxonomy};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default size of the compact summary.
pub const DEFAULT_TOP_N: usize = 7;

#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    pub constraint: Option<Constraint>,
    pub path_code: Option<String>,
    pub exclusions: Exclusions,
}

impl AggregateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    #[must_use]
    pub fn with_path_code(mut self, path_code: &str) -> Self {
        self.path_code = Some(path_code.to_string());
        self
    }

    #[must_use]
    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub(crate) fn scope(&self, taxonomy: Taxonomy, depth: u8) -> ItemScope {
        ItemScope::new(taxonomy, depth)
            .with_constraint(self.constraint.as_ref())
            .with_path_code(self.path_code.as_deref())
            .with_exclusions(&self.exclusions)
    }
}

/// Groups capped for a compact summary. `base_total` covers every group,
/// including the ones cut off by the cap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopGroups {
    pub groups: Vec<Group>,
    pub base_total: f64,
}

pub struct Aggregator<'a> {
    oracle: &'a dyn ClassificationOracle,
}

impl<'a> Aggregator<'a> {
    pub fn new(oracle: &'a dyn ClassificationOracle) -> Self {
        Self { oracle }
    }

    /// Groups `items` by their `taxonomy` code truncated to `depth`, sorted by
    /// total descending. Ties keep first-encounter order.
    pub fn aggregate(
        &self,
        items: &[LineItem],
        taxonomy: Taxonomy,
        depth: u8,
        options: &AggregateOptions,
    ) -> Vec<Group> {
        let scope = options.scope(taxonomy, depth);

        let mut groups: Vec<Group> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut dropped = 0usize;

        for item in items {
            let codes = NormalizedCodes::of(item);
            let Some(code) = scope.group_for(&codes) else {
                dropped += 1;
                continue;
            };

            match index.get(&code).copied() {
                Some(i) => {
                    let group = &mut groups[i];
                    group.total += item.amount;
                    group.count += item.count;
                }
                None => {
                    let name = resolve_label(self.oracle, taxonomy, &code, depth, item.name(taxonomy));
                    index.insert(code.clone(), groups.len());
                    groups.push(Group {
                        code,
                        name,
                        total: item.amount,
                        count: item.count,
                        is_leaf: depth >= SUBCHAPTER_DEPTH,
                    });
                }
            }
        }

        sort_by_total(&mut groups);

        debug!(
            "Aggregated {} items into {} {} groups at depth {} ({} filtered out)",
            items.len(),
            groups.len(),
            taxonomy,
            depth,
            dropped
        );

        groups
    }

    /// Same as [`Aggregator::aggregate`], then keeps at most `limit` groups.
    pub fn aggregate_top(
        &self,
        items: &[LineItem],
        taxonomy: Taxonomy,
        depth: u8,
        options: &AggregateOptions,
        limit: usize,
    ) -> TopGroups {
        TopGroups::from_sorted(&self.aggregate(items, taxonomy, depth, options), limit)
    }
}

impl TopGroups {
    /// Caps already sorted groups at `limit`, keeping the full total.
    pub fn from_sorted(groups: &[Group], limit: usize) -> Self {
        Self {
            groups: groups.iter().take(limit).cloned().collect(),
            base_total: groups.iter().map(|g| g.total).sum(),
        }
    }
}

/// Descending by total. NaN totals sort last.
fn sort_by_total(groups: &mut [Group]) {
    groups.sort_by(|a, b| match (a.total.is_nan(), b.total.is_nan()) {
        (false, false) => b.total.total_cmp(&a.total),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    });
}

/// Shorthand for a one-off aggregation.
pub fn aggregate(
    items: &[LineItem],
    taxonomy: Taxonomy,
    depth: u8,
    options: &AggregateOptions,
    oracle: &dyn ClassificationOracle,
) -> Vec<Group> {
    Aggregator::new(oracle).aggregate(items, taxonomy, depth, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{NoClassificationNames, StaticClassificationTable};

    fn fixture() -> Vec<LineItem> {
        vec![
            LineItem::new("51.01.01", "10.01.01", 100_000.0),
            LineItem::new("51.01.02", "10.01.01", 80_000.0),
            LineItem::new("51.02", "20.01.01", 5_000.0),
        ]
    }

    #[test]
    fn test_aggregate_chapters() {
        let groups = aggregate(
            &fixture(),
            Taxonomy::Functional,
            2,
            &AggregateOptions::new(),
            &NoClassificationNames,
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].code, "51");
        assert!((groups[0].total - 185_000.0).abs() < 0.01);
        assert_eq!(groups[0].count, 3);
        assert!(!groups[0].is_leaf);
    }

    #[test]
    fn test_aggregate_subchapters_sorted() {
        let groups = aggregate(
            &fixture(),
            Taxonomy::Functional,
            4,
            &AggregateOptions::new().with_path_code("51"),
            &NoClassificationNames,
        );

        let codes: Vec<&str> = groups.iter().map(|g| g.code.as_str()).collect();
        assert_eq!(codes, vec!["51.01", "51.02"]);
        assert!((groups[0].total - 180_000.0).abs() < 0.01);
        assert!((groups[1].total - 5_000.0).abs() < 0.01);
        assert!(groups.iter().all(|g| g.is_leaf));
    }

    #[test]
    fn test_aggregate_with_constraint() {
        let options = AggregateOptions::new().with_constraint(Constraint {
            taxonomy: Taxonomy::Functional,
            code: "51.01".to_string(),
        });
        let groups = aggregate(&fixture(), Taxonomy::Economic, 2, &options, &NoClassificationNames);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].code, "10");
        assert!((groups[0].total - 180_000.0).abs() < 0.01);
    }

    #[test]
    fn test_aggregate_with_exclusions() {
        let options = AggregateOptions::new().with_exclusions(Exclusions::new().with_economic("20"));
        let groups = aggregate(&fixture(), Taxonomy::Functional, 2, &options, &NoClassificationNames);

        assert!((groups[0].total - 180_000.0).abs() < 0.01);
        assert_eq!(groups[0].count, 2);
    }

    #[test]
    fn test_unclassifiable_items_are_dropped() {
        let mut items = fixture();
        items.push(LineItem {
            functional_code: None,
            functional_name: None,
            economic_code: Some("10".to_string()),
            economic_name: None,
            amount: 999.0,
            count: 1,
        });
        items.push(LineItem::new("n/a", "10", 1.0));

        let groups = aggregate(&items, Taxonomy::Functional, 2, &AggregateOptions::new(), &NoClassificationNames);
        let total: f64 = groups.iter().map(|g| g.total).sum();
        assert!((total - 185_000.0).abs() < 0.01);
    }

    #[test]
    fn test_unsupported_depth_is_empty() {
        for depth in [0, 1, 3, 8] {
            let groups = aggregate(&fixture(), Taxonomy::Functional, depth, &AggregateOptions::new(), &NoClassificationNames);
            assert!(groups.is_empty(), "depth {} should yield nothing", depth);
        }
    }

    #[test]
    fn test_labels_come_from_oracle_and_item_names() {
        let items = vec![
            LineItem::new("51.01.01", "10.01.01", 10.0).with_names("Town hall", "Base salaries"),
        ];
        let oracle = StaticClassificationTable::new().with(Taxonomy::Functional, "51", "Public authorities");
        let aggregator = Aggregator::new(&oracle);

        let chapters = aggregator.aggregate(&items, Taxonomy::Functional, 2, &AggregateOptions::new());
        assert_eq!(chapters[0].name, "Public authorities");

        let details = aggregator.aggregate(&items, Taxonomy::Functional, 6, &AggregateOptions::new());
        assert_eq!(details[0].name, "Town hall");
    }

    #[test]
    fn test_aggregate_top_keeps_base_total() {
        let items: Vec<LineItem> = (1..=10)
            .map(|i| LineItem::new(&format!("{}.01", 50 + i), "10.01", i as f64 * 10.0))
            .collect();

        let top = Aggregator::new(&NoClassificationNames).aggregate_top(
            &items,
            Taxonomy::Functional,
            2,
            &AggregateOptions::new(),
            DEFAULT_TOP_N,
        );

        assert_eq!(top.groups.len(), 7);
        assert_eq!(top.groups[0].code, "60");
        assert!((top.base_total - 550.0).abs() < 0.01);
    }

    #[test]
    fn test_nan_totals_sort_last_without_panicking() {
        let items: Vec<LineItem> = (0..60)
            .map(|i| {
                let amount = if i % 3 == 0 { f64::NAN } else { i as f64 };
                LineItem::new(&format!("{}.01", 10 + i), "10.01", amount)
            })
            .collect();

        let groups = aggregate(&items, Taxonomy::Functional, 2, &AggregateOptions::new(), &NoClassificationNames);

        assert_eq!(groups.len(), 60);
        let finite: Vec<f64> = groups.iter().take(40).map(|g| g.total).collect();
        assert!(finite.iter().all(|t| !t.is_nan()));
        assert!(finite.windows(2).all(|w| w[0] >= w[1]));
        assert!(groups[40..].iter().all(|g| g.total.is_nan()));
    }

    #[test]
    fn test_infinite_amounts_cancel_to_nan() {
        let items = vec![
            LineItem::new("51.01", "10.01", f64::INFINITY),
            LineItem::new("51.02", "10.02", f64::NEG_INFINITY),
            LineItem::new("52.01", "10.03", 5.0),
        ];
        let groups = aggregate(&items, Taxonomy::Functional, 2, &AggregateOptions::new(), &NoClassificationNames);

        assert_eq!(groups[0].code, "52");
        assert!(groups[1].total.is_nan());
    }

    #[test]
    fn test_top_groups_from_sorted() {
        let groups = aggregate(&fixture(), Taxonomy::Functional, 4, &AggregateOptions::new(), &NoClassificationNames);
        let top = TopGroups::from_sorted(&groups, 1);

        assert_eq!(top.groups.len(), 1);
        assert_eq!(top.groups[0].code, "51.01");
        assert!((top.base_total - 185_000.0).abs() < 0.01);
    }

    #[test]
    fn test_negative_amounts_sum() {
        let items = vec![
            LineItem::new("51.01", "10.01", 100.0),
            LineItem::new("51.02", "10.02", -30.0),
        ];
        let groups = aggregate(&items, Taxonomy::Economic, 2, &AggregateOptions::new(), &NoClassificationNames);
        assert!((groups[0].total - 70.0).abs() < 0.01);
    }
}
