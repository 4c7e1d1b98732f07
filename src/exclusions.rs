use crate::codes::{depth_of, has_prefix, normalize};
use crate::filters::{ItemScope, NormalizedCodes};
use crate::labels::{resolve_label, ClassificationOracle};
use crate::schema::{Constraint, ExcludedGroup, ExclusionSummary, Exclusions, LineItem, Taxonomy};
use log::debug;

#[derive(Debug, Clone, Default)]
pub struct ExclusionOptions {
    pub constraint: Option<Constraint>,
    pub path_code: Option<String>,
    /// Taxonomy the path code refers to. Defaults to functional.
    pub taxonomy: Option<Taxonomy>,
}

struct PrefixBucket {
    taxonomy: Taxonomy,
    prefix: String,
    amount: f64,
}

pub struct ExclusionCalculator<'a> {
    oracle: &'a dyn ClassificationOracle,
}

impl<'a> ExclusionCalculator<'a> {
    pub fn new(oracle: &'a dyn ClassificationOracle) -> Self {
        Self { oracle }
    }

    /// Splits the in-scope total into excluded and remaining parts.
    ///
    /// Within one taxonomy an item is charged to the first matching prefix
    /// only. The two taxonomies are charged independently.
    pub fn calculate(
        &self,
        items: &[LineItem],
        exclusions: &Exclusions,
        options: &ExclusionOptions,
    ) -> ExclusionSummary {
        let taxonomy = options.taxonomy.unwrap_or_default();
        // Depth does not matter here: only in_scope is consulted.
        let scope = ItemScope::new(taxonomy, 0)
            .with_constraint(options.constraint.as_ref())
            .with_path_code(options.path_code.as_deref());

        let mut buckets = Vec::new();
        for (bucket_taxonomy, prefixes) in [
            (Taxonomy::Economic, &exclusions.economic),
            (Taxonomy::Functional, &exclusions.functional),
        ] {
            for prefix in prefixes {
                let prefix = normalize(Some(prefix));
                if prefix.is_empty() {
                    continue;
                }
                buckets.push(PrefixBucket {
                    taxonomy: bucket_taxonomy,
                    prefix,
                    amount: 0.0,
                });
            }
        }

        let mut total_before_exclusion = 0.0;

        for item in items {
            let codes = NormalizedCodes::of(item);
            if !scope.in_scope(&codes) {
                continue;
            }
            total_before_exclusion += item.amount;

            for bucket_taxonomy in [Taxonomy::Economic, Taxonomy::Functional] {
                let code = codes.get(bucket_taxonomy);
                if let Some(bucket) = buckets
                    .iter_mut()
                    .find(|b| b.taxonomy == bucket_taxonomy && has_prefix(code, &b.prefix))
                {
                    bucket.amount += item.amount;
                }
            }
        }

        let total_excluded: f64 = buckets.iter().map(|b| b.amount).sum();

        let items = buckets
            .into_iter()
            .filter(|b| b.amount != 0.0)
            .map(|b| ExcludedGroup {
                code: format!("{}:{}", b.taxonomy.tag(), b.prefix),
                label: resolve_label(self.oracle, b.taxonomy, &b.prefix, depth_of(&b.prefix), None),
                amount: b.amount,
            })
            .collect();

        debug!(
            "Exclusion totals: before={:.2} excluded={:.2}",
            total_before_exclusion, total_excluded
        );

        ExclusionSummary {
            total_before_exclusion,
            total_excluded,
            total_after_exclusion: total_before_exclusion - total_excluded,
            items,
        }
    }
}

/// Shorthand for a one-off calculation.
pub fn calculate_excluded(
    items: &[LineItem],
    exclusions: &Exclusions,
    options: &ExclusionOptions,
    oracle: &dyn ClassificationOracle,
) -> ExclusionSummary {
    ExclusionCalculator::new(oracle).calculate(items, exclusions, options)
}
