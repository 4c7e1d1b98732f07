use crate::aggregator::{Aggregator, TopGroups};
use crate::drilldown::DrillDownController;
use crate::exclusions::ExclusionCalculator;
use crate::labels::ClassificationOracle;
use crate::schema::{BreadcrumbEntry, Constraint, ExclusionSummary, Exclusions, Group, LineItem, Taxonomy};
use serde::{Deserialize, Serialize};

/// Everything an external renderer needs for the current drill level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillDownView {
    pub base_taxonomy: Taxonomy,
    pub active_taxonomy: Taxonomy,
    pub path: Vec<String>,
    pub effective_path: Vec<String>,
    pub constraint: Option<Constraint>,
    pub depth: u8,
    pub breadcrumbs: Vec<BreadcrumbEntry>,
    pub groups: Vec<Group>,
    pub top_groups: TopGroups,
    pub exclusions: ExclusionSummary,
}

impl DrillDownView {
    pub fn build(
        controller: &DrillDownController,
        items: &[LineItem],
        exclusions: &Exclusions,
        top_n: usize,
        oracle: &dyn ClassificationOracle,
    ) -> Self {
        let context = controller.context();
        let aggregator = Aggregator::new(oracle);
        let options = context.aggregate_options(exclusions);

        let groups = aggregator.aggregate(items, context.active_taxonomy, context.depth, &options);
        let top_groups = TopGroups::from_sorted(&groups, top_n);

        let exclusion_summary =
            ExclusionCalculator::new(oracle).calculate(items, exclusions, &context.exclusion_options());

        Self {
            base_taxonomy: controller.base_taxonomy(),
            active_taxonomy: context.active_taxonomy,
            path: controller.path().to_vec(),
            effective_path: context.effective_path,
            constraint: context.constraint,
            depth: context.depth,
            breadcrumbs: controller.breadcrumbs(items, oracle),
            groups,
            top_groups,
            exclusions: exclusion_summary,
        }
    }

    /// Sum over all groups, before the top-N cap.
    pub fn total(&self) -> f64 {
        self.top_groups.base_total
    }

    /// Share of `group` in [`DrillDownView::total`], in percent.
    pub fn share_of(&self, group: &Group) -> f64 {
        let total = self.total();
        if total == 0.0 {
            0.0
        } else {
            group.total / total * 100.0
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Taxonomy,Code,Name,Total,Count,Share\n");

        for group in &self.groups {
            output.push_str(&format!(
                "{},{},{},{:.2},{},{:.2}\n",
                self.active_taxonomy,
                csv_field(&group.code),
                csv_field(&group.name),
                group.total,
                group.count,
                self.share_of(group)
            ));
        }

        output
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
