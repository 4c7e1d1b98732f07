//! # Budget Drill-Down
//!
//! Hierarchical aggregation and drill-down over public budget line items.
//!
//! ## Core Concepts
//!
//! - **Line items**: flat budget lines, each carrying a functional code (purpose
//!   of spending) and an economic code (type of expense)
//! - **Depth**: codes are dotted (`51.01.02`); one segment is a chapter (depth 2),
//!   two a subchapter (depth 4), three an item (depth 6)
//! - **Drill path**: the breadcrumb of codes the user clicked into
//! - **Pivot**: once a path reaches item depth in one taxonomy, drilling continues
//!   in the other taxonomy, constrained to the item just reached
//! - **Exclusions**: code prefixes removed from the effective totals, reported
//!   separately with before/after figures
//!
//! ## Example
//!
//! ```rust,ignore
//! use budget_drilldown::*;
//!
//! let items = vec![
//!     LineItem::new("51.01.01", "10.01.01", 100_000.0),
//!     LineItem::new("51.01.02", "10.01.01", 80_000.0),
//!     LineItem::new("51.02", "20.01.01", 5_000.0),
//! ];
//!
//! let config = DrillDownConfig::default();
//! let mut controller = DrillDownController::from_config(&config);
//! controller.drill_into("51", &items, &config.exclusions);
//!
//! let view = process_drilldown(&config, &items, &controller, &NoClassificationNames).unwrap();
//! assert_eq!(view.groups[0].code, "51.01");
//! ```

pub mod aggregator;
pub mod codes;
pub mod drilldown;
pub mod error;
pub mod events;
pub mod exclusions;
pub mod filters;
pub mod ingestion;
pub mod labels;
pub mod schema;
pub mod view;

pub use aggregator::{aggregate, AggregateOptions, Aggregator, TopGroups, DEFAULT_TOP_N};
pub use codes::{depth_of, group_code, normalize, parent_code, CHAPTER_DEPTH, ITEM_DEPTH, SUBCHAPTER_DEPTH};
pub use drilldown::{can_advance, derive_drill_context, pivot_index, DrillContext, DrillDownController};
pub use error::{DrillDownError, Result};
pub use events::{replay, DrillEvent};
pub use exclusions::{calculate_excluded, ExclusionCalculator, ExclusionOptions};
pub use ingestion::*;
pub use labels::{
    resolve_breadcrumb_label, resolve_label, ClassificationOracle, NoClassificationNames,
    StaticClassificationTable,
};
pub use schema::*;
pub use view::DrillDownView;

use log::{debug, info};

pub struct DrillDownProcessor;

impl DrillDownProcessor {
    /// Computes the full view for the controller's current state.
    ///
    /// The controller is owned by the caller; this never mutates it.
    pub fn process(
        config: &DrillDownConfig,
        items: &[LineItem],
        controller: &DrillDownController,
        oracle: &dyn ClassificationOracle,
    ) -> Result<DrillDownView> {
        config.validate()?;

        let context = controller.context();
        info!(
            "Computing drill-down view: base={} active={} depth={} path_len={}",
            controller.base_taxonomy(),
            context.active_taxonomy,
            context.depth,
            controller.path().len()
        );
        if config.exclusions.is_empty() {
            debug!("Input contains {} items, no exclusions", items.len());
        } else {
            debug!(
                "Input contains {} items, {} economic and {} functional exclusion prefixes",
                items.len(),
                config.exclusions.economic.len(),
                config.exclusions.functional.len()
            );
        }

        let view = DrillDownView::build(controller, items, &config.exclusions, config.top_n, oracle);

        debug!(
            "View has {} groups totalling {:.2}; excluded {:.2}",
            view.groups.len(),
            view.total(),
            view.exclusions.total_excluded
        );

        Ok(view)
    }
}

pub fn process_drilldown(
    config: &DrillDownConfig,
    items: &[LineItem],
    controller: &DrillDownController,
    oracle: &dyn ClassificationOracle,
) -> Result<DrillDownView> {
    DrillDownProcessor::process(config, items, controller, oracle)
}
