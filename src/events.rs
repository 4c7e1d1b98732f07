use crate::drilldown::DrillDownController;
use crate::error::Result;
use crate::schema::{Exclusions, LineItem, Taxonomy};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A navigation request coming from the UI.
/// Serialized with an `action` tag so event logs can be stored and replayed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DrillEvent {
    /// Switch the starting taxonomy. Clears the path.
    SelectBaseTaxonomy { taxonomy: Taxonomy },

    /// Drill into a group shown at the current level.
    DrillInto { code: String },

    /// Jump back to a breadcrumb. No code means the root.
    ClickBreadcrumb {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        #[schemars(description = "Position of the breadcrumb on the path, when codes repeat across taxonomies.")]
        index: Option<usize>,
    },

    /// Clear the path, keep the base taxonomy.
    Reset,
}

impl DrillEvent {
    /// Applies the event. Returns whether the controller state changed.
    pub fn apply(&self, controller: &mut DrillDownController, items: &[LineItem], exclusions: &Exclusions) -> bool {
        match self {
            DrillEvent::SelectBaseTaxonomy { taxonomy } => {
                let changed = controller.base_taxonomy() != *taxonomy || !controller.path().is_empty();
                controller.select_base_taxonomy(*taxonomy);
                changed
            }
            DrillEvent::DrillInto { code } => controller.drill_into(code, items, exclusions),
            DrillEvent::ClickBreadcrumb { code, index } => {
                controller.click_breadcrumb(code.as_deref(), *index, items, exclusions)
            }
            DrillEvent::Reset => {
                let changed = !controller.path().is_empty();
                controller.reset();
                changed
            }
        }
    }

    pub fn list_from_json(json: &str) -> Result<Vec<DrillEvent>> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Vec<DrillEvent>)
    }
}

/// Applies events in order. Rejected events are skipped, not fatal.
/// Returns how many events changed the state.
pub fn replay(
    events: &[DrillEvent],
    controller: &mut DrillDownController,
    items: &[LineItem],
    exclusions: &Exclusions,
) -> usize {
    events
        .iter()
        .filter(|event| event.apply(controller, items, exclusions))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<LineItem> {
        vec![
            LineItem::new("51.01.01", "10.01.01", 100_000.0),
            LineItem::new("51.01.02", "10.01.01", 80_000.0),
            LineItem::new("51.02", "20.01.01", 5_000.0),
        ]
    }

    #[test]
    fn test_events_from_json() {
        let json = r#"[
            {"action": "drill_into", "code": "51"},
            {"action": "click_breadcrumb", "code": null},
            {"action": "click_breadcrumb", "code": "51", "index": 0},
            {"action": "select_base_taxonomy", "taxonomy": "economic"},
            {"action": "reset"}
        ]"#;

        let events = DrillEvent::list_from_json(json).unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            DrillEvent::DrillInto {
                code: "51".to_string()
            }
        );
        assert_eq!(
            events[1],
            DrillEvent::ClickBreadcrumb {
                code: None,
                index: None
            }
        );
        assert_eq!(
            events[3],
            DrillEvent::SelectBaseTaxonomy {
                taxonomy: Taxonomy::Economic
            }
        );
    }

    #[test]
    fn test_replay_counts_committed_events() {
        let items = fixture();
        let exclusions = Exclusions::new();
        let mut controller = DrillDownController::new(Taxonomy::Functional, 2);

        let events = vec![
            DrillEvent::DrillInto { code: "51".to_string() },
            DrillEvent::DrillInto { code: "51.02".to_string() },
            DrillEvent::DrillInto { code: "51.01".to_string() },
            DrillEvent::DrillInto { code: "51.01.02".to_string() },
            DrillEvent::ClickBreadcrumb {
                code: Some("51".to_string()),
                index: Some(0),
            },
        ];

        let committed = replay(&events, &mut controller, &items, &exclusions);
        assert_eq!(committed, 4);
        assert_eq!(controller.path(), &["51".to_string()]);
    }

    #[test]
    fn test_reset_on_empty_path_is_not_a_change() {
        let mut controller = DrillDownController::new(Taxonomy::Functional, 2);
        assert!(!DrillEvent::Reset.apply(&mut controller, &fixture(), &Exclusions::new()));
    }

    #[test]
    fn test_schema_generation() {
        let schema = serde_json::to_string(&DrillEvent::generate_json_schema()).unwrap();
        assert!(schema.contains("drill_into"));
        assert!(schema.contains("click_breadcrumb"));
    }
}
