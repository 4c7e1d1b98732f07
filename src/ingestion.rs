use crate::codes::normalize;
use crate::error::{DrillDownError, Result};
use crate::schema::{LineItem, LineItemSet};
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// One raw row of an execution report, before any cleanup.
#[derive(Debug, Clone)]
pub struct ExecutionRow {
    pub functional_code: String,
    pub functional_name: String,
    pub economic_code: String,
    pub economic_name: String,
    pub amount: f64,
    pub count: Option<u64>,
}

fn clean_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn clean_code(code: &str) -> Option<String> {
    let normalized = normalize(Some(code));
    (!normalized.is_empty()).then_some(normalized)
}

/// Converts raw rows into line items. Blank codes and names become `None`;
/// non-finite amounts are rejected with the offending row index.
pub fn convert_rows_to_items(rows: &[ExecutionRow]) -> Result<Vec<LineItem>> {
    rows.iter()
        .enumerate()
        .map(|(row, r)| {
            if !r.amount.is_finite() {
                return Err(DrillDownError::InvalidAmount {
                    row,
                    details: format!("{} is not a finite number", r.amount),
                });
            }

            Ok(LineItem {
                functional_code: clean_code(&r.functional_code),
                functional_name: clean_name(&r.functional_name),
                economic_code: clean_code(&r.economic_code),
                economic_name: clean_name(&r.economic_name),
                amount: r.amount,
                count: r.count.unwrap_or(1),
            })
        })
        .collect()
}

/// Merges items sharing the same normalized (functional, economic) code pair.
/// Amounts and counts add up; the first non-empty names are kept. Merged
/// items carry the normalized codes, or `None` for unclassifiable ones.
pub fn consolidate_items(items: &[LineItem]) -> Vec<LineItem> {
    let mut merged: BTreeMap<(String, String), LineItem> = BTreeMap::new();

    for item in items {
        let functional = normalize(item.functional_code.as_deref());
        let economic = normalize(item.economic_code.as_deref());

        let entry = merged
            .entry((functional.clone(), economic.clone()))
            .or_insert_with(|| LineItem {
                functional_code: clean_code(&functional),
                economic_code: clean_code(&economic),
                amount: 0.0,
                count: 0,
                ..item.clone()
            });

        entry.amount += item.amount;
        entry.count += item.count;
        if entry.functional_name.is_none() {
            entry.functional_name = item.functional_name.clone();
        }
        if entry.economic_name.is_none() {
            entry.economic_name = item.economic_name.clone();
        }
    }

    debug!("Consolidated {} items into {}", items.len(), merged.len());

    merged.into_values().collect()
}

/// Accepts either a bare JSON array of items or a [`LineItemSet`] envelope.
pub fn parse_line_items_json(json: &str) -> Result<Vec<LineItem>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        let set: LineItemSet = serde_json::from_value(value)?;
        Ok(set.items)
    }
}

pub fn read_line_items(path: impl AsRef<Path>) -> Result<Vec<LineItem>> {
    let contents = std::fs::read_to_string(path)?;
    parse_line_items_json(&contents)
}
