use crate::codes::{is_supported_depth, CHAPTER_DEPTH};
use crate::error::{DrillDownError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Taxonomy {
    #[schemars(description = "Functional classification: the purpose of spending (education, defense, ...)")]
    Functional,

    #[schemars(description = "Economic classification: the type of expense (salaries, transfers, ...)")]
    Economic,
}

impl Taxonomy {
    pub fn opposite(self) -> Self {
        match self {
            Taxonomy::Functional => Taxonomy::Economic,
            Taxonomy::Economic => Taxonomy::Functional,
        }
    }

    /// Short tag used to qualify codes across taxonomies, e.g. `ec:51`.
    pub fn tag(self) -> &'static str {
        match self {
            Taxonomy::Functional => "fn",
            Taxonomy::Economic => "ec",
        }
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::Functional
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Taxonomy::Functional => write!(f, "functional"),
            Taxonomy::Economic => write!(f, "economic"),
        }
    }
}

fn default_count() -> u64 {
    1
}

/// One budget execution line, classified independently in both taxonomies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct LineItem {
    #[schemars(description = "Dotted functional code, e.g. '51.01.02'. May contain stray characters.")]
    pub functional_code: Option<String>,

    #[schemars(description = "Functional classification name as published by the data source")]
    pub functional_name: Option<String>,

    #[schemars(description = "Dotted economic code, e.g. '10.01.01'. May contain stray characters.")]
    pub economic_code: Option<String>,

    #[schemars(description = "Economic classification name as published by the data source")]
    pub economic_name: Option<String>,

    #[schemars(description = "Signed amount in the report currency")]
    pub amount: f64,

    #[serde(default = "default_count")]
    #[schemars(description = "Occurrence weight. Defaults to 1.")]
    pub count: u64,
}

impl LineItem {
    pub fn new(functional_code: &str, economic_code: &str, amount: f64) -> Self {
        Self {
            functional_code: Some(functional_code.to_string()),
            functional_name: None,
            economic_code: Some(economic_code.to_string()),
            economic_name: None,
            amount,
            count: 1,
        }
    }

    #[must_use]
    pub fn with_names(mut self, functional_name: &str, economic_name: &str) -> Self {
        self.functional_name = Some(functional_name.to_string());
        self.economic_name = Some(economic_name.to_string());
        self
    }

    pub fn code(&self, taxonomy: Taxonomy) -> Option<&str> {
        match taxonomy {
            Taxonomy::Functional => self.functional_code.as_deref(),
            Taxonomy::Economic => self.economic_code.as_deref(),
        }
    }

    pub fn name(&self, taxonomy: Taxonomy) -> Option<&str> {
        match taxonomy {
            Taxonomy::Functional => self.functional_name.as_deref(),
            Taxonomy::Economic => self.economic_name.as_deref(),
        }
    }
}

/// Input envelope for a set of line items, used for schema generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LineItemSet {
    #[schemars(description = "Name of the public entity the items belong to")]
    pub entity_name: String,

    #[schemars(description = "Flat list of classified budget lines")]
    pub items: Vec<LineItem>,
}

impl LineItemSet {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(LineItemSet)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub code: String,
    pub name: String,
    pub total: f64,
    pub count: u64,
    /// True below the chapter level. A presentation hint only.
    pub is_leaf: bool,
}

/// Restricts a computation to items whose code in `taxonomy` starts with `code`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct Constraint {
    pub taxonomy: Taxonomy,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BreadcrumbEntry {
    pub code: String,
    pub label: String,
    /// Taxonomy that was active when this step was taken.
    pub taxonomy: Taxonomy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExcludedGroup {
    /// Taxonomy-qualified prefix, e.g. `ec:20`.
    pub code: String,
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExclusionSummary {
    pub total_before_exclusion: f64,
    pub total_excluded: f64,
    pub total_after_exclusion: f64,
    pub items: Vec<ExcludedGroup>,
}

impl ExclusionSummary {
    /// Excluded amount as a percentage of the pre-exclusion total.
    pub fn excluded_share(&self) -> f64 {
        if self.total_before_exclusion == 0.0 {
            0.0
        } else {
            self.total_excluded / self.total_before_exclusion * 100.0
        }
    }
}

/// Code prefixes removed from the effective totals, per taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
pub struct Exclusions {
    #[serde(default)]
    #[schemars(description = "Economic code prefixes to exclude, e.g. ['51', '55.01'] for transfers")]
    pub economic: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Functional code prefixes to exclude")]
    pub functional: Vec<String>,
}

impl Exclusions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_economic(mut self, prefix: &str) -> Self {
        self.economic.push(prefix.to_string());
        self
    }

    #[must_use]
    pub fn with_functional(mut self, prefix: &str) -> Self {
        self.functional.push(prefix.to_string());
        self
    }

    pub fn for_taxonomy(&self, taxonomy: Taxonomy) -> &[String] {
        match taxonomy {
            Taxonomy::Functional => &self.functional,
            Taxonomy::Economic => &self.economic,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.economic.is_empty() && self.functional.is_empty()
    }
}

fn default_root_depth() -> u8 {
    CHAPTER_DEPTH
}

fn default_top_n() -> usize {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DrillDownConfig {
    #[serde(default)]
    #[schemars(description = "Taxonomy the user starts drilling in")]
    pub base_taxonomy: Taxonomy,

    #[serde(default = "default_root_depth")]
    #[schemars(description = "Depth shown before any drill step: 2 (chapter), 4 (subchapter) or 6 (item)")]
    pub root_depth: u8,

    #[serde(default = "default_top_n")]
    #[schemars(description = "Number of groups kept in the compact summary")]
    pub top_n: usize,

    #[serde(default)]
    pub exclusions: Exclusions,
}

impl Default for DrillDownConfig {
    fn default() -> Self {
        Self {
            base_taxonomy: Taxonomy::default(),
            root_depth: default_root_depth(),
            top_n: default_top_n(),
            exclusions: Exclusions::default(),
        }
    }
}

impl DrillDownConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_supported_depth(self.root_depth) {
            return Err(DrillDownError::InvalidRootDepth(self.root_depth));
        }
        if self.top_n == 0 {
            return Err(DrillDownError::InvalidTopN(self.top_n));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DrillDownConfig)
    }
}
