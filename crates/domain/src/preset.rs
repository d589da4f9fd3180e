use serde::{Deserialize, Serialize};

use crate::filter::FilterCondition;
use crate::query::SortCondition;

/// A named, pre-built predicate bundle for one entity.
///
/// Presets are applied atomically: installing one replaces the caller's
/// entire active filter set, because partially merging unrelated predicate
/// bundles would silently mix their semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    /// Stable preset name.
    pub name: String,
    /// Human-friendly label.
    pub display_name: String,
    /// Short description of what the preset selects.
    pub description: String,
    /// Entity the preset belongs to.
    pub entity: String,
    /// Conditions installed when the preset is applied.
    pub filters: Vec<FilterCondition>,
    /// Default sort installed alongside the conditions.
    #[serde(default)]
    pub sort: Vec<SortCondition>,
}
