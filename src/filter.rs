use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::record::{FILTER_FIELDS, Field, ProductRecord};
use crate::table::ProductTable;

/// Which rows to show relative to the last upsert preview
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    All,
    OnlyNew,
    OnlyUpdated,
}

/// Model values flagged by the most recent upsert preview
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertMarks {
    pub new_models: Vec<String>,
    pub updated_models: Vec<String>,
}

/// Search text, per-column selections and view mode for one session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub query: String,
    pub selections: BTreeMap<Field, BTreeSet<String>>,
    pub view: ViewMode,
}

impl FilterState {
    /// Restrict `field` to `values`; an empty set clears the restriction
    pub fn select<I, S>(&mut self, field: Field, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.selections.remove(&field);
        } else {
            self.selections.insert(field, values);
        }
    }

    fn matches(&self, record: &ProductRecord, query: &str) -> bool {
        if !query.is_empty() && !record.search_text().contains(query) {
            return false;
        }
        self.selections
            .iter()
            .all(|(field, values)| values.is_empty() || values.contains(record.get(*field)))
    }
}

/// Rows of `table` visible under `state`, in table order
///
/// The view mode only narrows the list when the corresponding mark list is
/// non-empty; before any preview "only new" shows everything. The query is
/// lowercased but otherwise matched as typed.
pub fn apply<'a>(table: &'a ProductTable, state: &FilterState, marks: &UpsertMarks) -> Vec<&'a ProductRecord> {
    let query = state.query.to_lowercase();
    let models = match state.view {
        ViewMode::All => None,
        ViewMode::OnlyNew => Some(&marks.new_models),
        ViewMode::OnlyUpdated => Some(&marks.updated_models),
    }
    .filter(|m| !m.is_empty());

    table
        .records
        .iter()
        .filter(|r| state.matches(r, &query))
        .filter(|r| models.is_none_or(|m| m.iter().any(|model| *model == r.model)))
        .collect()
}

/// Options for every filterable column: its sorted distinct values
pub fn facets(table: &ProductTable) -> BTreeMap<Field, Vec<String>> {
    FILTER_FIELDS
        .iter()
        .map(|f| (*f, table.distinct_values(*f)))
        .collect()
}
