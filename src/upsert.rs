//! Key-based insert/update merge of an uploaded table into the stored one.
//!
//! Rows are matched by their natural key (`series|model`, lowercased and
//! trimmed at both ends). A preview partitions the uploaded keys without touching the
//! store; applying the plan backs up the stored file, merges, sorts and saves.

use log::info;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use crate::error::Result;
use crate::filter::UpsertMarks;
use crate::loader::RawTable;
use crate::record::ProductRecord;
use crate::saving::TableStore;
use crate::table::ProductTable;

/// Disjoint partition of the uploaded keys
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UpsertPreview {
    pub to_insert: BTreeSet<String>,
    pub to_update: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
}

impl UpsertPreview {
    /// Compare an uploaded table against the stored one
    ///
    /// When a key repeats inside either table the last row carrying it is the
    /// one compared, matching what [`merge`] writes.
    pub fn compute(existing: &ProductTable, uploaded: &ProductTable) -> Self {
        let base = index_by_key(existing);
        let mut preview = UpsertPreview::default();

        for (key, row) in index_by_key(uploaded) {
            match base.get(&key) {
                None => preview.to_insert.insert(key),
                Some(current) if current.same_values(row) => preview.unchanged.insert(key),
                Some(_) => preview.to_update.insert(key),
            };
        }
        preview
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (self.to_insert.len(), self.to_update.len(), self.unchanged.len())
    }
}

/// A validated upload together with its preview, held until confirmed
#[derive(Clone, Debug)]
pub struct UpsertPlan {
    pub uploaded: ProductTable,
    pub preview: UpsertPreview,
}

impl UpsertPlan {
    /// Validate the upload's columns and compute the preview
    ///
    /// # Errors
    /// * `MissingColumns` when the upload lacks any required column; nothing
    ///   is computed in that case
    pub fn prepare(existing: &ProductTable, uploaded: &RawTable) -> Result<Self> {
        let uploaded = ProductTable::from_raw(uploaded)?;
        let preview = UpsertPreview::compute(existing, &uploaded);
        Ok(UpsertPlan { uploaded, preview })
    }

    /// Model values of the rows to insert and to update, in upload order
    pub fn marks(&self) -> UpsertMarks {
        let pick = |keys: &BTreeSet<String>| {
            self.uploaded
                .records
                .iter()
                .filter(|r| keys.contains(&r.natural_key()))
                .map(|r| r.model.clone())
                .collect()
        };
        UpsertMarks {
            new_models: pick(&self.preview.to_insert),
            updated_models: pick(&self.preview.to_update),
        }
    }
}

/// What a confirmed apply did
#[derive(Clone, Debug, Serialize)]
pub struct ApplyOutcome {
    pub backup: Option<PathBuf>,
    pub rows: usize,
}

/// Replace-or-insert every uploaded row by key, then sort by (Series, Model)
///
/// Duplicate keys in `existing` collapse to the last row; in `uploaded` the
/// last occurrence wins.
pub fn merge(existing: &ProductTable, uploaded: &ProductTable) -> ProductTable {
    let mut merged: HashMap<String, ProductRecord> = HashMap::new();
    for record in existing.records.iter().chain(&uploaded.records) {
        merged.insert(record.natural_key(), record.clone());
    }

    let mut table = ProductTable::new(merged.into_values().collect());
    table.sort_by_series_model();
    table
}

/// Back up the stored file, merge the plan into `existing` and persist
///
/// The stored file is renamed before the merged table is written; a failed
/// save leaves only the backup behind.
pub fn apply(store: &TableStore, existing: &ProductTable, plan: &UpsertPlan) -> Result<ApplyOutcome> {
    let backup = store.backup()?;
    let merged = merge(existing, &plan.uploaded);
    store.save(&merged)?;

    let (inserted, updated, _) = plan.preview.counts();
    info!(
        "applied upsert to {}: {} inserted, {} updated, {} rows total",
        store.path().display(),
        inserted,
        updated,
        merged.len()
    );
    Ok(ApplyOutcome {
        backup,
        rows: merged.len(),
    })
}

fn index_by_key(table: &ProductTable) -> HashMap<String, &ProductRecord> {
    table
        .records
        .iter()
        .map(|r| (r.natural_key(), r))
        .collect()
}
