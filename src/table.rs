use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{CatalogError, Result};
use crate::loader::RawTable;
use crate::record::{Field, ProductRecord, REQUIRED_FIELDS};

/// Ordered product rows with the fixed 11-column schema
///
/// The table is only ever replaced as a whole; the store writes the full
/// table back on every save.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductTable {
    pub records: Vec<ProductRecord>,
}

impl ProductTable {
    pub fn new(records: Vec<ProductRecord>) -> Self {
        ProductTable { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Convert a raw sheet into product rows
    ///
    /// # Errors
    /// * `MissingColumns` naming every required header the sheet lacks, in
    ///   storage order
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        let missing = missing_columns(raw, REQUIRED_FIELDS.iter().map(|f| f.header()));
        if !missing.is_empty() {
            return Err(CatalogError::MissingColumns(missing));
        }

        let positions: Vec<(Field, usize)> = REQUIRED_FIELDS
            .iter()
            .filter_map(|f| raw.column(f.header()).map(|i| (*f, i)))
            .collect();

        let records = raw
            .rows
            .iter()
            .map(|row| {
                let mut record = ProductRecord::default();
                for (field, idx) in &positions {
                    record.set(*field, row.get(*idx).cloned().unwrap_or_default());
                }
                record
            })
            .collect();

        Ok(ProductTable { records })
    }

    /// Header row plus one row per record, in storage order
    pub fn to_raw(&self) -> RawTable {
        RawTable {
            headers: REQUIRED_FIELDS.iter().map(|f| f.header().to_string()).collect(),
            rows: self
                .records
                .iter()
                .map(|r| r.values().map(str::to_string).collect())
                .collect(),
        }
    }

    /// Sort by (Series, Model); stable, so equal pairs keep their order
    pub fn sort_by_series_model(&mut self) {
        self.records
            .sort_by(|a, b| (&a.series, &a.model).cmp(&(&b.series, &b.model)));
    }

    /// Sorted distinct non-empty values of one column
    pub fn distinct_values(&self, field: Field) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.get(field))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The four-row table written when no storage file exists yet
    pub fn sample() -> Self {
        let rows: [[&str; 11]; 4] = [
            [
                "環氧樹脂", "EPX-1000", "綠色", "Epoxy", "2mm", "自流平",
                "抗壓≥80MPa; 耐酸/鹼; 耐磨耗", "停車場, 工廠", "RoHS", "標準耐磨型地坪",
                "images/epx_1000.png",
            ],
            [
                "PU 耐磨", "PU-2000", "灰色", "PU", "3mm", "鏝抹",
                "耐磨耗<0.03g; 耐油污", "食品加工, 醫療", "REACH", "耐磨耐化學型",
                "images/pu_2000.png",
            ],
            [
                "導電防靜電", "ESD-3000", "黑色", "Epoxy", "2mm", "滾塗",
                "表面電阻 10^6 Ω; 抗塵", "電子廠, 無塵室", "抗菌報告", "導電防靜電地坪",
                "images/esd_3000.png",
            ],
            [
                "快速固化", "MMA-4000", "藍色", "MMA", "4mm", "自流平",
                "低溫施工; 2小時通車", "冷凍庫, 室外", "—", "甲基丙烯酸甲酯快速固化",
                "images/mma_4000.png",
            ],
        ];
        ProductTable {
            records: rows.iter().map(|r| ProductRecord::from_values(r)).collect(),
        }
    }
}

/// Names from `required` that the sheet does not carry, in the given order
pub fn missing_columns<'a>(raw: &RawTable, required: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    required
        .into_iter()
        .filter(|name| raw.column(name).is_none())
        .map(str::to_string)
        .collect()
}
