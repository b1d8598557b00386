use serde::{Deserialize, Serialize};

use crate::record::Field;

/// Display language for labels, PDF headers and messages
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "中文", alias = "zh", alias = "Chinese")]
    Chinese,
    #[serde(rename = "English", alias = "en")]
    English,
}

/// Keys of the static text table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Text {
    PdfTitle,
    PdfSubtitle,
    NoImage,
    MissingColumns,
    DiffSummary,
    BackupCreated,
    UpdateDone,
    SampleCreated,
    ProductList,
    CatalogFileName,
}

impl Language {
    /// Parse a language selector as typed on the command line or sent by the UI
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "中文" | "zh" | "zh-tw" | "chinese" => Some(Language::Chinese),
            "english" | "en" => Some(Language::English),
            _ => None,
        }
    }

    pub fn text(self, key: Text) -> &'static str {
        use Language::*;
        match (key, self) {
            (Text::PdfTitle, Chinese) => "塗料 / 工業地坪 產品型錄",
            (Text::PdfTitle, English) => "Coatings & Industrial Flooring Catalog",
            (Text::PdfSubtitle, Chinese) => "（內容由 Excel 匯入，可即時更新）",
            (Text::PdfSubtitle, English) => "(Content imported from Excel, updates in real time)",
            (Text::NoImage, Chinese) => "無圖片",
            (Text::NoImage, English) => "No Image",
            (Text::MissingColumns, Chinese) => "更新檔缺少欄位：",
            (Text::MissingColumns, English) => "Missing columns in update file: ",
            (Text::DiffSummary, Chinese) => "🆕 新增：{a} 筆，✏️ 變更：{b} 筆，✅ 相同：{c} 筆",
            (Text::DiffSummary, English) => "🆕 New: {a}  | ✏️ Updated: {b}  | ✅ Unchanged: {c}",
            (Text::BackupCreated, Chinese) => "已自動備份：",
            (Text::BackupCreated, English) => "Backup created: ",
            (Text::UpdateDone, Chinese) => "更新完成！重新整理頁面即可查看最新清單。",
            (Text::UpdateDone, English) => "Update completed! Refresh to see the latest list.",
            (Text::SampleCreated, Chinese) => "找不到 {f}，已自動建立樣板。",
            (Text::SampleCreated, English) => "Cannot find {f}. A sample sheet has been created.",
            (Text::ProductList, Chinese) => "產品列表（{n} 筆）",
            (Text::ProductList, English) => "Product List ({n} items)",
            (Text::CatalogFileName, Chinese) => "產品型錄.pdf",
            (Text::CatalogFileName, English) => "Catalog.pdf",
        }
    }

    /// Label shown next to a field value in cards and in the PDF
    pub fn label(self, field: Field) -> &'static str {
        match self {
            Language::Chinese => field.header(),
            Language::English => match field {
                Field::Series => "Series",
                Field::Model => "Model",
                Field::Color => "Color",
                Field::Composition => "Composition",
                Field::Thickness => "Thickness",
                Field::Method => "Method",
                Field::Performance => "Performance",
                Field::Applications => "Applications",
                Field::Certifications => "Certifications",
                Field::Spec => "Specification",
                Field::ImagePath => "Image",
            },
        }
    }

    /// Format a `label: value` pair with the separator each language uses
    pub fn label_pair(self, field: Field, value: &str) -> String {
        match self {
            Language::Chinese => format!("{}：{}", self.label(field), value),
            Language::English => format!("{}: {}", self.label(field), value),
        }
    }

    /// Upsert preview summary line
    pub fn diff_summary(self, inserts: usize, updates: usize, unchanged: usize) -> String {
        self.text(Text::DiffSummary)
            .replace("{a}", &inserts.to_string())
            .replace("{b}", &updates.to_string())
            .replace("{c}", &unchanged.to_string())
    }
}
