use serde::{Deserialize, Serialize};

/// A column of the product table
///
/// The storage file uses the Chinese header names returned by [`Field::header`];
/// the declaration order here is the column order of the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    Series,
    Model,
    Color,
    Composition,
    Thickness,
    Method,
    Performance,
    Applications,
    Certifications,
    Spec,
    ImagePath,
}

/// All required columns, in storage order
pub const REQUIRED_FIELDS: [Field; 11] = [
    Field::Series,
    Field::Model,
    Field::Color,
    Field::Composition,
    Field::Thickness,
    Field::Method,
    Field::Performance,
    Field::Applications,
    Field::Certifications,
    Field::Spec,
    Field::ImagePath,
];

/// Columns offered as multi-value filters
pub const FILTER_FIELDS: [Field; 7] = [
    Field::Series,
    Field::Composition,
    Field::Thickness,
    Field::Method,
    Field::Applications,
    Field::Certifications,
    Field::Color,
];

/// Fields printed under the model line, in print order
pub const DETAIL_FIELDS: [Field; 9] = [
    Field::Series,
    Field::Color,
    Field::Composition,
    Field::Thickness,
    Field::Method,
    Field::Performance,
    Field::Applications,
    Field::Certifications,
    Field::Spec,
];

impl Field {
    /// Column header as stored in the spreadsheet
    pub fn header(self) -> &'static str {
        match self {
            Field::Series => "系列",
            Field::Model => "型號",
            Field::Color => "顏色",
            Field::Composition => "成分",
            Field::Thickness => "厚度",
            Field::Method => "施工方式",
            Field::Performance => "性能指標",
            Field::Applications => "適用環境",
            Field::Certifications => "認證",
            Field::Spec => "規格說明",
            Field::ImagePath => "圖片路徑",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        REQUIRED_FIELDS.into_iter().find(|f| f.header() == header)
    }

    /// Accepts a storage header or the English field name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        Self::from_header(name).or_else(|| {
            let lower = name.trim().to_lowercase();
            REQUIRED_FIELDS
                .into_iter()
                .find(|f| format!("{:?}", f).to_lowercase() == lower)
        })
    }
}

/// One product row; every attribute is plain text
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub series: String,
    pub model: String,
    pub color: String,
    pub composition: String,
    pub thickness: String,
    pub method: String,
    pub performance: String,
    pub applications: String,
    pub certifications: String,
    pub spec: String,
    pub image_path: String,
}

impl ProductRecord {
    /// Build a record from values given in storage column order
    pub fn from_values<S: AsRef<str>>(values: &[S]) -> Self {
        let mut record = ProductRecord::default();
        for (field, value) in REQUIRED_FIELDS.iter().zip(values) {
            record.set(*field, value.as_ref());
        }
        record
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Series => &self.series,
            Field::Model => &self.model,
            Field::Color => &self.color,
            Field::Composition => &self.composition,
            Field::Thickness => &self.thickness,
            Field::Method => &self.method,
            Field::Performance => &self.performance,
            Field::Applications => &self.applications,
            Field::Certifications => &self.certifications,
            Field::Spec => &self.spec,
            Field::ImagePath => &self.image_path,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Series => self.series = value,
            Field::Model => self.model = value,
            Field::Color => self.color = value,
            Field::Composition => self.composition = value,
            Field::Thickness => self.thickness = value,
            Field::Method => self.method = value,
            Field::Performance => self.performance = value,
            Field::Applications => self.applications = value,
            Field::Certifications => self.certifications = value,
            Field::Spec => self.spec = value,
            Field::ImagePath => self.image_path = value,
        }
    }

    /// Natural key: `series|model`, lowercased, trimmed at both ends
    ///
    /// Only the joined string is trimmed, so spaces next to the `|` count.
    pub fn natural_key(&self) -> String {
        normalize_key(&format!("{}|{}", self.series, self.model))
    }

    /// Values in storage column order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        REQUIRED_FIELDS.iter().map(move |f| self.get(*f))
    }

    /// True when every required column holds the same text in both records
    pub fn same_values(&self, other: &ProductRecord) -> bool {
        REQUIRED_FIELDS.iter().all(|f| self.get(*f) == other.get(*f))
    }

    /// Space-joined values, lowercased, as matched by free-text search
    pub fn search_text(&self) -> String {
        self.values().collect::<Vec<_>>().join(" ").to_lowercase()
    }
}

pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_key_is_case_and_outer_whitespace_insensitive() {
        let a = ProductRecord::from_values(&["環氧樹脂", "EPX-1000"]);
        let b = ProductRecord::from_values(&[" 環氧樹脂", "epx-1000  "]);
        assert_eq!(a.natural_key(), "環氧樹脂|epx-1000");
        assert_eq!(a.natural_key(), b.natural_key());
    }

    #[test]
    fn natural_key_keeps_spaces_around_separator() {
        let padded = ProductRecord::from_values(&["A ", "B"]);
        let tight = ProductRecord::from_values(&["A", "B"]);
        assert_eq!(padded.natural_key(), "a |b");
        assert_ne!(padded.natural_key(), tight.natural_key());
    }

    #[test]
    fn values_follow_storage_order() {
        let values: Vec<String> = (0..11).map(|i| format!("v{}", i)).collect();
        let record = ProductRecord::from_values(&values);
        assert_eq!(record.get(Field::Certifications), "v8");
        assert_eq!(record.values().last(), Some("v10"));
    }

    #[test]
    fn parses_headers_and_english_names() {
        assert_eq!(Field::parse("施工方式"), Some(Field::Method));
        assert_eq!(Field::parse("composition"), Some(Field::Composition));
        assert_eq!(Field::parse("price"), None);
    }
}
