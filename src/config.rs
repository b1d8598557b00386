use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};
use crate::i18n::Language;
use crate::render::RenderOptions;
use crate::saving::TableStore;

pub const DEFAULT_DATA_PATH: &str = "coatings_example.xlsx";
pub const DEFAULT_IMAGES_DIR: &str = "images";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Runtime settings shared by the web server and the command line
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "data_path": "data/catalog.xlsx", "font_path": "fonts/NotoSansTC.ttf" }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Spreadsheet holding the product table
    pub data_path: PathBuf,
    /// Directory created next to the data file for product images
    pub images_dir: PathBuf,
    pub bind_addr: String,
    /// TrueType font embedded into generated PDFs
    pub font_path: Option<PathBuf>,
    pub default_language: Language,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            font_path: None,
            default_language: Language::Chinese,
        }
    }
}

impl Config {
    /// Read settings from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| CatalogError::file_read(path.display().to_string(), e))?;
        serde_json::from_str(&contents).map_err(|e| CatalogError::file_read(path.display().to_string(), e))
    }

    /// Settings from `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn store(&self) -> TableStore {
        TableStore::new(&self.data_path, &self.images_dir)
    }

    pub fn render_options(&self, language: Language) -> RenderOptions {
        RenderOptions {
            language,
            base_dir: self.store().base_dir(),
            font_path: self.font_path.clone(),
            ..Default::default()
        }
    }
}
