/*!
# Coatings & Flooring Catalog

A spreadsheet-driven product catalog for coatings and industrial flooring,
with a browser front end and a command-line companion, built in Rust.

## Overview

The product list lives in a single Excel workbook. The application lists and
filters it, exports the filtered list as a paginated PDF catalog, merges
uploaded update sheets into it by natural key, and offers a small pricing
desk: instant quotes from a static price-rule table and a markup-based price
sheet generated from an uploaded CSV.

## Architecture

### Data Layer
- **Records**: eleven plain-text columns per product, keyed by `series|model`
- **Table store**: whole-table xlsx load/save, sample creation, timestamped backups
- **Loader**: xlsx (first worksheet) and CSV readers, from disk or memory

### Logic Layer
- **Filter engine**: free-text search, multi-value column filters, view modes
- **Upsert merger**: insert/update/unchanged preview, backup-then-merge apply
- **Catalog renderer**: A4 pagination with images or placeholders
- **Quote calculator** and **price sheet builder**

### Web Layer (feature `web`)
- **Technologies**: axum, tower-http
- Session context kept per browser in an explicit store, identified by cookie
- Every artifact (PDF, CSV, markdown, xlsx) is produced in memory for download

## Modules

- **record**: product columns, records and natural keys
- **table**: the product table, column validation and sample data
- **loader**: xlsx/CSV import into raw tables
- **saving**: xlsx export, backups and the on-disk table store
- **filter**: search and column filters
- **upsert**: key-based merge of uploaded sheets
- **render**: PDF catalog layout and drawing
- **quote**: price rules and quotes
- **pricing**: markup pricing and feature trimming
- **downloader**: CSV, markdown and xlsx exports
- **session**: per-session state
- **i18n**: Chinese/English labels and messages
- **config**: runtime settings
- **app**: routing and handlers

## REST API Endpoints

- `/api/products` - Filtered product list with facets
- `/api/filter`, `/api/language` - Update the session's filter or language
- `/api/catalog.pdf`, `/api/products.xlsx` - Download the filtered list
- `/api/upsert/preview`, `/api/upsert/apply` - Batch update / insert
- `/api/quote`, `/api/quotes.csv` - Quotes
- `/api/price-sheet` - Priced CSV or markdown catalog
*/

pub mod config;
pub mod downloader;
pub mod error;
pub mod filter;
pub mod i18n;
pub mod loader;
pub mod pricing;
pub mod quote;
pub mod record;
pub mod render;
pub mod saving;
pub mod session;
pub mod table;
pub mod upsert;

#[cfg(feature = "web")]
pub mod app;

pub use config::Config;
pub use error::{CatalogError, Result};
pub use i18n::Language;
pub use record::{Field, ProductRecord};
pub use saving::TableStore;
pub use table::ProductTable;
