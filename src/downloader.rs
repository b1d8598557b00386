use std::fmt::Write as _;

use crate::error::{CatalogError, Result};
use crate::pricing::PriceSheetRow;
use crate::quote::{QuoteRequest, QuoteResult};
use crate::record::ProductRecord;
use crate::saving::table_to_xlsx;
use crate::table::ProductTable;

/// Export quotes as CSV, one line per request with its computed result
///
/// # Examples
/// ```
/// use catalog::downloader::quotes_to_csv;
/// use catalog::quote::{quote, QuoteRequest};
///
/// let request = QuoteRequest { code: "A100".into(), quantity: 2, fast: false, premium: false, discount_pct: 0.0 };
/// let result = quote(&request).unwrap();
/// let csv = quotes_to_csv(&[(request, result)]).unwrap();
/// assert!(String::from_utf8(csv).unwrap().starts_with("code,quantity"));
/// ```
pub fn quotes_to_csv(quotes: &[(QuoteRequest, QuoteResult)]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "code",
        "quantity",
        "fast",
        "premium",
        "discount_pct",
        "unit_price",
        "subtotal",
        "discount_amount",
        "total",
        "lead_days",
        "margin",
    ])?;

    for (request, result) in quotes {
        writer.write_record([
            request.code.clone(),
            request.quantity.to_string(),
            request.fast.to_string(),
            request.premium.to_string(),
            request.discount_pct.to_string(),
            format!("{:.2}", result.unit_price),
            format!("{:.2}", result.subtotal),
            format!("{:.2}", result.discount_amount),
            format!("{:.2}", result.total),
            result.lead_days.to_string(),
            format!("{:.2}", result.margin),
        ])?;
    }

    finish(writer)
}

/// Export priced rows as CSV
pub fn price_sheet_to_csv(rows: &[PriceSheetRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "sku",
        "name",
        "description",
        "base_price",
        "selling_price",
        "top_features",
        "image_url",
    ])?;

    for row in rows {
        writer.write_record([
            row.sku.clone(),
            row.name.clone(),
            row.description.clone(),
            row.base_price.to_string(),
            row.selling_price.to_string(),
            row.top_features.clone(),
            row.image_url.clone().unwrap_or_default(),
        ])?;
    }

    finish(writer)
}

/// Render priced rows as a markdown catalog, one section per product
pub fn price_sheet_to_markdown(rows: &[PriceSheetRow], title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", title);

    for row in rows {
        let _ = writeln!(out, "## {} ({})\n", row.name, row.sku);
        if let Some(url) = &row.image_url {
            let _ = writeln!(out, "![{}]({})\n", row.name, url);
        }
        if !row.description.is_empty() {
            let _ = writeln!(out, "{}\n", row.description);
        }
        let _ = writeln!(out, "**Price:** {}\n", row.selling_price);
        let features: Vec<&str> = row.top_features.split("; ").filter(|f| !f.is_empty()).collect();
        if !features.is_empty() {
            for feature in features {
                let _ = writeln!(out, "- {}", feature);
            }
            out.push('\n');
        }
    }

    out
}

/// Export a subset of product rows as an xlsx workbook with the storage headers
pub fn records_to_xlsx(records: &[&ProductRecord]) -> Result<Vec<u8>> {
    let table = ProductTable::new(records.iter().map(|r| (*r).clone()).collect());
    table_to_xlsx(&table)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| CatalogError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sku: &str, features: &str, image_url: Option<&str>) -> PriceSheetRow {
        PriceSheetRow {
            sku: sku.to_string(),
            name: format!("Item {}", sku),
            description: String::new(),
            base_price: 280.0,
            selling_price: 350,
            top_features: features.to_string(),
            image_url: image_url.map(String::from),
        }
    }

    #[test]
    fn price_csv_quotes_fields_with_commas() {
        let mut r = row("S1", "a; b", None);
        r.description = "light, breathable".to_string();
        let text = String::from_utf8(price_sheet_to_csv(&[r]).unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("sku,name,description,base_price,selling_price,top_features,image_url")
        );
        assert_eq!(lines.next(), Some("S1,Item S1,\"light, breathable\",280,350,a; b,"));
    }

    #[test]
    fn markdown_lists_features_as_bullets() {
        let md = price_sheet_to_markdown(&[row("S1", "透氣; 快乾; 耐磨", Some("http://img/1.png"))], "Catalog");
        assert!(md.starts_with("# Catalog\n"));
        assert!(md.contains("## Item S1 (S1)"));
        assert!(md.contains("![Item S1](http://img/1.png)"));
        assert!(md.contains("**Price:** 350"));
        assert!(md.contains("- 透氣\n- 快乾\n- 耐磨\n"));
    }

    #[test]
    fn quote_csv_has_one_line_per_quote() {
        let request = QuoteRequest {
            code: "A100".to_string(),
            quantity: 100,
            fast: true,
            premium: false,
            discount_pct: 5.0,
        };
        let result = crate::quote::quote(&request).unwrap();
        let text = String::from_utf8(quotes_to_csv(&[(request, result)]).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("A100,100,true,false,5,1150.00,115000.00,5750.00,109250.00,5,0.28"));
    }
}
