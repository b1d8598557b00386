use catalog::downloader;
use catalog::loader;
use catalog::pricing::{self, PricingRule};
use catalog::CatalogError;

const UPLOAD: &str = "sku,name,description,base_price,features,image_url\n\
                      T-01,Trail Shirt,Light shirt,280,透氣;快乾;耐磨;保暖,https://example.com/t01.png\n\
                      T-02,Trail Cap,,not a price,遮陽,\n\
                      T-03,Trail Jacket,Warm layer,1234.5,防水; 保暖 ;;透氣;輕量,\n";

#[test]
fn csv_upload_to_priced_csv() {
    let raw = loader::load_bytes("products.csv", UPLOAD.as_bytes()).unwrap();
    let rule = PricingRule {
        markup_pct: 25.0,
        rounding_step: 10,
    };
    let rows = pricing::build(&raw, &rule).unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].selling_price, 350);
    assert_eq!(rows[0].top_features, "透氣; 快乾; 耐磨");
    assert_eq!(rows[1].selling_price, 0);
    assert_eq!(rows[2].selling_price, 1540);
    assert_eq!(rows[2].top_features, "防水; 保暖; 透氣");

    let csv = String::from_utf8(downloader::price_sheet_to_csv(&rows).unwrap()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("T-01,Trail Shirt,Light shirt,280,350,"));
}

#[test]
fn markdown_catalog_has_a_section_per_row() {
    let raw = loader::load_bytes("products.csv", UPLOAD.as_bytes()).unwrap();
    let rows = pricing::build(&raw, &PricingRule::default()).unwrap();
    let md = downloader::price_sheet_to_markdown(&rows, "Product Catalog");

    assert_eq!(md.matches("\n## ").count(), 3);
    assert!(md.contains("![Trail Shirt](https://example.com/t01.png)"));
    assert!(md.contains("- 遮陽\n"));
}

#[test]
fn step_multiples_hold_for_common_steps() {
    for step in [1u32, 10, 50, 100] {
        let rule = PricingRule {
            markup_pct: 18.0,
            rounding_step: step,
        };
        for base in [0.0, 3.3, 280.0, 1999.99] {
            let price = rule.selling_price(base);
            assert!(price >= 0);
            assert_eq!(price % i64::from(step), 0);
        }
    }
}

#[test]
fn csv_without_base_price_is_rejected() {
    let raw = loader::load_bytes("products.csv", b"sku,name\nA,B\n").unwrap();
    match pricing::build(&raw, &PricingRule::default()) {
        Err(CatalogError::MissingColumns(cols)) => assert_eq!(cols, vec!["base_price"]),
        other => panic!("unexpected result: {:?}", other),
    }
}
