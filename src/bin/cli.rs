#![cfg(not(tarpaulin_include))]

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::fs;
use std::path::PathBuf;

use catalog::downloader;
use catalog::filter::{self, FilterState, UpsertMarks, ViewMode};
use catalog::i18n::Text;
use catalog::loader;
use catalog::pricing::{self, PricingRule};
use catalog::quote::{PriceRules, QuoteRequest};
use catalog::render;
use catalog::upsert::{self, UpsertPlan};
use catalog::{Config, Field, Language};

#[derive(Parser)]
#[command(name = "catalog", about = "Coatings & flooring catalog tools")]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 中文 / English
    #[arg(long, global = true)]
    lang: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the filtered product list
    List(FilterArgs),
    /// Export the filtered product list as a PDF catalog
    Pdf {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Preview (and optionally apply) an update sheet
    Upsert {
        file: PathBuf,
        /// Back up the stored table and merge the update
        #[arg(long)]
        apply: bool,
    },
    /// Price a product code
    Quote {
        code: String,
        #[arg(long, default_value_t = 1)]
        qty: u32,
        #[arg(long)]
        fast: bool,
        #[arg(long)]
        premium: bool,
        #[arg(long, default_value_t = 0.0)]
        discount: f64,
    },
    /// Generate a priced sheet from a product CSV
    PriceSheet {
        file: PathBuf,
        #[arg(long, default_value_t = 25.0)]
        markup: f64,
        #[arg(long, default_value_t = 10)]
        step: u32,
        #[arg(long, value_enum, default_value_t = SheetFormat::Csv)]
        format: SheetFormat,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SheetFormat {
    Csv,
    Md,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Free-text search over all columns
    #[arg(short, long, default_value = "")]
    query: String,
    /// Column filter as FIELD=VALUE; repeat to allow several values
    #[arg(short = 'f', long = "filter", value_parser = parse_selection)]
    filters: Vec<(Field, String)>,
}

impl FilterArgs {
    fn state(&self) -> FilterState {
        let mut state = FilterState {
            query: self.query.clone(),
            view: ViewMode::All,
            ..Default::default()
        };
        for (field, value) in &self.filters {
            state
                .selections
                .entry(*field)
                .or_default()
                .insert(value.clone());
        }
        state
    }
}

fn parse_selection(raw: &str) -> Result<(Field, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got {}", raw))?;
    let field = Field::parse(name).ok_or_else(|| format!("unknown field: {}", name))?;
    Ok((field, value.to_string()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let language = match cli.lang.as_deref() {
        Some(l) => Language::parse(l).ok_or_else(|| format!("unknown language: {}", l))?,
        None => config.default_language,
    };
    let store = config.store();

    match cli.command {
        Command::List(args) => {
            let ensured = store.ensure()?;
            if ensured.created {
                println!(
                    "{}",
                    language
                        .text(Text::SampleCreated)
                        .replace("{f}", &store.path().display().to_string())
                );
            }
            let visible = filter::apply(&ensured.table, &args.state(), &UpsertMarks::default());
            println!("{}", language.text(Text::ProductList).replace("{n}", &visible.len().to_string()));
            for record in visible {
                println!();
                println!("{}", language.label_pair(Field::Model, &record.model));
                for line in render::detail_lines(record, language) {
                    println!("  {}", line);
                }
            }
        }
        Command::Pdf { filter, out } => {
            let table = store.ensure()?.table;
            let visible = filter::apply(&table, &filter.state(), &UpsertMarks::default());
            let bytes = render::render_catalog(&visible, &config.render_options(language))?;
            let out = out.unwrap_or_else(|| PathBuf::from(language.text(Text::CatalogFileName)));
            fs::write(&out, bytes)?;
            info!("wrote {}", out.display());
        }
        Command::Upsert { file, apply } => {
            let existing = store.ensure()?.table;
            let raw = loader::load_path(&file)?;
            let plan = match UpsertPlan::prepare(&existing, &raw) {
                Ok(plan) => plan,
                Err(catalog::CatalogError::MissingColumns(cols)) => {
                    return Err(format!("{}{}", language.text(Text::MissingColumns), cols.join("、")).into());
                }
                Err(e) => return Err(e.into()),
            };
            let (inserts, updates, unchanged) = plan.preview.counts();
            println!("{}", language.diff_summary(inserts, updates, unchanged));

            if apply {
                let outcome = upsert::apply(&store, &existing, &plan)?;
                if let Some(backup) = outcome.backup {
                    println!("{}{}", language.text(Text::BackupCreated), backup.display());
                }
                println!("{}", language.text(Text::UpdateDone));
            }
        }
        Command::Quote {
            code,
            qty,
            fast,
            premium,
            discount,
        } => {
            let request = QuoteRequest {
                code,
                quantity: qty,
                fast,
                premium,
                discount_pct: discount,
            };
            request.validate()?;
            let result = PriceRules::default().quote(&request)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::PriceSheet {
            file,
            markup,
            step,
            format,
            out,
        } => {
            let raw = loader::load_path(&file)?;
            let rule = PricingRule {
                markup_pct: markup,
                rounding_step: step,
            };
            let rows = pricing::build(&raw, &rule)?;
            let (bytes, default_name) = match format {
                SheetFormat::Csv => (downloader::price_sheet_to_csv(&rows)?, "price_sheet.csv"),
                SheetFormat::Md => (
                    downloader::price_sheet_to_markdown(&rows, "Product Catalog").into_bytes(),
                    "catalog.md",
                ),
            };
            let out = out.unwrap_or_else(|| PathBuf::from(default_name));
            fs::write(&out, bytes)?;
            info!("wrote {} priced rows to {}", rows.len(), out.display());
        }
    }

    Ok(())
}
