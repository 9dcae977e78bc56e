use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;

use lab_report_engine::assembly::{classify_report, ReportSummary};
use lab_report_engine::billing::Invoice;
use lab_report_engine::config::EngineConfig;
use lab_report_engine::output;
use lab_report_engine::panels::{Derived, RawValues};
use lab_report_engine::store::{open_store, ReportStore};
use lab_report_engine::{classify, compute_derived, Assembler, LimsError, ReportDraft, TestCatalog};

#[derive(Parser)]
#[command(name = "lab_report")]
#[command(about = "Laboratory report engine: derived values, range flags and result assembly")]
struct Cli {
    /// Engine configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Test catalog file (JSON or CSV), overrides the configured one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a report draft into its result list
    Assemble {
        /// Report draft (JSON)
        draft: PathBuf,

        /// Directory for results.csv, summary.json and report.md
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Persist the assembled report in the configured store
        #[arg(long)]
        save: bool,
    },

    /// Classify one value against a reference range
    Classify { value: String, range: String },

    /// Print the derived fields of a panel
    Derive {
        /// Panel code, e.g. FBC or LIPID
        panel: String,

        /// Form values as key=value
        #[arg(short, long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Price the selected tests
    Invoice {
        #[arg(short, long)]
        patient: String,

        /// Test codes, comma separated
        #[arg(value_delimiter = ',', required = true)]
        codes: Vec<String>,

        /// Discount in percent; defaults to the configured discount
        #[arg(short, long)]
        discount: Option<f64>,
    },

    /// List the test catalog
    Catalog,

    /// Print a stored report
    Show { id: String },

    /// List stored reports
    Reports,

    /// Edit a stored report; without a draft, print its current values as one
    Edit {
        id: String,

        /// Edited report draft (JSON)
        draft: Option<PathBuf>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    Ok((key.trim().to_string(), value.to_string()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => EngineConfig::default(),
    };

    let catalog = load_catalog(cli.catalog.as_ref().or(config.catalog.as_ref()))?;

    match cli.command {
        Command::Assemble { draft, output, save } => {
            let mut store = open_store(&config.store).context("Failed to open report store")?;
            run_assemble(&config, &catalog, store.as_mut(), draft, output, save)
        }
        Command::Classify { value, range } => {
            let verdict = classify(&value, &range);
            println!("{}", verdict.label().unwrap_or("Indeterminate"));
            Ok(())
        }
        Command::Derive { panel, fields } => {
            let raw: RawValues = fields.into_iter().collect();
            for (field, derived) in compute_derived(&panel, &raw) {
                match derived {
                    Derived::Value(value) => println!("{} = {}", field, value),
                    Derived::ManualEntry => println!("{} = (manual entry required)", field),
                }
            }
            Ok(())
        }
        Command::Invoice {
            patient,
            codes,
            discount,
        } => {
            let discount = discount.unwrap_or(config.default_discount_percent);
            let invoice = Invoice::build(&catalog, &patient, &codes, discount, &config.currency)?;
            println!("{}", serde_json::to_string_pretty(&invoice)?);
            Ok(())
        }
        Command::Catalog => {
            for panel in catalog.panels() {
                println!(
                    "{:<10} {:<40} {:>10.2} {}",
                    panel.code,
                    panel.name,
                    panel.price,
                    if panel.is_multi_component() {
                        format!("{} components", panel.components.len())
                    } else {
                        panel.unit.clone()
                    }
                );
            }
            Ok(())
        }
        Command::Show { id } => {
            let store = open_store(&config.store).context("Failed to open report store")?;
            let stored = store.get(&id)?;
            let classified = classify_report(&stored.report.results);
            let summary = ReportSummary::from_classified(&classified);
            println!("{}", output::render_markdown(&stored.report, &classified, &summary));
            Ok(())
        }
        Command::Reports => {
            let store = open_store(&config.store).context("Failed to open report store")?;
            for stored in store.list()? {
                println!(
                    "{:<10} {:<12} {} {} results",
                    stored.id,
                    stored.report.patient_id,
                    stored.report.date,
                    stored.report.results.len()
                );
            }
            Ok(())
        }
        Command::Edit { id, draft } => {
            let mut store = open_store(&config.store).context("Failed to open report store")?;
            run_edit(&config, &catalog, store.as_mut(), &id, draft)
        }
    }
}

fn load_catalog(path: Option<&PathBuf>) -> anyhow::Result<TestCatalog> {
    match path {
        Some(path) => {
            let catalog = TestCatalog::from_file(path)
                .with_context(|| format!("Failed to load test catalog from {:?}", path))?;
            info!("Loaded {} tests from {:?}", catalog.len(), path);
            Ok(catalog)
        }
        None => {
            warn!("No test catalog configured; only built-in panels have units and ranges");
            Ok(TestCatalog::default())
        }
    }
}

fn run_assemble(
    config: &EngineConfig,
    catalog: &TestCatalog,
    store: &mut dyn ReportStore,
    draft_path: PathBuf,
    output_dir: Option<PathBuf>,
    save: bool,
) -> anyhow::Result<()> {
    let draft = ReportDraft::from_file(&draft_path)
        .with_context(|| format!("Failed to load report draft from {:?}", draft_path))?;

    let assembler = Assembler::new(catalog, config.range_source);
    let results = match assembler.assemble(&draft) {
        Ok(results) => results,
        Err(LimsError::NothingToSave) => bail!("No values entered for the selected tests; nothing saved"),
        Err(e) => return Err(e.into()),
    };

    let report = draft.to_report(results, chrono::Local::now().date_naive());

    let classified = classify_report(&report.results);
    let summary = ReportSummary::from_classified(&classified);
    info!(
        "{} results: {} normal, {} abnormal, {} not classified",
        summary.total, summary.normal, summary.abnormal, summary.indeterminate
    );

    match output_dir {
        Some(dir) => output::save_report(&report, &classified, &dir)?,
        None => println!("{}", serde_json::to_string_pretty(&report.results)?),
    }

    if save {
        let id = store.save(report)?;
        println!("Saved report {}", id);
    }

    Ok(())
}

fn run_edit(
    config: &EngineConfig,
    catalog: &TestCatalog,
    store: &mut dyn ReportStore,
    id: &str,
    draft_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let Some(draft_path) = draft_path else {
        let stored = store.get(id)?;
        let draft = ReportDraft::from_report(&stored.report);
        println!("{}", serde_json::to_string_pretty(&draft)?);
        return Ok(());
    };

    let draft = ReportDraft::from_file(&draft_path)
        .with_context(|| format!("Failed to load report draft from {:?}", draft_path))?;
    Assembler::new(catalog, config.range_source)
        .save_edit(store, id, &draft)
        .with_context(|| format!("Failed to update report {}", id))?;

    println!("Updated report {}", id);
    Ok(())
}
