//! `opd`: command-line front end for clinic visit entry.
//!
//! Marshals raw arguments into the core [`FormController`] and prints status.
//! Configuration comes from `OPD_*` environment variables, optionally loaded
//! from a `.env` file.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use opd_core::helpers::{format_date, parse_date};
use opd_core::{
    ClinicConfig, Database, FormController, RawForm, Record, TextReportRenderer, WorkbookSink,
};
use tracing_subscriber::prelude::*;

type Controller = FormController<WorkbookSink, TextReportRenderer>;

#[derive(Parser)]
#[command(name = "opd")]
#[command(about = "OPD clinic visit records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and save a visit, then append it to the monthly workbook
    Add(AddArgs),
    /// List saved visits, newest first
    List {
        /// Calendar month as YYYY-MM
        #[arg(long, conflicts_with_all = ["from", "to"])]
        month: Option<String>,
        /// First visit date (DD/MM/YYYY), inclusive
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Last visit date (DD/MM/YYYY), inclusive
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Number of saved visits
    Count,
    /// Delete a visit by id (workbooks are left untouched)
    Delete { id: i64 },
    /// Write a printable report for a saved visit
    Report { id: i64 },
    /// Regenerate every monthly workbook from the database
    RebuildWorkbooks,
    /// Save a JSON array of visits in one transaction
    Import { file: PathBuf },
}

#[derive(clap::Args, Debug)]
struct AddArgs {
    /// Visit date (DD/MM/YYYY), defaults to today
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    opd_no: String,
    #[arg(long)]
    name: String,
    /// Father or husband name
    #[arg(long)]
    father_name: String,
    #[arg(long)]
    age: String,
    /// Male or Female
    #[arg(long, default_value = "Female")]
    gender: String,
    /// National ID, 13 digits with or without dashes
    #[arg(long)]
    cnic: Option<String>,
    /// Address line; repeat for multiple lines
    #[arg(long, required = true)]
    address: Vec<String>,
    /// Temperature in °F
    #[arg(long, default_value = "98.6")]
    temperature: String,
    /// Blood pressure as systolic/diastolic
    #[arg(long, default_value = "120/80")]
    bp: String,
    /// Weight in kg
    #[arg(long)]
    weight: Option<String>,
    /// Blood glucose in mg/dl
    #[arg(long)]
    diabetic: Option<String>,
    /// Normal or Urgent
    #[arg(long, default_value = "Normal")]
    fees: String,
    /// Also write a printable report
    #[arg(long)]
    report: bool,
}

impl AddArgs {
    fn into_form(self, today: NaiveDate) -> RawForm {
        let mut form = RawForm::blank(today);
        if let Some(date) = self.date {
            form.date = date;
        }
        form.opd_no = self.opd_no;
        form.name = self.name;
        form.father_name = self.father_name;
        form.age = self.age;
        form.gender = self.gender;
        form.cnic = self.cnic.unwrap_or_default();
        form.address = self.address.join("\n");
        form.temperature = self.temperature;
        form.bp = self.bp;
        form.weight = self.weight.unwrap_or_default();
        form.diabetic = self.diabetic.unwrap_or_default();
        form.fees_type = self.fees;
        form
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("opd=info,opd_core=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ClinicConfig::from_env()?;
    tracing::debug!(?config, "resolved configuration");

    let mut controller = open_controller(&config)?;

    match cli.command {
        Commands::Add(args) => {
            let wants_report = args.report;
            let form = args.into_form(Local::now().date_naive());
            let saved = controller.save(&form)?;
            println!(
                "Saved visit {} ({}) as id {}",
                saved.record.opd_no,
                format_date(saved.record.date),
                saved.record.id().unwrap_or_default()
            );
            println!("Workbook: {}", saved.workbook.display());
            if wants_report {
                let path = controller.generate_report(&saved.record)?;
                println!("Report: {}", path.display());
            }
        }
        Commands::List {
            month,
            from,
            to,
            json,
        } => {
            let store = controller.store();
            let records = match (month, from, to) {
                (Some(month), _, _) => {
                    let (year, month) = parse_month(&month)?;
                    store.fetch_by_month(year, month)?
                }
                (None, Some(from), Some(to)) => {
                    store.fetch_between(parse_cli_date(&from)?, parse_cli_date(&to)?)?
                }
                _ => store.fetch_all()?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_table(&records);
            }
        }
        Commands::Count => {
            println!("{}", controller.store().count()?);
        }
        Commands::Delete { id } => {
            if controller.store().delete(id)? {
                println!("Deleted visit {}", id);
            } else {
                println!("No visit with id {}", id);
            }
        }
        Commands::Report { id } => {
            let record = controller
                .store()
                .get(id)?
                .with_context(|| format!("No visit with id {}", id))?;
            let path = controller.generate_report(&record)?;
            println!("Report: {}", path.display());
        }
        Commands::RebuildWorkbooks => {
            let records = controller.store().fetch_all()?;
            let backup = controller.sink().rebuild_from(&records)?;
            println!(
                "Rebuilt workbooks from {} visits; previous files in {}",
                records.len(),
                backup.display()
            );
        }
        Commands::Import { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Could not read {}", file.display()))?;
            let records: Vec<Record> = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a JSON array of visits", file.display()))?;
            let saved = controller.import(records)?;
            println!("Imported {} visits", saved.len());
        }
    }

    Ok(())
}

fn open_controller(config: &ClinicConfig) -> anyhow::Result<Controller> {
    let db = Database::open(config.database_path())
        .with_context(|| format!("Could not open {}", config.database_path().display()))?;
    let sink = WorkbookSink::with_prefix(config.data_dir(), config.workbook_prefix())?;
    let renderer = TextReportRenderer::new(config.reports_dir(), config.clinic().clone());
    Ok(FormController::new(db, sink, renderer))
}

/// Parse `YYYY-MM`.
fn parse_month(value: &str) -> anyhow::Result<(i32, u32)> {
    let Some((year, month)) = value.trim().split_once('-') else {
        bail!("Month must look like YYYY-MM, got {:?}", value);
    };
    let year: i32 = year
        .parse()
        .with_context(|| format!("Invalid year in {:?}", value))?;
    let month: u32 = month
        .parse()
        .with_context(|| format!("Invalid month in {:?}", value))?;
    if !(1..=12).contains(&month) {
        bail!("Month must be between 01 and 12, got {:?}", value);
    }
    Ok((year, month))
}

fn parse_cli_date(value: &str) -> anyhow::Result<NaiveDate> {
    parse_date(value.trim())
        .with_context(|| format!("Date must follow DD/MM/YYYY, got {:?}", value))
}

fn print_table(records: &[Record]) {
    if records.is_empty() {
        println!("No visits found.");
        return;
    }
    println!(
        "{:>5}  {:<10}  {:<10}  {:<24}  {:>3}  {:<6}  {}",
        "ID", "Date", "OPD No", "Name", "Age", "Gender", "Fees"
    );
    for record in records {
        println!(
            "{:>5}  {:<10}  {:<10}  {:<24}  {:>3}  {:<6}  {}",
            record.id().unwrap_or_default(),
            format_date(record.date),
            record.opd_no,
            record.name,
            record.age,
            record.gender,
            record.fees_type.label()
        );
    }
}
