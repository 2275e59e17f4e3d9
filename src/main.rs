//! Command-line front end: import a worksheet into a DuckDB table, or preview it.
use anyhow::Context;
use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use sheet_loader::config::ImportConfig;
use sheet_loader::config::StorageConfig;
use sheet_loader::config::DATABASE_ENV;
use sheet_loader::config::MEMORY_DATABASE;
use sheet_loader::config::TABLE_ENV;
use sheet_loader::database::DuckDbConnector;
use sheet_loader::logging::init_logging;
use sheet_loader::spreadsheet;
use sheet_loader::spreadsheet::ReadOptions;
use sheet_loader::Importer;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheet-loader")]
#[command(about = "Load spreadsheet rows into relational tables")]
#[command(version)]
#[command(long_about = "
Sheet Loader - import an Excel worksheet into a DuckDB table

The first row of the sheet is the header. Column names are sanitized and column
types (text, number, date) are inferred from the data rows. An existing table is
appended to when it has the same columns; otherwise a new table <NAME>_<n> is created.

EXAMPLES:
  sheet-loader import sales.xlsx --database sales.duckdb
  sheet-loader import report.xlsx --sheet 'Q*' --table quarterly --pretty
  sheet-loader preview sales.xlsx --rows 5
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Import a worksheet and print the report as JSON
    Import(ImportArgs),
    /// Print the first rows of a worksheet
    Preview(PreviewArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// Workbook to read (.xlsx or .xlsm)
    file: PathBuf,

    /// Target table name; defaults to the file name
    #[arg(short, long, env = TABLE_ENV)]
    table: Option<String>,

    /// Glob pattern of the worksheet; defaults to the first sheet
    #[arg(short, long)]
    sheet: Option<String>,

    /// DuckDB database file
    #[arg(short, long, env = DATABASE_ENV, default_value = MEMORY_DATABASE)]
    database: PathBuf,

    /// Import fully empty rows as rows of nulls
    #[arg(long)]
    keep_empty_rows: bool,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct PreviewArgs {
    /// Workbook to read (.xlsx or .xlsm)
    file: PathBuf,

    /// Glob pattern of the worksheet; defaults to the first sheet
    #[arg(short, long)]
    sheet: Option<String>,

    /// Number of rows to print, header included
    #[arg(short, long, default_value_t = 10)]
    rows: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet)?;

    match cli.command {
        Command::Import(args) => import(args),
        Command::Preview(args) => preview(args),
    }
}

fn import(args: ImportArgs) -> Result<()> {
    let storage = StorageConfig::new(args.database);
    if storage.is_in_memory() {
        tracing::warn!("Importing into an in-memory database, the table is discarded on exit");
    }
    let connector = DuckDbConnector::open(&storage)?;
    let importer = Importer::new(ImportConfig {
        default_table: args.table,
        skip_empty_rows: !args.keep_empty_rows,
    });

    let report = importer
        .import_file(&connector, &args.file, args.sheet.as_deref())
        .with_context(|| format!("Import of {} failed", args.file.display()))?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);
    Ok(())
}

fn preview(args: PreviewArgs) -> Result<()> {
    let options = ReadOptions {
        sheet_name: args.sheet,
        ..ReadOptions::default()
    };
    let sheet = spreadsheet::read_sheet(&args.file, &options)
        .with_context(|| format!("Cannot read {}", args.file.display()))?;

    for row in sheet.preview(args.rows) {
        let line = row.iter().map(ToString::to_string).collect::<Vec<_>>().join("\t");
        println!("{}", line);
    }
    Ok(())
}
