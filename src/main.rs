use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use sql_lineage::commands::config::{read_config, LineageConfig};
use sql_lineage::commands::inspect::{self, SqlInput};
use sql_lineage::commands::lineage;
use sql_lineage::logging;

/// sqll CLI - table lineage for SQL jobs
#[derive(Parser)]
#[clap(name = "sqll", about = "Table-level lineage extraction for SQL", version)]
struct Cli {
    /// Path to lineage_project.yaml (defaults to the current directory)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[clap(long, global = true)]
    log_level: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

/// SQL passed inline or read from a file
#[derive(Args)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// SQL text
    #[clap(long)]
    sql: Option<String>,

    /// SQL file, or a job script with embedded SQL
    #[clap(short, long)]
    file: Option<PathBuf>,
}

impl InputArgs {
    fn into_input(self) -> SqlInput {
        match (self.sql, self.file) {
            (Some(sql), _) => SqlInput::Text(sql),
            (None, Some(file)) => SqlInput::File(file),
            (None, None) => SqlInput::Text(String::new()),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List the tables a query reads from
    Tables {
        #[clap(flatten)]
        input: InputArgs,

        /// Keep catalog.schema.table names
        #[clap(long)]
        catalog_aware: bool,

        /// Output format (text, json)
        #[clap(long, default_value = "text")]
        format: String,
    },

    /// Show the LIMIT of a query or rewrite it
    Limit {
        #[clap(flatten)]
        input: InputArgs,

        /// New limit to apply
        #[clap(long)]
        set: Option<u64>,
    },

    /// Wrap a query in CREATE TABLE ... AS
    Ctas {
        #[clap(flatten)]
        input: InputArgs,

        /// Name of the table to create
        #[clap(short, long)]
        table: String,

        /// Drop the table first
        #[clap(long)]
        overwrite: bool,
    },

    /// Show the statement type of a query
    Classify {
        #[clap(flatten)]
        input: InputArgs,
    },

    /// Split input into statements
    Statements {
        #[clap(flatten)]
        input: InputArgs,
    },

    /// Build table lineage for a directory of SQL jobs
    Lineage {
        /// Directory or job file to scan (defaults to sql_path from the config)
        #[clap(short, long)]
        path: Option<PathBuf>,

        /// Output format for the graph (text, json, dot)
        #[clap(long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn run(command: Command, config: &LineageConfig) -> anyhow::Result<()> {
    match command {
        Command::Tables {
            input,
            catalog_aware,
            format,
        } => inspect::tables_command(&input.into_input(), catalog_aware, &format, config),
        Command::Limit { input, set } => inspect::limit_command(&input.into_input(), set, config),
        Command::Ctas {
            input,
            table,
            overwrite,
        } => inspect::ctas_command(&input.into_input(), &table, overwrite, config),
        Command::Classify { input } => inspect::classify_command(&input.into_input(), config),
        Command::Statements { input } => inspect::statements_command(&input.into_input(), config),
        Command::Lineage { path, format } => {
            let path = path.unwrap_or_else(|| PathBuf::from(&config.sql_path));
            lineage::lineage_command(&path, &format, config)
        }
        Command::Version => {
            println!("sqll version {}", env!("CARGO_PKG_VERSION"));
            println!("{}", env!("CARGO_PKG_DESCRIPTION"));
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match read_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(1);
        }
    };

    if let Err(err) = logging::init_logging(cli.log_level.as_deref(), &config.log_level) {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }

    if let Err(err) = run(cli.command, &config) {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}
