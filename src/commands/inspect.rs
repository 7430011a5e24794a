//! Single-query commands: tables, limit, ctas, classify and statements

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::config::LineageConfig;
use super::lineage::load_job_sql;
use crate::sql_engine::{Extractor, ExtractorOptions, Flavor, StatementType};

/// Where a command reads its SQL from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlInput {
    Text(String),
    File(PathBuf),
}

impl SqlInput {
    pub fn read(&self, config: &LineageConfig) -> Result<String> {
        match self {
            Self::Text(sql) => Ok(sql.clone()),
            Self::File(path) => load_job_sql(path, config)?
                .ok_or_else(|| anyhow!("No SQL found in {}", path.display())),
        }
    }
}

fn build_extractor(
    input: &SqlInput,
    options: &ExtractorOptions,
    config: &LineageConfig,
) -> Result<Extractor> {
    let sql = input.read(config)?;
    Extractor::with_options(&sql, options).context("Failed to extract from SQL")
}

/// Run the tables command
pub fn tables_command(
    input: &SqlInput,
    catalog_aware: bool,
    format: &str,
    config: &LineageConfig,
) -> Result<()> {
    let mut options = config.extractor_options();
    if catalog_aware {
        options.flavor = Flavor::CatalogAware;
    }
    let extractor = build_extractor(input, &options, config)?;
    let tables = sorted_tables(&extractor);

    match format {
        "json" => {
            #[derive(Serialize)]
            struct JsonTables<'a> {
                tables: &'a [String],
                target: Option<String>,
            }
            let output = JsonTables {
                tables: &tables,
                target: extractor.target_table(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            if tables.is_empty() {
                println!("{}", "No tables referenced".yellow());
            }
            for table in &tables {
                println!("{}", table);
            }
            if let Some(target) = extractor.target_table() {
                println!("{} {}", "Target:".green(), target.bold());
            }
        }
    }

    Ok(())
}

pub fn sorted_tables(extractor: &Extractor) -> Vec<String> {
    let mut tables: Vec<String> = extractor.tables().iter().cloned().collect();
    tables.sort();
    tables
}

/// Run the limit command: print the current limit, or the query rewritten
/// with `new_limit`
pub fn limit_command(
    input: &SqlInput,
    new_limit: Option<u64>,
    config: &LineageConfig,
) -> Result<()> {
    let mut extractor = build_extractor(input, &config.extractor_options(), config)?;

    match new_limit {
        Some(limit) => {
            let sql = extractor
                .get_query_with_new_limit(limit)
                .context("Failed to rewrite LIMIT")?;
            println!("{}", sql);
        }
        None => match extractor.limit() {
            Some(limit) => println!("{}", limit),
            None => println!("{}", "No LIMIT clause".yellow()),
        },
    }

    Ok(())
}

/// Run the ctas command
pub fn ctas_command(
    input: &SqlInput,
    table_name: &str,
    overwrite: bool,
    config: &LineageConfig,
) -> Result<()> {
    let extractor = build_extractor(input, &config.extractor_options(), config)?;
    println!("{}", extractor.as_create_table(table_name, overwrite));
    Ok(())
}

/// Classification of a query's first statement
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Classification {
    pub statement_type: StatementType,
    pub select: bool,
    pub explain: bool,
    pub readonly: bool,
}

impl Classification {
    pub fn of(extractor: &Extractor) -> Self {
        Self {
            statement_type: extractor.statement_type(),
            select: extractor.is_select(),
            explain: extractor.is_explain(),
            readonly: extractor.is_readonly(),
        }
    }
}

/// Run the classify command
pub fn classify_command(input: &SqlInput, config: &LineageConfig) -> Result<()> {
    let extractor = build_extractor(input, &config.extractor_options(), config)?;
    let classification = Classification::of(&extractor);

    println!("Statement type: {}", classification.statement_type.to_string().bold());
    println!("  select:   {}", flag(classification.select));
    println!("  explain:  {}", flag(classification.explain));
    println!("  readonly: {}", flag(classification.readonly));

    Ok(())
}

fn flag(value: bool) -> colored::ColoredString {
    if value {
        "yes".green()
    } else {
        "no".red()
    }
}

/// Run the statements command
pub fn statements_command(input: &SqlInput, config: &LineageConfig) -> Result<()> {
    let extractor = build_extractor(input, &config.extractor_options(), config)?;

    for (i, statement) in extractor.get_statements().iter().enumerate() {
        println!("--- {} ---", format!("Statement {}", i + 1).green());
        println!("{}", statement);
    }

    Ok(())
}
