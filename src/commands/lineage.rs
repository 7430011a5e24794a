use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

use super::config::LineageConfig;
use crate::sql_engine::script::extract_embedded_sql;
use crate::sql_engine::{LineageGraph, TableLineage};

/// Everything learned from one scan
#[derive(Debug, Default)]
pub struct LineageReport {
    pub records: Vec<TableLineage>,
    pub graph: LineageGraph,
    /// Files that could not be read or parsed, with the reason
    pub failures: Vec<(PathBuf, String)>,
    /// Files without any SQL to extract
    pub skipped: Vec<PathBuf>,
}

/// Run the lineage command
pub fn lineage_command(path: &Path, format: &str, config: &LineageConfig) -> Result<()> {
    let start_time = Instant::now();

    if format == "text" {
        println!(
            "{}",
            format!("Scanning SQL jobs in: {}", path.display()).green()
        );
    }

    let report = build_report(path, config)?;

    for (file, reason) in &report.failures {
        eprintln!("Error extracting lineage from {}: {}", file.display(), reason);
    }

    if report.records.is_empty() {
        bail!("No lineage could be extracted from {}", path.display());
    }

    match format {
        "text" => {
            println!(
                "Extracted lineage from {} out of {} files in {:.2?}",
                report.records.len(),
                report.records.len() + report.failures.len() + report.skipped.len(),
                start_time.elapsed()
            );
            output_text_format(&report);
        }
        "dot" => print!("{}", report.graph.to_dot()),
        "json" => output_json_format(&config.name, &report)?,
        _ => {
            println!(
                "Unsupported output format: {}. Using text format instead.",
                format
            );
            output_text_format(&report);
        }
    }

    Ok(())
}

/// Scan `path` (a directory or a single job file) and build lineage records
/// and the merged graph
pub fn build_report(path: &Path, config: &LineageConfig) -> Result<LineageReport> {
    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        find_sources(path, config)
    };

    if files.is_empty() {
        bail!("No job files found in {}", path.display());
    }
    log::info!("Found {} job file(s) in {}", files.len(), path.display());

    let mut report = LineageReport::default();
    for file in files {
        match lineage_for_file(&file, config) {
            Ok(Some(lineage)) => {
                report.graph.add_lineage(&lineage);
                report.records.push(lineage);
            }
            Ok(None) => {
                log::warn!("No SQL found in {}, skipping", file.display());
                report.skipped.push(file);
            }
            Err(err) => {
                log::warn!("Skipping {}: {:#}", file.display(), err);
                report.failures.push((file, format!("{:#}", err)));
            }
        }
    }

    Ok(report)
}

/// Find all job files with a configured extension (recursively), sorted
pub fn find_sources(dir: &Path, config: &LineageConfig) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| config.accepts_extension(extension))
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();

    files.sort();
    files
}

/// SQL of a job file: the whole file for `.sql`, the embedded query for
/// anything else. `None` when a script holds no SQL.
pub fn load_job_sql(path: &Path, config: &LineageConfig) -> Result<Option<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let is_sql = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("sql"));
    if is_sql {
        return Ok((!content.trim().is_empty()).then_some(content));
    }

    Ok(extract_embedded_sql(&content, &config.script_marker))
}

fn lineage_for_file(path: &Path, config: &LineageConfig) -> Result<Option<TableLineage>> {
    let Some(sql) = load_job_sql(path, config)? else {
        return Ok(None);
    };

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let fallback = config.target_for(&stem).unwrap_or(stem.as_str());

    let lineage = TableLineage::from_sql(&sql, fallback, &config.extractor_options())
        .with_context(|| format!("Failed to extract lineage from {}", path.display()))?;

    Ok(Some(lineage.with_file(path)))
}

/// Output the report in text format
fn output_text_format(report: &LineageReport) {
    println!("\n--- {} ---", "Table Lineage".green());

    for record in &report.records {
        println!("\nTarget: {}", record.target.bold());
        if let Some(file) = &record.file {
            println!("  File: {}", file.display());
        }
        println!("  Statement: {}", record.statement_type);
        if record.sources.is_empty() {
            println!("  Sources: {}", "none".dimmed());
        } else {
            println!("  Sources:");
            for source in &record.sources {
                println!("    • {}", source);
            }
        }
    }

    let cycles = report.graph.detect_cycles();
    if !cycles.is_empty() {
        println!("\n--- {} ---", "Circular Dependencies Detected".red());
        for (i, cycle) in cycles.iter().enumerate() {
            println!("Cycle {}: {}", i + 1, cycle.join(" → "));
        }
        return;
    }

    println!("\n--- {} ---", "Execution Order".green());
    match report.graph.execution_order() {
        Ok(order) => {
            for (i, table) in order.iter().enumerate() {
                println!("  {}. {}", i + 1, table);
            }
        }
        Err(err) => println!("Error determining execution order: {}", err),
    }
}

/// Output the report in JSON format
fn output_json_format(project: &str, report: &LineageReport) -> Result<()> {
    #[derive(Serialize)]
    struct JsonOutput<'a> {
        project: &'a str,
        tables: Vec<JsonTable>,
        jobs: &'a [TableLineage],
    }

    #[derive(Serialize)]
    struct JsonTable {
        name: String,
        upstream: Vec<String>,
        downstream: Vec<String>,
    }

    let tables = report
        .graph
        .tables()
        .into_iter()
        .map(|name| JsonTable {
            upstream: report.graph.upstream(&name),
            downstream: report.graph.downstream(&name),
            name,
        })
        .collect();

    let output = JsonOutput {
        project,
        tables,
        jobs: &report.records,
    };
    let json = serde_json::to_string_pretty(&output)?;
    println!("{}", json);

    Ok(())
}
