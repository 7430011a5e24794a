//! Integration tests for table lineage across several jobs

use sql_lineage::commands::config::LineageConfig;
use sql_lineage::commands::lineage::build_report;
use sql_lineage::sql_engine::script::{extract_embedded_sql, DEFAULT_MARKER};
use sql_lineage::sql_engine::{ExtractorOptions, LineageGraph, TableLineage};
use std::fs;

const CUSTOMER_SUMMARY: &str = r#"INSERT INTO marts.customer_summary
SELECT
    c.id AS customer_id,
    c.name AS customer_name,
    c.email AS customer_email,
    COUNT(o.order_id) AS order_count,
    SUM(o.amount) AS total_amount
FROM staging.stg_customers c
LEFT JOIN staging.stg_orders o ON c.id = o.customer_id
GROUP BY c.id, c.name, c.email"#;

/// Test lineage extraction from a realistic model
#[test]
fn test_model_file_lineage() {
    let lineage =
        TableLineage::from_sql(CUSTOMER_SUMMARY, "unused", &ExtractorOptions::default()).unwrap();

    assert_eq!(lineage.target, "marts.customer_summary");
    assert_eq!(
        lineage.sources.iter().cloned().collect::<Vec<_>>(),
        vec!["staging.stg_customers", "staging.stg_orders"]
    );

    let mut graph = LineageGraph::new();
    graph.add_lineage(&lineage);
    let dot = graph.to_dot();
    assert!(dot.starts_with("digraph lineage {"));
    assert!(dot.contains("\"staging.stg_orders\" -> \"marts.customer_summary\";"));
}

#[test]
fn test_embedded_job_lineage() {
    let script = "from awsglue.context import GlueContext\n\
                  sql = \"\"\"\n\
                  INSERT INTO user_click\n\
                  SELECT * FROM user_event e LEFT JOIN user_info i ON e.user_id = i.user_id\n\
                  \"\"\"\n";
    let sql = extract_embedded_sql(script, DEFAULT_MARKER).unwrap();
    let lineage = TableLineage::from_sql(&sql, "job", &ExtractorOptions::default()).unwrap();

    assert_eq!(lineage.target, "user_click");
    assert_eq!(lineage.sources.len(), 2);
    assert!(lineage.sources.contains("user_event"));
    assert!(lineage.sources.contains("user_info"));
}

#[test]
fn test_project_report_execution_order() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("customer_summary.sql"), CUSTOMER_SUMMARY).unwrap();
    fs::write(
        root.join("stg_orders.sql"),
        "CREATE TABLE staging.stg_orders AS SELECT * FROM raw.orders",
    )
    .unwrap();
    fs::write(
        root.join("stg_customers.sql"),
        "INSERT OVERWRITE TABLE staging.stg_customers SELECT * FROM raw.customers",
    )
    .unwrap();

    let report = build_report(root, &LineageConfig::default()).unwrap();
    assert_eq!(report.records.len(), 3);
    assert!(report.failures.is_empty());

    let order = report.graph.execution_order().unwrap();
    let position = |table: &str| order.iter().position(|t| t == table).unwrap();
    assert!(position("raw.orders") < position("staging.stg_orders"));
    assert!(position("raw.customers") < position("staging.stg_customers"));
    assert!(position("staging.stg_orders") < position("marts.customer_summary"));
    assert!(position("staging.stg_customers") < position("marts.customer_summary"));

    assert_eq!(
        report.graph.downstream("staging.stg_orders"),
        vec!["marts.customer_summary"]
    );
}

#[test]
fn test_demo_project() {
    let project = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demo_project");
    let config = sql_lineage::commands::config::read_config(Some(
        project.join("lineage_project.yaml").as_path(),
    ))
    .unwrap();
    assert_eq!(config.name, "clickstream");

    let report = build_report(&project.join(&config.sql_path), &config).unwrap();
    assert_eq!(report.records.len(), 3);

    let graph = &report.graph;
    assert_eq!(graph.upstream("user_click"), vec!["user_event", "user_info"]);
    assert_eq!(graph.upstream("daily_clicks"), vec!["user_click"]);
    assert_eq!(
        graph.upstream("reports.weekly_clicks"),
        vec!["daily_clicks", "dim.region"]
    );
    assert!(graph.detect_cycles().is_empty());
}
