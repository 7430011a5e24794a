//! Integration tests for the public extractor API

use sql_lineage::sql_engine::{ExtractError, Extractor, ExtractorOptions, Flavor, StatementType};
use std::collections::HashSet;

fn table_set(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_reporting_query() {
    let sql = r#"
        WITH recent_orders AS (
            SELECT customer_id, amount
            FROM sales.orders
            WHERE created_at > '2024-01-01'
        ),
        vip AS (
            SELECT id FROM crm.customers
        )
        SELECT v.id, SUM(r.amount) AS total
        FROM recent_orders r
        JOIN vip v ON r.customer_id = v.id
        GROUP BY v.id
        ORDER BY total DESC
        LIMIT 100;
    "#;

    let extractor = Extractor::new(sql).unwrap();
    assert_eq!(
        extractor.tables(),
        &table_set(&["sales.orders", "crm.customers"])
    );
    assert_eq!(extractor.limit(), Some(100));
    assert!(extractor.is_select());
    assert!(extractor.is_readonly());
    assert_eq!(extractor.target_table(), None);
}

#[test]
fn test_catalog_aware_options() {
    let sql = "SELECT * FROM prod.sales.orders o JOIN prod.crm.customers c ON o.cid = c.id";

    let base = Extractor::new(sql).unwrap();
    assert_eq!(base.tables(), &table_set(&["prod.sales", "prod.crm"]));

    let options = ExtractorOptions {
        flavor: Flavor::CatalogAware,
        dialect: "duckdb".to_string(),
    };
    let catalog = Extractor::with_options(sql, &options).unwrap();
    assert_eq!(
        catalog.tables(),
        &table_set(&["prod.sales.orders", "prod.crm.customers"])
    );
}

#[test]
fn test_limit_rewrite_round_trip() {
    let mut extractor = Extractor::new("select id from events order by id limit 50").unwrap();
    assert_eq!(extractor.limit(), Some(50));

    let rewritten = extractor.get_query_with_new_limit(10).unwrap();
    assert_eq!(rewritten, "SELECT id FROM events ORDER BY id LIMIT 10");

    let reparsed = Extractor::new(&rewritten).unwrap();
    assert_eq!(reparsed.limit(), Some(10));
    assert_eq!(reparsed.tables(), &table_set(&["events"]));
}

#[test]
fn test_ctas_for_preview() {
    let extractor = Extractor::new("SELECT * FROM events LIMIT 5;").unwrap();
    assert_eq!(
        extractor.as_create_table("tmp_preview", true),
        "DROP TABLE IF EXISTS tmp_preview;\nCREATE TABLE tmp_preview AS \nSELECT * FROM events LIMIT 5"
    );
}

#[test]
fn test_write_statements_are_not_readonly() {
    for sql in [
        "INSERT INTO t SELECT * FROM u",
        "UPDATE t SET a = 1",
        "DELETE FROM t",
        "DROP TABLE t",
    ] {
        let extractor = Extractor::new(sql).unwrap();
        assert!(!extractor.is_readonly(), "{} should not be readonly", sql);
        assert_ne!(extractor.statement_type(), StatementType::Select);
    }
}

#[test]
fn test_errors_are_displayable() {
    let err = Extractor::new("SELECT * FROM t LIMIT x1, y2").unwrap_err();
    assert!(matches!(err, ExtractError::InvalidLimitValue { .. }));
    assert_eq!(err.to_string(), "Invalid LIMIT value: y2");
}
