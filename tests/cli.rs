use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const SHOP_SNAPSHOT: &str = r#"
databases:
  - name: shop
    tables:
      - name: orders
        columns:
          - { name: id, type: bigint }
          - { name: customer_id, type: bigint }
          - { name: status, type: varchar(16) }
          - { name: coupon_id, type: bigint, allow_null: true }
        indexes:
          - { name: PRIMARY, is_unique: true, columns: [id], cardinality: [5000] }
          - { name: idx_a, columns: [customer_id], cardinality: [800] }
          - { name: idx_b, columns: [customer_id, status], cardinality: [800, 900] }
          - { name: idx_status_customer, columns: [status, customer_id], cardinality: [4, 900] }
      - name: customers
        columns:
          - { name: id, type: bigint }
        indexes:
          - { name: PRIMARY, is_unique: true, columns: [id] }
"#;

fn write_snapshot(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn index_helper() -> Command {
    let mut cmd = Command::cargo_bin("index-helper").unwrap();
    cmd.env_remove("INDEX_HELPER_ADAPTER").env_remove("RUST_LOG");
    cmd
}

#[test]
fn unsupported_adapter_is_a_usage_error() {
    index_helper()
        .args(["--adapter", "postgres", "--user", "root", "--host", "localhost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'postgres'"));
}

#[test]
fn adapter_is_required_for_live_analysis() {
    index_helper()
        .args(["--user", "root"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--adapter"));
}

#[test]
fn snapshot_findings_are_printed_in_detector_order() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(&dir, "shop.yaml", SHOP_SNAPSHOT);

    index_helper()
        .arg("--snapshot")
        .arg(&path)
        .assert()
        .success()
        .stdout(
            "Index shop.orders.idx_status_customer is covered by another index shop.orders.idx_b: (status, customer_id) within (customer_id, status)\n\
             Index shop.orders.idx_a is covered by another index shop.orders.idx_b: (customer_id) within (customer_id, status)\n\
             Column shop.orders.coupon_id seems foreign key but not indexed.\n\
             Index shop.orders.idx_status_customer has bad cardinality order.\n",
        );
}

#[test]
fn empty_snapshot_reports_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(&dir, "empty.json", r#"{"databases": []}"#);

    index_helper()
        .arg("--snapshot")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn json_format_lists_items() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(&dir, "shop.yml", SHOP_SNAPSHOT);

    let output = index_helper()
        .arg("--snapshot")
        .arg(&path)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["items"].as_array().unwrap().len(), 4);
    assert_eq!(
        report["findings"]["bad_cardinality_order"][0]["cardinality"],
        serde_json::json!([4, 900])
    );
}

#[test]
fn index_without_columns_fails_loudly() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(
        &dir,
        "broken.json",
        r#"{"databases":[{"name":"shop","tables":[{"name":"orders","indexes":[{"name":"idx","columns":[]}]}]}]}"#,
    );

    index_helper()
        .arg("--snapshot")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no key columns"));
}

#[test]
fn malformed_snapshot_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(&dir, "broken.yaml", "databases: [");

    index_helper()
        .arg("--snapshot")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse YAML snapshot"));
}
