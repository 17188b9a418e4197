use super::sorted_by_column_count;
use crate::models::{Column, Index, Table};
use serde::Serialize;
use std::collections::HashSet;

/// Naming-convention heuristic for foreign keys: the name contains `_id`
/// anywhere, not only as a suffix.
pub fn looks_like_foreign_key(column_name: &str) -> bool {
    column_name.contains("_id")
}

#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeyCoverage<'a> {
    pub database: &'a str,
    pub table: &'a str,
    /// Indexes holding at least one foreign-key-like column, widest first
    pub foreign_indexes: Vec<&'a Index>,
    /// Foreign-key-like columns that no index contains
    pub unindexed_columns: Vec<&'a Column>,
}

pub fn find_unindexed_foreign_keys(table: &Table) -> ForeignKeyCoverage<'_> {
    let mut indexed: HashSet<&str> = HashSet::new();
    let mut foreign_indexes = Vec::new();

    for index in sorted_by_column_count(&table.indexes) {
        let mut found = false;
        for column in index.columns.iter().filter(|c| looks_like_foreign_key(c)) {
            indexed.insert(column.as_str());
            found = true;
        }

        if found {
            foreign_indexes.push(index);
        }
    }

    let unindexed_columns = table
        .columns
        .iter()
        .filter(|c| looks_like_foreign_key(&c.name) && !indexed.contains(c.name.as_str()))
        .collect();

    ForeignKeyCoverage {
        database: &table.db_name,
        table: &table.name,
        foreign_indexes,
        unindexed_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::*;
    use rstest::rstest;

    fn unindexed(table: &Table) -> Vec<String> {
        find_unindexed_foreign_keys(table)
            .unindexed_columns
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    #[rstest]
    #[case("customer_id", true)]
    #[case("user_identity", true)]
    #[case("_id", true)]
    #[case("sort_idx", true)]
    #[case("id", false)]
    #[case("uuid", false)]
    #[case("customerid", false)]
    #[case("customer_ID", false)]
    fn foreign_key_predicate(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(looks_like_foreign_key(name), expected);
    }

    #[test]
    fn unindexed_foreign_key_is_reported() {
        let orders = table(
            "orders",
            &["id", "customer_id", "status"],
            vec![index("orders", "PRIMARY", &["id"])],
        );

        assert_eq!(unindexed(&orders), vec!["db.orders.customer_id"]);
    }

    #[test]
    fn column_in_any_index_position_counts_as_indexed() {
        let orders = table(
            "orders",
            &["id", "customer_id", "shop_id"],
            vec![
                index("orders", "PRIMARY", &["id"]),
                index("orders", "idx_status_customer", &["status", "customer_id"]),
            ],
        );

        assert_eq!(unindexed(&orders), vec!["db.orders.shop_id"]);
    }

    #[test]
    fn records_foreign_indexes_widest_first() {
        let orders = table(
            "orders",
            &["id", "customer_id", "shop_id", "status"],
            vec![
                index("orders", "PRIMARY", &["id"]),
                index("orders", "idx_customer", &["customer_id"]),
                index("orders", "idx_shop_status", &["shop_id", "status"]),
                index("orders", "idx_status", &["status"]),
            ],
        );

        let coverage = find_unindexed_foreign_keys(&orders);
        let names: Vec<&str> = coverage
            .foreign_indexes
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["idx_shop_status", "idx_customer"]);
        assert!(coverage.unindexed_columns.is_empty());
        assert_eq!(coverage.database, "db");
        assert_eq!(coverage.table, "orders");
    }

    #[test]
    fn every_unindexed_column_reported_once() {
        let t = table(
            "t",
            &["a_id", "b_id", "c_id", "plain"],
            vec![index("t", "idx_b", &["b_id", "plain"])],
        );

        assert_eq!(unindexed(&t), vec!["db.t.a_id", "db.t.c_id"]);
    }
}
