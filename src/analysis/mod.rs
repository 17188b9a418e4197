pub mod cardinality;
pub mod foreign_key;
pub mod overwrap;

use crate::models::{Column, Index, NotGoodItem, Schema, Table};
use itertools::Itertools;
use serde::Serialize;
use snafu::{ensure, Snafu};
use tracing::{debug, info};

pub use cardinality::has_bad_cardinality_order;
pub use foreign_key::{looks_like_foreign_key, ForeignKeyCoverage};
pub use overwrap::OverwrapGroup;

/// Contract violations in the snapshot itself, as opposed to findings about
/// the analyzed schema.
#[derive(Debug, Snafu)]
pub enum AnalysisError {
    #[snafu(display("Index {} has no key columns; the schema snapshot is corrupted", index))]
    EmptyIndex { index: String },
}

type Result<T, E = AnalysisError> = std::result::Result<T, E>;

/// Structured output of the three detectors, borrowing from the analyzed schema.
#[derive(Debug, Default, Serialize)]
pub struct AnalysisResults<'a> {
    /// Covering groups for every table, including groups with nothing covered
    pub overwraps: Vec<OverwrapGroup<'a>>,
    /// Foreign-key coverage for every table
    pub foreign_keys: Vec<ForeignKeyCoverage<'a>>,
    /// Indexes whose key order does not narrow selectivity monotonically
    pub bad_cardinality_order: Vec<&'a Index>,
}

/// Runs every detector over every table of `schema`.
///
/// The schema is validated first so that a corrupted snapshot surfaces as an
/// [`AnalysisError`] and never as a half-finished set of findings.
pub fn analyze(schema: &Schema) -> Result<AnalysisResults<'_>> {
    for table in schema.tables() {
        validate_table(table)?;
    }

    debug!(
        "Analyzing {} tables across {} databases",
        schema.table_count(),
        schema.databases.len()
    );

    let mut results = AnalysisResults::default();

    info!("Running overwrap index analysis...");
    for table in schema.tables() {
        results
            .overwraps
            .extend(overwrap::find_overwrapped_indexes(table));
    }

    info!("Running foreign key coverage analysis...");
    for table in schema.tables() {
        results
            .foreign_keys
            .push(foreign_key::find_unindexed_foreign_keys(table));
    }

    info!("Running cardinality order analysis...");
    for table in schema.tables() {
        results
            .bad_cardinality_order
            .extend(cardinality::find_bad_cardinality_order(table));
    }

    info!("Analysis found {} problems", results.problem_count());
    Ok(results)
}

impl<'a> AnalysisResults<'a> {
    pub fn covered_indexes(&self) -> impl Iterator<Item = (&'a Index, &'a Index)> + '_ {
        self.overwraps
            .iter()
            .flat_map(|group| group.covered.iter().map(move |covered| (*covered, group.anchor)))
    }

    pub fn unindexed_columns(&self) -> impl Iterator<Item = &'a Column> + '_ {
        self.foreign_keys
            .iter()
            .flat_map(|coverage| coverage.unindexed_columns.iter().copied())
    }

    pub fn problem_count(&self) -> usize {
        self.covered_indexes().count()
            + self.unindexed_columns().count()
            + self.bad_cardinality_order.len()
    }

    pub fn overwrap_items(&self) -> Vec<NotGoodItem> {
        self.covered_indexes()
            .map(|(covered, anchor)| {
                NotGoodItem::with_detail(
                    format!("Index {} is covered by another index {}", covered, anchor),
                    format!(
                        "({}) within ({})",
                        covered.columns.join(", "),
                        anchor.columns.join(", ")
                    ),
                )
            })
            .collect()
    }

    pub fn foreign_key_items(&self) -> Vec<NotGoodItem> {
        self.unindexed_columns()
            .map(|column| {
                NotGoodItem::new(format!(
                    "Column {} seems foreign key but not indexed.",
                    column
                ))
            })
            .collect()
    }

    pub fn cardinality_items(&self) -> Vec<NotGoodItem> {
        self.bad_cardinality_order
            .iter()
            .map(|index| NotGoodItem::new(format!("Index {} has bad cardinality order.", index)))
            .collect()
    }

    /// Flattens all findings into presentation items, overwrap first, then
    /// foreign keys, then cardinality order.
    pub fn not_good_items(&self) -> Vec<NotGoodItem> {
        let mut items = self.overwrap_items();
        items.extend(self.foreign_key_items());
        items.extend(self.cardinality_items());
        items
    }
}

fn validate_table(table: &Table) -> Result<()> {
    for index in &table.indexes {
        ensure!(
            !index.columns.is_empty(),
            EmptyIndexSnafu {
                index: index.to_string()
            }
        );
    }
    Ok(())
}

/// Indexes ordered widest first; equal widths fall back to index name so the
/// order never depends on how the catalog enumerated them.
pub(crate) fn sorted_by_column_count(indexes: &[Index]) -> Vec<&Index> {
    indexes
        .iter()
        .sorted_by(|a, b| {
            b.columns
                .len()
                .cmp(&a.columns.len())
                .then_with(|| a.name.cmp(&b.name))
        })
        .collect()
}
