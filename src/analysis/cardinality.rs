use super::sorted_by_column_count;
use crate::models::{Index, Table};
use itertools::Itertools;
use tracing::debug;

pub fn find_bad_cardinality_order(table: &Table) -> Vec<&Index> {
    sorted_by_column_count(&table.indexes)
        .into_iter()
        .filter(|index| has_bad_cardinality_order(index))
        .collect()
}

/// Checks that each further key column adds no more distinct values than the
/// column before it.
///
/// Indexes without statistics, with a single column, or whose statistics do
/// not line up with their columns are never flagged.
pub fn has_bad_cardinality_order(index: &Index) -> bool {
    let Some(cardinality) = index.cardinality.as_deref() else {
        return false;
    };

    if cardinality.len() < 2 {
        return false;
    }

    if cardinality.len() != index.columns.len() {
        debug!(
            "Skipping {}: {} cardinality values for {} columns",
            index,
            cardinality.len(),
            index.columns.len()
        );
        return false;
    }

    increments(cardinality)
        .into_iter()
        .tuple_windows()
        .any(|(previous, next)| previous < next)
}

/// Distinct values contributed by each prefix step. A decreasing cumulative
/// value contributes zero.
fn increments(cardinality: &[u64]) -> Vec<u64> {
    let Some(&first) = cardinality.first() else {
        return Vec::new();
    };

    std::iter::once(first)
        .chain(
            cardinality
                .iter()
                .tuple_windows()
                .map(|(previous, next)| next.saturating_sub(*previous)),
        )
        .collect()
}
