use super::sorted_by_column_count;
use crate::models::{Index, Table};
use serde::Serialize;

/// An accepted index together with the smaller indexes whose key columns it
/// already contains.
#[derive(Debug, Clone, Serialize)]
pub struct OverwrapGroup<'a> {
    pub anchor: &'a Index,
    pub covered: Vec<&'a Index>,
}

/// Greedily groups the table's indexes under the widest index covering them.
///
/// Indexes are visited widest first. Each one joins the first existing group
/// whose anchor contains all of its columns, or else anchors a new group. The
/// primary key never joins a group, so it is never reported as covered.
pub fn find_overwrapped_indexes(table: &Table) -> Vec<OverwrapGroup<'_>> {
    let mut groups: Vec<OverwrapGroup<'_>> = Vec::new();

    for index in sorted_by_column_count(&table.indexes) {
        if index.is_primary() {
            continue;
        }

        match groups.iter_mut().find(|group| group.anchor.covers(index)) {
            Some(group) => group.covered.push(index),
            None => groups.push(OverwrapGroup {
                anchor: index,
                covered: Vec::new(),
            }),
        }
    }

    groups
}
