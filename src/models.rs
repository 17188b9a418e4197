use serde::{Deserialize, Serialize};
use snafu::{ensure, Snafu};
use std::collections::BTreeMap;
use std::fmt;

/// Name MySQL gives to every primary-key index.
pub const PRIMARY_KEY_NAME: &str = "PRIMARY";

#[derive(Debug, Snafu)]
pub enum SchemaError {
    #[snafu(display("Duplicate column {}.{}.{}", database, table, column))]
    DuplicateColumn {
        database: String,
        table: String,
        column: String,
    },

    #[snafu(display("Duplicate index {}.{}.{}", database, table, index))]
    DuplicateIndex {
        database: String,
        table: String,
        index: String,
    },
}

type Result<T, E = SchemaError> = std::result::Result<T, E>;

/// A complete catalog snapshot: every database, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub databases: Vec<Database>,
}

/// A database (MySQL schema) and its tables, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// A table identified by `(db_name, name)` with its columns and indexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub db_name: String,
    /// Columns in catalog ordinal order
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Indexes in discovery order
    #[serde(default)]
    pub indexes: Vec<Index>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub db_name: String,
    #[serde(default)]
    pub table_name: String,
    /// Declared type as reported by the catalog, e.g. `bigint unsigned`
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub allow_null: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    #[serde(default)]
    pub db_name: String,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub is_unique: bool,
    /// Key columns in index order
    pub columns: Vec<String>,
    /// Cumulative distinct-value estimates, one per key prefix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Vec<u64>>,
}

/// A single diagnostic ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotGoodItem {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl Schema {
    pub fn is_empty(&self) -> bool {
        self.databases.iter().all(|db| db.tables.is_empty())
    }

    pub fn database(&self, name: &str) -> Option<&Database> {
        self.databases.iter().find(|db| db.name == name)
    }

    /// Every table of every database, in (database, table) name order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.databases.iter().flat_map(|db| db.tables.iter())
    }

    pub fn table_count(&self) -> usize {
        self.databases.iter().map(|db| db.tables.len()).sum()
    }

    /// Rebuilds a deserialized snapshot through [`SchemaBuilder`] so that
    /// ordering, owner names and uniqueness hold as they do for live loads.
    pub fn validated(self) -> Result<Self> {
        let mut builder = SchemaBuilder::new();
        for database in self.databases {
            builder.add_database(&database.name);
            for table in database.tables {
                builder.add_table(&database.name, &table.name);
                for column in table.columns {
                    builder.add_column(Column {
                        db_name: database.name.clone(),
                        table_name: table.name.clone(),
                        ..column
                    })?;
                }
                for index in table.indexes {
                    builder.add_index(Index {
                        db_name: database.name.clone(),
                        table_name: table.name.clone(),
                        ..index
                    })?;
                }
            }
        }
        Ok(builder.build())
    }
}

impl Database {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

impl Table {
    pub fn new(db_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_name: db_name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.is_primary())
    }
}

impl Index {
    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_KEY_NAME
    }

    /// True when every key column of `other` is also a key column of `self`,
    /// regardless of position.
    pub fn covers(&self, other: &Index) -> bool {
        other.columns.iter().all(|c| self.columns.contains(c))
    }
}

impl NotGoodItem {
    pub(crate) fn new(name: String) -> Self {
        Self { name, detail: None }
    }

    pub(crate) fn with_detail(name: String, detail: String) -> Self {
        Self {
            name,
            detail: Some(detail),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db_name, self.name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.db_name, self.table_name, self.name)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.db_name, self.table_name, self.name)
    }
}

impl fmt::Display for NotGoodItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.name, detail),
            None => f.write_str(&self.name),
        }
    }
}

/// Accumulates catalog rows into a [`Schema`].
///
/// Tables are keyed by database and table name, so rows may arrive in any
/// order and the built schema is always sorted. Column and index names must be
/// unique within their table.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    databases: BTreeMap<String, BTreeMap<String, Table>>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_database(&mut self, database: &str) -> &mut Self {
        self.databases.entry(database.to_string()).or_default();
        self
    }

    pub fn add_table(&mut self, database: &str, table: &str) -> &mut Self {
        self.table_mut(database, table);
        self
    }

    pub fn add_column(&mut self, column: Column) -> Result<&mut Self> {
        let table = self.table_mut(&column.db_name, &column.table_name);
        ensure!(
            table.column(&column.name).is_none(),
            DuplicateColumnSnafu {
                database: column.db_name.as_str(),
                table: column.table_name.as_str(),
                column: column.name.as_str(),
            }
        );
        table.columns.push(column);
        Ok(self)
    }

    pub fn add_index(&mut self, index: Index) -> Result<&mut Self> {
        let table = self.table_mut(&index.db_name, &index.table_name);
        ensure!(
            table.index(&index.name).is_none(),
            DuplicateIndexSnafu {
                database: index.db_name.as_str(),
                table: index.table_name.as_str(),
                index: index.name.as_str(),
            }
        );
        table.indexes.push(index);
        Ok(self)
    }

    pub fn build(self) -> Schema {
        let databases = self
            .databases
            .into_iter()
            .map(|(name, tables)| Database {
                name,
                tables: tables.into_values().collect(),
            })
            .collect();

        Schema { databases }
    }

    fn table_mut(&mut self, database: &str, table: &str) -> &mut Table {
        self.databases
            .entry(database.to_string())
            .or_default()
            .entry(table.to_string())
            .or_insert_with(|| Table::new(database, table))
    }
}
