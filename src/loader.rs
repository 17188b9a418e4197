use crate::config::{ConfigError, DbConfig};
use crate::models::{Column, Index, Schema, SchemaBuilder, SchemaError};
use snafu::{ResultExt, Snafu};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const MAX_OPEN_CONNECTIONS: u32 = 2;
const CONN_MAX_LIFETIME: Duration = Duration::from_secs(3 * 60);
const CONN_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Schemas owned by the server itself, skipped unless explicitly requested.
pub const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

#[derive(Debug, Snafu)]
pub enum LoaderError {
    #[snafu(display("Invalid connection settings: {}", source))]
    InvalidConfig { source: ConfigError },

    #[snafu(display("Failed to connect to database: {}", source))]
    ConnectionError { source: sqlx::Error },

    #[snafu(display("Failed to execute query: {}", query))]
    QueryError { query: String, source: sqlx::Error },

    #[snafu(display("Unexpected value in {}: {}", query, source))]
    RowDecode { query: String, source: sqlx::Error },

    #[snafu(display("Inconsistent catalog metadata: {}", source))]
    InconsistentSchema { source: SchemaError },

    #[snafu(display("Failed to read snapshot {}: {}", path.display(), source))]
    SnapshotRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to parse YAML snapshot {}: {}", path.display(), source))]
    SnapshotYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("Failed to parse JSON snapshot {}: {}", path.display(), source))]
    SnapshotJson {
        path: PathBuf,
        source: serde_json::Error,
    },
}

type Result<T, E = LoaderError> = std::result::Result<T, E>;

/// Reads column and index metadata from a MySQL `information_schema`.
pub struct MetadataLoader {
    config: DbConfig,
    pool: MySqlPool,
}

impl MetadataLoader {
    pub async fn connect(config: DbConfig) -> Result<Self> {
        info!("Connecting to MySQL at {}", config.target());

        let options = config.connect_options().context(InvalidConfigSnafu)?;
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_OPEN_CONNECTIONS)
            .min_connections(0)
            .max_lifetime(CONN_MAX_LIFETIME)
            .idle_timeout(CONN_IDLE_TIMEOUT)
            .connect_with(options)
            .await
            .context(ConnectionSnafu)?;

        info!("Successfully connected to {}", config.host);

        Ok(Self { config, pool })
    }

    /// Loads the complete snapshot. Any failure discards everything read so far.
    pub async fn load(&self) -> Result<Schema> {
        let mut builder = SchemaBuilder::new();

        info!("Fetching column list...");
        let columns = self.fetch_columns(&mut builder).await?;
        debug!("Fetched {} columns", columns);

        info!("Fetching index list...");
        let indexes = self.fetch_indexes(&mut builder).await?;
        debug!("Fetched {} indexes", indexes);

        let schema = builder.build();
        info!(
            "Loaded {} tables across {} databases",
            schema.table_count(),
            schema.databases.len()
        );
        Ok(schema)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn fetch_columns(&self, builder: &mut SchemaBuilder) -> Result<usize> {
        let query = format!(
            r#"
            SELECT
                c.table_schema AS table_schema,
                c.table_name AS table_name,
                c.column_name AS column_name,
                CAST(c.column_type AS CHAR) AS column_type,
                c.is_nullable AS is_nullable
            FROM information_schema.columns c
            JOIN information_schema.tables t
              ON t.table_schema = c.table_schema AND t.table_name = c.table_name
            WHERE t.table_type = 'BASE TABLE'{}
            ORDER BY c.table_schema, c.table_name, c.ordinal_position
        "#,
            self.schema_filter("c.table_schema")
        );

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context(QuerySnafu { query: &query })?;

        let count = rows.len();
        for row in &rows {
            let column = ColumnRow::from_row(row).context(RowDecodeSnafu { query: &query })?;
            builder
                .add_column(column.into_column())
                .context(InconsistentSchemaSnafu)?;
        }

        Ok(count)
    }

    async fn fetch_indexes(&self, builder: &mut SchemaBuilder) -> Result<usize> {
        let query = format!(
            r#"
            SELECT
                table_schema AS table_schema,
                table_name AS table_name,
                index_name AS index_name,
                CAST(MAX(non_unique) AS SIGNED) AS non_unique,
                CAST(GROUP_CONCAT(column_name ORDER BY seq_in_index SEPARATOR ',') AS CHAR) AS columns,
                CAST(GROUP_CONCAT(cardinality ORDER BY seq_in_index SEPARATOR ',') AS CHAR) AS cardinalities
            FROM information_schema.statistics
            WHERE column_name IS NOT NULL{}
            GROUP BY table_schema, table_name, index_name
            ORDER BY table_schema, table_name, non_unique, index_name
        "#,
            self.schema_filter("table_schema")
        );

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context(QuerySnafu { query: &query })?;

        let count = rows.len();
        for row in &rows {
            let index = IndexRow::from_row(row).context(RowDecodeSnafu { query: &query })?;
            builder
                .add_index(index.into_index())
                .context(InconsistentSchemaSnafu)?;
        }

        Ok(count)
    }

    fn schema_filter(&self, column: &str) -> String {
        if self.config.include_system_schemas {
            return String::new();
        }

        let names = SYSTEM_SCHEMAS
            .iter()
            .map(|name| format!("'{}'", name))
            .collect::<Vec<_>>()
            .join(", ");
        format!(" AND {} NOT IN ({})", column, names)
    }
}

/// Reads a schema snapshot saved as YAML (`.yaml`/`.yml`) or JSON.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Schema> {
    let path = path.as_ref();
    info!("Loading schema snapshot from {}", path.display());

    let content = std::fs::read_to_string(path).context(SnapshotReadSnafu { path })?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );

    let schema: Schema = if is_yaml {
        serde_yaml::from_str(&content).context(SnapshotYamlSnafu { path })?
    } else {
        serde_json::from_str(&content).context(SnapshotJsonSnafu { path })?
    };

    schema.validated().context(InconsistentSchemaSnafu)
}

#[derive(Debug)]
struct ColumnRow {
    table_schema: String,
    table_name: String,
    column_name: String,
    column_type: String,
    is_nullable: String,
}

impl ColumnRow {
    fn from_row(row: &MySqlRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            table_schema: row.try_get("table_schema")?,
            table_name: row.try_get("table_name")?,
            column_name: row.try_get("column_name")?,
            column_type: row.try_get("column_type")?,
            is_nullable: row.try_get("is_nullable")?,
        })
    }

    fn into_column(self) -> Column {
        Column {
            name: self.column_name,
            db_name: self.table_schema,
            table_name: self.table_name,
            column_type: self.column_type,
            allow_null: self.is_nullable.eq_ignore_ascii_case("YES"),
        }
    }
}

#[derive(Debug)]
struct IndexRow {
    table_schema: String,
    table_name: String,
    index_name: String,
    non_unique: i64,
    columns: String,
    cardinalities: Option<String>,
}

impl IndexRow {
    fn from_row(row: &MySqlRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            table_schema: row.try_get("table_schema")?,
            table_name: row.try_get("table_name")?,
            index_name: row.try_get("index_name")?,
            non_unique: row.try_get("non_unique")?,
            columns: row.try_get("columns")?,
            cardinalities: row.try_get("cardinalities")?,
        })
    }

    fn into_index(self) -> Index {
        let columns: Vec<String> = self
            .columns
            .split(',')
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        let cardinality = parse_cardinality(self.cardinalities.as_deref(), &self.index_name);

        Index {
            name: self.index_name,
            db_name: self.table_schema,
            table_name: self.table_name,
            is_unique: self.non_unique == 0,
            columns,
            cardinality,
        }
    }
}

/// Statistics are kept only when every value parses; a partial list would
/// misalign prefixes.
fn parse_cardinality(raw: Option<&str>, index_name: &str) -> Option<Vec<u64>> {
    let raw = raw?;
    match raw
        .split(',')
        .map(|c| c.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(values) => Some(values),
        Err(err) => {
            debug!("Ignoring cardinality '{}' of {}: {}", raw, index_name, err);
            None
        }
    }
}
