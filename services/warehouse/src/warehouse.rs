//! SQLite warehouse: table replacement and row counts.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::error::{EtlError, Result};
use crate::table::{Table, Value};

/// Stay under SQLITE_MAX_VARIABLE_NUMBER on older builds (999).
const MAX_BIND_PARAMS: usize = 999;

/// How a batch of table replacements is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// One transaction per table. A failure leaves earlier tables replaced.
    #[default]
    PerTable,
    /// One transaction for the whole batch. A failure leaves the store untouched.
    Atomic,
}

/// Handle on the output database file.
pub struct Warehouse {
    pool: SqlitePool,
}

impl Warehouse {
    /// Open (creating if needed) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete);

        // Single writer, single connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|source| EtlError::StoreOpen {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self { pool })
    }

    /// Drop and recreate `table.name()` with the table's rows.
    pub async fn replace_table(&self, table: &Table) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EtlError::write(table.name(), e))?;
        write_table(&mut *tx, table).await?;
        tx.commit()
            .await
            .map_err(|e| EtlError::write(table.name(), e))?;
        Ok(())
    }

    /// Replace several tables, committing according to `mode`.
    pub async fn replace_all(&self, tables: &[&Table], mode: WriteMode) -> Result<()> {
        match mode {
            WriteMode::PerTable => {
                for table in tables {
                    self.replace_table(table).await?;
                    tracing::info!(table = table.name(), rows = table.len(), "table replaced");
                }
            }
            WriteMode::Atomic => {
                let batch = tables
                    .iter()
                    .map(|t| t.name())
                    .collect::<Vec<_>>()
                    .join(",");
                let mut tx = self
                    .pool
                    .begin()
                    .await
                    .map_err(|e| EtlError::write(&batch, e))?;
                for table in tables {
                    write_table(&mut *tx, table).await?;
                    tracing::debug!(table = table.name(), rows = table.len(), "table staged");
                }
                tx.commit().await.map_err(|e| EtlError::write(&batch, e))?;
                tracing::info!(tables = %batch, "tables replaced atomically");
            }
        }
        Ok(())
    }

    /// `SELECT COUNT(*)` on a stored table.
    pub async fn count_rows(&self, name: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", quote_ident(name)))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| EtlError::write(name, e))
    }

    /// Names of all user tables, sorted.
    #[cfg(test)]
    pub async fn table_names(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EtlError::write("sqlite_master", e))
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

async fn write_table(conn: &mut SqliteConnection, table: &Table) -> Result<()> {
    let name = table.name();
    let err = |e| EtlError::write(name, e);

    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
        .execute(&mut *conn)
        .await
        .map_err(err)?;

    sqlx::query(&create_table_sql(table))
        .execute(&mut *conn)
        .await
        .map_err(err)?;

    if table.fields().is_empty() {
        return Ok(());
    }

    let rows_per_batch = (MAX_BIND_PARAMS / table.fields().len()).max(1);
    let columns = table
        .fields()
        .iter()
        .map(|f| quote_ident(&f.name))
        .collect::<Vec<_>>()
        .join(", ");

    for chunk in table.rows().chunks(rows_per_batch) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("INSERT INTO {} ({}) ", quote_ident(name), columns));
        builder.push_values(chunk, |mut b, row| {
            for value in row {
                match value {
                    Value::Null => b.push_bind(None::<String>),
                    Value::Integer(i) => b.push_bind(*i),
                    Value::Real(f) => b.push_bind(*f),
                    Value::Text(s) => b.push_bind(s.clone()),
                    Value::Date(d) => b.push_bind(*d),
                };
            }
        });
        builder.build().execute(&mut *conn).await.map_err(err)?;
    }

    tracing::debug!(table = name, rows = table.len(), "rows inserted");
    Ok(())
}

fn create_table_sql(table: &Table) -> String {
    let columns = table
        .fields()
        .iter()
        .map(|field| {
            let mut column = format!("{} {}", quote_ident(&field.name), field.ty.sql_type());
            if table.primary_key() == Some(field.name.as_str()) {
                column.push_str(" PRIMARY KEY");
            }
            if !field.nullable {
                column.push_str(" NOT NULL");
            }
            column
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table.name()), columns)
}

/// Double-quote an SQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
