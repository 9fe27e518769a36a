// PostgreSQL document backend: one JSONB table per collection
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Arguments, PgPool, Row};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::DocumentBackend;
use crate::error::{DatabaseError, DatabaseResult};
use crate::query::{Filter, Query, SortDirection};
use crate::schema::{is_valid_identifier, IndexSpec};

const UNIQUE_VIOLATION: &str = "23505";

/// Pool settings for [`PostgresBackend::connect`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Create a new backend from a connection string
    pub async fn connect(connection_string: &str, config: &PoolConfig) -> DatabaseResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(connection_string)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!("Database connection pool created successfully");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn table_name(collection: &str) -> DatabaseResult<String> {
    if is_valid_identifier(collection) {
        Ok(format!("documents_{collection}"))
    } else {
        Err(DatabaseError::InvalidIdentifier(collection.to_string()))
    }
}

fn checked_field(field: &str) -> DatabaseResult<&str> {
    if is_valid_identifier(field) {
        Ok(field)
    } else {
        Err(DatabaseError::InvalidIdentifier(field.to_string()))
    }
}

fn map_write_error(collection: &str, err: sqlx::Error) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            DatabaseError::DuplicateKey {
                collection: collection.to_string(),
                index: db.constraint().unwrap_or("primary").to_string(),
            }
        }
        _ => DatabaseError::SqlxError(err),
    }
}

/// Builds the `CREATE [UNIQUE] INDEX` statement for a declared index.
pub(crate) fn index_ddl(collection: &str, index: &IndexSpec) -> DatabaseResult<String> {
    let table = table_name(collection)?;
    let name = checked_field(index.name)?;
    let columns = index
        .fields
        .iter()
        .map(|f| checked_field(f).map(|f| format!("(doc->>'{f}')")))
        .collect::<DatabaseResult<Vec<_>>>()?
        .join(", ");
    let unique = if index.unique { "UNIQUE " } else { "" };
    Ok(format!(
        "CREATE {unique}INDEX IF NOT EXISTS {name} ON {table} ({columns})"
    ))
}

/// WHERE clause for a filter, appending its bind values to `args`.
fn where_clause(filter: &Filter, args: &mut PgArguments) -> DatabaseResult<String> {
    let mut clauses = Vec::new();
    let mut position = 1;
    if !filter.equals.is_empty() {
        args.add(Json(filter.containment_object()));
        clauses.push(format!("doc @> ${position}"));
        position += 1;
    }
    for (field, needle) in &filter.contains {
        let field = checked_field(field)?;
        let escaped = needle
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        args.add(format!("%{escaped}%"));
        clauses.push(format!("doc->>'{field}' ILIKE ${position}"));
        position += 1;
    }
    if clauses.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", clauses.join(" AND ")))
    }
}

#[async_trait]
impl DocumentBackend for PostgresBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn ensure_collection(
        &self,
        collection: &str,
        indexes: &[IndexSpec],
    ) -> DatabaseResult<()> {
        let table = table_name(collection)?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (id UUID PRIMARY KEY, doc JSONB NOT NULL)"
        ))
        .execute(&self.pool)
        .await?;

        for index in indexes {
            let ddl = index_ddl(collection, index)?;
            debug!(collection, index = index.name, "Ensuring index");
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, id: Uuid, doc: JsonValue) -> DatabaseResult<()> {
        let table = table_name(collection)?;
        sqlx::query(&format!("INSERT INTO {table} (id, doc) VALUES ($1, $2)"))
            .bind(id)
            .bind(Json(doc))
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(collection, e))?;
        Ok(())
    }

    async fn replace(&self, collection: &str, id: Uuid, doc: JsonValue) -> DatabaseResult<()> {
        let table = table_name(collection)?;
        let result = sqlx::query(&format!("UPDATE {table} SET doc = $2 WHERE id = $1"))
            .bind(id)
            .bind(Json(doc))
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(collection, e))?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                collection: collection.to_string(),
                id,
            });
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: Uuid) -> DatabaseResult<Option<JsonValue>> {
        let table = table_name(collection)?;
        let row = sqlx::query(&format!("SELECT doc FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.try_get::<Json<JsonValue>, _>("doc").map(|j| j.0))
            .transpose()
            .map_err(DatabaseError::from)
    }

    async fn find(&self, collection: &str, query: &Query) -> DatabaseResult<Vec<JsonValue>> {
        let table = table_name(collection)?;
        let mut args = PgArguments::default();
        let mut sql = format!("SELECT doc FROM {table}");
        sql.push_str(&where_clause(&query.filter, &mut args)?);

        if let Some(sort) = &query.sort {
            let field = checked_field(&sort.field)?;
            let direction = match sort.direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            sql.push_str(&format!(
                " ORDER BY {} {direction}, id {direction}",
                sort_expression(field)
            ));
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if query.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", query.offset));
        }

        let rows = sqlx::query_with(&sql, args).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|r| {
                r.try_get::<Json<JsonValue>, _>("doc")
                    .map(|j| j.0)
                    .map_err(DatabaseError::from)
            })
            .collect()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> DatabaseResult<u64> {
        let table = table_name(collection)?;
        let mut args = PgArguments::default();
        let sql = format!(
            "SELECT COUNT(*) AS n FROM {table}{}",
            where_clause(filter, &mut args)?
        );
        let row = sqlx::query_with(&sql, args).fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn delete(&self, collection: &str, id: Uuid) -> DatabaseResult<bool> {
        let table = table_name(collection)?;
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> DatabaseResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!("Database health check failed: {}", e);
                DatabaseError::ConnectionFailed(e.to_string())
            })
    }
}

/// `*_at` fields hold RFC 3339 text with varying fractional digits, so they
/// are cast before ordering.
fn sort_expression(field: &str) -> String {
    if field.ends_with("_at") {
        format!("(doc->>'{field}')::timestamptz")
    } else {
        format!("doc->'{field}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_fields_sort_as_timestamptz() {
        assert_eq!(sort_expression("created_at"), "(doc->>'created_at')::timestamptz");
        assert_eq!(sort_expression("name"), "doc->'name'");
    }

    #[test]
    fn test_index_ddl() {
        let ddl = index_ddl("users", &IndexSpec::unique("users_email", &["email"])).unwrap();
        assert_eq!(
            ddl,
            "CREATE UNIQUE INDEX IF NOT EXISTS users_email ON documents_users ((doc->>'email'))"
        );
        let ddl = index_ddl(
            "notes",
            &IndexSpec::new("notes_doctor_status", &["doctor_id", "status"]),
        )
        .unwrap();
        assert!(ddl.starts_with("CREATE INDEX IF NOT EXISTS notes_doctor_status"));
        assert!(ddl.contains("(doc->>'doctor_id'), (doc->>'status')"));
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        assert!(table_name("users; drop").is_err());
        let bad = IndexSpec::new("ok", &["x') OR 1=1"]);
        assert!(index_ddl("users", &bad).is_err());
    }

    #[test]
    fn test_where_clause_numbering() {
        let filter = Filter::new()
            .eq("doctor_id", "d")
            .unwrap()
            .contains_text("name", "50%");
        let mut args = PgArguments::default();
        let clause = where_clause(&filter, &mut args).unwrap();
        assert_eq!(clause, " WHERE doc @> $1 AND doc->>'name' ILIKE $2");
    }
}
