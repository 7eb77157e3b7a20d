//! Postgres + pgvector backed collections.
//!
//! Each collection is a table with a `document JSONB` column holding the
//! record and a `vector` column named after the embedding field. Similarity
//! is `1 - cosine distance`; the HNSW candidate pool is set per query.

use async_trait::async_trait;
use revo_core::{ScoredDocument, VectorCollection, VectorQuery};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, FromQueryResult, Statement, TransactionTrait,
};
use tracing::{debug, info, warn};

use crate::scoring::pgvector_literal;

/// pgvector rejects `hnsw.ef_search` outside this range.
const MAX_EF_SEARCH: usize = 1000;

#[derive(Debug, FromQueryResult)]
struct ScoredRow {
    document: serde_json::Value,
    score: f64,
}

#[derive(Debug, FromQueryResult)]
struct IndexRow {
    indexname: String,
}

/// Accept plain SQL identifiers only; they are interpolated into queries.
fn checked_identifier(name: &str) -> anyhow::Result<&str> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        anyhow::bail!("invalid SQL identifier: {name:?}")
    }
}

pub struct PgVectorCollection {
    db: DatabaseConnection,
    table: String,
}

impl PgVectorCollection {
    pub fn new(db: DatabaseConnection, table: &str) -> anyhow::Result<Self> {
        let table = checked_identifier(table)?.to_string();
        Ok(Self { db, table })
    }

    /// Fail unless `index_name` exists on this collection's table.
    pub async fn verify_index(&self, index_name: &str) -> anyhow::Result<()> {
        let rows = IndexRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT indexname FROM pg_indexes WHERE tablename = $1 AND indexname = $2",
            [self.table.clone().into(), index_name.to_string().into()],
        ))
        .all(&self.db)
        .await?;

        if rows.iter().any(|r| r.indexname == index_name) {
            info!("Verified vector index {index_name} on {}", self.table);
            Ok(())
        } else {
            anyhow::bail!("vector index {index_name} not found on table {}", self.table)
        }
    }
}

#[async_trait]
impl VectorCollection for PgVectorCollection {
    fn name(&self) -> &str {
        &self.table
    }

    async fn nearest(&self, query: &VectorQuery<'_>) -> anyhow::Result<Vec<ScoredDocument>> {
        let column = checked_identifier(query.embedding_field)?;
        let limit = i64::try_from(query.limit)?;
        let ef_search = query.num_candidates.clamp(1, MAX_EF_SEARCH);

        let sql = format!(
            "SELECT document, (1 - ({column} <=> $1::vector))::float8 AS score \
             FROM {table} ORDER BY {column} <=> $1::vector LIMIT $2",
            table = self.table
        );
        debug!(
            "pgvector query on {} via {} (ef_search={ef_search}, limit={limit})",
            self.table, query.index_name
        );

        let txn = self.db.begin().await?;
        txn.execute_unprepared(&format!("SET LOCAL hnsw.ef_search = {ef_search}"))
            .await?;
        let rows = ScoredRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [pgvector_literal(query.vector).into(), limit.into()],
        ))
        .all(&txn)
        .await?;
        txn.commit().await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row.document {
                serde_json::Value::Object(document) => Some(ScoredDocument {
                    document,
                    score: row.score,
                }),
                other => {
                    warn!("Skipping non-object document in {}: {other}", self.table);
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_checked() {
        assert!(checked_identifier("properties").is_ok());
        assert!(checked_identifier("revo_emb2").is_ok());
        assert!(checked_identifier("").is_err());
        assert!(checked_identifier("1table").is_err());
        assert!(checked_identifier("x; DROP TABLE y").is_err());
        assert!(checked_identifier("a-b").is_err());
    }
}
