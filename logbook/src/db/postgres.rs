//! PostgreSQL-backed document store.
//!
//! Every collection lives in the single `documents` table created by the embedded
//! migrations; a document's fields are one JSONB value. Equality filters compare the
//! top-level JSONB member against the filter value, and `seq` gives insertion order.

use sqlx::{FromRow, PgPool, types::Json};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    errors::{DbError, Result},
    store::{Document, DocumentRef, DocumentStore, FieldFilter, Fields},
};

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    collection: String,
    data: Json<Fields>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            reference: DocumentRef::new(row.collection, row.id),
            fields: row.data.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgDocumentStore {
    #[instrument(skip(self, fields), err)]
    async fn add(&self, collection: &str, fields: Fields) -> Result<DocumentRef> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO documents (id, collection, data) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(collection)
            .bind(Json(&fields))
            .execute(&self.pool)
            .await?;

        Ok(DocumentRef::new(collection, id))
    }

    #[instrument(skip(self, filter), fields(field = %filter.field), err)]
    async fn query(&self, collection: &str, filter: &FieldFilter, limit: Option<usize>) -> Result<Vec<Document>> {
        // LIMIT NULL is "no limit" in PostgreSQL
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));

        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, collection, data
            FROM documents
            WHERE collection = $1 AND data -> $2 = $3
            ORDER BY seq
            LIMIT $4
            "#,
        )
        .bind(collection)
        .bind(&filter.field)
        .bind(Json(&filter.value))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    #[instrument(skip(self), fields(reference = %reference), err)]
    async fn get(&self, reference: &DocumentRef) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>("SELECT id, collection, data FROM documents WHERE id = $1 AND collection = $2")
            .bind(reference.id)
            .bind(&reference.collection)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Document::from))
    }

    #[instrument(skip(self, fields), fields(reference = %reference), err)]
    async fn update(&self, reference: &DocumentRef, fields: Fields) -> Result<()> {
        let result = sqlx::query("UPDATE documents SET data = $3, updated_at = NOW() WHERE id = $1 AND collection = $2")
            .bind(reference.id)
            .bind(&reference.collection)
            .bind(Json(&fields))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
