//! Document catalog (PostgreSQL) and original file storage (S3).

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::{DocumentKind, DocumentRow, DocumentSummary};

/// Parameters for storing one uploaded document.
pub struct NewDocument<'a> {
    pub kind: DocumentKind,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub data: Bytes,
    pub extracted_text: &'a str,
}

/// Thin wrapper binding the S3 client to the configured bucket.
#[derive(Clone)]
pub struct ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Bytes, AppError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("download of {key} failed: {e}")))?;
        let data = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::S3(format!("reading {key} failed: {e}")))?;
        Ok(data.into_bytes())
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("delete of {key} failed: {e}")))?;
        Ok(())
    }
}

/// Object key for a new upload. Every upload gets its own key so a replaced
/// original stays readable until the catalog points at its successor.
pub fn object_key(kind: DocumentKind, filename: &str) -> String {
    format!(
        "{}/{}/{}",
        kind.storage_prefix(),
        Uuid::new_v4().simple(),
        filename
    )
}

/// Best-effort removal of objects no row refers to.
async fn discard_objects(objects: &ObjectStore, keys: &[String]) {
    for key in keys {
        if let Err(e) = objects.delete(key).await {
            warn!("Could not remove unreferenced object {key}: {e}");
        }
    }
}

/// Stores a batch of uploads, all or nothing.
///
/// Originals are written to fresh keys first, then every catalog row is upserted
/// inside one transaction. If anything fails the new objects are discarded and the
/// catalog is unchanged. After commit, originals replaced by a same-name upload
/// are removed.
pub async fn save_documents(
    pool: &PgPool,
    objects: &ObjectStore,
    docs: Vec<NewDocument<'_>>,
) -> Result<Vec<DocumentRow>, AppError> {
    let mut written: Vec<String> = Vec::with_capacity(docs.len());
    for doc in &docs {
        let key = object_key(doc.kind, doc.filename);
        if let Err(e) = objects.put(&key, doc.data.clone(), doc.content_type).await {
            discard_objects(objects, &written).await;
            return Err(e);
        }
        info!("Uploaded {} to s3://{}/{}", doc.filename, objects.bucket(), key);
        written.push(key);
    }

    match upsert_rows(pool, &docs, &written).await {
        Ok((rows, superseded)) => {
            discard_objects(objects, &superseded).await;
            Ok(rows)
        }
        Err(e) => {
            warn!("Catalog update failed, discarding {} new object(s)", written.len());
            discard_objects(objects, &written).await;
            Err(e)
        }
    }
}

/// Upserts one row per document in a single transaction. Returns the stored rows
/// and the object keys they replaced.
async fn upsert_rows(
    pool: &PgPool,
    docs: &[NewDocument<'_>],
    keys: &[String],
) -> Result<(Vec<DocumentRow>, Vec<String>), AppError> {
    let mut tx = pool.begin().await?;
    let mut rows = Vec::with_capacity(docs.len());
    let mut superseded = Vec::new();

    for (doc, key) in docs.iter().zip(keys) {
        let previous: Option<String> = sqlx::query_scalar(
            "SELECT s3_key FROM documents WHERE kind = $1 AND filename = $2 FOR UPDATE",
        )
        .bind(doc.kind.as_str())
        .bind(doc.filename)
        .fetch_optional(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents
                (id, kind, filename, content_type, s3_key, size_bytes, extracted_text)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (kind, filename) DO UPDATE SET
                content_type = EXCLUDED.content_type,
                s3_key = EXCLUDED.s3_key,
                size_bytes = EXCLUDED.size_bytes,
                extracted_text = EXCLUDED.extracted_text,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(doc.kind.as_str())
        .bind(doc.filename)
        .bind(doc.content_type)
        .bind(key)
        .bind(doc.data.len() as i64)
        .bind(doc.extracted_text)
        .fetch_one(&mut *tx)
        .await?;

        info!("Catalogued {} {} as {}", doc.kind, row.filename, row.id);
        superseded.extend(previous);
        rows.push(row);
    }

    tx.commit().await?;
    Ok((rows, superseded))
}

/// Lists documents of one kind ordered by filename.
pub async fn list_documents(
    pool: &PgPool,
    kind: DocumentKind,
) -> Result<Vec<DocumentSummary>, AppError> {
    let rows = sqlx::query_as::<_, DocumentSummary>(
        r#"
        SELECT id, kind, filename, content_type, size_bytes, created_at, updated_at
        FROM documents
        WHERE kind = $1
        ORDER BY filename
        "#,
    )
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Full rows of one kind, extracted text included, ordered by filename.
pub async fn load_documents(pool: &PgPool, kind: DocumentKind) -> Result<Vec<DocumentRow>, AppError> {
    let rows = sqlx::query_as::<_, DocumentRow>(
        "SELECT * FROM documents WHERE kind = $1 ORDER BY filename",
    )
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_document(pool: &PgPool, id: Uuid) -> Result<DocumentRow, AppError> {
    sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))
}

pub async fn get_document_by_filename(
    pool: &PgPool,
    kind: DocumentKind,
    filename: &str,
) -> Result<DocumentRow, AppError> {
    sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE kind = $1 AND filename = $2")
        .bind(kind.as_str())
        .bind(filename)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{kind} '{filename}' not found")))
}

/// Removes the catalog row, then the stored original. Once the row is gone the
/// document is deleted; an original left behind in storage is only logged.
pub async fn delete_document(
    pool: &PgPool,
    objects: &ObjectStore,
    id: Uuid,
) -> Result<DocumentRow, AppError> {
    let row = sqlx::query_as::<_, DocumentRow>("DELETE FROM documents WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {id} not found")))?;

    discard_objects(objects, std::slice::from_ref(&row.s3_key)).await;
    info!("Deleted {} {} ({})", row.kind, row.filename, row.id);
    Ok(row)
}
