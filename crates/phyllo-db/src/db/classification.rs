use async_trait::async_trait;
use phyllo_core::{
    models::{ClassificationRecord, ClassificationUpdate, NewClassification},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const COLUMNS: &str = "id, original_filename, image_path, species, shape, species_confidence, \
    shape_confidence, user_id, is_archived, status, storage_tier, created_at, updated_at";

/// One page of a user's classifications plus the total count.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<ClassificationRecord>,
    pub total: i64,
}

/// Persistence contract for classification records
#[async_trait]
pub trait ClassificationRecordStore: Send + Sync {
    /// Insert a new record; status defaults to PENDING and the archival flag to false.
    async fn create(&self, new: NewClassification) -> Result<ClassificationRecord, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ClassificationRecord>, AppError>;

    /// Apply a partial update. Returns `None` when no record has this id.
    async fn update(
        &self,
        id: Uuid,
        update: ClassificationUpdate,
    ) -> Result<Option<ClassificationRecord>, AppError>;

    /// A user's records, newest first.
    async fn list_by_user(&self, user_id: &str, limit: i64, offset: i64)
        -> Result<Page, AppError>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), AppError>;
}

/// PostgreSQL repository for classification records
#[derive(Clone)]
pub struct ClassificationRepository {
    pool: PgPool,
}

impl ClassificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClassificationRecordStore for ClassificationRepository {
    #[tracing::instrument(skip(self, new), fields(db.table = "classifications", db.operation = "insert", user_id = %new.user_id))]
    async fn create(&self, new: NewClassification) -> Result<ClassificationRecord, AppError> {
        let sql = format!(
            r#"
            INSERT INTO classifications
                (original_filename, image_path, species, shape, species_confidence,
                 shape_confidence, user_id, storage_tier)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            COLUMNS
        );

        let record = sqlx::query_as::<Postgres, ClassificationRecord>(&sql)
            .bind(&new.original_filename)
            .bind(&new.image_path)
            .bind(&new.species)
            .bind(&new.shape)
            .bind(new.species_confidence)
            .bind(new.shape_confidence)
            .bind(&new.user_id)
            .bind(new.storage_tier)
            .fetch_one(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "classifications", db.operation = "select", db.record_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ClassificationRecord>, AppError> {
        let sql = format!("SELECT {} FROM classifications WHERE id = $1", COLUMNS);
        let record = sqlx::query_as::<Postgres, ClassificationRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "classifications", db.operation = "update", db.record_id = %id))]
    async fn update(
        &self,
        id: Uuid,
        update: ClassificationUpdate,
    ) -> Result<Option<ClassificationRecord>, AppError> {
        let sql = format!(
            r#"
            UPDATE classifications
            SET species = COALESCE($2, species),
                shape = COALESCE($3, shape),
                status = COALESCE($4, status),
                is_archived = COALESCE($5, is_archived),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        );

        let record = sqlx::query_as::<Postgres, ClassificationRecord>(&sql)
            .bind(id)
            .bind(update.species)
            .bind(update.shape)
            .bind(update.status)
            .bind(update.is_archived)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "classifications", db.operation = "select"))]
    async fn list_by_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Page, AppError> {
        let total = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM classifications WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {} FROM classifications WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            COLUMNS
        );
        let items = sqlx::query_as::<Postgres, ClassificationRecord>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page { items, total })
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
