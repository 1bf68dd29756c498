//! Profile catalog using PostgreSQL.

use std::sync::Arc;

use argo_common::{
    parse_timestamp, CanonicalField, DatasetMetadata, MeasurementRecord, SourcedRecord,
    TIME_END_KEY, TIME_START_KEY,
};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Rows per multi-value INSERT; 7 binds each stays well under the
/// Postgres limit of 65535 parameters.
const INSERT_BATCH: usize = 1000;

/// Database connection pool and catalog operations.
pub struct Catalog {
    pool: PgPool,
}

impl Catalog {
    /// Create a new catalog connection from database URL.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Database(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> StorageResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StorageError::Database(format!("Migration failed: {}", e)))?;
            }
        }

        Ok(())
    }

    /// Insert or replace the metadata of a dataset.
    pub async fn register_metadata(
        &self,
        dataset_id: &str,
        metadata: &DatasetMetadata,
    ) -> StorageResult<()> {
        let row = ProfileMetadataRow::from_metadata(dataset_id, metadata);

        sqlx::query(
            r#"
            INSERT INTO profile_metadata (
                dataset_id, title, institution, source, history, references_text,
                user_manual_version, conventions, feature_type,
                temperature_min, temperature_max,
                pressure_min, pressure_max,
                salinity_min, salinity_max,
                time_start, time_end, attributes, ingested_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8, $9,
                $10, $11,
                $12, $13,
                $14, $15,
                $16, $17, $18, $19
            )
            ON CONFLICT (dataset_id)
            DO UPDATE SET
                title = EXCLUDED.title,
                institution = EXCLUDED.institution,
                source = EXCLUDED.source,
                history = EXCLUDED.history,
                references_text = EXCLUDED.references_text,
                user_manual_version = EXCLUDED.user_manual_version,
                conventions = EXCLUDED.conventions,
                feature_type = EXCLUDED.feature_type,
                temperature_min = EXCLUDED.temperature_min,
                temperature_max = EXCLUDED.temperature_max,
                pressure_min = EXCLUDED.pressure_min,
                pressure_max = EXCLUDED.pressure_max,
                salinity_min = EXCLUDED.salinity_min,
                salinity_max = EXCLUDED.salinity_max,
                time_start = EXCLUDED.time_start,
                time_end = EXCLUDED.time_end,
                attributes = EXCLUDED.attributes,
                ingested_at = EXCLUDED.ingested_at
            "#,
        )
        .bind(&row.dataset_id)
        .bind(&row.title)
        .bind(&row.institution)
        .bind(&row.source)
        .bind(&row.history)
        .bind(&row.references_text)
        .bind(&row.user_manual_version)
        .bind(&row.conventions)
        .bind(&row.feature_type)
        .bind(row.temperature_min)
        .bind(row.temperature_max)
        .bind(row.pressure_min)
        .bind(row.pressure_max)
        .bind(row.salinity_min)
        .bind(row.salinity_max)
        .bind(row.time_start)
        .bind(row.time_end)
        .bind(Json(metadata))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(format!("Insert failed: {}", e)))?;

        debug!(dataset = %dataset_id, "Registered metadata");
        Ok(())
    }

    /// Fetch the full metadata document of a dataset.
    pub async fn get_metadata(&self, dataset_id: &str) -> StorageResult<Option<DatasetMetadata>> {
        let row = sqlx::query_scalar::<_, Json<DatasetMetadata>>(
            "SELECT attributes FROM profile_metadata WHERE dataset_id = $1",
        )
        .bind(dataset_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?;

        Ok(row.map(|Json(metadata)| metadata))
    }

    /// Datasets whose time span intersects `[start, end]`.
    pub async fn find_datasets_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StorageResult<Vec<ProfileMetadataRow>> {
        let rows = sqlx::query_as::<_, ProfileMetadataRow>(
            "SELECT dataset_id, title, institution, source, history, references_text, \
             user_manual_version, conventions, feature_type, \
             temperature_min, temperature_max, pressure_min, pressure_max, \
             salinity_min, salinity_max, time_start, time_end \
             FROM profile_metadata \
             WHERE time_start <= $2 AND time_end >= $1 \
             ORDER BY time_start ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?;

        Ok(rows)
    }

    /// Insert or replace the measurement rows of a dataset.
    ///
    /// Returns the number of rows written.
    pub async fn insert_measurements(
        &self,
        dataset_id: &str,
        records: &[MeasurementRecord],
    ) -> StorageResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Database(format!("Transaction failed: {}", e)))?;

        let mut written = 0;
        for batch in records.chunks(INSERT_BATCH) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO profile_measurements \
                 (dataset_id, profile_id, depth_level, time, pressure, temperature, salinity) ",
            );
            builder.push_values(batch, |mut b, r| {
                b.push_bind(dataset_id)
                    .push_bind(r.profile_id as i32)
                    .push_bind(r.depth_level as i32)
                    .push_bind(r.time)
                    .push_bind(r.pressure)
                    .push_bind(r.temperature)
                    .push_bind(r.salinity);
            });
            builder.push(
                " ON CONFLICT (dataset_id, profile_id, depth_level) DO UPDATE SET \
                 time = EXCLUDED.time, pressure = EXCLUDED.pressure, \
                 temperature = EXCLUDED.temperature, salinity = EXCLUDED.salinity",
            );

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Database(format!("Insert failed: {}", e)))?;
            written += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Database(format!("Commit failed: {}", e)))?;

        info!(dataset = %dataset_id, rows = written, "Stored measurements");
        Ok(written)
    }

    /// All measurement rows in (time, dataset, profile, depth) order.
    /// Rows without a time come last.
    pub async fn fetch_records_ordered(&self) -> StorageResult<Vec<SourcedRecord>> {
        let rows = sqlx::query_as::<_, MeasurementRow>(
            "SELECT dataset_id, profile_id, depth_level, time, pressure, temperature, salinity \
             FROM profile_measurements \
             ORDER BY time ASC NULLS LAST, dataset_id, profile_id, depth_level",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?;

        Ok(MeasurementRow::into_sourced(rows))
    }

    /// Number of measurement rows stored for a dataset.
    pub async fn count_measurements(&self, dataset_id: &str) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM profile_measurements WHERE dataset_id = $1",
        )
        .bind(dataset_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))
    }
}

/// Relational projection of a metadata record.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProfileMetadataRow {
    pub dataset_id: String,
    pub title: Option<String>,
    pub institution: Option<String>,
    pub source: Option<String>,
    pub history: Option<String>,
    pub references_text: Option<String>,
    pub user_manual_version: Option<String>,
    pub conventions: Option<String>,
    pub feature_type: Option<String>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub pressure_min: Option<f64>,
    pub pressure_max: Option<f64>,
    pub salinity_min: Option<f64>,
    pub salinity_max: Option<f64>,
    pub time_start: Option<DateTime<Utc>>,
    pub time_end: Option<DateTime<Utc>>,
}

impl ProfileMetadataRow {
    pub fn from_metadata(dataset_id: &str, metadata: &DatasetMetadata) -> Self {
        let text = |key: &str| metadata.text(key);
        let number = |key: String| metadata.get(&key).and_then(|v| v.as_f64());
        let min = |field: CanonicalField| number(field.min_key());
        let max = |field: CanonicalField| number(field.max_key());
        let time = |key: &str| {
            metadata
                .get(key)
                .and_then(|v| v.as_str())
                .and_then(|s| parse_timestamp(s).ok())
        };

        Self {
            dataset_id: dataset_id.to_string(),
            title: text("title"),
            institution: text("institution"),
            source: text("source"),
            history: text("history"),
            references_text: text("references"),
            user_manual_version: text("user_manual_version"),
            conventions: text("Conventions"),
            feature_type: text("featureType"),
            temperature_min: min(CanonicalField::Temperature),
            temperature_max: max(CanonicalField::Temperature),
            pressure_min: min(CanonicalField::Pressure),
            pressure_max: max(CanonicalField::Pressure),
            salinity_min: min(CanonicalField::Salinity),
            salinity_max: max(CanonicalField::Salinity),
            time_start: time(TIME_START_KEY),
            time_end: time(TIME_END_KEY),
        }
    }
}

/// Internal row type for measurement queries.
#[derive(Debug, FromRow)]
pub struct MeasurementRow {
    pub dataset_id: String,
    pub profile_id: i32,
    pub depth_level: i32,
    pub time: Option<DateTime<Utc>>,
    pub pressure: f64,
    pub temperature: f64,
    pub salinity: Option<f64>,
}

impl MeasurementRow {
    /// Convert rows, sharing one dataset id allocation per run of rows.
    fn into_sourced(rows: Vec<MeasurementRow>) -> Vec<SourcedRecord> {
        let mut current: Option<Arc<str>> = None;
        rows.into_iter()
            .map(|row| {
                let dataset = match &current {
                    Some(id) if id.as_ref() == row.dataset_id => id.clone(),
                    _ => {
                        let id: Arc<str> = Arc::from(row.dataset_id.as_str());
                        current = Some(id.clone());
                        id
                    }
                };
                SourcedRecord::new(
                    dataset,
                    MeasurementRecord {
                        profile_id: row.profile_id as u32,
                        depth_level: row.depth_level as u32,
                        time: row.time,
                        pressure: row.pressure,
                        temperature: row.temperature,
                        salinity: row.salinity,
                    },
                )
            })
            .collect()
    }
}

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS profile_metadata (
    dataset_id TEXT PRIMARY KEY,
    title TEXT,
    institution TEXT,
    source TEXT,
    history TEXT,
    references_text TEXT,
    user_manual_version TEXT,
    conventions TEXT,
    feature_type TEXT,
    temperature_min DOUBLE PRECISION,
    temperature_max DOUBLE PRECISION,
    pressure_min DOUBLE PRECISION,
    pressure_max DOUBLE PRECISION,
    salinity_min DOUBLE PRECISION,
    salinity_max DOUBLE PRECISION,
    time_start TIMESTAMPTZ,
    time_end TIMESTAMPTZ,
    attributes JSONB NOT NULL,
    ingested_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_profile_metadata_time ON profile_metadata(time_start, time_end);

CREATE TABLE IF NOT EXISTS profile_measurements (
    dataset_id TEXT NOT NULL,
    profile_id INTEGER NOT NULL,
    depth_level INTEGER NOT NULL,
    time TIMESTAMPTZ,
    pressure DOUBLE PRECISION NOT NULL,
    temperature DOUBLE PRECISION NOT NULL,
    salinity DOUBLE PRECISION,

    PRIMARY KEY (dataset_id, profile_id, depth_level)
);

CREATE INDEX IF NOT EXISTS idx_profile_measurements_time ON profile_measurements(time)
"#;
