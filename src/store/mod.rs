//! Durable record of accepted plates: SQLite rows, a CSV export and the
//! cropped plate images.

mod export;

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::warn;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::config::StorageSettings;
use crate::models::ValidatedReading;

pub use export::{CsvExport, CsvRecord};

/// Consumer of accepted readings. Called exactly once per accepted decision.
pub trait PersistenceGateway: Send + Sync {
    fn persist(&self, reading: &ValidatedReading) -> impl Future<Output = anyhow::Result<()>> + Send;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlateRecord {
    pub id: i64,
    pub timestamp: String,
    pub plate_number: String,
    pub confidence: f64,
    pub image_path: Option<String>,
    pub location: Option<String>,
    /// Seconds from the start of the frame to the decision.
    pub processing_time: Option<f64>,
    pub detection_method: Option<String>,
}

/// Detections recorded on one day.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailyStatistics {
    pub total: i64,
    pub unique: i64,
    pub average_confidence: f64,
}

#[derive(Debug)]
pub struct PlateStore {
    pool: SqlitePool,
    images_dir: PathBuf,
    export: CsvExport,
}

impl PlateStore {
    pub async fn open(settings: &StorageSettings) -> anyhow::Result<Self> {
        for dir in [
            settings.database.parent(),
            settings.csv.parent(),
            Some(settings.images_dir.as_path()),
        ]
        .into_iter()
        .flatten()
        .filter(|dir| !dir.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory {:?}", dir))?;
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(&settings.database)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("Failed to open database {:?}", settings.database))?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            pool,
            images_dir: settings.images_dir.clone(),
            export: CsvExport::new(settings.csv.clone()),
        })
    }

    pub async fn records(&self) -> anyhow::Result<Vec<PlateRecord>> {
        let records = sqlx::query_as::<_, PlateRecord>(
            "SELECT id, timestamp, plate_number, confidence, image_path, location, processing_time,
                    detection_method
             FROM plates ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn statistics(&self, date: Date) -> anyhow::Result<DailyStatistics> {
        let day = date.format(format_description!("[year]-[month]-[day]"))?;
        let (total, unique, average) = sqlx::query_as::<_, (i64, i64, Option<f64>)>(
            "SELECT COUNT(*), COUNT(DISTINCT plate_number), AVG(confidence)
             FROM plates WHERE DATE(timestamp) = ?",
        )
        .bind(day)
        .fetch_one(&self.pool)
        .await?;

        Ok(DailyStatistics {
            total,
            unique,
            average_confidence: average.unwrap_or(0.0),
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Save the region crop as PNG, returning its path.
    async fn archive_image(&self, reading: &ValidatedReading) -> anyhow::Result<PathBuf> {
        let stamp = reading
            .timestamp
            .format(format_description!("[year][month][day]_[hour][minute][second]"))?;
        let label: String = reading.plate.chars().filter(char::is_ascii_alphanumeric).collect();
        let path = self
            .images_dir
            .join(format!("plate_{}_{}_{}.png", stamp, label, Uuid::new_v4().simple()));

        let image = reading.region.image.clone();
        let dest = path.clone();
        tokio::task::spawn_blocking(move || image.save(&dest))
            .await?
            .with_context(|| format!("Failed to save plate image {:?}", path))?;
        Ok(path)
    }

    async fn record(&self, reading: &ValidatedReading, image_path: &Path) -> anyhow::Result<()> {
        let timestamp = format_timestamp(reading.timestamp)?;
        let image_path_str = image_path.to_string_lossy().into_owned();

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query(
            "INSERT INTO plates (timestamp, plate_number, confidence, image_path, location,
                                 processing_time, detection_method)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&timestamp)
        .bind(&reading.plate)
        .bind(reading.confidence as f64)
        .bind(&image_path_str)
        .bind(reading.region.bbox.to_string())
        .bind(reading.processing_time.as_secs_f64())
        .bind(reading.source_variant.as_str())
        .execute(&mut *tx)
        .await
        .context("Failed to insert plate record")?;

        self.export.append(&CsvRecord {
            timestamp,
            plate_number: reading.plate.clone(),
            confidence: format!("{:.2}%", reading.confidence),
            image_path: image_path_str,
        })?;

        tx.commit().await.context("Failed to commit plate record")?;
        Ok(())
    }
}

impl PersistenceGateway for PlateStore {
    /// Write the image, the row and the CSV line as one unit.
    ///
    /// The row is inserted in a transaction that commits only after the CSV
    /// append succeeds; on any failure the transaction rolls back and the
    /// archived image is removed.
    async fn persist(&self, reading: &ValidatedReading) -> anyhow::Result<()> {
        let image_path = self.archive_image(reading).await?;
        let result = self.record(reading, &image_path).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&image_path).await {
                warn!("failed to remove orphaned image {:?}: {}", image_path, e);
            }
        }
        result
    }
}

fn format_timestamp(timestamp: OffsetDateTime) -> anyhow::Result<String> {
    Ok(timestamp.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))?)
}

/// Whether `path` exists and holds data.
fn has_content(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}
