use crate::{
    config::Config,
    detection::{Collaborators, Verdict},
    error::AttendanceError,
    model::attendance::AttendanceRecord,
    models::{MarkAttendanceReq, MarkAttendanceResponse, RecentAttendance},
    utils::image_store::{ImageStore, StoredImage},
};
use actix_web::web;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{Local, NaiveDate, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// Standard alphabet, padding optional.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Records check-ins from photos and lists the latest ones.
pub struct AttendanceService {
    pool: SqlitePool,
    store: ImageStore,
    collaborators: Collaborators,
    placeholder_name: String,
    recent_limit: u32,
}

impl AttendanceService {
    pub fn new(
        pool: SqlitePool,
        store: ImageStore,
        collaborators: Collaborators,
        config: &Config,
    ) -> Self {
        Self {
            pool,
            store,
            collaborators,
            placeholder_name: config.placeholder_name.clone(),
            recent_limit: config.recent_limit,
        }
    }

    pub async fn submit(
        &self,
        req: MarkAttendanceReq,
    ) -> Result<MarkAttendanceResponse, AttendanceError> {
        self.submit_on(req, Local::now().date_naive()).await
    }

    /// Marks attendance with `today` as the calendar date used for duplicates.
    #[instrument(skip(self, req), fields(date = %today))]
    pub async fn submit_on(
        &self,
        req: MarkAttendanceReq,
        today: NaiveDate,
    ) -> Result<MarkAttendanceResponse, AttendanceError> {
        let image_base64 = req
            .image_base64
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AttendanceError::MissingImage)?;

        let timestamp = req
            .timestamp
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(server_timestamp);

        let bytes = decode_payload(image_base64)?;
        debug!(len = bytes.len(), "decoded image payload");

        let collaborators = self.collaborators.clone();
        let (bytes, verdict) = web::block(move || {
            let verdict = collaborators.judge(&bytes);
            (bytes, verdict)
        })
        .await?;

        let name = match verdict.map_err(|e| AttendanceError::Collaborator(e.to_string()))? {
            Verdict::NoFace => return Err(AttendanceError::NoFace),
            Verdict::Spoof => return Err(AttendanceError::Spoof),
            Verdict::Accepted { recognized } => {
                recognized.unwrap_or_else(|| self.placeholder_name.clone())
            }
        };
        let date = today.format("%Y-%m-%d").to_string();

        // Cheap early out; the insert below is what actually enforces uniqueness.
        if self.already_marked(&name, &date).await? {
            return Err(AttendanceError::AlreadyMarked { name, date });
        }

        let stored = self.store.save(&bytes).await?;

        let record = AttendanceRecord::new(name, timestamp, date, &stored);

        match self.insert_if_absent(&record).await {
            Ok(true) => {}
            Ok(false) => {
                self.discard(&stored).await;
                return Err(AttendanceError::AlreadyMarked {
                    name: record.name,
                    date: record.date,
                });
            }
            Err(e) => {
                self.discard(&stored).await;
                return Err(e);
            }
        }

        info!(id = %record.id, name = %record.name, filename = %stored.filename, "attendance marked");

        Ok(MarkAttendanceResponse {
            ok: true,
            timestamp: record.timestamp,
            image_path: stored.url(),
            name: record.name,
        })
    }

    /// Newest first by timestamp, at most `RECENT_LIMIT` entries.
    pub async fn recent(&self) -> Result<Vec<RecentAttendance>, AttendanceError> {
        let rows = sqlx::query_as::<_, RecentAttendance>(
            r#"
            SELECT name AS person_text, timestamp, image_path
            FROM attendance
            ORDER BY timestamp DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(self.recent_limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RecentAttendance {
                image_path: format!("/{}", row.image_path.trim_start_matches('/')),
                ..row
            })
            .collect())
    }

    pub async fn image_file(&self, filename: &str) -> Result<PathBuf, AttendanceError> {
        self.store
            .resolve(filename)
            .await
            .ok_or_else(|| AttendanceError::ImageNotFound(filename.to_string()))
    }

    async fn already_marked(&self, name: &str, date: &str) -> Result<bool, AttendanceError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendance WHERE name = ? AND date = ?",
        )
        .bind(name)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Inserts the record unless `(name, date)` is taken. `false` on conflict.
    async fn insert_if_absent(&self, record: &AttendanceRecord) -> Result<bool, AttendanceError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (id, name, timestamp, date, image_path)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name, date) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.timestamp)
        .bind(&record.date)
        .bind(&record.image_path)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn discard(&self, image: &StoredImage) {
        if let Err(e) = self.store.remove(&image.filename).await {
            warn!(error = %e, filename = %image.filename, "failed to remove unrecorded image");
        }
    }
}

/// Strips an optional data URL header and any whitespace, then decodes.
fn decode_payload(payload: &str) -> Result<Vec<u8>, AttendanceError> {
    let data = match payload.split_once(',') {
        Some((header, data)) if header.starts_with("data:") && header.ends_with(";base64") => data,
        _ => payload,
    };
    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(BASE64.decode(cleaned)?)
}

fn server_timestamp() -> String {
    Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
