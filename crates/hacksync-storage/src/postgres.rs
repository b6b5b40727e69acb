use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hacksync_core::{DateConfidence, HackathonRecord, StoredHackathon};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;

use crate::store::{ActiveQuery, HackathonStore, StoreError, UpsertOutcome};

const SELECT_COLUMNS: &str = r#"
    id, title, description, source::text AS source, mode::text AS mode,
    registration_url, start_date, end_date, registration_deadline,
    prize_pool, skills, location, image_url, date_confidence,
    is_active, created_at, updated_at
"#;

/// Direct Postgres backend for deployments that own the database.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl HackathonStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn upsert(
        &self,
        record: &HackathonRecord,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO hackathons (
                title, description, source, mode, registration_url,
                start_date, end_date, registration_deadline,
                prize_pool, skills, location, image_url, date_confidence,
                is_active, created_at, updated_at
            )
            VALUES (
                $1, $2, $3::hackathon_source, $4::hackathon_mode, $5,
                $6, $7, $8,
                $9, $10, $11, $12, $13,
                TRUE, $14, $14
            )
            ON CONFLICT (title, source) DO UPDATE SET
                description = EXCLUDED.description,
                mode = EXCLUDED.mode,
                registration_url = EXCLUDED.registration_url,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                registration_deadline = EXCLUDED.registration_deadline,
                prize_pool = EXCLUDED.prize_pool,
                skills = EXCLUDED.skills,
                location = EXCLUDED.location,
                image_url = EXCLUDED.image_url,
                date_confidence = EXCLUDED.date_confidence,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.source.as_str())
        .bind(record.mode.as_str())
        .bind(&record.registration_url)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.registration_deadline)
        .bind(&record.prize_pool)
        .bind(&record.skills)
        .bind(&record.location)
        .bind(&record.image_url)
        .bind(confidence_str(record.date_confidence))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let inserted: bool = row.try_get("inserted")?;
        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE hackathons
               SET is_active = FALSE
             WHERE is_active
               AND registration_deadline < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_active(
        &self,
        query: &ActiveQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoredHackathon>, StoreError> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
              FROM hackathons
             WHERE is_active
               AND registration_deadline >= $1
               AND ($2::text IS NULL OR source::text = $2)
               AND ($3::text IS NULL OR mode::text = $3)
             ORDER BY registration_deadline ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(now)
            .bind(query.source.map(|s| s.as_str()))
            .bind(query.mode.map(|m| m.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_stored).collect()
    }
}

fn confidence_str(confidence: DateConfidence) -> &'static str {
    match confidence {
        DateConfidence::Parsed => "parsed",
        DateConfidence::Estimated => "estimated",
    }
}

fn row_to_stored(row: &PgRow) -> Result<StoredHackathon, StoreError> {
    let source: String = row.try_get("source")?;
    let mode: String = row.try_get("mode")?;
    let confidence: String = row.try_get("date_confidence")?;

    Ok(StoredHackathon {
        id: row.try_get("id")?,
        record: HackathonRecord {
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            registration_deadline: row.try_get("registration_deadline")?,
            registration_url: row.try_get("registration_url")?,
            source: source
                .parse()
                .map_err(|e| StoreError::InvalidRow(format!("{e}")))?,
            mode: mode.parse().map_err(|e| StoreError::InvalidRow(format!("{e}")))?,
            location: row.try_get("location")?,
            prize_pool: row.try_get("prize_pool")?,
            image_url: row.try_get("image_url")?,
            skills: row.try_get("skills")?,
            date_confidence: if confidence == "estimated" {
                DateConfidence::Estimated
            } else {
                DateConfidence::Parsed
            },
        },
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
