//! SQLite-Implementierung des MessageStore

use chrono::{DateTime, Utc};
use tauschwerk_core::NutzerId;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NachrichtRecord, NeueNachricht};
use crate::repository::{MessageStore, StoreResult};
use crate::sqlite::pool::SqliteStore;

/// Zeitstempel-Format mit Millisekunden, damit die lexikalische Ordnung
/// der Spalte der zeitlichen Ordnung entspricht
const ZEIT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

impl MessageStore for SqliteStore {
    async fn create(&self, data: NeueNachricht<'_>) -> StoreResult<NachrichtRecord> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let now_str = now.format(ZEIT_FORMAT).to_string();

        sqlx::query(
            "INSERT INTO nachrichten (id, absender, empfaenger, inhalt, gelesen, zeitstempel)
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(id.to_string())
        .bind(data.absender.als_str())
        .bind(data.empfaenger.als_str())
        .bind(data.inhalt)
        .bind(&now_str)
        .execute(&self.pool)
        .await?;

        Ok(NachrichtRecord {
            id,
            absender: data.absender.clone(),
            empfaenger: data.empfaenger.clone(),
            inhalt: data.inhalt.to_string(),
            gelesen: false,
            zeitstempel: now,
        })
    }

    async fn get_conversation(
        &self,
        a: &NutzerId,
        b: &NutzerId,
        limit: i64,
    ) -> StoreResult<Vec<NachrichtRecord>> {
        let rows = sqlx::query(
            "SELECT id, absender, empfaenger, inhalt, gelesen, zeitstempel
             FROM nachrichten
             WHERE (absender = ? AND empfaenger = ?)
                OR (absender = ? AND empfaenger = ?)
             ORDER BY zeitstempel DESC
             LIMIT ?",
        )
        .bind(a.als_str())
        .bind(b.als_str())
        .bind(b.als_str())
        .bind(a.als_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        // Chronologisch sortieren (aelteste zuerst)
        let mut records: Vec<NachrichtRecord> =
            rows.iter().map(row_to_nachricht).collect::<StoreResult<_>>()?;
        records.sort_by_key(|r| r.zeitstempel);
        Ok(records)
    }

    async fn mark_read(&self, absender: &NutzerId, empfaenger: &NutzerId) -> StoreResult<u64> {
        let affected = sqlx::query(
            "UPDATE nachrichten SET gelesen = 1
             WHERE absender = ? AND empfaenger = ? AND gelesen = 0",
        )
        .bind(absender.als_str())
        .bind(empfaenger.als_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }
}

fn row_to_nachricht(row: &sqlx::sqlite::SqliteRow) -> StoreResult<NachrichtRecord> {
    use sqlx::Row as _;

    let id_str: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| StoreError::intern(format!("Ungueltige Nachrichten-UUID '{id_str}': {e}")))?;

    let gelesen: i64 = row.try_get("gelesen")?;
    let zeitstempel = parse_timestamp(row.try_get("zeitstempel")?)?;

    Ok(NachrichtRecord {
        id,
        absender: NutzerId::neu(row.try_get::<String, _>("absender")?),
        empfaenger: NutzerId::neu(row.try_get::<String, _>("empfaenger")?),
        inhalt: row.try_get("inhalt")?,
        gelesen: gelesen != 0,
        zeitstempel,
    })
}

fn parse_timestamp(s: String) -> StoreResult<DateTime<Utc>> {
    // Versuche ISO8601 / RFC3339
    chrono::DateTime::parse_from_rfc3339(&s)
        .or_else(|_| {
            // Fallback fuer SQLite datetime()-Format ohne 'T' und 'Z'
            chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc().fixed_offset())
        })
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::intern(format!("Ungueltige Zeitangabe '{s}': {e}")))
}
