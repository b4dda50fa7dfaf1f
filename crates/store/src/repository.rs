//! Repository-Trait fuer den Nachrichtenspeicher
//!
//! Das Repository-Pattern entkoppelt das Signaling von der konkreten
//! Datenbank-Implementierung. Der Relay kennt nur diesen Trait; in Tests
//! tritt an seine Stelle eine In-Memory-Datenbank oder ein Fehlschlag-Double.

use tauschwerk_core::NutzerId;

use crate::error::StoreError;
use crate::models::{NachrichtRecord, NeueNachricht};

/// Ergebnis-Alias fuer Speicheroperationen
pub type StoreResult<T> = Result<T, StoreError>;

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Verbindungs-URL (z.B. "sqlite://tauschwerk.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus bei SQLite aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://tauschwerk.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

/// Repository fuer Direktnachrichten
#[allow(async_fn_in_trait)]
pub trait MessageStore: Send + Sync {
    /// Persistiert eine Nachricht und gibt den vollstaendigen Datensatz
    /// zurueck (generierte ID, Zeitstempel, `gelesen = false`)
    async fn create(&self, data: NeueNachricht<'_>) -> StoreResult<NachrichtRecord>;

    /// Laedt die Konversation zwischen zwei Identitaeten, beide Richtungen.
    /// Geholt werden die `limit` neuesten Nachrichten, zurueckgegeben
    /// chronologisch (aelteste zuerst).
    async fn get_conversation(
        &self,
        a: &NutzerId,
        b: &NutzerId,
        limit: i64,
    ) -> StoreResult<Vec<NachrichtRecord>>;

    /// Markiert alle ungelesenen Nachrichten von `absender` an `empfaenger`
    /// als gelesen und gibt die Anzahl der betroffenen Zeilen zurueck
    async fn mark_read(&self, absender: &NutzerId, empfaenger: &NutzerId) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_config_standard() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.url, "sqlite://tauschwerk.db");
        assert!(cfg.sqlite_wal);
        assert_eq!(cfg.max_verbindungen, 5);
    }
}
