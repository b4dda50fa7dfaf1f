//! Speichermodelle fuer Tauschwerk
//!
//! Diese Typen repraesentieren Datensaetze aus der Datenbank.
//! Sie sind von den Protokolltypen getrennt und dienen als reine
//! Datenuebertragungsobjekte.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tauschwerk_core::NutzerId;
use uuid::Uuid;

/// Nachrichten-Datensatz aus der Datenbank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NachrichtRecord {
    pub id: Uuid,
    pub absender: NutzerId,
    pub empfaenger: NutzerId,
    pub inhalt: String,
    pub gelesen: bool,
    pub zeitstempel: DateTime<Utc>,
}

/// Daten zum Persistieren einer neuen Nachricht
#[derive(Debug, Clone)]
pub struct NeueNachricht<'a> {
    pub absender: &'a NutzerId,
    pub empfaenger: &'a NutzerId,
    pub inhalt: &'a str,
}
