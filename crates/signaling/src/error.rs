//! Fehlertypen fuer die Signaling-Schicht

use tauschwerk_store::StoreError;
use thiserror::Error;

/// Fehlertyp fuer die Signaling-Schicht
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Eingabedaten unbrauchbar (leerer Text, Selbstanruf)
    #[error("Validierung fehlgeschlagen: {0}")]
    Validierung(String),

    /// Fehler aus der Nachrichten-Persistenz
    #[error("Speicherfehler: {0}")]
    Speicher(#[from] StoreError),

    /// Zielressource existiert nicht (mehr); gutartig, wird nie zum Client gemeldet
    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    /// Protokollverletzung des Clients
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl SignalingError {
    /// Erstellt einen Validierungsfehler
    pub fn validierung(msg: impl Into<String>) -> Self {
        Self::Validierung(msg.into())
    }

    /// Erstellt einen Nicht-gefunden-Fehler
    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }
}

/// Result-Typ fuer die Signaling-Schicht
pub type SignalingResult<T> = Result<T, SignalingError>;
