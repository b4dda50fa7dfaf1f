//! Gemeinsame Identifikationstypen fuer Tauschwerk
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Laufende Nummer fuer Anruf-IDs, damit zwei Anrufe desselben Paares
/// in derselben Millisekunde nie dieselbe ID erhalten.
static ANRUF_ZAEHLER: AtomicU64 = AtomicU64::new(0);

/// Stabile Identitaet eines Nutzers.
///
/// Wird vom externen Auth-Dienst vergeben und hier nie erzeugt, nur
/// unveraendert weitergereicht. Auf dem Draht erscheint der nackte String.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NutzerId(pub String);

impl NutzerId {
    /// Uebernimmt eine Identitaet aus einem beliebigen String-Typ
    pub fn neu(identitaet: impl Into<String>) -> Self {
        Self(identitaet.into())
    }

    /// Gibt die rohe Identitaet zurueck
    pub fn als_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NutzerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "nutzer:{}", self.0)
    }
}

/// Eindeutige ID einer einzelnen Transportverbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerbindungsId(pub Uuid);

impl VerbindungsId {
    /// Erstellt eine neue zufaellige VerbindungsId
    pub fn neu() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for VerbindungsId {
    fn default() -> Self {
        Self::neu()
    }
}

impl std::fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "verbindung:{}", self.0)
    }
}

/// Eindeutige ID einer Anruf-Session.
///
/// Zusammengesetzt aus Anrufer, Angerufenem, Unix-Millisekunden und einer
/// laufenden Nummer. Eine einmal vergebene ID wird nie wiederverwendet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnrufId(pub String);

impl AnrufId {
    /// Erzeugt eine frische Anruf-ID fuer das gegebene Paar
    pub fn generieren(anrufer: &NutzerId, empfaenger: &NutzerId) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let laufnummer = ANRUF_ZAEHLER.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{}_{}_{}_{}",
            anrufer.als_str(),
            empfaenger.als_str(),
            millis,
            laufnummer
        ))
    }

    /// Gibt die rohe ID zurueck
    pub fn als_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnrufId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbindungs_id_eindeutig() {
        let a = VerbindungsId::neu();
        let b = VerbindungsId::neu();
        assert_ne!(a, b, "Zwei neue VerbindungsIds muessen verschieden sein");
    }

    #[test]
    fn nutzer_id_serialisiert_als_nackter_string() {
        let id = NutzerId::neu("u1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"u1\"");
        let zurueck: NutzerId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, zurueck);
    }

    #[test]
    fn nutzer_id_display_mit_prefix() {
        let id = NutzerId::neu("u1");
        assert_eq!(id.to_string(), "nutzer:u1");
    }

    #[test]
    fn anruf_id_eindeutig_bei_gleichem_paar() {
        let a = NutzerId::neu("alice");
        let b = NutzerId::neu("bob");
        let erster = AnrufId::generieren(&a, &b);
        let zweiter = AnrufId::generieren(&a, &b);
        assert_ne!(
            erster, zweiter,
            "Anruf-IDs desselben Paares duerfen sich nie wiederholen"
        );
    }

    #[test]
    fn anruf_id_enthaelt_beide_identitaeten() {
        let id = AnrufId::generieren(&NutzerId::neu("alice"), &NutzerId::neu("bob"));
        assert!(id.als_str().starts_with("alice_bob_"));
    }
}
