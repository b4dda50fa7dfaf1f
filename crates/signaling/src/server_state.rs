//! Gemeinsamer Server-Zustand fuer die Signaling-Schicht
//!
//! Haelt Register, Anruf-Tabelle, Relay und Koordinator als geteilte
//! Handles, die sicher zwischen tokio-Tasks geteilt werden koennen.

use std::sync::Arc;
use std::time::Duration;

use tauschwerk_store::MessageStore;

use crate::calls::{AnrufTabelle, STANDARD_GNADENFRIST};
use crate::coordinator::AnrufKoordinator;
use crate::registry::VerbindungsRegister;
use crate::relay::NachrichtenRelay;

/// Konfiguration fuer die Signaling-Schicht
#[derive(Debug, Clone)]
pub struct SignalingKonfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitig beigetretene Verbindungen
    pub max_clients: u32,
    /// Frist bis abgelehnte Anrufe geloescht werden
    pub gnadenfrist: Duration,
}

impl Default for SignalingKonfig {
    fn default() -> Self {
        Self {
            server_name: "Tauschwerk Server".to_string(),
            max_clients: 512,
            gnadenfrist: STANDARD_GNADENFRIST,
        }
    }
}

/// Gemeinsamer Zustand aller Verbindungs-Tasks
///
/// Alle Services teilen ihren inneren Zustand; Clone eines Handles gibt
/// eine weitere Referenz auf denselben Zustand.
pub struct SignalingState<S: MessageStore> {
    /// Konfiguration (unveraenderlich nach dem Start)
    pub konfig: SignalingKonfig,
    /// Praesenz-Verzeichnis
    pub register: VerbindungsRegister,
    /// Anruf-Tabelle
    pub anrufe: AnrufTabelle,
    /// Nachrichten-Relay
    pub relay: Arc<NachrichtenRelay<S>>,
    /// Anruf-Koordinator
    pub koordinator: AnrufKoordinator,
}

impl<S: MessageStore> SignalingState<S> {
    /// Verdrahtet Register, Tabelle, Relay und Koordinator
    pub fn neu(store: Arc<S>, konfig: SignalingKonfig) -> Arc<Self> {
        let register = VerbindungsRegister::neu();
        let anrufe = AnrufTabelle::mit_gnadenfrist(konfig.gnadenfrist);
        let relay = NachrichtenRelay::neu(store, register.clone());
        let koordinator = AnrufKoordinator::neu(anrufe.clone(), register.clone());

        Arc::new(Self {
            konfig,
            register,
            anrufe,
            relay,
            koordinator,
        })
    }
}
