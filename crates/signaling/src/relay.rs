//! Nachrichten-Relay – persistieren und zustellen von Direktnachrichten
//!
//! Die Reihenfolge ist Teil des Vertrags: erst der Store, dann die
//! Zustellung. Ein Empfaenger erfaehrt nie von einer Nachricht deren
//! Persistierung fehlgeschlagen ist.

use std::sync::Arc;

use chrono::SecondsFormat;

use tauschwerk_core::types::NutzerId;
use tauschwerk_protocol::events::{ReceiveMessageEvent, TypingEvent};
use tauschwerk_protocol::SignalEvent;
use tauschwerk_store::{MessageStore, NachrichtRecord, NeueNachricht};

use crate::error::{SignalingError, SignalingResult};
use crate::registry::VerbindungsRegister;

/// Maximale Nachrichtenlaenge in Bytes
const MAX_NACHRICHTEN_LAENGE: usize = 4096;

/// Relay fuer Direktnachrichten zwischen zwei Identitaeten
pub struct NachrichtenRelay<S: MessageStore> {
    store: Arc<S>,
    register: VerbindungsRegister,
}

impl<S: MessageStore> NachrichtenRelay<S> {
    /// Erstellt ein neues Relay
    pub fn neu(store: Arc<S>, register: VerbindungsRegister) -> Arc<Self> {
        Arc::new(Self { store, register })
    }

    /// Persistiert eine Nachricht und stellt sie dem Empfaenger zu
    ///
    /// Ein Offline-Empfaenger ist kein Fehler; die Nachricht bleibt fuer
    /// den normalen Abfragepfad gespeichert. Gibt den persistierten
    /// Datensatz fuer die Absender-Bestaetigung zurueck.
    pub async fn senden(
        &self,
        absender: &NutzerId,
        empfaenger: &NutzerId,
        inhalt: &str,
    ) -> SignalingResult<NachrichtRecord> {
        let inhalt = inhalt.trim();
        if inhalt.is_empty() {
            return Err(SignalingError::validierung(
                "Nachrichteninhalt darf nicht leer sein",
            ));
        }
        if inhalt.len() > MAX_NACHRICHTEN_LAENGE {
            return Err(SignalingError::validierung(format!(
                "Nachricht zu lang: {} Bytes (Maximum: {})",
                inhalt.len(),
                MAX_NACHRICHTEN_LAENGE
            )));
        }

        // Erst persistieren. Schlaegt der Store fehl, sieht der Empfaenger nichts.
        let record = self
            .store
            .create(NeueNachricht {
                absender,
                empfaenger,
                inhalt,
            })
            .await?;

        // Verbindungen erst nach dem Store-Await nachschlagen; der Zustand
        // kann sich ueber den Suspensionspunkt hinweg geaendert haben
        let zugestellt = self.register.an_nutzer_senden(
            empfaenger,
            SignalEvent::ReceiveMessage(record_als_event(&record)),
        );

        tracing::debug!(
            absender = %absender,
            empfaenger = %empfaenger,
            nachricht = %record.id,
            zugestellt,
            "Nachricht gespeichert"
        );

        Ok(record)
    }

    /// Leitet einen Tipp-Indikator weiter (fire-and-forget, keine Persistenz)
    pub fn tippen(&self, event: TypingEvent) {
        let empfaenger = event.receiver_identity.clone();
        self.register
            .an_nutzer_senden(&empfaenger, SignalEvent::Typing(event));
    }
}

/// Baut das Zustell-Event aus dem persistierten Datensatz
fn record_als_event(record: &NachrichtRecord) -> ReceiveMessageEvent {
    ReceiveMessageEvent {
        id: record.id.to_string(),
        sender_identity: record.absender.clone(),
        receiver_identity: record.empfaenger.clone(),
        body: record.inhalt.clone(),
        timestamp: record
            .zeitstempel
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        is_read: record.gelesen,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
