//! Event-Dispatcher – routet SignalEvents an Relay und Koordinator
//!
//! Der Dispatcher ist die Fehlerbarriere des Servers: jeder Handler-Fehler
//! wird hier entweder als `message_error` an die ausloesende Verbindung
//! uebersetzt oder als gutartiger No-Op geloggt. Kein Fehler reisst den
//! Verbindungs-Task oder gar den Server ab.
//!
//! ## Antwortwege
//! Die Rueckgabe von `verarbeiten` geht nur an die ausloesende Verbindung.
//! Alles andere (Zustellungen, Klingeln, Annahme-Meldungen) laeuft ueber
//! das Verbindungs-Register.
//!
//! ## Identitaeten
//! Die Identitaeten in den Payloads stammen vom externen Auth-Dienst und
//! werden hier unveraendert uebernommen. `join` schaltet nur die
//! Zustellung und die Abbruch-Bereinigung frei; andere Events setzen
//! keinen vorherigen `join` voraus.

use std::sync::Arc;

use tauschwerk_core::types::VerbindungsId;
use tauschwerk_protocol::events::MessageSentAck;
use tauschwerk_protocol::SignalEvent;
use tauschwerk_store::MessageStore;

use crate::error::{SignalingError, SignalingResult};
use crate::registry::ClientSender;
use crate::server_state::SignalingState;

/// Kontext einer einzelnen Verbindung
pub struct VerbindungsKontext {
    /// Stabile ID dieser Verbindung
    pub verbindungs_id: VerbindungsId,
    /// Send-Queue-Handle dieser Verbindung, registriert bei `join`
    pub sender: ClientSender,
}

/// Zentraler Event-Dispatcher
pub struct EventDispatcher<S: MessageStore> {
    state: Arc<SignalingState<S>>,
}

impl<S: MessageStore> EventDispatcher<S> {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState<S>>) -> Self {
        Self { state }
    }

    /// Verarbeitet ein eingehendes Event und gibt die direkte Antwort zurueck
    ///
    /// `None` wenn die Antwort (falls es eine gibt) ueber das Register
    /// zugestellt wird oder der Fehler gutartig war.
    pub async fn verarbeiten(
        &self,
        kontext: &VerbindungsKontext,
        event: SignalEvent,
    ) -> Option<SignalEvent> {
        let name = event.name();
        match self.verarbeiten_intern(kontext, event).await {
            Ok(antwort) => antwort,
            Err(SignalingError::NichtGefunden(grund)) => {
                // Gutartig: unbekannte Anruf-IDs und verschwundene Ziele
                // sind erwartete Zustaende, kein Fehler am Client
                tracing::debug!(event = name, grund, "Event ohne Ziel verworfen");
                None
            }
            Err(fehler) => {
                tracing::warn!(
                    event = name,
                    verbindung = %kontext.verbindungs_id,
                    fehler = %fehler,
                    "Event-Verarbeitung fehlgeschlagen"
                );
                Some(SignalEvent::nachrichten_fehler(fehler.to_string()))
            }
        }
    }

    async fn verarbeiten_intern(
        &self,
        kontext: &VerbindungsKontext,
        event: SignalEvent,
    ) -> SignalingResult<Option<SignalEvent>> {
        let name = event.name();

        match event {
            // -------------------------------------------------------------------
            // Praesenz
            // -------------------------------------------------------------------
            SignalEvent::Join(anfrage) => {
                self.state
                    .register
                    .beitreten(&anfrage.identity, kontext.sender.clone())?;
                tracing::info!(
                    nutzer = %anfrage.identity,
                    verbindung = %kontext.verbindungs_id,
                    "Nutzer beigetreten"
                );
                Ok(None)
            }

            // -------------------------------------------------------------------
            // Nachrichten
            // -------------------------------------------------------------------
            SignalEvent::SendMessage(anfrage) => {
                let record = self
                    .state
                    .relay
                    .senden(
                        &anfrage.sender_identity,
                        &anfrage.receiver_identity,
                        &anfrage.body,
                    )
                    .await?;
                Ok(Some(SignalEvent::MessageSent(MessageSentAck {
                    id: record.id.to_string(),
                    success: true,
                })))
            }

            SignalEvent::Typing(ereignis) => {
                self.state.relay.tippen(ereignis);
                Ok(None)
            }

            // -------------------------------------------------------------------
            // Anrufe
            // -------------------------------------------------------------------
            SignalEvent::InitiateCall(anfrage) => {
                let bestaetigung = self.state.koordinator.anrufen(
                    &anfrage.caller_identity,
                    &anfrage.receiver_identity,
                    &anfrage.descriptor,
                    anfrage.caller_name,
                )?;
                Ok(Some(bestaetigung))
            }

            SignalEvent::AcceptCall(anfrage) => {
                self.state.koordinator.annehmen(&anfrage.call_id)?;
                Ok(None)
            }

            SignalEvent::RejectCall(anfrage) => {
                self.state.koordinator.ablehnen(&anfrage.call_id)?;
                Ok(None)
            }

            SignalEvent::EndCall(anfrage) => {
                self.state.koordinator.beenden(&anfrage.call_id)?;
                Ok(None)
            }

            // -------------------------------------------------------------------
            // Server->Client-Events vom Client sind Protokollverletzungen
            // -------------------------------------------------------------------
            SignalEvent::ReceiveMessage(_)
            | SignalEvent::MessageSent(_)
            | SignalEvent::MessageError(_)
            | SignalEvent::IncomingCall(_)
            | SignalEvent::CallInitiated(_)
            | SignalEvent::CallAccepted(_)
            | SignalEvent::CallRejected(_)
            | SignalEvent::CallEnded(_) => Err(SignalingError::protokoll(format!(
                "'{name}' ist ein Server-Event und darf nicht vom Client kommen"
            ))),
        }
    }

    /// Raeumt eine geschlossene Verbindung ab
    ///
    /// Register-Austritt und Anruf-Bereinigung laufen als ein Schritt bevor
    /// der Verbindungs-Task endet; kein spaeteres Event kann die Verbindung
    /// danach noch zur Zustellung verwenden.
    pub fn verbindung_schliessen(&self, kontext: &VerbindungsKontext) {
        if let Some(nutzer) = self.state.register.verlassen(&kontext.verbindungs_id) {
            self.state.koordinator.verbindung_getrennt(&nutzer);
            tracing::debug!(
                nutzer = %nutzer,
                verbindung = %kontext.verbindungs_id,
                "Verbindungs-Ressourcen bereinigt"
            );
        }
    }
}
