//! Verbindungs-Register – wer ist online, ueber welche Verbindungen
//!
//! Das Register bildet Nutzer-Identitaeten auf ihre lebenden Verbindungen ab
//! und haelt die Send-Queues fuer ausgehende Events.
//!
//! ## Multi-Device
//! Eine Identitaet kann mehrere Verbindungen gleichzeitig halten (Desktop und
//! Handy). Events an einen Nutzer gehen an alle seine Verbindungen.
//!
//! ## Identitaets-Bindung
//! Eine Verbindung gehoert nach dem ersten `join` genau einer Identitaet.
//! Ein zweiter `join` mit anderer Identitaet wird abgelehnt statt still
//! ueberschrieben; die erste Bindung bleibt bestehen.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use tauschwerk_core::types::{NutzerId, VerbindungsId};
use tauschwerk_protocol::SignalEvent;

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Verbindung
const SENDE_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub verbindungs_id: VerbindungsId,
    pub tx: mpsc::Sender<SignalEvent>,
}

impl ClientSender {
    /// Erstellt das Queue-Paar einer frischen Verbindung
    ///
    /// Die `ClientConnection` liest aus dem Receiver und sendet via TCP.
    pub fn neu(verbindungs_id: VerbindungsId) -> (Self, mpsc::Receiver<SignalEvent>) {
        let (tx, rx) = mpsc::channel(SENDE_QUEUE_GROESSE);
        (Self { verbindungs_id, tx }, rx)
    }

    /// Reiht ein Event nicht-blockierend in die Send-Queue ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, event: SignalEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    verbindung = %self.verbindungs_id,
                    "Send-Queue voll – Event verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    verbindung = %self.verbindungs_id,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// VerbindungsRegister
// ---------------------------------------------------------------------------

/// Praesenz-Verzeichnis aller beigetretenen Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct VerbindungsRegister {
    inner: Arc<RegisterInner>,
}

struct RegisterInner {
    /// Send-Queues je Identitaet, ein Eintrag pro Geraet
    nutzer: DashMap<NutzerId, Vec<ClientSender>>,
    /// Rueckwaerts-Index: Identitaet unter der eine Verbindung registriert ist
    identitaeten: DashMap<VerbindungsId, NutzerId>,
}

impl VerbindungsRegister {
    /// Erstellt ein leeres Register
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(RegisterInner {
                nutzer: DashMap::new(),
                identitaeten: DashMap::new(),
            }),
        }
    }

    /// Registriert eine Verbindung unter einer Identitaet
    ///
    /// Idempotent fuer dieselbe Verbindung mit derselben Identitaet.
    /// Eine bereits anders gebundene Verbindung wird mit einem
    /// Protokollfehler abgewiesen; die erste Bindung bleibt erhalten.
    pub fn beitreten(&self, nutzer_id: &NutzerId, sender: ClientSender) -> SignalingResult<()> {
        if let Some(bestehend) = self.inner.identitaeten.get(&sender.verbindungs_id) {
            if bestehend.value() == nutzer_id {
                return Ok(());
            }
            return Err(SignalingError::protokoll(format!(
                "Verbindung ist bereits als '{}' registriert",
                bestehend.value().als_str()
            )));
        }

        self.inner
            .identitaeten
            .insert(sender.verbindungs_id, nutzer_id.clone());
        self.inner
            .nutzer
            .entry(nutzer_id.clone())
            .or_default()
            .push(sender);

        tracing::debug!(nutzer = %nutzer_id, "Verbindung registriert");
        Ok(())
    }

    /// Entfernt eine Verbindung aus dem Register
    ///
    /// Wird genau einmal pro Verbindung aufgerufen, beim Schliessen des
    /// Transports. Gibt die Identitaet zurueck unter der die Verbindung
    /// registriert war; `None` wenn sie nie beigetreten ist.
    pub fn verlassen(&self, verbindungs_id: &VerbindungsId) -> Option<NutzerId> {
        let (_, nutzer_id) = self.inner.identitaeten.remove(verbindungs_id)?;

        if let Some(mut eintrag) = self.inner.nutzer.get_mut(&nutzer_id) {
            eintrag.retain(|s| s.verbindungs_id != *verbindungs_id);
        }
        // Leeren Eintrag loeschen, damit `suchen` wieder "offline" meldet
        self.inner
            .nutzer
            .remove_if(&nutzer_id, |_, sender| sender.is_empty());

        tracing::debug!(nutzer = %nutzer_id, verbindung = %verbindungs_id, "Verbindung entfernt");
        Some(nutzer_id)
    }

    /// Alle lebenden Verbindungen einer Identitaet
    ///
    /// Ein leerer Vektor bedeutet "offline" und ist kein Fehler.
    pub fn suchen(&self, nutzer_id: &NutzerId) -> Vec<ClientSender> {
        self.inner
            .nutzer
            .get(nutzer_id)
            .map(|eintrag| eintrag.clone())
            .unwrap_or_default()
    }

    /// Sendet ein Event an alle Verbindungen einer Identitaet
    ///
    /// Gibt die Anzahl der eingereihten Zustellungen zurueck. 0 heisst
    /// der Nutzer ist offline oder alle Queues waren voll.
    pub fn an_nutzer_senden(&self, nutzer_id: &NutzerId, event: SignalEvent) -> usize {
        let sender = self.suchen(nutzer_id);
        let mut gesendet = 0;
        for s in &sender {
            if s.senden(event.clone()) {
                gesendet += 1;
            }
        }
        if gesendet == 0 {
            tracing::debug!(
                nutzer = %nutzer_id,
                event = event.name(),
                "Kein Empfaenger erreichbar"
            );
        }
        gesendet
    }

    /// Prueft ob eine Identitaet mindestens eine Verbindung hat
    pub fn ist_online(&self, nutzer_id: &NutzerId) -> bool {
        self.inner
            .nutzer
            .get(nutzer_id)
            .map(|eintrag| !eintrag.is_empty())
            .unwrap_or(false)
    }

    /// Identitaet unter der eine Verbindung registriert ist
    pub fn identitaet_von(&self, verbindungs_id: &VerbindungsId) -> Option<NutzerId> {
        self.inner
            .identitaeten
            .get(verbindungs_id)
            .map(|eintrag| eintrag.value().clone())
    }

    /// Anzahl der Identitaeten mit mindestens einer Verbindung
    pub fn nutzer_anzahl(&self) -> usize {
        self.inner.nutzer.len()
    }

    /// Anzahl aller beigetretenen Verbindungen
    pub fn verbindungs_anzahl(&self) -> usize {
        self.inner.identitaeten.len()
    }
}

impl Default for VerbindungsRegister {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tauschwerk_protocol::events::TypingEvent;

    fn test_event() -> SignalEvent {
        SignalEvent::Typing(TypingEvent {
            sender_identity: NutzerId::neu("u1"),
            receiver_identity: NutzerId::neu("u2"),
            is_typing: true,
        })
    }

    #[tokio::test]
    async fn beitreten_und_senden() {
        let register = VerbindungsRegister::neu();
        let nutzer = NutzerId::neu("u1");
        let (sender, mut rx) = ClientSender::neu(VerbindungsId::neu());

        register.beitreten(&nutzer, sender).unwrap();
        assert!(register.ist_online(&nutzer));

        let gesendet = register.an_nutzer_senden(&nutzer, test_event());
        assert_eq!(gesendet, 1);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn mehrgeraete_fanout() {
        let register = VerbindungsRegister::neu();
        let nutzer = NutzerId::neu("u1");

        let (sender_a, mut rx_a) = ClientSender::neu(VerbindungsId::neu());
        let (sender_b, mut rx_b) = ClientSender::neu(VerbindungsId::neu());
        register.beitreten(&nutzer, sender_a).unwrap();
        register.beitreten(&nutzer, sender_b).unwrap();

        let gesendet = register.an_nutzer_senden(&nutzer, test_event());
        assert_eq!(gesendet, 2, "Beide Geraete muessen beliefert werden");
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn beitreten_ist_idempotent() {
        let register = VerbindungsRegister::neu();
        let nutzer = NutzerId::neu("u1");
        let (sender, _rx) = ClientSender::neu(VerbindungsId::neu());

        register.beitreten(&nutzer, sender.clone()).unwrap();
        register.beitreten(&nutzer, sender).unwrap();

        assert_eq!(register.verbindungs_anzahl(), 1);
        assert_eq!(register.suchen(&nutzer).len(), 1);
    }

    #[tokio::test]
    async fn identitaetswechsel_wird_abgelehnt() {
        let register = VerbindungsRegister::neu();
        let (sender, _rx) = ClientSender::neu(VerbindungsId::neu());

        register.beitreten(&NutzerId::neu("u1"), sender.clone()).unwrap();
        let fehler = register.beitreten(&NutzerId::neu("u2"), sender.clone());

        assert!(matches!(fehler, Err(SignalingError::Protokoll(_))));
        // Die urspruengliche Bindung bleibt bestehen
        assert_eq!(
            register.identitaet_von(&sender.verbindungs_id),
            Some(NutzerId::neu("u1"))
        );
        assert!(!register.ist_online(&NutzerId::neu("u2")));
    }

    #[tokio::test]
    async fn verlassen_raeumt_auf() {
        let register = VerbindungsRegister::neu();
        let nutzer = NutzerId::neu("u1");
        let verbindungs_id = VerbindungsId::neu();
        let (sender, _rx) = ClientSender::neu(verbindungs_id);

        register.beitreten(&nutzer, sender).unwrap();
        let entfernt = register.verlassen(&verbindungs_id);

        assert_eq!(entfernt, Some(nutzer.clone()));
        assert!(!register.ist_online(&nutzer));
        assert!(register.suchen(&nutzer).is_empty());
        assert_eq!(register.nutzer_anzahl(), 0);

        // Zweites Verlassen derselben Verbindung ist ein No-Op
        assert_eq!(register.verlassen(&verbindungs_id), None);
    }

    #[tokio::test]
    async fn suchen_unbekannter_nutzer_ist_leer() {
        let register = VerbindungsRegister::neu();
        assert!(register.suchen(&NutzerId::neu("niemand")).is_empty());
        assert_eq!(register.an_nutzer_senden(&NutzerId::neu("niemand"), test_event()), 0);
    }

    #[tokio::test]
    async fn volle_queue_verwirft_event() {
        let register = VerbindungsRegister::neu();
        let nutzer = NutzerId::neu("u1");
        let (sender, _rx) = ClientSender::neu(VerbindungsId::neu());
        register.beitreten(&nutzer, sender).unwrap();

        // Queue bis zur Kapazitaet fuellen, ohne zu lesen
        for _ in 0..SENDE_QUEUE_GROESSE {
            assert_eq!(register.an_nutzer_senden(&nutzer, test_event()), 1);
        }
        assert_eq!(
            register.an_nutzer_senden(&nutzer, test_event()),
            0,
            "Volle Queue darf nicht blockieren, sondern verwirft"
        );
    }
}
