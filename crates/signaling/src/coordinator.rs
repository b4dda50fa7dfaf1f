//! Anruf-Koordinator – verdrahtet Anruf-Events mit Tabelle und Register
//!
//! Die Tabelle kennt nur Zustaende und Uebergaenge; wer bei welchem
//! Uebergang benachrichtigt wird, entscheidet der Koordinator:
//!
//! - `anrufen`: Empfaenger klingelt (`incoming_call`), Anrufer bekommt die
//!   Bestaetigung unabhaengig von der Erreichbarkeit des Ziels
//! - `annehmen`: beide Seiten bekommen dasselbe `call_accepted` im selben
//!   Verarbeitungsschritt
//! - `ablehnen`: nur der Anrufer bekommt `call_rejected`
//! - `beenden`: beide Seiten bekommen `call_ended`
//! - `verbindung_getrennt`: die Gegenseite jedes klingelnden oder laufenden
//!   Anrufs bekommt `call_ended`; zur getrennten Identitaet geht nichts mehr

use chrono::Utc;

use tauschwerk_core::types::{AnrufId, NutzerId};
use tauschwerk_protocol::events::{
    CallAcceptedEvent, CallInitiatedAck, CallRejectedEvent, IncomingCallEvent,
};
use tauschwerk_protocol::{AnrufStatus, SignalEvent};

use crate::calls::AnrufTabelle;
use crate::error::{SignalingError, SignalingResult};
use crate::registry::VerbindungsRegister;

/// Anzeigename wenn der Anrufer keinen mitliefert
const UNBEKANNTER_ANRUFER: &str = "Jemand";

/// Koordiniert den Anruf-Lebenszyklus
#[derive(Clone)]
pub struct AnrufKoordinator {
    tabelle: AnrufTabelle,
    register: VerbindungsRegister,
}

impl AnrufKoordinator {
    /// Erstellt einen neuen Koordinator
    pub fn neu(tabelle: AnrufTabelle, register: VerbindungsRegister) -> Self {
        Self { tabelle, register }
    }

    /// Startet einen Anruf und laesst es beim Empfaenger klingeln
    ///
    /// Die Erreichbarkeit des Empfaengers wird nicht synchron geprueft; ein
    /// Offline-Empfaenger klingelt einfach nicht und der Anrufer muss mit
    /// einem stillen Timeout rechnen. Selbstanrufe werden abgelehnt.
    /// Gibt die `call_initiated`-Bestaetigung fuer den Anrufer zurueck.
    pub fn anrufen(
        &self,
        anrufer: &NutzerId,
        empfaenger: &NutzerId,
        descriptor: &str,
        anrufer_name: Option<String>,
    ) -> SignalingResult<SignalEvent> {
        if anrufer == empfaenger {
            return Err(SignalingError::validierung(
                "Selbstanruf ist nicht moeglich",
            ));
        }

        let sitzung =
            self.tabelle
                .erstellen(anrufer.clone(), empfaenger.clone(), descriptor.to_string());

        let name = anrufer_name.unwrap_or_else(|| UNBEKANNTER_ANRUFER.to_string());
        self.register.an_nutzer_senden(
            empfaenger,
            SignalEvent::IncomingCall(IncomingCallEvent {
                call_id: sitzung.anruf_id.clone(),
                caller_identity: anrufer.clone(),
                caller_name: name,
                descriptor: sitzung.descriptor.clone(),
            }),
        );

        tracing::info!(
            anruf = %sitzung.anruf_id,
            anrufer = %anrufer,
            empfaenger = %empfaenger,
            "Anruf gestartet"
        );

        Ok(SignalEvent::CallInitiated(CallInitiatedAck {
            call_id: sitzung.anruf_id,
            descriptor: sitzung.descriptor,
            state: sitzung.status,
        }))
    }

    /// Nimmt einen Anruf an und meldet es beiden Seiten symmetrisch
    ///
    /// Beide Parteien bekommen dasselbe Payload im selben
    /// Verarbeitungsschritt, damit keine Seite frueher startet.
    pub fn annehmen(&self, anruf_id: &AnrufId) -> SignalingResult<()> {
        let sitzung = self.tabelle.annehmen(anruf_id).ok_or_else(|| {
            SignalingError::nicht_gefunden(format!("Anruf '{anruf_id}' klingelt nicht (mehr)"))
        })?;

        let event = SignalEvent::CallAccepted(CallAcceptedEvent {
            call_id: sitzung.anruf_id.clone(),
            descriptor: sitzung.descriptor.clone(),
            state: sitzung.status,
        });
        // Kein Await zwischen den beiden Fan-Outs
        self.register.an_nutzer_senden(&sitzung.anrufer, event.clone());
        self.register.an_nutzer_senden(&sitzung.empfaenger, event);

        tracing::info!(anruf = %sitzung.anruf_id, "Anruf angenommen");
        Ok(())
    }

    /// Lehnt einen Anruf ab; nur der Anrufer wird informiert
    pub fn ablehnen(&self, anruf_id: &AnrufId) -> SignalingResult<()> {
        let sitzung = self.tabelle.ablehnen(anruf_id).ok_or_else(|| {
            SignalingError::nicht_gefunden(format!("Anruf '{anruf_id}' klingelt nicht (mehr)"))
        })?;

        self.register.an_nutzer_senden(
            &sitzung.anrufer,
            SignalEvent::CallRejected(CallRejectedEvent {
                call_id: sitzung.anruf_id.clone(),
            }),
        );

        tracing::info!(anruf = %sitzung.anruf_id, "Anruf abgelehnt");
        Ok(())
    }

    /// Beendet einen Anruf und informiert beide Seiten
    ///
    /// Ein Eintrag der in der Gnadenfrist steckt wird still entsorgt;
    /// die Ablehnung wurde bereits gemeldet.
    pub fn beenden(&self, anruf_id: &AnrufId) -> SignalingResult<()> {
        let sitzung = self.tabelle.beenden(anruf_id).ok_or_else(|| {
            SignalingError::nicht_gefunden(format!("Anruf '{anruf_id}' existiert nicht (mehr)"))
        })?;

        if sitzung.status != AnrufStatus::Rejected {
            let event = SignalEvent::anruf_beendet(sitzung.anruf_id.clone());
            self.register.an_nutzer_senden(&sitzung.anrufer, event.clone());
            self.register.an_nutzer_senden(&sitzung.empfaenger, event);
        }

        let dauer_ms = (Utc::now() - sitzung.erstellt_um).num_milliseconds();
        tracing::info!(anruf = %sitzung.anruf_id, dauer_ms, "Anruf beendet");
        Ok(())
    }

    /// Raeumt nach einem Verbindungsabbruch alle Anrufe der Identitaet ab
    ///
    /// Die Gegenseite eines klingelnden oder laufenden Anrufs bekommt
    /// `call_ended`; abgelehnte Eintraege verschwinden still. Zur
    /// getrennten Identitaet selbst wird nichts gesendet.
    pub fn verbindung_getrennt(&self, nutzer: &NutzerId) {
        for sitzung in self.tabelle.trennen(nutzer) {
            match sitzung.status {
                AnrufStatus::Ringing | AnrufStatus::Accepted => {
                    let gegenseite = sitzung.gegenseite(nutzer).clone();
                    self.register.an_nutzer_senden(
                        &gegenseite,
                        SignalEvent::anruf_beendet(sitzung.anruf_id.clone()),
                    );
                    tracing::info!(
                        anruf = %sitzung.anruf_id,
                        getrennt = %nutzer,
                        benachrichtigt = %gegenseite,
                        "Anruf durch Verbindungsabbruch beendet"
                    );
                }
                AnrufStatus::Rejected => {
                    tracing::debug!(
                        anruf = %sitzung.anruf_id,
                        "Abgelehnten Anruf still entsorgt"
                    );
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClientSender;
    use tauschwerk_core::types::VerbindungsId;
    use tokio::sync::mpsc;

    fn aufbau() -> (AnrufKoordinator, AnrufTabelle, VerbindungsRegister) {
        let tabelle = AnrufTabelle::neu();
        let register = VerbindungsRegister::neu();
        let koordinator = AnrufKoordinator::neu(tabelle.clone(), register.clone());
        (koordinator, tabelle, register)
    }

    fn verbinden(
        register: &VerbindungsRegister,
        name: &str,
    ) -> (NutzerId, mpsc::Receiver<SignalEvent>) {
        let nutzer = NutzerId::neu(name);
        let (sender, rx) = ClientSender::neu(VerbindungsId::neu());
        register.beitreten(&nutzer, sender).unwrap();
        (nutzer, rx)
    }

    #[tokio::test]
    async fn selbstanruf_wird_abgelehnt() {
        let (koordinator, tabelle, _register) = aufbau();
        let u1 = NutzerId::neu("u1");

        let fehler = koordinator.anrufen(&u1, &u1, "raum-1", None);
        assert!(matches!(fehler, Err(SignalingError::Validierung(_))));
        assert_eq!(tabelle.anzahl(), 0, "Kein Eintrag fuer Selbstanrufe");
    }

    #[tokio::test]
    async fn anrufer_name_wird_ersetzt_wenn_leer() {
        let (koordinator, _tabelle, register) = aufbau();
        let u1 = NutzerId::neu("u1");
        let (u2, mut rx2) = verbinden(&register, "u2");

        koordinator.anrufen(&u1, &u2, "raum-1", None).unwrap();

        match rx2.try_recv().unwrap() {
            SignalEvent::IncomingCall(ereignis) => {
                assert_eq!(ereignis.caller_name, "Jemand");
                assert_eq!(ereignis.caller_identity, u1);
            }
            andere => panic!("IncomingCall erwartet, bekam {:?}", andere.name()),
        }
    }

    #[tokio::test]
    async fn verbindungsabbruch_meldet_auch_laufende_anrufe() {
        let (koordinator, tabelle, register) = aufbau();
        let (u1, mut rx1) = verbinden(&register, "u1");
        let (u2, _rx2) = verbinden(&register, "u2");

        // u1 ruft u2 an, u2 nimmt an, dann bricht u2 weg
        let ack = koordinator.anrufen(&u1, &u2, "raum-1", Some("Udo".into())).unwrap();
        let anruf_id = match ack {
            SignalEvent::CallInitiated(ack) => ack.call_id,
            andere => panic!("CallInitiated erwartet, bekam {:?}", andere.name()),
        };
        koordinator.annehmen(&anruf_id).unwrap();
        koordinator.verbindung_getrennt(&u2);

        // u1 sieht die Annahme und danach genau ein call_ended
        assert!(matches!(rx1.try_recv().unwrap(), SignalEvent::CallAccepted(_)));
        match rx1.try_recv().unwrap() {
            SignalEvent::CallEnded(ereignis) => assert_eq!(ereignis.call_id, anruf_id),
            andere => panic!("CallEnded erwartet, bekam {:?}", andere.name()),
        }
        assert!(rx1.try_recv().is_err(), "Nur ein call_ended pro Anruf");
        assert_eq!(tabelle.anzahl(), 0);
    }

    #[tokio::test]
    async fn abgelehnter_anruf_verschwindet_beim_abbruch_still() {
        let (koordinator, tabelle, register) = aufbau();
        let (u1, mut rx1) = verbinden(&register, "u1");
        let (u2, _rx2) = verbinden(&register, "u2");

        let ack = koordinator.anrufen(&u1, &u2, "raum-1", None).unwrap();
        let anruf_id = match ack {
            SignalEvent::CallInitiated(ack) => ack.call_id,
            andere => panic!("CallInitiated erwartet, bekam {:?}", andere.name()),
        };
        koordinator.ablehnen(&anruf_id).unwrap();
        assert!(matches!(rx1.try_recv().unwrap(), SignalEvent::CallRejected(_)));

        koordinator.verbindung_getrennt(&u2);
        assert!(
            rx1.try_recv().is_err(),
            "Die Ablehnung wurde schon gemeldet, kein weiteres Event"
        );
        assert_eq!(tabelle.anzahl(), 0);
    }
}
