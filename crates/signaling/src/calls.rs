//! Anruf-Tabelle – Zustandsmaschine fuer laufende Anruf-Verhandlungen
//!
//! Jeder Anruf laeuft `ringing -> accepted` oder `ringing -> rejected`.
//! Abgelehnte Anrufe bleiben fuer eine Gnadenfrist aufloesbar, damit spaete
//! Duplikat-Events nicht auf "nicht gefunden" laufen; danach loescht ein
//! abbrechbarer Hintergrund-Task den Eintrag. Beendete Anrufe verschwinden
//! sofort. Eine einmal vergebene Anruf-ID wird nie wiederverwendet.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;

use tauschwerk_core::types::{AnrufId, NutzerId};
use tauschwerk_protocol::AnrufStatus;

/// Standard-Gnadenfrist bis zur Loeschung eines abgelehnten Anrufs
pub const STANDARD_GNADENFRIST: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// AnrufSitzung
// ---------------------------------------------------------------------------

/// Eine laufende Anruf-Verhandlung zwischen zwei Identitaeten
#[derive(Debug, Clone)]
pub struct AnrufSitzung {
    pub anruf_id: AnrufId,
    pub anrufer: NutzerId,
    pub empfaenger: NutzerId,
    /// Opaker Rendezvous-Token; die Bedeutung liegt beim Media-Kollaborateur
    pub descriptor: String,
    pub status: AnrufStatus,
    pub erstellt_um: DateTime<Utc>,
}

impl AnrufSitzung {
    /// Der jeweils andere Teilnehmer
    pub fn gegenseite(&self, nutzer: &NutzerId) -> &NutzerId {
        if &self.anrufer == nutzer {
            &self.empfaenger
        } else {
            &self.anrufer
        }
    }

    /// Prueft ob eine Identitaet an diesem Anruf beteiligt ist
    pub fn beteiligt(&self, nutzer: &NutzerId) -> bool {
        &self.anrufer == nutzer || &self.empfaenger == nutzer
    }
}

// ---------------------------------------------------------------------------
// AnrufTabelle
// ---------------------------------------------------------------------------

/// In-Memory-Tabelle aller laufenden Anrufe
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
/// Die Tabelle kennt nur Zustaende und Uebergaenge; wer bei welchem
/// Uebergang benachrichtigt wird, entscheidet der Koordinator.
#[derive(Clone)]
pub struct AnrufTabelle {
    inner: Arc<AnrufTabelleInner>,
}

struct AnrufTabelleInner {
    /// Laufende Anrufe, indiziert nach Anruf-ID
    anrufe: DashMap<AnrufId, AnrufSitzung>,
    /// Laufende Gnadenfrist-Timer abgelehnter Anrufe
    timer: DashMap<AnrufId, AbortHandle>,
    /// Frist bis zur Loeschung nach einer Ablehnung
    gnadenfrist: Duration,
}

impl AnrufTabelle {
    /// Erstellt eine Tabelle mit der Standard-Gnadenfrist
    pub fn neu() -> Self {
        Self::mit_gnadenfrist(STANDARD_GNADENFRIST)
    }

    /// Erstellt eine Tabelle mit eigener Gnadenfrist
    pub fn mit_gnadenfrist(gnadenfrist: Duration) -> Self {
        Self {
            inner: Arc::new(AnrufTabelleInner {
                anrufe: DashMap::new(),
                timer: DashMap::new(),
                gnadenfrist,
            }),
        }
    }

    /// Legt einen neuen Anruf im Zustand `ringing` an
    ///
    /// Die Tabelle erzwingt keine Eindeutigkeit pro Teilnehmer-Paar;
    /// gleichzeitige Anrufe bekommen unabhaengige IDs.
    pub fn erstellen(
        &self,
        anrufer: NutzerId,
        empfaenger: NutzerId,
        descriptor: String,
    ) -> AnrufSitzung {
        let anruf_id = AnrufId::generieren(&anrufer, &empfaenger);
        let sitzung = AnrufSitzung {
            anruf_id: anruf_id.clone(),
            anrufer,
            empfaenger,
            descriptor,
            status: AnrufStatus::Ringing,
            erstellt_um: Utc::now(),
        };
        self.inner.anrufe.insert(anruf_id, sitzung.clone());
        sitzung
    }

    /// Nimmt einen klingelnden Anruf an (`ringing -> accepted`)
    ///
    /// `None` fuer unbekannte IDs und fuer Eintraege in jedem anderen
    /// Zustand; der Datensatz bleibt dann unveraendert.
    pub fn annehmen(&self, anruf_id: &AnrufId) -> Option<AnrufSitzung> {
        let mut eintrag = self.inner.anrufe.get_mut(anruf_id)?;
        if eintrag.status != AnrufStatus::Ringing {
            return None;
        }
        eintrag.status = AnrufStatus::Accepted;
        Some(eintrag.clone())
    }

    /// Lehnt einen klingelnden Anruf ab (`ringing -> rejected`)
    ///
    /// Der Eintrag bleibt fuer die Gnadenfrist aufloesbar und wird danach
    /// von einem Hintergrund-Task geloescht. Duplikat-Ablehnungen innerhalb
    /// der Frist sind harmlose No-Ops (`None`).
    pub fn ablehnen(&self, anruf_id: &AnrufId) -> Option<AnrufSitzung> {
        let sitzung = {
            let mut eintrag = self.inner.anrufe.get_mut(anruf_id)?;
            if eintrag.status != AnrufStatus::Ringing {
                return None;
            }
            eintrag.status = AnrufStatus::Rejected;
            eintrag.clone()
        };

        self.loeschung_planen(anruf_id.clone());
        Some(sitzung)
    }

    /// Beendet einen Anruf und loescht den Eintrag sofort
    ///
    /// Erlaubt aus jedem Zustand; ein laufender Gnadenfrist-Timer wird
    /// abgebrochen. `None` wenn die ID nicht (mehr) existiert.
    pub fn beenden(&self, anruf_id: &AnrufId) -> Option<AnrufSitzung> {
        self.timer_abbrechen(anruf_id);
        self.inner
            .anrufe
            .remove(anruf_id)
            .map(|(_, sitzung)| sitzung)
    }

    /// Entfernt alle Anrufe an denen eine Identitaet beteiligt ist
    ///
    /// Wird beim Verbindungsabbruch aufgerufen. Gibt die entfernten
    /// Sitzungen mit ihrem letzten Zustand zurueck, damit der Koordinator
    /// entscheiden kann wer benachrichtigt wird.
    pub fn trennen(&self, nutzer: &NutzerId) -> Vec<AnrufSitzung> {
        let betroffen: Vec<AnrufId> = self
            .inner
            .anrufe
            .iter()
            .filter(|eintrag| eintrag.value().beteiligt(nutzer))
            .map(|eintrag| eintrag.key().clone())
            .collect();

        let mut entfernt = Vec::with_capacity(betroffen.len());
        for anruf_id in betroffen {
            self.timer_abbrechen(&anruf_id);
            if let Some((_, sitzung)) = self.inner.anrufe.remove(&anruf_id) {
                entfernt.push(sitzung);
            }
        }
        entfernt
    }

    /// Liest eine Sitzung ohne sie zu veraendern
    pub fn abrufen(&self, anruf_id: &AnrufId) -> Option<AnrufSitzung> {
        self.inner
            .anrufe
            .get(anruf_id)
            .map(|eintrag| eintrag.clone())
    }

    /// Anzahl der laufenden Anrufe
    pub fn anzahl(&self) -> usize {
        self.inner.anrufe.len()
    }

    /// Startet den Gnadenfrist-Timer eines abgelehnten Anrufs
    fn loeschung_planen(&self, anruf_id: AnrufId) {
        let tabelle = self.clone();
        let id = anruf_id.clone();
        let frist = self.inner.gnadenfrist;

        let task = tokio::spawn(async move {
            tokio::time::sleep(frist).await;
            tabelle.inner.timer.remove(&id);
            if tabelle.inner.anrufe.remove(&id).is_some() {
                tracing::debug!(anruf = %id, "Abgelehnter Anruf nach Gnadenfrist geloescht");
            }
        });

        // Einen evtl. noch laufenden Timer derselben ID ersetzen
        if let Some(alt) = self.inner.timer.insert(anruf_id, task.abort_handle()) {
            alt.abort();
        }
    }

    /// Bricht einen laufenden Gnadenfrist-Timer ab
    fn timer_abbrechen(&self, anruf_id: &AnrufId) {
        if let Some((_, timer)) = self.inner.timer.remove(anruf_id) {
            timer.abort();
        }
    }
}

impl Default for AnrufTabelle {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
