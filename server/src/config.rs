//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use tauschwerk_signaling::SignalingKonfig;
use tauschwerk_store::StoreConfig;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Nachrichtenspeicher-Einstellungen
    pub speicher: SpeicherEinstellungen,
    /// Signaling-Einstellungen
    pub signaling: SignalingEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitig beigetretener Clients
    pub max_clients: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Tauschwerk Server".into(),
            max_clients: 512,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer die TCP-Verbindung (Signaling-Protokoll)
    pub bind_adresse: String,
    /// Port fuer die TCP-Verbindung
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 4747,
        }
    }
}

/// Nachrichtenspeicher-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeicherEinstellungen {
    /// Verbindungs-URL der Datenbank
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
    /// Ob WAL-Modus bei SQLite aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for SpeicherEinstellungen {
    fn default() -> Self {
        Self {
            url: "sqlite://tauschwerk.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

/// Signaling-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingEinstellungen {
    /// Frist in Sekunden, nach der abgelehnte Anrufe geloescht werden
    pub gnadenfrist_sek: u64,
}

impl Default for SignalingEinstellungen {
    fn default() -> Self {
        Self { gnadenfrist_sek: 5 }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Uebersetzt den Speicher-Abschnitt in die Store-Konfiguration
    pub fn als_store_config(&self) -> StoreConfig {
        StoreConfig {
            url: self.speicher.url.clone(),
            max_verbindungen: self.speicher.max_verbindungen,
            sqlite_wal: self.speicher.sqlite_wal,
        }
    }

    /// Uebersetzt Server- und Signaling-Abschnitt in die Signaling-Konfiguration
    pub fn als_signaling_konfig(&self) -> SignalingKonfig {
        SignalingKonfig {
            server_name: self.server.name.clone(),
            max_clients: self.server.max_clients,
            gnadenfrist: Duration::from_secs(self.signaling.gnadenfrist_sek),
        }
    }
}
