//! tauschwerk-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und verdrahtet beim Start den
//! Nachrichtenspeicher mit der Signaling-Schicht.

pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;

use tauschwerk_signaling::{SignalingServer, SignalingState};
use tauschwerk_store::SqliteStore;

use config::ServerConfig;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenbank oeffnen (inkl. Migrationen)
    /// 2. Signaling-Zustand verdrahten
    /// 3. TCP-Listener starten
    /// 4. Auf Ctrl-C warten
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.config.tcp_bind_adresse(),
            "Server startet"
        );

        let store_config = self.config.als_store_config();
        let store = SqliteStore::oeffnen(&store_config)
            .await
            .with_context(|| format!("Datenbank '{}' nicht nutzbar", store_config.url))?;

        let state = SignalingState::neu(Arc::new(store), self.config.als_signaling_konfig());

        let bind_addr = self.config.tcp_bind_adresse().parse().with_context(|| {
            format!(
                "Ungueltige Bind-Adresse '{}'",
                self.config.tcp_bind_adresse()
            )
        })?;

        // Ctrl-C kippt den Watch-Kanal, die Accept-Schleife beendet sich danach
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
            }
        });

        SignalingServer::neu(state, bind_addr)
            .starten(shutdown_rx)
            .await
            .context("Signaling-Server abgebrochen")?;

        tracing::info!("Server beendet");
        Ok(())
    }
}
