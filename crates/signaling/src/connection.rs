//! Client-Verbindung – verwaltet eine einzelne TCP-Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task: eine select!-Schleife ueber eingehende Frames und die
//! ausgehende Send-Queue.
//!
//! Eine frische Verbindung ist anonym. Erst ein `join`-Event bindet sie an
//! eine Identitaet und macht sie fuer Zustellungen erreichbar. Beim
//! Schliessen werden Register und Anruf-Tabelle in einem Schritt bereinigt,
//! bevor der Task endet.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use tauschwerk_core::types::VerbindungsId;
use tauschwerk_protocol::wire::FrameCodec;
use tauschwerk_store::MessageStore;

use crate::dispatcher::{EventDispatcher, VerbindungsKontext};
use crate::registry::ClientSender;
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne TCP-Verbindung
pub struct ClientConnection<S: MessageStore> {
    state: Arc<SignalingState<S>>,
    peer_addr: SocketAddr,
}

impl<S: MessageStore> ClientConnection<S> {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState<S>>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, ein Frame-Fehler auftritt oder ein
    /// Shutdown-Signal eingeht.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let verbindungs_id = VerbindungsId::neu();

        tracing::info!(peer = %peer_addr, verbindung = %verbindungs_id, "Neue Verbindung");

        let mut framed = Framed::new(stream, FrameCodec::new());

        // Ausgehende Event-Queue; das Register reiht hier Zustellungen ein
        let (sender, mut sende_rx) = ClientSender::neu(verbindungs_id);

        let kontext = VerbindungsKontext {
            verbindungs_id,
            sender,
        };
        let dispatcher = EventDispatcher::neu(Arc::clone(&self.state));

        loop {
            tokio::select! {
                // Eingehendes Event vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(event)) => {
                            tracing::trace!(peer = %peer_addr, event = event.name(), "Event empfangen");
                            if let Some(antwort) = dispatcher.verarbeiten(&kontext, event).await {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Zustellung aus dem Register
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Zustellung fehlgeschlagen");
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Register-Austritt und Anruf-Bereinigung als ein Schritt, bevor
        // der Task endet
        dispatcher.verbindung_schliessen(&kontext);

        tracing::info!(peer = %peer_addr, verbindung = %verbindungs_id, "Verbindungs-Task beendet");
    }
}
