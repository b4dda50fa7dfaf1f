//! tauschwerk-signaling – Realtime-Schicht der Skill-Tausch-Plattform
//!
//! Dieser Crate implementiert den Session-Koordinator fuer Tauschwerk:
//! das Praesenz-Verzeichnis, das Nachrichten-Relay und die
//! Anruf-Zustandsmaschine, erreichbar ueber einen framebasierten
//! TCP-Transport.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  anonym bis zum `join`, danach zustellbar
//!     |
//!     v
//! EventDispatcher
//!     |
//!     +-- VerbindungsRegister (join / leave / Zustellung an Identitaeten)
//!     +-- NachrichtenRelay    (send_message, typing; Store zuerst)
//!     +-- AnrufKoordinator    (initiate / accept / reject / end / Abbruch)
//!             |
//!             +-- AnrufTabelle (ringing -> accepted | rejected, Gnadenfrist)
//! ```
//!
//! Alle Verbindungs-Tasks laufen auf einer `LocalSet`; Register und
//! Tabelle sind DashMap-basiert und bleiben damit auch unter einem
//! Multi-Thread-Executor korrekt.

pub mod calls;
pub mod connection;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod relay;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use calls::{AnrufSitzung, AnrufTabelle};
pub use connection::ClientConnection;
pub use coordinator::AnrufKoordinator;
pub use dispatcher::{EventDispatcher, VerbindungsKontext};
pub use error::{SignalingError, SignalingResult};
pub use registry::{ClientSender, VerbindungsRegister};
pub use relay::NachrichtenRelay;
pub use server_state::{SignalingKonfig, SignalingState};
pub use tcp::SignalingServer;
