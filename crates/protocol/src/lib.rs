//! tauschwerk-protocol: Signaling-Protokoll-Definitionen
//!
//! Dieses Crate definiert alle Ereignistypen die zwischen Client und Server
//! ausgetauscht werden sowie das Frame-Format auf der TCP-Verbindung.

pub mod events;
pub mod wire;

pub use events::{AnrufStatus, SignalEvent};
pub use wire::FrameCodec;
