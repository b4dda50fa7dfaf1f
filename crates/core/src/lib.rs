//! tauschwerk-core: gemeinsame Identifikationstypen
//!
//! Dieses Crate stellt die fundamentalen ID-Typen bereit, die von allen
//! anderen Tauschwerk-Crates gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{AnrufId, NutzerId, VerbindungsId};
