//! tauschwerk-store: Nachrichtenspeicher
//!
//! Dieses Crate stellt das Repository-Pattern fuer Direktnachrichten bereit.
//! Das Signaling persistiert jede Nachricht bevor sie zugestellt wird; der
//! Abfragepfad (Konversation laden, als gelesen markieren) gehoert dem
//! aeusseren REST-Dienst, laeuft aber ueber dieselbe Schnittstelle.

pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use error::StoreError;
pub use models::{NachrichtRecord, NeueNachricht};
pub use repository::{MessageStore, StoreConfig, StoreResult};
pub use sqlite::SqliteStore;
