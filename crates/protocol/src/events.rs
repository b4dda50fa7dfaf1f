//! Signaling-Protokoll (TCP)
//!
//! Definiert alle Ereignisse die ueber die Verbindung zwischen Client und
//! Server ausgetauscht werden.
//!
//! ## Design
//! - Tagged Enum: jedes Ereignis traegt ein `type`-Feld (snake_case)
//! - Payload-Felder erscheinen auf dem Draht in camelCase
//! - JSON-Serialisierung via serde (TCP, nicht zeitkritisch)
//! - Antworten auf ein Ereignis gehen nur an die urspruengliche Verbindung;
//!   alles andere wird ueber das Verbindungsregister zugestellt

use serde::{Deserialize, Serialize};
use tauschwerk_core::types::{AnrufId, NutzerId};

// ---------------------------------------------------------------------------
// Anruf-Zustand
// ---------------------------------------------------------------------------

/// Zustand einer Anruf-Session.
///
/// `Ringing` ist der einzige Anfangszustand. `Accepted` endet erst mit
/// `end_call` oder einem Verbindungsabbruch. `Rejected` ist ein kurzlebiger
/// Zwischenzustand: der Eintrag wird nach Ablauf einer Gnadenfrist geloescht.
/// Ein beendeter Anruf hat keinen Zustand mehr, der Eintrag verschwindet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnrufStatus {
    Ringing,
    Accepted,
    Rejected,
}

impl AnrufStatus {
    /// Drahtname des Zustands
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Ringing => "ringing",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for AnrufStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

// ---------------------------------------------------------------------------
// Praesenz
// ---------------------------------------------------------------------------

/// Meldet die Identitaet einer frischen Verbindung an.
///
/// Die Identitaet stammt vom externen Auth-Dienst und wird hier unveraendert
/// uebernommen. Pro Verbindung genau einmal wirksam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub identity: NutzerId,
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

/// Direktnachricht vom Client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_identity: NutzerId,
    pub receiver_identity: NutzerId,
    /// Nachrichtentext (wird serverseitig getrimmt)
    pub body: String,
}

/// Zugestellte Nachricht an die Verbindungen des Empfaengers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveMessageEvent {
    /// Persistente Nachrichten-ID
    pub id: String,
    pub sender_identity: NutzerId,
    pub receiver_identity: NutzerId,
    pub body: String,
    /// Speicherzeitpunkt (RFC 3339)
    pub timestamp: String,
    pub is_read: bool,
}

/// Bestaetigung an den Absender nach erfolgreichem Persistieren
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSentAck {
    pub id: String,
    pub success: bool,
}

/// Fehlerbericht an die ausloesende Verbindung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageErrorEvent {
    pub error: String,
}

/// Tipp-Indikator, in beide Richtungen identisch aufgebaut
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub sender_identity: NutzerId,
    pub receiver_identity: NutzerId,
    pub is_typing: bool,
}

// ---------------------------------------------------------------------------
// Anrufe
// ---------------------------------------------------------------------------

/// Anruf aufbauen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateCallRequest {
    pub caller_identity: NutzerId,
    pub receiver_identity: NutzerId,
    /// Opaker Session-Deskriptor (z.B. Raum-Token), wird nicht interpretiert
    pub descriptor: String,
    /// Anzeigename des Anrufers; fehlt er, setzt der Server einen Platzhalter
    pub caller_name: Option<String>,
}

/// Eingehender Anruf an die Verbindungen des Angerufenen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingCallEvent {
    pub call_id: AnrufId,
    pub caller_identity: NutzerId,
    pub caller_name: String,
    pub descriptor: String,
}

/// Bestaetigung an den Anrufer, unabhaengig von der Erreichbarkeit des Ziels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInitiatedAck {
    pub call_id: AnrufId,
    pub descriptor: String,
    pub state: AnrufStatus,
}

/// Anruf annehmen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptCallRequest {
    pub call_id: AnrufId,
}

/// Annahme-Meldung, identisch an beide Seiten
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAcceptedEvent {
    pub call_id: AnrufId,
    pub descriptor: String,
    pub state: AnrufStatus,
}

/// Anruf ablehnen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectCallRequest {
    pub call_id: AnrufId,
}

/// Ablehnungs-Meldung, nur an den Anrufer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRejectedEvent {
    pub call_id: AnrufId,
}

/// Anruf beenden (aus jedem Zustand)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndCallRequest {
    pub call_id: AnrufId,
}

/// Beendigungs-Meldung an beide Seiten bzw. an die verbleibende Seite
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEndedEvent {
    pub call_id: AnrufId,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: SignalEvent
// ---------------------------------------------------------------------------

/// Alle Ereignisse des Signaling-Protokolls (typsicher via Tagged Enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalEvent {
    // Praesenz
    Join(JoinRequest),

    // Nachrichten
    SendMessage(SendMessageRequest),
    ReceiveMessage(ReceiveMessageEvent),
    MessageSent(MessageSentAck),
    MessageError(MessageErrorEvent),
    Typing(TypingEvent),

    // Anrufe
    InitiateCall(InitiateCallRequest),
    IncomingCall(IncomingCallEvent),
    CallInitiated(CallInitiatedAck),
    AcceptCall(AcceptCallRequest),
    CallAccepted(CallAcceptedEvent),
    RejectCall(RejectCallRequest),
    CallRejected(CallRejectedEvent),
    EndCall(EndCallRequest),
    CallEnded(CallEndedEvent),
}

impl SignalEvent {
    /// Drahtname des Ereignistyps, fuer Logausgaben
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join(_) => "join",
            Self::SendMessage(_) => "send_message",
            Self::ReceiveMessage(_) => "receive_message",
            Self::MessageSent(_) => "message_sent",
            Self::MessageError(_) => "message_error",
            Self::Typing(_) => "typing",
            Self::InitiateCall(_) => "initiate_call",
            Self::IncomingCall(_) => "incoming_call",
            Self::CallInitiated(_) => "call_initiated",
            Self::AcceptCall(_) => "accept_call",
            Self::CallAccepted(_) => "call_accepted",
            Self::RejectCall(_) => "reject_call",
            Self::CallRejected(_) => "call_rejected",
            Self::EndCall(_) => "end_call",
            Self::CallEnded(_) => "call_ended",
        }
    }

    /// Erstellt einen Fehlerbericht fuer die ausloesende Verbindung
    pub fn nachrichten_fehler(text: impl Into<String>) -> Self {
        Self::MessageError(MessageErrorEvent { error: text.into() })
    }

    /// Erstellt eine Beendigungs-Meldung
    pub fn anruf_beendet(call_id: AnrufId) -> Self {
        Self::CallEnded(CallEndedEvent { call_id })
    }

    /// Serialisiert das Ereignis als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert ein Ereignis aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_serialisierung() {
        let event = SignalEvent::Join(JoinRequest {
            identity: NutzerId::neu("u1"),
        });
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"join\""));
        assert!(json.contains("\"identity\":\"u1\""));

        let decoded = SignalEvent::from_json(&json).unwrap();
        if let SignalEvent::Join(j) = decoded {
            assert_eq!(j.identity, NutzerId::neu("u1"));
        } else {
            panic!("Erwartet Join-Payload");
        }
    }

    #[test]
    fn send_message_feldnamen_in_camel_case() {
        let event = SignalEvent::SendMessage(SendMessageRequest {
            sender_identity: NutzerId::neu("u1"),
            receiver_identity: NutzerId::neu("u2"),
            body: "hi".to_string(),
        });
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"send_message\""));
        assert!(json.contains("\"senderIdentity\":\"u1\""));
        assert!(json.contains("\"receiverIdentity\":\"u2\""));
        assert!(json.contains("\"body\":\"hi\""));
    }

    #[test]
    fn receive_message_traegt_is_read() {
        let event = SignalEvent::ReceiveMessage(ReceiveMessageEvent {
            id: "m-1".to_string(),
            sender_identity: NutzerId::neu("u1"),
            receiver_identity: NutzerId::neu("u2"),
            body: "hallo".to_string(),
            timestamp: "2025-03-04T12:00:00.000Z".to_string(),
            is_read: false,
        });
        let json = event.to_json().unwrap();
        assert!(json.contains("\"isRead\":false"));
        assert!(json.contains("\"timestamp\":\"2025-03-04T12:00:00.000Z\""));

        let decoded = SignalEvent::from_json(&json).unwrap();
        assert!(matches!(decoded, SignalEvent::ReceiveMessage(_)));
    }

    #[test]
    fn typing_roundtrip() {
        let event = SignalEvent::Typing(TypingEvent {
            sender_identity: NutzerId::neu("u1"),
            receiver_identity: NutzerId::neu("u2"),
            is_typing: true,
        });
        let json = event.to_json().unwrap();
        assert!(json.contains("\"isTyping\":true"));

        let decoded = SignalEvent::from_json(&json).unwrap();
        if let SignalEvent::Typing(t) = decoded {
            assert!(t.is_typing);
        } else {
            panic!("Erwartet Typing-Payload");
        }
    }

    #[test]
    fn initiate_call_ohne_caller_name() {
        let json = r#"{
            "type": "initiate_call",
            "callerIdentity": "u1",
            "receiverIdentity": "u2",
            "descriptor": "raum-7"
        }"#;
        let decoded = SignalEvent::from_json(json).unwrap();
        if let SignalEvent::InitiateCall(req) = decoded {
            assert_eq!(req.caller_identity, NutzerId::neu("u1"));
            assert_eq!(req.descriptor, "raum-7");
            assert!(req.caller_name.is_none());
        } else {
            panic!("Erwartet InitiateCall-Payload");
        }
    }

    #[test]
    fn incoming_call_feldnamen() {
        let event = SignalEvent::IncomingCall(IncomingCallEvent {
            call_id: AnrufId("u1_u2_1_0".to_string()),
            caller_identity: NutzerId::neu("u1"),
            caller_name: "Alice".to_string(),
            descriptor: "raum-7".to_string(),
        });
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"incoming_call\""));
        assert!(json.contains("\"callId\":\"u1_u2_1_0\""));
        assert!(json.contains("\"callerIdentity\":\"u1\""));
        assert!(json.contains("\"callerName\":\"Alice\""));
    }

    #[test]
    fn anruf_status_drahtnamen() {
        assert_eq!(
            serde_json::to_string(&AnrufStatus::Ringing).unwrap(),
            "\"ringing\""
        );
        assert_eq!(
            serde_json::to_string(&AnrufStatus::Accepted).unwrap(),
            "\"accepted\""
        );
        assert_eq!(
            serde_json::to_string(&AnrufStatus::Rejected).unwrap(),
            "\"rejected\""
        );
        assert_eq!(AnrufStatus::Ringing.to_string(), "ringing");
    }

    #[test]
    fn call_accepted_traegt_zustand() {
        let event = SignalEvent::CallAccepted(CallAcceptedEvent {
            call_id: AnrufId("a_b_9_1".to_string()),
            descriptor: "raum-3".to_string(),
            state: AnrufStatus::Accepted,
        });
        let json = event.to_json().unwrap();
        assert!(json.contains("\"state\":\"accepted\""));
    }

    #[test]
    fn nachrichten_fehler_helfer() {
        let event = SignalEvent::nachrichten_fehler("Speicher nicht erreichbar");
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"message_error\""));
        assert!(json.contains("\"error\":\"Speicher nicht erreichbar\""));
    }

    #[test]
    fn unbekannter_eventtyp_schlaegt_fehl() {
        let json = r#"{"type": "shutdown_everything"}"#;
        assert!(SignalEvent::from_json(json).is_err());
    }

    #[test]
    fn eventname_fuer_logs() {
        let event = SignalEvent::EndCall(EndCallRequest {
            call_id: AnrufId("x_y_1_2".to_string()),
        });
        assert_eq!(event.name(), "end_call");
    }
}
