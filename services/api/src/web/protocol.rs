//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! API server for live entry-status updates.

use journal_core::analysis::EntryUpdate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Joins the room for one entry. May be sent again later to watch a
    /// different entry; the previous subscription is dropped.
    JoinEntry {
        #[serde(rename = "entryId")]
        entry_id: Uuid,
    },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the room subscription.
    EntryJoined {
        #[serde(rename = "entryId")]
        entry_id: Uuid,
    },

    /// A status transition, with the decrypted result fields when an
    /// analysis pass produced any. Clients merge this into their cached
    /// entry rather than replacing it wholesale.
    EntryUpdate {
        #[serde(flatten)]
        update: EntryUpdate,
    },

    /// Reports a fatal error to the client, which should display an error message.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::analysis::AnalysisBroadcast;
    use journal_core::domain::EntryStatus;

    #[test]
    fn join_message_uses_wire_names() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "join_entry", "entryId": "7f9c24e5-7d6f-4a46-9c50-294d21b13f67"}"#,
        )
        .unwrap();
        let ClientMessage::JoinEntry { entry_id } = msg;
        assert_eq!(
            entry_id.to_string(),
            "7f9c24e5-7d6f-4a46-9c50-294d21b13f67"
        );
    }

    #[test]
    fn entry_update_flattens_status_and_result() {
        let msg = ServerMessage::EntryUpdate {
            update: EntryUpdate {
                status: EntryStatus::Completed,
                result: Some(AnalysisBroadcast {
                    transcript: Some("hello".to_string()),
                    ..Default::default()
                }),
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "entry_update");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["result"]["transcript"], "hello");
        // Unstaged fields are omitted entirely.
        assert!(json["result"].get("goals").is_none());
    }
}
