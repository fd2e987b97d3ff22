//! Event dispatcher.
//!
//! Classifies decoded frames into typed [`Event`]s and publishes them on a
//! broadcast channel. A frame whose body fails to parse is logged and
//! skipped; one bad message never interrupts the stream. Publication order
//! matches arrival order for every subscriber.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::events::{ConnectionState, Event};
use crate::protocol::{Frame, Operation};

// ============================================================================
// Dispatcher
// ============================================================================

/// Publishes typed events to all subscribers, in arrival order.
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    events: broadcast::Sender<Event>,
}

impl Dispatcher {
    pub(crate) fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self { events }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Publishes a connection state transition.
    pub(crate) fn publish_state(&self, state: ConnectionState) {
        self.publish(Event::ConnectionStateChanged(state));
    }

    /// Classifies one decoded frame and publishes the resulting event.
    ///
    /// Frames that carry nothing for subscribers (handshake acks, unknown
    /// operations) are dropped silently.
    pub(crate) fn dispatch(&self, frame: &Frame) {
        match frame.operation() {
            Operation::HeartbeatReply => match parse_popularity(frame.body()) {
                Some(popularity) => self.publish(Event::HeartbeatReply { popularity }),
                None => warn!(
                    body_len = frame.body().len(),
                    "heartbeat reply body too short, skipping"
                ),
            },

            Operation::Message => match parse_command(frame.body()) {
                Ok(event) => self.publish(event),
                Err(e) => warn!(error = %e, "unparseable message frame, skipping"),
            },

            other => trace!(operation = ?other, "ignoring frame"),
        }
    }

    fn publish(&self, event: Event) {
        // Err means no live subscribers; the stream is fire-and-forget.
        let _ = self.events.send(event);
    }
}

// ============================================================================
// Frame Body Parsing
// ============================================================================

/// Reads the big-endian popularity counter from a heartbeat reply body.
fn parse_popularity(body: &[u8]) -> Option<u32> {
    if body.len() < 4 {
        return None;
    }
    Some(u32::from_be_bytes([body[0], body[1], body[2], body[3]]))
}

/// Parses a message body's JSON command envelope into a typed event.
fn parse_command(body: &[u8]) -> Result<Event, serde_json::Error> {
    let envelope: Value = serde_json::from_slice(body)?;
    let cmd = envelope
        .get("cmd")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    // The live servers occasionally suffix DANMU_MSG with routing metadata
    // ("DANMU_MSG:4:0:2:2:2:0"), so match on the prefix.
    let event = if cmd.starts_with("DANMU_MSG") {
        parse_danmaku(&envelope).unwrap_or(Event::Raw {
            cmd,
            payload: envelope,
        })
    } else {
        match cmd.as_str() {
            "SEND_GIFT" => parse_gift(&envelope).unwrap_or(Event::Raw {
                cmd,
                payload: envelope,
            }),
            "ROOM_CHANGE" => parse_room_change(&envelope).unwrap_or(Event::Raw {
                cmd,
                payload: envelope,
            }),
            _ => Event::Raw {
                cmd,
                payload: envelope,
            },
        }
    };

    Ok(event)
}

/// Danmaku payloads are positional: `info[1]` is the text, `info[2]` is
/// `[uid, username, ...]`.
fn parse_danmaku(envelope: &Value) -> Option<Event> {
    let info = envelope.get("info")?.as_array()?;
    let text = info.get(1)?.as_str()?.to_string();
    let sender = info.get(2)?.as_array()?;

    Some(Event::Danmaku {
        uid: sender.first().and_then(Value::as_u64).unwrap_or_default(),
        user: sender
            .get(1)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        text,
    })
}

fn parse_gift(envelope: &Value) -> Option<Event> {
    let data = envelope.get("data")?;

    Some(Event::GiftSend {
        user: data.get("uname")?.as_str()?.to_string(),
        gift: data.get("giftName")?.as_str()?.to_string(),
        count: data.get("num").and_then(Value::as_u64).unwrap_or(1),
    })
}

fn parse_room_change(envelope: &Value) -> Option<Event> {
    let data = envelope.get("data")?;

    Some(Event::RoomChange {
        title: data
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        area: data
            .get("area_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;

    use crate::protocol::ProtocolVersion;

    fn message_frame(body: &[u8]) -> Frame {
        Frame::new(
            Operation::Message,
            ProtocolVersion::Plain,
            1,
            Bytes::copy_from_slice(body),
        )
    }

    fn dispatch_one(body: &[u8]) -> Option<Event> {
        let dispatcher = Dispatcher::new(16);
        let mut rx = dispatcher.subscribe();
        dispatcher.dispatch(&message_frame(body));
        rx.try_recv().ok()
    }

    #[test]
    fn test_danmaku_command() {
        let body = br#"{"cmd":"DANMU_MSG","info":[[],"hello room",[12345,"alice",0]]}"#;

        match dispatch_one(body) {
            Some(Event::Danmaku { uid, user, text }) => {
                assert_eq!(uid, 12345);
                assert_eq!(user, "alice");
                assert_eq!(text, "hello room");
            }
            other => panic!("expected Danmaku, got {other:?}"),
        }
    }

    #[test]
    fn test_danmaku_command_with_suffix() {
        let body = br#"{"cmd":"DANMU_MSG:4:0:2:2:2:0","info":[[],"hi",[7,"bob",0]]}"#;

        assert!(matches!(
            dispatch_one(body),
            Some(Event::Danmaku { uid: 7, .. })
        ));
    }

    #[test]
    fn test_gift_command() {
        let body = br#"{"cmd":"SEND_GIFT","data":{"uname":"carol","giftName":"flower","num":3}}"#;

        match dispatch_one(body) {
            Some(Event::GiftSend { user, gift, count }) => {
                assert_eq!(user, "carol");
                assert_eq!(gift, "flower");
                assert_eq!(count, 3);
            }
            other => panic!("expected GiftSend, got {other:?}"),
        }
    }

    #[test]
    fn test_room_change_command() {
        let body = br#"{"cmd":"ROOM_CHANGE","data":{"title":"new title","area_name":"games"}}"#;

        match dispatch_one(body) {
            Some(Event::RoomChange { title, area }) => {
                assert_eq!(title, "new title");
                assert_eq!(area, "games");
            }
            other => panic!("expected RoomChange, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_command_surfaces_as_raw() {
        let body = br#"{"cmd":"WATCHED_CHANGE","data":{"num":100}}"#;

        match dispatch_one(body) {
            Some(Event::Raw { cmd, payload }) => {
                assert_eq!(cmd, "WATCHED_CHANGE");
                assert_eq!(payload["data"]["num"], 100);
            }
            other => panic!("expected Raw, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_danmaku_falls_back_to_raw() {
        // Valid envelope, unexpected info shape.
        let body = br#"{"cmd":"DANMU_MSG","info":"not an array"}"#;

        assert!(matches!(dispatch_one(body), Some(Event::Raw { .. })));
    }

    #[test]
    fn test_invalid_json_is_skipped() {
        assert!(dispatch_one(b"{{{ not json").is_none());
    }

    #[test]
    fn test_parse_failure_does_not_interrupt_stream() {
        let dispatcher = Dispatcher::new(16);
        let mut rx = dispatcher.subscribe();

        dispatcher.dispatch(&message_frame(b"garbage"));
        dispatcher.dispatch(&message_frame(
            br#"{"cmd":"DANMU_MSG","info":[[],"still here",[1,"dave",0]]}"#,
        ));

        match rx.try_recv() {
            Ok(Event::Danmaku { text, .. }) => assert_eq!(text, "still here"),
            other => panic!("expected Danmaku, got {other:?}"),
        }
    }

    #[test]
    fn test_heartbeat_reply_popularity() {
        let dispatcher = Dispatcher::new(16);
        let mut rx = dispatcher.subscribe();

        let frame = Frame::new(
            Operation::HeartbeatReply,
            ProtocolVersion::Plain,
            1,
            Bytes::copy_from_slice(&1_234_567u32.to_be_bytes()),
        );
        dispatcher.dispatch(&frame);

        assert!(matches!(
            rx.try_recv(),
            Ok(Event::HeartbeatReply {
                popularity: 1_234_567
            })
        ));
    }

    #[test]
    fn test_short_heartbeat_reply_is_skipped() {
        let dispatcher = Dispatcher::new(16);
        let mut rx = dispatcher.subscribe();

        let frame = Frame::new(
            Operation::HeartbeatReply,
            ProtocolVersion::Plain,
            1,
            Bytes::from_static(&[0, 1]),
        );
        dispatcher.dispatch(&frame);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_publication_preserves_order() {
        let dispatcher = Dispatcher::new(16);
        let mut rx = dispatcher.subscribe();

        for seq in 0..5u32 {
            let body = format!(r#"{{"cmd":"CMD_{seq}"}}"#);
            dispatcher.dispatch(&message_frame(body.as_bytes()));
        }

        for seq in 0..5u32 {
            match rx.try_recv() {
                Ok(Event::Raw { cmd, .. }) => assert_eq!(cmd, format!("CMD_{seq}")),
                other => panic!("expected Raw, got {other:?}"),
            }
        }
    }
}
