//! S6 (spec §8): a single TCP payload carrying an RDP X.224 connection
//! request with a `Cookie: mstshash=` token. Expect protocol `"rdp"` and
//! the `user` field set to the cookie value, lowercased.

#[path = "support/mod.rs"]
mod support;

use capture_core::field::FieldId;
use capture_core::protocols::ProtocolFields;
use capture_core::registry::Registry;
use support::RecordingSession;

fn fields() -> ProtocolFields {
    ProtocolFields {
        user: FieldId(1),
        quic_host: FieldId(2),
        quic_version: FieldId(3),
        quic_user_agent: FieldId(4),
    }
}

#[test]
fn s6_rdp_cookie_tags_protocol_and_extracts_lowercased_user() {
    let fields = fields();
    let mut registry: Registry<RecordingSession> = Registry::new();
    capture_core::register_all(&mut registry, &fields).unwrap();
    registry.seal();

    let mut payload = vec![0x03u8, 0x00, 0x00, 0x2b, 0x26, 0xe0, 0x00, 0x00, 0x00, 0x00, 0x00];
    payload.extend_from_slice(b"Cookie: mstshash=Administrator\r\n");
    while payload.len() < 0x2b {
        payload.push(0);
    }
    payload[3] = payload.len() as u8;
    payload[4] = payload[3] - 5;

    let mut session = RecordingSession::new();
    registry.match_tcp(&mut session, &payload, 0, session.state.port1, session.state.port2);

    assert!(session.has_protocol("rdp"));
    let user = session.field_value(fields.user).expect("user field emitted");
    assert_eq!(user, b"administrator");
}
