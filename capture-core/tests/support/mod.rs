//! Shared integration-test session: a `Session`/`FieldSink` impl that
//! records everything emitted, for assertions in the S1–S6 seed
//! scenarios (spec §8). Not part of the public API.

use std::net::{IpAddr, Ipv4Addr};

use capture_core::{FieldId, FieldSink, ParserList, Session, SessionState};

pub struct RecordingSession {
    pub state: SessionState,
    pub parsers: ParserList<RecordingSession>,
    pub protocols: Vec<&'static str>,
    pub tags: Vec<&'static str>,
    pub fields: Vec<(FieldId, Vec<u8>)>,
    pub closed: bool,
}

impl RecordingSession {
    pub fn new_with(addr1: IpAddr, port1: u16, addr2: IpAddr, port2: u16) -> Self {
        RecordingSession {
            state: SessionState::new(addr1, port1, addr2, port2),
            parsers: ParserList::new(),
            protocols: Vec::new(),
            tags: Vec::new(),
            fields: Vec::new(),
            closed: false,
        }
    }

    pub fn new() -> Self {
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        Self::new_with(a, 11111, b, 80)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| *t == tag)
    }

    pub fn has_protocol(&self, name: &str) -> bool {
        self.protocols.iter().any(|p| *p == name)
    }

    pub fn field_value(&self, field: FieldId) -> Option<&[u8]> {
        self.fields.iter().find(|(f, _)| *f == field).map(|(_, v)| v.as_slice())
    }
}

impl FieldSink for RecordingSession {
    fn emit_protocol(&mut self, name: &'static str) {
        if !self.protocols.contains(&name) {
            self.protocols.push(name);
        }
    }
    fn emit_field_lowercase(&mut self, field: FieldId, bytes: &[u8]) {
        self.fields.push((field, bytes.to_ascii_lowercase()));
    }
    fn emit_field(&mut self, field: FieldId, bytes: &[u8], _copy: bool) {
        self.fields.push((field, bytes.to_vec()));
    }
    fn add_tag(&mut self, tag: &'static str) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }
    fn mark_for_close(&mut self) {
        self.closed = true;
        self.state.close_pending = true;
    }
}

impl Session for RecordingSession {
    fn state(&self) -> &SessionState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }
    fn parsers(&self) -> &ParserList<Self> {
        &self.parsers
    }
    fn parsers_mut(&mut self) -> &mut ParserList<Self> {
        &mut self.parsers
    }
}

#[allow(clippy::too_many_arguments)]
pub fn tcp_packet(
    src_addr: IpAddr,
    src_port: u16,
    dst_addr: IpAddr,
    dst_port: u16,
    flags: u8,
    seq: u32,
    ack: u32,
    payload: &[u8],
) -> capture_core::Packet {
    let mut header = vec![0u8; 20];
    header[0..2].copy_from_slice(&src_port.to_be_bytes());
    header[2..4].copy_from_slice(&dst_port.to_be_bytes());
    header[4..8].copy_from_slice(&seq.to_be_bytes());
    header[8..12].copy_from_slice(&ack.to_be_bytes());
    header[12] = 5 << 4;
    header[13] = flags;
    header[14..16].copy_from_slice(&65535u16.to_be_bytes());

    let mut data = header;
    data.extend_from_slice(payload);
    let len = data.len();
    capture_core::Packet::new(data, 0, len, src_addr, src_port, dst_addr, dst_port, 0)
}
