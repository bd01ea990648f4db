//! Shared test-only session implementation used across unit tests in
//! this crate. Not part of the public API.
#![cfg(test)]

use std::net::{IpAddr, Ipv4Addr};

use crate::field::{FieldId, FieldSink};
use crate::parser::ParserList;
use crate::session::{Session, SessionState};

pub struct TestSession {
    pub state: SessionState,
    pub parsers: ParserList<TestSession>,
    pub protocols: Vec<&'static str>,
    pub tags: Vec<&'static str>,
    pub fields: Vec<(FieldId, Vec<u8>)>,
    pub closed: bool,
}

impl TestSession {
    pub fn new_with(addr1: IpAddr, port1: u16, addr2: IpAddr, port2: u16) -> Self {
        TestSession {
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
}

impl FieldSink for TestSession {
    fn emit_protocol(&mut self, name: &'static str) {
        if !self.protocols.contains(&name) {
            self.protocols.push(name);
        }
    }
    fn emit_field_lowercase(&mut self, field: FieldId, bytes: &[u8]) {
        self.fields
            .push((field, bytes.to_ascii_lowercase()));
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

impl Session for TestSession {
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
