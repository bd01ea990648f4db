//! Field sink: a thin write-only interface the core uses to emit extracted
//! fields (e.g. `user`, `quic.host`) keyed by a pre-registered field id.
//! Implementation — the actual storage and indexing — is supplied
//! externally (spec §3.1 item 2); the core only ever writes through the
//! trait below.

use std::fmt;

/// Opaque handle to a pre-registered field, obtained from the host via
/// [`FieldSink::field_by_name`] at startup. Cheap to copy; carries no
/// lifetime so it can be cached on classifier/parser userdata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field#{}", self.0)
    }
}

/// Host-supplied sink for everything the core extracts. Mirrors §6.1 of
/// the external-interfaces contract: `emit_protocol`, `emit_field*`,
/// `mark_for_close`, `add_tag`.
///
/// Every method is infallible from the core's point of view — a sink
/// implementation that cannot store a field (e.g. an unknown `FieldId`)
/// must swallow the failure internally rather than propagate, matching
/// spec §7's "no errors propagate out of the hot path" rule.
pub trait FieldSink {
    /// Record that this session has been positively identified as `name`
    /// (e.g. `"tcp"`, `"pop3"`, `"quic"`).
    fn emit_protocol(&mut self, name: &'static str);

    /// Emit a field value, lower-casing it first (used for usernames,
    /// hostnames — anything normalized case-insensitively downstream).
    fn emit_field_lowercase(&mut self, field: FieldId, bytes: &[u8]);

    /// Emit a field value verbatim. `copy` signals whether the sink must
    /// take an owned copy now (the bytes may not outlive the call) or may
    /// retain a borrow; implementations over owned storage ignore it.
    fn emit_field(&mut self, field: FieldId, bytes: &[u8], copy: bool);

    /// Attach a diagnostic tag (e.g. `"out-of-order-src"`,
    /// `"incomplete-tcp"`) that does not itself imply a protocol.
    fn add_tag(&mut self, tag: &'static str);

    /// Request that the owning collaborator close this session once
    /// convenient (it remains readable/writable by the core until then).
    fn mark_for_close(&mut self);
}
