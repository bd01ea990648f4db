//! Session handle: an opaque, externally-owned record (spec §3.2). The
//! core never allocates or frees session memory; it reads and writes a
//! small fixed set of slots, collected here as [`SessionState`]. A host
//! embeds `SessionState` in its own session type and implements
//! [`Session`] (which also requires [`FieldSink`]) so the engine can
//! operate on it generically.

use std::net::IpAddr;

use crate::field::FieldSink;
use crate::parser::ParserList;
use crate::tcp::segment::PendingSegment;

/// `0` or `1`. Direction 0 is the initiator ("client → server") direction
/// as determined at bootstrap (spec §3.2 invariants).
pub type Direction = u8;

/// Flips `0 <-> 1`.
pub fn other(d: Direction) -> Direction {
    1 - d
}

/// Per-direction TCP half-connection state (spec §4.7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TcpHalfState {
    #[default]
    Open,
    FinSeen,
    FinAcked,
}

/// Saturating counters per observed flag kind, one set per session (spec
/// §3.2 "counters per flag kind"). All of them saturate at 255 rather
/// than wrapping, matching the original's `uint8_t` counters (see
/// SPEC_FULL.md's "Saturating per-flag counters").
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagCounters {
    pub syn: u8,
    pub syn_ack: u8,
    pub ack: u8,
    pub psh: u8,
    pub fin: u8,
    pub rst: u8,
    pub urg: u8,
    pub src_zero_win: u8,
    pub dst_zero_win: u8,
}

impl FlagCounters {
    fn bump(counter: &mut u8) {
        *counter = counter.saturating_add(1);
    }
}

/// Per-direction bookkeeping the engine needs (spec §3.2).
#[derive(Debug, Clone, Default)]
pub struct PerDirection {
    pub expected_seq: Option<u32>,
    pub total_delivered: u64,
    pub consumed_by_parsers: u64,
    pub first_bytes: [u8; 8],
    pub first_bytes_len: u8,
    pub tcp_state: TcpHalfState,
    pub ack_count: u8,
}

impl PerDirection {
    /// Appends up to 8 bytes into the fingerprint, never overwriting once
    /// full (SPEC_FULL's "first_bytes is append-only" supplement).
    pub fn extend_first_bytes(&mut self, data: &[u8]) {
        let have = self.first_bytes_len as usize;
        if have >= self.first_bytes.len() {
            return;
        }
        let take = (self.first_bytes.len() - have).min(data.len());
        self.first_bytes[have..have + take].copy_from_slice(&data[..take]);
        self.first_bytes_len += take as u8;
    }
}

/// The fixed set of slots the core reads and writes on a session, per
/// spec §3.2. Embed this in a host session type; the host owns the
/// memory, the core only ever touches it through `&mut SessionState`.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub addr1: IpAddr,
    pub port1: u16,
    pub addr2: IpAddr,
    pub port2: u16,

    pub has_tcp_handshake_seen: bool,
    pub dir: [PerDirection; 2],
    /// bit 0 = dir0 initial seq captured, bit 1 = dir1
    pub syn_set: u8,
    pub flags: FlagCounters,
    pub tcp_flags_union: u8,
    pub syn_time_us: u64,
    pub ack_time_us: u64,
    /// per-direction bit: out-of-order already tagged
    pub out_of_order_tagged: u8,
    /// per-direction bit: acked-unseen already tagged
    pub acked_unseen_tagged: u8,

    pub queue: Vec<PendingSegment>,
    pub close_pending: bool,
    pub stop_tcp: bool,
    pub stop_spi: bool,

    /// Number of PSH packets seen, tracked for the single-packet
    /// short-circuit on close (spec §4.4.6).
    pub psh_count: u32,
}

impl SessionState {
    pub fn new(addr1: IpAddr, port1: u16, addr2: IpAddr, port2: u16) -> Self {
        SessionState {
            addr1,
            port1,
            addr2,
            port2,
            has_tcp_handshake_seen: false,
            dir: [PerDirection::default(), PerDirection::default()],
            syn_set: 0,
            flags: FlagCounters::default(),
            tcp_flags_union: 0,
            syn_time_us: 0,
            ack_time_us: 0,
            out_of_order_tagged: 0,
            acked_unseen_tagged: 0,
            queue: Vec::new(),
            close_pending: false,
            stop_tcp: false,
            stop_spi: false,
            psh_count: 0,
        }
    }

    pub fn syn_bit_set(&self, d: Direction) -> bool {
        self.syn_set & (1 << d) != 0
    }

    pub fn set_syn_bit(&mut self, d: Direction) {
        self.syn_set |= 1 << d;
    }

    pub fn out_of_order_tagged_get(&self, d: Direction) -> bool {
        self.out_of_order_tagged & (1 << d) != 0
    }

    pub fn out_of_order_tagged_set(&mut self, d: Direction) {
        self.out_of_order_tagged |= 1 << d;
    }

    pub fn acked_unseen_tagged_get(&self, d: Direction) -> bool {
        self.acked_unseen_tagged & (1 << d) != 0
    }

    pub fn acked_unseen_tagged_set(&mut self, d: Direction) {
        self.acked_unseen_tagged |= 1 << d;
    }

    /// Saturating-increments whichever counter `select` points at (spec
    /// §3.2 "counters per flag kind"), collapsing the
    /// read-then-saturating_add-then-write dance callers would otherwise
    /// repeat per flag.
    pub fn bump_flag(&mut self, select: impl FnOnce(&mut FlagCounters) -> &mut u8) {
        FlagCounters::bump(select(&mut self.flags));
    }
}

/// A host session type: owns a [`SessionState`] and implements
/// [`FieldSink`] so the TCP/UDP engines can emit fields and tags directly
/// on it. The core calls [`Session::state`]/[`Session::state_mut`] and
/// nothing else to reach session memory — it never assumes anything
/// about the rest of the host's session representation.
pub trait Session: FieldSink + Sized {
    fn state(&self) -> &SessionState;
    fn state_mut(&mut self) -> &mut SessionState;

    /// The session's per-session parser list (spec §3.2's "per-session
    /// parser list head (owned)"). Kept separate from [`SessionState`]
    /// because it is generic over the concrete session type (parsers
    /// receive `&mut Self`, not a type-erased handle).
    fn parsers(&self) -> &ParserList<Self>;
    fn parsers_mut(&mut self) -> &mut ParserList<Self>;
}
