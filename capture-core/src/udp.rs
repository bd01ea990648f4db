//! UDP dispatch (spec §4.5). Unlike TCP, UDP bypasses reassembly
//! entirely: each datagram is classified independently, and a
//! classifier may attach a per-session parser that then gets first
//! refusal on every later datagram in the same session, until it
//! unregisters itself.
//!
//! Mirrors [`crate::tcp::TcpEngine`]'s shape (`pre_process` bootstraps
//! orientation, `process` drives one packet) but carries no reassembly
//! state at all — a `UdpDispatcher` is a stateless, shareable handle.

use crate::field::FieldSink;
use crate::packet::Packet;
use crate::registry::Registry;
use crate::session::{Direction, Session};

/// Stateless UDP dispatcher. Exists mainly for symmetry with
/// [`crate::tcp::TcpEngine`] and as the seam a future non-trivial UDP
/// concern (fragmentation, say) would hang off.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpDispatcher;

impl UdpDispatcher {
    pub fn new() -> Self {
        UdpDispatcher
    }

    /// Bootstraps a new session's endpoint orientation from its first
    /// datagram (spec §3.2: direction 0 is the initiator). Unlike TCP
    /// there is no SYN/SYN-ACK to key off of, so the first datagram's
    /// sender is simply direction 0.
    pub fn pre_process<S: Session>(&self, session: &mut S, packet: &mut Packet, is_new_session: bool) {
        if is_new_session {
            let state = session.state_mut();
            state.port1 = packet.src_port;
            state.port2 = packet.dst_port;
            session.emit_protocol("udp");
        }

        let state = session.state();
        let same_orientation = state.addr1 == packet.src_addr
            && state.addr2 == packet.dst_addr
            && state.port1 == packet.src_port
            && state.port2 == packet.dst_port;
        packet.direction = if same_orientation { 0 } else { 1 };
    }

    /// Dispatches one datagram (spec §4.5): if the session already has a
    /// per-session parser attached from an earlier datagram, it gets the
    /// bytes directly and classification is skipped for this datagram.
    /// Otherwise the datagram's first bytes run through the port and
    /// pattern registries, which may themselves attach a parser for
    /// datagrams still to come.
    pub fn process<S: Session>(&self, session: &mut S, registry: &Registry<S>, packet: &Packet) {
        let direction: Direction = packet.direction;
        let data = packet.transport_payload();

        if !session.parsers().is_empty() {
            let mut parsers = std::mem::take(session.parsers_mut());
            parsers.deliver(session, data, direction);
            *session.parsers_mut() = parsers;
            return;
        }

        let (src_port, dst_port) = if direction == 0 {
            (session.state().port1, session.state().port2)
        } else {
            (session.state().port2, session.state().port1)
        };
        registry.match_udp(session, data, direction, src_port, dst_port);
    }
}
