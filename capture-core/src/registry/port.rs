use std::any::Any;

use super::ClassifyFn;
use crate::session::Direction;

/// Transport kinds for port classifiers (spec §6.2's "Transport kinds:
/// TCP, UDP, TCP_SRC_PORT, TCP_DST_PORT, TCP_EITHER_PORT, UDP_PORT").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortTransport {
    TcpSrcPort,
    TcpDstPort,
    TcpEitherPort,
    UdpPort,
}

pub struct PortRule<S> {
    pub name: &'static str,
    pub transport: PortTransport,
    pub port: u16,
    pub classify: ClassifyFn<S>,
    pub userdata: Box<dyn Any + Send + Sync>,
}

impl<S> PortRule<S> {
    /// `port1`/`port2` are the session's two endpoint ports (spec §3.2);
    /// `direction` picks which one is "sending" for this byte-run —
    /// sender is `port1` for direction 0, `port2` for direction 1 (spec
    /// §3.2's "direction 0 is the initiator direction").
    pub fn matches_tcp_endpoints(&self, port1: u16, port2: u16, direction: Direction) -> bool {
        let (sender, receiver) = if direction == 0 {
            (port1, port2)
        } else {
            (port2, port1)
        };
        match self.transport {
            PortTransport::TcpSrcPort => sender == self.port,
            PortTransport::TcpDstPort => receiver == self.port,
            PortTransport::TcpEitherPort => port1 == self.port || port2 == self.port,
            PortTransport::UdpPort => false,
        }
    }

    /// A single UDP datagram carries its own src/dst port pair, with no
    /// persistent session endpoints to consult (spec §4.5). `UDP_PORT`
    /// fires on either side matching, the natural reading given UDP has
    /// no inherent client/server direction at dispatch time — see
    /// DESIGN.md's note on this Open Question.
    pub fn matches_udp_datagram(&self, src_port: u16, dst_port: u16) -> bool {
        self.transport == PortTransport::UdpPort && (src_port == self.port || dst_port == self.port)
    }
}
