//! The input contract a host hands the engine for every packet (spec
//! §3.1 item 1). The core never owns capture buffers; it borrows a
//! `Packet` for the duration of one call and, if it needs the bytes to
//! outlive that call (an out-of-order TCP segment), copies what it
//! needs into a [`crate::tcp::segment::PendingSegment`].

use std::net::IpAddr;

use crate::session::Direction;

/// One captured packet, already reassembled at the IP layer by the host.
///
/// `payload_offset`/`payload_len` bound the transport-layer segment
/// (TCP header + data, or the UDP datagram) within `data`; the core
/// never looks outside that span.
#[derive(Debug, Clone)]
pub struct Packet {
    pub data: Vec<u8>,
    pub payload_offset: usize,
    pub payload_len: usize,

    pub src_addr: IpAddr,
    pub src_port: u16,
    pub dst_addr: IpAddr,
    pub dst_port: u16,

    pub timestamp_us: u64,
    pub vlan: u16,
    pub vni: u32,

    /// Which side of the session this packet came from. `0xFF` until
    /// [`crate::tcp::TcpEngine::pre_process`] (or the UDP dispatcher)
    /// assigns it against the session's bootstrapped endpoints.
    pub direction: Direction,
}

impl Packet {
    pub fn new(
        data: Vec<u8>,
        payload_offset: usize,
        payload_len: usize,
        src_addr: IpAddr,
        src_port: u16,
        dst_addr: IpAddr,
        dst_port: u16,
        timestamp_us: u64,
    ) -> Self {
        Packet {
            data,
            payload_offset,
            payload_len,
            src_addr,
            src_port,
            dst_addr,
            dst_port,
            timestamp_us,
            vlan: 0,
            vni: 0,
            direction: u8::MAX,
        }
    }

    /// The transport-layer span (TCP header + data, or the full UDP
    /// datagram) as a borrowed slice.
    pub fn transport_payload(&self) -> &[u8] {
        let end = (self.payload_offset + self.payload_len).min(self.data.len());
        if self.payload_offset > end {
            &[]
        } else {
            &self.data[self.payload_offset..end]
        }
    }
}
