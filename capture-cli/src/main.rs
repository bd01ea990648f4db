#![forbid(unsafe_code)]

//! Thin demo binary over `capture-core`: loads the reassembly config,
//! registers every protocol parser the core ships with, then runs a
//! small synthetic packet source through the TCP and UDP engines to
//! show the whole pipeline wired together end to end. A real deployment
//! would replace [`DemoSession`] with its own session storage and feed
//! packets from a capture source instead of [`synthetic_packets`].

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use capture_core::{
    load_from_path, register_all, FieldId, FieldSink, Packet, ParserList, ProtocolFields, Registry, Session,
    SessionState, TcpEngine, UdpDispatcher,
};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Protocol-classification core demo")]
struct Cli {
    /// Path to the reassembly config TOML file
    #[arg(short, long, value_name = "FILE", default_value = "capture-cli/config/reassembly.toml")]
    config: PathBuf,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match load_from_path(&cli.config) {
        Ok(cfg) => {
            info!(max_tcp_out_of_order_packets = cfg.max_tcp_out_of_order_packets, "configuration loaded");
            cfg
        }
        Err(err) => {
            error!(%err, path = %cli.config.display(), "failed to load configuration, using defaults");
            capture_core::ReassemblyConfig::default()
        }
    };

    let field_names = Arena::new();
    let fields = ProtocolFields {
        user: field_names.id("user"),
        quic_host: field_names.id("quic.host"),
        quic_version: field_names.id("quic.version"),
        quic_user_agent: field_names.id("quic.user-agent"),
    };

    let mut registry: Registry<DemoSession> = Registry::new();
    if let Err(err) = register_all(&mut registry, &fields) {
        error!(%err, "failed to register protocol parsers");
        std::process::exit(1);
    }
    registry.seal();

    let tcp_engine = TcpEngine::new(config);
    let udp_dispatcher = UdpDispatcher::new();

    for flow in synthetic_packets() {
        let mut session = DemoSession::new(flow.addr1, flow.port1, flow.addr2, flow.port2, field_names.clone());
        for (mut packet, is_new_session) in flow.packets {
            match flow.transport {
                Transport::Tcp => {
                    if tcp_engine.pre_process(&mut session, &mut packet, is_new_session) {
                        continue;
                    }
                    tcp_engine.process(&mut session, &registry, &packet);
                }
                Transport::Udp => {
                    udp_dispatcher.pre_process(&mut session, &mut packet, is_new_session);
                    udp_dispatcher.process(&mut session, &registry, &packet);
                }
            }
        }
        session.log_summary();
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
}

/// Assigns stable [`FieldId`]s to field names, standing in for the
/// host-owned field registry spec §3.1 item 2 expects at startup.
#[derive(Clone, Default)]
struct Arena {
    next: std::rc::Rc<std::cell::Cell<u32>>,
    names: std::rc::Rc<std::cell::RefCell<HashMap<u32, &'static str>>>,
}

impl Arena {
    fn new() -> Self {
        Arena::default()
    }

    fn id(&self, name: &'static str) -> FieldId {
        let id = self.next.get();
        self.next.set(id + 1);
        self.names.borrow_mut().insert(id, name);
        FieldId(id)
    }

    fn name(&self, field: FieldId) -> &'static str {
        self.names.borrow().get(&field.0).copied().unwrap_or("unknown")
    }
}

enum Transport {
    Tcp,
    Udp,
}

struct SyntheticFlow {
    transport: Transport,
    addr1: IpAddr,
    port1: u16,
    addr2: IpAddr,
    port2: u16,
    packets: Vec<(Packet, bool)>,
}

/// A handful of hand-built packets exercising the happy path for a TCP
/// session (a POP3-looking greeting) and a UDP session (an MQTT CONNECT),
/// just enough to prove the wiring without a real capture source.
fn synthetic_packets() -> Vec<SyntheticFlow> {
    let client = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    let server = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    let tcp_flow = SyntheticFlow {
        transport: Transport::Tcp,
        addr1: client,
        port1: 54321,
        addr2: server,
        port2: 110,
        packets: vec![
            (tcp_packet(client, 54321, server, 110, 1000, 1, false, false, b""), true),
            (tcp_packet(server, 110, client, 54321, 1, 1001, true, true, b""), false),
            (tcp_packet(client, 54321, server, 110, 1001, 2, false, true, b""), false),
            (tcp_packet(client, 54321, server, 110, 1001, 2, false, false, b"+OK POP3 ready\r\n"), false),
        ],
    };

    let mqtt_payload: Vec<u8> = {
        let mut data = vec![0x10u8, 0x00];
        data.extend_from_slice(&4u16.to_be_bytes());
        data.extend_from_slice(b"MQTT");
        data.push(4);
        data.push(0x00);
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&[0, 0]);
        while data.len() < 30 {
            data.push(0);
        }
        data
    };
    let udp_flow = SyntheticFlow {
        transport: Transport::Udp,
        addr1: client,
        port1: 44000,
        addr2: server,
        port2: 1883,
        packets: vec![(udp_packet(client, 44000, server, 1883, &mqtt_payload), true)],
    };

    vec![tcp_flow, udp_flow]
}

#[allow(clippy::too_many_arguments)]
fn tcp_packet(
    src_addr: IpAddr,
    src_port: u16,
    dst_addr: IpAddr,
    dst_port: u16,
    seq: u32,
    ack: u32,
    syn: bool,
    ack_flag: bool,
    payload: &[u8],
) -> Packet {
    let mut header = vec![0u8; 20];
    header[0..2].copy_from_slice(&src_port.to_be_bytes());
    header[2..4].copy_from_slice(&dst_port.to_be_bytes());
    header[4..8].copy_from_slice(&seq.to_be_bytes());
    header[8..12].copy_from_slice(&ack.to_be_bytes());
    header[12] = 5 << 4; // data offset: 5 words, no options
    let mut flags = 0u8;
    if syn {
        flags |= 0x02;
    }
    if ack_flag {
        flags |= 0x10;
    }
    header[13] = flags;
    header[14..16].copy_from_slice(&1024u16.to_be_bytes()); // window

    let mut data = header;
    data.extend_from_slice(payload);
    let len = data.len();
    Packet::new(data, 0, len, src_addr, src_port, dst_addr, dst_port, 0)
}

fn udp_packet(src_addr: IpAddr, src_port: u16, dst_addr: IpAddr, dst_port: u16, payload: &[u8]) -> Packet {
    let data = payload.to_vec();
    let len = data.len();
    Packet::new(data, 0, len, src_addr, src_port, dst_addr, dst_port, 0)
}

/// Minimal [`Session`] that logs every emitted field/protocol/tag through
/// `tracing` instead of writing to a real field-indexed store.
struct DemoSession {
    state: SessionState,
    parsers: ParserList<DemoSession>,
    arena: Arena,
    protocols: Vec<&'static str>,
}

impl DemoSession {
    fn new(addr1: IpAddr, port1: u16, addr2: IpAddr, port2: u16, arena: Arena) -> Self {
        DemoSession {
            state: SessionState::new(addr1, port1, addr2, port2),
            parsers: ParserList::new(),
            arena,
            protocols: Vec::new(),
        }
    }

    fn log_summary(&self) {
        info!(addr1 = %self.state.addr1, port1 = self.state.port1, protocols = ?self.protocols, "session finished");
    }
}

impl FieldSink for DemoSession {
    fn emit_protocol(&mut self, name: &'static str) {
        if !self.protocols.contains(&name) {
            info!(protocol = name, "classified");
            self.protocols.push(name);
        }
    }

    fn emit_field_lowercase(&mut self, field: FieldId, bytes: &[u8]) {
        let value = String::from_utf8_lossy(bytes).to_lowercase();
        info!(field = self.arena.name(field), value, "field emitted");
    }

    fn emit_field(&mut self, field: FieldId, bytes: &[u8], _copy: bool) {
        let value = String::from_utf8_lossy(bytes).into_owned();
        info!(field = self.arena.name(field), value, "field emitted");
    }

    fn add_tag(&mut self, tag: &'static str) {
        info!(tag, "tag added");
    }

    fn mark_for_close(&mut self) {
        info!("session marked for close");
    }
}

impl Session for DemoSession {
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
