//! Mechanical classifiers (spec §4.6), translated byte-for-byte from the
//! reference implementation's `misc.c`. The large majority only ever tag
//! a protocol name on pattern or port match; a handful also pull a field
//! out of the matched bytes (RDP's mstshash cookie, a bare IRC-avoiding
//! `USER` command, MQTT's CONNECT username).

use std::any::Any;

use crate::error::Result;
use crate::field::{FieldId, FieldSink};
use crate::reader::Reader;
use crate::registry::{ClassifyFn, PatternTransport, PortTransport, Registry};
use crate::session::{Direction, Session};

use super::ProtocolFields;

fn memstr(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn slice_from(data: &[u8], start: usize) -> &[u8] {
    if start >= data.len() {
        &[]
    } else {
        &data[start..]
    }
}

/// `misc_add_protocol_classify`: userdata is the protocol name, nothing
/// else is inspected.
fn tag_classify<S: Session>(session: &mut S, _data: &[u8], _direction: Direction, userdata: &(dyn Any + Send + Sync)) {
    if let Some(name) = userdata.downcast_ref::<&'static str>() {
        session.emit_protocol(name);
    }
}

fn rdp_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, userdata: &(dyn Any + Send + Sync)) {
    let len = data.len();
    if !(len > 5 && (data[3] as usize) <= len && data[4] == data[3].wrapping_sub(5) && data[5] == 0xe0) {
        return;
    }
    session.emit_protocol("rdp");
    if len > 30 && slice_from(data, 11).starts_with(b"Cookie: mstshash=") {
        let rest = slice_from(data, 28);
        if let Some(idx) = rest.windows(2).position(|w| w == b"\r\n") {
            if let Some(field) = userdata.downcast_ref::<FieldId>() {
                session.emit_field_lowercase(*field, &rest[..idx]);
            }
        }
    }
}

fn imap_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if memstr(slice_from(data, 5), b"IMAP") {
        session.emit_protocol("imap");
    }
}

fn gh0st_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if data.len() < 15 {
        return;
    }
    let len = data.len();
    let windows_ok = data[8] == 0 && data[7] == 0 && (((data[6] as usize) << 8) | data[5] as usize) == len;
    let mac_ok = data[5] == 0 && data[6] == 0 && (((data[7] as usize) << 8) | data[8] as usize) == len;
    if data[13] == 0x78 && data[14] == 0x9c && (windows_ok || mac_ok) {
        session.emit_protocol("gh0st");
    }
    // Looser fallback kept verbatim alongside the strict check above — the
    // reference implementation runs both unconditionally and either can fire.
    if data[7] == 0 && data[8] == 0 && data[11] == 0 && data[12] == 0 && data[13] == 0x78 && data[14] == 0x9c {
        session.emit_protocol("gh0st");
    }
}

fn other220_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if memstr(data, b"LMTP") {
        session.emit_protocol("lmtp");
    } else if !memstr(data, b"SMTP") && !memstr(data, b" TLS") {
        session.emit_protocol("ftp");
    }
}

fn vnc_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if data.len() >= 12 && data[7] == b'.' && data[11] == 0x0a {
        session.emit_protocol("vnc");
    }
}

fn jabber_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if memstr(slice_from(data, 5), b"jabber") {
        session.emit_protocol("jabber");
    }
}

/// Fires only on a bare `USER ` not accompanied by IRC's `NICK`/`+iw`
/// chatter, so plain FTP/POP-ish `USER` commands aren't misread as IRC.
fn user_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, userdata: &(dyn Any + Send + Sync)) {
    let len = data.len();
    if len <= 5 || memstr(data, b"\nNICK ") || memstr(data, b" +iw ") {
        return;
    }
    let mut end = len;
    for (i, b) in data.iter().enumerate().skip(5) {
        if b.is_ascii_whitespace() {
            end = i;
            break;
        }
    }
    if let Some(field) = userdata.downcast_ref::<FieldId>() {
        session.emit_field_lowercase(*field, &data[5..end]);
    }
}

fn ntp_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    let (p1, p2) = {
        let state = session.state();
        (state.port1, state.port2)
    };
    if (p1 != 123 && p2 != 123) || data.len() < 48 || data[1] > 16 {
        return;
    }
    session.emit_protocol("ntp");
}

fn syslog_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    for &b in data.iter().skip(2) {
        if b == b'>' {
            session.emit_protocol("syslog");
            return;
        }
        if !b.is_ascii_digit() {
            return;
        }
    }
}

fn stun_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    let len = data.len();
    if len < 20 || 20 + data[3] as usize != len {
        return;
    }
    if &data[4..8] == b"\x21\x12\xa4\x42" {
        session.emit_protocol("stun");
        return;
    }
    // Odd length-derived check, preserved verbatim — see DESIGN.md.
    if data[1] == 1 && len > 25 && data[23] as usize + 24 == len {
        session.emit_protocol("stun");
    }
}

fn stun_rsp_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if memstr(slice_from(data, 7), b"STUN") {
        session.emit_protocol("stun");
    }
}

fn flap_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    let len = data.len();
    if len < 6 {
        return;
    }
    let flen = 6 + (((data[4] as usize) << 8) | data[5] as usize);
    if len < flen {
        return;
    }
    if len == flen || data[flen] == b'*' {
        session.emit_protocol("flap");
    }
}

fn tacacs_classify<S: Session>(session: &mut S, _data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    let state = session.state();
    if state.port1 == 49 || state.port2 == 49 {
        session.emit_protocol("tacacs");
    }
}

fn dropbox_lan_sync_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if memstr(slice_from(data, 1), b"host_int") {
        session.emit_protocol("dropbox-lan-sync");
    }
}

fn kafka_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    let len = data.len();
    if len < 10 || data[4] != 0 || data[5] > 6 || data[7] != 0 {
        return;
    }
    let flen = 4 + (((data[2] as usize) << 8) | data[3] as usize);
    if len != flen {
        return;
    }
    session.emit_protocol("kafka");
}

fn thrift_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if data.len() > 20 && data[4] == 0x80 && data[5] == 0x01 && data[6] == 0 {
        session.emit_protocol("thrift");
    }
}

fn rip_classify<S: Session>(session: &mut S, _data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    let state = session.state();
    if state.port1 == 520 || state.port2 == 520 {
        session.emit_protocol("rip");
    }
}

fn isakmp_udp_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if data.len() < 18 {
        return;
    }
    let doi_ok = matches!(data[16], 1 | 8 | 33 | 46);
    // 0x02 is a version-byte quirk preserved verbatim alongside the
    // documented 0x10/0x20 exchange-type values — see DESIGN.md.
    let exchange_ok = matches!(data[17], 0x10 | 0x20 | 0x02);
    if doi_ok && exchange_ok {
        session.emit_protocol("isakmp");
    }
}

fn aruba_papi_udp_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if data.len() >= 20 && data[0] == 0x49 && data[1] == 0x72 {
        session.emit_protocol("aruba-papi");
    }
}

fn sccp_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    let len = data.len();
    if len > 20 && len >= data[0] as usize + 8 && data[1..8] == [0, 0, 0, 0, 0, 0, 0] {
        session.emit_protocol("sccp");
    }
}

fn wudo_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if data.len() < 15 {
        return;
    }
    if &data[0..4] == b"\x00\x00\x00\x00" {
        session.emit_protocol("wudo");
    } else if &data[0..15] == b"\x0eSwarm protocol" {
        session.emit_protocol("wudo");
    }
}

fn mqtt_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, userdata: &(dyn Any + Send + Sync)) {
    if data.len() < 30 || &data[4..6] != b"MQ" {
        return;
    }
    session.emit_protocol("mqtt");

    let mut r = Reader::new(data);
    r.skip(2);
    let name_len = r.u16_be() as usize;
    r.skip(name_len);
    r.skip(1); // protocol version
    let flags = r.u8();
    r.skip(2); // keep-alive
    let id_len = r.u16_be() as usize;
    r.skip(id_len);

    if flags & 0x04 != 0 {
        let will_topic_len = r.u16_be() as usize;
        r.skip(will_topic_len);
        let will_message_len = r.u16_be() as usize;
        r.skip(will_message_len);
    }

    if flags & 0x80 != 0 {
        let user_len = r.u16_be() as usize;
        let user = r.peek_ptr(user_len);
        if !r.error() {
            if let Some(field) = userdata.downcast_ref::<FieldId>() {
                session.emit_field_lowercase(*field, user);
            }
        }
    }
}

fn hdfs_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if data.len() >= 10 && data[5] == 0x0a {
        session.emit_protocol("hdfs");
    }
}

fn hsrp_udp_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    let state = session.state();
    if state.port1 != state.port2 || data.len() < 3 {
        return;
    }
    if data[0] == 0 && data[1] == 3 {
        session.emit_protocol("hsrp");
    } else if data[0] == 1 && data[1] == 40 && data[2] == 2 {
        session.emit_protocol("hsrpv2");
    }
}

fn safet_udp_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if data.len() >= 24 && data[2] as usize == data.len() {
        session.emit_protocol("safet");
    }
}

fn telnet_tcp_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    if data.len() >= 3 && data[0] == 0xff && data[1] >= 0xfa {
        session.emit_protocol("telnet");
    }
}

fn netflow_classify<S: Session>(session: &mut S, data: &[u8], _direction: Direction, _userdata: &(dyn Any + Send + Sync)) {
    let (p1, p2) = {
        let state = session.state();
        (state.port1, state.port2)
    };
    let len = data.len();
    if p1 == 53 || p2 == 53 || len < 24 {
        return;
    }
    let mut r = Reader::new(data);
    r.skip(2); // version
    let count = r.u16_be() as usize;
    r.skip(4); // sys_uptime
    let systime = r.u32_be();
    if count == 0 || count > 200 || count * 16 > len || systime < 1_000_000_000 {
        return;
    }
    session.emit_protocol("netflow");
}

fn register_tag<S: Session>(
    registry: &mut Registry<S>,
    name: &'static str,
    transport: PatternTransport,
    offset: usize,
    pattern: &[u8],
) -> Result<()> {
    registry.register_pattern(name, transport, offset, pattern.to_vec(), tag_classify, Box::new(name))
}

fn register_tag_both<S: Session>(registry: &mut Registry<S>, name: &'static str, offset: usize, pattern: &[u8]) -> Result<()> {
    register_tag(registry, name, PatternTransport::Tcp, offset, pattern)?;
    register_tag(registry, name, PatternTransport::Udp, offset, pattern)
}

fn register_fn<S: Session>(
    registry: &mut Registry<S>,
    name: &'static str,
    transport: PatternTransport,
    offset: usize,
    pattern: &[u8],
    classify: ClassifyFn<S>,
) -> Result<()> {
    registry.register_pattern(name, transport, offset, pattern.to_vec(), classify, Box::new(()))
}

pub fn register<S: Session>(registry: &mut Registry<S>, fields: &ProtocolFields) -> Result<()> {
    register_tag(registry, "bittorrent", PatternTransport::Tcp, 0, b"\x13BitTorrent protocol")?;
    register_tag(registry, "bittorrent", PatternTransport::Tcp, 0, b"BSYNC\x00")?;
    register_tag(registry, "bittorrent", PatternTransport::Udp, 0, b"d1:a")?;
    register_tag(registry, "bittorrent", PatternTransport::Udp, 0, b"d1:r")?;
    register_tag(registry, "bittorrent", PatternTransport::Udp, 0, b"d1:q")?;

    register_tag(registry, "bitcoin", PatternTransport::Tcp, 0, b"\xf9\xbe\xb4\xd9")?;
    register_tag(registry, "bitcoin", PatternTransport::Tcp, 0, b"\xf9\xbe\xb4\xfe")?;

    registry.register_pattern(
        "rdp",
        PatternTransport::Tcp,
        0,
        b"\x03\x00".to_vec(),
        rdp_classify,
        Box::new(fields.user),
    )?;
    register_fn(registry, "imap", PatternTransport::Tcp, 0, b"* OK ", imap_classify)?;
    register_tag(registry, "pop3", PatternTransport::Tcp, 0, b"+OK ")?;
    register_fn(registry, "gh0st", PatternTransport::Tcp, 13, b"\x78", gh0st_classify)?;
    register_fn(registry, "other220", PatternTransport::Tcp, 0, b"220 ", other220_classify)?;
    register_fn(registry, "vnc", PatternTransport::Tcp, 0, b"RFB 0", vnc_classify)?;

    register_tag(registry, "redis", PatternTransport::Tcp, 0, b"+PONG")?;
    register_tag(registry, "redis", PatternTransport::Tcp, 0, b"\x2a\x31\x0d\x0a\x24")?;
    register_tag(registry, "redis", PatternTransport::Tcp, 0, b"\x2a\x32\x0d\x0a\x24")?;
    register_tag(registry, "redis", PatternTransport::Tcp, 0, b"\x2a\x33\x0d\x0a\x24")?;
    register_tag(registry, "redis", PatternTransport::Tcp, 0, b"\x2a\x34\x0d\x0a\x24")?;
    register_tag(registry, "redis", PatternTransport::Tcp, 0, b"\x2a\x35\x0d\x0a\x24")?;
    register_tag(registry, "redis", PatternTransport::Tcp, 0, b"-NOAUTH ")?;

    register_fn(registry, "mongo", PatternTransport::Tcp, 8, b"\x00\x00\x00\x00\xd4\x07\x00\x00", tag_classify)?;
    register_fn(registry, "mongo", PatternTransport::Tcp, 8, b"\xff\xff\xff\xff\xd4\x07\x00\x00", tag_classify)?;

    register_tag_both(registry, "sip", 0, b"SIP/2.0")?;
    register_tag_both(registry, "sip", 0, b"REGISTER sip:")?;
    register_tag_both(registry, "sip", 0, b"NOTIFY sip:")?;

    register_fn(registry, "jabber", PatternTransport::Tcp, 0, b"<?xml", jabber_classify)?;

    registry.register_pattern(
        "user",
        PatternTransport::Tcp,
        0,
        b"USER ".to_vec(),
        user_classify,
        Box::new(fields.user),
    )?;

    register_tag(registry, "thrift", PatternTransport::Tcp, 0, b"\x80\x01\x00\x01\x00\x00\x00")?;
    register_fn(registry, "thrift", PatternTransport::Tcp, 0, b"\x00\x00", thrift_classify)?;

    register_tag(registry, "aerospike", PatternTransport::Tcp, 0, b"\x02\x01\x00\x00\x00\x00\x00\x4e\x6e\x6f\x64\x65")?;
    register_tag(registry, "aerospike", PatternTransport::Tcp, 0, b"\x02\x01\x00\x00\x00\x00\x00\x23\x6e\x6f\x64\x65")?;

    register_tag(registry, "cassandra", PatternTransport::Tcp, 0, b"\x00\x00\x00\x25\x80\x01\x00\x01\x00\x00\x00\x0c\x73\x65\x74\x5f")?;
    register_tag(registry, "cassandra", PatternTransport::Tcp, 0, b"\x00\x00\x00\x1d\x80\x01\x00\x01\x00\x00\x00\x10\x64\x65\x73\x63")?;

    for byte in [0x13u8, 0x19, 0x1a, 0x1b, 0x1c, 0x21, 0x23, 0x24, 0xd9, 0xdb, 0xe3] {
        register_fn(registry, "ntp", PatternTransport::Udp, 0, &[byte], ntp_classify)?;
    }

    register_tag(registry, "bjnp", PatternTransport::Udp, 0, b"BJNP")?;

    for digit in b'1'..=b'9' {
        register_fn(registry, "syslog", PatternTransport::Tcp, 0, &[b'<', digit], syslog_classify)?;
        register_fn(registry, "syslog", PatternTransport::Udp, 0, &[b'<', digit], syslog_classify)?;
    }

    register_fn(registry, "stun", PatternTransport::Tcp, 0, b"RSP/", stun_rsp_classify)?;
    register_fn(registry, "stun", PatternTransport::Udp, 0, b"RSP/", stun_rsp_classify)?;
    register_fn(registry, "stun", PatternTransport::Udp, 0, b"\x00\x01\x00", stun_classify)?;
    register_fn(registry, "stun", PatternTransport::Udp, 0, b"\x00\x03\x00", stun_classify)?;
    register_fn(registry, "stun", PatternTransport::Udp, 0, b"\x01\x01\x00", stun_classify)?;

    register_fn(registry, "flap", PatternTransport::Tcp, 0, b"\x2a\x01", flap_classify)?;

    register_tag(registry, "nsclient", PatternTransport::Tcp, 0, b"NSClient")?;
    register_tag(registry, "nsclient", PatternTransport::Tcp, 0, b"None&")?;

    register_tag(registry, "ssdp", PatternTransport::Udp, 0, b"M-SEARCH ")?;
    register_tag(registry, "ssdp", PatternTransport::Udp, 0, b"NOTIFY * ")?;

    register_tag(registry, "zabbix", PatternTransport::Tcp, 0, b"ZBXD\x01")?;

    register_tag(registry, "rmi", PatternTransport::Tcp, 0, b"\x4a\x52\x4d\x49\x00\x02\x4b")?;
    register_tag(registry, "rmi", PatternTransport::Tcp, 0, b"JRMI\x00")?;

    for pattern in [
        b"\xc0\x01\x01".as_slice(),
        b"\xc0\x01\x02",
        b"\xc0\x02\x01",
        b"\xc0\x03\x01",
        b"\xc0\x03\x02",
        b"\xc1\x01\x01",
        b"\xc1\x01\x02",
    ] {
        register_fn(registry, "tacacs", PatternTransport::Tcp, 0, pattern, tacacs_classify)?;
        register_fn(registry, "tacacs", PatternTransport::Udp, 0, pattern, tacacs_classify)?;
    }

    register_tag(registry, "flash-policy", PatternTransport::Tcp, 0, b"<policy-file-request/>")?;

    registry.register_port("dropbox-lan-sync", PortTransport::UdpPort, 17500, dropbox_lan_sync_classify, Box::new(()))?;

    register_fn(registry, "kafka", PatternTransport::Tcp, 0, b"\x00\x00", kafka_classify)?;

    register_tag(registry, "steam-friends", PatternTransport::Udp, 0, b"VS01")?;
    register_tag(registry, "valve-a2s", PatternTransport::Udp, 0, b"\xff\xff\xff\xff\x54\x53\x6f\x75")?;
    register_tag(registry, "stream-ihscp", PatternTransport::Tcp, 0, b"\xa4\x00\x00\x00\x56\x54\x30\x31")?;

    register_tag(registry, "honeywell-tcc", PatternTransport::Tcp, 0, b"\x43\x42\x4b\x50\x50\x52\x05\x50")?;

    register_tag(registry, "pjl", PatternTransport::Tcp, 0, b"\x1b\x25\x2d\x31\x32\x33\x34\x35")?;
    register_tag(registry, "pjl", PatternTransport::Tcp, 0, b"\x40\x50\x4a\x4c\x20")?;

    register_tag(registry, "dcerpc", PatternTransport::Tcp, 0, b"\x05\x00\x0b")?;

    register_fn(registry, "rip", PatternTransport::Udp, 0, b"\x01\x01\x00\x00", rip_classify)?;
    register_fn(registry, "rip", PatternTransport::Udp, 0, b"\x01\x02\x00\x00", rip_classify)?;
    register_fn(registry, "rip", PatternTransport::Udp, 0, b"\x02\x01\x00\x00", rip_classify)?;
    register_fn(registry, "rip", PatternTransport::Udp, 0, b"\x02\x02\x00\x00", rip_classify)?;

    register_tag(registry, "nzsql", PatternTransport::Tcp, 0, b"\x00\x00\x00\x08\x00\x01\x00\x03")?;

    register_tag(registry, "splunk", PatternTransport::Tcp, 0, b"--splunk-cooked-mode")?;
    register_fn(registry, "splunk-replication", PatternTransport::Tcp, 6, b"\x00\x06\x00\x00\x00\x05_raw", tag_classify)?;

    registry.register_port("isakmp", PortTransport::UdpPort, 500, isakmp_udp_classify, Box::new(()))?;
    registry.register_port("isakmp", PortTransport::UdpPort, 4500, isakmp_udp_classify, Box::new(()))?;

    registry.register_port("aruba-papi", PortTransport::UdpPort, 8211, aruba_papi_udp_classify, Box::new(()))?;

    register_tag(registry, "x11", PatternTransport::Tcp, 0, b"\x6c\x00\x0b\x00")?;

    register_tag(registry, "memcached", PatternTransport::Tcp, 0, b"flush_all")?;
    register_tag(registry, "memcached", PatternTransport::Tcp, 0, b"STORED\r\n")?;
    register_tag(registry, "memcached", PatternTransport::Tcp, 0, b"END\r\n")?;
    register_tag(registry, "memcached", PatternTransport::Tcp, 0, b"VALUE ")?;
    register_fn(registry, "memcached", PatternTransport::Udp, 6, b"\x00\x00stats", tag_classify)?;
    register_fn(registry, "memcached", PatternTransport::Udp, 6, b"\x00\x00gets ", tag_classify)?;

    register_fn(registry, "netflow", PatternTransport::Udp, 0, b"\x00\x05", netflow_classify)?;
    register_fn(registry, "netflow", PatternTransport::Udp, 0, b"\x00\x07", netflow_classify)?;
    register_fn(registry, "netflow", PatternTransport::Udp, 0, b"\x00\x09", netflow_classify)?;

    register_tag(registry, "hbase", PatternTransport::Tcp, 0, b"HBas\x00")?;
    register_tag(registry, "hadoop", PatternTransport::Tcp, 0, b"hrpc\x09")?;

    register_fn(registry, "hdfs", PatternTransport::Tcp, 0, b"\x00\x1c\x50", hdfs_classify)?;
    register_fn(registry, "hdfs", PatternTransport::Tcp, 0, b"\x00\x1c\x51", hdfs_classify)?;
    register_fn(registry, "hdfs", PatternTransport::Tcp, 0, b"\x00\x1c\x55", hdfs_classify)?;

    register_tag(registry, "zookeeper", PatternTransport::Tcp, 0, b"zk_version")?;
    register_tag(registry, "zookeeper", PatternTransport::Tcp, 0, b"mntr\n")?;
    register_tag(registry, "zookeeper", PatternTransport::Tcp, 0, b"\x00\x00\x00\x2c\x00\x00\x00\x00")?;
    register_tag(registry, "zookeeper", PatternTransport::Tcp, 0, b"\x00\x00\x00\x2d\x00\x00\x00\x00")?;

    registry.register_port("sccp", PortTransport::TcpDstPort, 2000, sccp_classify, Box::new(()))?;
    registry.register_port("wudo", PortTransport::TcpDstPort, 7680, wudo_classify, Box::new(()))?;

    registry.register_pattern(
        "mqtt",
        PatternTransport::Tcp,
        0,
        b"\x10".to_vec(),
        mqtt_classify,
        Box::new(fields.user),
    )?;

    registry.register_port("hsrp", PortTransport::UdpPort, 1985, hsrp_udp_classify, Box::new(()))?;
    registry.register_port("hsrp", PortTransport::UdpPort, 2029, hsrp_udp_classify, Box::new(()))?;

    register_tag(registry, "elasticsearch", PatternTransport::Tcp, 0, b"ES\x00\x00")?;

    registry.register_port("safet", PortTransport::UdpPort, 23294, safet_udp_classify, Box::new(()))?;
    registry.register_port("telnet", PortTransport::TcpDstPort, 23, telnet_tcp_classify, Box::new(()))?;
    registry.register_port("whois", PortTransport::TcpDstPort, 43, tag_classify, Box::new("whois"))?;
    registry.register_port("finger", PortTransport::TcpDstPort, 79, tag_classify, Box::new("finger"))?;

    register_tag(registry, "rtsp", PatternTransport::Tcp, 0, b"RTSP/1.0 ")?;

    register_tag_both(registry, "dnp3", 0, b"\x05\x64")?;

    Ok(())
}
