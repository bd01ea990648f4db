//! S5 (spec §8): a single IETF QUIC Initial datagram, built and encrypted
//! by this test with the crate's own crypto primitives rather than a
//! transcribed external test vector, decrypts to a ClientHello whose SNI
//! extension populates `quic.host`, with `quic.version` also set.

#[path = "support/mod.rs"]
mod support;

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes128Gcm, KeyInit, Nonce};

use capture_core::crypto::{aes128_ecb_encrypt_block, hkdf_expand_label, hkdf_extract};
use capture_core::field::FieldId;
use capture_core::protocols::ProtocolFields;
use capture_core::registry::Registry;
use support::RecordingSession;

// RFC 9001 §5.2: the version-independent salt used to derive Initial
// secrets from a connection's destination CID.
const INITIAL_SALT: [u8; 20] = [
    0x38, 0x76, 0x2c, 0xf7, 0xf5, 0x59, 0x34, 0xb3, 0x4d, 0x17, 0x9a, 0xe6, 0xa4, 0xc8, 0x0c, 0xad, 0xcc, 0xbb, 0x7f,
    0x0a,
];

fn fields() -> ProtocolFields {
    ProtocolFields {
        user: FieldId(1),
        quic_host: FieldId(2),
        quic_version: FieldId(3),
        quic_user_agent: FieldId(4),
    }
}

fn client_hello_with_sni(host: &[u8]) -> Vec<u8> {
    let mut sni_ext = Vec::new();
    sni_ext.extend_from_slice(&((host.len() + 3) as u16).to_be_bytes());
    sni_ext.push(0); // name_type: host_name
    sni_ext.extend_from_slice(&(host.len() as u16).to_be_bytes());
    sni_ext.extend_from_slice(host);

    let mut extensions = Vec::new();
    extensions.extend_from_slice(&0u16.to_be_bytes()); // extension type 0: server_name
    extensions.extend_from_slice(&(sni_ext.len() as u16).to_be_bytes());
    extensions.extend_from_slice(&sni_ext);

    let mut body = Vec::new();
    body.extend_from_slice(&[0u8; 2]); // legacy_version
    body.extend_from_slice(&[0u8; 32]); // random
    body.push(0); // session_id_len
    body.extend_from_slice(&0u16.to_be_bytes()); // cipher_suites_len
    body.push(1); // compression_methods_len
    body.push(0); // compression_methods: null
    body.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
    body.extend_from_slice(&extensions);

    let mut msg = vec![1u8]; // handshake type: client_hello
    let len = body.len() as u32;
    msg.push((len >> 16) as u8);
    msg.push((len >> 8) as u8);
    msg.push(len as u8);
    msg.extend_from_slice(&body);
    msg
}

fn encode_varint(value: u64) -> Vec<u8> {
    if value <= 0x3f {
        vec![value as u8]
    } else if value <= 0x3fff {
        vec![0x40 | ((value >> 8) as u8), (value & 0xff) as u8]
    } else {
        panic!("test helper only encodes 1- or 2-byte varints");
    }
}

/// Wraps `chlo` in a single CRYPTO frame at offset 0, then pads with
/// PADDING(0x00) frames until the plaintext reaches `total_len`.
fn crypto_frame_plaintext(chlo: &[u8], total_len: usize) -> Vec<u8> {
    let mut plaintext = vec![6u8];
    plaintext.extend_from_slice(&encode_varint(0)); // offset
    plaintext.extend_from_slice(&encode_varint(chlo.len() as u64));
    plaintext.extend_from_slice(chlo);
    assert!(plaintext.len() <= total_len);
    plaintext.resize(total_len, 0);
    plaintext
}

/// Builds a full protected IETF Initial datagram around `plaintext`,
/// performing the same derivation, AEAD seal, and header protection steps
/// `decrypt_initial` inverts (spec §4.6).
fn build_initial_datagram(dcid: &[u8; 8], plaintext: &[u8]) -> Vec<u8> {
    let prk = hkdf_extract(&INITIAL_SALT, dcid);
    let client_secret = hkdf_expand_label(&prk, "client in", 32);
    let hp_key = hkdf_expand_label(&client_secret, "quic hp", 16);
    let key = hkdf_expand_label(&client_secret, "quic key", 16);
    let iv = hkdf_expand_label(&client_secret, "quic iv", 12);

    let pn_length = 2usize;
    let pn: u64 = 1;

    let mut header = Vec::new();
    header.push(0xc1); // long header, fixed bit, Initial (type 00), pn_length - 1 = 1
    header.extend_from_slice(&1u32.to_be_bytes()); // QUIC version 1
    header.push(dcid.len() as u8);
    header.extend_from_slice(dcid);
    header.push(0); // scid_len = 0
    header.push(0x00); // token_len varint = 0

    let packet_len = pn_length + plaintext.len() + 16; // pn + ciphertext + GCM tag
    assert!(packet_len < (1 << 14), "test helper only encodes a 2-byte length varint");
    header.push(0x40 | ((packet_len >> 8) as u8));
    header.push((packet_len & 0xff) as u8);
    header.extend_from_slice(&(pn as u16).to_be_bytes());

    let mut nonce = [0u8; 12];
    nonce.copy_from_slice(&iv);
    nonce[10] ^= ((pn >> 8) & 0xff) as u8;
    nonce[11] ^= (pn & 0xff) as u8;

    let cipher = Aes128Gcm::new_from_slice(&key).unwrap();
    let ciphertext_and_tag = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &header,
            },
        )
        .unwrap();

    // Sample is 16 bytes starting 4 bytes into the (always-assumed-4-byte)
    // packet-number field, i.e. 2 bytes into the ciphertext for our
    // 2-byte `pn_length` (RFC 9001 §5.4.2).
    let sample = &ciphertext_and_tag[2..18];
    let mask = aes128_ecb_encrypt_block(&hp_key, sample).unwrap();

    header[0] ^= mask[0] & 0x0f;
    let pn_offset = header.len() - pn_length;
    for i in 0..pn_length {
        header[pn_offset + i] ^= mask[i + 1];
    }

    let mut datagram = header;
    datagram.extend_from_slice(&ciphertext_and_tag);
    datagram
}

#[test]
fn s5_quic_initial_decrypts_sni_and_version() {
    let fields = fields();
    let mut registry: Registry<RecordingSession> = Registry::new();
    capture_core::register_all(&mut registry, &fields).unwrap();
    registry.seal();

    let chlo = client_hello_with_sni(b"example.com");
    let plaintext = crypto_frame_plaintext(&chlo, 1168);
    let dcid = [0xaa; 8];
    let datagram = build_initial_datagram(&dcid, &plaintext);
    assert!((1200..3000).contains(&datagram.len()), "datagram len {} out of classifier range", datagram.len());
    assert_eq!(datagram[0] & 0xf0, 0xc0);

    let mut session = RecordingSession::new();
    registry.match_udp(&mut session, &datagram, 0, session.state.port1, session.state.port2);

    assert!(session.has_protocol("quic"));
    let host = session.field_value(fields.quic_host).expect("quic.host emitted");
    assert_eq!(host, b"example.com");
    let version = session.field_value(fields.quic_version).expect("quic.version emitted");
    assert_eq!(version, b"0x00000001");
}
