//! Crypto primitives façade (spec §2 item 9): HKDF-SHA-256,
//! AES-128-ECB single block, AES-128-GCM, HMAC-SHA-256. A thin adapter
//! over RustCrypto crates — no primitive is implemented from scratch
//! here, matching the teacher's own preference for vetted crates over
//! hand-rolled cryptography.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes128;
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes128Gcm, KeyInit as GcmKeyInit, Nonce};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// `HKDF-Extract(salt, ikm) -> PRK` (RFC 5869 §2.2), fixed to SHA-256.
pub fn hkdf_extract(salt: &[u8], ikm: &[u8]) -> [u8; 32] {
    let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), ikm);
    prk.into()
}

/// `HKDF-Expand-Label(secret, label, len)` (RFC 8446 §7.1), with an
/// empty context — the subset QUIC's key schedule actually uses. The
/// label is prefixed with `"tls13 "` and wrapped in the `HkdfLabel`
/// structure TLS 1.3 defines (2-byte length, 1-byte label length +
/// label, 1-byte empty context length).
pub fn hkdf_expand_label(secret: &[u8], label: &str, out_len: usize) -> Vec<u8> {
    let full_label = format!("tls13 {label}");
    let mut info = Vec::with_capacity(2 + 1 + full_label.len() + 1);
    info.extend_from_slice(&(out_len as u16).to_be_bytes());
    info.push(full_label.len() as u8);
    info.extend_from_slice(full_label.as_bytes());
    info.push(0); // empty context

    let hk = Hkdf::<Sha256>::from_prk(secret).expect("secret length valid for HKDF-SHA-256");
    let mut out = vec![0u8; out_len];
    hk.expand(&info, &mut out)
        .expect("requested output length within HKDF-SHA-256's 255*32-byte limit");
    out
}

/// Single-block AES-128-ECB encryption, used for QUIC header protection
/// sampling (spec §4.6 step 7). `key` and `block` must both be 16 bytes.
pub fn aes128_ecb_encrypt_block(key: &[u8], block: &[u8]) -> Option<[u8; 16]> {
    if key.len() != 16 || block.len() != 16 {
        return None;
    }
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut buf = GenericArray::clone_from_slice(block);
    cipher.encrypt_block(&mut buf);
    Some(buf.into())
}

/// AES-128-GCM decrypt with a 16-byte authentication tag appended to
/// `ciphertext_and_tag` (spec §4.6 step 11). Returns `None` on any
/// authentication or length failure — callers must abandon the
/// datagram, never panic (spec §4.8).
pub fn aes128_gcm_decrypt(key: &[u8], nonce: &[u8], aad: &[u8], ciphertext_and_tag: &[u8]) -> Option<Vec<u8>> {
    if key.len() != 16 || nonce.len() != 12 {
        return None;
    }
    let cipher = Aes128Gcm::new(GenericArray::from_slice(key));
    let nonce = Nonce::from_slice(nonce);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext_and_tag,
                aad,
            },
        )
        .ok()
}

/// HMAC-SHA-256 over `data` keyed by `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}
