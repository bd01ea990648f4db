//! Protocol parsers (spec §4.6): classifiers that run on the first bytes
//! of a TCP session or a UDP datagram, registered once at startup through
//! [`register_all`]. Two tiers, matching the reference implementation's
//! own split between `misc.c` (mechanical byte-pattern classifiers, most
//! of which just tag a protocol name) and `quic.c` (a handful of
//! classifiers that do real decoding — QUIC header decryption and
//! CRYPTO-frame reassembly in particular).

pub mod misc;
pub mod quic;

use crate::error::Result;
use crate::field::FieldId;
use crate::registry::Registry;
use crate::session::Session;

/// Field ids the protocol parsers write into, obtained by the host at
/// startup (spec §3.1 item 2) and handed back here so classifiers can
/// carry them on registration userdata.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolFields {
    /// Shared `user` field: RDP cookie hash, IRC/FTP-ish bare `USER`
    /// command, MQTT CONNECT username.
    pub user: FieldId,
    /// SNI host extracted from a decrypted QUIC Initial's TLS ClientHello.
    pub quic_host: FieldId,
    /// QUIC version number (from the long header), recorded once a
    /// session's Initial packet decrypts successfully.
    pub quic_version: FieldId,
    /// User-agent string carried in legacy Google QUIC's CHLO `UAID` tag.
    /// Real TLS ClientHellos have no equivalent, so the IETF Initial path
    /// never populates this field — see DESIGN.md.
    pub quic_user_agent: FieldId,
}

/// Registers every protocol parser this crate ships with. Call once at
/// startup, before [`Registry::seal`].
pub fn register_all<S: Session>(registry: &mut Registry<S>, fields: &ProtocolFields) -> Result<()> {
    misc::register(registry, fields)?;
    quic::register(registry, fields)?;
    Ok(())
}
