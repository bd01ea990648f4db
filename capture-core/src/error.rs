use thiserror::Error;

/// Errors that can occur at the edges of the core: configuration and
/// registry setup. The hot packet/datagram path never returns `Result`:
/// see [`crate::tcp::TcpEngine::process`] and
/// [`crate::udp::UdpDispatcher::process`], which report outcomes via
/// plain booleans per the failure semantics in the design notes.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("field {0:?} is already registered")]
    DuplicateField(String),

    #[error("unknown field id: {0:?}")]
    UnknownField(String),

    #[error("classifier registry is sealed; no more registrations accepted")]
    RegistrySealed,
}

pub type Result<T> = std::result::Result<T, CoreError>;
