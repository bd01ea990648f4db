//! Classifier registry (spec §4.2, §3.5). Maps `(transport, byte-pattern-
//! at-offset)` and `(transport, port)` triggers to classifier callbacks.
//! Written once at startup and read-only during steady state (spec §5) —
//! [`Registry::seal`] marks that transition; registration after sealing
//! is a [`CoreError::RegistrySealed`].

mod pattern;
mod port;

pub use pattern::{PatternRule, PatternTransport};
pub use port::{PortRule, PortTransport};

use std::any::Any;

use crate::error::{CoreError, Result};
use crate::session::{Direction, Session};

/// `classify_fn` from spec §3.5: `(session, first_data_bytes, direction,
/// registration_userdata) -> ()`. May call `emit_protocol`, `emit_field*`,
/// or register a per-session parser via [`Session::parsers_mut`].
pub type ClassifyFn<S> = fn(session: &mut S, first_bytes: &[u8], direction: Direction, userdata: &(dyn Any + Send + Sync));

/// The process-wide classifier registry.
///
/// Deliberately *not* generic over thread-safety primitives: spec §5
/// states this table is built once before any worker starts and is
/// read-only thereafter, so plain `Vec`s suffice — no `RwLock`, no
/// `Arc` needed internally. A host wraps the whole registry in an `Arc`
/// if it wants to share one across worker threads.
pub struct Registry<S> {
    patterns: Vec<PatternRule<S>>,
    ports: Vec<PortRule<S>>,
    sealed: bool,
}

impl<S: Session> Default for Registry<S> {
    fn default() -> Self {
        Registry {
            patterns: Vec::new(),
            ports: Vec::new(),
            sealed: false,
        }
    }
}

impl<S: Session> Registry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pattern classifier. `offset + pattern.len()` bytes
    /// must be present in a session/datagram's first bytes for
    /// `classify_fn` to fire (spec §3.5).
    pub fn register_pattern(
        &mut self,
        name: &'static str,
        transport: PatternTransport,
        offset: usize,
        pattern: Vec<u8>,
        classify: ClassifyFn<S>,
        userdata: Box<dyn Any + Send + Sync>,
    ) -> Result<()> {
        if self.sealed {
            return Err(CoreError::RegistrySealed);
        }
        tracing::trace!(name, transport = ?transport, offset, len = pattern.len(), "register_tcp_or_udp_pattern");
        self.patterns.push(PatternRule {
            name,
            transport,
            offset,
            pattern,
            classify,
            userdata,
        });
        Ok(())
    }

    /// Registers a port classifier (spec §3.5, §6.2 `register_port`).
    pub fn register_port(
        &mut self,
        name: &'static str,
        transport: PortTransport,
        port: u16,
        classify: ClassifyFn<S>,
        userdata: Box<dyn Any + Send + Sync>,
    ) -> Result<()> {
        if self.sealed {
            return Err(CoreError::RegistrySealed);
        }
        tracing::trace!(name, transport = ?transport, port, "register_port");
        self.ports.push(PortRule {
            name,
            transport,
            port,
            classify,
            userdata,
        });
        Ok(())
    }

    /// Freezes the registry. Called once, after all startup registration
    /// is done and before any worker begins processing packets.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Runs every matching pattern and port classifier for TCP first
    /// bytes in `direction`, in registration order (spec §4.2: "Ordering
    /// of match execution ... registration order", and §9: classifiers
    /// with shared prefixes MUST NOT be de-duplicated before dispatch).
    pub fn match_tcp(
        &self,
        session: &mut S,
        first_bytes: &[u8],
        direction: Direction,
        port1: u16,
        port2: u16,
    ) {
        for rule in &self.patterns {
            if rule.transport == PatternTransport::Tcp && rule.matches(first_bytes) {
                (rule.classify)(session, first_bytes, direction, rule.userdata.as_ref());
            }
        }
        for rule in &self.ports {
            if rule.matches_tcp_endpoints(port1, port2, direction) {
                (rule.classify)(session, first_bytes, direction, rule.userdata.as_ref());
            }
        }
    }

    /// Runs every matching port and pattern classifier for one UDP
    /// datagram, port registry first (spec §4.5: "consult the port
    /// registry for the destination and source ports, then the pattern
    /// registry").
    pub fn match_udp(
        &self,
        session: &mut S,
        first_bytes: &[u8],
        direction: Direction,
        src_port: u16,
        dst_port: u16,
    ) {
        for rule in &self.ports {
            if rule.matches_udp_datagram(src_port, dst_port) {
                (rule.classify)(session, first_bytes, direction, rule.userdata.as_ref());
            }
        }
        for rule in &self.patterns {
            if rule.transport == PatternTransport::Udp && rule.matches(first_bytes) {
                (rule.classify)(session, first_bytes, direction, rule.userdata.as_ref());
            }
        }
    }
}
