//! Core-owned configuration (spec §6.3): the single tunable the core
//! itself defines is `max_tcp_out_of_order_packets`. Everything else in
//! a deployment's config (interfaces, output sinks, field definitions)
//! belongs to the host and never reaches this crate.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CoreError, Result};

const MIN_OUT_OF_ORDER: u32 = 64;
const MAX_OUT_OF_ORDER: u32 = 10_000;
const DEFAULT_OUT_OF_ORDER: u32 = 256;

fn default_max_out_of_order() -> u32 {
    DEFAULT_OUT_OF_ORDER
}

/// Reassembly tunables (spec §6.3). Deserializes from a flat TOML
/// document (no table header); out-of-range values are clamped rather than rejected
/// (see [`ReassemblyConfig::normalize`]) since a deployment that dials
/// this too high or too low should degrade, not refuse to start.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReassemblyConfig {
    #[serde(default = "default_max_out_of_order")]
    pub max_tcp_out_of_order_packets: u32,
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        ReassemblyConfig {
            max_tcp_out_of_order_packets: DEFAULT_OUT_OF_ORDER,
        }
    }
}

impl ReassemblyConfig {
    /// Clamps `max_tcp_out_of_order_packets` into `[64, 10000]`.
    pub fn normalize(&mut self) {
        self.max_tcp_out_of_order_packets = self
            .max_tcp_out_of_order_packets
            .clamp(MIN_OUT_OF_ORDER, MAX_OUT_OF_ORDER);
    }
}

/// Loads and validates a [`ReassemblyConfig`] from a TOML file at `path`,
/// normalizing it before returning (mirrors the host's
/// `load_from_path` + `validate_config` split).
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<ReassemblyConfig> {
    let text = fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("failed to read config file: {e}")))?;
    let mut cfg: ReassemblyConfig =
        toml::from_str(&text).map_err(|e| CoreError::Config(format!("failed to parse config: {e}")))?;
    cfg.normalize();
    Ok(cfg)
}
