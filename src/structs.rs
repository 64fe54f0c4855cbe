use pnet::util::MacAddr;
use serde::Deserialize;

use std::net::Ipv4Addr;

use crate::error::BuildError;
use crate::ethernet::parse_link_address;

/// Receive window advertised when the description does not give one
pub const DEFAULT_WINDOW_SIZE: u16 = 64128;
/// TTL of the generated IPv4 packets, unless the profile overrides it
pub const DEFAULT_TTL: u8 = 64;

/// A named host taking part in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkEntity {
    pub link_address: MacAddr,
    pub network_address: Ipv4Addr,
    pub port: u16,
    pub window: u16,
}

impl NetworkEntity {
    /// Build an entity from its textual link ("aa:bb:cc:dd:ee:ff") and network ("10.0.0.1")
    /// addresses.
    pub fn new(
        link_address: &str,
        network_address: &str,
        port: u16,
        window: u16,
    ) -> Result<Self, BuildError> {
        Ok(NetworkEntity {
            link_address: parse_link_address(link_address)?,
            network_address: network_address
                .parse()
                .map_err(|_| BuildError::InvalidAddress(network_address.to_string()))?,
            port,
            window,
        })
    }
}

/// One message of the conversation, as handed to the simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: String,
    pub target: String,
    pub payload: Vec<u8>,
    pub delay_ms: u64,
}

/// A frame and the time it was seen on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRecord {
    /// milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    pub data: Vec<u8>,
}

/// Parameters of the timing model and of the generated headers
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationParams {
    /// Mean round-trip time, in ms
    pub ping_ms: f64,
    pub ping_deviation_ms: f64,
    /// Mean throughput, in bytes per ms
    pub throughput: f64,
    pub throughput_deviation: f64,
    pub ttl: u8,
    pub default_window: u16,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            ping_ms: 40.0,
            ping_deviation_ms: 10.0,
            throughput: 400.0,
            throughput_deviation: 20.0,
            ttl: DEFAULT_TTL,
            default_window: DEFAULT_WINDOW_SIZE,
        }
    }
}
