//! Synthesize a realistic network capture from the description of a conversation.
//!
//! Each message exchanged between named entities becomes an Ethernet/IPv4/TCP data frame
//! and the acknowledgment of its target, timestamped with a jittered clock and exported
//! as a pcap file.

/// Errors of the frame generation
pub mod error;

/// Structures used throughout the library
pub mod structs;

/// Conversation description and simulation profile
pub mod config;

/// Internet checksum
pub mod checksum;
/// Ethernet frames
pub mod ethernet;
/// IPv4 packets
pub mod ipv4;
/// TCP segments and pseudo-header
pub mod tcp;
/// TCP over IPv4
pub mod stack;

/// Jittered clock
pub mod timing;

/// Per-flow state and message simulation
pub mod conversation;

/// Export to pcap
pub mod export;

pub use error::BuildError;
