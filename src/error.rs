use thiserror::Error;

/// Errors raised while turning a conversation into frames.
///
/// None of them is worth retrying: the conversation description itself has
/// to be fixed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Malformed link address {0:?}: expected 6 colon-separated hexadecimal octets")]
    Format(String),
    #[error("Packet of {0} bytes exceeds the typical MTU (1500 bytes), fragmentation is not supported")]
    Size(usize),
    #[error("Invalid IPv4 address {0:?}")]
    InvalidAddress(String),
    #[error("Unknown entity {0:?}")]
    UnknownEntity(String),
}
