use serde::Deserialize;
use thiserror::Error;

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::BuildError;
use crate::structs::*;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read the file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot parse the conversation description: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot parse the simulation profile: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Could not parse start time {0:?}")]
    StartTime(String),
    #[error("Entity {name:?}: {source}")]
    Entity { name: String, source: BuildError },
    #[error("Message #{index} refers to an unknown entity {name:?}")]
    UnknownEntity { index: usize, name: String },
    #[error("Message #{index}: delay does not fit in 64 bits of milliseconds")]
    Delay { index: usize },
    #[error("Simulation parameter {0} must be a finite number")]
    Profile(&'static str),
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct EntityJson {
    mac: String,
    ip: String,
    port: u16,
    window: Option<u16>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct MessageJson {
    sender: String,
    target: String,
    data: String,
    #[serde(default)]
    delay_ms: u64,
    #[serde(default)]
    delay_sec: u64,
    #[serde(default)]
    delay_min: u64,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ConversationJson {
    start_time_utc: String,
    entities: BTreeMap<String, EntityJson>,
    messages: Vec<MessageJson>,
}

/// A conversation, as described by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationDescription {
    /// milliseconds since the Unix epoch
    pub start_ms: u64,
    pub entities: BTreeMap<String, NetworkEntity>,
    pub messages: Vec<Message>,
}

/// Parse a start time, either "YYYY-MM-DD HH:MM:SS" (UTC) or a Unix timestamp in seconds.
pub fn parse_start_time(start_time: &str) -> Result<u64, ConfigError> {
    if let Ok(d) = humantime::parse_rfc3339_weak(start_time) {
        d.duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .map_err(|_| ConfigError::StartTime(start_time.to_string()))
    } else if let Ok(n) = start_time.parse::<u64>() {
        n.checked_mul(1000)
            .ok_or_else(|| ConfigError::StartTime(start_time.to_string()))
    } else {
        Err(ConfigError::StartTime(start_time.to_string()))
    }
}

/// Current time, in ms since the Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Import a conversation description from a JSON string. Entities without a window get
/// `default_window`.
pub fn import_conversation(
    description: &str,
    default_window: u16,
) -> Result<ConversationDescription, ConfigError> {
    let conversation: ConversationJson = serde_json::from_str(description)?;
    let start_ms = parse_start_time(&conversation.start_time_utc)?;

    let mut entities = BTreeMap::new();
    for (name, entity) in conversation.entities {
        let window = entity.window.unwrap_or(default_window);
        match NetworkEntity::new(&entity.mac, &entity.ip, entity.port, window) {
            Ok(e) => {
                entities.insert(name, e);
            }
            Err(source) => return Err(ConfigError::Entity { name, source }),
        }
    }

    let mut messages = Vec::with_capacity(conversation.messages.len());
    for (index, message) in conversation.messages.into_iter().enumerate() {
        for name in [&message.sender, &message.target] {
            if !entities.contains_key(name) {
                return Err(ConfigError::UnknownEntity {
                    index,
                    name: name.clone(),
                });
            }
        }
        let delay_ms = message
            .delay_sec
            .checked_mul(1000)
            .zip(message.delay_min.checked_mul(60 * 1000))
            .and_then(|(sec, min)| message.delay_ms.checked_add(sec)?.checked_add(min))
            .ok_or(ConfigError::Delay { index })?;
        messages.push(Message {
            delay_ms,
            sender: message.sender,
            target: message.target,
            payload: message.data.into_bytes(),
        });
    }

    log::info!(
        "Conversation loaded: {} entities, {} messages",
        entities.len(),
        messages.len()
    );
    log::trace!("Entities: {entities:?}");
    Ok(ConversationDescription {
        start_ms,
        entities,
        messages,
    })
}

/// Import simulation parameters from a TOML string. Missing keys keep their default value,
/// NaN and infinite values are rejected.
pub fn import_params(profile: &str) -> Result<SimulationParams, ConfigError> {
    let params: SimulationParams = toml::from_str(profile)?;
    for (name, value) in [
        ("ping_ms", params.ping_ms),
        ("ping_deviation_ms", params.ping_deviation_ms),
        ("throughput", params.throughput),
        ("throughput_deviation", params.throughput_deviation),
    ] {
        if !value.is_finite() {
            return Err(ConfigError::Profile(name));
        }
    }
    log::debug!("Simulation parameters: {params:?}");
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_conversation_simple() {
        let conversation = import_conversation(
            r#"
{
    "start_time_utc": "2024-03-01 12:00:00",
    "entities": {
        "alice": { "mac": "aa:aa:aa:aa:aa:aa", "ip": "10.0.0.1", "port": 1234 },
        "bob": { "mac": "bb:bb:bb:bb:bb:bb", "ip": "10.0.0.2", "port": 80, "window": 1000 }
    },
    "messages": [
        { "sender": "alice", "target": "bob", "data": "hello" },
        { "sender": "bob", "target": "alice", "data": "hi", "delay_ms": 5, "delay_sec": 2, "delay_min": 1 }
    ]
}"#,
            DEFAULT_WINDOW_SIZE,
        )
        .unwrap();

        assert_eq!(conversation.start_ms, 1_709_294_400_000);
        let alice = conversation.entities["alice"];
        assert_eq!(alice.network_address, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(alice.port, 1234);
        assert_eq!(alice.window, DEFAULT_WINDOW_SIZE);
        assert_eq!(conversation.entities["bob"].window, 1000);

        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].payload, b"hello");
        assert_eq!(conversation.messages[0].delay_ms, 0);
        assert_eq!(conversation.messages[1].delay_ms, 62_005);
    }

    #[test]
    fn test_unknown_entity() {
        let error = import_conversation(
            r#"
{
    "start_time_utc": "0",
    "entities": { "alice": { "mac": "aa:aa:aa:aa:aa:aa", "ip": "10.0.0.1", "port": 1 } },
    "messages": [ { "sender": "alice", "target": "carol", "data": "hello" } ]
}"#,
            DEFAULT_WINDOW_SIZE,
        )
        .unwrap_err();
        assert!(matches!(error, ConfigError::UnknownEntity { index: 0, name } if name == "carol"));
    }

    #[test]
    fn test_bad_mac() {
        let error = import_conversation(
            r#"
{
    "start_time_utc": "0",
    "entities": { "alice": { "mac": "aa:aa:aa", "ip": "10.0.0.1", "port": 1 } },
    "messages": []
}"#,
            DEFAULT_WINDOW_SIZE,
        )
        .unwrap_err();
        assert!(matches!(
            error,
            ConfigError::Entity {
                source: BuildError::Format(_),
                ..
            }
        ));
    }

    #[test]
    fn test_start_time() {
        assert_eq!(parse_start_time("1970-01-01 00:01:00").unwrap(), 60_000);
        assert_eq!(parse_start_time("1700000000").unwrap(), 1_700_000_000_000);
        assert!(parse_start_time("yesterday").is_err());
        assert!(matches!(
            parse_start_time("18446744073709551615"),
            Err(ConfigError::StartTime(_))
        ));
    }

    #[test]
    fn test_delay_overflow() {
        let error = import_conversation(
            r#"
{
    "start_time_utc": "0",
    "entities": { "alice": { "mac": "aa:aa:aa:aa:aa:aa", "ip": "10.0.0.1", "port": 1 } },
    "messages": [
        { "sender": "alice", "target": "alice", "data": "a", "delay_ms": 18446744073709551615 },
        { "sender": "alice", "target": "alice", "data": "b", "delay_min": 18446744073709551615 }
    ]
}"#,
            DEFAULT_WINDOW_SIZE,
        )
        .unwrap_err();
        assert!(matches!(error, ConfigError::Delay { index: 1 }));
    }

    #[test]
    fn test_params() {
        let params = import_params("ping_ms = 100.0\nttl = 128\n").unwrap();
        assert_eq!(params.ping_ms, 100.0);
        assert_eq!(params.ttl, 128);
        assert_eq!(params.throughput, SimulationParams::default().throughput);
        assert!(import_params("unknown = 1").is_err());
    }

    #[test]
    fn test_params_not_finite() {
        assert!(matches!(
            import_params("ping_deviation_ms = nan"),
            Err(ConfigError::Profile("ping_deviation_ms"))
        ));
        assert!(matches!(
            import_params("throughput = inf"),
            Err(ConfigError::Profile("throughput"))
        ));
    }
}
