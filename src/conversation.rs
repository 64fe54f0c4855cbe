use rand_core::RngCore;
use rand_distr::{Distribution, Uniform};

use std::collections::{BTreeMap, HashMap};
use std::num::Wrapping;

use crate::error::BuildError;
use crate::ethernet::{build_frame, IPV4_ETHERTYPE};
use crate::export::CaptureFile;
use crate::stack::{SegmentParams, TcpIpv4Stack};
use crate::structs::*;
use crate::tcp::TcpFlagSet;
use crate::timing::{Jitter, Simulator};

/// Counters of one direction of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowState {
    pub ip_identification: Wrapping<u16>,
    pub sequence_number: Wrapping<u32>,
}

impl FlowState {
    /// Random identification in [1, 65535] and sequence number in [1, 2^32-1]
    pub fn random(rng: &mut impl RngCore) -> Self {
        FlowState {
            ip_identification: Wrapping(Uniform::new_inclusive(1, u16::MAX).sample(rng)),
            sequence_number: Wrapping(Uniform::new_inclusive(1, u32::MAX).sample(rng)),
        }
    }
}

/// (sender, target)
pub type FlowKey = (String, String);

/// Simulates a TCP/IPv4 conversation over Ethernet between named entities.
///
/// Each message becomes a data frame followed by the acknowledgment of the target. The
/// counters of a direction only move once both frames have been built.
pub struct Conversation<R: RngCore> {
    entities: BTreeMap<String, NetworkEntity>,
    flows: HashMap<FlowKey, FlowState>,
    simulator: Simulator,
    ttl: u8,
    rng: R,
}

impl<R: RngCore> Conversation<R> {
    /// Create a conversation whose counters are drawn at random, for every ordered pair of
    /// entities. Entities are visited in name order, so that a seeded generator always yields
    /// the same conversation.
    pub fn new(
        entities: BTreeMap<String, NetworkEntity>,
        start_ms: u64,
        params: &SimulationParams,
        mut rng: R,
    ) -> Self {
        let mut flows = HashMap::new();
        for sender in entities.keys() {
            for target in entities.keys() {
                flows.insert((sender.clone(), target.clone()), FlowState::random(&mut rng));
            }
        }
        Conversation::with_flows(entities, flows, start_ms, params, rng)
    }

    /// Create a conversation with known counters. Pairs missing from `flows` are drawn at
    /// random the first time a message is exchanged between them.
    pub fn with_flows(
        entities: BTreeMap<String, NetworkEntity>,
        flows: HashMap<FlowKey, FlowState>,
        start_ms: u64,
        params: &SimulationParams,
        rng: R,
    ) -> Self {
        log::trace!("Simulation parameters: {params:?}");
        Conversation {
            entities,
            flows,
            simulator: Simulator::new(
                start_ms,
                Jitter::new(params.ping_ms, params.ping_deviation_ms),
                Jitter::new(params.throughput, params.throughput_deviation),
            ),
            ttl: params.ttl,
            rng,
        }
    }

    pub fn flow(&self, sender: &str, target: &str) -> Option<&FlowState> {
        self.flows.get(&(sender.to_string(), target.to_string()))
    }

    fn entity(&self, name: &str) -> Result<&NetworkEntity, BuildError> {
        self.entities
            .get(name)
            .ok_or_else(|| BuildError::UnknownEntity(name.to_string()))
    }

    fn flow_or_random(&mut self, sender: &str, target: &str) -> FlowState {
        self.flows
            .get(&(sender.to_string(), target.to_string()))
            .copied()
            .unwrap_or_else(|| FlowState::random(&mut self.rng))
    }

    /// Send `payload` from `sender` to `target`, `delay_ms` after the previous exchange, and
    /// let the target acknowledge it immediately.
    ///
    /// Returns the acknowledgment number of the target, which becomes the next sequence
    /// number of this direction. On error, no counter is modified and no frame is recorded.
    pub fn simulate_message(
        &mut self,
        sender: &str,
        target: &str,
        payload: &[u8],
        delay_ms: u64,
    ) -> Result<u32, BuildError> {
        let from = *self.entity(sender)?;
        let to = *self.entity(target)?;
        let forward = self.flow_or_random(sender, target);
        let backward = self.flow_or_random(target, sender);

        let stack = TcpIpv4Stack::new(SegmentParams {
            source: from.network_address,
            source_port: from.port,
            destination: to.network_address,
            destination_port: to.port,
            identification: forward.ip_identification.0,
            ttl: self.ttl,
            sequence_number: forward.sequence_number.0,
            acknowledgment_number: backward.sequence_number.0,
            window: from.window,
            flags: TcpFlagSet::default(),
            payload: payload.to_vec(),
        })?;
        let (ack_stack, ack_number) = stack.get_ack_packet(to.window)?;

        let frame = build_frame(
            to.link_address,
            from.link_address,
            IPV4_ETHERTYPE,
            &stack.build(),
        );
        let ack_frame = build_frame(
            from.link_address,
            to.link_address,
            IPV4_ETHERTYPE,
            &ack_stack.build(),
        );

        // everything is built: commit
        let ts = self.simulator.emit(&mut self.rng, frame, delay_ms);
        let ack_ts = self.simulator.emit(&mut self.rng, ack_frame, 0);
        log::debug!(
            "{sender} -> {target}: {} bytes, id {}, seq {}, ack {} (at {ts} ms, acknowledged at {ack_ts} ms)",
            payload.len(),
            forward.ip_identification,
            forward.sequence_number,
            backward.sequence_number,
        );

        self.flows
            .entry((target.to_string(), sender.to_string()))
            .or_insert(backward);
        self.flows.insert(
            (sender.to_string(), target.to_string()),
            FlowState {
                ip_identification: forward.ip_identification + Wrapping(1),
                sequence_number: Wrapping(ack_number),
            },
        );
        Ok(ack_number)
    }

    /// Simulate every message in order
    pub fn simulate_all<'a>(
        &mut self,
        messages: impl IntoIterator<Item = &'a Message>,
    ) -> Result<(), BuildError> {
        for message in messages {
            self.simulate_message(
                &message.sender,
                &message.target,
                &message.payload,
                message.delay_ms,
            )?;
        }
        Ok(())
    }

    pub fn records(&self) -> &[SimulationRecord] {
        self.simulator.records()
    }

    /// Ethernet capture of the whole conversation
    pub fn into_capture(self) -> CaptureFile {
        CaptureFile::ethernet(self.simulator.into_records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet_packet::ethernet::EthernetPacket;
    use pnet_packet::ipv4::Ipv4Packet;
    use pnet_packet::tcp::TcpPacket;
    use pnet_packet::Packet;
    use rand_core::SeedableRng;
    use rand_pcg::Pcg32;

    fn entities() -> BTreeMap<String, NetworkEntity> {
        BTreeMap::from([
            (
                "alice".to_string(),
                NetworkEntity::new("aa:aa:aa:aa:aa:aa", "10.0.0.1", 1234, 1000).unwrap(),
            ),
            (
                "bob".to_string(),
                NetworkEntity::new("bb:bb:bb:bb:bb:bb", "10.0.0.2", 80, 2000).unwrap(),
            ),
        ])
    }

    fn known_flows(
        alice_id: u16,
        alice_seq: u32,
        bob_id: u16,
        bob_seq: u32,
    ) -> HashMap<FlowKey, FlowState> {
        HashMap::from([
            (
                ("alice".to_string(), "bob".to_string()),
                FlowState {
                    ip_identification: Wrapping(alice_id),
                    sequence_number: Wrapping(alice_seq),
                },
            ),
            (
                ("bob".to_string(), "alice".to_string()),
                FlowState {
                    ip_identification: Wrapping(bob_id),
                    sequence_number: Wrapping(bob_seq),
                },
            ),
        ])
    }

    fn tcp_of(frame: &[u8]) -> (u16, u32, u32, Vec<u8>) {
        let eth_packet = EthernetPacket::new(frame).unwrap();
        let ipv4_packet = Ipv4Packet::new(eth_packet.payload()).unwrap();
        let tcp_packet = TcpPacket::new(ipv4_packet.payload()).unwrap();
        (
            ipv4_packet.get_identification(),
            tcp_packet.get_sequence(),
            tcp_packet.get_acknowledgement(),
            tcp_packet.payload().to_vec(),
        )
    }

    #[test]
    fn test_counters_advance() {
        let mut conversation = Conversation::with_flows(
            entities(),
            known_flows(10, 1000, 20, 5000),
            0,
            &SimulationParams::default(),
            Pcg32::seed_from_u64(0),
        );
        assert_eq!(conversation.simulate_message("alice", "bob", b"hello", 0), Ok(1005));
        assert_eq!(conversation.simulate_message("alice", "bob", b"again", 0), Ok(1010));
        assert_eq!(conversation.simulate_message("bob", "alice", b"hi", 0), Ok(5002));

        let alice = conversation.flow("alice", "bob").unwrap();
        assert_eq!(alice.ip_identification, Wrapping(12));
        assert_eq!(alice.sequence_number, Wrapping(1010));
        let bob = conversation.flow("bob", "alice").unwrap();
        assert_eq!(bob.ip_identification, Wrapping(21));
        assert_eq!(bob.sequence_number, Wrapping(5002));

        let records = conversation.records();
        assert_eq!(records.len(), 6);
        // second data frame and the acknowledgment of bob
        assert_eq!(tcp_of(&records[2].data), (11, 1005, 5000, b"again".to_vec()));
        assert_eq!(tcp_of(&records[3].data), (11, 5000, 1010, vec![]));
        // bob answers with the numbers alice acknowledged
        assert_eq!(tcp_of(&records[4].data), (20, 5000, 1010, b"hi".to_vec()));
        assert_eq!(tcp_of(&records[5].data), (20, 1010, 5002, vec![]));
    }

    #[test]
    fn test_extreme_timing_parameters() {
        let params = SimulationParams {
            ping_deviation_ms: f64::NAN,
            throughput_deviation: f64::INFINITY,
            ..SimulationParams::default()
        };
        let mut conversation = Conversation::with_flows(
            entities(),
            known_flows(1, 1, 1, 1),
            u64::MAX - 1,
            &params,
            Pcg32::seed_from_u64(0),
        );
        assert_eq!(conversation.simulate_message("alice", "bob", b"late", u64::MAX), Ok(5));
        assert!(conversation.records().iter().all(|r| r.timestamp_ms == u64::MAX));
    }

    #[test]
    fn test_identification_wraps() {
        let mut conversation = Conversation::with_flows(
            entities(),
            known_flows(u16::MAX, u32::MAX, 1, 1),
            0,
            &SimulationParams::default(),
            Pcg32::seed_from_u64(0),
        );
        assert_eq!(conversation.simulate_message("alice", "bob", b"abc", 0), Ok(2));
        let alice = conversation.flow("alice", "bob").unwrap();
        assert_eq!(alice.ip_identification, Wrapping(0));
        assert_eq!(alice.sequence_number, Wrapping(2));
    }

    #[test]
    fn test_failed_message_changes_nothing() {
        let mut conversation = Conversation::with_flows(
            entities(),
            known_flows(10, 1000, 20, 5000),
            0,
            &SimulationParams::default(),
            Pcg32::seed_from_u64(0),
        );
        assert_eq!(
            conversation.simulate_message("alice", "bob", &[0; 1461], 0),
            Err(BuildError::Size(1501))
        );
        assert_eq!(
            conversation.simulate_message("alice", "carol", b"hello", 0),
            Err(BuildError::UnknownEntity("carol".to_string()))
        );
        assert!(conversation.records().is_empty());
        assert_eq!(
            conversation.flow("alice", "bob"),
            Some(&FlowState {
                ip_identification: Wrapping(10),
                sequence_number: Wrapping(1000),
            })
        );
    }

    #[test]
    fn test_random_initial_counters() {
        let conversation = Conversation::new(
            entities(),
            0,
            &SimulationParams::default(),
            Pcg32::seed_from_u64(3),
        );
        for sender in ["alice", "bob"] {
            for target in ["alice", "bob"] {
                let state = conversation.flow(sender, target).unwrap();
                assert_ne!(state.ip_identification.0, 0);
                assert_ne!(state.sequence_number.0, 0);
            }
        }
    }

    #[test]
    fn test_same_seed_same_records() {
        let run = |seed| {
            let mut conversation = Conversation::new(
                entities(),
                1_700_000_000_000,
                &SimulationParams::default(),
                Pcg32::seed_from_u64(seed),
            );
            conversation.simulate_message("alice", "bob", b"hello", 10).unwrap();
            conversation.simulate_message("bob", "alice", b"world", 250).unwrap();
            conversation.into_capture().records
        };
        assert_eq!(run(1), run(1));
    }

    #[test]
    fn test_timestamps_monotonic() {
        let mut conversation = Conversation::new(
            entities(),
            0,
            &SimulationParams::default(),
            Pcg32::seed_from_u64(5),
        );
        for i in 0..50u64 {
            let (sender, target) = if i % 3 == 0 {
                ("bob", "alice")
            } else {
                ("alice", "bob")
            };
            let payload = vec![b'x'; (i * 20) as usize];
            conversation
                .simulate_message(sender, target, &payload, i % 4 * 100)
                .unwrap();
        }
        let records = conversation.records();
        assert_eq!(records.len(), 100);
        assert!(records.windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
    }
}
