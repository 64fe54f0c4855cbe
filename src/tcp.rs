use pnet_packet::tcp::{MutableTcpPacket, TcpFlags};
use pnet_packet::Packet;

use std::num::Wrapping;

use crate::checksum::checksum;
use crate::ipv4::IP_PROTOCOL_TCP;

/// Options are not supported, so the header size is fixed
pub const TCP_HEADER_LEN: usize = 20;

const PSEUDO_HEADER_ADDRESSES: std::ops::Range<usize> = 12..20;

/// Source and destination addresses of an IPv4 header, as seen by the TCP checksum.
///
/// It is never serialized on its own: [`PseudoHeader::checksum_prefix`] completes it with
/// the protocol and the segment length right before checksumming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PseudoHeader([u8; 8]);

impl PseudoHeader {
    /// Extract the pseudo-header from a built IPv4 packet (bytes 12..20 of its header).
    /// Returns None if the buffer is too short to hold them.
    pub fn from_ipv4_header(ipv4_packet: &[u8]) -> Option<Self> {
        let addresses = ipv4_packet.get(PSEUDO_HEADER_ADDRESSES)?;
        let mut pseudo_header = [0u8; 8];
        pseudo_header.copy_from_slice(addresses);
        Some(PseudoHeader(pseudo_header))
    }

    pub fn addresses(&self) -> &[u8; 8] {
        &self.0
    }

    /// The 12 bytes prepended to the segment for the checksum
    pub fn checksum_prefix(&self, segment_len: usize) -> [u8; 12] {
        let mut prefix = [0u8; 12];
        prefix[..8].copy_from_slice(&self.0);
        prefix[9] = IP_PROTOCOL_TCP;
        prefix[10..].copy_from_slice(&(segment_len as u16).to_be_bytes());
        prefix
    }
}

/// TCP flags that can be set on a generated segment. URG is not supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpFlagSet {
    pub cwr: bool,
    pub ece: bool,
    pub ack: bool,
    pub psh: bool,
    pub rst: bool,
    pub syn: bool,
    pub fin: bool,
}

impl TcpFlagSet {
    pub fn ack() -> Self {
        TcpFlagSet {
            ack: true,
            ..Default::default()
        }
    }

    pub fn bits(&self) -> u8 {
        (self.cwr as u8 * TcpFlags::CWR)
            | (self.ece as u8 * TcpFlags::ECE)
            | (self.ack as u8 * TcpFlags::ACK)
            | (self.psh as u8 * TcpFlags::PSH)
            | (self.rst as u8 * TcpFlags::RST)
            | (self.syn as u8 * TcpFlags::SYN)
            | (self.fin as u8 * TcpFlags::FIN)
    }
}

/// A TCP segment without options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpBuilder {
    source_port: u16,
    destination_port: u16,
    sequence_number: u32,
    acknowledgment_number: u32,
    window: u16,
    flags: TcpFlagSet,
    pseudo_header: PseudoHeader,
    payload: Vec<u8>,
}

impl TcpBuilder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_port: u16,
        destination_port: u16,
        sequence_number: u32,
        acknowledgment_number: u32,
        window: u16,
        flags: TcpFlagSet,
        pseudo_header: PseudoHeader,
        payload: Vec<u8>,
    ) -> Self {
        TcpBuilder {
            source_port,
            destination_port,
            sequence_number,
            acknowledgment_number,
            window,
            flags,
            pseudo_header,
            payload,
        }
    }

    /// Segment used to reserve room in a provisional IPv4 packet
    pub fn empty() -> Self {
        TcpBuilder::new(
            0,
            0,
            0,
            0,
            0,
            TcpFlagSet::default(),
            PseudoHeader::default(),
            vec![],
        )
    }

    pub fn with_pseudo_header(self, pseudo_header: PseudoHeader) -> Self {
        TcpBuilder {
            pseudo_header,
            ..self
        }
    }

    pub fn get_sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn get_acknowledgment_number(&self) -> u32 {
        self.acknowledgment_number
    }

    pub fn get_flags(&self) -> TcpFlagSet {
        self.flags
    }

    pub fn get_payload(&self) -> &[u8] {
        &self.payload
    }

    /// Sequence number the peer expects after this segment. SYN and FIN count for one.
    pub fn next_sequence_number(&self) -> u32 {
        let consumed = (self.flags.syn || self.flags.fin) as u32 + self.payload.len() as u32;
        (Wrapping(self.sequence_number) + Wrapping(consumed)).0
    }

    /// The acknowledgment the peer sends back: ports are swapped, the sequence number is the
    /// peer's own (our acknowledgment number), and it acknowledges everything this segment
    /// carried. The pseudo-header is left empty, since it depends on the IPv4 packet that
    /// will wrap the acknowledgment.
    pub fn get_ack_response(&self, window: u16) -> TcpBuilder {
        TcpBuilder::new(
            self.destination_port,
            self.source_port,
            self.acknowledgment_number,
            self.next_sequence_number(),
            window,
            TcpFlagSet::ack(),
            PseudoHeader::default(),
            vec![],
        )
    }

    /// Encode the segment. The checksum covers the pseudo-header, the header (with a null
    /// checksum field) and the payload.
    pub fn build(&self) -> Vec<u8> {
        let len = TCP_HEADER_LEN + self.payload.len();
        let mut segment = vec![0u8; len];
        segment[TCP_HEADER_LEN..].copy_from_slice(&self.payload);

        if let Some(mut tcp_packet) = MutableTcpPacket::new(&mut segment[..]) {
            tcp_packet.set_source(self.source_port);
            tcp_packet.set_destination(self.destination_port);
            tcp_packet.set_sequence(self.sequence_number);
            tcp_packet.set_acknowledgement(self.acknowledgment_number);
            tcp_packet.set_data_offset((TCP_HEADER_LEN / 4) as u8);
            tcp_packet.set_reserved(0);
            tcp_packet.set_flags(self.flags.bits() & !TcpFlags::URG);
            tcp_packet.set_window(self.window);
            tcp_packet.set_checksum(0);
            tcp_packet.set_urgent_ptr(0);

            let mut checksum_input = self.pseudo_header.checksum_prefix(len).to_vec();
            checksum_input.extend_from_slice(tcp_packet.packet());
            tcp_packet.set_checksum(checksum(&checksum_input));
        }
        segment
    }
}
