use pnet_packet::ip::IpNextHeaderProtocol;
use pnet_packet::ipv4::{Ipv4Flags, Ipv4Packet, MutableIpv4Packet};
use pnet_packet::Packet;

use std::net::Ipv4Addr;

use crate::checksum::checksum;
use crate::error::BuildError;

/// Larger packets would need fragmentation, which is not supported
pub const TYPICAL_MTU: usize = 1500;
/// Options are not supported, so the header size is fixed
pub const IPV4_HEADER_LEN: usize = 20;

pub const IP_PROTOCOL_TCP: u8 = 6;

/// An IPv4 packet without options, with "Don't Fragment" set.
///
/// The size check happens at construction, so a builder that exists always
/// yields a packet that fits in [`TYPICAL_MTU`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Builder {
    source: Ipv4Addr,
    destination: Ipv4Addr,
    identification: u16,
    ttl: u8,
    protocol: u8,
    payload: Vec<u8>,
}

impl Ipv4Builder {
    pub fn new(
        source: Ipv4Addr,
        destination: Ipv4Addr,
        identification: u16,
        ttl: u8,
        protocol: u8,
        payload: Vec<u8>,
    ) -> Result<Self, BuildError> {
        let total_length = IPV4_HEADER_LEN + payload.len();
        if total_length > TYPICAL_MTU {
            return Err(BuildError::Size(total_length));
        }
        Ok(Ipv4Builder {
            source,
            destination,
            identification,
            ttl,
            protocol,
            payload,
        })
    }

    /// Same header, different payload. The MTU is checked again.
    pub fn with_payload(&self, payload: Vec<u8>) -> Result<Self, BuildError> {
        Ipv4Builder::new(
            self.source,
            self.destination,
            self.identification,
            self.ttl,
            self.protocol,
            payload,
        )
    }

    pub fn get_source(&self) -> Ipv4Addr {
        self.source
    }

    pub fn get_destination(&self) -> Ipv4Addr {
        self.destination
    }

    pub fn get_identification(&self) -> u16 {
        self.identification
    }

    pub fn get_ttl(&self) -> u8 {
        self.ttl
    }

    pub fn get_protocol(&self) -> u8 {
        self.protocol
    }

    pub fn total_length(&self) -> usize {
        IPV4_HEADER_LEN + self.payload.len()
    }

    /// Encode the header and the payload. The header checksum is computed with the
    /// checksum field set to zero, then written in place.
    pub fn build(&self) -> Vec<u8> {
        let mut packet = vec![0u8; self.total_length()];
        if let Some(mut ipv4_packet) = MutableIpv4Packet::new(&mut packet[..]) {
            ipv4_packet.set_version(4);
            ipv4_packet.set_header_length((IPV4_HEADER_LEN / 4) as u8);
            ipv4_packet.set_dscp(0);
            ipv4_packet.set_ecn(0);
            ipv4_packet.set_total_length(self.total_length() as u16);
            ipv4_packet.set_identification(self.identification);
            ipv4_packet.set_flags(Ipv4Flags::DontFragment);
            ipv4_packet.set_fragment_offset(0);
            ipv4_packet.set_ttl(self.ttl);
            ipv4_packet.set_next_level_protocol(IpNextHeaderProtocol::new(self.protocol));
            ipv4_packet.set_checksum(0);
            ipv4_packet.set_source(self.source);
            ipv4_packet.set_destination(self.destination);

            let header_checksum = checksum(&ipv4_packet.packet()[..IPV4_HEADER_LEN]);
            ipv4_packet.set_checksum(header_checksum);
        }
        packet[IPV4_HEADER_LEN..].copy_from_slice(&self.payload);
        packet
    }
}

/// Check that a header carries a valid checksum
pub fn verify_header(packet: &Ipv4Packet) -> bool {
    let header_len = packet.get_header_length() as usize * 4;
    packet.packet().len() >= header_len && checksum(&packet.packet()[..header_len]) == 0
}
