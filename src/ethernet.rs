use pnet::util::MacAddr;
use pnet_packet::ethernet::{EtherType, EthernetPacket, MutableEthernetPacket};

use crate::error::BuildError;

pub const IPV4_ETHERTYPE: u16 = 0x0800;
pub const ARP_ETHERTYPE: u16 = 0x0806;
pub const IPV6_ETHERTYPE: u16 = 0x86DD;
pub const VLAN_ETHERTYPE: u16 = 0x8100;
pub const LOOPBACK_ETHERTYPE: u16 = 0x080E;

/// Frames are padded so that their length is a multiple of this value
pub const FRAME_ALIGNMENT: usize = 8;

/// Parse a link address written as 6 colon-separated hexadecimal octets.
pub fn parse_link_address(address: &str) -> Result<MacAddr, BuildError> {
    address
        .parse::<MacAddr>()
        .map_err(|_| BuildError::Format(address.to_string()))
}

/// Build an Ethernet frame from textual link addresses.
pub fn build(
    destination: &str,
    source: &str,
    ethertype: u16,
    payload: &[u8],
) -> Result<Vec<u8>, BuildError> {
    Ok(build_frame(
        parse_link_address(destination)?,
        parse_link_address(source)?,
        ethertype,
        payload,
    ))
}

/// Build an Ethernet frame: destination, source, ethertype and payload, zero-padded to
/// [`FRAME_ALIGNMENT`]. Neither the preamble, the SFD nor the FCS are generated.
pub fn build_frame(
    destination: MacAddr,
    source: MacAddr,
    ethertype: u16,
    payload: &[u8],
) -> Vec<u8> {
    let header_len = EthernetPacket::minimum_packet_size();
    let len = (header_len + payload.len()).next_multiple_of(FRAME_ALIGNMENT);
    let mut frame = vec![0u8; len];

    // the buffer always holds at least the header
    if let Some(mut eth_packet) = MutableEthernetPacket::new(&mut frame[..]) {
        eth_packet.set_destination(destination);
        eth_packet.set_source(source);
        eth_packet.set_ethertype(EtherType::new(ethertype));
    }
    frame[header_len..header_len + payload.len()].copy_from_slice(payload);
    frame
}
