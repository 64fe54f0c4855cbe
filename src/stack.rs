use std::net::Ipv4Addr;

use crate::error::BuildError;
use crate::ipv4::{Ipv4Builder, IP_PROTOCOL_TCP};
use crate::tcp::{PseudoHeader, TcpBuilder, TcpFlagSet};

/// Everything needed to build one TCP segment inside an IPv4 packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentParams {
    pub source: Ipv4Addr,
    pub source_port: u16,
    pub destination: Ipv4Addr,
    pub destination_port: u16,
    pub identification: u16,
    pub ttl: u8,
    pub sequence_number: u32,
    pub acknowledgment_number: u32,
    pub window: u16,
    pub flags: TcpFlagSet,
    pub payload: Vec<u8>,
}

/// A TCP segment wrapped in its IPv4 packet, with a checksum that accounts for the
/// pseudo-header of that packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpIpv4Stack {
    ipv4: Ipv4Builder,
    tcp: TcpBuilder,
}

impl TcpIpv4Stack {
    pub fn new(params: SegmentParams) -> Result<Self, BuildError> {
        let provisional = Ipv4Builder::new(
            params.source,
            params.destination,
            params.identification,
            params.ttl,
            IP_PROTOCOL_TCP,
            TcpBuilder::empty().build(),
        )?;
        let tcp = TcpBuilder::new(
            params.source_port,
            params.destination_port,
            params.sequence_number,
            params.acknowledgment_number,
            params.window,
            params.flags,
            PseudoHeader::default(),
            params.payload,
        );
        TcpIpv4Stack::wrap(provisional, tcp)
    }

    /// Takes the pseudo-header from the provisional packet, finalizes the segment and
    /// puts it back into the packet
    fn wrap(provisional: Ipv4Builder, tcp: TcpBuilder) -> Result<Self, BuildError> {
        let pseudo_header =
            PseudoHeader::from_ipv4_header(&provisional.build()).unwrap_or_default();
        let tcp = tcp.with_pseudo_header(pseudo_header);
        let ipv4 = provisional.with_payload(tcp.build())?;
        Ok(TcpIpv4Stack { ipv4, tcp })
    }

    /// Build the acknowledgment the destination sends back for this segment, advertising
    /// `remote_window`. It reuses the identification and the TTL of this packet.
    ///
    /// The acknowledgment number it carries is returned alongside: it is the next sequence
    /// number of this direction.
    pub fn get_ack_packet(&self, remote_window: u16) -> Result<(TcpIpv4Stack, u32), BuildError> {
        let tcp = self.tcp.get_ack_response(remote_window);
        let provisional = Ipv4Builder::new(
            self.ipv4.get_destination(),
            self.ipv4.get_source(),
            self.ipv4.get_identification(),
            self.ipv4.get_ttl(),
            IP_PROTOCOL_TCP,
            tcp.build(),
        )?;
        let ack_number = tcp.get_acknowledgment_number();
        Ok((TcpIpv4Stack::wrap(provisional, tcp)?, ack_number))
    }

    pub fn ipv4(&self) -> &Ipv4Builder {
        &self.ipv4
    }

    pub fn tcp(&self) -> &TcpBuilder {
        &self.tcp
    }

    /// The IPv4 packet, TCP segment included
    pub fn build(&self) -> Vec<u8> {
        self.ipv4.build()
    }
}
