use clap::{Parser, ValueEnum};

use convcap::export::{LINKTYPE_ETHERNET, LINKTYPE_USER0};

#[derive(Debug, Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(help = "JSON file describing the entities and the messages of the conversation")]
    pub description: String,
    #[arg(help = "Output pcap file")]
    pub outfile: String,
    #[arg(short, long, help = "Seed for random number generation")]
    pub seed: Option<u64>,
    #[arg(
        short,
        long,
        default_value = None,
        help = "TOML file with the simulation parameters (ping, throughput, TTL, default window)"
    )]
    pub profile: Option<String>,
    #[arg(
        short,
        long,
        value_enum,
        default_value_t = LinkType::Ethernet,
        help = "Link type written in the pcap header"
    )]
    pub link_type: LinkType,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    User0,
}

impl LinkType {
    pub fn value(&self) -> u32 {
        match self {
            LinkType::Ethernet => LINKTYPE_ETHERNET,
            LinkType::User0 => LINKTYPE_USER0,
        }
    }
}
