use pcap_file::pcap::{PcapHeader, PcapWriter, RawPcapPacket};
use pcap_file::{DataLink, Endianness, PcapError, TsResolution};

use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::structs::SimulationRecord;

pub const LINKTYPE_ETHERNET: u32 = 1;
/// Reserved for private use, never produced by the simulation itself
pub const LINKTYPE_USER0: u32 = 147;

/// An ordered list of frames and the link type they share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFile {
    pub link_type: u32,
    pub records: Vec<SimulationRecord>,
}

impl CaptureFile {
    pub fn ethernet(records: Vec<SimulationRecord>) -> Self {
        CaptureFile {
            link_type: LINKTYPE_ETHERNET,
            records,
        }
    }

    pub fn build(&self) -> Result<Vec<u8>, PcapError> {
        build(self.link_type, &self.records)
    }
}

/// Serialize the records into a little-endian pcap (magic 0xA1B2C3D4, version 2.4).
///
/// The snap length is 0 ("unlimited") and frames are never truncated, so the captured
/// and original lengths are always equal.
pub fn build(link_type: u32, records: &[SimulationRecord]) -> Result<Vec<u8>, PcapError> {
    let mut pcap_writer = PcapWriter::with_header(Vec::new(), capture_header(link_type))?;
    for record in records {
        pcap_writer.write_raw_packet(&raw_packet(record)?)?;
    }
    Ok(pcap_writer.into_writer())
}

/// Write the records into a pcap file, creating or truncating it.
pub fn write_capture(capture: &CaptureFile, outfile: &Path) -> Result<usize, PcapError> {
    let bytes = capture.build()?;
    log::trace!("Saving into {}", outfile.display());
    let file_out = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(outfile)
        .map_err(PcapError::IoError)?;
    let mut writer = BufWriter::new(file_out);
    writer.write_all(&bytes).map_err(PcapError::IoError)?;
    writer.flush().map_err(PcapError::IoError)?;
    Ok(bytes.len())
}

fn capture_header(link_type: u32) -> PcapHeader {
    PcapHeader {
        version_major: 2,
        version_minor: 4,
        ts_correction: 0,
        ts_accuracy: 0,
        snaplen: 0,
        datalink: DataLink::from(link_type),
        ts_resolution: TsResolution::MicroSecond,
        endianness: Endianness::Little,
    }
}

fn raw_packet(record: &SimulationRecord) -> Result<RawPcapPacket<'_>, PcapError> {
    let ts_sec = u32::try_from(record.timestamp_ms / 1000)
        .map_err(|_| PcapError::InvalidField("SimulationRecord: timestamp after 2106"))?;
    let len = u32::try_from(record.data.len())
        .map_err(|_| PcapError::InvalidField("SimulationRecord: frame larger than 4 GiB"))?;
    Ok(RawPcapPacket {
        ts_sec,
        ts_frac: (record.timestamp_ms % 1000) as u32 * 1000,
        incl_len: len,
        orig_len: len,
        data: Cow::Borrowed(&record.data),
    })
}
