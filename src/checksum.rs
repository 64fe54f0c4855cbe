/// Internet ones'-complement checksum (RFC 1071).
///
/// The data is read as big-endian 16-bit words, an odd trailing byte being
/// padded with a zero. Carries are folded back after every addition and the
/// complement of the sum is returned.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u16::from_be_bytes([word[0], word[1]]) as u32;
        sum = (sum & 0xffff) + (sum >> 16);
    }
    if let [last] = words.remainder() {
        sum += u16::from_be_bytes([*last, 0]) as u32;
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
