use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct RtpPacket {
    pub payload_type: u8,
    pub marker: bool,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub payload: Bytes,
}

const FIXED_HEADER_LEN: usize = 12;
const RTP_VERSION: u8 = 2;

impl RtpPacket {
    /// Parses one RTP datagram. The payload is a slice of `data`, not a copy.
    pub fn parse(data: Bytes) -> Option<Self> {
        let fixed = data.get(..FIXED_HEADER_LEN)?;
        if fixed[0] >> 6 != RTP_VERSION {
            return None;
        }
        let payload_start = header_len(&data)?;
        let payload_end = payload_end(&data)?;
        if payload_end < payload_start {
            return None;
        }

        Some(Self {
            payload_type: fixed[1] & 0x7F,
            marker: fixed[1] & 0x80 != 0,
            sequence_number: u16::from_be_bytes([fixed[2], fixed[3]]),
            timestamp: u32::from_be_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]),
            ssrc: u32::from_be_bytes([fixed[8], fixed[9], fixed[10], fixed[11]]),
            payload: data.slice(payload_start..payload_end),
        })
    }
}

/// Fixed header, CSRC list and header extension.
fn header_len(data: &[u8]) -> Option<usize> {
    let csrc_count = (data[0] & 0x0F) as usize;
    let mut len = FIXED_HEADER_LEN + 4 * csrc_count;
    if data[0] & 0x10 != 0 {
        let extension = data.get(len..len + 4)?;
        let words = u16::from_be_bytes([extension[2], extension[3]]) as usize;
        len += 4 + 4 * words;
    }
    (len <= data.len()).then_some(len)
}

/// End of the payload once any padding is stripped.
fn payload_end(data: &[u8]) -> Option<usize> {
    if data[0] & 0x20 == 0 {
        return Some(data.len());
    }
    match *data.last()? as usize {
        0 => None,
        pad_len => data.len().checked_sub(pad_len),
    }
}
