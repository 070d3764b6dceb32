//! CCSDS Space Packet primary header.
//!
//! Only as much of the packet as is required to delimit packets in a virtual channel data zone;
//! packet contents are left to the consumer.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub type Apid = u16;

/// CCSDS Primary Header
///
/// The primary header format is common to all CCSDS space packets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrimaryHeader {
    pub version: u8,
    pub type_flag: u8,
    pub has_secondary_header: bool,
    pub apid: Apid,
    /// Packet grouping; 3 for standalone packets
    pub sequence_flags: u8,
    pub sequence_id: u16,
    pub len_minus1: u16,
}

impl PrimaryHeader {
    /// Size of a ``PrimaryHeader``
    pub const LEN: usize = 6;
    /// APID reserved for idle packets
    pub const APID_IDLE: Apid = 0x7ff;

    /// Decode from bytes. Returns `None` if there are not enough bytes to construct the
    /// header.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::LEN {
            return None;
        }
        let d1 = u16::from_be_bytes([buf[0], buf[1]]);
        let d2 = u16::from_be_bytes([buf[2], buf[3]]);
        let d3 = u16::from_be_bytes([buf[4], buf[5]]);

        Some(PrimaryHeader {
            version: (d1 >> 13 & 0x7) as u8,
            type_flag: (d1 >> 12 & 0x1) as u8,
            has_secondary_header: (d1 >> 11 & 0x1) == 1,
            apid: (d1 & 0x7ff),
            sequence_flags: (d2 >> 14 & 0x3) as u8,
            sequence_id: (d2 & 0x3fff),
            len_minus1: d3,
        })
    }

    #[must_use]
    pub fn encode(&self) -> [u8; Self::LEN] {
        let d1 = (u16::from(self.version & 0x7) << 13)
            | (u16::from(self.type_flag & 0x1) << 12)
            | (u16::from(self.has_secondary_header) << 11)
            | (self.apid & 0x7ff);
        let d2 = (u16::from(self.sequence_flags & 0x3) << 14) | (self.sequence_id & 0x3fff);
        let [a, b] = d1.to_be_bytes();
        let [c, d] = d2.to_be_bytes();
        let [e, f] = self.len_minus1.to_be_bytes();
        [a, b, c, d, e, f]
    }

    /// Total packet length in bytes, including this header.
    #[must_use]
    pub fn total_len(&self) -> usize {
        Self::LEN + usize::from(self.len_minus1) + 1
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.apid == Self::APID_IDLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_header() {
        let dat: [u8; 6] = [0xd, 0x59, 0xd2, 0xab, 0x0, 0x8];
        let ph = PrimaryHeader::decode(&dat).unwrap();

        assert_eq!(ph.version, 0);
        assert_eq!(ph.type_flag, 0);
        assert!(ph.has_secondary_header);
        assert_eq!(ph.apid, 1369);
        assert_eq!(ph.sequence_flags, 3);
        assert_eq!(ph.sequence_id, 4779);
        assert_eq!(ph.len_minus1, 8);
        assert_eq!(ph.total_len(), 15);
        assert_eq!(ph.encode(), dat);
    }

    #[test]
    fn test_decode_header_too_short() {
        assert!(PrimaryHeader::decode(&[0u8; 5]).is_none());
    }

    #[test]
    fn test_idle_apid() {
        let ph = PrimaryHeader::decode(&[0x07, 0xff, 0xc0, 0x00, 0x00, 0x00]).unwrap();
        assert!(ph.is_idle());
        assert_eq!(ph.total_len(), 7);
    }
}
