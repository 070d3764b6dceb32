//! CCSDS Encapsulation Packet header (133.1-B).
//!
//! The first octet selects one of four header formats. The header length, and therefore the
//! position of the packet length field, is known once the first octet has been read.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Encapsulation packet header.
///
/// # Example
/// ```
/// use ccsds_datalink::encapsulation::EncapsulationHeader;
///
/// // PVN 7, protocol id 2, length of length 2
/// let dat = [0xea, 0x00, 0x00, 0x10];
/// let header = EncapsulationHeader::decode(&dat).unwrap();
/// assert_eq!(header.header_len(), 4);
/// assert_eq!(header.total_len(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EncapsulationHeader {
    pub version: u8,
    pub protocol_id: u8,
    pub length_of_length: u8,
    /// Present for 4 and 8 byte headers
    pub user_defined: u8,
    /// Present for 4 and 8 byte headers
    pub protocol_id_extension: u8,
    /// Present for 8 byte headers
    pub ccsds_defined: u16,
    /// Total packet length, including the header. Always 1 for a 1 byte header.
    pub packet_length: u32,
}

impl EncapsulationHeader {
    /// Packet version number for encapsulation packets
    pub const VERSION: u8 = 7;
    /// Protocol id of idle packets
    pub const PROTOCOL_ID_IDLE: u8 = 0;
    /// Largest possible header
    pub const MAX_LEN: usize = 8;

    /// Header length indicated by the first octet of a packet.
    #[must_use]
    pub fn header_len_from_first(first: u8) -> usize {
        1 << (first & 0x3)
    }

    /// Decode from bytes. Returns `None` if there are not enough bytes for the header format
    /// indicated by the first octet.
    #[must_use]
    pub fn decode(buf: &[u8]) -> Option<Self> {
        let first = *buf.first()?;
        let len = Self::header_len_from_first(first);
        if buf.len() < len {
            return None;
        }
        let mut header = EncapsulationHeader {
            version: first >> 5,
            protocol_id: (first >> 2) & 0x7,
            length_of_length: first & 0x3,
            ..Default::default()
        };
        header.packet_length = match len {
            1 => 1,
            2 => u32::from(buf[1]),
            4 => {
                header.user_defined = buf[1] >> 4;
                header.protocol_id_extension = buf[1] & 0xf;
                u32::from(u16::from_be_bytes([buf[2], buf[3]]))
            }
            _ => {
                header.user_defined = buf[1] >> 4;
                header.protocol_id_extension = buf[1] & 0xf;
                header.ccsds_defined = u16::from_be_bytes([buf[2], buf[3]]);
                u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]])
            }
        };
        Some(header)
    }

    /// Encode into header bytes using the format indicated by `length_of_length`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(&self) -> Vec<u8> {
        let first =
            ((self.version & 0x7) << 5) | ((self.protocol_id & 0x7) << 2) | (self.length_of_length & 0x3);
        let second = ((self.user_defined & 0xf) << 4) | (self.protocol_id_extension & 0xf);
        let mut dat = vec![first];
        match self.length_of_length & 0x3 {
            0 => {}
            1 => dat.push(self.packet_length as u8),
            2 => {
                dat.push(second);
                dat.extend_from_slice(&(self.packet_length as u16).to_be_bytes());
            }
            _ => {
                dat.push(second);
                dat.extend_from_slice(&self.ccsds_defined.to_be_bytes());
                dat.extend_from_slice(&self.packet_length.to_be_bytes());
            }
        }
        dat
    }

    #[must_use]
    pub fn header_len(&self) -> usize {
        Self::header_len_from_first(self.length_of_length)
    }

    /// Total packet length in bytes, including this header.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.packet_length as usize
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.protocol_id == Self::PROTOCOL_ID_IDLE
    }
}
