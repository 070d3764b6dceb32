use crate::encapsulation::EncapsulationHeader;
use crate::spacepacket::PrimaryHeader;

/// The self-delimiting unit type reconstructed from a data zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnitKind {
    SpacePacket,
    Encapsulation,
}

impl UnitKind {
    /// Number of bytes required to know the total length of a unit starting with `partial`.
    ///
    /// For encapsulation packets this depends on the first byte so the result changes once the
    /// first byte is available.
    pub fn header_len(self, partial: &[u8]) -> usize {
        match self {
            Self::SpacePacket => PrimaryHeader::LEN,
            Self::Encapsulation => partial
                .first()
                .map_or(1, |b| EncapsulationHeader::header_len_from_first(*b)),
        }
    }

    /// Total unit length, or `None` if `header` does not hold a complete header.
    pub fn total_len(self, header: &[u8]) -> Option<usize> {
        match self {
            Self::SpacePacket => PrimaryHeader::decode(header).map(|h| h.total_len()),
            Self::Encapsulation => EncapsulationHeader::decode(header).map(|h| h.total_len()),
        }
    }
}

/// A unit that started in a previous frame and is waiting on more data.
#[derive(Debug, Clone, Default)]
pub(crate) struct PartialUnit {
    pub buf: Vec<u8>,
    /// Known once the full header has been read
    pub total: Option<usize>,
}

impl PartialUnit {
    /// `total` comes from the unit header so it is not trusted for allocation; the buffer
    /// grows as data arrives.
    pub fn new(dat: &[u8], total: Option<usize>) -> Self {
        PartialUnit {
            buf: dat.to_vec(),
            total,
        }
    }
}
