mod builder;

pub use builder::TmFrameBuilder;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::{check_version, Clcw, Scid, Vcid, Zones};
use crate::{Error, Result};

/// TM Transfer Frame primary header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TmHeader {
    pub version: u8,
    pub scid: Scid,
    pub vcid: Vcid,
    pub ocf_present: bool,
    pub mc_frame_count: u8,
    pub vc_frame_count: u8,
    pub secondary_header_present: bool,
    /// When set the data field is not packet synchronous and the first header pointer is
    /// undefined.
    pub sync: bool,
    pub packet_order: bool,
    pub segment_length_id: u8,
    pub first_header_pointer: u16,
}

impl TmHeader {
    /// Primary header length in bytes
    pub const LEN: usize = 6;
    /// Transfer frame version number for TM frames
    pub const VERSION: u8 = 0;
    /// Number of distinct virtual channel frame count values
    pub const COUNTER_MODULUS: u32 = 256;
    /// Max spacecraft id (10 bits)
    pub const SCID_MAX: Scid = 0x3ff;
    /// Max virtual channel id (3 bits)
    pub const VCID_MAX: Vcid = 0x7;
    /// First header pointer value indicating the frame contains only idle data
    pub const FHP_IDLE: u16 = 0x7fe;
    /// First header pointer value indicating no packet starts in this frame
    pub const FHP_NO_PACKET: u16 = 0x7ff;

    /// Construct from the provided bytes, or `None` if there are not enough bytes.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }

        let x = u16::from_be_bytes([dat[0], dat[1]]);
        let status = u16::from_be_bytes([dat[4], dat[5]]);
        Some(TmHeader {
            version: (dat[0] >> 6) & 0x3,
            scid: (x >> 4) & 0x3ff,
            vcid: (x >> 1) & 0x7,
            ocf_present: x & 0x1 == 1,
            mc_frame_count: dat[2],
            vc_frame_count: dat[3],
            secondary_header_present: (status >> 15) & 0x1 == 1,
            sync: (status >> 14) & 0x1 == 1,
            packet_order: (status >> 13) & 0x1 == 1,
            segment_length_id: ((status >> 11) & 0x3) as u8,
            first_header_pointer: status & 0x7ff,
        })
    }

    /// Encode into header bytes. Fields wider than their bit widths are truncated.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::LEN] {
        let x = (u16::from(self.version & 0x3) << 14)
            | ((self.scid & 0x3ff) << 4)
            | ((self.vcid & 0x7) << 1)
            | u16::from(self.ocf_present);
        let status = (u16::from(self.secondary_header_present) << 15)
            | (u16::from(self.sync) << 14)
            | (u16::from(self.packet_order) << 13)
            | (u16::from(self.segment_length_id & 0x3) << 11)
            | (self.first_header_pointer & 0x7ff);
        let x = x.to_be_bytes();
        let status = status.to_be_bytes();
        [
            x[0],
            x[1],
            self.mc_frame_count,
            self.vc_frame_count,
            status[0],
            status[1],
        ]
    }
}

/// Out-of-band parameters required to decode a [TmFrame].
#[derive(Debug, Clone, TypedBuilder)]
pub struct TmConfig {
    #[builder(default = true)]
    pub fecf_present: bool,
    #[builder(default)]
    pub security_header_length: usize,
    #[builder(default)]
    pub security_trailer_length: usize,
    /// Fail decoding when the FECF does not match rather than marking the frame invalid.
    #[builder(default)]
    pub strict: bool,
}

impl Default for TmConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A decoded TM Transfer Frame.
///
/// # Example
/// ```
/// use ccsds_datalink::framing::{TmConfig, TmFrame};
///
/// let mut dat = vec![
///     0x12, 0x34, // version 0, scid 291, vcid 2, no ocf
///     0x01, 0x02, // mc count 1, vc count 2
///     0x18, 0x00, // segment length id 3, first header pointer 0
/// ];
/// dat.resize(32, 0xaa);
///
/// let config = TmConfig::builder().fecf_present(false).build();
/// let frame = TmFrame::decode(dat, &config).unwrap();
/// assert_eq!(frame.header().scid, 291);
/// assert_eq!(frame.header().vcid, 2);
/// assert_eq!(frame.data_field().len(), 26);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmFrame {
    header: TmHeader,
    data: Vec<u8>,
    zones: Zones,
    valid: bool,
}

impl TmFrame {
    /// Decode `dat` into a frame.
    ///
    /// # Errors
    /// * [Error::Version] if the version is not [TmHeader::VERSION]; checked first
    /// * [Error::NotEnoughData] if `dat` cannot contain the configured fields
    /// * [Error::Pointer] if the first header pointer is outside of the data field
    /// * [Error::Fecf] if `config.strict` and the FECF does not match
    pub fn decode(dat: Vec<u8>, config: &TmConfig) -> Result<Self> {
        check_version(&dat, TmHeader::VERSION, TmHeader::LEN)?;
        let header = TmHeader::decode(&dat).ok_or(Error::NotEnoughData {
            actual: dat.len(),
            minimum: TmHeader::LEN,
        })?;

        let mut header_end = TmHeader::LEN;
        if header.secondary_header_present {
            let Some(id) = dat.get(TmHeader::LEN) else {
                return Err(Error::NotEnoughData {
                    actual: dat.len(),
                    minimum: TmHeader::LEN + 1,
                });
            };
            // length field is the secondary header length minus 1, including the id byte
            header_end += usize::from(id & 0x3f) + 1;
        }
        let zones = Zones::compute(
            dat.len(),
            header_end,
            config.security_header_length,
            config.security_trailer_length,
            header.ocf_present,
            config.fecf_present,
        )?;

        let fhp = header.first_header_pointer;
        let zone_length = zones.data_field_end - zones.data_field_start;
        if !header.sync
            && fhp != TmHeader::FHP_IDLE
            && fhp != TmHeader::FHP_NO_PACKET
            && usize::from(fhp) >= zone_length
        {
            return Err(Error::Pointer {
                name: "first header",
                value: fhp.into(),
                zone_length,
            });
        }

        let valid = zones.check_fecf(&dat, config.strict)?;

        Ok(TmFrame {
            header,
            data: dat,
            zones,
            valid,
        })
    }

    #[must_use]
    pub fn header(&self) -> &TmHeader {
        &self.header
    }

    /// All frame bytes, including header and trailer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The secondary header, including its identification byte, if present.
    #[must_use]
    pub fn secondary_header(&self) -> Option<&[u8]> {
        if self.header.secondary_header_present {
            Some(&self.data[TmHeader::LEN..self.zones.security_header_start])
        } else {
            None
        }
    }

    /// Secondary header data without the identification byte, if present.
    #[must_use]
    pub fn secondary_header_data(&self) -> Option<&[u8]> {
        self.secondary_header().map(|h| &h[1..])
    }

    #[must_use]
    pub fn security_header(&self) -> &[u8] {
        self.zones.security_header(&self.data)
    }

    #[must_use]
    pub fn security_trailer(&self) -> &[u8] {
        self.zones.security_trailer(&self.data)
    }

    #[must_use]
    pub fn data_field_start(&self) -> usize {
        self.zones.data_field_start
    }

    #[must_use]
    pub fn data_field(&self) -> &[u8] {
        self.zones.data_field(&self.data)
    }

    #[must_use]
    pub fn ocf(&self) -> Option<&[u8]> {
        self.zones.ocf(&self.data)
    }

    /// The CLCW carried in the OCF, if there is an OCF and it holds a CLCW.
    #[must_use]
    pub fn clcw(&self) -> Option<Clcw> {
        self.ocf().and_then(Clcw::decode)
    }

    #[must_use]
    pub fn fecf(&self) -> Option<u16> {
        self.zones.fecf(&self.data)
    }

    /// False only if a FECF is present and does not match the frame contents.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// True if the first header pointer indicates the frame contains only idle data.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.header.first_header_pointer == TmHeader::FHP_IDLE
    }

    /// True if no packet starts in this frame.
    #[must_use]
    pub fn contains_no_packet_start(&self) -> bool {
        self.header.first_header_pointer == TmHeader::FHP_NO_PACKET
    }

    #[must_use]
    pub fn first_header_pointer(&self) -> u16 {
        self.header.first_header_pointer
    }
}
