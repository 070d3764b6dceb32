mod builder;

pub use builder::AosFrameBuilder;

use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::{check_version, fhec_valid, Clcw, Scid, Vcid, Zones, FHEC_LEN};
use crate::{Error, Result};

/// The kind of data carried in the data field of an AOS frame. This cannot be determined from
/// the frame bytes and must be known for a virtual channel ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UserDataType {
    /// Multiplexing protocol data unit; carries packets.
    #[default]
    Mpdu,
    /// Bitstream protocol data unit.
    Bpdu,
    /// Virtual channel access service data unit.
    Vca,
    /// Idle data only.
    Idle,
}

impl Display for UserDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Mpdu => "M_PDU",
            Self::Bpdu => "B_PDU",
            Self::Vca => "VCA_SDU",
            Self::Idle => "IDLE",
        };
        write!(f, "{s}")
    }
}

/// AOS Transfer Frame primary header.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AosHeader {
    pub version: u8,
    pub scid: Scid,
    pub vcid: Vcid,
    pub vc_frame_count: u32,
    pub replay: bool,
    /// Indicates whether the frame count cycle is in use.
    pub vc_frame_count_usage: bool,
    pub vc_frame_count_cycle: u8,
}

impl AosHeader {
    /// Primary header length in bytes, not including the FHEC
    pub const LEN: usize = 6;
    /// Transfer frame version number for AOS frames
    pub const VERSION: u8 = 1;
    /// VCID indicating an idle frame
    pub const VCID_IDLE: Vcid = 63;
    /// Number of distinct virtual channel frame count values
    pub const COUNTER_MODULUS: u32 = 0x100_0000;
    /// Max spacecraft id (8 bits)
    pub const SCID_MAX: Scid = 0xff;
    /// Max virtual channel id (6 bits)
    pub const VCID_MAX: Vcid = 0x3f;
    /// Max virtual channel frame count (24 bits)
    pub const COUNTER_MAX: u32 = 0xff_ffff;

    /// Construct from the provided bytes, or `None` if there are not enough bytes.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }

        let x = u16::from_be_bytes([dat[0], dat[1]]);
        Some(AosHeader {
            version: (dat[0] >> 6) & 0x3,
            scid: ((x >> 6) & 0xff),
            vcid: (x & 0x3f),
            vc_frame_count: u32::from_be_bytes([0, dat[2], dat[3], dat[4]]),
            replay: (dat[5] >> 7) & 0x1 == 1,
            vc_frame_count_usage: (dat[5] >> 6) & 0x1 == 1,
            vc_frame_count_cycle: dat[5] & 0xf,
        })
    }

    /// Encode into header bytes. Fields wider than their bit widths are truncated.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::LEN] {
        let x = (u16::from(self.version & 0x3) << 14)
            | ((self.scid & 0xff) << 6)
            | (self.vcid & 0x3f);
        let x = x.to_be_bytes();
        let count = (self.vc_frame_count & Self::COUNTER_MAX).to_be_bytes();
        let signaling = (u8::from(self.replay) << 7)
            | (u8::from(self.vc_frame_count_usage) << 6)
            | (self.vc_frame_count_cycle & 0xf);
        [x[0], x[1], count[1], count[2], count[3], signaling]
    }
}

/// Out-of-band parameters required to decode an [AosFrame].
#[derive(Debug, Clone, TypedBuilder)]
pub struct AosConfig {
    #[builder(default)]
    pub fhec_present: bool,
    #[builder(default)]
    pub insert_zone_length: usize,
    #[builder(default)]
    pub user_data_type: UserDataType,
    #[builder(default)]
    pub ocf_present: bool,
    #[builder(default = true)]
    pub fecf_present: bool,
    #[builder(default)]
    pub security_header_length: usize,
    #[builder(default)]
    pub security_trailer_length: usize,
    /// Fail decoding when the FECF or FHEC do not match rather than marking the frame invalid.
    #[builder(default)]
    pub strict: bool,
}

impl Default for AosConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A decoded AOS Transfer Frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AosFrame {
    header: AosHeader,
    data: Vec<u8>,
    zones: Zones,
    fhec_present: bool,
    insert_zone_length: usize,
    user_data_type: UserDataType,
    // M_PDU first header pointer or B_PDU bitstream data pointer
    pointer: Option<u16>,
    valid: bool,
    header_valid: bool,
}

impl AosFrame {
    /// M_PDU/B_PDU header length in bytes.
    pub const PDU_HEADER_LEN: usize = 2;
    /// M_PDU first header pointer value indicating idle data
    pub const FHP_IDLE: u16 = 0x7fe;
    /// M_PDU first header pointer value indicating no packet starts in this frame
    pub const FHP_NO_PACKET: u16 = 0x7ff;
    /// B_PDU bitstream data pointer value indicating idle data
    pub const BDP_IDLE: u16 = 0x3ffe;
    /// B_PDU bitstream data pointer value indicating all bits are valid data
    pub const BDP_ALL_DATA: u16 = 0x3fff;

    /// Decode `dat` into a frame.
    ///
    /// # Errors
    /// * [Error::Version] if the version is not [AosHeader::VERSION]; checked first
    /// * [Error::NotEnoughData] if `dat` cannot contain the configured fields
    /// * [Error::Pointer] if the M_PDU or B_PDU pointer is outside of its zone
    /// * [Error::Fecf] or [Error::Fhec] if `config.strict` and either does not match
    pub fn decode(dat: Vec<u8>, config: &AosConfig) -> Result<Self> {
        check_version(&dat, AosHeader::VERSION, AosHeader::LEN)?;
        let header = AosHeader::decode(&dat).ok_or(Error::NotEnoughData {
            actual: dat.len(),
            minimum: AosHeader::LEN,
        })?;

        let fhec_len = if config.fhec_present { FHEC_LEN } else { 0 };
        let header_end = AosHeader::LEN + fhec_len + config.insert_zone_length;
        let zones = Zones::compute(
            dat.len(),
            header_end,
            config.security_header_length,
            config.security_trailer_length,
            config.ocf_present,
            config.fecf_present,
        )?;

        let header_valid = if config.fhec_present {
            let ok = fhec_valid(&dat[..AosHeader::LEN], &dat[AosHeader::LEN..][..FHEC_LEN]);
            if !ok && config.strict {
                return Err(Error::Fhec);
            }
            ok
        } else {
            true
        };

        let pointer = match config.user_data_type {
            UserDataType::Mpdu | UserDataType::Bpdu => {
                Some(Self::decode_pointer(&dat, &zones, config.user_data_type)?)
            }
            UserDataType::Vca | UserDataType::Idle => None,
        };

        let valid = zones.check_fecf(&dat, config.strict)?;

        Ok(AosFrame {
            header,
            data: dat,
            zones,
            fhec_present: config.fhec_present,
            insert_zone_length: config.insert_zone_length,
            user_data_type: config.user_data_type,
            pointer,
            valid,
            header_valid,
        })
    }

    fn decode_pointer(dat: &[u8], zones: &Zones, user_data_type: UserDataType) -> Result<u16> {
        let field_len = zones.data_field_end - zones.data_field_start;
        if field_len < Self::PDU_HEADER_LEN {
            return Err(Error::NotEnoughData {
                actual: dat.len(),
                minimum: dat.len() + Self::PDU_HEADER_LEN - field_len,
            });
        }
        let start = zones.data_field_start;
        let x = u16::from_be_bytes([dat[start], dat[start + 1]]);
        let zone_length = field_len - Self::PDU_HEADER_LEN;
        if user_data_type == UserDataType::Mpdu {
            let fhp = x & 0x7ff;
            if fhp != Self::FHP_IDLE && fhp != Self::FHP_NO_PACKET && usize::from(fhp) >= zone_length
            {
                return Err(Error::Pointer {
                    name: "first header",
                    value: fhp.into(),
                    zone_length,
                });
            }
            Ok(fhp)
        } else {
            // bitstream pointer is the last valid bit, so values up to and including the
            // number of bits in the zone are allowed
            let bdp = x & 0x3fff;
            if bdp != Self::BDP_IDLE && bdp != Self::BDP_ALL_DATA && usize::from(bdp) > zone_length * 8
            {
                return Err(Error::Pointer {
                    name: "bitstream data",
                    value: bdp.into(),
                    zone_length,
                });
            }
            Ok(bdp)
        }
    }

    #[must_use]
    pub fn header(&self) -> &AosHeader {
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

    #[must_use]
    pub fn user_data_type(&self) -> UserDataType {
        self.user_data_type
    }

    /// The frame header error control field, if present.
    #[must_use]
    pub fn fhec(&self) -> Option<&[u8]> {
        if self.fhec_present {
            Some(&self.data[AosHeader::LEN..AosHeader::LEN + FHEC_LEN])
        } else {
            None
        }
    }

    /// False only if a FHEC is present and does not match the header.
    #[must_use]
    pub fn is_header_valid(&self) -> bool {
        self.header_valid
    }

    #[must_use]
    pub fn insert_zone(&self) -> Option<&[u8]> {
        if self.insert_zone_length == 0 {
            return None;
        }
        let start = self.zones.security_header_start - self.insert_zone_length;
        Some(&self.data[start..self.zones.security_header_start])
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

    /// The full transfer frame data field, including any M_PDU or B_PDU header.
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

    /// True for idle frames; either by VCID, the configured user data type or an idle pointer
    /// value.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.header.vcid == AosHeader::VCID_IDLE
            || match self.user_data_type {
                UserDataType::Idle => true,
                UserDataType::Mpdu => self.pointer == Some(Self::FHP_IDLE),
                UserDataType::Bpdu => self.pointer == Some(Self::BDP_IDLE),
                UserDataType::Vca => false,
            }
    }

    /// The M_PDU first header pointer.
    ///
    /// # Errors
    /// [Error::UserDataType] if this is not an M_PDU frame.
    pub fn first_header_pointer(&self) -> Result<u16> {
        match (self.user_data_type, self.pointer) {
            (UserDataType::Mpdu, Some(fhp)) => Ok(fhp),
            _ => Err(Error::UserDataType(format!(
                "first header pointer requires M_PDU, frame is {}",
                self.user_data_type
            ))),
        }
    }

    /// True if this is an M_PDU frame in which no packet starts.
    #[must_use]
    pub fn contains_no_packet_start(&self) -> bool {
        self.user_data_type == UserDataType::Mpdu && self.pointer == Some(Self::FHP_NO_PACKET)
    }

    /// The B_PDU bitstream data pointer.
    ///
    /// # Errors
    /// [Error::UserDataType] if this is not a B_PDU frame.
    pub fn bitstream_data_pointer(&self) -> Result<u16> {
        match (self.user_data_type, self.pointer) {
            (UserDataType::Bpdu, Some(bdp)) => Ok(bdp),
            _ => Err(Error::UserDataType(format!(
                "bitstream data pointer requires B_PDU, frame is {}",
                self.user_data_type
            ))),
        }
    }

    /// The M_PDU packet zone following the M_PDU header.
    ///
    /// # Errors
    /// [Error::UserDataType] if this is not an M_PDU frame.
    pub fn packet_zone(&self) -> Result<&[u8]> {
        self.first_header_pointer()?;
        Ok(&self.data_field()[Self::PDU_HEADER_LEN..])
    }

    /// The B_PDU bitstream data zone following the B_PDU header.
    ///
    /// # Errors
    /// [Error::UserDataType] if this is not a B_PDU frame.
    pub fn bitstream_zone(&self) -> Result<&[u8]> {
        self.bitstream_data_pointer()?;
        Ok(&self.data_field()[Self::PDU_HEADER_LEN..])
    }

    /// Number of valid bits in the bitstream zone; 0 for idle B_PDUs.
    ///
    /// # Errors
    /// [Error::UserDataType] if this is not a B_PDU frame.
    pub fn valid_bits(&self) -> Result<usize> {
        let bdp = self.bitstream_data_pointer()?;
        Ok(match bdp {
            Self::BDP_ALL_DATA => self.bitstream_zone()?.len() * 8,
            Self::BDP_IDLE => 0,
            bits => usize::from(bits),
        })
    }
}
