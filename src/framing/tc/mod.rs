mod builder;

pub use builder::TcFrameBuilder;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::{check_version, Scid, Vcid, Zones};
use crate::{Error, Result};

/// TC Transfer Frame primary header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TcHeader {
    pub version: u8,
    pub bypass: bool,
    pub control_command: bool,
    pub scid: Scid,
    pub vcid: Vcid,
    /// Total frame length in bytes. Encoded on the wire as length minus 1.
    pub frame_length: u16,
    pub frame_seq_num: u8,
}

impl TcHeader {
    /// Primary header length in bytes
    pub const LEN: usize = 5;
    /// Transfer frame version number for TC frames
    pub const VERSION: u8 = 0;
    /// Max total frame length in bytes
    pub const MAX_LEN: usize = 1024;
    /// Number of distinct frame sequence number values
    pub const COUNTER_MODULUS: u32 = 256;
    /// Max spacecraft id (10 bits)
    pub const SCID_MAX: Scid = 0x3ff;
    /// Max virtual channel id (6 bits)
    pub const VCID_MAX: Vcid = 0x3f;

    /// Construct from the provided bytes, or `None` if there are not enough bytes.
    #[must_use]
    pub fn decode(dat: &[u8]) -> Option<Self> {
        if dat.len() < Self::LEN {
            return None;
        }
        let x = u16::from_be_bytes([dat[0], dat[1]]);
        let y = u16::from_be_bytes([dat[2], dat[3]]);
        Some(TcHeader {
            version: (dat[0] >> 6) & 0x3,
            bypass: (dat[0] >> 5) & 0x1 == 1,
            control_command: (dat[0] >> 4) & 0x1 == 1,
            scid: x & 0x3ff,
            vcid: (y >> 10) & 0x3f,
            frame_length: (y & 0x3ff) + 1,
            frame_seq_num: dat[4],
        })
    }

    /// Encode into header bytes. Fields wider than their bit widths are truncated.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::LEN] {
        let x = (u16::from(self.version & 0x3) << 14)
            | (u16::from(self.bypass) << 13)
            | (u16::from(self.control_command) << 12)
            | (self.scid & 0x3ff);
        let y = ((self.vcid & 0x3f) << 10) | (self.frame_length.saturating_sub(1) & 0x3ff);
        let x = x.to_be_bytes();
        let y = y.to_be_bytes();
        [x[0], x[1], y[0], y[1], self.frame_seq_num]
    }

    #[must_use]
    pub fn frame_type(&self) -> TcFrameType {
        match (self.bypass, self.control_command) {
            (false, false) => TcFrameType::Ad,
            (false, true) => TcFrameType::Reserved,
            (true, false) => TcFrameType::Bd,
            (true, true) => TcFrameType::Bc,
        }
    }
}

/// Frame type as determined by the bypass and control command flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TcFrameType {
    /// Sequence controlled data
    Ad,
    /// Control command flag without bypass; not valid
    Reserved,
    /// Expedited data
    Bd,
    /// Expedited control command
    Bc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SequenceFlag {
    Continue,
    First,
    Last,
    Unsegmented,
}

impl SequenceFlag {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0b00 => Self::Continue,
            0b01 => Self::First,
            0b10 => Self::Last,
            _ => Self::Unsegmented,
        }
    }

    fn bits(self) -> u8 {
        match self {
            Self::Continue => 0b00,
            Self::First => 0b01,
            Self::Last => 0b10,
            Self::Unsegmented => 0b11,
        }
    }

    /// True if a unit starts at the beginning of a segment with this flag.
    #[must_use]
    pub fn starts_unit(self) -> bool {
        matches!(self, Self::First | Self::Unsegmented)
    }
}

/// Segment header of a segmented TC frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentHeader {
    pub sequence_flag: SequenceFlag,
    pub map_id: u8,
}

impl SegmentHeader {
    pub const LEN: usize = 1;
    /// Max MAP id (6 bits)
    pub const MAP_ID_MAX: u8 = 0x3f;

    #[must_use]
    pub fn decode(byte: u8) -> Self {
        SegmentHeader {
            sequence_flag: SequenceFlag::from_bits(byte >> 6),
            map_id: byte & 0x3f,
        }
    }

    #[must_use]
    pub fn encode(&self) -> u8 {
        (self.sequence_flag.bits() << 6) | (self.map_id & 0x3f)
    }
}

/// COP-1 control command carried in the data field of a BC frame.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ControlCommand {
    Unlock,
    /// Set V(R) to the provided value
    SetVr(u8),
    /// Any other data field contents
    Reserved(Vec<u8>),
}

impl ControlCommand {
    const UNLOCK: [u8; 1] = [0x00];
    const SET_VR: [u8; 2] = [0x82, 0x00];

    #[must_use]
    pub fn decode(dat: &[u8]) -> Self {
        match dat {
            [0x00] => Self::Unlock,
            [0x82, 0x00, vr] => Self::SetVr(*vr),
            _ => Self::Reserved(dat.to_vec()),
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Unlock => Self::UNLOCK.to_vec(),
            Self::SetVr(vr) => {
                let mut dat = Self::SET_VR.to_vec();
                dat.push(*vr);
                dat
            }
            Self::Reserved(dat) => dat.clone(),
        }
    }
}

/// Out-of-band parameters required to decode a [TcFrame].
#[derive(Debug, Clone, TypedBuilder)]
pub struct TcConfig {
    /// Data frames carry a segment header. Never applies to control command frames.
    #[builder(default)]
    pub segmented: bool,
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

impl Default for TcConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A decoded TC Transfer Frame.
///
/// # Example
/// ```
/// use ccsds_datalink::framing::{ControlCommand, TcConfig, TcFrame, TcFrameType};
///
/// let dat = vec![
///     0x31, 0x23, // version 0, bypass, control command, scid 291
///     0x14, 0x07, // vcid 5, length 8
///     0x00, // sequence number
///     0x82, 0x00, 0x2a, // set V(R) 42
/// ];
/// let config = TcConfig::builder().fecf_present(false).build();
/// let frame = TcFrame::decode(dat, &config).unwrap();
/// assert_eq!(frame.frame_type(), TcFrameType::Bc);
/// assert_eq!(frame.control_command(), Some(ControlCommand::SetVr(42)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcFrame {
    header: TcHeader,
    data: Vec<u8>,
    zones: Zones,
    segment_header: Option<SegmentHeader>,
    valid: bool,
}

impl TcFrame {
    /// Decode `dat` into a frame.
    ///
    /// # Errors
    /// * [Error::Version] if the version is not [TcHeader::VERSION]; checked first
    /// * [Error::FrameLength] if the header length field does not match the length of `dat`
    /// * [Error::NotEnoughData] if `dat` cannot contain the configured fields
    /// * [Error::Fecf] if `config.strict` and the FECF does not match
    pub fn decode(dat: Vec<u8>, config: &TcConfig) -> Result<Self> {
        check_version(&dat, TcHeader::VERSION, TcHeader::LEN)?;
        let header = TcHeader::decode(&dat).ok_or(Error::NotEnoughData {
            actual: dat.len(),
            minimum: TcHeader::LEN,
        })?;
        if usize::from(header.frame_length) != dat.len() {
            return Err(Error::FrameLength {
                declared: header.frame_length.into(),
                actual: dat.len(),
            });
        }

        let zones;
        let mut segment_header = None;
        if header.frame_type() == TcFrameType::Bc {
            zones = Zones::compute(dat.len(), TcHeader::LEN, 0, 0, false, config.fecf_present)?;
        } else {
            let mut header_end = TcHeader::LEN;
            if config.segmented {
                let Some(byte) = dat.get(TcHeader::LEN) else {
                    return Err(Error::NotEnoughData {
                        actual: dat.len(),
                        minimum: TcHeader::LEN + SegmentHeader::LEN,
                    });
                };
                segment_header = Some(SegmentHeader::decode(*byte));
                header_end += SegmentHeader::LEN;
            }
            zones = Zones::compute(
                dat.len(),
                header_end,
                config.security_header_length,
                config.security_trailer_length,
                false,
                config.fecf_present,
            )?;
        }

        let valid = zones.check_fecf(&dat, config.strict)?;

        Ok(TcFrame {
            header,
            data: dat,
            zones,
            segment_header,
            valid,
        })
    }

    #[must_use]
    pub fn header(&self) -> &TcHeader {
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
    pub fn frame_type(&self) -> TcFrameType {
        self.header.frame_type()
    }

    /// The segment header, if the frame was decoded as segmented and is not a control
    /// command frame.
    #[must_use]
    pub fn segment_header(&self) -> Option<&SegmentHeader> {
        self.segment_header.as_ref()
    }

    #[must_use]
    pub fn map_id(&self) -> Option<u8> {
        self.segment_header.map(|h| h.map_id)
    }

    /// The decoded control command for BC frames, otherwise `None`.
    #[must_use]
    pub fn control_command(&self) -> Option<ControlCommand> {
        if self.frame_type() == TcFrameType::Bc {
            Some(ControlCommand::decode(self.data_field()))
        } else {
            None
        }
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

    /// Frame data field, not including the segment header.
    #[must_use]
    pub fn data_field(&self) -> &[u8] {
        self.zones.data_field(&self.data)
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
}
