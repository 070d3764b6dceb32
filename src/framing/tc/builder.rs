use super::{ControlCommand, SegmentHeader, SequenceFlag, TcConfig, TcFrame, TcHeader};
use crate::framing::{check_range, FrameStaging, Scid, Vcid, FECF_LEN};
use crate::{Error, Result};

/// Builds a [TcFrame] of an explicit length.
///
/// Data frames are created with [new](Self::new) and are type AD unless
/// [bypass](Self::bypass) is set. Control command (BC) frames are created with
/// [control_command](Self::control_command) and carry no user data.
///
/// # Example
/// ```
/// use ccsds_datalink::framing::{SequenceFlag, TcFrameBuilder};
///
/// let mut builder = TcFrameBuilder::new(16, true, true).unwrap();
/// builder
///     .scid(100).unwrap()
///     .vcid(2).unwrap()
///     .segment_header(SequenceFlag::Unsegmented, 1).unwrap();
/// builder.add_data(&[0x11; 8]);
///
/// let frame = builder.build().unwrap();
/// assert_eq!(frame.header().frame_length, 16);
/// assert_eq!(frame.map_id(), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct TcFrameBuilder {
    header: TcHeader,
    segmented: bool,
    segment_header: Option<SegmentHeader>,
    security_header_length: usize,
    security_trailer_length: usize,
    staging: FrameStaging,
}

impl TcFrameBuilder {
    /// Create a builder for a data frame of `length` bytes.
    ///
    /// # Errors
    /// [Error::OutOfRange] if `length` is more than [TcHeader::MAX_LEN], or
    /// [Error::NotEnoughData] if `length` cannot hold the requested fields.
    pub fn new(length: usize, segmented: bool, fecf_present: bool) -> Result<Self> {
        Self::with_config(
            length,
            &TcConfig::builder()
                .segmented(segmented)
                .fecf_present(fecf_present)
                .build(),
        )
    }

    /// Create a builder for a data frame of `length` bytes using the same parameters used to
    /// decode, which allows for a security header and trailer.
    ///
    /// # Errors
    /// See [new](Self::new).
    pub fn with_config(length: usize, config: &TcConfig) -> Result<Self> {
        check_range("frame length", length, TcHeader::MAX_LEN)?;
        let header_end = if config.segmented {
            TcHeader::LEN + SegmentHeader::LEN
        } else {
            TcHeader::LEN
        };
        let staging = FrameStaging::new(
            length,
            header_end,
            config.security_header_length,
            config.security_trailer_length,
            false,
            config.fecf_present,
            0,
        )?;
        #[allow(clippy::cast_possible_truncation)]
        let frame_length = length as u16;
        Ok(TcFrameBuilder {
            header: TcHeader {
                frame_length,
                ..Default::default()
            },
            segmented: config.segmented,
            segment_header: None,
            security_header_length: config.security_header_length,
            security_trailer_length: config.security_trailer_length,
            staging,
        })
    }

    /// Create a builder for a BC frame carrying `command`. The frame length is determined by
    /// the command and the builder is full on creation.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if the command does not fit in a frame.
    pub fn control_command(command: &ControlCommand, fecf_present: bool) -> Result<Self> {
        let body = command.encode();
        let fecf_len = if fecf_present { FECF_LEN } else { 0 };
        let length = TcHeader::LEN + body.len() + fecf_len;
        let mut builder = Self::new(length, false, fecf_present)?;
        builder.header.bypass = true;
        builder.header.control_command = true;
        builder.add_data(&body);
        Ok(builder)
    }

    /// # Errors
    /// [Error::OutOfRange] if `scid` is more than 10 bits.
    pub fn scid(&mut self, scid: Scid) -> Result<&mut Self> {
        check_range("scid", scid.into(), TcHeader::SCID_MAX.into())?;
        self.header.scid = scid;
        Ok(self)
    }

    /// # Errors
    /// [Error::OutOfRange] if `vcid` is more than 6 bits.
    pub fn vcid(&mut self, vcid: Vcid) -> Result<&mut Self> {
        check_range("vcid", vcid.into(), TcHeader::VCID_MAX.into())?;
        self.header.vcid = vcid;
        Ok(self)
    }

    pub fn frame_seq_num(&mut self, num: u8) -> &mut Self {
        self.header.frame_seq_num = num;
        self
    }

    /// Set the bypass flag making this a BD rather than AD frame. Has no effect on control
    /// command frames.
    pub fn bypass(&mut self, bypass: bool) -> &mut Self {
        if !self.header.control_command {
            self.header.bypass = bypass;
        }
        self
    }

    /// # Errors
    /// * [Error::FieldLength] if the builder was not created as segmented
    /// * [Error::OutOfRange] if `map_id` is more than 6 bits
    pub fn segment_header(&mut self, sequence_flag: SequenceFlag, map_id: u8) -> Result<&mut Self> {
        if !self.segmented {
            return Err(Error::FieldLength {
                field: "segment header",
                expected: 0,
                actual: SegmentHeader::LEN,
            });
        }
        check_range("map id", map_id.into(), SegmentHeader::MAP_ID_MAX.into())?;
        self.segment_header = Some(SegmentHeader {
            sequence_flag,
            map_id,
        });
        Ok(self)
    }

    /// # Errors
    /// [Error::FieldLength] if `dat` is not the security header length.
    pub fn security_header(&mut self, dat: &[u8]) -> Result<&mut Self> {
        self.staging.set_security_header(dat)?;
        Ok(self)
    }

    /// # Errors
    /// [Error::FieldLength] if `dat` is not the security trailer length.
    pub fn security_trailer(&mut self, dat: &[u8]) -> Result<&mut Self> {
        self.staging.set_security_trailer(dat)?;
        Ok(self)
    }

    /// Add user data to the frame returning the number of bytes in `dat` that did not fit.
    pub fn add_data(&mut self, dat: &[u8]) -> usize {
        self.staging.add_data(dat)
    }

    #[must_use]
    pub fn free_user_data_length(&self) -> usize {
        self.staging.free_user_data_length()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free_user_data_length() == 0
    }

    /// Encode the frame, computing the FECF last if present.
    ///
    /// # Errors
    /// * [Error::NotFull] if there is remaining free user data space
    /// * [Error::FieldUnset] if a declared optional field was not set
    pub fn build(&self) -> Result<TcFrame> {
        self.staging.check_complete()?;
        let mut staging = self.staging.clone();
        staging.buf[..TcHeader::LEN].copy_from_slice(&self.header.encode());
        if self.segmented {
            let Some(segment_header) = self.segment_header else {
                return Err(Error::FieldUnset("segment header"));
            };
            staging.buf[TcHeader::LEN] = segment_header.encode();
        }
        let config = TcConfig::builder()
            .segmented(self.segmented)
            .fecf_present(staging.zones.fecf_present)
            .security_header_length(self.security_header_length)
            .security_trailer_length(self.security_trailer_length)
            .build();
        TcFrame::decode(staging.finish(), &config)
    }
}
