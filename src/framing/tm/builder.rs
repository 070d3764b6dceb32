use super::{TmConfig, TmFrame, TmHeader};
use crate::framing::{check_field_len, check_range, FrameStaging, Scid, Vcid};
use crate::{Error, Result};

/// Builds a [TmFrame] of a fixed length.
///
/// User data is added with [add_data](Self::add_data) until the frame is full. A frame can
/// only be built once it is full and all optional fields declared present have been set.
///
/// # Example
/// ```
/// use ccsds_datalink::framing::TmFrameBuilder;
///
/// let mut builder = TmFrameBuilder::new(20, 0, false, true).unwrap();
/// builder.scid(42).unwrap().vcid(1).unwrap().first_header_pointer(0).unwrap();
/// assert_eq!(builder.free_user_data_length(), 12);
///
/// let remaining = builder.add_data(&[0xaa; 20]);
/// assert_eq!(remaining, 8);
///
/// let frame = builder.build().unwrap();
/// assert!(frame.is_valid());
/// ```
#[derive(Debug, Clone)]
pub struct TmFrameBuilder {
    header: TmHeader,
    secondary_header_length: usize,
    secondary_header_set: bool,
    security_header_length: usize,
    security_trailer_length: usize,
    staging: FrameStaging,
}

impl TmFrameBuilder {
    /// Max length of the secondary header data field
    pub const SECONDARY_HEADER_MAX: usize = 63;

    /// Create a builder for a frame of `length` bytes.
    ///
    /// `secondary_header_length` is the length of the secondary header data, not including
    /// the identification byte; 0 means no secondary header.
    ///
    /// # Errors
    /// [Error::OutOfRange] if the secondary header is too long, or [Error::NotEnoughData] if
    /// `length` cannot hold the requested fields.
    pub fn new(
        length: usize,
        secondary_header_length: usize,
        ocf_present: bool,
        fecf_present: bool,
    ) -> Result<Self> {
        Self::with_security(
            length,
            secondary_header_length,
            ocf_present,
            fecf_present,
            0,
            0,
        )
    }

    /// Same as [new](Self::new), but also reserves space for a security header and trailer.
    ///
    /// # Errors
    /// See [new](Self::new).
    pub fn with_security(
        length: usize,
        secondary_header_length: usize,
        ocf_present: bool,
        fecf_present: bool,
        security_header_length: usize,
        security_trailer_length: usize,
    ) -> Result<Self> {
        check_range(
            "secondary header length",
            secondary_header_length,
            Self::SECONDARY_HEADER_MAX,
        )?;
        let header_end = if secondary_header_length > 0 {
            TmHeader::LEN + 1 + secondary_header_length
        } else {
            TmHeader::LEN
        };
        let staging = FrameStaging::new(
            length,
            header_end,
            security_header_length,
            security_trailer_length,
            ocf_present,
            fecf_present,
            0,
        )?;
        Ok(TmFrameBuilder {
            header: TmHeader {
                ocf_present,
                secondary_header_present: secondary_header_length > 0,
                ..Default::default()
            },
            secondary_header_length,
            secondary_header_set: secondary_header_length == 0,
            security_header_length,
            security_trailer_length,
            staging,
        })
    }

    /// # Errors
    /// [Error::OutOfRange] if `scid` is more than 10 bits.
    pub fn scid(&mut self, scid: Scid) -> Result<&mut Self> {
        check_range("scid", scid.into(), TmHeader::SCID_MAX.into())?;
        self.header.scid = scid;
        Ok(self)
    }

    /// # Errors
    /// [Error::OutOfRange] if `vcid` is more than 3 bits.
    pub fn vcid(&mut self, vcid: Vcid) -> Result<&mut Self> {
        check_range("vcid", vcid.into(), TmHeader::VCID_MAX.into())?;
        self.header.vcid = vcid;
        Ok(self)
    }

    pub fn mc_frame_count(&mut self, count: u8) -> &mut Self {
        self.header.mc_frame_count = count;
        self
    }

    pub fn vc_frame_count(&mut self, count: u8) -> &mut Self {
        self.header.vc_frame_count = count;
        self
    }

    pub fn sync(&mut self, sync: bool) -> &mut Self {
        self.header.sync = sync;
        self
    }

    pub fn packet_order(&mut self, packet_order: bool) -> &mut Self {
        self.header.packet_order = packet_order;
        self
    }

    /// # Errors
    /// [Error::OutOfRange] if `id` is more than 2 bits.
    pub fn segment_length_id(&mut self, id: u8) -> Result<&mut Self> {
        check_range("segment length id", id.into(), 0x3)?;
        self.header.segment_length_id = id;
        Ok(self)
    }

    /// Set the first header pointer, including the [TmHeader::FHP_IDLE] and
    /// [TmHeader::FHP_NO_PACKET] values.
    ///
    /// # Errors
    /// [Error::OutOfRange] if `fhp` is more than 11 bits.
    pub fn first_header_pointer(&mut self, fhp: u16) -> Result<&mut Self> {
        check_range(
            "first header pointer",
            fhp.into(),
            TmHeader::FHP_NO_PACKET.into(),
        )?;
        self.header.first_header_pointer = fhp;
        Ok(self)
    }

    /// Mark this frame as an idle frame.
    pub fn idle(&mut self) -> &mut Self {
        self.header.first_header_pointer = TmHeader::FHP_IDLE;
        self
    }

    /// Set the secondary header data, not including the identification byte.
    ///
    /// # Errors
    /// [Error::FieldLength] if `dat` does not have the length provided at creation.
    pub fn secondary_header(&mut self, dat: &[u8]) -> Result<&mut Self> {
        if self.secondary_header_length == 0 {
            return Err(Error::FieldLength {
                field: "secondary header",
                expected: 0,
                actual: dat.len(),
            });
        }
        check_field_len("secondary header", self.secondary_header_length, dat.len())?;
        let start = TmHeader::LEN;
        // version 0; length field is the total length, including this byte, minus 1
        #[allow(clippy::cast_possible_truncation)]
        let id = self.secondary_header_length as u8 & 0x3f;
        self.staging.buf[start] = id;
        self.staging.buf[start + 1..start + 1 + dat.len()].copy_from_slice(dat);
        self.secondary_header_set = true;
        Ok(self)
    }

    /// # Errors
    /// [Error::FieldLength] if not created with an OCF or `ocf` is not 4 bytes.
    pub fn ocf(&mut self, ocf: &[u8]) -> Result<&mut Self> {
        self.staging.set_ocf(ocf)?;
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
    pub fn build(&self) -> Result<TmFrame> {
        self.staging.check_complete()?;
        if !self.secondary_header_set {
            return Err(Error::FieldUnset("secondary header"));
        }
        let mut staging = self.staging.clone();
        staging.buf[..TmHeader::LEN].copy_from_slice(&self.header.encode());
        let fecf_present = staging.zones.fecf_present;
        let config = TmConfig::builder()
            .fecf_present(fecf_present)
            .security_header_length(self.security_header_length)
            .security_trailer_length(self.security_trailer_length)
            .build();
        TmFrame::decode(staging.finish(), &config)
    }
}
