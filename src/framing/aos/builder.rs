use super::{AosConfig, AosFrame, AosHeader, UserDataType};
use crate::framing::{check_field_len, check_range, fhec, FrameStaging, Scid, Vcid, FHEC_LEN};
use crate::{Error, Result};

/// Builds an [AosFrame] of a fixed length.
///
/// For M_PDU and B_PDU frames the 2 byte PDU header is reserved automatically and is not part
/// of the free user data length. Checksums are computed when the frame is built, FHEC first
/// and FECF last.
#[derive(Debug, Clone)]
pub struct AosFrameBuilder {
    header: AosHeader,
    fhec_present: bool,
    insert_zone_length: usize,
    insert_zone_set: bool,
    user_data_type: UserDataType,
    pointer: Option<u16>,
    security_header_length: usize,
    security_trailer_length: usize,
    staging: FrameStaging,
}

impl AosFrameBuilder {
    /// Create a builder for a frame of `length` bytes.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if `length` cannot hold the requested fields.
    pub fn new(
        length: usize,
        fhec_present: bool,
        insert_zone_length: usize,
        user_data_type: UserDataType,
        ocf_present: bool,
        fecf_present: bool,
    ) -> Result<Self> {
        Self::with_config(
            length,
            &AosConfig::builder()
                .fhec_present(fhec_present)
                .insert_zone_length(insert_zone_length)
                .user_data_type(user_data_type)
                .ocf_present(ocf_present)
                .fecf_present(fecf_present)
                .build(),
        )
    }

    /// Create a builder for a frame of `length` bytes using the same parameters used to
    /// decode, which allows for a security header and trailer.
    ///
    /// # Errors
    /// [Error::NotEnoughData] if `length` cannot hold the requested fields.
    pub fn with_config(length: usize, config: &AosConfig) -> Result<Self> {
        let fhec_len = if config.fhec_present { FHEC_LEN } else { 0 };
        let pointer_len = match config.user_data_type {
            UserDataType::Mpdu | UserDataType::Bpdu => AosFrame::PDU_HEADER_LEN,
            UserDataType::Vca | UserDataType::Idle => 0,
        };
        let staging = FrameStaging::new(
            length,
            AosHeader::LEN + fhec_len + config.insert_zone_length,
            config.security_header_length,
            config.security_trailer_length,
            config.ocf_present,
            config.fecf_present,
            pointer_len,
        )?;
        Ok(AosFrameBuilder {
            header: AosHeader {
                version: AosHeader::VERSION,
                ..Default::default()
            },
            fhec_present: config.fhec_present,
            insert_zone_length: config.insert_zone_length,
            insert_zone_set: config.insert_zone_length == 0,
            user_data_type: config.user_data_type,
            pointer: None,
            security_header_length: config.security_header_length,
            security_trailer_length: config.security_trailer_length,
            staging,
        })
    }

    /// # Errors
    /// [Error::OutOfRange] if `scid` is more than 8 bits.
    pub fn scid(&mut self, scid: Scid) -> Result<&mut Self> {
        check_range("scid", scid.into(), AosHeader::SCID_MAX.into())?;
        self.header.scid = scid;
        Ok(self)
    }

    /// # Errors
    /// [Error::OutOfRange] if `vcid` is more than 6 bits.
    pub fn vcid(&mut self, vcid: Vcid) -> Result<&mut Self> {
        check_range("vcid", vcid.into(), AosHeader::VCID_MAX.into())?;
        self.header.vcid = vcid;
        Ok(self)
    }

    /// # Errors
    /// [Error::OutOfRange] if `count` is more than 24 bits.
    pub fn vc_frame_count(&mut self, count: u32) -> Result<&mut Self> {
        check_range(
            "vc frame count",
            count as usize,
            AosHeader::COUNTER_MAX as usize,
        )?;
        self.header.vc_frame_count = count;
        Ok(self)
    }

    pub fn replay(&mut self, replay: bool) -> &mut Self {
        self.header.replay = replay;
        self
    }

    pub fn vc_frame_count_usage(&mut self, usage: bool) -> &mut Self {
        self.header.vc_frame_count_usage = usage;
        self
    }

    /// # Errors
    /// [Error::OutOfRange] if `cycle` is more than 4 bits.
    pub fn vc_frame_count_cycle(&mut self, cycle: u8) -> Result<&mut Self> {
        check_range("vc frame count cycle", cycle.into(), 0xf)?;
        self.header.vc_frame_count_cycle = cycle;
        Ok(self)
    }

    /// Set the M_PDU first header pointer, including the sentinel values.
    ///
    /// # Errors
    /// * [Error::UserDataType] if not an M_PDU frame
    /// * [Error::OutOfRange] if `fhp` is more than 11 bits
    pub fn first_header_pointer(&mut self, fhp: u16) -> Result<&mut Self> {
        self.require(UserDataType::Mpdu)?;
        check_range(
            "first header pointer",
            fhp.into(),
            AosFrame::FHP_NO_PACKET.into(),
        )?;
        self.pointer = Some(fhp);
        Ok(self)
    }

    /// Set the B_PDU bitstream data pointer, including the sentinel values.
    ///
    /// # Errors
    /// * [Error::UserDataType] if not a B_PDU frame
    /// * [Error::OutOfRange] if `bdp` is more than 14 bits
    pub fn bitstream_data_pointer(&mut self, bdp: u16) -> Result<&mut Self> {
        self.require(UserDataType::Bpdu)?;
        check_range(
            "bitstream data pointer",
            bdp.into(),
            AosFrame::BDP_ALL_DATA.into(),
        )?;
        self.pointer = Some(bdp);
        Ok(self)
    }

    /// Mark the frame idle using the idle pointer value for M_PDU or B_PDU frames. Other user
    /// data types are idle only by VCID.
    pub fn idle(&mut self) -> &mut Self {
        match self.user_data_type {
            UserDataType::Mpdu => self.pointer = Some(AosFrame::FHP_IDLE),
            UserDataType::Bpdu => self.pointer = Some(AosFrame::BDP_IDLE),
            UserDataType::Vca | UserDataType::Idle => {}
        }
        self
    }

    fn require(&self, user_data_type: UserDataType) -> Result<()> {
        if self.user_data_type != user_data_type {
            return Err(Error::UserDataType(format!(
                "operation requires {user_data_type}, frame is {}",
                self.user_data_type
            )));
        }
        Ok(())
    }

    /// # Errors
    /// [Error::FieldLength] if `dat` is not the configured insert zone length.
    pub fn insert_zone(&mut self, dat: &[u8]) -> Result<&mut Self> {
        check_field_len("insert zone", self.insert_zone_length, dat.len())?;
        let start = self.staging.zones.security_header_start - self.insert_zone_length;
        self.staging.buf[start..start + dat.len()].copy_from_slice(dat);
        self.insert_zone_set = true;
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

    /// Encode the frame, computing the FHEC and then the FECF if present.
    ///
    /// # Errors
    /// * [Error::NotFull] if there is remaining free user data space
    /// * [Error::FieldUnset] if a declared optional field or the PDU pointer was not set
    pub fn build(&self) -> Result<AosFrame> {
        self.staging.check_complete()?;
        if !self.insert_zone_set {
            return Err(Error::FieldUnset("insert zone"));
        }
        let mut staging = self.staging.clone();
        staging.buf[..AosHeader::LEN].copy_from_slice(&self.header.encode());

        let pdu_start = staging.zones.data_field_start;
        match (self.user_data_type, self.pointer) {
            (UserDataType::Mpdu | UserDataType::Bpdu, Some(pointer)) => {
                staging.buf[pdu_start..pdu_start + AosFrame::PDU_HEADER_LEN]
                    .copy_from_slice(&pointer.to_be_bytes());
            }
            (UserDataType::Mpdu, None) => return Err(Error::FieldUnset("first header pointer")),
            (UserDataType::Bpdu, None) => return Err(Error::FieldUnset("bitstream data pointer")),
            _ => {}
        }

        if self.fhec_present {
            let check = fhec(&staging.buf[..AosHeader::LEN]);
            staging.buf[AosHeader::LEN..AosHeader::LEN + FHEC_LEN].copy_from_slice(&check);
        }

        let config = AosConfig::builder()
            .fhec_present(self.fhec_present)
            .insert_zone_length(self.insert_zone_length)
            .user_data_type(self.user_data_type)
            .ocf_present(staging.zones.ocf_start.is_some())
            .fecf_present(staging.zones.fecf_present)
            .security_header_length(self.security_header_length)
            .security_trailer_length(self.security_trailer_length)
            .build();
        AosFrame::decode(staging.finish(), &config)
    }
}
