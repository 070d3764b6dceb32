use crate::framing::{
    AosFrame, AosHeader, TcFrame, TcFrameType, TcHeader, TmFrame, TmHeader, Vcid,
};
use crate::{Error, Result};

/// The per frame type capabilities required by a [VirtualChannel](super::VirtualChannel).
///
/// Implemented for [TmFrame], [AosFrame] and [TcFrame]. The reassembly algorithm is the same
/// for all frame types; only how units are located in the frame differs.
pub trait ChannelFrame {
    /// Frame type name used in messages
    const NAME: &'static str;
    /// Number of distinct virtual channel frame count values
    const FRAME_COUNT_MODULUS: u32;

    fn vcid(&self) -> Vcid;

    fn frame_count(&self) -> u32;

    /// True if the frame count of this frame should be used to detect missing frames.
    fn frame_count_checked(&self) -> bool;

    /// True if this frame carries no units and should be skipped by unit reassembly.
    fn is_idle(&self) -> bool;

    /// True if the frame data is not synchronized to unit boundaries.
    fn is_sync(&self) -> bool {
        false
    }

    /// The complete frame data field.
    fn data_zone(&self) -> &[u8];

    /// The zone containing units, i.e., packets.
    ///
    /// # Errors
    /// If the frame does not carry units.
    fn unit_zone(&self) -> Result<&[u8]>;

    /// Offset into the [unit_zone](Self::unit_zone) of the first unit starting in this frame,
    /// or `None` if no unit starts in this frame.
    ///
    /// # Errors
    /// If the frame is idle or does not carry units.
    fn first_unit_pointer(&self) -> Result<Option<usize>>;

    /// The bitstream zone and the number of valid bits in it.
    ///
    /// # Errors
    /// If the frame does not carry bitstream data.
    fn bitstream(&self) -> Result<(&[u8], usize)> {
        Err(Error::AccessMode(format!(
            "bitstream access requires AOS B_PDU frames, not {}",
            Self::NAME
        )))
    }
}

impl ChannelFrame for TmFrame {
    const NAME: &'static str = "TM";
    const FRAME_COUNT_MODULUS: u32 = TmHeader::COUNTER_MODULUS;

    fn vcid(&self) -> Vcid {
        self.header().vcid
    }

    fn frame_count(&self) -> u32 {
        self.header().vc_frame_count.into()
    }

    fn frame_count_checked(&self) -> bool {
        true
    }

    fn is_idle(&self) -> bool {
        TmFrame::is_idle(self)
    }

    fn is_sync(&self) -> bool {
        self.header().sync
    }

    fn data_zone(&self) -> &[u8] {
        self.data_field()
    }

    fn unit_zone(&self) -> Result<&[u8]> {
        Ok(self.data_field())
    }

    fn first_unit_pointer(&self) -> Result<Option<usize>> {
        if TmFrame::is_idle(self) {
            return Err(Error::IdleFrame);
        }
        // first header pointer is undefined for sync frames
        if self.header().sync {
            return Err(Error::SyncFlag);
        }
        if self.contains_no_packet_start() {
            return Ok(None);
        }
        Ok(Some(self.first_header_pointer().into()))
    }
}

impl ChannelFrame for AosFrame {
    const NAME: &'static str = "AOS";
    const FRAME_COUNT_MODULUS: u32 = AosHeader::COUNTER_MODULUS;

    fn vcid(&self) -> Vcid {
        self.header().vcid
    }

    fn frame_count(&self) -> u32 {
        self.header().vc_frame_count
    }

    fn frame_count_checked(&self) -> bool {
        self.header().vc_frame_count_usage
    }

    fn is_idle(&self) -> bool {
        AosFrame::is_idle(self)
    }

    fn data_zone(&self) -> &[u8] {
        self.data_field()
    }

    fn unit_zone(&self) -> Result<&[u8]> {
        self.packet_zone()
    }

    fn first_unit_pointer(&self) -> Result<Option<usize>> {
        if AosFrame::is_idle(self) {
            return Err(Error::IdleFrame);
        }
        let fhp = self.first_header_pointer()?;
        if fhp == AosFrame::FHP_NO_PACKET {
            return Ok(None);
        }
        Ok(Some(fhp.into()))
    }

    fn bitstream(&self) -> Result<(&[u8], usize)> {
        Ok((self.bitstream_zone()?, self.valid_bits()?))
    }
}

/// Control command frames carry no units and are treated as idle. A unit starts at the
/// beginning of every unsegmented frame and of segments flagged first or unsegmented.
impl ChannelFrame for TcFrame {
    const NAME: &'static str = "TC";
    const FRAME_COUNT_MODULUS: u32 = TcHeader::COUNTER_MODULUS;

    fn vcid(&self) -> Vcid {
        self.header().vcid
    }

    fn frame_count(&self) -> u32 {
        self.header().frame_seq_num.into()
    }

    fn frame_count_checked(&self) -> bool {
        false
    }

    fn is_idle(&self) -> bool {
        self.frame_type() == TcFrameType::Bc
    }

    fn data_zone(&self) -> &[u8] {
        self.data_field()
    }

    fn unit_zone(&self) -> Result<&[u8]> {
        Ok(self.data_field())
    }

    fn first_unit_pointer(&self) -> Result<Option<usize>> {
        if ChannelFrame::is_idle(self) {
            return Err(Error::IdleFrame);
        }
        match self.segment_header() {
            Some(header) if !header.sequence_flag.starts_unit() => Ok(None),
            _ => Ok(Some(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::{
        AosFrameBuilder, ControlCommand, SequenceFlag, TcFrameBuilder, TmFrameBuilder,
        UserDataType,
    };

    #[test]
    fn tm_pointers() {
        let mut builder = TmFrameBuilder::new(20, 0, false, false).unwrap();
        builder.first_header_pointer(3).unwrap().add_data(&[0; 14]);
        let frame = builder.build().unwrap();
        assert_eq!(frame.first_unit_pointer(), Ok(Some(3)));

        builder.first_header_pointer(TmHeader::FHP_NO_PACKET).unwrap();
        assert_eq!(builder.build().unwrap().first_unit_pointer(), Ok(None));

        builder.idle();
        let frame = builder.build().unwrap();
        assert!(ChannelFrame::is_idle(&frame));
        assert_eq!(frame.first_unit_pointer(), Err(Error::IdleFrame));

        builder.first_header_pointer(0).unwrap().sync(true);
        assert_eq!(
            builder.build().unwrap().first_unit_pointer(),
            Err(Error::SyncFlag)
        );
    }

    #[test]
    fn tm_has_no_bitstream() {
        let mut builder = TmFrameBuilder::new(20, 0, false, false).unwrap();
        builder.add_data(&[0; 14]);
        let frame = builder.build().unwrap();
        assert!(matches!(frame.bitstream(), Err(Error::AccessMode(_))));
    }

    #[test]
    fn aos_user_data_type_mismatch() {
        let mut builder =
            AosFrameBuilder::new(20, false, 0, UserDataType::Bpdu, false, false).unwrap();
        builder.bitstream_data_pointer(12).unwrap().add_data(&[0; 12]);
        let frame = builder.build().unwrap();
        assert!(matches!(frame.unit_zone(), Err(Error::UserDataType(_))));
        assert!(matches!(
            frame.first_unit_pointer(),
            Err(Error::UserDataType(_))
        ));
        let (zone, bits) = frame.bitstream().unwrap();
        assert_eq!(zone.len(), 12);
        assert_eq!(bits, 12);
    }

    #[test]
    fn tc_unit_starts() {
        let mut builder = TcFrameBuilder::new(12, true, false).unwrap();
        builder.add_data(&[0; 6]);
        for (flag, expected) in [
            (SequenceFlag::First, Some(0)),
            (SequenceFlag::Continue, None),
            (SequenceFlag::Last, None),
            (SequenceFlag::Unsegmented, Some(0)),
        ] {
            builder.segment_header(flag, 0).unwrap();
            let frame = builder.build().unwrap();
            assert_eq!(frame.first_unit_pointer(), Ok(expected), "{flag:?}");
        }

        let frame = TcFrameBuilder::control_command(&ControlCommand::Unlock, true)
            .unwrap()
            .build()
            .unwrap();
        assert!(ChannelFrame::is_idle(&frame));
        assert!(!frame.frame_count_checked());
    }
}
