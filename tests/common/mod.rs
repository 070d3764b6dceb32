#![allow(dead_code)]

use ccsds_datalink::framing::{
    AosFrame, AosFrameBuilder, TmFrame, TmFrameBuilder, TmHeader, UserDataType, Vcid,
};
use ccsds_datalink::receiver::{Gap, VirtualChannelEvent};
use ccsds_datalink::spacepacket::PrimaryHeader;
use crossbeam::channel::Receiver;

/// Simplified [VirtualChannelEvent] that does not carry the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Frame,
    Gap(Gap),
    Packet(Vec<u8>, bool),
    Encapsulation(Vec<u8>, bool),
    Data(Vec<u8>),
    Bitstream(Vec<u8>, usize),
}

pub fn seen<F>(rx: &Receiver<VirtualChannelEvent<F>>) -> Vec<Seen> {
    rx.try_iter()
        .map(|event| match event {
            VirtualChannelEvent::FrameReceived { .. } => Seen::Frame,
            VirtualChannelEvent::GapDetected { gap, .. } => Seen::Gap(gap),
            VirtualChannelEvent::PacketExtracted {
                packet, quality, ..
            } => Seen::Packet(packet, quality),
            VirtualChannelEvent::EncapsulationPacketExtracted {
                packet, quality, ..
            } => Seen::Encapsulation(packet, quality),
            VirtualChannelEvent::DataExtracted { data, .. } => Seen::Data(data),
            VirtualChannelEvent::BitstreamExtracted {
                data, valid_bits, ..
            } => Seen::Bitstream(data, valid_bits),
        })
        .collect()
}

/// Space packet of `len` total bytes with user data counting up from 0.
pub fn space_packet(apid: u16, len: usize) -> Vec<u8> {
    let header = PrimaryHeader {
        apid,
        sequence_flags: 3,
        len_minus1: u16::try_from(len - PrimaryHeader::LEN - 1).unwrap(),
        ..Default::default()
    };
    let mut dat = header.encode().to_vec();
    dat.extend((0..len - PrimaryHeader::LEN).map(|i| (i % 256) as u8));
    dat
}

/// Encapsulation packet of `len` total bytes using a 2 byte header.
pub fn encapsulation_packet(len: u8) -> Vec<u8> {
    // PVN 7, protocol id 2, length of length 1
    let mut dat = vec![0xe9, len];
    dat.extend((0..len - 2).map(|i| i.wrapping_mul(3)));
    dat
}

/// TM frame without OCF or FECF whose data field is `data`.
pub fn tm_frame(vcid: Vcid, count: u8, fhp: u16, data: &[u8]) -> TmFrame {
    let mut builder = TmFrameBuilder::new(TmHeader::LEN + data.len(), 0, false, false).unwrap();
    builder
        .scid(42)
        .unwrap()
        .vcid(vcid)
        .unwrap()
        .vc_frame_count(count)
        .first_header_pointer(fhp)
        .unwrap();
    assert_eq!(builder.add_data(data), 0);
    builder.build().unwrap()
}

/// AOS M_PDU frame with a FECF whose packet zone is `data`.
pub fn aos_frame(vcid: Vcid, count: u32, usage: bool, fhp: u16, data: &[u8]) -> AosFrame {
    let len = 6 + AosFrame::PDU_HEADER_LEN + data.len() + 2;
    let mut builder = AosFrameBuilder::new(len, false, 0, UserDataType::Mpdu, false, true).unwrap();
    builder
        .scid(42)
        .unwrap()
        .vcid(vcid)
        .unwrap()
        .vc_frame_count(count)
        .unwrap()
        .vc_frame_count_usage(usage)
        .first_header_pointer(fhp)
        .unwrap();
    assert_eq!(builder.add_data(data), 0);
    builder.build().unwrap()
}
