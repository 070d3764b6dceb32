mod common;

use ccsds_datalink::framing::{
    AosFrame, AosFrameBuilder, AosHeader, ControlCommand, SequenceFlag, TcFrame,
    TcFrameBuilder, TmFrame, TmHeader, UserDataType,
};
use ccsds_datalink::receiver::{
    AosVirtualChannel, ChannelAccessMode, Gap, TcVirtualChannel, TmVirtualChannel,
    VirtualChannelDemux, VirtualChannelEvent,
};
use ccsds_datalink::Error;
use common::{aos_frame, encapsulation_packet, seen, space_packet, tm_frame, Seen};
use crossbeam::channel::{unbounded, Receiver};

fn tm_channel(
    vcid: u16,
    mode: ChannelAccessMode,
) -> (TmVirtualChannel, Receiver<VirtualChannelEvent<TmFrame>>) {
    let (tx, rx) = unbounded();
    (TmVirtualChannel::new(vcid, mode).with_listener(tx), rx)
}

fn aos_channel(
    vcid: u16,
    mode: ChannelAccessMode,
) -> (AosVirtualChannel, Receiver<VirtualChannelEvent<AosFrame>>) {
    let (tx, rx) = unbounded();
    (AosVirtualChannel::new(vcid, mode).with_listener(tx), rx)
}

fn bpdu_frame(vcid: u16, bdp: u16, zone_len: usize) -> AosFrame {
    let mut builder = AosFrameBuilder::new(
        AosHeader::LEN + AosFrame::PDU_HEADER_LEN + zone_len,
        false,
        0,
        UserDataType::Bpdu,
        false,
        false,
    )
    .unwrap();
    builder.vcid(vcid).unwrap().bitstream_data_pointer(bdp).unwrap();
    let zone: Vec<u8> = (0..zone_len).map(|i| (i % 251) as u8).collect();
    builder.add_data(&zone);
    builder.build().unwrap()
}

#[test]
fn packet_spanning_two_frames() {
    let (mut vc, rx) = tm_channel(3, ChannelAccessMode::Packet);
    let packet = space_packet(100, 30);

    // header and part of the body
    vc.process(&tm_frame(3, 0, 0, &packet[..20])).unwrap();
    // remainder followed by fill
    let dat = [packet[20..].to_vec(), vec![0xff; 10]].concat();
    vc.process(&tm_frame(3, 1, TmHeader::FHP_NO_PACKET, &dat))
        .unwrap();

    assert_eq!(
        seen(&rx),
        vec![Seen::Frame, Seen::Frame, Seen::Packet(packet, true)]
    );
}

#[test]
fn packet_spanning_many_frames() {
    let (mut vc, rx) = tm_channel(0, ChannelAccessMode::Packet);
    let packet = space_packet(7, 100);
    let next = space_packet(8, 15);
    let dat = [packet.clone(), next.clone()].concat();

    let mut count = 0u8;
    for (i, chunk) in dat.chunks(23).enumerate() {
        let fhp = match i {
            0 => 0,
            4 => 100 - 4 * 23,
            _ => TmHeader::FHP_NO_PACKET,
        };
        let mut chunk = chunk.to_vec();
        chunk.resize(23, 0xff);
        vc.process(&tm_frame(0, count, fhp, &chunk)).unwrap();
        count += 1;
    }

    let packets: Vec<Seen> = seen(&rx)
        .into_iter()
        .filter(|s| *s != Seen::Frame)
        .collect();
    assert_eq!(
        packets,
        vec![Seen::Packet(packet, true), Seen::Packet(next, true)]
    );
}

#[test]
fn gap_truncates_packet_in_flight() {
    let (mut vc, rx) = tm_channel(1, ChannelAccessMode::Packet);
    let long = space_packet(1, 50);
    let next = space_packet(2, 20);

    vc.process(&tm_frame(1, 0, 0, &long[..20])).unwrap();
    vc.process(&tm_frame(1, 1, TmHeader::FHP_NO_PACKET, &long[20..40]))
        .unwrap();
    assert_eq!(seen(&rx), vec![Seen::Frame, Seen::Frame]);

    // frame 2 missing
    vc.process(&tm_frame(1, 3, 0, &next)).unwrap();
    assert_eq!(
        seen(&rx),
        vec![
            Seen::Frame,
            Seen::Gap(Gap {
                expected: 2,
                received: 3,
                missing: 1
            }),
            Seen::Packet(long[..40].to_vec(), false),
            Seen::Packet(next, true),
        ]
    );
}

#[test]
fn gap_on_idle_frame_closes_packet_on_next_data_frame() {
    let (mut vc, rx) = tm_channel(1, ChannelAccessMode::Packet);
    let long = space_packet(1, 50);
    let next = space_packet(2, 20);

    vc.process(&tm_frame(1, 0, 0, &long[..20])).unwrap();
    vc.process(&tm_frame(1, 2, TmHeader::FHP_IDLE, &[0x55; 20]))
        .unwrap();
    assert_eq!(
        seen(&rx),
        vec![
            Seen::Frame,
            Seen::Frame,
            Seen::Gap(Gap {
                expected: 1,
                received: 2,
                missing: 1
            }),
        ]
    );
    assert!(vc.has_pending_unit());

    vc.process(&tm_frame(1, 3, 0, &next)).unwrap();
    assert_eq!(
        seen(&rx),
        vec![
            Seen::Frame,
            Seen::Packet(long[..20].to_vec(), false),
            Seen::Packet(next, true),
        ]
    );
    assert!(!vc.has_pending_unit());
}

#[test]
fn huge_encapsulation_length_stays_pending() {
    let (mut vc, rx) = tm_channel(0, ChannelAccessMode::Encapsulation);
    // 8 byte header declaring 0xffffffff bytes
    let dat = hex::decode("e7000000ffffffff0000000000000000").unwrap();
    vc.process(&tm_frame(0, 0, 0, &dat)).unwrap();
    assert_eq!(seen(&rx), vec![Seen::Frame]);
    assert!(vc.has_pending_unit());

    let packet = encapsulation_packet(16);
    vc.process(&tm_frame(0, 2, 0, &packet)).unwrap();
    assert_eq!(
        seen(&rx),
        vec![
            Seen::Frame,
            Seen::Gap(Gap {
                expected: 1,
                received: 2,
                missing: 1
            }),
            Seen::Encapsulation(dat, false),
            Seen::Encapsulation(packet, true),
        ]
    );
}

#[test]
fn gap_detected_across_counter_wrap() {
    let (mut vc, rx) = tm_channel(1, ChannelAccessMode::Data);
    vc.process(&tm_frame(1, 254, 0, &[0; 8])).unwrap();
    vc.process(&tm_frame(1, 1, 0, &[0; 8])).unwrap();

    let gaps: Vec<Seen> = seen(&rx)
        .into_iter()
        .filter(|s| matches!(s, Seen::Gap(_)))
        .collect();
    assert_eq!(
        gaps,
        vec![Seen::Gap(Gap {
            expected: 255,
            received: 1,
            missing: 2
        })]
    );
}

#[test]
fn aos_idle_frame_only_received() {
    let (mut vc, rx) = aos_channel(AosHeader::VCID_IDLE, ChannelAccessMode::Packet);
    let frame = aos_frame(AosHeader::VCID_IDLE, 0, false, 0, &space_packet(1, 20));
    assert!(frame.is_idle());

    vc.process(&frame).unwrap();

    assert_eq!(seen(&rx), vec![Seen::Frame]);
}

#[test]
fn aos_gap_requires_frame_count_usage() {
    let (mut vc, rx) = aos_channel(4, ChannelAccessMode::Data);
    vc.process(&aos_frame(4, 10, false, 0, &[0; 8])).unwrap();
    vc.process(&aos_frame(4, 20, false, 0, &[0; 8])).unwrap();
    assert!(!seen(&rx).iter().any(|s| matches!(s, Seen::Gap(_))));

    vc.process(&aos_frame(4, 0xff_ffff, true, 0, &[0; 8])).unwrap();
    vc.process(&aos_frame(4, 1, true, 0, &[0; 8])).unwrap();
    let gaps: Vec<Seen> = seen(&rx)
        .into_iter()
        .filter(|s| matches!(s, Seen::Gap(_)))
        .collect();
    assert_eq!(
        gaps,
        vec![
            Seen::Gap(Gap {
                expected: 21,
                received: 0xff_ffff,
                missing: 0xff_ffff - 21
            }),
            Seen::Gap(Gap {
                expected: 0,
                received: 1,
                missing: 1
            }),
        ]
    );
}

#[test]
fn aos_packets() {
    let (mut vc, rx) = aos_channel(10, ChannelAccessMode::Packet);
    let a = space_packet(1, 24);
    let b = space_packet(2, 40);
    let dat = [a.clone(), b.clone()].concat();

    vc.process(&aos_frame(10, 0, true, 0, &dat[..32])).unwrap();
    assert!(vc.has_pending_unit());
    vc.process(&aos_frame(10, 1, true, AosFrame::FHP_NO_PACKET, &dat[32..]))
        .unwrap();

    assert_eq!(
        seen(&rx),
        vec![
            Seen::Frame,
            Seen::Packet(a, true),
            Seen::Frame,
            Seen::Packet(b, true)
        ]
    );
    assert!(!vc.has_pending_unit());
}

#[test]
fn encapsulation_packets_skip_idle_octets() {
    let (mut vc, rx) = aos_channel(2, ChannelAccessMode::Encapsulation);
    let e1 = encapsulation_packet(12);
    let e2 = encapsulation_packet(16);

    let dat = [e1.clone(), e2[..8].to_vec()].concat();
    vc.process(&aos_frame(2, 0, true, 0, &dat)).unwrap();
    let dat = [e2[8..].to_vec(), vec![0xe0; 12]].concat();
    vc.process(&aos_frame(2, 1, true, 8, &dat)).unwrap();

    assert_eq!(
        seen(&rx),
        vec![
            Seen::Frame,
            Seen::Encapsulation(e1, true),
            Seen::Frame,
            Seen::Encapsulation(e2, true),
        ]
    );
    assert!(!vc.has_pending_unit());
}

#[test]
fn encapsulation_header_split_across_frames() {
    let (mut vc, rx) = tm_channel(0, ChannelAccessMode::Encapsulation);
    // 4 byte header, 10 bytes total
    let packet = vec![0xea, 0x00, 0x00, 0x0a, 1, 2, 3, 4, 5, 6];
    let mut dat = vec![0xe0; 7];
    dat.extend_from_slice(&packet[..1]);
    vc.process(&tm_frame(0, 0, 0, &dat)).unwrap();
    assert!(vc.has_pending_unit());

    let mut dat = packet[1..].to_vec();
    dat.resize(12, 0xe0);
    vc.process(&tm_frame(0, 1, 9, &dat)).unwrap();

    assert_eq!(
        seen(&rx),
        vec![
            Seen::Frame,
            Seen::Frame,
            Seen::Encapsulation(packet, true)
        ]
    );
}

#[test]
fn data_mode_includes_idle_frames() {
    let (mut vc, rx) = tm_channel(5, ChannelAccessMode::Data);
    vc.process(&tm_frame(5, 0, TmHeader::FHP_IDLE, &[0x55; 8]))
        .unwrap();
    vc.process(&tm_frame(5, 1, 0, &[0xaa; 8])).unwrap();

    assert_eq!(
        seen(&rx),
        vec![
            Seen::Frame,
            Seen::Data(vec![0x55; 8]),
            Seen::Frame,
            Seen::Data(vec![0xaa; 8]),
        ]
    );
}

#[test]
fn bitstream_valid_bits() {
    let (mut vc, rx) = aos_channel(6, ChannelAccessMode::Bitstream);

    let frame = bpdu_frame(6, 5000, 700);
    vc.process(&frame).unwrap();
    let all = bpdu_frame(6, AosFrame::BDP_ALL_DATA, 700);
    vc.process(&all).unwrap();
    vc.process(&bpdu_frame(6, AosFrame::BDP_IDLE, 700)).unwrap();

    let zone = all.bitstream_zone().unwrap().to_vec();
    assert_eq!(
        seen(&rx),
        vec![
            Seen::Frame,
            Seen::Bitstream(zone[..625].to_vec(), 5000),
            Seen::Frame,
            Seen::Bitstream(zone.clone(), 700 * 8),
            Seen::Frame,
        ]
    );
}

#[test]
fn bitstream_partial_byte() {
    let (mut vc, rx) = aos_channel(6, ChannelAccessMode::Bitstream);
    vc.process(&bpdu_frame(6, 13, 10)).unwrap();

    let events = seen(&rx);
    assert!(matches!(&events[1], Seen::Bitstream(data, 13) if data.len() == 2));
}

#[test]
fn access_mode_contract_violations() {
    let (mut vc, _rx) = tm_channel(0, ChannelAccessMode::Bitstream);
    assert!(matches!(
        vc.process(&tm_frame(0, 0, 0, &[0; 8])),
        Err(Error::AccessMode(_))
    ));

    let (mut vc, _rx) = aos_channel(1, ChannelAccessMode::Bitstream);
    assert!(matches!(
        vc.process(&aos_frame(1, 0, false, 0, &[0; 8])),
        Err(Error::UserDataType(_))
    ));

    let (mut vc, _rx) = aos_channel(1, ChannelAccessMode::Packet);
    assert!(matches!(
        vc.process(&bpdu_frame(1, 8, 8)),
        Err(Error::UserDataType(_))
    ));
}

#[test]
fn tc_segments_reassembled() {
    let (tx, rx) = unbounded::<VirtualChannelEvent<TcFrame>>();
    let mut vc = TcVirtualChannel::new(9, ChannelAccessMode::Packet).with_listener(tx);
    let packet = space_packet(3, 40);

    let frame = |flag: SequenceFlag, seq: u8, dat: &[u8]| {
        let mut builder = TcFrameBuilder::new(5 + 1 + dat.len() + 2, true, true).unwrap();
        builder
            .vcid(9)
            .unwrap()
            .frame_seq_num(seq)
            .segment_header(flag, 0)
            .unwrap();
        builder.add_data(dat);
        builder.build().unwrap()
    };

    vc.process(&frame(SequenceFlag::First, 0, &packet[..16]))
        .unwrap();
    vc.process(&frame(SequenceFlag::Continue, 1, &packet[16..32]))
        .unwrap();
    // sequence numbers are not checked for TC
    vc.process(&frame(SequenceFlag::Last, 7, &packet[32..]))
        .unwrap();
    vc.process(&frame(SequenceFlag::Unsegmented, 8, &packet))
        .unwrap();

    let unlock = TcFrameBuilder::control_command(&ControlCommand::Unlock, true)
        .unwrap()
        .vcid(9)
        .unwrap()
        .build()
        .unwrap();
    vc.process(&unlock).unwrap();

    assert_eq!(
        seen(&rx),
        vec![
            Seen::Frame,
            Seen::Frame,
            Seen::Frame,
            Seen::Packet(packet.clone(), true),
            Seen::Frame,
            Seen::Packet(packet, true),
            Seen::Frame,
        ]
    );
}

#[test]
fn demux_routes_master_channel() {
    let (tx0, rx0) = unbounded::<VirtualChannelEvent<TmFrame>>();
    let (tx1, rx1) = unbounded::<VirtualChannelEvent<TmFrame>>();
    let mut demux = VirtualChannelDemux::new()
        .with_channel(TmVirtualChannel::new(0, ChannelAccessMode::Packet).with_listener(tx0))
        .with_channel(TmVirtualChannel::new(1, ChannelAccessMode::Packet).with_listener(tx1));

    let (a, b) = (space_packet(10, 16), space_packet(11, 16));
    demux.process(&tm_frame(0, 0, 0, &a)).unwrap();
    demux.process(&tm_frame(1, 0, 0, &b)).unwrap();
    demux.process(&tm_frame(7, 0, 0, &b)).unwrap();

    assert_eq!(seen(&rx0), vec![Seen::Frame, Seen::Packet(a, true)]);
    assert_eq!(seen(&rx1), vec![Seen::Frame, Seen::Packet(b, true)]);
    assert_eq!(demux.unrouted(), 1);
}
