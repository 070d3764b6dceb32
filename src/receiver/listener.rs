use crossbeam::channel::Sender;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::framing::Vcid;

/// Frame count discontinuity detected by a virtual channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gap {
    /// The frame count expected based on the previous frame
    pub expected: u32,
    /// The frame count actually received
    pub received: u32,
    /// Number of frames missing between expected and received, accounting for counter wrap
    pub missing: u32,
}

/// Receives notifications from a [VirtualChannel](super::VirtualChannel).
///
/// All methods have no-op defaults so implementations only handle what they care about.
/// Notifications are delivered synchronously while a frame is being processed and must not
/// feed frames back into the same channel.
pub trait VirtualChannelListener<F> {
    /// Called for every frame accepted by the channel before any other notification.
    fn frame_received(&mut self, _vcid: Vcid, _frame: &F) {}

    fn gap_detected(&mut self, _vcid: Vcid, _gap: &Gap) {}

    /// A space packet was extracted. `quality` is false if the packet was truncated.
    fn packet_extracted(&mut self, _vcid: Vcid, _frame: &F, _packet: &[u8], _quality: bool) {}

    /// An encapsulation packet was extracted. `quality` is false if the packet was truncated.
    fn encapsulation_packet_extracted(
        &mut self,
        _vcid: Vcid,
        _frame: &F,
        _packet: &[u8],
        _quality: bool,
    ) {
    }

    fn data_extracted(&mut self, _vcid: Vcid, _frame: &F, _data: &[u8]) {}

    /// Bitstream data was extracted. `data` is the minimum number of bytes containing
    /// `valid_bits`.
    fn bitstream_extracted(&mut self, _vcid: Vcid, _frame: &F, _data: &[u8], _valid_bits: usize) {
    }
}

/// Owned form of the [VirtualChannelListener] notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualChannelEvent<F> {
    FrameReceived {
        vcid: Vcid,
        frame: F,
    },
    GapDetected {
        vcid: Vcid,
        gap: Gap,
    },
    PacketExtracted {
        vcid: Vcid,
        packet: Vec<u8>,
        quality: bool,
    },
    EncapsulationPacketExtracted {
        vcid: Vcid,
        packet: Vec<u8>,
        quality: bool,
    },
    DataExtracted {
        vcid: Vcid,
        data: Vec<u8>,
    },
    BitstreamExtracted {
        vcid: Vcid,
        data: Vec<u8>,
        valid_bits: usize,
    },
}

fn send<F>(tx: &Sender<VirtualChannelEvent<F>>, event: VirtualChannelEvent<F>) {
    if tx.send(event).is_err() {
        trace!("virtual channel event receiver disconnected");
    }
}

/// Forwards notifications as [VirtualChannelEvent]s.
///
/// # Example
/// ```
/// use ccsds_datalink::framing::TmFrame;
/// use ccsds_datalink::receiver::{ChannelAccessMode, TmVirtualChannel, VirtualChannelEvent};
///
/// let (tx, rx) = crossbeam::channel::unbounded::<VirtualChannelEvent<TmFrame>>();
/// let _vc = TmVirtualChannel::new(1, ChannelAccessMode::Packet).with_listener(tx);
/// assert!(rx.try_recv().is_err());
/// ```
impl<F: Clone> VirtualChannelListener<F> for Sender<VirtualChannelEvent<F>> {
    fn frame_received(&mut self, vcid: Vcid, frame: &F) {
        send(
            self,
            VirtualChannelEvent::FrameReceived {
                vcid,
                frame: frame.clone(),
            },
        );
    }

    fn gap_detected(&mut self, vcid: Vcid, gap: &Gap) {
        send(self, VirtualChannelEvent::GapDetected { vcid, gap: *gap });
    }

    fn packet_extracted(&mut self, vcid: Vcid, _frame: &F, packet: &[u8], quality: bool) {
        send(
            self,
            VirtualChannelEvent::PacketExtracted {
                vcid,
                packet: packet.to_vec(),
                quality,
            },
        );
    }

    fn encapsulation_packet_extracted(
        &mut self,
        vcid: Vcid,
        _frame: &F,
        packet: &[u8],
        quality: bool,
    ) {
        send(
            self,
            VirtualChannelEvent::EncapsulationPacketExtracted {
                vcid,
                packet: packet.to_vec(),
                quality,
            },
        );
    }

    fn data_extracted(&mut self, vcid: Vcid, _frame: &F, data: &[u8]) {
        send(
            self,
            VirtualChannelEvent::DataExtracted {
                vcid,
                data: data.to_vec(),
            },
        );
    }

    fn bitstream_extracted(&mut self, vcid: Vcid, _frame: &F, data: &[u8], valid_bits: usize) {
        send(
            self,
            VirtualChannelEvent::BitstreamExtracted {
                vcid,
                data: data.to_vec(),
                valid_bits,
            },
        );
    }
}
