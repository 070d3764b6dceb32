//! Receiver side virtual channel processing.
//!
//! A [VirtualChannel] is fed the frames for a single virtual channel, in the order received,
//! and reconstructs the units multiplexed into the frame data zones according to its
//! [ChannelAccessMode]. Results are delivered to registered [VirtualChannelListener]s.
//!
//! Units may span any number of frames. When frames go missing, detected using the virtual
//! channel frame count, a unit in progress is provided truncated with its quality flag unset
//! if its length is known, otherwise it is dropped.
//!
//! # Example
//! ```
//! use ccsds_datalink::framing::{TmFrame, TmFrameBuilder};
//! use ccsds_datalink::receiver::{ChannelAccessMode, TmVirtualChannel, VirtualChannelEvent};
//!
//! let (tx, rx) = crossbeam::channel::unbounded::<VirtualChannelEvent<TmFrame>>();
//! let mut vc = TmVirtualChannel::new(1, ChannelAccessMode::Packet).with_listener(tx);
//!
//! let packet = [0x08, 0x01, 0xc0, 0x00, 0x00, 0x03, 0xa, 0xb, 0xc, 0xd];
//! let mut builder = TmFrameBuilder::new(16, 0, false, false).unwrap();
//! builder.vcid(1).unwrap().first_header_pointer(0).unwrap();
//! builder.add_data(&packet);
//! vc.process(&builder.build().unwrap()).unwrap();
//!
//! let events: Vec<_> = rx.try_iter().collect();
//! assert!(matches!(
//!     &events[1],
//!     VirtualChannelEvent::PacketExtracted { packet: p, quality: true, .. } if p == &packet
//! ));
//! ```
pub mod demux;
mod frame;
mod listener;
mod unit;

use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::framing::{missing_frames, AosFrame, TcFrame, TmFrame, Vcid};
use crate::{Error, Result};
use unit::{PartialUnit, UnitKind};

pub use demux::VirtualChannelDemux;
pub use frame::ChannelFrame;
pub use listener::{Gap, VirtualChannelEvent, VirtualChannelListener};

/// How the data zone of frames is interpreted by a [VirtualChannel].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChannelAccessMode {
    /// Space packets
    Packet,
    /// Encapsulation packets
    Encapsulation,
    /// The complete data field of every frame, including idle frames
    Data,
    /// Bitstream data; only AOS B_PDU frames
    Bitstream,
}

impl Display for ChannelAccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Packet => "PACKET",
            Self::Encapsulation => "ENCAPSULATION",
            Self::Data => "DATA",
            Self::Bitstream => "BITSTREAM",
        };
        write!(f, "{s}")
    }
}

type BoxedListener<F> = Box<dyn VirtualChannelListener<F> + Send>;

pub type TmVirtualChannel = VirtualChannel<TmFrame>;
pub type AosVirtualChannel = VirtualChannel<AosFrame>;
pub type TcVirtualChannel = VirtualChannel<TcFrame>;

/// Reassembly state for a single virtual channel.
///
/// Not thread-safe in the sense that frames must be provided one at a time, in order, from a
/// single owner. Separate channels are fully independent.
pub struct VirtualChannel<F> {
    vcid: Vcid,
    mode: ChannelAccessMode,
    strict: bool,
    // frame count of the previous frame; none before the first frame or after reset
    last_count: Option<u32>,
    in_flight: Option<PartialUnit>,
    // gap seen on an idle frame; the in-flight unit is closed by the next non-idle frame
    pending_gap: bool,
    listeners: Vec<BoxedListener<F>>,
}

impl<F> Display for VirtualChannel<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VirtualChannel{{vcid={}, mode={}, last_count={:?}, in_flight={:?}}}",
            self.vcid,
            self.mode,
            self.last_count,
            self.in_flight.as_ref().map(|u| (u.buf.len(), u.total)),
        )
    }
}

impl<F: ChannelFrame> VirtualChannel<F> {
    /// Create a channel for `vcid`. Frames for other virtual channels are ignored unless
    /// [with_strict_membership](Self::with_strict_membership) is set.
    #[must_use]
    pub fn new(vcid: Vcid, mode: ChannelAccessMode) -> Self {
        VirtualChannel {
            vcid,
            mode,
            strict: false,
            last_count: None,
            in_flight: None,
            pending_gap: false,
            listeners: Vec::default(),
        }
    }

    /// When `strict` providing a frame for another virtual channel is an error.
    #[must_use]
    pub fn with_strict_membership(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn with_listener<L>(mut self, listener: L) -> Self
    where
        L: VirtualChannelListener<F> + Send + 'static,
    {
        self.register(listener);
        self
    }

    /// Add a listener. Listeners are notified in the order registered.
    pub fn register<L>(&mut self, listener: L)
    where
        L: VirtualChannelListener<F> + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    #[must_use]
    pub fn vcid(&self) -> Vcid {
        self.vcid
    }

    #[must_use]
    pub fn access_mode(&self) -> ChannelAccessMode {
        self.mode
    }

    /// True if a unit has been started but not yet completed.
    #[must_use]
    pub fn has_pending_unit(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Drop any unit in progress and forget the last frame count. The next frame is treated as
    /// the first.
    pub fn reset(&mut self) {
        self.last_count = None;
        self.in_flight = None;
        self.pending_gap = false;
    }

    /// Process the next frame for this virtual channel.
    ///
    /// # Errors
    /// * [Error::VcidMismatch] if strict membership is set and the frame is for another vcid
    /// * [Error::UserDataType] if the frame user data type does not support the access mode
    /// * [Error::SyncFlag] for bitstream or packet extraction from a frame with the sync flag set
    /// * [Error::AccessMode] if the frame type does not support the access mode
    pub fn process(&mut self, frame: &F) -> Result<()> {
        let vcid = frame.vcid();
        if vcid != self.vcid {
            if self.strict {
                return Err(Error::VcidMismatch {
                    expected: self.vcid,
                    actual: vcid,
                });
            }
            trace!(vcid = self.vcid, actual = vcid, "ignoring frame for another vcid");
            return Ok(());
        }

        self.notify(|l| l.frame_received(vcid, frame));

        let gap = self.check_frame_count(frame);
        if let Some(gap) = &gap {
            debug!(
                vcid,
                expected = gap.expected,
                received = gap.received,
                missing = gap.missing,
                "frame count gap"
            );
            self.notify(|l| l.gap_detected(vcid, gap));
        }

        match self.mode {
            ChannelAccessMode::Data => {
                self.notify(|l| l.data_extracted(vcid, frame, frame.data_zone()));
                Ok(())
            }
            ChannelAccessMode::Bitstream => self.process_bitstream(frame),
            ChannelAccessMode::Packet => {
                self.process_units(frame, UnitKind::SpacePacket, gap.is_some())
            }
            ChannelAccessMode::Encapsulation => {
                self.process_units(frame, UnitKind::Encapsulation, gap.is_some())
            }
        }
    }

    fn notify(&mut self, mut f: impl FnMut(&mut BoxedListener<F>)) {
        for listener in &mut self.listeners {
            f(listener);
        }
    }

    fn check_frame_count(&mut self, frame: &F) -> Option<Gap> {
        let received = frame.frame_count();
        let last = self.last_count.replace(received);
        if !frame.frame_count_checked() {
            return None;
        }
        let expected = (last? + 1) % F::FRAME_COUNT_MODULUS;
        if received == expected {
            return None;
        }
        Some(Gap {
            expected,
            received,
            missing: missing_frames(expected, received, F::FRAME_COUNT_MODULUS),
        })
    }

    fn process_bitstream(&mut self, frame: &F) -> Result<()> {
        if frame.is_idle() {
            trace!(vcid = self.vcid, "skipping idle frame");
            return Ok(());
        }
        if frame.is_sync() {
            return Err(Error::SyncFlag);
        }
        let (zone, valid_bits) = frame.bitstream()?;
        let data = &zone[..valid_bits.div_ceil(8).min(zone.len())];
        let vcid = self.vcid;
        self.notify(|l| l.bitstream_extracted(vcid, frame, data, valid_bits));
        Ok(())
    }

    fn process_units(&mut self, frame: &F, kind: UnitKind, gap: bool) -> Result<()> {
        if frame.is_idle() {
            self.pending_gap |= gap;
            trace!(vcid = self.vcid, "skipping idle frame");
            return Ok(());
        }
        let pending_gap = std::mem::take(&mut self.pending_gap);
        if gap || pending_gap {
            self.close_in_flight(frame, kind);
        }

        let zone = frame.unit_zone()?;
        let pointer = frame.first_unit_pointer()?.map(|p| p.min(zone.len()));

        if let Some(unit) = self.in_flight.take() {
            self.continue_unit(frame, kind, unit, zone, pointer);
        }
        if let Some(start) = pointer {
            self.extract_units(frame, kind, zone, start);
        }
        Ok(())
    }

    /// Provide the in-flight unit truncated if its length is known, otherwise drop it.
    fn close_in_flight(&mut self, frame: &F, kind: UnitKind) {
        let Some(unit) = self.in_flight.take() else {
            return;
        };
        match unit.total {
            Some(total) => {
                debug!(
                    vcid = self.vcid,
                    expected = total,
                    actual = unit.buf.len(),
                    "gap truncated unit"
                );
                self.emit(frame, kind, &unit.buf, false);
            }
            None => {
                debug!(
                    vcid = self.vcid,
                    have = unit.buf.len(),
                    "gap before unit length known, dropping"
                );
            }
        }
    }

    /// Continue the in-flight unit with data from the start of `zone` up to `pointer`, if
    /// there is one, otherwise the end of `zone`.
    fn continue_unit(
        &mut self,
        frame: &F,
        kind: UnitKind,
        mut unit: PartialUnit,
        zone: &[u8],
        pointer: Option<usize>,
    ) {
        let vcid = self.vcid;
        let limit = pointer.unwrap_or(zone.len());
        let mut pos = 0;

        // complete the header first, which for encapsulation packets may take 2 steps
        let total = loop {
            if let Some(total) = unit.total {
                break total;
            }
            let header_len = kind.header_len(&unit.buf);
            if unit.buf.len() >= header_len {
                unit.total = kind.total_len(&unit.buf);
                if unit.total.is_none() {
                    warn!(vcid, "failed to decode unit header, dropping");
                    return;
                }
                continue;
            }
            let need = header_len - unit.buf.len();
            if limit - pos < need {
                if pointer.is_some() {
                    debug!(
                        vcid,
                        need,
                        pointer = limit,
                        "new unit starts before unit header complete, dropping"
                    );
                    return;
                }
                unit.buf.extend_from_slice(&zone[pos..limit]);
                self.in_flight = Some(unit);
                return;
            }
            unit.buf.extend_from_slice(&zone[pos..pos + need]);
            pos += need;
        };

        if total < kind.header_len(&unit.buf) {
            debug!(vcid, total, "unit length shorter than its header, dropping");
            return;
        }

        let remaining = total - unit.buf.len();
        let available = limit - pos;
        if available >= remaining {
            unit.buf.extend_from_slice(&zone[pos..pos + remaining]);
            if available > remaining {
                trace!(
                    vcid,
                    skipped = available - remaining,
                    "ignoring bytes between unit end and first unit pointer"
                );
            }
            self.emit(frame, kind, &unit.buf, true);
        } else {
            unit.buf.extend_from_slice(&zone[pos..limit]);
            if pointer.is_some() {
                debug!(
                    vcid,
                    expected = total,
                    actual = unit.buf.len(),
                    "unit interrupted by new unit start, truncating"
                );
                self.emit(frame, kind, &unit.buf, false);
            } else {
                self.in_flight = Some(unit);
            }
        }
    }

    /// Extract units starting at `start`, leaving any unit that extends past the end of the
    /// zone in flight.
    fn extract_units(&mut self, frame: &F, kind: UnitKind, zone: &[u8], start: usize) {
        let vcid = self.vcid;
        let mut pos = start;
        let mut idle_octets = 0;
        while pos < zone.len() {
            let rest = &zone[pos..];
            let header_len = kind.header_len(rest);
            if rest.len() < header_len {
                self.in_flight = Some(PartialUnit::new(rest, None));
                break;
            }
            let Some(total) = kind.total_len(rest) else {
                warn!(vcid, "failed to decode unit header, dropping remaining data");
                break;
            };
            if header_len == 1 {
                // single octet encapsulation idle packet
                idle_octets += 1;
                pos += 1;
                continue;
            }
            if total < header_len {
                debug!(
                    vcid,
                    total, "unit length shorter than its header, dropping remaining data"
                );
                break;
            }
            if rest.len() < total {
                self.in_flight = Some(PartialUnit::new(rest, Some(total)));
                break;
            }
            self.emit(frame, kind, &rest[..total], true);
            pos += total;
        }
        if idle_octets > 0 {
            trace!(vcid, idle_octets, "skipped encapsulation idle octets");
        }
    }

    fn emit(&mut self, frame: &F, kind: UnitKind, unit: &[u8], quality: bool) {
        let vcid = self.vcid;
        match kind {
            UnitKind::SpacePacket => {
                self.notify(|l| l.packet_extracted(vcid, frame, unit, quality));
            }
            UnitKind::Encapsulation => {
                self.notify(|l| l.encapsulation_packet_extracted(vcid, frame, unit, quality));
            }
        }
    }
}
