use std::collections::HashMap;

use tracing::trace;

use super::{ChannelFrame, VirtualChannel};
use crate::framing::Vcid;
use crate::Result;

type UnroutedHandler<F> = Box<dyn FnMut(&F) + Send>;

/// Routes frames from a master channel to the [VirtualChannel] for their vcid.
///
/// # Example
/// ```
/// use ccsds_datalink::framing::TmFrameBuilder;
/// use ccsds_datalink::receiver::{ChannelAccessMode, TmVirtualChannel, VirtualChannelDemux};
///
/// let mut demux = VirtualChannelDemux::default()
///     .with_channel(TmVirtualChannel::new(0, ChannelAccessMode::Data))
///     .with_channel(TmVirtualChannel::new(1, ChannelAccessMode::Packet));
///
/// let mut builder = TmFrameBuilder::new(16, 0, false, false).unwrap();
/// builder.vcid(5).unwrap().add_data(&[0; 10]);
/// demux.process(&builder.build().unwrap()).unwrap();
/// assert_eq!(demux.unrouted(), 1);
/// ```
pub struct VirtualChannelDemux<F> {
    channels: HashMap<Vcid, VirtualChannel<F>>,
    unrouted: usize,
    unrouted_handler: Option<UnroutedHandler<F>>,
}

impl<F> Default for VirtualChannelDemux<F> {
    fn default() -> Self {
        VirtualChannelDemux {
            channels: HashMap::default(),
            unrouted: 0,
            unrouted_handler: None,
        }
    }
}

impl<F: ChannelFrame> VirtualChannelDemux<F> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_channel(mut self, channel: VirtualChannel<F>) -> Self {
        self.add_channel(channel);
        self
    }

    /// Add a channel, returning any existing channel for the same vcid.
    pub fn add_channel(&mut self, channel: VirtualChannel<F>) -> Option<VirtualChannel<F>> {
        self.channels.insert(channel.vcid(), channel)
    }

    /// Set a handler called with frames that do not have a channel.
    #[must_use]
    pub fn with_unrouted_handler<H>(mut self, handler: H) -> Self
    where
        H: FnMut(&F) + Send + 'static,
    {
        self.unrouted_handler = Some(Box::new(handler));
        self
    }

    #[must_use]
    pub fn channel(&self, vcid: Vcid) -> Option<&VirtualChannel<F>> {
        self.channels.get(&vcid)
    }

    pub fn channel_mut(&mut self, vcid: Vcid) -> Option<&mut VirtualChannel<F>> {
        self.channels.get_mut(&vcid)
    }

    /// Number of frames processed that did not have a channel.
    #[must_use]
    pub fn unrouted(&self) -> usize {
        self.unrouted
    }

    /// Provide `frame` to the channel for its vcid.
    ///
    /// # Errors
    /// Any error produced by the channel processing the frame.
    pub fn process(&mut self, frame: &F) -> Result<()> {
        let vcid = frame.vcid();
        match self.channels.get_mut(&vcid) {
            Some(channel) => channel.process(frame),
            None => {
                trace!(vcid, "no channel for frame");
                self.unrouted += 1;
                if let Some(handler) = self.unrouted_handler.as_mut() {
                    handler(frame);
                }
                Ok(())
            }
        }
    }

    /// Reset all channels.
    pub fn reset(&mut self) {
        for channel in self.channels.values_mut() {
            channel.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::framing::{TmFrame, TmFrameBuilder};
    use crate::receiver::{ChannelAccessMode, TmVirtualChannel, VirtualChannelEvent};

    fn frame(vcid: Vcid) -> TmFrame {
        let mut builder = TmFrameBuilder::new(16, 0, false, false).unwrap();
        builder.vcid(vcid).unwrap().add_data(&[vcid as u8; 10]);
        builder.build().unwrap()
    }

    #[test]
    fn routes_by_vcid() {
        let (tx0, rx0) = crossbeam::channel::unbounded();
        let (tx1, rx1) = crossbeam::channel::unbounded();
        let unrouted = Arc::new(Mutex::new(Vec::new()));
        let handler_unrouted = unrouted.clone();
        let mut demux = VirtualChannelDemux::new()
            .with_channel(TmVirtualChannel::new(0, ChannelAccessMode::Data).with_listener(tx0))
            .with_channel(TmVirtualChannel::new(1, ChannelAccessMode::Data).with_listener(tx1))
            .with_unrouted_handler(move |f: &TmFrame| {
                handler_unrouted.lock().unwrap().push(f.header().vcid);
            });

        for vcid in [0, 1, 1, 3] {
            demux.process(&frame(vcid)).unwrap();
        }

        let data = |rx: &crossbeam::channel::Receiver<VirtualChannelEvent<TmFrame>>| {
            rx.try_iter()
                .filter(|e| matches!(e, VirtualChannelEvent::DataExtracted { .. }))
                .count()
        };
        assert_eq!(data(&rx0), 1);
        assert_eq!(data(&rx1), 2);
        assert_eq!(demux.unrouted(), 1);
        assert_eq!(*unrouted.lock().unwrap(), vec![3]);
    }

    #[test]
    fn add_channel_replaces() {
        let mut demux = VirtualChannelDemux::new();
        assert!(demux
            .add_channel(TmVirtualChannel::new(2, ChannelAccessMode::Data))
            .is_none());
        let old = demux.add_channel(TmVirtualChannel::new(2, ChannelAccessMode::Packet));
        assert_eq!(old.unwrap().access_mode(), ChannelAccessMode::Data);
        assert_eq!(
            demux.channel(2).unwrap().access_mode(),
            ChannelAccessMode::Packet
        );
        assert!(demux.channel_mut(3).is_none());
    }
}
