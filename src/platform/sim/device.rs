use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::device::{DepthFrameSource, Sensor};
use crate::error::PlatformError;
use crate::platform::sim::frame::{SimFrameData, SimFrameReference};
use crate::platform::sim::stream::{Hub, SimReader, Ticker};
use crate::types::{DeviceCapabilities, FrameDescription};

/// Depth feed of a [`SimSensor`].
pub struct SimDepthSource {
    hub: Arc<Hub>,
}

impl DepthFrameSource for SimDepthSource {
    type Reader = SimReader;

    fn open_reader(&self) -> Option<SimReader> {
        self.hub.subscribe()
    }
}

/// A depth sensor driven entirely by the caller.
pub struct SimSensor {
    capabilities: DeviceCapabilities,
    source: SimDepthSource,
    open: AtomicBool,
    open_calls: AtomicUsize,
    fail_open: AtomicBool,
    fail_close: AtomicBool,
    borrows: Arc<AtomicUsize>,
}

impl SimSensor {
    pub fn new(description: FrameDescription) -> Self {
        Self::with_capabilities(DeviceCapabilities::depth_only(description))
    }

    /// 512x424 at 16 bits per sample.
    pub fn kinect_v2() -> Self {
        Self::new(FrameDescription::new(512, 424, 2))
    }

    /// Depth geometry comes from `capabilities`; without a depth
    /// description the sensor has no depth feed.
    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            source: SimDepthSource {
                hub: Arc::new(Hub::new()),
            },
            open: AtomicBool::new(false),
            open_calls: AtomicUsize::new(0),
            fail_open: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            borrows: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of successful `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.open_calls.load(Ordering::Acquire)
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::Release);
    }

    /// When set, `close` fails and the sensor stays open.
    pub fn set_fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::Release);
    }

    /// When false, `open_reader` returns `None`.
    pub fn set_readers_available(&self, available: bool) {
        self.source.hub.set_readers_available(available);
    }

    pub fn subscriber_count(&self) -> usize {
        self.source.hub.subscriber_count()
    }

    /// Frames plus buffer locks currently held by handlers.
    pub fn outstanding_borrows(&self) -> usize {
        self.borrows.load(Ordering::Acquire)
    }

    /// Wrap `frame` in a reference tracked by this sensor's borrow counter.
    pub fn reference(&self, frame: SimFrameData) -> SimFrameReference {
        SimFrameReference::new(Arc::new(frame), Arc::clone(&self.borrows))
    }

    /// Hand `frame` to every registered handler, synchronously. Nothing is
    /// delivered while the sensor is closed. Returns how many handlers ran.
    pub fn deliver(&self, frame: SimFrameData) -> usize {
        if !self.is_open() {
            return 0;
        }
        let data = Arc::new(frame);
        self.source
            .hub
            .notify(|| SimFrameReference::new(Arc::clone(&data), Arc::clone(&self.borrows)))
    }

    /// Deliver `generator(tick)` every `interval` on a background thread.
    pub fn spawn_ticker<G>(self: &Arc<Self>, interval: Duration, generator: G) -> Ticker
    where
        G: FnMut(u64) -> SimFrameData + Send + 'static,
    {
        Ticker::spawn(Arc::clone(self), interval, generator)
    }
}

impl Sensor for SimSensor {
    type DepthSource = SimDepthSource;

    fn open(&self) -> Result<(), PlatformError> {
        if self.fail_open.load(Ordering::Acquire) {
            return Err(PlatformError::Message("simulated open failure".into()));
        }
        self.open.store(true, Ordering::Release);
        self.open_calls.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn close(&self) -> Result<(), PlatformError> {
        if self.fail_close.load(Ordering::Acquire) {
            return Err(PlatformError::Message("simulated close failure".into()));
        }
        self.open.store(false, Ordering::Release);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities.clone()
    }

    fn depth_frame_source(&self) -> &SimDepthSource {
        &self.source
    }
}
