use crate::error::PlatformError;
use crate::frame::FrameReference;
use crate::types::DeviceCapabilities;

/// Callback run once per delivered frame.
pub type FrameArrivedHandler<R> = Box<dyn FnMut(&R) + Send + 'static>;

/// A physical sensor, as exposed by its driver.
///
/// Opening and closing switch the hardware on and off. Streams never call
/// these directly; they go through a [`SensorManager`](crate::SensorManager)
/// so that several streams can share one device.
pub trait Sensor: Send + Sync + 'static {
    type DepthSource: DepthFrameSource;

    fn open(&self) -> Result<(), PlatformError>;
    fn close(&self) -> Result<(), PlatformError>;
    fn is_open(&self) -> bool;

    /// What the device offers. Its depth description is the geometry of
    /// every frame the depth source delivers.
    fn capabilities(&self) -> DeviceCapabilities;
    fn depth_frame_source(&self) -> &Self::DepthSource;
}

/// The depth feed of a sensor.
pub trait DepthFrameSource: Send + Sync {
    type Reader: FrameReader;

    /// Open a new frame subscription, or `None` if the driver cannot
    /// provide one right now.
    fn open_reader(&self) -> Option<Self::Reader>;
}

/// A frame subscription. Dropping the reader closes it.
pub trait FrameReader: Send {
    type Reference: FrameReference + 'static;

    /// Register (`Some`) or unregister (`None`) the frame-arrived handler,
    /// replacing any previous one.
    ///
    /// Unregistering must wait for a handler call already in progress to
    /// return, and no call may start once it has returned.
    fn set_frame_arrived(&mut self, handler: Option<FrameArrivedHandler<Self::Reference>>);
}
