use crate::types::FrameDescription;

/// A locked view of a frame's sample memory.
///
/// The bytes are owned by the frame provider and are only valid while the
/// lock is held; dropping the value releases the lock.
pub trait FrameBuffer {
    fn as_bytes(&self) -> &[u8];

    fn size(&self) -> usize {
        self.as_bytes().len()
    }
}

/// A borrowed depth frame. Dropping it hands the frame back to the provider.
pub trait DepthFrame {
    type Buffer<'a>: FrameBuffer
    where
        Self: 'a;

    /// Geometry of this particular frame.
    fn description(&self) -> FrameDescription;

    /// Lower bound of the reliable depth range reported for this frame.
    fn min_reliable_distance(&self) -> u16;

    /// Lock the underlying sample buffer. The lock cannot outlive the frame.
    fn lock_image_buffer(&self) -> Option<Self::Buffer<'_>>;
}

/// Handle passed to a frame-arrived handler. Acquisition never blocks:
/// it either yields the frame immediately or returns `None` because the
/// frame has expired.
pub trait FrameReference {
    type Frame<'a>: DepthFrame
    where
        Self: 'a;

    fn acquire_frame(&self) -> Option<Self::Frame<'_>>;
}
