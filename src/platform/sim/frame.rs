use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::frame::{DepthFrame, FrameBuffer, FrameReference};
use crate::types::FrameDescription;

/// One simulated depth frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SimFrameData {
    description: FrameDescription,
    bytes: Vec<u8>,
    min_reliable_distance: u16,
    expired: bool,
    lock_unavailable: bool,
}

impl SimFrameData {
    /// A frame carrying exactly `samples`. The sample count is not checked
    /// against `description`, so malformed frames can be built too.
    pub fn from_samples(
        description: FrameDescription,
        samples: impl IntoIterator<Item = u16>,
        min_reliable_distance: u16,
    ) -> Self {
        let bytes = samples.into_iter().flat_map(u16::to_ne_bytes).collect();
        Self {
            description,
            bytes,
            min_reliable_distance,
            expired: false,
            lock_unavailable: false,
        }
    }

    /// A well-formed frame with every pixel at `depth`.
    pub fn filled(description: FrameDescription, depth: u16, min_reliable_distance: u16) -> Self {
        let samples = std::iter::repeat_n(depth, description.pixel_count());
        Self::from_samples(description, samples, min_reliable_distance)
    }

    /// Make acquisition fail, as if the frame expired before the handler ran.
    pub fn expired(mut self) -> Self {
        self.expired = true;
        self
    }

    /// Make locking the sample buffer fail.
    pub fn lock_unavailable(mut self) -> Self {
        self.lock_unavailable = true;
        self
    }

    pub fn description(&self) -> FrameDescription {
        self.description
    }
}

/// Frame handle passed to handlers by the simulated sensor.
pub struct SimFrameReference {
    data: Arc<SimFrameData>,
    borrows: Arc<AtomicUsize>,
}

impl SimFrameReference {
    pub(crate) fn new(data: Arc<SimFrameData>, borrows: Arc<AtomicUsize>) -> Self {
        Self { data, borrows }
    }
}

impl FrameReference for SimFrameReference {
    type Frame<'a>
        = SimFrame<'a>
    where
        Self: 'a;

    fn acquire_frame(&self) -> Option<SimFrame<'_>> {
        if self.data.expired {
            return None;
        }
        self.borrows.fetch_add(1, Ordering::AcqRel);
        Some(SimFrame {
            data: &self.data,
            borrows: &self.borrows,
        })
    }
}

/// An acquired simulated frame.
pub struct SimFrame<'a> {
    data: &'a SimFrameData,
    borrows: &'a AtomicUsize,
}

impl DepthFrame for SimFrame<'_> {
    type Buffer<'b>
        = SimBuffer<'b>
    where
        Self: 'b;

    fn description(&self) -> FrameDescription {
        self.data.description
    }

    fn min_reliable_distance(&self) -> u16 {
        self.data.min_reliable_distance
    }

    fn lock_image_buffer(&self) -> Option<SimBuffer<'_>> {
        if self.data.lock_unavailable {
            return None;
        }
        self.borrows.fetch_add(1, Ordering::AcqRel);
        Some(SimBuffer {
            bytes: &self.data.bytes,
            borrows: self.borrows,
        })
    }
}

impl Drop for SimFrame<'_> {
    fn drop(&mut self) {
        self.borrows.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A locked simulated sample buffer.
pub struct SimBuffer<'a> {
    bytes: &'a [u8],
    borrows: &'a AtomicUsize,
}

impl FrameBuffer for SimBuffer<'_> {
    fn as_bytes(&self) -> &[u8] {
        self.bytes
    }
}

impl Drop for SimBuffer<'_> {
    fn drop(&mut self) {
        self.borrows.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrows_are_counted_and_released() {
        let desc = FrameDescription::new(2, 1, 2);
        let borrows = Arc::new(AtomicUsize::new(0));
        let data = Arc::new(SimFrameData::from_samples(desc, [1, 0x0102], 7));
        let reference = SimFrameReference::new(data, Arc::clone(&borrows));

        {
            let frame = reference.acquire_frame().unwrap();
            assert_eq!(frame.min_reliable_distance(), 7);
            assert_eq!(frame.description(), desc);
            let buffer = frame.lock_image_buffer().unwrap();
            assert_eq!(borrows.load(Ordering::Acquire), 2);
            assert_eq!(buffer.size(), 4);
            assert_eq!(&buffer.as_bytes()[2..], &0x0102u16.to_ne_bytes());
        }
        assert_eq!(borrows.load(Ordering::Acquire), 0);
    }

    #[test]
    fn expired_frames_cannot_be_acquired() {
        let desc = FrameDescription::new(1, 1, 2);
        let borrows = Arc::new(AtomicUsize::new(0));
        let data = Arc::new(SimFrameData::filled(desc, 1, 0).expired());
        let reference = SimFrameReference::new(data, Arc::clone(&borrows));
        assert!(reference.acquire_frame().is_none());
        assert_eq!(borrows.load(Ordering::Acquire), 0);
    }

    #[test]
    fn filled_matches_description() {
        let desc = FrameDescription::new(3, 2, 2);
        let data = SimFrameData::filled(desc, 9, 0);
        assert_eq!(data.bytes.len(), 6 * 2);
        assert_eq!(data.description(), desc);
    }
}
