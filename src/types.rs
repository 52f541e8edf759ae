use core::num::NonZeroU16;

use arrayvec::ArrayVec;

use crate::convert::MAP_DEPTH_TO_BYTE;

/// Maximum number of stream kinds a device can advertise.
pub const MAX_STREAM_KINDS: usize = 4;

/// The sensor feeds a device may offer. Only [`StreamKind::Depth`] has a
/// stream implementation in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StreamKind {
    Depth,
    Color,
    Infrared,
    BodyIndex,
}

/// Pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Sensor-reported frame geometry. Fixed for the lifetime of a sensor
/// connection; every buffer the stream allocates is sized from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameDescription {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
}

impl FrameDescription {
    /// Geometry used when no sensor is attached.
    pub const EMPTY: Self = Self {
        width: 0,
        height: 0,
        bytes_per_pixel: 2,
    };

    pub const fn new(width: u32, height: u32, bytes_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            bytes_per_pixel,
        }
    }

    pub const fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub const fn pixel_count(&self) -> usize {
        self.size().pixel_count()
    }
}

/// Inclusive interval of depth readings considered trustworthy, in raw
/// sensor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthRange {
    pub min: u16,
    pub max: u16,
}

impl DepthRange {
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    #[inline]
    pub const fn contains(&self, depth: u16) -> bool {
        depth >= self.min && depth <= self.max
    }
}

/// What a device can deliver.
///
/// The depth description is the single source of depth geometry: a device
/// lists [`StreamKind::Depth`] exactly when it carries one.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCapabilities {
    depth: Option<FrameDescription>,
    streams: ArrayVec<StreamKind, MAX_STREAM_KINDS>,
}

impl DeviceCapabilities {
    /// Capabilities of a depth-only device.
    pub fn depth_only(description: FrameDescription) -> Self {
        Self::new(Some(description), [])
    }

    /// Build from a depth description and the other kinds the device
    /// offers. `StreamKind::Depth` in `kinds` is ignored; it is listed iff
    /// `depth` is `Some`. Duplicates are ignored and anything beyond
    /// [`MAX_STREAM_KINDS`] distinct kinds is dropped.
    pub fn new(
        depth: Option<FrameDescription>,
        kinds: impl IntoIterator<Item = StreamKind>,
    ) -> Self {
        let mut streams = ArrayVec::new();
        if depth.is_some() {
            streams.push(StreamKind::Depth);
        }
        for kind in kinds {
            if kind == StreamKind::Depth || streams.contains(&kind) {
                continue;
            }
            if streams.try_push(kind).is_err() {
                break;
            }
        }
        Self { depth, streams }
    }

    /// Depth geometry, if the device has a depth feed.
    pub fn depth(&self) -> Option<FrameDescription> {
        self.depth
    }

    pub fn streams(&self) -> &[StreamKind] {
        &self.streams
    }

    pub fn supports(&self, kind: StreamKind) -> bool {
        self.streams.contains(&kind)
    }
}

/// How a scaled depth value that no longer fits in 8 bits becomes a byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Narrowing {
    /// Plain narrowing cast: keep the low 8 bits (wraps modulo 256).
    #[default]
    Wrap,
    /// Clamp to 255.
    Saturate,
}

/// Configuration for a depth stream's conversion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStreamConfig {
    /// Divisor mapping raw depth units to gray levels.
    pub depth_to_byte: NonZeroU16,
    /// Upper bound of the reliable range. The lower bound comes from each
    /// frame.
    pub max_depth: u16,
    pub narrowing: Narrowing,
}

impl Default for DepthStreamConfig {
    fn default() -> Self {
        Self {
            depth_to_byte: MAP_DEPTH_TO_BYTE,
            max_depth: u16::MAX,
            narrowing: Narrowing::Wrap,
        }
    }
}

impl DepthStreamConfig {
    pub fn with_depth_to_byte(mut self, ratio: NonZeroU16) -> Self {
        self.depth_to_byte = ratio;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u16) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_narrowing(mut self, narrowing: Narrowing) -> Self {
        self.narrowing = narrowing;
        self
    }

    /// Reliable range for a frame reporting `min_reliable` as its lower
    /// bound.
    pub fn range_for(&self, min_reliable: u16) -> DepthRange {
        DepthRange::new(min_reliable, self.max_depth)
    }
}
