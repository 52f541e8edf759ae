use thiserror::Error;

/// Driver-specific error details.
///
/// Sensor drivers report failures either as a plain message or as their own
/// error value, which is preserved as the source.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlatformError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Driver(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl PlatformError {
    pub fn driver<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Driver(Box::new(error))
    }
}

/// Top-level crate error.
///
/// Missing sensors, missing subscriptions and malformed frames are not
/// errors: they degrade to no-ops or skipped frames. Only the driver failing
/// to switch the physical sensor on or off is reported.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to activate sensor: {0}")]
    Activation(#[source] PlatformError),
    #[error("failed to deactivate sensor: {0}")]
    Deactivation(#[source] PlatformError),
}

/// Why a delivered frame was not converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FrameError {
    #[error("unsupported sample size: {0} bytes per pixel")]
    UnsupportedSampleSize(u32),
    #[error("buffer size mismatch: expected {expected} samples, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },
    #[error("frame is {actual_width}x{actual_height}, stream expects {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("surface is {surface_width}x{surface_height}, frames are {frame_width}x{frame_height}")]
    SurfaceMismatch {
        frame_width: u32,
        frame_height: u32,
        surface_width: u32,
        surface_height: u32,
    },
}

/// Rejected surface write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SurfaceError {
    #[error("rectangle {x},{y} {width}x{height} exceeds the {surface_width}x{surface_height} surface")]
    RectOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        surface_width: u32,
        surface_height: u32,
    },
    #[error("stride {stride} is smaller than the rectangle width {width}")]
    StrideTooSmall { stride: usize, width: u32 },
    #[error("pixel buffer too short: need {needed} bytes, got {actual}")]
    BufferTooShort { needed: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn error_display_includes_source_message() {
        let err = Error::Activation(PlatformError::Message("usb reset".into()));
        let msg = format!("{err}");
        assert!(msg.contains("activate"));
        assert!(msg.contains("usb reset"));
        assert!(err.source().is_some());
    }

    #[test]
    fn driver_error_is_transparent() {
        let io = std::io::Error::other("device unplugged");
        let err = PlatformError::driver(io);
        assert_eq!(err.to_string(), "device unplugged");
    }

    #[test]
    fn frame_error_display() {
        let err = FrameError::BufferSizeMismatch {
            expected: 100,
            actual: 50,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));

        let err = FrameError::DimensionMismatch {
            expected_width: 512,
            expected_height: 424,
            actual_width: 640,
            actual_height: 480,
        };
        assert_eq!(err.to_string(), "frame is 640x480, stream expects 512x424");
    }
}
