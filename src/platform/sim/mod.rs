//! Software depth sensor.
//!
//! Frames are supplied by the caller, either one at a time with
//! [`SimSensor::deliver`] or at a fixed cadence from a background thread
//! with [`SimSensor::spawn_ticker`]. Every frame and buffer borrow is
//! counted so callers can check that nothing outlives its callback.

use std::time::Duration;

pub mod device;
pub mod frame;
pub mod stream;

pub use device::{SimDepthSource, SimSensor};
pub use frame::{SimBuffer, SimFrame, SimFrameData, SimFrameReference};
pub use stream::{SimReader, Ticker};

/// 30 frames per second, the usual depth sensor cadence.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(33_333);
