#![cfg_attr(not(feature = "std"), no_std)]

//! Depth sensor streaming.
//!
//! A [`DepthStream`] subscribes to the depth frames a [`Sensor`] delivers,
//! maps every 16-bit depth sample to an 8-bit gray level and republishes the
//! result into an [`ImageSurface`] that a UI layer can read at its own pace.
//!
//! The sensor itself is shared between streams through a [`SensorManager`],
//! which reference-counts activation.

pub mod convert;
pub mod frame;
pub mod types;

#[cfg(feature = "std")]
pub mod depth;
#[cfg(feature = "std")]
pub mod device;
#[cfg(feature = "std")]
pub mod error;
#[cfg(feature = "std")]
pub mod manager;
#[cfg(feature = "std")]
pub mod platform;
#[cfg(feature = "std")]
pub mod stream;
#[cfg(feature = "std")]
pub mod surface;

// Re-exports
pub use convert::*;
pub use frame::*;
pub use types::*;

#[cfg(feature = "std")]
pub use depth::*;
#[cfg(feature = "std")]
pub use device::*;
#[cfg(feature = "std")]
pub use error::*;
#[cfg(feature = "std")]
pub use manager::*;
#[cfg(feature = "std")]
pub use stream::*;
#[cfg(feature = "std")]
pub use surface::*;
