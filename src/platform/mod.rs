//! Sensor backends implementing the [`device`](crate::device) traits.

#[cfg(feature = "sim")]
pub mod sim;
