use std::sync::Arc;

use crate::device::Sensor;
use crate::error::Error;
use crate::manager::SensorManager;
use crate::types::StreamKind;

/// Lifecycle shared by every sensor feed.
///
/// `start` switches the feed on and `stop` switches it off. Both are safe to
/// repeat: starting a started stream or stopping a stopped one does nothing.
pub trait SensorStream {
    fn kind(&self) -> StreamKind;

    fn start(&mut self) -> Result<(), Error>;

    fn stop(&mut self) -> Result<(), Error>;

    fn is_started(&self) -> bool;
}

/// Binds a stream variant to the shared [`SensorManager`].
///
/// Each variant embeds one and calls it from its own `start`/`stop`, so the
/// manager sees exactly one activation per started stream.
pub struct StreamBase<S: Sensor> {
    manager: Arc<SensorManager<S>>,
    activated: bool,
}

impl<S: Sensor> StreamBase<S> {
    pub fn new(manager: Arc<SensorManager<S>>) -> Self {
        Self {
            manager,
            activated: false,
        }
    }

    pub fn sensor(&self) -> Option<&Arc<S>> {
        self.manager.sensor()
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn start(&mut self) -> Result<(), Error> {
        if self.activated {
            return Ok(());
        }
        self.manager.activate()?;
        self.activated = true;
        Ok(())
    }

    /// Release this stream's activation. If the sensor refuses to close the
    /// activation is kept, so a later `stop` retries.
    pub fn stop(&mut self) -> Result<(), Error> {
        if !self.activated {
            return Ok(());
        }
        self.manager.deactivate()?;
        self.activated = false;
        Ok(())
    }
}
