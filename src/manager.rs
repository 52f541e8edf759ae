use std::sync::{Arc, Mutex, PoisonError};

use crate::device::Sensor;
use crate::error::Error;

/// Owns the sensor handle shared by every stream variant.
///
/// Streams request activation through [`activate`](Self::activate) and
/// release it through [`deactivate`](Self::deactivate); the sensor is opened
/// on the first activation and closed when the last one is released.
///
/// The count tracks the hardware: a failed open leaves it at zero and a
/// failed close leaves it at one, with the sensor still open.
pub struct SensorManager<S: Sensor> {
    sensor: Option<Arc<S>>,
    active: Mutex<usize>,
}

impl<S: Sensor> SensorManager<S> {
    pub fn new(sensor: S) -> Self {
        Self::from_shared(Arc::new(sensor))
    }

    pub fn from_shared(sensor: Arc<S>) -> Self {
        Self {
            sensor: Some(sensor),
            active: Mutex::new(0),
        }
    }

    /// A manager with no sensor attached. Every operation is a no-op.
    pub fn detached() -> Self {
        Self {
            sensor: None,
            active: Mutex::new(0),
        }
    }

    pub fn sensor(&self) -> Option<&Arc<S>> {
        self.sensor.as_ref()
    }

    pub fn active_count(&self) -> usize {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_active(&self) -> bool {
        self.active_count() > 0
    }

    pub fn activate(&self) -> Result<(), Error> {
        let Some(sensor) = &self.sensor else {
            log::debug!("activate: no sensor attached");
            return Ok(());
        };

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active == 0 {
            sensor.open().map_err(Error::Activation)?;
            log::info!("sensor opened");
        }
        *active += 1;
        Ok(())
    }

    pub fn deactivate(&self) -> Result<(), Error> {
        let Some(sensor) = &self.sensor else {
            return Ok(());
        };

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match *active {
            0 => Ok(()),
            1 => {
                sensor.close().map_err(Error::Deactivation)?;
                *active = 0;
                log::info!("sensor closed");
                Ok(())
            }
            _ => {
                *active -= 1;
                Ok(())
            }
        }
    }
}
