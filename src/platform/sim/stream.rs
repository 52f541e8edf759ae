use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::device::{FrameArrivedHandler, FrameReader};
use crate::platform::sim::device::SimSensor;
use crate::platform::sim::frame::{SimFrameData, SimFrameReference};

type HandlerSlot = Arc<Mutex<Option<FrameArrivedHandler<SimFrameReference>>>>;

/// Subscriptions open on a simulated depth source.
pub(crate) struct Hub {
    next_id: AtomicU64,
    slots: Mutex<Vec<(u64, HandlerSlot)>>,
    readers_available: AtomicBool,
}

impl Hub {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            slots: Mutex::new(Vec::new()),
            readers_available: AtomicBool::new(true),
        }
    }

    pub(crate) fn set_readers_available(&self, available: bool) {
        self.readers_available.store(available, Ordering::Release);
    }

    pub(crate) fn subscribe(self: &Arc<Self>) -> Option<SimReader> {
        if !self.readers_available.load(Ordering::Acquire) {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot: HandlerSlot = Arc::new(Mutex::new(None));
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::clone(&slot)));
        Some(SimReader {
            id,
            slot,
            hub: Arc::clone(self),
        })
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Run every registered handler once. Returns how many ran.
    pub(crate) fn notify(&self, reference: impl Fn() -> SimFrameReference) -> usize {
        // Snapshot so readers can come and go while handlers run.
        let slots: Vec<HandlerSlot> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();

        let mut notified = 0;
        for slot in slots {
            let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(handler) = guard.as_mut() {
                handler(&reference());
                notified += 1;
            }
        }
        notified
    }

    fn unsubscribe(&self, id: u64) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(slot_id, _)| *slot_id != id);
    }
}

/// A subscription on a [`SimDepthSource`](super::SimDepthSource).
pub struct SimReader {
    id: u64,
    slot: HandlerSlot,
    hub: Arc<Hub>,
}

impl FrameReader for SimReader {
    type Reference = SimFrameReference;

    fn set_frame_arrived(&mut self, handler: Option<FrameArrivedHandler<SimFrameReference>>) {
        // Taking the slot lock waits out a handler that is mid-call.
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = handler;
    }
}

impl Drop for SimReader {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

/// Background frame delivery at a fixed cadence. Dropping the ticker stops
/// the thread and waits for it.
pub struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl Ticker {
    pub(crate) fn spawn<G>(sensor: Arc<SimSensor>, interval: Duration, mut generator: G) -> Self
    where
        G: FnMut(u64) -> SimFrameData + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let mut tick = 0;
            while !stop_flag.load(Ordering::Acquire) {
                sensor.deliver(generator(tick));
                tick += 1;
                thread::sleep(interval);
            }
            tick
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop delivering and return the number of ticks generated.
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.stop.store(true, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                log::warn!("sim ticker thread panicked");
                0
            }),
            None => 0,
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
