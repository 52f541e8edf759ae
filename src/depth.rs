use std::sync::{Arc, Mutex, PoisonError};

use crate::convert::{BYTES_PER_DEPTH_SAMPLE, convert_depth_samples};
use crate::device::{DepthFrameSource, FrameArrivedHandler, FrameReader, Sensor};
use crate::error::{Error, FrameError};
use crate::frame::{DepthFrame, FrameBuffer, FrameReference};
use crate::manager::SensorManager;
use crate::stream::{SensorStream, StreamBase};
use crate::surface::{ImageSurface, Rect};
use crate::types::{DepthStreamConfig, FrameDescription, StreamKind};

type ReaderOf<S> = <<S as Sensor>::DepthSource as DepthFrameSource>::Reader;
type ReferenceOf<S> = <ReaderOf<S> as FrameReader>::Reference;

/// What happened to one frame-arrived notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Converted and published to the surface.
    Rendered,
    /// The frame expired or its buffer could not be locked.
    Unavailable,
    /// The frame did not match the stream's geometry.
    Malformed(FrameError),
}

/// Per-stream frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub rendered: u64,
    pub unavailable: u64,
    pub malformed: u64,
    /// Lower reliable bound of the last rendered frame.
    pub last_min_reliable_distance: Option<u16>,
}

/// State touched by the frame-arrived handler. Kept behind a mutex so that
/// notifications delivered concurrently are processed one at a time.
struct DepthPipeline {
    description: FrameDescription,
    config: DepthStreamConfig,
    pixels: Vec<u8>,
    surface: ImageSurface,
    stats: FrameStats,
}

impl DepthPipeline {
    fn validate<F: DepthFrame>(&self, frame: &F, buffer_size: usize) -> Result<(), FrameError> {
        let desc = &self.description;
        if desc.bytes_per_pixel as usize != BYTES_PER_DEPTH_SAMPLE {
            return Err(FrameError::UnsupportedSampleSize(desc.bytes_per_pixel));
        }

        let expected = desc.pixel_count();
        let actual = buffer_size / desc.bytes_per_pixel as usize;
        if expected != actual {
            return Err(FrameError::BufferSizeMismatch { expected, actual });
        }

        let frame_desc = frame.description();
        if frame_desc.size() != desc.size() {
            return Err(FrameError::DimensionMismatch {
                expected_width: desc.width,
                expected_height: desc.height,
                actual_width: frame_desc.width,
                actual_height: frame_desc.height,
            });
        }

        if desc.size() != self.surface.size() {
            return Err(FrameError::SurfaceMismatch {
                frame_width: desc.width,
                frame_height: desc.height,
                surface_width: self.surface.width(),
                surface_height: self.surface.height(),
            });
        }
        Ok(())
    }

    /// Convert the frame behind `reference` into `pixels`. The buffer lock
    /// and the frame borrow are both released when this returns.
    fn process<R: FrameReference>(&mut self, reference: &R) -> FrameOutcome {
        let Some(frame) = reference.acquire_frame() else {
            return FrameOutcome::Unavailable;
        };
        let Some(buffer) = frame.lock_image_buffer() else {
            return FrameOutcome::Unavailable;
        };

        if let Err(err) = self.validate(&frame, buffer.size()) {
            return FrameOutcome::Malformed(err);
        }

        let min_reliable = frame.min_reliable_distance();
        let range = self.config.range_for(min_reliable);
        convert_depth_samples(buffer.as_bytes(), range, &self.config, &mut self.pixels);
        self.stats.last_min_reliable_distance = Some(min_reliable);
        FrameOutcome::Rendered
    }

    fn render(&self) {
        let rect = Rect::full(self.surface.size());
        let stride = self.surface.width() as usize;
        if let Err(err) = self.surface.write_pixels(rect, &self.pixels, stride) {
            log::warn!("depth surface rejected frame: {err}");
        }
    }

    fn handle_frame_arrived<R: FrameReference>(&mut self, reference: &R) -> FrameOutcome {
        let outcome = self.process(reference);
        match &outcome {
            FrameOutcome::Rendered => {
                self.render();
                self.stats.rendered += 1;
                log::trace!("depth frame {} rendered", self.stats.rendered);
            }
            FrameOutcome::Unavailable => {
                self.stats.unavailable += 1;
                log::trace!("depth frame unavailable, skipping tick");
            }
            FrameOutcome::Malformed(err) => {
                self.stats.malformed += 1;
                log::debug!("dropping malformed depth frame: {err}");
            }
        }
        outcome
    }
}

/// The handler registered with a reader. Calls may come from any driver
/// thread; each one runs to completion under the pipeline lock.
fn frame_arrived_handler<R: FrameReference + 'static>(
    pipeline: Arc<Mutex<DepthPipeline>>,
) -> FrameArrivedHandler<R> {
    Box::new(move |reference: &R| {
        pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle_frame_arrived(reference);
    })
}

/// Depth feed: subscribes to a sensor's depth frames and publishes each one
/// as an 8-bit grayscale image.
///
/// Construction sizes every buffer from the sensor's depth description;
/// no allocation happens per frame. Without a sensor, or with one lacking a
/// depth feed, the stream stays empty and `start`/`stop` only touch the
/// manager.
pub struct DepthStream<S: Sensor> {
    base: StreamBase<S>,
    pipeline: Arc<Mutex<DepthPipeline>>,
    surface: ImageSurface,
    description: FrameDescription,
    config: DepthStreamConfig,
    reader: Option<ReaderOf<S>>,
}

impl<S: Sensor> DepthStream<S> {
    pub fn new(manager: Arc<SensorManager<S>>) -> Self {
        Self::with_config(manager, DepthStreamConfig::default())
    }

    pub fn with_config(manager: Arc<SensorManager<S>>, config: DepthStreamConfig) -> Self {
        let base = StreamBase::new(manager);
        let description = match base.sensor().map(|sensor| sensor.capabilities().depth()) {
            Some(Some(description)) => description,
            Some(None) => {
                log::warn!("sensor has no depth feed");
                FrameDescription::EMPTY
            }
            None => FrameDescription::EMPTY,
        };

        let surface = ImageSurface::new(description.width, description.height);
        let pipeline = DepthPipeline {
            description,
            config,
            pixels: vec![0; description.pixel_count()],
            surface: surface.clone(),
            stats: FrameStats::default(),
        };

        Self {
            base,
            pipeline: Arc::new(Mutex::new(pipeline)),
            surface,
            description,
            config,
            reader: None,
        }
    }

    /// The image consumers should display.
    pub fn image_source(&self) -> &ImageSurface {
        &self.surface
    }

    pub fn description(&self) -> FrameDescription {
        self.description
    }

    pub fn config(&self) -> &DepthStreamConfig {
        &self.config
    }

    pub fn stats(&self) -> FrameStats {
        self.pipeline.lock().unwrap_or_else(PoisonError::into_inner).stats
    }

    /// True while a frame subscription is open.
    pub fn is_subscribed(&self) -> bool {
        self.reader.is_some()
    }

    fn open_subscription(&mut self) {
        if self.reader.is_some() {
            return;
        }
        let Some(sensor) = self.base.sensor() else {
            log::debug!("depth stream has no sensor, not subscribing");
            return;
        };
        if sensor.capabilities().depth().is_none() {
            return;
        }
        let Some(mut reader) = sensor.depth_frame_source().open_reader() else {
            log::warn!("depth frame reader unavailable");
            return;
        };

        let handler: FrameArrivedHandler<ReferenceOf<S>> =
            frame_arrived_handler(Arc::clone(&self.pipeline));
        reader.set_frame_arrived(Some(handler));
        log::debug!(
            "depth subscription opened ({}x{})",
            self.description.width,
            self.description.height
        );
        self.reader = Some(reader);
    }

    fn close_subscription(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.set_frame_arrived(None);
            drop(reader);
            log::debug!("depth subscription closed");
        }
    }
}

impl<S: Sensor> SensorStream for DepthStream<S> {
    fn kind(&self) -> StreamKind {
        StreamKind::Depth
    }

    fn start(&mut self) -> Result<(), Error> {
        self.base.start()?;
        self.open_subscription();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Error> {
        self.close_subscription();
        self.base.stop()
    }

    fn is_started(&self) -> bool {
        self.base.is_activated()
    }
}

impl<S: Sensor> Drop for DepthStream<S> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::warn!("depth stream dropped while stopping: {err}");
        }
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::platform::sim::{SimFrameData, SimFrameReference, SimSensor};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn pipeline(description: FrameDescription) -> DepthPipeline {
        DepthPipeline {
            description,
            config: DepthStreamConfig::default(),
            pixels: vec![0; description.pixel_count()],
            surface: ImageSurface::new(description.width, description.height),
            stats: FrameStats::default(),
        }
    }

    #[test]
    fn renders_reference_scenario() {
        let desc = FrameDescription::new(512, 424, 2);
        let sensor = SimSensor::new(desc);
        let mut samples = vec![0u16; desc.pixel_count()];
        samples[0] = 4000;
        samples[1] = 50;
        samples[2] = u16::MAX;
        samples[3] = 500;
        let frame = SimFrameData::from_samples(desc, samples, 500);

        let mut pipeline = pipeline(desc);
        let outcome = pipeline.handle_frame_arrived(&sensor.reference(frame));
        assert_eq!(outcome, FrameOutcome::Rendered);
        assert_eq!(pipeline.pixels.len(), 512 * 424);
        assert_eq!(&pipeline.pixels[..4], &[129, 0, 66, 16]);
        assert_eq!(pipeline.surface.pixel(0, 0), Some(129));
        assert_eq!(pipeline.surface.pixel(3, 0), Some(16));
        assert_eq!(pipeline.stats.last_min_reliable_distance, Some(500));
        assert_eq!(sensor.outstanding_borrows(), 0);
    }

    #[test]
    fn buffer_size_mismatch_is_malformed() {
        let desc = FrameDescription::new(4, 2, 2);
        let sensor = SimSensor::new(desc);
        let short = SimFrameData::from_samples(desc, vec![1000; 6], 0);

        let mut pipeline = pipeline(desc);
        let outcome = pipeline.handle_frame_arrived(&sensor.reference(short));
        assert_eq!(
            outcome,
            FrameOutcome::Malformed(FrameError::BufferSizeMismatch {
                expected: 8,
                actual: 6
            })
        );
        assert_eq!(pipeline.surface.generation(), 0);
        assert_eq!(pipeline.stats.malformed, 1);
        assert_eq!(sensor.outstanding_borrows(), 0);
    }

    #[test]
    fn reshaped_frame_is_malformed() {
        let desc = FrameDescription::new(4, 2, 2);
        let sensor = SimSensor::new(desc);
        // Same pixel count, different shape.
        let frame = SimFrameData::filled(FrameDescription::new(2, 4, 2), 1000, 0);

        let mut pipeline = pipeline(desc);
        let outcome = pipeline.handle_frame_arrived(&sensor.reference(frame));
        assert!(matches!(
            outcome,
            FrameOutcome::Malformed(FrameError::DimensionMismatch { .. })
        ));
        assert_eq!(pipeline.surface.generation(), 0);
    }

    #[test]
    fn unsupported_sample_size_is_malformed() {
        let desc = FrameDescription::new(2, 2, 4);
        let sensor = SimSensor::new(desc);
        let frame = SimFrameData::filled(FrameDescription::new(2, 2, 2), 1000, 0);

        let mut pipeline = pipeline(desc);
        let outcome = pipeline.handle_frame_arrived(&sensor.reference(frame));
        assert_eq!(
            outcome,
            FrameOutcome::Malformed(FrameError::UnsupportedSampleSize(4))
        );
    }

    #[test]
    fn surface_mismatch_is_malformed() {
        let desc = FrameDescription::new(2, 2, 2);
        let sensor = SimSensor::new(desc);
        let mut pipeline = pipeline(desc);
        pipeline.surface = ImageSurface::new(3, 3);

        let outcome =
            pipeline.handle_frame_arrived(&sensor.reference(SimFrameData::filled(desc, 1000, 0)));
        assert!(matches!(
            outcome,
            FrameOutcome::Malformed(FrameError::SurfaceMismatch { .. })
        ));
        assert_eq!(pipeline.surface.generation(), 0);
    }

    #[test]
    fn expired_and_locked_frames_are_skipped() {
        let desc = FrameDescription::new(2, 2, 2);
        let sensor = SimSensor::new(desc);
        let mut pipeline = pipeline(desc);

        let expired = SimFrameData::filled(desc, 1000, 0).expired();
        assert_eq!(
            pipeline.handle_frame_arrived(&sensor.reference(expired)),
            FrameOutcome::Unavailable
        );
        let locked = SimFrameData::filled(desc, 1000, 0).lock_unavailable();
        assert_eq!(
            pipeline.handle_frame_arrived(&sensor.reference(locked)),
            FrameOutcome::Unavailable
        );

        assert_eq!(pipeline.stats.unavailable, 2);
        assert_eq!(pipeline.surface.generation(), 0);
        assert_eq!(sensor.outstanding_borrows(), 0);
    }

    #[test]
    fn concurrent_notifications_publish_whole_frames() {
        const FRAMES: u64 = 200;
        let desc = FrameDescription::new(64, 64, 2);
        let sensor = SimSensor::new(desc);
        let pipeline = Arc::new(Mutex::new(pipeline(desc)));
        let surface = pipeline.lock().unwrap().surface.clone();
        let done = AtomicBool::new(false);

        thread::scope(|scope| {
            let surface = &surface;
            let done = &done;
            let watcher = scope.spawn(move || {
                let mut checked = 0;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    let image = surface.snapshot();
                    let first = image.as_raw()[0];
                    assert!(matches!(first, 0 | 100 | 200), "unexpected level {first}");
                    assert!(image.as_raw().iter().all(|&p| p == first), "torn frame");
                    checked += 1;
                    if finished {
                        return checked;
                    }
                }
            });

            let writers: Vec<_> = [3100u16, 6200]
                .into_iter()
                .map(|depth| {
                    let mut handler: FrameArrivedHandler<SimFrameReference> =
                        frame_arrived_handler(Arc::clone(&pipeline));
                    let sensor = &sensor;
                    scope.spawn(move || {
                        for _ in 0..FRAMES {
                            handler(&sensor.reference(SimFrameData::filled(desc, depth, 0)));
                        }
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }
            done.store(true, Ordering::Release);
            assert!(watcher.join().unwrap() > 0);
        });

        let stats = pipeline.lock().unwrap().stats;
        assert_eq!(stats.rendered, 2 * FRAMES);
        assert_eq!(stats.malformed + stats.unavailable, 0);
        assert_eq!(surface.generation(), 2 * FRAMES);
        assert_eq!(sensor.outstanding_borrows(), 0);
    }
}
