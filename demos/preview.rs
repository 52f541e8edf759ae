use std::sync::Arc;
use std::time::Duration;

use depth_stream::platform::sim::{DEFAULT_FRAME_INTERVAL, SimFrameData, SimSensor};
use depth_stream::{DepthStream, SensorManager, SensorStream};

/// Gray levels from black to white.
const RAMP: &[u8] = b" .:-=+*#%@";

fn main() {
    env_logger::init();

    let sensor = Arc::new(SimSensor::kinect_v2());
    let manager = Arc::new(SensorManager::from_shared(Arc::clone(&sensor)));
    let mut stream = DepthStream::new(Arc::clone(&manager));

    let desc = stream.description();
    let config = stream.config();
    println!(
        "Depth feed {}x{} ({} bytes/sample), depth/{} {:?}",
        desc.width,
        desc.height,
        desc.bytes_per_pixel,
        config.depth_to_byte,
        config.narrowing
    );

    stream.start().expect("failed to start depth stream");

    // A tilted plane sweeping away from the sensor, with a near-field band
    // below the reliable minimum on the left.
    let ticker = sensor.spawn_ticker(DEFAULT_FRAME_INTERVAL, move |tick| {
        let offset = (tick * 40 % 4000) as u32;
        let samples = (0..desc.height).flat_map(move |y| {
            (0..desc.width).map(move |x| {
                if x < 32 {
                    200
                } else {
                    (500 + offset + x * 6 + y * 2).min(u16::MAX as u32) as u16
                }
            })
        });
        SimFrameData::from_samples(desc, samples, 500)
    });

    let image = stream.image_source().clone();
    let mut last_generation = 0;
    for _ in 0..5 {
        std::thread::sleep(Duration::from_millis(500));
        let generation = image.generation();
        if generation == last_generation {
            continue;
        }
        last_generation = generation;

        println!("\nframe {generation}:");
        image.read(|img| {
            for y in (0..img.height()).step_by(32) {
                let row: String = (0..img.width())
                    .step_by(16)
                    .map(|x| {
                        let level = img.get_pixel(x, y).0[0] as usize;
                        RAMP[level * RAMP.len() / 256] as char
                    })
                    .collect();
                println!("{row}");
            }
        });
    }

    stream.stop().expect("failed to stop depth stream");
    let ticks = ticker.stop();
    let stats = stream.stats();
    println!(
        "\nDone. {} ticks, {} rendered, {} unavailable, {} malformed.",
        ticks, stats.rendered, stats.unavailable, stats.malformed
    );
}
