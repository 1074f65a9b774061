use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use crossbeam_channel::RecvTimeoutError;
use image::Rgb;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use lasershot::utils::{LatencyStats, Timer};
use lasershot::{
    AppResult, Config, DetectionRunner, Event, EventBus, Frame, FrameSource, ShotDetector,
    SourceError,
};

/// Synthetic camera feed for demo and benchmark runs: a dim, lightly noisy
/// background with a bright red blob injected periodically.
struct SyntheticSource {
    width: u32,
    height: u32,
    frame_number: u64,
    shot_interval: u64,
    pacing: Option<Duration>,
    rng: StdRng,
}

impl SyntheticSource {
    fn new(pacing: Option<Duration>) -> Self {
        Self {
            width: 640,
            height: 480,
            frame_number: 0,
            shot_interval: 90,
            pacing,
            rng: StdRng::from_entropy(),
        }
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if let Some(pacing) = self.pacing {
            thread::sleep(pacing);
        }
        self.frame_number += 1;

        let mut frame = Frame::new(self.width, self.height);
        for pixel in frame.pixels_mut() {
            let base = 18 + self.rng.gen_range(0..4u8);
            *pixel = Rgb([base, base, base]);
        }

        if self.frame_number % self.shot_interval == 0 {
            let cx = self.rng.gen_range(20..self.width - 20);
            let cy = self.rng.gen_range(20..self.height - 20);
            for y in cy - 3..=cy + 3 {
                for x in cx - 3..=cx + 3 {
                    frame.put_pixel(x, y, Rgb([235, 20, 20]));
                }
            }
            tracing::debug!("injected synthetic shot at ({}, {})", cx, cy);
        }

        Ok(Some(frame))
    }
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("========================================");
    println!("  lasershot - laser shot detection");
    println!("========================================");
    println!();

    let config = Config::load().context("failed to load configuration")?;

    let args: Vec<String> = env::args().collect();
    if args.get(1).map(String::as_str) == Some("--bench") {
        let frames = args
            .get(2)
            .and_then(|s| s.parse().ok())
            .unwrap_or(300usize);
        return run_bench(config, frames);
    }

    run_live(config)
}

/// Run detection over the synthetic feed until Ctrl+C.
fn run_live(config: Config) -> AppResult<()> {
    let bus = EventBus::new();
    let (events, _id) = bus.subscribe();

    let source = Box::new(SyntheticSource::new(Some(Duration::from_millis(33))));
    let mut runner =
        DetectionRunner::start(config, source, bus).context("failed to start detection")?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::Relaxed);
    })
    .context("failed to install Ctrl+C handler")?;

    println!("Watching synthetic feed (Ctrl+C to stop)...");
    println!();

    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match events.recv_timeout(Duration::from_millis(200)) {
            Ok(Event::ShotDetected { shot }) => {
                println!(
                    "  >> {:?} shot at ({:.1}, {:.1})",
                    shot.color, shot.x, shot.y
                );
            }
            Ok(Event::StreamEnded) | Ok(Event::DeviceLost) => {
                println!("Feed stopped");
                break;
            }
            Ok(event @ Event::LowFrameRate { .. })
            | Ok(event @ Event::BrightConditions { .. }) => {
                println!("  !! {}", event.description());
            }
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    runner.stop()?;
    println!("Goodbye!");
    Ok(())
}

/// Feed a fixed number of synthetic frames through the pipeline synchronously
/// and report per-cycle latency.
fn run_bench(config: Config, frames: usize) -> AppResult<()> {
    println!("Benchmarking {} frames...", frames);

    let bus = EventBus::new();
    let (events, _id) = bus.subscribe();
    let mut detector = ShotDetector::new(config, bus);
    let mut source = SyntheticSource::new(None);

    let mut stats = LatencyStats::new();
    for _ in 0..frames {
        let frame = match source.next_frame().context("synthetic source failed")? {
            Some(frame) => frame,
            None => break,
        };
        let timer = Timer::start();
        detector
            .process_frame(frame)
            .context("detection cycle failed")?;
        stats.record(timer.elapsed_ms());
    }
    detector.close();

    let shots = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e, Event::ShotDetected { .. }))
        .count();

    println!();
    println!("{}", stats.report("cycle"));
    println!("shots detected: {}", shots);
    Ok(())
}
