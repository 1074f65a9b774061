use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::background::{BackgroundModel, EDGE_MARGIN};
use crate::config::Config;
use crate::error::{DetectorError, SourceError};
use crate::events::{Event, EventBus};
use crate::frame::{Frame, FrameSource, ProjectionBounds};
use crate::lighting::{self, LightingCondition};
use crate::searcher::ShotSearcher;
use crate::sector::SectorStatuses;
use crate::transform::ShotTransform;
use crate::utils::{CycleThrottle, FpsCounter};

/// Minimum FPS samples before the low-frame-rate warning can fire, so a slow
/// first frame does not trip it.
const FPS_WARN_MIN_SAMPLES: usize = 10;
/// Window for the rolling FPS estimate.
const FPS_WINDOW: Duration = Duration::from_secs(2);

/// Detector lifecycle.
///
/// `Initializing` consumes the calibration frames, `WarmingHistory` fills the
/// background window, `Active` is the only state that reports shots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Initializing,
    WarmingHistory,
    Active,
    Closing,
}

/// Externally adjustable pipeline settings, read once per frame.
#[derive(Debug, Clone)]
pub struct ControlState {
    pub detecting: bool,
    pub streaming: bool,
    pub projection_bounds: Option<ProjectionBounds>,
    pub sectors: SectorStatuses,
}

impl ControlState {
    fn new(config: &Config) -> Self {
        Self {
            detecting: true,
            streaming: false,
            projection_bounds: None,
            sectors: SectorStatuses::new(config.sector_rows, config.sector_cols),
        }
    }
}

/// Thread-safe handle for adjusting the pipeline while it runs. All handles
/// cloned from the same detector share state; changes take effect at the
/// start of the next cycle.
#[derive(Clone)]
pub struct DetectorControls {
    state: Arc<Mutex<ControlState>>,
}

impl DetectorControls {
    fn new(config: &Config) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControlState::new(config))),
        }
    }

    pub fn set_detecting(&self, detecting: bool) {
        self.state.lock().detecting = detecting;
    }

    pub fn set_streaming(&self, streaming: bool) {
        self.state.lock().streaming = streaming;
    }

    pub fn set_projection_bounds(&self, bounds: Option<ProjectionBounds>) {
        self.state.lock().projection_bounds = bounds;
    }

    pub fn set_sector_enabled(&self, row: u32, col: u32, enabled: bool) {
        self.state.lock().sectors.set_enabled(row, col, enabled);
    }

    pub fn set_all_sectors(&self, enabled: bool) {
        self.state.lock().sectors.set_all(enabled);
    }

    pub fn snapshot(&self) -> ControlState {
        self.state.lock().clone()
    }
}

/// The per-frame detection pipeline.
///
/// Feed frames through `process_frame`; shots and status changes come out on
/// the event bus. The background model always updates on every frame past
/// calibration, while the scan pass is throttled to the configured cycle
/// interval so a fast camera does not burn CPU re-scanning near-identical
/// accumulators.
pub struct ShotDetector {
    config: Config,
    bus: EventBus,
    controls: DetectorControls,
    model: Option<BackgroundModel>,
    transform: Option<ShotTransform>,
    state: DetectorState,
    calibration_seen: usize,
    throttle: CycleThrottle,
    fps: FpsCounter,
    warned_low_fps: bool,
    warned_bright: bool,
}

impl ShotDetector {
    pub fn new(config: Config, bus: EventBus) -> Self {
        let controls = DetectorControls::new(&config);
        let throttle = CycleThrottle::new(Duration::from_millis(config.min_cycle_interval_ms));
        Self {
            config,
            bus,
            controls,
            model: None,
            transform: None,
            state: DetectorState::Initializing,
            calibration_seen: 0,
            throttle,
            fps: FpsCounter::new(FPS_WINDOW),
            warned_low_fps: false,
            warned_bright: false,
        }
    }

    pub fn controls(&self) -> DetectorControls {
        self.controls.clone()
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Run one detection cycle on a frame.
    pub fn process_frame(&mut self, frame: Frame) -> Result<(), DetectorError> {
        self.fps.tick();

        let controls = self.controls.snapshot();
        let frame = Arc::new(match controls.projection_bounds {
            Some(bounds) => bounds.crop(&frame),
            None => frame,
        });

        if frame.width() <= 2 * EDGE_MARGIN || frame.height() <= 2 * EDGE_MARGIN {
            return Err(DetectorError::FrameTooSmall {
                width: frame.width(),
                height: frame.height(),
            });
        }

        let sample = lighting::analyze(&frame);

        if self.state == DetectorState::Initializing {
            self.calibration_seen += 1;
            if sample.condition(&self.config) == LightingCondition::VeryBright
                && !self.warned_bright
            {
                self.warned_bright = true;
                tracing::warn!(
                    "very bright conditions during calibration (luminance {:.0})",
                    sample.average_luminance
                );
                self.bus.publish(Event::BrightConditions {
                    average_luminance: sample.average_luminance,
                });
            }
            if self.calibration_seen < self.config.calibration_frames {
                return Ok(());
            }
            // The calibration frame that completes the count also feeds the
            // background model below
            self.set_state(DetectorState::WarmingHistory);
        }

        if controls.streaming {
            self.bus.publish(Event::BackgroundUpdated {
                frame: Arc::clone(&frame),
                bounds: controls.projection_bounds,
            });
        }

        self.ensure_model(frame.width(), frame.height());

        let became_ready = {
            let model = match self.model.as_mut() {
                Some(model) => model,
                None => return Ok(()),
            };
            let transform = match self.transform.as_mut() {
                Some(transform) => transform,
                None => return Ok(()),
            };

            transform.reset();
            model.update_means(&frame);
            model.accumulate(&frame, transform);
            model.is_ready()
        };

        if self.state == DetectorState::WarmingHistory && became_ready {
            self.set_state(DetectorState::Active);
        }

        self.check_frame_rate();

        if self.state == DetectorState::Active && controls.detecting && self.throttle.should_run() {
            if let Some(transform) = self.transform.as_ref() {
                let searcher = ShotSearcher::new(&self.config, transform, &frame);
                for outcome in searcher.scan(&controls.sectors) {
                    if let Some(shot) = outcome.shot() {
                        let shot = match controls.projection_bounds {
                            Some(bounds) => shot.offset(bounds.x as f64, bounds.y as f64),
                            None => shot,
                        };
                        tracing::info!(
                            "{:?} shot at ({:.1}, {:.1})",
                            shot.color,
                            shot.x,
                            shot.y
                        );
                        self.bus.publish(Event::ShotDetected { shot });
                    }
                }
            }
        }

        Ok(())
    }

    /// Shut the pipeline down. Idempotent.
    pub fn close(&mut self) {
        self.set_state(DetectorState::Closing);
    }

    /// (Re)allocate the model and accumulator when the analyzed dimensions
    /// change, e.g. after new projection bounds. Accumulated history is for
    /// the old geometry, so detection drops back to warming up.
    fn ensure_model(&mut self, width: u32, height: u32) {
        let needs_rebuild = match &self.model {
            Some(model) => model.width() != width || model.height() != height,
            None => true,
        };
        if !needs_rebuild {
            return;
        }

        if self.model.is_some() {
            tracing::info!(
                "analyzed region changed to {}x{}, rebuilding background model",
                width,
                height
            );
        }
        self.model = Some(BackgroundModel::new(
            width,
            height,
            self.config.history_frames,
        ));
        self.transform = Some(ShotTransform::new(width, height));
        if self.state == DetectorState::Active {
            self.set_state(DetectorState::WarmingHistory);
        }
    }

    fn check_frame_rate(&mut self) {
        if self.warned_low_fps || self.fps.sample_count() < FPS_WARN_MIN_SAMPLES {
            return;
        }
        if let Some(fps) = self.fps.fps() {
            if fps < self.config.min_detection_fps {
                self.warned_low_fps = true;
                tracing::warn!(
                    "feed is {:.1} FPS, below the {:.1} FPS detection floor",
                    fps,
                    self.config.min_detection_fps
                );
                self.bus.publish(Event::LowFrameRate { fps });
            }
        }
    }

    fn set_state(&mut self, new_state: DetectorState) {
        if self.state == new_state {
            return;
        }
        let old_state = self.state;
        self.state = new_state;
        tracing::info!("detector state {:?} -> {:?}", old_state, new_state);
        self.bus.publish(Event::StateChanged {
            old_state,
            new_state,
        });
    }
}

/// Owns the detection thread: pulls frames from the source and feeds the
/// detector until the source ends, the device is lost, or `stop` is called.
pub struct DetectionRunner {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    controls: DetectorControls,
}

impl DetectionRunner {
    pub fn start(
        config: Config,
        mut source: Box<dyn FrameSource>,
        bus: EventBus,
    ) -> Result<Self, DetectorError> {
        let mut detector = ShotDetector::new(config, bus.clone());
        let controls = detector.controls();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("detection".to_string())
            .spawn(move || {
                while flag.load(Ordering::Relaxed) {
                    match source.next_frame() {
                        Ok(Some(frame)) => {
                            if let Err(e) = detector.process_frame(frame) {
                                tracing::error!("detection cycle failed: {}", e);
                                break;
                            }
                        }
                        Ok(None) => {
                            tracing::info!("frame source exhausted");
                            bus.publish(Event::StreamEnded);
                            break;
                        }
                        Err(SourceError::DeviceLost) => {
                            tracing::error!("capture device lost");
                            bus.publish(Event::DeviceLost);
                            break;
                        }
                        Err(e) => {
                            tracing::error!("frame read failed: {}", e);
                            break;
                        }
                    }
                }
                detector.close();
            })
            .map_err(DetectorError::ThreadSpawnFailed)?;

        Ok(Self {
            running,
            handle: Some(handle),
            controls,
        })
    }

    pub fn controls(&self) -> DetectorControls {
        self.controls.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the detection thread to stop and wait for it to exit.
    pub fn stop(&mut self) -> Result<(), DetectorError> {
        let handle = self.handle.take().ok_or(DetectorError::NotRunning)?;
        self.running.store(false, Ordering::Relaxed);
        let _ = handle.join();
        Ok(())
    }
}

impl Drop for DetectionRunner {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
