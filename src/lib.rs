//! Laser shot detection pipeline.
//!
//! Watches a video feed for laser impacts: a per-pixel sliding-window
//! background model normalizes each frame against recent history, bright
//! anomalies vote into an accumulator grid, and a sector-partitioned scan
//! turns accumulator peaks into located, color-classified shots.
//!
//! ```no_run
//! use lasershot::{Config, DetectionRunner, Event, EventBus};
//! # fn source() -> Box<dyn lasershot::FrameSource> { unimplemented!() }
//!
//! # fn main() -> anyhow::Result<()> {
//! let bus = EventBus::new();
//! let (events, _id) = bus.subscribe();
//!
//! let runner = DetectionRunner::start(Config::default(), source(), bus)?;
//!
//! for event in events {
//!     if let Event::ShotDetected { shot } = event {
//!         println!("{:?} shot at ({:.1}, {:.1})", shot.color, shot.x, shot.y);
//!     }
//! }
//! # drop(runner);
//! # Ok(())
//! # }
//! ```

pub mod background;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod lighting;
pub mod pipeline;
pub mod searcher;
pub mod sector;
pub mod shot;
pub mod transform;
pub mod utils;

pub use config::Config;
pub use error::{AppResult, ConfigError, DetectorError, SourceError};
pub use events::{Event, EventBus, SubscriberId};
pub use frame::{Frame, FrameSource, ProjectionBounds};
pub use lighting::{LightingCondition, LightingSample};
pub use pipeline::{DetectionRunner, DetectorControls, DetectorState, ShotDetector};
pub use searcher::{CandidateOutcome, ShotSearcher};
pub use sector::{SectorBounds, SectorStatuses};
pub use shot::{Shot, ShotColor};
pub use transform::ShotTransform;
