//! Event bus for pipeline notifications.
//!
//! The detection loop publishes fire-and-forget events; consumers (UI,
//! loggers, tests) subscribe and drain them at their own pace. Publishing
//! never blocks the detection thread.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::frame::{Frame, ProjectionBounds};
use crate::pipeline::DetectorState;
use crate::shot::Shot;

/// Pipeline events
#[derive(Debug, Clone)]
pub enum Event {
    /// A shot was accepted and located
    ShotDetected { shot: Shot },

    /// A fresh (possibly cropped) frame for display, published while
    /// streaming is enabled
    BackgroundUpdated {
        frame: Arc<Frame>,
        bounds: Option<ProjectionBounds>,
    },

    /// Sustained feed FPS below the configured floor; warned once per session
    LowFrameRate { fps: f64 },

    /// Calibration saw very bright conditions; warned once per session
    BrightConditions { average_luminance: f32 },

    /// The capture device disappeared mid-stream; detection halts
    DeviceLost,

    /// A recorded feed was fully processed; detection halts gracefully
    StreamEnded,

    /// Detector lifecycle transition
    StateChanged {
        old_state: DetectorState,
        new_state: DetectorState,
    },
}

impl Event {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            Event::ShotDetected { shot } => {
                format!("{:?} shot at ({:.1}, {:.1})", shot.color, shot.x, shot.y)
            }
            Event::BackgroundUpdated { .. } => "Background updated".to_string(),
            Event::LowFrameRate { fps } => {
                format!("Feed FPS {:.1} is too low for reliable detection", fps)
            }
            Event::BrightConditions { average_luminance } => {
                format!(
                    "Very bright conditions (average luminance {:.0}); false shots are more likely",
                    average_luminance
                )
            }
            Event::DeviceLost => "Capture device lost".to_string(),
            Event::StreamEnded => "Stream ended".to_string(),
            Event::StateChanged { new_state, .. } => {
                format!("Detector state: {:?}", new_state)
            }
        }
    }
}

/// Subscriber ID for tracking subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

struct Subscriber {
    id: SubscriberId,
    sender: Sender<Event>,
}

/// Event bus for broadcasting events to subscribers
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<RwLock<usize>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(RwLock::new(0)),
        }
    }

    /// Subscribe to events, returns a receiver and subscription ID
    pub fn subscribe(&self) -> (Receiver<Event>, SubscriberId) {
        let (tx, rx) = unbounded();

        let mut next_id = self.next_id.write();
        let id = SubscriberId(*next_id);
        *next_id += 1;
        drop(next_id);

        self.subscribers.write().push(Subscriber { id, sender: tx });

        (rx, id)
    }

    /// Unsubscribe from events
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id != id);
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: Event) {
        let subscribers = self.subscribers.read();

        // If send fails, the subscriber channel is closed - that's ok
        for subscriber in subscribers.iter() {
            let _ = subscriber.sender.try_send(event.clone());
        }
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shot::ShotColor;

    #[test]
    fn test_event_bus_subscribe() {
        let bus = EventBus::new();
        let (_rx, _id) = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_event_bus_unsubscribe() {
        let bus = EventBus::new();
        let (_rx, id) = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.unsubscribe(id);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_bus_publish() {
        let bus = EventBus::new();
        let (rx, _id) = bus.subscribe();

        bus.publish(Event::ShotDetected {
            shot: Shot::new(320.0, 240.0, ShotColor::Red),
        });

        match rx.try_recv().unwrap() {
            Event::ShotDetected { shot } => {
                assert_eq!(shot.color, ShotColor::Red);
                assert_eq!(shot.x, 320.0);
            }
            other => panic!("wrong event type received: {:?}", other),
        }
    }

    #[test]
    fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new();
        let (rx1, _id1) = bus.subscribe();
        let (rx2, _id2) = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(Event::StreamEnded);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_event_bus_clone_shares_state() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();

        let (_rx, _id) = bus1.subscribe();
        assert_eq!(bus2.subscriber_count(), 1);
    }

    #[test]
    fn test_event_descriptions() {
        let event = Event::ShotDetected {
            shot: Shot::new(100.0, 200.0, ShotColor::Green),
        };
        assert!(event.description().contains("Green"));

        assert!(Event::StreamEnded.description().contains("ended"));
    }
}
