//! Immediate and deferred message delivery

use super::Message;

/// A message plus its destination window (`None` = the active window)
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Destination window id
    pub window: Option<i32>,
    /// The message
    pub message: Message,
}

/// Message queue with immediate and time-deferred delivery
#[derive(Debug, Default)]
pub struct MessageQueue {
    immediate: Vec<Envelope>,
    deferred: Vec<(u32, Envelope)>,
}

impl MessageQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for delivery on the next drain
    pub fn send(&mut self, window: Option<i32>, message: Message) {
        self.immediate.push(Envelope { window, message });
    }

    /// Queue a message for delivery once frame time reaches `deliver_at`
    pub fn post(&mut self, deliver_at: u32, window: Option<i32>, message: Message) {
        self.deferred.push((deliver_at, Envelope { window, message }));
    }

    /// Take every message due at `now`, immediate ones first, each group in posting order
    pub fn drain_due(&mut self, now: u32) -> Vec<Envelope> {
        let mut due = std::mem::take(&mut self.immediate);

        let mut i = 0;
        while i < self.deferred.len() {
            if self.deferred[i].0 <= now {
                let (_, envelope) = self.deferred.remove(i);
                due.push(envelope);
            } else {
                i += 1;
            }
        }
        due
    }

    /// Number of messages waiting (immediate and deferred)
    pub fn len(&self) -> usize {
        self.immediate.len() + self.deferred.len()
    }

    /// True if nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued message (used on shutdown)
    pub fn clear(&mut self) {
        self.immediate.clear();
        self.deferred.clear();
    }
}
