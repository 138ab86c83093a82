//! The per-interpreter side-effect queue.
//!
//! `emit` appends `{topics, message}` records; the queue is append-only and
//! single-writer, so observers see monotonic order. `with-log`/`do` record
//! the queue length before running a block and snapshot the suffix after;
//! events are never removed from the global queue.

use crate::value::Value;

/// One emitted event.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub topics: Vec<String>,
    pub message: Value,
}

/// Append-only event log owned by the interpreter.
#[derive(Debug, Default)]
pub struct EffectQueue {
    events: Vec<Effect>,
}

impl EffectQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, topics: Vec<String>, message: Value) {
        self.events.push(Effect { topics, message });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Snapshot of all events from `start` onward.
    #[must_use]
    pub fn since(&self, start: usize) -> Vec<Effect> {
        self.events.get(start..).unwrap_or_default().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_do_not_drain_the_queue() {
        let mut queue = EffectQueue::new();
        queue.emit(vec!["debug".into()], Value::Int(1));
        let start = queue.len();
        queue.emit(vec!["debug".into()], Value::Int(2));
        let tail = queue.since(start);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].message, Value::Int(2));
        assert_eq!(queue.len(), 2);
    }
}
