use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Scheduling priority. Higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        f.write_str(s)
    }
}

/// A unit of work for the [`TaskScheduler`](super::TaskScheduler).
///
/// `seq` is assigned on first submission and kept across retries, so a
/// retried task goes back to its original place within its priority.
#[derive(Debug, Clone)]
pub struct Task<P> {
    pub id: String,
    pub payload: P,
    pub priority: Priority,
    /// Failed attempts so far.
    pub attempt: u32,
    /// Overrides the scheduler's `max_retries` for this task.
    pub max_attempts: Option<u32>,
    pub(super) seq: u64,
}

impl<P> Task<P> {
    pub fn new(id: impl Into<String>, payload: P, priority: Priority) -> Self {
        Self {
            id: id.into(),
            payload,
            priority,
            attempt: 0,
            max_attempts: None,
            seq: 0,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Submission order, used to break ties within a priority.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Heap entry: max-heap on priority, then lowest sequence first.
pub(super) struct Queued<P>(pub Task<P>);

impl<P> PartialEq for Queued<P> {
    fn eq(&self, other: &Self) -> bool {
        self.0.priority == other.0.priority && self.0.seq == other.0.seq
    }
}

impl<P> Eq for Queued<P> {}

impl<P> PartialOrd for Queued<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for Queued<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .priority
            .cmp(&other.0.priority)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn queued(id: &str, priority: Priority, seq: u64) -> Queued<()> {
        let mut task = Task::new(id, (), priority);
        task.seq = seq;
        Queued(task)
    }

    #[test]
    fn test_priority_order() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!(Priority::High.to_string(), "high");
    }

    #[test]
    fn test_heap_pops_by_priority_then_fifo() {
        let mut heap = BinaryHeap::new();
        heap.push(queued("low", Priority::Low, 0));
        heap.push(queued("high-a", Priority::High, 1));
        heap.push(queued("medium", Priority::Medium, 2));
        heap.push(queued("high-b", Priority::High, 3));

        let order: Vec<_> = std::iter::from_fn(|| heap.pop().map(|q| q.0.id)).collect();
        assert_eq!(order, ["high-a", "high-b", "medium", "low"]);
    }

    #[test]
    fn test_builder() {
        let task = Task::new("t", 5u32, Priority::Medium).with_max_attempts(2);
        assert_eq!(task.max_attempts, Some(2));
        assert_eq!(task.attempt, 0);
        assert_eq!(task.payload, 5);
    }
}
