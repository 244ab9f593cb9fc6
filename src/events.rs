use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::airport::flight::FlightKey;
use crate::crisis::WeatherSeverity;

/// What an event does when dispatched. A plain sum type: the dispatcher owns
/// the single `match`, so no event carries behaviour of its own.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    FlightArrival { flight: FlightKey },
    WeatherReport { severity: WeatherSeverity, duration_units: i64 },
}

impl EventKind {
    pub fn description(&self) -> &'static str {
        match self {
            EventKind::FlightArrival { .. } => "FlightArrival",
            EventKind::WeatherReport { .. } => "WeatherReport",
        }
    }
}

/// A scheduled event. Ordering is earliest `time` first; ties go to the
/// higher `priority` value (the event convention is inverted relative to
/// flight priorities and mapped at creation time), then to push order.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub time: i64,
    pub priority: i32,
    seq: u64,
}

impl Event {
    pub fn new(kind: EventKind, time: i64, priority: i32) -> Self {
        Event { kind, time, priority, seq: 0 }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Event {}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the maximum, so "greater" means "dispatch first".
        other
            .time
            .cmp(&self.time)
            .then(self.priority.cmp(&other.priority))
            .then(other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Thread-safe min-heap of scheduled events.
///
/// The queue itself never gates on `event_time <= now`; the dispatcher does.
/// `wait_pop` wakes promptly when a new event is pushed.
#[derive(Debug, Default)]
pub struct EventQueue {
    inner: Mutex<QueueInner>,
    event_available: Condvar,
}

#[derive(Debug, Default)]
struct QueueInner {
    heap: BinaryHeap<Event>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue { inner: Mutex::new(QueueInner::default()), event_available: Condvar::new() }
    }

    pub fn push(&self, mut event: Event) {
        let mut guard = self.inner.lock().expect("lock poisoned");
        event.seq = guard.next_seq;
        guard.next_seq += 1;
        guard.heap.push(event);
        self.event_available.notify_one();
    }

    /// Pops the head event, or None when the queue is empty. The "empty"
    /// signal is the only failure this queue knows.
    pub fn try_pop(&self) -> Option<Event> {
        let mut guard = self.inner.lock().expect("lock poisoned");
        guard.heap.pop()
    }

    /// A copy of the head event without removing it.
    pub fn peek(&self) -> Option<Event> {
        let guard = self.inner.lock().expect("lock poisoned");
        guard.heap.peek().cloned()
    }

    /// Blocks until an event is available or `timeout` elapses.
    pub fn wait_pop(&self, timeout: Duration) -> Option<Event> {
        let mut guard = self.inner.lock().expect("lock poisoned");
        while guard.heap.is_empty() {
            let (next, result) = self.event_available.wait_timeout(guard, timeout).expect("lock poisoned");
            guard = next;
            if result.timed_out() && guard.heap.is_empty() {
                return None;
            }
        }
        guard.heap.pop()
    }

    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("lock poisoned");
        guard.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn arrival_key() -> FlightKey {
        // A real key requires a slotmap; the payload is opaque to the queue.
        let mut map: SlotMap<FlightKey, ()> = SlotMap::with_key();
        map.insert(())
    }

    #[test]
    fn pops_in_time_order() {
        let queue = EventQueue::new();
        let flight = arrival_key();
        queue.push(Event::new(EventKind::FlightArrival { flight }, 300, 0));
        queue.push(Event::new(EventKind::FlightArrival { flight }, 100, 0));
        queue.push(Event::new(EventKind::FlightArrival { flight }, 200, 0));

        assert_eq!(queue.try_pop().unwrap().time, 100);
        assert_eq!(queue.try_pop().unwrap().time, 200);
        assert_eq!(queue.try_pop().unwrap().time, 300);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn same_time_higher_priority_wins() {
        let queue = EventQueue::new();
        let flight = arrival_key();
        queue.push(Event::new(EventKind::FlightArrival { flight }, 50, 1));
        queue.push(Event::new(EventKind::FlightArrival { flight }, 50, 9));

        assert_eq!(queue.try_pop().unwrap().priority, 9);
        assert_eq!(queue.try_pop().unwrap().priority, 1);
    }

    #[test]
    fn same_time_same_priority_is_fifo() {
        let queue = EventQueue::new();
        queue.push(Event::new(EventKind::WeatherReport { severity: WeatherSeverity::Minor, duration_units: 10 }, 5, 0));
        queue.push(Event::new(EventKind::WeatherReport { severity: WeatherSeverity::Severe, duration_units: 20 }, 5, 0));

        match queue.try_pop().unwrap().kind {
            EventKind::WeatherReport { severity, .. } => assert_eq!(severity, WeatherSeverity::Minor),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn wait_pop_wakes_on_push() {
        use std::sync::Arc;

        let queue = Arc::new(EventQueue::new());
        let pusher = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                queue.push(Event::new(EventKind::FlightArrival { flight: arrival_key() }, 1, 0));
            })
        };

        let event = queue.wait_pop(Duration::from_secs(5));
        assert!(event.is_some());
        pusher.join().unwrap();
    }

    #[test]
    fn wait_pop_times_out_when_empty() {
        let queue = EventQueue::new();
        assert!(queue.wait_pop(Duration::from_millis(10)).is_none());
    }
}
