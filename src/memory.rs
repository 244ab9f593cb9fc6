use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed-size LRU translation lookaside buffer.
///
/// Lifecycle phases touch per-flight pages; the miss counters feed the
/// metrics surface's page-fault figures. Nothing here blocks a flight.
#[derive(Debug)]
pub struct Tlb {
    entries: Mutex<Vec<u64>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Tlb {
    pub fn new(capacity: usize) -> Self {
        Tlb { entries: Mutex::new(Vec::with_capacity(capacity)), capacity: capacity.max(1), hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    /// Touches `page`. Returns true on a hit; a miss inserts the page,
    /// evicting the least recently used entry when full.
    pub fn access(&self, page: u64) -> bool {
        let mut entries = self.entries.lock().expect("lock poisoned");

        if let Some(pos) = entries.iter().position(|&p| p == page) {
            // Most recently used lives at the back.
            entries.remove(pos);
            entries.push(page);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return true;
        }

        if entries.len() == self.capacity {
            entries.remove(0);
        }
        entries.push(page);
        self.misses.fetch_add(1, Ordering::Relaxed);

        log::debug!(target: "memory", "Page fault on page {}", page);
        false
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn fault_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let misses = self.misses() as f64;
        let total = hits + misses;
        if total == 0.0 {
            return 0.0;
        }
        misses / total
    }
}
