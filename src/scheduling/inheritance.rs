use std::sync::Mutex;

use crate::airport::flight::FlightKey;
use crate::scheduling::operation::{OpHandle, Operation};

#[derive(Debug)]
struct InheritanceRecord {
    holder: OpHandle,
    original_queue: usize,
    original_pis: f64,
}

/// Priority inheritance for resource holders.
///
/// When a waiter in a stricter queue blocks on a resource held by a lower
/// operation, the holder temporarily runs at the waiter's queue and PIS.
/// One record per holder; further, stricter waiters tighten the boost but
/// the stored original is written only by the first one.
#[derive(Debug, Default)]
pub struct PriorityInheritance {
    records: Mutex<Vec<InheritanceRecord>>,
}

impl PriorityInheritance {
    pub fn new() -> Self {
        PriorityInheritance { records: Mutex::new(Vec::new()) }
    }

    /// Boosts `holder` to `waiter`'s priority if the waiter is stricter.
    /// Returns whether a boost was applied or tightened.
    pub fn apply(&self, holder: &OpHandle, waiter: &Operation) -> bool {
        let mut records = self.records.lock().expect("lock poisoned");
        // Identity by Arc pointer: locking the record's handle here could be
        // a self-lock when it is this very holder.
        let existing = records.iter().any(|r| std::sync::Arc::ptr_eq(&r.holder, holder));
        let mut holder_guard = holder.write().expect("lock poisoned");

        if existing {
            if waiter.current_queue >= holder_guard.current_queue && waiter.priority_score <= holder_guard.priority_score {
                return false;
            }
            // Keep the stricter boost; the stored original stays put.
            holder_guard.current_queue = holder_guard.current_queue.min(waiter.current_queue);
            holder_guard.priority_score = holder_guard.priority_score.max(waiter.priority_score);
            return true;
        }

        if waiter.current_queue >= holder_guard.current_queue {
            return false;
        }

        log::info!(
            target: "scheduling",
            "Operation {} inherits priority from op {} (Q{} -> Q{})",
            holder_guard.id,
            waiter.id,
            holder_guard.current_queue,
            waiter.current_queue
        );
        records.push(InheritanceRecord {
            holder: OpHandle::clone(holder),
            original_queue: holder_guard.current_queue,
            original_pis: holder_guard.priority_score,
        });
        holder_guard.current_queue = waiter.current_queue;
        holder_guard.priority_score = waiter.priority_score;
        true
    }

    /// Restores the holder's original priority when it releases the
    /// contended resource. No-op if the holder carries no record.
    pub fn restore(&self, holder: &OpHandle) {
        let mut records = self.records.lock().expect("lock poisoned");
        let holder_id = holder.read().expect("lock poisoned").id;

        if let Some(pos) = records.iter().position(|r| r.holder.read().expect("lock poisoned").id == holder_id) {
            let record = records.swap_remove(pos);
            let mut holder_guard = record.holder.write().expect("lock poisoned");
            holder_guard.current_queue = record.original_queue;
            holder_guard.priority_score = record.original_pis;
            log::info!(
                target: "scheduling",
                "Operation {} priority restored to Q{}",
                holder_guard.id,
                holder_guard.current_queue
            );
        }
    }

    /// Restores every boost held by operations of `flight`. The lifecycle
    /// calls this when it releases the resource others were waiting on; the
    /// boosted operation may already have been superseded by a later phase.
    pub fn restore_for_flight(&self, flight: FlightKey) {
        let mut records = self.records.lock().expect("lock poisoned");
        let mut index = 0;
        while index < records.len() {
            let matches = records[index].holder.read().expect("lock poisoned").facts.flight == flight;
            if matches {
                let record = records.swap_remove(index);
                let mut holder_guard = record.holder.write().expect("lock poisoned");
                holder_guard.current_queue = record.original_queue;
                holder_guard.priority_score = record.original_pis;
            } else {
                index += 1;
            }
        }
    }

    pub fn has_inherited(&self, op_id: u64) -> bool {
        let records = self.records.lock().expect("lock poisoned");
        records.iter().any(|r| r.holder.read().expect("lock poisoned").id == op_id)
    }
}
