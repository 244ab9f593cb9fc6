use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::Duration;

use crate::config::PisWeights;
use crate::scheduling::aging::AgingManager;
use crate::scheduling::inheritance::PriorityInheritance;
use crate::scheduling::learning::{CompletionSample, LearningEngine};
use crate::scheduling::operation::{FlightFacts, OpHandle, Operation, OperationType};
use crate::scheduling::pis::PisCalculator;
use crate::scheduling::preemption::PreemptionManager;
use crate::scheduling::quantum::QuantumManager;

const QUEUE_COUNT: usize = 5;

/// An operation counts as on-time for the learning feedback if it waited
/// less than this many simulated units.
const ON_TIME_WAIT_LIMIT: i64 = 300;

#[derive(Debug, Default, Clone, Copy)]
pub struct SchedulerStats {
    pub total_scheduled: u64,
    pub total_preemptions: u64,
    pub total_context_switches: u64,
    pub total_wait_time: i64,
    pub completed: u64,
}

#[derive(Debug)]
struct SchedulerInner {
    queues: [Vec<OpHandle>; QUEUE_COUNT],
    current: Option<OpHandle>,
    next_operation_id: u64,
    stats: SchedulerStats,
}

/// The HMFQ-PPRA scheduler: five ready queues under one lock, with the PIS,
/// aging, quantum, preemption, inheritance and learning components hanging
/// off it as leaves (none of them ever calls back in under its own lock).
#[derive(Debug)]
pub struct HmfqScheduler {
    inner: Mutex<SchedulerInner>,
    operation_available: Condvar,

    pub pis: PisCalculator,
    pub aging: AgingManager,
    pub quantum: QuantumManager,
    pub preemption: PreemptionManager,
    pub inheritance: PriorityInheritance,
    pub learning: LearningEngine,
}

impl HmfqScheduler {
    pub fn new(weights: PisWeights) -> Self {
        HmfqScheduler {
            inner: Mutex::new(SchedulerInner {
                queues: Default::default(),
                current: None,
                next_operation_id: 1,
                stats: SchedulerStats::default(),
            }),
            operation_available: Condvar::new(),
            pis: PisCalculator::new(weights),
            aging: AgingManager::new(),
            quantum: QuantumManager::new(),
            preemption: PreemptionManager::new(),
            inheritance: PriorityInheritance::new(),
            learning: LearningEngine::new(),
        }
    }

    pub fn create_operation(&self, facts: FlightFacts, op_type: OperationType, now: i64) -> OpHandle {
        let id = {
            let mut inner = self.inner.lock().expect("lock poisoned");
            let id = inner.next_operation_id;
            inner.next_operation_id += 1;
            id
        };

        let mut op = Operation::new(id, facts, op_type, now);
        op.priority_score = self.pis.calculate(&op);

        log::info!(
            target: "scheduling",
            "Created operation {} ({}) for flight {} in Q{} (PIS {:.3})",
            op.id,
            op.op_type,
            op.facts.flight_id,
            op.current_queue,
            op.priority_score
        );
        Arc::new(RwLock::new(op))
    }

    /// Appends the operation to its (clamped) ready queue, signals waiters,
    /// then evaluates preemption of the current operation.
    pub fn enqueue(&self, op: &OpHandle) -> bool {
        {
            let mut inner = self.inner.lock().expect("lock poisoned");
            let queue = {
                let mut guard = op.write().expect("lock poisoned");
                guard.current_queue = guard.current_queue.min(QUEUE_COUNT - 1);
                guard.current_queue
            };
            inner.queues[queue].push(Arc::clone(op));
            inner.stats.total_scheduled += 1;
            log::info!(target: "scheduling", "Enqueued operation {} to Q{}", op.read().expect("lock poisoned").id, queue);
        }
        self.operation_available.notify_all();

        self.check_preemption(op)
    }

    /// One scheduling decision: age the waiters, recompute scores, then scan
    /// Q0 -> Q4 for the best ready operation. Returns None while another
    /// operation is still running or nothing is dispatchable.
    pub fn dequeue(&self, now: i64) -> Option<OpHandle> {
        let mut inner = self.inner.lock().expect("lock poisoned");

        if let Some(current) = &inner.current {
            let guard = current.read().expect("lock poisoned");
            if guard.is_running && !guard.is_completed {
                return None;
            }
        }
        inner.current = None;

        self.refresh_queues(&mut inner, now);

        let chosen = Self::find_next(&mut inner);
        if let Some(op) = &chosen {
            {
                let mut guard = op.write().expect("lock poisoned");
                guard.is_running = true;
                guard.start_time = now;
                log::info!(
                    target: "scheduling",
                    "Dispatched operation {} (Q{}, PIS {:.3})",
                    guard.id,
                    guard.current_queue,
                    guard.priority_score
                );
            }
            inner.current = Some(Arc::clone(op));
            inner.stats.total_context_switches += 1;
            self.operation_available.notify_all();
        }
        chosen
    }

    /// Aging + PIS recalculation pass. Rebuilds the queue buckets so that
    /// guaranteed-service promotions and preemption demotions take effect,
    /// and drops operations that completed while parked.
    fn refresh_queues(&self, inner: &mut SchedulerInner, now: i64) {
        let mut parked: Vec<OpHandle> = Vec::new();
        for queue in inner.queues.iter_mut() {
            parked.append(queue);
        }

        for handle in parked {
            let mut guard = handle.write().expect("lock poisoned");
            if guard.is_completed {
                continue;
            }

            guard.priority_score = self.pis.calculate(&guard);
            if guard.current_queue > 0 {
                self.aging.apply(&mut guard, now);
            }

            let queue = guard.current_queue.min(QUEUE_COUNT - 1);
            drop(guard);
            inner.queues[queue].push(handle);
        }
    }

    /// First non-empty queue wins; within it the highest PIS, ties broken by
    /// earlier arrival. Blocked and running operations are skipped.
    fn find_next(inner: &mut SchedulerInner) -> Option<OpHandle> {
        for queue in inner.queues.iter_mut() {
            let mut best: Option<(usize, f64, i64)> = None;
            for (index, handle) in queue.iter().enumerate() {
                let guard = handle.read().expect("lock poisoned");
                if !guard.is_ready() {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((_, best_score, best_arrival)) => {
                        guard.priority_score > best_score
                            || (guard.priority_score == best_score && guard.arrival_time < best_arrival)
                    }
                };
                if better {
                    best = Some((index, guard.priority_score, guard.arrival_time));
                }
            }
            if let Some((index, _, _)) = best {
                return Some(queue.swap_remove(index));
            }
        }
        None
    }

    /// Quantum expiry: the operation goes back to its ready queue with
    /// whatever work remains.
    ///
    /// Lock order is scheduler-then-operation everywhere in this module;
    /// taking them the other way around would deadlock against `dequeue`.
    pub fn yield_quantum(&self, op: &OpHandle) {
        {
            let mut inner = self.inner.lock().expect("lock poisoned");
            let queue = {
                let mut guard = op.write().expect("lock poisoned");
                guard.is_running = false;
                log::debug!(target: "scheduling", "Operation {} yields with {} remaining", guard.id, guard.remaining_time);
                guard.current_queue
            };
            if Self::is_current(&inner, op) {
                inner.current = None;
            }
            inner.queues[queue].push(Arc::clone(op));
        }
        self.operation_available.notify_all();
    }

    pub fn complete(&self, op: &OpHandle) {
        let sample = {
            let mut inner = self.inner.lock().expect("lock poisoned");
            let sample = {
                let mut guard = op.write().expect("lock poisoned");
                guard.is_completed = true;
                guard.is_running = false;
                log::info!(
                    target: "scheduling",
                    "Completed operation {} (wait {}, preemptions {})",
                    guard.id,
                    guard.wait_time,
                    guard.preemption_count
                );
                CompletionSample {
                    completion_time: (guard.total_time - guard.remaining_time.max(0)) as f64,
                    wait_time: guard.wait_time as f64,
                    on_time: guard.wait_time < ON_TIME_WAIT_LIMIT,
                }
            };
            if Self::is_current(&inner, op) {
                inner.current = None;
            }
            inner.stats.completed += 1;
            inner.stats.total_wait_time += sample.wait_time as i64;
            sample
        };
        self.operation_available.notify_all();

        self.learning.record(sample);
    }

    /// running -> blocked: the operation waits for a resource and is parked
    /// back in its queue, invisible to dispatch until unblocked.
    pub fn block(&self, op: &OpHandle) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let queue = {
            let mut guard = op.write().expect("lock poisoned");
            guard.is_blocked = true;
            guard.is_running = false;
            guard.current_queue
        };
        if Self::is_current(&inner, op) {
            inner.current = None;
        }
        inner.queues[queue].push(Arc::clone(op));
    }

    pub fn unblock(&self, op: &OpHandle) {
        op.write().expect("lock poisoned").is_blocked = false;
        self.operation_available.notify_all();
    }

    /// Evaluates whether `new_op` displaces the current operation. Fires only
    /// when the newcomer sits in a strictly higher queue and the benefit rule
    /// holds; the displaced operation is demoted and re-queued.
    pub fn check_preemption(&self, new_op: &OpHandle) -> bool {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let Some(current) = inner.current.clone() else {
            return false;
        };

        let should = {
            let new_guard = new_op.read().expect("lock poisoned");
            let current_guard = current.read().expect("lock poisoned");
            if current_guard.is_completed || new_guard.id == current_guard.id {
                return false;
            }
            new_guard.current_queue < current_guard.current_queue && self.preemption.should_preempt(&new_guard, &current_guard)
        };
        if !should {
            return false;
        }

        let queue = {
            let mut current_guard = current.write().expect("lock poisoned");
            self.preemption.perform(&mut current_guard);
            current_guard.current_queue
        };
        inner.queues[queue].push(Arc::clone(&current));
        inner.current = None;
        inner.stats.total_preemptions += 1;
        drop(inner);
        self.operation_available.notify_all();
        true
    }

    /// Parks the caller until its operation is marked running. Returns false
    /// on shutdown or if the operation completed without dispatch.
    pub fn wait_dispatched(&self, op: &OpHandle, running: &AtomicBool) -> bool {
        let mut inner = self.inner.lock().expect("lock poisoned");
        loop {
            {
                let guard = op.read().expect("lock poisoned");
                if guard.is_running {
                    return true;
                }
                if guard.is_completed {
                    return false;
                }
            }
            if !running.load(AtomicOrdering::SeqCst) {
                return false;
            }
            let (next, _timeout) = self
                .operation_available
                .wait_timeout(inner, Duration::from_millis(50))
                .expect("lock poisoned");
            inner = next;
        }
    }

    fn is_current(inner: &SchedulerInner, op: &OpHandle) -> bool {
        match &inner.current {
            Some(current) => Arc::ptr_eq(current, op),
            None => false,
        }
    }

    pub fn has_current(&self) -> bool {
        self.inner.lock().expect("lock poisoned").current.is_some()
    }

    pub fn queue_lengths(&self) -> [usize; QUEUE_COUNT] {
        let inner = self.inner.lock().expect("lock poisoned");
        let mut lengths = [0; QUEUE_COUNT];
        for (i, queue) in inner.queues.iter().enumerate() {
            lengths[i] = queue.len();
        }
        lengths
    }

    /// Ready + blocked operations parked in the queues, plus the current one.
    pub fn pending_operations(&self) -> usize {
        let inner = self.inner.lock().expect("lock poisoned");
        inner.queues.iter().map(|q| q.len()).sum::<usize>() + usize::from(inner.current.is_some())
    }

    pub fn stats(&self) -> SchedulerStats {
        self.inner.lock().expect("lock poisoned").stats
    }

    pub fn average_wait_time(&self) -> f64 {
        let inner = self.inner.lock().expect("lock poisoned");
        if inner.stats.completed == 0 {
            return 0.0;
        }
        inner.stats.total_wait_time as f64 / inner.stats.completed as f64
    }

    /// Periodic learning hook, called by the metrics sampler.
    pub fn adjust_weights(&self) -> bool {
        self.learning.adjust_weights(&self.pis)
    }
}
