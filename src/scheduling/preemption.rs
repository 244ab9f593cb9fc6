use crate::airport::flight::FlightType;
use crate::scheduling::operation::{Operation, OperationType};

const PREEMPTION_THRESHOLD: f64 = 1.5;
const CONTEXT_SWITCH_COST: f64 = 5.0;
const RESOURCE_RECONFIG_COST: f64 = 10.0;
const EMERGENCY_URGENCY: f64 = 1000.0;

/// Benefit-vs-cost preemption policy.
///
/// A newcomer H may displace the current operation L iff H sits in a
/// strictly higher queue and `Benefit(H) > 1.5 · Cost(L)`.
#[derive(Debug, Default)]
pub struct PreemptionManager;

impl PreemptionManager {
    pub fn new() -> Self {
        PreemptionManager
    }

    /// Urgency(op) = (4 − q)·20 + PIS·10 + wait/10; emergencies pinned high.
    pub fn urgency(&self, op: &Operation) -> f64 {
        if op.op_type == OperationType::Emergency || op.facts.is_emergency {
            return EMERGENCY_URGENCY;
        }
        (4 - op.current_queue as i64) as f64 * 20.0 + op.priority_score * 10.0 + op.wait_time as f64 / 10.0
    }

    pub fn delay_cost(&self, op: &Operation) -> f64 {
        let mut cost = 1.0 + op.facts.passenger_count as f64 / 100.0;
        if op.facts.flight_type == FlightType::International {
            cost *= 1.5;
        }
        if op.op_type == OperationType::Emergency {
            cost *= 10.0;
        }
        cost
    }

    pub fn downstream_impact(&self, op: &Operation) -> f64 {
        let mut impact = op.facts.passenger_count as f64 / 50.0;
        if matches!(op.op_type, OperationType::GateArrival | OperationType::GateDeparture) {
            impact += 5.0;
        }
        impact
    }

    pub fn benefit(&self, high: &Operation) -> f64 {
        self.urgency(high) * self.delay_cost(high)
    }

    pub fn cost(&self, low: &Operation) -> f64 {
        low.progress() * CONTEXT_SWITCH_COST + RESOURCE_RECONFIG_COST + self.downstream_impact(low)
    }

    /// The decision rule alone; the queue-ordering precondition is the
    /// scheduler's to check.
    pub fn should_preempt(&self, high: &Operation, low: &Operation) -> bool {
        let benefit = self.benefit(high);
        let cost = self.cost(low);
        let decision = benefit > PREEMPTION_THRESHOLD * cost;
        log::info!(
            target: "scheduling",
            "Preemption eval: op {} vs op {} - benefit {:.1}, cost {:.1}, {}",
            high.id,
            low.id,
            benefit,
            cost,
            if decision { "PREEMPT" } else { "KEEP" }
        );
        decision
    }

    /// Applies the consequences to the displaced operation: back to ready,
    /// compensation credited, and a one-queue demotion unless the operation
    /// carries guaranteed service.
    pub fn perform(&self, preempted: &mut Operation) {
        preempted.is_running = false;
        preempted.preemption_count += 1;
        preempted.quantum_compensation += preempted.total_time / 10;

        if !preempted.guaranteed_service && preempted.current_queue < 4 {
            preempted.current_queue += 1;
        }

        log::info!(
            target: "scheduling",
            "Operation {} preempted: demoted to Q{}, compensation now {}",
            preempted.id,
            preempted.current_queue,
            preempted.quantum_compensation
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airport::aircraft::{Aircraft, AircraftType};
    use crate::airport::flight::{Flight, FlightKey};
    use crate::scheduling::operation::FlightFacts;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use slotmap::SlotMap;

    fn op(aircraft_type: AircraftType, flight_type: FlightType, op_type: OperationType, queue: usize) -> Operation {
        let mut rng = StdRng::seed_from_u64(6);
        let mut map: SlotMap<FlightKey, ()> = SlotMap::with_key();
        let key = map.insert(());
        let flight = Flight::new("PR1", Aircraft::new(aircraft_type), flight_type, 0, 0, &mut rng);
        let mut op = Operation::new(queue as u64 + 1, FlightFacts::of(key, &flight), op_type, 0);
        op.current_queue = queue;
        op
    }

    #[test]
    fn emergency_preempts_half_done_boarding() {
        // Scenario 5: COMPLEX BOARDING in Q3 at 50% progress vs a fresh
        // EMERGENCY in Q0.
        let manager = PreemptionManager::new();
        let mut boarding = op(AircraftType::B777, FlightType::International, OperationType::Boarding, 3);
        boarding.remaining_time = boarding.total_time / 2;
        boarding.is_running = true;
        let emergency = op(AircraftType::Emergency, FlightType::Domestic, OperationType::Emergency, 0);

        assert!(manager.should_preempt(&emergency, &boarding));

        manager.perform(&mut boarding);
        assert!(!boarding.is_running);
        assert_eq!(boarding.preemption_count, 1);
        assert_eq!(boarding.quantum_compensation, 120);
        assert_eq!(boarding.current_queue, 4);
    }

    #[test]
    fn guaranteed_service_blocks_demotion() {
        let manager = PreemptionManager::new();
        let mut protected = op(AircraftType::A320, FlightType::Domestic, OperationType::Cleaning, 2);
        protected.guaranteed_service = true;

        manager.perform(&mut protected);
        assert_eq!(protected.current_queue, 2);
        assert_eq!(protected.preemption_count, 1);
    }

    #[test]
    fn demotion_caps_at_queue_four() {
        let manager = PreemptionManager::new();
        let mut bottom = op(AircraftType::G650, FlightType::Domestic, OperationType::Taxiing, 4);
        manager.perform(&mut bottom);
        assert_eq!(bottom.current_queue, 4);
    }

    #[test]
    fn marginal_benefit_does_not_preempt() {
        let manager = PreemptionManager::new();
        // A private-jet taxi in Q4 against a busy international boarding:
        // benefit is tiny, cost is real.
        let weak = op(AircraftType::G650, FlightType::Domestic, OperationType::Taxiing, 4);
        let mut current = op(AircraftType::B777, FlightType::International, OperationType::GateArrival, 3);
        current.remaining_time = 0; // full progress lost if preempted
        assert!(!manager.should_preempt(&weak, &current));
    }

    #[test]
    fn urgency_is_pinned_for_emergencies() {
        let manager = PreemptionManager::new();
        let emergency = op(AircraftType::Emergency, FlightType::Domestic, OperationType::Emergency, 0);
        assert!((manager.urgency(&emergency) - EMERGENCY_URGENCY).abs() < f64::EPSILON);
    }
}
