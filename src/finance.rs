use std::sync::Mutex;

const FUEL_COST_PER_GALLON: f64 = 3.5;
const GATE_COST_PER_HOUR: f64 = 200.0;
const DELAY_COST_PER_MINUTE: f64 = 50.0;
const LANDING_FEE_PER_TON: f64 = 8.0;
const INTERNATIONAL_LANDING_SURCHARGE: f64 = 1.25;
const PASSENGER_FEE: f64 = 12.0;
const DAILY_BUDGET: f64 = 1_000_000.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct CostTotals {
    pub fuel: f64,
    pub facility: f64,
    pub delay: f64,
    pub landing_fees: f64,
    pub passenger_revenue: f64,
    pub passengers: u64,
}

impl CostTotals {
    pub fn total_cost(&self) -> f64 {
        self.fuel + self.facility + self.delay
    }
}

/// The accountant surface (§push-only). Lifecycles report raw quantities;
/// pricing lives here. One budget warning per run, logged when total cost
/// first crosses the daily budget.
#[derive(Debug, Default)]
pub struct CostModel {
    inner: Mutex<CostState>,
}

#[derive(Debug, Default)]
struct CostState {
    totals: CostTotals,
    budget_warning_logged: bool,
}

impl CostModel {
    pub fn new() -> Self {
        CostModel::default()
    }

    pub fn record_fuel(&self, gallons: f64) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.totals.fuel += gallons * FUEL_COST_PER_GALLON;
        Self::check_budget(&mut inner);
    }

    pub fn record_gate(&self, hours: f64) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.totals.facility += hours * GATE_COST_PER_HOUR;
        Self::check_budget(&mut inner);
    }

    /// Passenger compensation scales the per-minute delay price.
    pub fn record_delay(&self, minutes: f64, passengers: u32) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let passenger_factor = 1.0 + passengers as f64 / 100.0;
        inner.totals.delay += minutes * DELAY_COST_PER_MINUTE * passenger_factor;
        Self::check_budget(&mut inner);
    }

    pub fn record_landing(&self, tons: f64, international: bool) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let mut fee = tons * LANDING_FEE_PER_TON;
        if international {
            fee *= INTERNATIONAL_LANDING_SURCHARGE;
        }
        inner.totals.landing_fees += fee;
    }

    pub fn record_passengers(&self, count: u32) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.totals.passengers += count as u64;
        inner.totals.passenger_revenue += count as f64 * PASSENGER_FEE;
    }

    pub fn totals(&self) -> CostTotals {
        self.inner.lock().expect("lock poisoned").totals
    }

    fn check_budget(inner: &mut CostState) {
        if inner.totals.total_cost() > DAILY_BUDGET && !inner.budget_warning_logged {
            inner.budget_warning_logged = true;
            log::warn!(
                target: "performance",
                "Daily budget exceeded: {:.0} / {:.0}",
                inner.totals.total_cost(),
                DAILY_BUDGET
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuel_and_gate_costs_accumulate() {
        let costs = CostModel::new();
        costs.record_fuel(100.0);
        costs.record_fuel(43.0);
        costs.record_gate(2.0);

        let totals = costs.totals();
        assert!((totals.fuel - 143.0 * FUEL_COST_PER_GALLON).abs() < 1e-9);
        assert!((totals.facility - 400.0).abs() < 1e-9);
    }

    #[test]
    fn delay_cost_scales_with_passengers() {
        let costs = CostModel::new();
        costs.record_delay(10.0, 200);
        let totals = costs.totals();
        assert!((totals.delay - 10.0 * DELAY_COST_PER_MINUTE * 3.0).abs() < 1e-9);
    }

    #[test]
    fn international_landing_carries_surcharge() {
        let costs = CostModel::new();
        costs.record_landing(100.0, false);
        costs.record_landing(100.0, true);
        let totals = costs.totals();
        let expected = 100.0 * LANDING_FEE_PER_TON * (1.0 + INTERNATIONAL_LANDING_SURCHARGE);
        assert!((totals.landing_fees - expected).abs() < 1e-9);
    }

    #[test]
    fn passenger_counts_and_revenue_track() {
        let costs = CostModel::new();
        costs.record_passengers(150);
        costs.record_passengers(50);
        let totals = costs.totals();
        assert_eq!(totals.passengers, 200);
        assert!((totals.passenger_revenue - 200.0 * PASSENGER_FEE).abs() < 1e-9);
    }
}
