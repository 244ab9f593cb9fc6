use colored::Colorize;
use std::sync::RwLock;

/// One pull of the metrics surface. The sampler fills it from the atomic
/// counters and pool sizes; the renderer only formats.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsSnapshot {
    pub current_sim_time: i64,
    pub active_flights: i64,
    pub flights_landing: i64,
    pub flights_at_gates: i64,
    pub flights_departing: i64,
    pub available_runways: usize,
    pub available_gates: usize,
    pub runway_utilization: f64,
    pub gate_utilization: f64,
    pub total_flights_handled: i64,
    pub average_turnaround_seconds: f64,
    pub on_time_fraction: f64,
    pub page_fault_count: u64,
    pub page_fault_rate: f64,
}

/// Terminal dashboard. Holds the latest snapshot behind an `RwLock`; the
/// core pushes numbers and never depends on how they are printed.
#[derive(Debug, Default)]
pub struct Dashboard {
    metrics: RwLock<MetricsSnapshot>,
}

impl Dashboard {
    pub fn new() -> Self {
        Dashboard::default()
    }

    pub fn update(&self, snapshot: MetricsSnapshot) {
        *self.metrics.write().expect("lock poisoned") = snapshot;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.metrics.read().expect("lock poisoned")
    }

    /// Repaints the dashboard. Called only by the sampler, and only when the
    /// dashboard is enabled.
    pub fn display(&self) {
        let m = self.snapshot();

        // Clear screen and home the cursor.
        print!("\x1B[2J\x1B[H");
        println!("{}", "== AIRPORT OPERATIONS CONTROL ==".bold().cyan());
        println!("sim time {:>8}   flights active {:>3}", m.current_sim_time, m.active_flights);
        println!(
            "landing {:>3}   at gates {:>3}   departing {:>3}   handled {:>5}",
            m.flights_landing, m.flights_at_gates, m.flights_departing, m.total_flights_handled
        );
        println!(
            "runways free {:>2}  {}   gates free {:>2}  {}",
            m.available_runways,
            utilization_bar(m.runway_utilization),
            m.available_gates,
            utilization_bar(m.gate_utilization)
        );
        println!(
            "avg turnaround {:>7.1}s   on-time {}",
            m.average_turnaround_seconds,
            format_fraction(m.on_time_fraction)
        );
        println!("page faults {:>6}   fault rate {}", m.page_fault_count, format_fraction(m.page_fault_rate));
    }
}

fn utilization_bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * 10.0).round() as usize;
    let bar = format!("[{}{}] {:>3.0}%", "#".repeat(filled), "-".repeat(10 - filled), fraction * 100.0);
    if fraction > 0.8 {
        bar.red().to_string()
    } else if fraction > 0.5 {
        bar.yellow().to_string()
    } else {
        bar.green().to_string()
    }
}

fn format_fraction(fraction: f64) -> String {
    format!("{:>5.1}%", fraction.clamp(0.0, 1.0) * 100.0)
}
