use std::sync::Mutex;

/// Weather severity ladder. `Ord` follows declaration order, so
/// `severity >= Severe` reads the way the lifecycle driver uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WeatherSeverity {
    Clear,
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl WeatherSeverity {
    pub fn name(self) -> &'static str {
        match self {
            WeatherSeverity::Clear => "CLEAR",
            WeatherSeverity::Minor => "MINOR",
            WeatherSeverity::Moderate => "MODERATE",
            WeatherSeverity::Severe => "SEVERE",
            WeatherSeverity::Extreme => "EXTREME",
        }
    }

    /// Severity as the [0, 1] factor the PIS weather term consumes.
    pub fn factor(self) -> f64 {
        match self {
            WeatherSeverity::Clear => 0.0,
            WeatherSeverity::Minor => 0.25,
            WeatherSeverity::Moderate => 0.5,
            WeatherSeverity::Severe => 0.75,
            WeatherSeverity::Extreme => 1.0,
        }
    }
}

#[derive(Debug)]
struct WeatherReport {
    severity: WeatherSeverity,
    start_time: i64,
    end_time: i64,
}

#[derive(Debug, Default)]
struct CrisisInner {
    reports: Vec<WeatherReport>,
    manual_ground_stop: bool,
}

/// The crisis surface: external reporters push weather, the lifecycle driver
/// queries before each runway attempt. EXTREME weather forces a ground stop
/// on its own; operators can also set one manually.
#[derive(Debug, Default)]
pub struct CrisisCenter {
    inner: Mutex<CrisisInner>,
}

impl CrisisCenter {
    pub fn new() -> Self {
        CrisisCenter { inner: Mutex::new(CrisisInner::default()) }
    }

    pub fn report_weather(&self, severity: WeatherSeverity, now: i64, duration_units: i64) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.reports.push(WeatherReport { severity, start_time: now, end_time: now + duration_units.max(0) });
        log::info!(target: "events", "Weather report: {} for {} units at {}", severity.name(), duration_units, now);
    }

    /// The worst severity among reports active at `now`.
    pub fn severity(&self, now: i64) -> WeatherSeverity {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.reports.retain(|r| r.end_time > now);
        inner
            .reports
            .iter()
            .filter(|r| r.start_time <= now)
            .map(|r| r.severity)
            .max()
            .unwrap_or(WeatherSeverity::Clear)
    }

    pub fn ground_stop(&self, now: i64) -> bool {
        if self.inner.lock().expect("lock poisoned").manual_ground_stop {
            return true;
        }
        self.severity(now) == WeatherSeverity::Extreme
    }

    pub fn set_ground_stop(&self, active: bool) {
        self.inner.lock().expect("lock poisoned").manual_ground_stop = active;
    }

    /// How much of nominal throughput the airport retains under the current
    /// weather.
    pub fn operational_capacity(&self, now: i64) -> f64 {
        1.0 - 0.8 * self.severity(now).factor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_when_no_reports() {
        let crisis = CrisisCenter::new();
        assert_eq!(crisis.severity(100), WeatherSeverity::Clear);
        assert!(!crisis.ground_stop(100));
        assert!((crisis.operational_capacity(100) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn worst_active_report_wins_and_expires() {
        let crisis = CrisisCenter::new();
        crisis.report_weather(WeatherSeverity::Minor, 0, 500);
        crisis.report_weather(WeatherSeverity::Severe, 100, 100);

        assert_eq!(crisis.severity(50), WeatherSeverity::Minor);
        assert_eq!(crisis.severity(150), WeatherSeverity::Severe);
        assert_eq!(crisis.severity(250), WeatherSeverity::Minor);
        assert_eq!(crisis.severity(600), WeatherSeverity::Clear);
    }

    #[test]
    fn extreme_weather_forces_ground_stop() {
        let crisis = CrisisCenter::new();
        crisis.report_weather(WeatherSeverity::Extreme, 0, 100);
        assert!(crisis.ground_stop(10));
        assert!(!crisis.ground_stop(200));

        crisis.set_ground_stop(true);
        assert!(crisis.ground_stop(200));
    }
}
