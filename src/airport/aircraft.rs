use serde::{Deserialize, Serialize};
use std::fmt;

/// Wake-turbulence weight class. The numeric order matters: it indexes the
/// separation matrix in `runway.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightClass {
    Heavy,
    Medium,
    Light,
}

impl WeightClass {
    pub fn index(self) -> usize {
        match self {
            WeightClass::Heavy => 0,
            WeightClass::Medium => 1,
            WeightClass::Light => 2,
        }
    }

    /// Nominal landing weight used by the accountant's landing fee.
    pub fn landing_weight_tons(self) -> f64 {
        match self {
            WeightClass::Heavy => 300.0,
            WeightClass::Medium => 80.0,
            WeightClass::Light => 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AircraftType {
    A380,
    B777,
    B747F,
    B777F,
    B737,
    A320,
    G650,
    Falcon7X,
    Emergency,
}

impl AircraftType {
    /// The rotation the flight generator draws from (no spontaneous
    /// emergencies; those come from low fuel).
    pub const GENERATED: [AircraftType; 7] = [
        AircraftType::A380,
        AircraftType::B777,
        AircraftType::B737,
        AircraftType::A320,
        AircraftType::B777F,
        AircraftType::G650,
        AircraftType::Falcon7X,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AircraftType::A380 => "A380",
            AircraftType::B777 => "B777",
            AircraftType::B747F => "B747F",
            AircraftType::B777F => "B777F",
            AircraftType::B737 => "B737",
            AircraftType::A320 => "A320",
            AircraftType::G650 => "G650",
            AircraftType::Falcon7X => "Falcon 7X",
            AircraftType::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for AircraftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Immutable aircraft record. Every attribute is table-driven from the type
/// tag; the `match` in `new` is the single source of truth.
#[derive(Debug, Clone)]
pub struct Aircraft {
    pub aircraft_type: AircraftType,
    pub weight_class: WeightClass,
    pub passenger_capacity: u32,
    pub fuel_capacity_gallons: u32,
    pub cargo_capacity_kg: u32,
    pub service_time_minutes: u32,
    pub is_cargo: bool,
    pub is_private: bool,
    pub is_emergency: bool,
}

impl Aircraft {
    pub fn new(aircraft_type: AircraftType) -> Self {
        use AircraftType::*;
        use WeightClass::*;

        // (class, pax, fuel gal, cargo kg, service min, cargo?, private?, emergency?)
        let (weight_class, pax, fuel, cargo, service, is_cargo, is_private, is_emergency) = match aircraft_type {
            A380 => (Heavy, 520, 84_500, 25_000, 90, false, false, false),
            B777 => (Heavy, 360, 45_220, 21_000, 75, false, false, false),
            B747F => (Heavy, 0, 48_450, 124_000, 120, true, false, false),
            B777F => (Heavy, 0, 47_890, 102_000, 100, true, false, false),
            B737 => (Medium, 175, 6_875, 4_000, 45, false, false, false),
            A320 => (Medium, 150, 6_400, 3_500, 40, false, false, false),
            G650 => (Light, 19, 7_000, 500, 20, false, true, false),
            Falcon7X => (Light, 16, 7_000, 400, 18, false, true, false),
            Emergency => (Medium, 100, 5_000, 1_000, 30, false, false, true),
        };

        Aircraft {
            aircraft_type,
            weight_class,
            passenger_capacity: pax,
            fuel_capacity_gallons: fuel,
            cargo_capacity_kg: cargo,
            service_time_minutes: service,
            is_cargo,
            is_private,
            is_emergency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_flags_are_consistent() {
        let freighter = Aircraft::new(AircraftType::B747F);
        assert!(freighter.is_cargo);
        assert_eq!(freighter.passenger_capacity, 0);
        assert_eq!(freighter.weight_class, WeightClass::Heavy);

        let jet = Aircraft::new(AircraftType::G650);
        assert!(jet.is_private);
        assert_eq!(jet.weight_class, WeightClass::Light);

        let medevac = Aircraft::new(AircraftType::Emergency);
        assert!(medevac.is_emergency);
        assert!(!medevac.is_cargo);
    }

    #[test]
    fn weight_class_indexes_are_stable() {
        assert_eq!(WeightClass::Heavy.index(), 0);
        assert_eq!(WeightClass::Medium.index(), 1);
        assert_eq!(WeightClass::Light.index(), 2);
    }
}
