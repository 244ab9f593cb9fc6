pub mod aircraft;
pub mod flight;
pub mod gate;
pub mod runway;
