use thiserror::Error;

/// Failure taxonomy of the control plane. All of these are ordinary values;
/// a lifecycle that hits one updates its counters and exits without touching
/// any other flight.
#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse simulation config JSON: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("No runway available for flight {0} after retries")]
    NoRunwayAvailable(String),

    #[error("Wake separation wait elapsed without availability on runway {0}")]
    SeparationWaitElapsed(usize),

    #[error("No compatible gate available for flight {0} after retries")]
    NoGateAvailable(String),

    #[error("Ground-service request refused: {0}")]
    VehicleUnavailable(String),

    #[error("Banker's check refused the request: unsafe or unavailable")]
    UnsafeAllocation,

    #[error("Flight {0} diverted after {1} go-arounds")]
    Diverted(String, u32),

    #[error("Scheduler has no dispatchable operation")]
    QueueEmpty,

    #[error("Shutdown requested")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, Error>;
