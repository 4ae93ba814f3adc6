use pk_core::ParkedVehicleId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckupError {
    #[error("failed to spawn checkup worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("checkup worker thread panicked")]
    WorkerPanicked,

    #[error("parked vehicle {0} no longer exists")]
    Stale(ParkedVehicleId),

    #[error("checkup receiver has hung up")]
    Disconnected,
}

pub type CheckupResult<T> = Result<T, CheckupError>;
