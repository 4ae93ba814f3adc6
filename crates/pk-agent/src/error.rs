use pk_core::{CitizenId, CitizenInstanceId, ParkedVehicleId, VehicleId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("{0} is not a live citizen")]
    StaleCitizen(CitizenId),

    #[error("{0} is not a live citizen instance")]
    StaleInstance(CitizenInstanceId),

    #[error("{0} is not a live vehicle")]
    StaleVehicle(VehicleId),

    #[error("{0} is not a live parked vehicle")]
    StaleParkedVehicle(ParkedVehicleId),

    #[error("{pool} pool exhausted (capacity {capacity})")]
    PoolExhausted { pool: &'static str, capacity: usize },
}

pub type AgentResult<T> = Result<T, AgentError>;
