use pk_agent::AgentError;
use pk_checkup::CheckupError;
use pk_core::CoreError;
use pk_trip::TripError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("{what} grid is {got_cells} cells of {got_size} m but the configuration says {expected_cells} of {expected_size} m")]
    GridMismatch {
        what:           &'static str,
        expected_cells: u32,
        expected_size:  f32,
        got_cells:      u32,
        got_size:       f32,
    },

    #[error("trip error: {0}")]
    Trip(#[from] TripError),

    #[error("agent pool error: {0}")]
    Agent(#[from] AgentError),

    #[error("checkup worker: {0}")]
    Checkup(#[from] CheckupError),

    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}

pub type SimResult<T> = Result<T, SimError>;
