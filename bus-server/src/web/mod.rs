//! JSON HTTP API over stop discovery, journey lengths and trip planning.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
