pub mod player;
pub mod routes;

pub use routes::{router, ApiError, AppState};
