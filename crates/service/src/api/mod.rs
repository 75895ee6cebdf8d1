mod handlers;
mod routes;

pub use handlers::{HealthResponse, StatusResponse};
pub use routes::create_router;
