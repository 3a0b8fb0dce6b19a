//! HTTP API for the dbt graph loader

pub mod handlers;
pub mod routes;

pub use handlers::AppError;
pub use routes::create_router;
