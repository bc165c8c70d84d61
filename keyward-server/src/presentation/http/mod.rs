pub mod app_error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
