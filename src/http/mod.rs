//! HTTP response types and route composition.

pub mod response;
pub mod routes;

pub use response::{ApiResponse, JsonResponse, NoContentResponse};
pub use routes::RouteModule;
