mod health;

pub use health::health;

// Re-export utoipa path structs for OpenAPI routing
#[doc(hidden)]
pub use health::__path_health;
