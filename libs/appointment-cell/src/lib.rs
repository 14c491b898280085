pub mod context;
pub mod models;
pub mod services;
pub mod store;

pub use context::SchedulingContext;
pub use models::*;
pub use services::*;
