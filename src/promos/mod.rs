pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use engine::{PromoEvaluation, PromoViolation};
pub use error::PromoError;
pub use handlers::*;
pub use models::*;
pub use repository::PromoRepository;
pub use service::{PromoCheck, PromoService};
