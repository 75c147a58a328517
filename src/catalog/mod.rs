pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use handlers::*;
pub use models::*;
pub use repository::CatalogRepository;
pub use service::{price_variants, CatalogService};
