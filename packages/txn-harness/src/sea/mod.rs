//! sea-orm backend.

pub mod client;
pub mod proxy;
pub mod session;

pub use client::{sanitize_db_url, SeaOrmClient, SeaOrmFactory, DATABASE_URL_ENV, SEA_ORM_CLIENT};
pub use session::SessionTransaction;
