pub mod analyzer;
pub mod api;
pub mod deriver;
pub mod entities;
pub mod error;
pub mod health;
pub mod herd;
pub mod locks;
pub mod metrics;
pub mod migrator;
pub mod notify;
pub mod processing;
pub mod storage;
pub mod telemetry;

pub use sea_orm;
pub use redis;
