pub mod alerts;
pub mod analysis;
pub mod animal;
pub mod auth;
pub mod dashboard;
pub mod events;
pub mod middleware;
