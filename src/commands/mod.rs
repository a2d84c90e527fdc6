pub mod config;
pub mod helpers;
pub mod lifecycle;
pub mod plan;
pub mod validate;
