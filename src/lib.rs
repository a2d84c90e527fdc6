#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod manifest;
pub mod orderer;
pub mod plan;
pub mod runner;
pub mod sequencer;
pub mod template;
pub mod utils;
