pub mod config;
pub mod document;
pub mod errors;
pub mod logging;
pub mod service;
pub mod stage;
pub mod ui;
pub mod workflow;
