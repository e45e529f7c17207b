// Core modules
pub mod analyzers;
pub mod cli;
pub mod config;
pub mod infrastructure;
pub mod instance;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod storage;
