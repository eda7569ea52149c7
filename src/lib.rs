pub mod autofix;
pub mod config;
pub mod error;
pub mod platform;
pub mod queue;
pub mod review;
pub mod server;
pub mod shutdown;
pub mod storage;
pub mod tools;
pub mod webhook;
pub mod workflow;
