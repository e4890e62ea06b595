pub mod buffers;
pub mod cli;
pub mod config;
pub mod control;
pub mod core;
pub mod engine;
pub mod kernels;
pub mod observability;
pub mod registry;
pub mod sys;
