pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod messaging;
pub mod notify;
pub mod pagination;
pub mod scheduler;
