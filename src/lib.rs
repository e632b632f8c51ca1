pub mod alert;
pub mod config;
pub mod detector;
pub mod exchange;
pub mod monitor;

pub mod error;
pub mod logger;
pub mod time;
