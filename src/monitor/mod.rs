pub mod cycle;
pub mod scheduler;

pub use cycle::{MonitorContext, run_cycle, run_timeframe_monitor};
pub use scheduler::spawn_monitors;
