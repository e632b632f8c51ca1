pub mod dedup;
pub mod spike;

pub use dedup::DedupState;
pub use spike::{Direction, SpikeAlert, SpikeDetector, Verdict, percent_change};
