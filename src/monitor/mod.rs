pub mod controller;
pub mod cycle;
pub mod loop_worker;
pub mod report;

pub use controller::MonitorController;
pub use cycle::{CycleOutcome, Monitor, MonitorTiming};
pub use loop_worker::poll_loop;
pub use report::{format_dump, format_history, CycleReport};
