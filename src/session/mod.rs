pub mod controller;
pub mod signals;

pub use controller::{SessionConfig, SessionController, SessionState};
pub use signals::{LoginOutcome, LoginSignal};
