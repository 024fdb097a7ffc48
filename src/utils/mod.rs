pub mod logging;
pub mod text;

pub use logging::init_logging;
pub use text::{normalize_ws, squash_key};
