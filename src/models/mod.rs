pub mod assignment;

pub use assignment::{AssignmentRecord, IdSource, RawRecord, UNKNOWN_CLIENT};
