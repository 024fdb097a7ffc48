pub mod notified;

pub use notified::NotifiedAssignment;
