pub mod notified;
