//! Records read from the registration database

pub mod event;
pub mod station;

// Re-export for convenience
pub use event::EventRecord;
pub use station::Station;
