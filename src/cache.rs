//! Chart identity cache: entries, staleness clock, and the keyed link store.

pub mod clock;
pub mod entry;
pub mod links;
