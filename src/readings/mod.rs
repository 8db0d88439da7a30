pub mod extra;
pub mod models;

pub use extra::ExtraValue;
pub use models::{NewReading, Reading};
