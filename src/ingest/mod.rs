pub mod normalize;
pub mod service;

pub use service::{IngestError, IngestOutcome, IngestService, IngestStats};
