pub mod service;

pub use service::{Latest, LatestQueryService};
