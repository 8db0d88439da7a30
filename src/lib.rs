pub mod api;
pub mod config;
pub mod db;
pub mod ingest;
pub mod publisher;
pub mod query;
pub mod readings;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
