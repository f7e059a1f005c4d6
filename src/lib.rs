pub mod api;
pub mod config;
pub mod credential_blob;
pub mod db;
pub mod dedup;
pub mod error;
pub mod evaluation;
pub mod evaluator;
pub mod fetcher;
pub mod jobs;
pub mod nest;
pub mod notifier;
pub mod polling;
pub mod reading_cache;
pub mod token_store;

#[cfg(test)]
mod testing;
