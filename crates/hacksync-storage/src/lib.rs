//! Outbound HTTP utilities and datastore backends for hacksync.

mod http;
mod memory;
mod postgres;
mod rest;
mod store;

pub use http::{
    classify_reqwest_error, classify_status, BackoffPolicy, FetchError, FetchedResponse,
    HttpClientConfig, HttpFetcher, RetryDisposition,
};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use rest::RestStore;
pub use store::{ActiveQuery, HackathonStore, StoreError, UpsertOutcome};

pub const CRATE_NAME: &str = "hacksync-storage";
