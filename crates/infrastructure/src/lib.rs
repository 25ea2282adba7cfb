//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_clinic_api;
mod in_memory_key_value_store;
mod json_file_key_value_store;
mod system_clock;

pub use http_clinic_api::HttpClinicApi;
pub use in_memory_key_value_store::InMemoryKeyValueStore;
pub use json_file_key_value_store::JsonFileKeyValueStore;
pub use system_clock::SystemClock;
