//! Configuration for an install run.
//!
//! Settings come from host inputs, with environment overrides for the
//! endpoints, the cache location and the HTTP timeout.

mod settings;

pub use settings::{
    Settings, DEFAULT_API_BASE_URL, DEFAULT_HTTP_TIMEOUT_SECS, INPUT_BINARYEN_VERSION,
    INPUT_GITHUB_TOKEN, INPUT_WASM_PACK_VERSION,
};
