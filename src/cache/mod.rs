//! Kura Cache Core
//!
//! The two pure pieces every read goes through:
//!
//! - **Fingerprinting**: collapses a request key into the digest the store
//!   is keyed by
//! - **Freshness**: decides whether a stored record can still be served
//!
//! ## Configuration
//!
//! Freshness windows are controlled via `kura.toml`:
//!
//! ```toml
//! [freshness]
//! profile_ttl_secs = 86400
//! history_ttl_secs = 3600
//! recently_online_ttl_secs = 300
//! # ... see `config::FreshnessSettings` for the full set
//! ```

mod fingerprint;
mod freshness;

pub use fingerprint::fingerprint;
pub use freshness::FreshnessWindows;
