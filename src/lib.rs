//! Kura is a caching proxy that sits in front of a slow, rate limited
//! MyAnimeList scraper. Every response it serves comes from its own store;
//! the upstream is consulted only when a record is missing or has outlived
//! its freshness window, and a failed refresh surfaces as an error rather
//! than quietly serving the stale record.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
