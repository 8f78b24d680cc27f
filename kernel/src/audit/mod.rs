//! Canonical serialization and hashing for search traces.
//!
//! `canon` is the single place that produces bytes for hashing; `hash` is the
//! single place that computes digests; `hash_domain` owns every domain prefix.

pub mod canon;
pub mod hash;
pub mod hash_domain;
