//! Stillpoint: content and automation backend for a meditation and
//! wellness publication.
//!
//! The crate is layered the usual way: `domain` holds entities and pure
//! logic (streak calculator, journal filtering, validation), `application`
//! holds services and repository traits, `infra` holds the Postgres,
//! HTTP, telemetry, and local-store adapters.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
