//! Database access layer for shield-server

pub mod analyses;
pub mod batch;
pub mod cheat_rates;
pub mod geography;
pub mod verificateurs;
pub mod verifications;
