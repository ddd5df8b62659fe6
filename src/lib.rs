//! skillio - match a statement of intent to the skills that can fulfil it
//!
//! The library is synchronous: [`search::MatchEngine`] runs queries against
//! an explicit [`search::ReverseIndex`] handle, and `ingest` replaces the
//! index from an already-loaded [`catalog::CatalogSnapshot`].

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod search;
pub mod test_utils;

pub use error::{Result, SkillioError};
