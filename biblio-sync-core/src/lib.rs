#![doc = "biblio-sync-core: core logic library for biblio-sync."]

//! This crate holds the publishing pipeline: repository synchronisation,
//! bib validation and aggregation, template provisioning and resource
//! mirroring. The command line lives in the `biblio-sync` crate.
//!
//! # Usage
//! Build a [`synchronise::SynchroniseConfig`] and call
//! [`synchronise::synchronise`] with a [`contract::Downloader`] and a
//! [`contract::Validator`], or use the building blocks directly.

pub mod aggregate;
pub mod config;
pub mod contract;
pub mod download;
pub mod mirror;
pub mod synchronise;
pub mod validate;
