//! Catalog synchronization services.

pub mod catalog;
pub mod enrichment;
pub mod error;
pub mod library;
pub mod pagination;
pub mod repos;
