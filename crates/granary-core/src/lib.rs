//! Core types and pure logic for the Granary warehouse pipeline.
//!
//! This crate is deliberately free of database dependencies. The storage
//! layer (`granary-store`) and the reconciliation engine (`granary-etl`)
//! depend on it; it depends on nothing proprietary.

pub mod contact;
pub mod customer;
pub mod error;
pub mod metric;
pub mod region;
pub mod run;
pub mod sales;

pub use error::{Error, Result};
