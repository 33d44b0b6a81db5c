//! Debundles DEEPSOIL profile bundles (`.dpz`) into individual profiles
//! (`.dp`) with pore-water-pressure generation parameters injected per layer.

pub mod archive;
pub mod convert;
pub mod domain;
pub mod linker;
pub mod models;
pub mod parameters;
pub mod profile;
pub mod writer;

#[cfg(test)]
mod test_fixtures;

pub use convert::{ConversionReport, ConversionRequest, RecordSummary, convert, summarize_archive};
