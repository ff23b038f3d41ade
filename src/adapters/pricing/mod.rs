//! Price resolver adapters.

mod catalog;

pub use catalog::CatalogPriceResolver;
