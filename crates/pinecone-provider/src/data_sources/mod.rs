//! Read-only data sources

mod collection;

pub use collection::{CollectionDataModel, CollectionDataSource};
