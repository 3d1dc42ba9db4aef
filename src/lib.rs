//! Cleans the customer and organizer-fee exports into immutable tables and
//! answers the filter / group / top-N queries the dashboards are built on.

pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod state;
pub mod view;

pub use cache::{Datasets, TableCache};
pub use error::{LoadError, LoadResult};
