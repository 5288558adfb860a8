//! # dbpool-registry
//!
//! Named data-source management on top of `dbpool`: binds external
//! configuration maps to per-name pool configs, starts every pool eagerly
//! under a single lifecycle, and tears them all down at process exit.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbpool_registry::{DataSourceProperties, DataSourceRegistry};
//!
//! let properties = DataSourceProperties::from_flat(std::env::vars())?;
//!
//! let registry = DataSourceRegistry::start(properties, |_name, config| {
//!     backend_for(config.driver())
//! })
//! .await?;
//!
//! let pool = registry.default_data_source().ok_or("no default datasource")?;
//! let conn = pool.get().await?;
//! // ...
//!
//! registry.shutdown_all().await;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod properties;
pub mod registry;

pub use properties::{DataSourceProperties, PREFIX};
pub use registry::{DataSourceRegistry, DEFAULT_DATA_SOURCE};
