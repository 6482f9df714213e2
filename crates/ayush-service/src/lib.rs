//! # ayush-service
//!
//! Runtime side of the NAMASTE to ICD-11 TM2 mapper.
//!
//! [`MappingService`] owns the loaded catalogs and the published mapping
//! set. It refreshes the set by running the mapping pipeline off the async
//! runtime and answers tolerant code lookups against whatever set is
//! currently published.

#![warn(missing_docs)]

mod service;

pub use service::{MappingService, ServiceError, ServiceResult};

// Re-export loader types used in the service API
pub use ayush_loader::{MapperConfig, PipelineReport, ResolvedMapping};
