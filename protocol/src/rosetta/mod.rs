//! Rosetta wire types, the error table, the options carried between
//! construction steps, and request validation.

pub mod errors;
pub mod models;
pub mod options;
pub mod validate;

pub use errors::{RosettaError, RosettaErrorBody, RosettaErrorKind};
pub use models::*;
pub use options::{ConstructionMetadata, ConstructionOptions, OperationIntent};
pub use validate::{validate_request, validate_schema, SchemaViolation};
