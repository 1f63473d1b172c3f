//! Schema projection engine
//!
//! Derives the external API description from the compiled entity schema
//! model.

pub mod engine;
pub mod types;

pub use engine::project;
pub use types::{
    ApiArgument, ApiDescription, ApiField, ApiInputType, ApiObjectType, ApiOperation,
    ApiUnionType,
};
