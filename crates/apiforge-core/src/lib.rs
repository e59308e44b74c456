//! apiforge Core Library
//!
//! This library turns OpenAPI 3 documents into Rust modules (schema types and
//! API controllers) and regenerates them without losing hand-written code.
//! Generated items carry `// generate` markers; code the user adds is kept
//! when marked `// define` or placed inside a `define block` region.

pub mod config;
pub mod document;
pub mod error;
pub mod generate;
pub mod merge;
pub mod model;
pub mod openapi;
pub mod report;
pub mod resolver;
pub mod utils;

pub use crate::{
    config::Config,
    document::Document,
    error::{Error, Result},
    generate::{generate, FileStatus, GenerationReport},
    merge::merge,
    model::SpecDescriptor,
    openapi::OpenApiContext,
    report::Reporter,
    resolver::resolve,
};
