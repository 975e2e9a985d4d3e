//! Annotation-driven instrumentation of compiled class files
//!
//! Classes are first folded into a [`model::Model`] of the whole batch, then every class goes
//! through the enabled [injectors](inject) and is written back out with its stack map frames
//! recomputed. [`process::AnnotationProcessor`] drives a whole batch from a configuration file.

pub mod classpath;
pub mod config;
mod errors;
pub mod inject;
pub mod jvm;
pub mod model;
pub mod process;
pub mod util;
pub mod validate;

pub use errors::*;
