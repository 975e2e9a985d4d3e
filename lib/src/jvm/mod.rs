//! Read, edit, and write JVM class files
//!
//! ### Simple example
//!
//! Consider a class whose `run` method should report when it starts:
//!
//! ```java,ignore,no_run
//! public class Task implements Runnable {
//!     public void run() {
//!         // ...
//!     }
//! }
//! ```
//!
//! Splicing a call in at the start of the body can be done as follows:
//!
//! ```
//! use classweave::jvm::code::Insn;
//! use classweave::jvm::*;
//!
//! # fn instrument(class_bytes: &[u8], hierarchy: &dyn ClassHierarchy) -> Result<Vec<u8>, Error> {
//! let mut class = ClassNode::parse(class_bytes)?;
//! for index in 0..class.methods.len() {
//!     if class.methods[index].name != "run" {
//!         continue;
//!     }
//!     if let Some(code) = class.code_mut(index)? {
//!         let start = code.first_real_index().unwrap_or(0);
//!         code.insert_all(start, vec![
//!             Insn::ldc_string("run"),
//!             Insn::invoke_static("com/example/Trace", "enter", "(Ljava/lang/String;)V"),
//!         ]);
//!     }
//! }
//!
//! // Edited bodies get their frames recomputed, everything else is written back as it was
//! class.to_bytes(hierarchy)
//! # }
//! ```

mod access_flags;
pub mod annotation;
mod binary_format;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
pub mod frames;
mod names;
mod tree;

pub use access_flags::*;
pub use annotation::{remove_annotation, AnnotationNode, ElementValue};
pub use binary_format::*;
pub use descriptors::*;
pub use errors::*;
pub use frames::ClassHierarchy;
pub use names::*;
pub use tree::*;
