//! Editable method bodies
//!
//! A `Code` attribute is [decoded](CodeNode::decode) into a flat list of [`Insn`]s in which branch
//! targets, exception ranges, and local variable ranges all refer to [`SynLabel`]s instead of
//! bytecode offsets. Instructions can then be spliced in freely, and
//! [`CodeNode::assemble`] lays the code back out: it picks instruction encodings, widens jumps
//! that got too long, and recomputes `max_stack`, `max_locals`, and the stack map frames.

mod decode;
mod encode;
mod insn;
mod label;
pub mod opcodes;

pub use insn::*;
pub use label::*;
