//! Frames: the types of the locals and stack at a point in a method body
//!
//! Class files since Java 7 must carry a `StackMapTable` describing the frame at every branch
//! target. Since editing a method invalidates its table, [`analyze`] recomputes the frames from
//! scratch, and [`Frame::stack_map_frame`] compresses them back into table entries.

mod analysis;
mod frame;
mod types;

pub use analysis::*;
pub use frame::*;
pub use types::*;
