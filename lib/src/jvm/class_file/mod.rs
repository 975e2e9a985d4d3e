mod attribute;
mod class;
mod constants;

pub use attribute::*;
pub use class::*;
pub use constants::*;
