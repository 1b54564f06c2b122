pub mod contracts;
pub mod enums;

pub use contracts::*;
pub use enums::*;
