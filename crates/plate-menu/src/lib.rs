mod assemble;
mod factory;
mod icons;
mod item;
mod prompt;

pub use crate::assemble::*;
pub use crate::factory::*;
pub use crate::icons::*;
pub use crate::item::*;
pub use crate::prompt::*;
