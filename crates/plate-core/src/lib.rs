mod commands;
mod core;
mod features;
mod inline;
mod input_rules;
mod keymap;
mod ops;
mod plugin;
mod schema;
mod table;

pub use crate::commands::*;
pub use crate::core::*;
pub use crate::features::*;
pub use crate::inline::*;
pub use crate::input_rules::*;
pub use crate::keymap::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::schema::*;
pub use crate::table::*;
