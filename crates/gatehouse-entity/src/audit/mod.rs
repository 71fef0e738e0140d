//! Change-log entities.

pub mod model;

pub use model::{ChangeAction, ChangeLog, NewChangeLog};
