//! Vim-style modal editing for VimCode hosts: modes, counts, registers and
//! the `.` repeat of the last change.

pub mod core;

pub use crate::core::{Engine, Settings};
