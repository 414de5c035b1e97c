//! Terminal output for trackploy.
//!
//! Provides Ayu-themed colour styling, terminal detection, paging of long
//! change sets and the deployment confirmation prompt.

pub mod pager;
pub mod prompt;
pub mod styles;
pub mod terminal;
