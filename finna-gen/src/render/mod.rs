//! Output rendering

pub mod sql;

pub use sql::{render_book, render_created_entities};
