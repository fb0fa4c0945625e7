//! Output formatting
//!
//! - `text`: the two stdout result lines
//! - `json`: optional JSON run report

pub mod json;
pub mod text;
