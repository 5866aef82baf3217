//! HTML documents: creation, `meta` encoding declarations and serialization.

mod taginfo;
mod tree;

pub use taginfo::*;
pub use tree::*;
