//! Object query statement tree.
//!
//! A closed subset of the SQL grammar: every construct the compiler accepts
//! has a variant here, and anything else is rejected while lowering from the
//! parser's tree. Rewriting mutates this tree in place, then `Display`
//! renders it as native SQL.

pub mod expr;
pub mod fmt;
pub mod operators;
pub mod stmt;
pub mod visit;

pub use expr::*;
pub use operators::*;
pub use stmt::*;
pub use visit::VisitorMut;
