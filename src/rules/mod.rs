//! Rule matching engine
//!
//! [`Rule`] is one condition/response pair, [`RuleSet`] an ordered list of
//! them and [`RuleStore`] the shared, reloadable holder consulted by every
//! connection.

mod rule;
mod store;

pub use rule::Rule;
pub use store::{RuleSet, RuleStore};
