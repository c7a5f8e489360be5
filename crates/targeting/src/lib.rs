//! Audience targeting — boolean predicate trees over segment membership and
//! category interest.

pub mod audience;
pub mod predicates;

pub use audience::{category_index, select_audience, AudienceDefinition, AudienceSelection};
pub use predicates::{LogicalOperator, Predicate, PredicateGroup};
