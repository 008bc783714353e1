//! Teams domain layer: entities, policy, errors, operation outcomes

pub mod entities;
pub mod errors;
pub mod outcome;
pub mod policy;
