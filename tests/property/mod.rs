//! Property-based tests
//!
//! Invariants of the role hierarchy and access decisions.

pub mod role_proptest;
