//! Integration tests for the system module.
//!
//! These tests build complete systems and verify the stepping semantics,
//! the resolution of cyclic groups and the error paths of an execution.

#[cfg(test)]
mod basic;
