//! Distributed mutual exclusion on top of store leases.

mod mutex;
pub use mutex::*;

#[cfg(test)]
mod mutex_test;
