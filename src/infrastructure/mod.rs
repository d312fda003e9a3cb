//! Adapters implementing the ledger ports.

pub mod simulated;
