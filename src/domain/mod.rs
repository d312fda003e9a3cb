//! Domain types: catalog, selection, amounts, network identity, outcomes, and
//! the ports through which the checkout talks to the ledger.

pub mod amount;
pub mod catalog;
pub mod network;
pub mod outcome;
pub mod ports;
pub mod selection;
