//! Application layer: pricing, network resolution, and payment orchestration.
//!
//! `CheckoutSession` is the entry point a front end talks to. It owns the
//! selection state and the attached signer, and hands each submission to the
//! `PaymentOrchestrator`, which sequences the ledger calls.

pub mod orchestrator;
pub mod pricing;
pub mod resolver;
pub mod session;
