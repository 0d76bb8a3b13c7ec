//! Payment provider implementations
//!
//! Concrete implementations of the PaymentProvider trait.

pub mod mpesa;

pub use mpesa::{MpesaConfig, MpesaEnvironment, MpesaOAuthClient, MpesaProvider};
