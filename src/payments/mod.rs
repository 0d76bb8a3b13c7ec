//! Payment provider integration module
//!
//! Safaricom M-Pesa STK push: credential derivation, OAuth token retrieval and
//! the process-request call.

pub mod credentials;
pub mod errors;
pub mod providers;
pub mod token_cache;
pub mod traits;
pub mod types;

pub use errors::{MpesaError, MpesaResult};
pub use traits::{AccessTokenProvider, PaymentProvider};
