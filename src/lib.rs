//! Relay for Safaricom M-Pesa STK push.
//!
//! Accepts `POST /stkpush`, obtains a Daraja OAuth token, signs and forwards
//! the push request, and relays the provider's answer.

pub mod api;
pub mod config;
pub mod logging;
pub mod payments;
