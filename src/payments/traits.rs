//! Payment provider trait definitions
//!
//! The HTTP layer only talks to these traits, so handlers can be exercised
//! without a live Daraja endpoint.

use crate::payments::errors::MpesaResult;
use crate::payments::types::{AccessToken, StkPushRequest};
use async_trait::async_trait;
use serde_json::value::RawValue;

/// Source of OAuth bearer tokens for the Daraja API
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Obtain a bearer token for the next API call.
    async fn fetch_access_token(&self) -> MpesaResult<AccessToken>;
}

/// Trait for payment provider implementations
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Send an STK push prompt to the customer's phone
    ///
    /// # Arguments
    /// * `request` - Validated amount, phone number, reference and description
    ///
    /// # Returns
    /// * The provider's acknowledgement body, byte for byte
    async fn initiate_stk_push(&self, request: StkPushRequest) -> MpesaResult<Box<RawValue>>;
}
