//! In-memory reuse of Daraja OAuth tokens
//!
//! Tokens are valid for roughly an hour. Wrapping the OAuth client in
//! [`CachedTokenProvider`] avoids one round trip per STK push; the relay only
//! does this when `MPESA_CACHE_TOKEN` is enabled.

use crate::payments::errors::MpesaResult;
use crate::payments::traits::AccessTokenProvider;
use crate::payments::types::AccessToken;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Tokens are dropped this long before the provider says they expire.
pub const DEFAULT_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    token: AccessToken,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

pub struct CachedTokenProvider<P> {
    inner: P,
    margin: Duration,
    cached: RwLock<Option<CachedToken>>,
}

impl<P: AccessTokenProvider> CachedTokenProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            margin: DEFAULT_EXPIRY_MARGIN,
            cached: RwLock::new(None),
        }
    }
}

#[async_trait]
impl<P: AccessTokenProvider> AccessTokenProvider for CachedTokenProvider<P> {
    async fn fetch_access_token(&self) -> MpesaResult<AccessToken> {
        if let Some(cached) = self.cached.read().await.as_ref().filter(|c| c.is_fresh()) {
            debug!("Reusing cached M-Pesa access token");
            return Ok(cached.token.clone());
        }

        let mut slot = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.token.clone());
        }

        let token = self.inner.fetch_access_token().await?;
        let ttl = token.lifetime().saturating_sub(self.margin);
        debug!("Caching M-Pesa access token for {}s", ttl.as_secs());

        *slot = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(token)
    }
}
