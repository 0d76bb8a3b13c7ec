//! M-Pesa (Safaricom Daraja) payment provider implementation
//!
//! Implements Lipa na M-Pesa Online, also known as STK push. Each push first
//! obtains an OAuth token with the app's consumer key and secret, then posts a
//! signed payload to the process-request endpoint.

use crate::payments::credentials::{basic_auth_header, current_timestamp, derive_password};
use crate::payments::errors::{MpesaError, MpesaResult};
use crate::payments::token_cache::CachedTokenProvider;
use crate::payments::traits::{AccessTokenProvider, PaymentProvider};
use crate::payments::types::{AccessToken, StkPushPayload, StkPushRequest, TransactionType};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::value::RawValue;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

const TOKEN_PATH: &str = "/oauth/v1/generate?grant_type=client_credentials";
const STK_PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";

/// Daraja deployment to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MpesaEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl MpesaEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_BASE_URL,
            Self::Production => PRODUCTION_BASE_URL,
        }
    }
}

impl fmt::Display for MpesaEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sandbox => f.write_str("sandbox"),
            Self::Production => f.write_str("production"),
        }
    }
}

impl FromStr for MpesaEnvironment {
    type Err = MpesaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(MpesaError::config_error(format!(
                "MPESA_ENVIRONMENT must be 'sandbox' or 'production', got {}",
                other
            ))),
        }
    }
}

/// M-Pesa payment provider configuration
#[derive(Clone)]
pub struct MpesaConfig {
    /// Daraja app consumer key
    pub consumer_key: String,
    /// Daraja app consumer secret
    pub consumer_secret: String,
    /// Business shortcode (paybill or till number)
    pub shortcode: String,
    /// Lipa na M-Pesa Online passkey
    pub passkey: String,
    /// URL Daraja posts the payment result to
    pub callback_url: String,
    pub environment: MpesaEnvironment,
    /// API base URL; defaults to the environment's host
    pub base_url: String,
    pub transaction_type: TransactionType,
    /// Outbound request timeout; `None` keeps the HTTP client's default
    pub timeout_secs: Option<u64>,
    /// Reuse OAuth tokens until shortly before they expire
    pub cache_token: bool,
}

impl Default for MpesaConfig {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            shortcode: String::new(),
            passkey: String::new(),
            callback_url: String::new(),
            environment: MpesaEnvironment::Sandbox,
            base_url: SANDBOX_BASE_URL.to_string(),
            transaction_type: TransactionType::default(),
            timeout_secs: None,
            cache_token: false,
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for MpesaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpesaConfig")
            .field("consumer_key", &"<redacted>")
            .field("consumer_secret", &"<redacted>")
            .field("shortcode", &self.shortcode)
            .field("passkey", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("transaction_type", &self.transaction_type)
            .field("timeout_secs", &self.timeout_secs)
            .field("cache_token", &self.cache_token)
            .finish()
    }
}

impl MpesaConfig {
    /// Create config from an arbitrary variable source
    pub fn from_lookup<F>(get: F) -> MpesaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                MpesaError::config_error(format!("{} environment variable is required", key))
            })
        };

        let environment = match get("MPESA_ENVIRONMENT") {
            Some(value) => value.parse::<MpesaEnvironment>()?,
            None => MpesaEnvironment::default(),
        };

        let base_url = get("MPESA_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| environment.base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        let transaction_type = match get("MPESA_TRANSACTION_TYPE") {
            Some(value) => value
                .trim()
                .parse::<TransactionType>()
                .map_err(MpesaError::config_error)?,
            None => TransactionType::default(),
        };

        let timeout_secs = match get("MPESA_TIMEOUT_SECS") {
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                MpesaError::config_error("MPESA_TIMEOUT_SECS must be a valid number")
            })?),
            None => None,
        };

        let cache_token = match get("MPESA_CACHE_TOKEN") {
            Some(value) => parse_flag(&value).ok_or_else(|| {
                MpesaError::config_error("MPESA_CACHE_TOKEN must be true or false")
            })?,
            None => false,
        };

        let config = Self {
            consumer_key: required("MPESA_CONSUMER_KEY")?,
            consumer_secret: required("MPESA_CONSUMER_SECRET")?,
            shortcode: required("MPESA_SHORTCODE")?,
            passkey: required("MPESA_PASSKEY")?,
            callback_url: required("MPESA_CALLBACK_URL")?,
            environment,
            base_url,
            transaction_type,
            timeout_secs,
            cache_token,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MpesaResult<()> {
        let non_empty = [
            ("MPESA_CONSUMER_KEY", &self.consumer_key),
            ("MPESA_CONSUMER_SECRET", &self.consumer_secret),
            ("MPESA_SHORTCODE", &self.shortcode),
            ("MPESA_PASSKEY", &self.passkey),
            ("MPESA_CALLBACK_URL", &self.callback_url),
        ];
        for (key, value) in non_empty {
            if value.trim().is_empty() {
                return Err(MpesaError::config_error(format!("{} cannot be empty", key)));
            }
        }

        if !is_http_url(&self.callback_url) {
            return Err(MpesaError::config_error(format!(
                "MPESA_CALLBACK_URL must be an http(s) URL, got {}",
                self.callback_url
            )));
        }

        if !is_http_url(&self.base_url) {
            return Err(MpesaError::config_error(format!(
                "MPESA_BASE_URL must be an http(s) URL, got {}",
                self.base_url
            )));
        }

        if self.timeout_secs == Some(0) {
            return Err(MpesaError::config_error(
                "MPESA_TIMEOUT_SECS must be greater than 0",
            ));
        }

        Ok(())
    }

    pub fn token_url(&self) -> String {
        format!("{}{}", self.base_url, TOKEN_PATH)
    }

    pub fn stk_push_url(&self) -> String {
        format!("{}{}", self.base_url, STK_PUSH_PATH)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Fetch a bearer token from the Daraja OAuth endpoint
///
/// One GET per call, authenticated with `Basic base64(key:secret)`. A non-2xx
/// status or a body without `access_token` is an error carrying the provider's
/// body, which the caller is expected to log.
pub async fn fetch_access_token(
    client: &Client,
    consumer_key: &str,
    consumer_secret: &str,
    token_url: &str,
) -> MpesaResult<AccessToken> {
    debug!("Requesting M-Pesa access token");

    let response = client
        .get(token_url)
        .header(AUTHORIZATION, basic_auth_header(consumer_key, consumer_secret))
        .send()
        .await
        .map_err(|e| {
            error!("Error getting OAuth token: {}", e);
            MpesaError::from(e)
        })?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        error!("Error getting OAuth token: HTTP {}: {}", status, body);
        return Err(MpesaError::token_fetch(status.as_u16(), body));
    }

    serde_json::from_str::<AccessToken>(&body).map_err(|e| {
        error!("Error getting OAuth token: unexpected response {}: {}", e, body);
        MpesaError::invalid_token_response(format!("{}: {}", e, body))
    })
}

/// Daraja OAuth client; fetches a fresh token on every call
pub struct MpesaOAuthClient {
    client: Client,
    consumer_key: String,
    consumer_secret: String,
    token_url: String,
}

impl MpesaOAuthClient {
    pub fn new(client: Client, config: &MpesaConfig) -> Self {
        Self {
            client,
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
            token_url: config.token_url(),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for MpesaOAuthClient {
    async fn fetch_access_token(&self) -> MpesaResult<AccessToken> {
        fetch_access_token(
            &self.client,
            &self.consumer_key,
            &self.consumer_secret,
            &self.token_url,
        )
        .await
    }
}

/// M-Pesa payment provider
pub struct MpesaProvider {
    config: MpesaConfig,
    client: Client,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl MpesaProvider {
    /// Create a new M-Pesa provider instance
    pub fn new(config: MpesaConfig) -> MpesaResult<Self> {
        config.validate()?;

        let mut builder = Client::builder().user_agent("mpesa-stk-relay/1.0");
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            MpesaError::config_error(format!("Failed to create HTTP client: {}", e))
        })?;

        let oauth = MpesaOAuthClient::new(client.clone(), &config);
        let tokens: Arc<dyn AccessTokenProvider> = if config.cache_token {
            Arc::new(CachedTokenProvider::new(oauth))
        } else {
            Arc::new(oauth)
        };

        info!(
            "M-Pesa provider initialized for {} with URL: {}",
            config.environment, config.base_url
        );

        Ok(Self {
            config,
            client,
            tokens,
        })
    }

    /// Assemble the process-request body for `request`.
    pub fn build_payload(&self, request: StkPushRequest, timestamp: String) -> StkPushPayload {
        let password = derive_password(&self.config.shortcode, &self.config.passkey, &timestamp);

        StkPushPayload {
            business_short_code: self.config.shortcode.clone(),
            password,
            timestamp,
            transaction_type: self.config.transaction_type,
            amount: request.amount,
            party_a: request.phone_number.clone(),
            party_b: self.config.shortcode.clone(),
            phone_number: request.phone_number,
            callback_url: self.config.callback_url.clone(),
            account_reference: request.account_reference,
            transaction_desc: request.transaction_desc,
        }
    }
}

#[async_trait]
impl PaymentProvider for MpesaProvider {
    async fn initiate_stk_push(&self, request: StkPushRequest) -> MpesaResult<Box<RawValue>> {
        info!(
            "Initiating M-Pesa STK push: amount={} reference={}",
            request.amount, request.account_reference
        );

        let timestamp = current_timestamp();
        let token = self.tokens.fetch_access_token().await?;
        let payload = self.build_payload(request, timestamp);

        let response = self
            .client
            .post(self.config.stk_push_url())
            .bearer_auth(&token.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("Error initiating STK Push: {}", e);
                MpesaError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Error initiating STK Push: HTTP {}: {}", status, body);
            return Err(MpesaError::push_rejected(status.as_u16(), body));
        }

        let body = RawValue::from_string(body).map_err(|e| {
            error!("STK push response is not JSON: {}", e);
            MpesaError::serialization_error(format!("Invalid response format: {}", e))
        })?;

        info!("STK Push Response: {}", body.get());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Number;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required_vars() -> HashMap<String, String> {
        vars(&[
            ("MPESA_CONSUMER_KEY", "key"),
            ("MPESA_CONSUMER_SECRET", "secret"),
            ("MPESA_SHORTCODE", "174379"),
            ("MPESA_PASSKEY", "passkey"),
            ("MPESA_CALLBACK_URL", "https://example.com/callback"),
        ])
    }

    fn config_from(map: &HashMap<String, String>) -> MpesaResult<MpesaConfig> {
        MpesaConfig::from_lookup(|key| map.get(key).cloned())
    }

    fn create_test_provider() -> MpesaProvider {
        let config = config_from(&required_vars()).unwrap();
        MpesaProvider::new(config).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = config_from(&required_vars()).unwrap();
        assert_eq!(config.environment, MpesaEnvironment::Sandbox);
        assert_eq!(config.base_url, "https://sandbox.safaricom.co.ke");
        assert_eq!(config.transaction_type, TransactionType::CustomerPayBillOnline);
        assert_eq!(config.timeout_secs, None);
        assert!(!config.cache_token);
    }

    #[test]
    fn test_config_missing_key() {
        let mut map = required_vars();
        map.remove("MPESA_PASSKEY");
        let err = config_from(&map).unwrap_err();
        assert!(err.to_string().contains("MPESA_PASSKEY"));
    }

    #[test]
    fn test_config_rejects_empty_credentials() {
        let mut map = required_vars();
        map.insert("MPESA_CONSUMER_SECRET".to_string(), "  ".to_string());
        assert!(config_from(&map).is_err());
    }

    #[test]
    fn test_config_production_and_overrides() {
        let mut map = required_vars();
        map.insert("MPESA_ENVIRONMENT".to_string(), "Production".to_string());
        map.insert("MPESA_TRANSACTION_TYPE".to_string(), "CustomerBuyGoodsOnline".to_string());
        map.insert("MPESA_TIMEOUT_SECS".to_string(), "15".to_string());
        map.insert("MPESA_CACHE_TOKEN".to_string(), "true".to_string());

        let config = config_from(&map).unwrap();
        assert_eq!(config.environment, MpesaEnvironment::Production);
        assert_eq!(config.base_url, "https://api.safaricom.co.ke");
        assert_eq!(config.transaction_type, TransactionType::CustomerBuyGoodsOnline);
        assert_eq!(config.timeout_secs, Some(15));
        assert!(config.cache_token);
    }

    #[test]
    fn test_config_base_url_override() {
        let mut map = required_vars();
        map.insert("MPESA_BASE_URL".to_string(), "http://127.0.0.1:9000/".to_string());

        let config = config_from(&map).unwrap();
        assert_eq!(
            config.token_url(),
            "http://127.0.0.1:9000/oauth/v1/generate?grant_type=client_credentials"
        );
        assert_eq!(
            config.stk_push_url(),
            "http://127.0.0.1:9000/mpesa/stkpush/v1/processrequest"
        );
    }

    #[test]
    fn test_config_rejects_invalid_values() {
        for (key, value) in [
            ("MPESA_ENVIRONMENT", "staging"),
            ("MPESA_TRANSACTION_TYPE", "PayBill"),
            ("MPESA_TIMEOUT_SECS", "soon"),
            ("MPESA_TIMEOUT_SECS", "0"),
            ("MPESA_CACHE_TOKEN", "maybe"),
            ("MPESA_CALLBACK_URL", "example.com/callback"),
        ] {
            let mut map = required_vars();
            map.insert(key.to_string(), value.to_string());
            assert!(config_from(&map).is_err(), "{}={} should be rejected", key, value);
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config_from(&required_vars()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("\"secret\""));
        assert!(!rendered.contains("\"key\""));
        assert!(!rendered.contains("\"passkey\""));
        assert!(rendered.contains("174379"));
    }

    #[test]
    fn test_build_payload() {
        let provider = create_test_provider();
        let request = StkPushRequest {
            amount: Number::from(10),
            phone_number: "254712345678".to_string(),
            account_reference: "Order1".to_string(),
            transaction_desc: "Test".to_string(),
        };

        let payload = provider.build_payload(request, "20231005142030".to_string());

        assert_eq!(payload.business_short_code, "174379");
        assert_eq!(payload.password, derive_password("174379", "passkey", "20231005142030"));
        assert_eq!(payload.timestamp, "20231005142030");
        assert_eq!(payload.transaction_type, TransactionType::CustomerPayBillOnline);
        assert_eq!(payload.amount, Number::from(10));
        assert_eq!(payload.party_a, "254712345678");
        assert_eq!(payload.party_b, "174379");
        assert_eq!(payload.phone_number, "254712345678");
        assert_eq!(payload.callback_url, "https://example.com/callback");
        assert_eq!(payload.account_reference, "Order1");
        assert_eq!(payload.transaction_desc, "Test");
    }
}
