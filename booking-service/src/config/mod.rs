use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub stripe: StripeConfig,
    pub currency: CurrencyConfig,
    pub jwt: JwtConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub publishable_key: String,
    pub webhook_secret: Secret<String>,
    /// Maximum age of the `t=` timestamp in a webhook signature header.
    pub webhook_tolerance_seconds: i64,
    pub api_base_url: String,
    pub request_timeout_seconds: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CurrencyConfig {
    /// Fixed exchange rate applied at intent creation; no live-rate lookup.
    pub rwf_per_usd: f64,
    /// Display-currency floor, chosen so the converted charge clears the
    /// provider-side minimum.
    pub min_amount_rwf: f64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct JwtConfig {
    pub secret: Secret<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("BOOKING_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("BOOKING_SERVICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let db_url = env::var("BOOKING_DATABASE_URL").expect("BOOKING_DATABASE_URL must be set");
        let db_name =
            env::var("BOOKING_DATABASE_NAME").unwrap_or_else(|_| "booking_db".to_string());

        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").unwrap_or_default();
        let stripe_publishable_key = env::var("STRIPE_PUBLISHABLE_KEY").unwrap_or_default();
        let stripe_webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default();
        let webhook_tolerance_seconds = env::var("STRIPE_WEBHOOK_TOLERANCE_SECONDS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()?;
        let api_base_url = env::var("STRIPE_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.stripe.com/v1".to_string());
        let request_timeout_seconds = env::var("STRIPE_REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;

        let rwf_per_usd = env::var("CURRENCY_RWF_PER_USD")
            .unwrap_or_else(|_| "1300.0".to_string())
            .parse()?;
        let min_amount_rwf = env::var("CURRENCY_MIN_AMOUNT_RWF")
            .unwrap_or_else(|_| "1000.0".to_string())
            .parse()?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            stripe: StripeConfig {
                secret_key: Secret::new(stripe_secret_key),
                publishable_key: stripe_publishable_key,
                webhook_secret: Secret::new(stripe_webhook_secret),
                webhook_tolerance_seconds,
                api_base_url,
                request_timeout_seconds,
            },
            currency: CurrencyConfig {
                rwf_per_usd,
                min_amount_rwf,
            },
            jwt: JwtConfig {
                secret: Secret::new(jwt_secret),
            },
            service_name: "booking-service".to_string(),
        })
    }
}
