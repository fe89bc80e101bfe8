#![allow(dead_code)]

use booking_service::config::{
    Config, CurrencyConfig, DatabaseConfig, JwtConfig, ServerConfig, StripeConfig,
};
use booking_service::Application;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::Secret;
use serde::Serialize;
use sha2::Sha256;
use wiremock::MockServer;

pub const TEST_USER_ID: &str = "user-1";
pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: mongodb::Database,
    pub db_name: String,
    pub stripe_server: MockServer,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let stripe_server = MockServer::start().await;
        let db_name = format!("booking_test_{}", uuid::Uuid::new_v4());

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: Secret::new(
                    std::env::var("TEST_MONGODB_URI")
                        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
                ),
                db_name: db_name.clone(),
            },
            stripe: StripeConfig {
                secret_key: Secret::new("sk_test_key".to_string()),
                publishable_key: "pk_test_key".to_string(),
                webhook_secret: Secret::new(TEST_WEBHOOK_SECRET.to_string()),
                webhook_tolerance_seconds: 300,
                api_base_url: stripe_server.uri(),
                request_timeout_seconds: 5,
            },
            currency: CurrencyConfig {
                rwf_per_usd: 1300.0,
                min_amount_rwf: 1000.0,
            },
            jwt: JwtConfig {
                secret: Secret::new(TEST_JWT_SECRET.to_string()),
            },
            service_name: "booking-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);
        let db = app.db().clone();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            db_name,
            stripe_server,
        }
    }

    /// Bearer header with a signed HS256 access token for the given user.
    pub fn auth_header(&self, user_id: &str) -> String {
        #[derive(Serialize)]
        struct Claims {
            sub: String,
            exp: i64,
        }

        let claims = Claims {
            sub: user_id.to_string(),
            exp: Utc::now().timestamp() + 3600,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .expect("Failed to sign test token");

        format!("Bearer {}", token)
    }

    /// Stripe-style `t=...,v1=...` signature header over the raw body.
    pub fn sign_webhook(&self, body: &str) -> String {
        self.sign_webhook_with(body, Utc::now().timestamp(), TEST_WEBHOOK_SECRET)
    }

    pub fn sign_webhook_with(&self, body: &str, timestamp: i64, secret: &str) -> String {
        type HmacSha256 = Hmac<Sha256>;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(format!("{}.{}", timestamp, body).as_bytes());

        format!(
            "t={},v1={}",
            timestamp,
            hex::encode(mac.finalize().into_bytes())
        )
    }

    /// Cleanup test database after test completes.
    pub async fn cleanup(&self) {
        self.db
            .drop(None)
            .await
            .expect("Failed to drop test database");
    }
}
