#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use notify_relay::config::{
    ArduinoConfig, DispatchConfig, HttpConfig, LineConfig, MongoConfig, NotifyRelayConfig,
    RestStoreConfig, StoreBackend, StoreConfig, TemperatureUnit, WeatherConfig,
};
use notify_relay::models::WeatherReport;
use notify_relay::services::{
    MemoryRecipientStore, MockPushProvider, PushProvider, StaticWeatherProvider, WeatherProvider,
};
use notify_relay::startup::{AppState, Application};
use relay_core::config::Config as CoreConfig;
use secrecy::Secret;
use std::sync::Arc;
use std::time::Duration;

pub const WELCOME: &str = "Welcome aboard!";
pub const CANNED: &str = "Sensor tripped";
pub const SENSOR_RECIPIENT: &str = "U-owner";

pub fn test_config() -> NotifyRelayConfig {
    NotifyRelayConfig {
        common: CoreConfig { port: 0 },
        line: LineConfig {
            channel_access_token: Secret::new("test-token".to_string()),
            channel_secret: None,
            api_base_url: "http://127.0.0.1:9".to_string(),
            welcome_message: WELCOME.to_string(),
        },
        arduino: ArduinoConfig {
            recipient: Some(SENSOR_RECIPIENT.to_string()),
            default_message: CANNED.to_string(),
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            rest: RestStoreConfig {
                url: String::new(),
                api_key: Secret::new(String::new()),
                table: "recipients".to_string(),
            },
            mongodb: MongoConfig {
                uri: "mongodb://localhost:27017".to_string(),
                database: "notify_relay_test".to_string(),
            },
        },
        weather: WeatherConfig {
            endpoint: "http://127.0.0.1:9/forecastrss".to_string(),
            app_id: "app-123".to_string(),
            client_id: "client".to_string(),
            client_secret: Secret::new("secret".to_string()),
            location: "tokyo,jp".to_string(),
            units: TemperatureUnit::Celsius,
            timezone: chrono_tz::Asia::Tokyo,
        },
        dispatch: DispatchConfig {
            concurrency: 1,
            retry_max_elapsed: Duration::ZERO,
        },
        http: HttpConfig {
            outbound_timeout: Duration::from_secs(5),
            inbound_timeout: Duration::from_secs(10),
        },
    }
}

pub fn sample_report() -> WeatherReport {
    WeatherReport {
        city: Some("Tokyo".to_string()),
        condition: "Cloudy".to_string(),
        temperature: 17.0,
        humidity: 70.0,
        unit: TemperatureUnit::Celsius,
        observed_at: Utc.timestamp_opt(1_700_002_800, 0).single(),
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryRecipientStore>,
}

pub struct TestAppBuilder {
    config: NotifyRelayConfig,
    store: Arc<MemoryRecipientStore>,
    weather: Arc<dyn WeatherProvider>,
    push: Arc<dyn PushProvider>,
}

impl TestAppBuilder {
    pub fn config(mut self, f: impl FnOnce(&mut NotifyRelayConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn store(mut self, store: Arc<MemoryRecipientStore>) -> Self {
        self.store = store;
        self
    }

    pub fn weather(mut self, weather: Arc<dyn WeatherProvider>) -> Self {
        self.weather = weather;
        self
    }

    pub fn push(mut self, push: Arc<dyn PushProvider>) -> Self {
        self.push = push;
        self
    }

    pub async fn spawn(self) -> TestApp {
        let state = AppState {
            config: self.config,
            store: self.store.clone(),
            weather: self.weather,
            push: self.push,
        };

        let app = Application::build_with_state(state)
            .await
            .expect("Failed to build test application");
        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            client,
            store: self.store,
        }
    }
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            config: test_config(),
            store: Arc::new(MemoryRecipientStore::new()),
            weather: Arc::new(StaticWeatherProvider::new(sample_report())),
            push: Arc::new(MockPushProvider::new()),
        }
    }

    pub async fn spawn() -> Self {
        Self::builder().spawn().await
    }

    pub async fn post(&self, path: &str, body: impl Into<reqwest::Body>) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}
