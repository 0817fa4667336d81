use super::{ProviderError, WeatherProvider};
use crate::config::WeatherConfig;
use crate::models::weather::ForecastResponse;
use crate::models::WeatherReport;
use async_trait::async_trait;
use relay_core::utils::OAuth1Signer;
use reqwest::Client;

const APP_ID_HEADER: &str = "X-Yahoo-App-Id";

/// Yahoo Weather current-conditions client, OAuth 1.0 signed per request.
pub struct YahooWeatherProvider {
    client: Client,
    config: WeatherConfig,
    signer: OAuth1Signer,
}

impl YahooWeatherProvider {
    pub fn new(client: Client, config: WeatherConfig) -> Self {
        let signer = OAuth1Signer::new(config.client_id.clone(), config.client_secret.clone());
        Self {
            client,
            config,
            signer,
        }
    }

    fn query(&self) -> [(&str, &str); 3] {
        [
            ("location", self.config.location.as_str()),
            ("format", "json"),
            ("u", self.config.units.query_value()),
        ]
    }
}

#[async_trait]
impl WeatherProvider for YahooWeatherProvider {
    async fn current(&self) -> Result<WeatherReport, ProviderError> {
        if !self.config.is_configured() {
            return Err(ProviderError::NotConfigured(
                "Weather credentials are not configured".to_string(),
            ));
        }

        let query = self.query();
        let authorization = self
            .signer
            .authorize("GET", &self.config.endpoint, &query)
            .map_err(|e| ProviderError::Upstream(format!("Failed to sign request: {}", e)))?;

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&query)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(APP_ID_HEADER, &self.config.app_id)
            .send()
            .await
            .map_err(|e| ProviderError::Upstream(format!("Weather request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Weather provider returned an error");
            return Err(ProviderError::Upstream(format!(
                "Weather provider returned status {}",
                status.as_u16()
            )));
        }

        let forecast: ForecastResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Upstream(format!("Malformed weather response: {}", e)))?;

        let report = WeatherReport::from_response(forecast, self.config.units)
            .map_err(ProviderError::Upstream)?;

        tracing::debug!(
            location = %self.config.location,
            condition = %report.condition,
            temperature = report.temperature,
            "Fetched current weather"
        );

        Ok(report)
    }
}

/// Weather provider that always answers the same way.
pub struct StaticWeatherProvider {
    result: Result<WeatherReport, ProviderError>,
}

impl StaticWeatherProvider {
    pub fn new(report: WeatherReport) -> Self {
        Self { result: Ok(report) }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl WeatherProvider for StaticWeatherProvider {
    async fn current(&self) -> Result<WeatherReport, ProviderError> {
        self.result.clone()
    }
}
