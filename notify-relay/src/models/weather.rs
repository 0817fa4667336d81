use crate::config::TemperatureUnit;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::fmt::Write as _;

/// Current conditions from one provider response. Never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub city: Option<String>,
    pub condition: String,
    pub temperature: f64,
    pub humidity: f64,
    pub unit: TemperatureUnit,
    pub observed_at: Option<DateTime<Utc>>,
}

/// Subset of the Yahoo Weather `forecastrss?format=json` response.
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub location: Option<ForecastLocation>,
    #[serde(default)]
    pub current_observation: Option<CurrentObservation>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastLocation {
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CurrentObservation {
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub atmosphere: Option<Atmosphere>,
    #[serde(rename = "pubDate", default)]
    pub pub_date: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Atmosphere {
    #[serde(default)]
    pub humidity: Option<f64>,
}

impl WeatherReport {
    /// Extract the report, naming the first required field that is absent.
    pub fn from_response(
        response: ForecastResponse,
        unit: TemperatureUnit,
    ) -> Result<Self, String> {
        let observation = response
            .current_observation
            .ok_or("missing current_observation")?;
        let condition = observation
            .condition
            .ok_or("missing current_observation.condition")?;

        let text = condition
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or("missing current_observation.condition.text")?;
        let temperature = condition
            .temperature
            .ok_or("missing current_observation.condition.temperature")?;
        let humidity = observation
            .atmosphere
            .and_then(|a| a.humidity)
            .ok_or("missing current_observation.atmosphere.humidity")?;

        Ok(Self {
            city: response.location.and_then(|l| l.city),
            condition: text,
            temperature,
            humidity,
            unit,
            observed_at: observation
                .pub_date
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        })
    }

    /// Render the push text. Timestamps use `sent_at`'s zone, never UTC
    /// unless that is the configured zone.
    pub fn format_message<Tz>(&self, sent_at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut message = match &self.city {
            Some(city) => format!("Weather in {}\n", city),
            None => "Current weather\n".to_string(),
        };

        let _ = writeln!(message, "Condition: {}", self.condition);
        let _ = writeln!(
            message,
            "Temperature: {}{}",
            self.temperature,
            self.unit.symbol()
        );
        let _ = writeln!(message, "Humidity: {}%", self.humidity);

        if let Some(observed_at) = self.observed_at {
            let local = observed_at.with_timezone(&sent_at.timezone());
            let _ = writeln!(message, "Observed: {}", local.format("%Y-%m-%d %H:%M"));
        }

        let _ = write!(message, "Sent: {}", sent_at.format("%Y-%m-%d %H:%M %Z"));
        message
    }
}
