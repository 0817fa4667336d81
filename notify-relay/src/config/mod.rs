use chrono_tz::Tz;
use relay_core::config as core_config;
use relay_core::error::AppError;
use secrecy::Secret;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LINE_API_BASE_URL: &str = "https://api.line.me";
pub const DEFAULT_WEATHER_ENDPOINT: &str = "https://weather-ydn-yql.media.yahoo.com/forecastrss";
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Thanks for following! Weather and sensor notifications will be delivered here.";
pub const DEFAULT_SENSOR_MESSAGE: &str = "Notification from Arduino";

#[derive(Debug, Clone)]
pub struct NotifyRelayConfig {
    pub common: core_config::Config,
    pub line: LineConfig,
    pub arduino: ArduinoConfig,
    pub store: StoreConfig,
    pub weather: WeatherConfig,
    pub dispatch: DispatchConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone)]
pub struct LineConfig {
    pub channel_access_token: Secret<String>,
    /// When set, inbound webhooks must carry a valid `X-Line-Signature`.
    pub channel_secret: Option<Secret<String>>,
    pub api_base_url: String,
    pub welcome_message: String,
}

#[derive(Debug, Clone)]
pub struct ArduinoConfig {
    /// LINE user that receives sensor-triggered pushes.
    pub recipient: Option<String>,
    pub default_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Rest,
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(StoreBackend::Rest),
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Unknown STORE_BACKEND '{}': expected rest, mongo or memory",
                other
            ))),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Rest => write!(f, "rest"),
            StoreBackend::Mongo => write!(f, "mongo"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub rest: RestStoreConfig,
    pub mongodb: MongoConfig,
}

#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    pub url: String,
    pub api_key: Secret<String>,
    pub table: String,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Value of the provider's `u` query parameter.
    pub fn query_value(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "c",
            TemperatureUnit::Fahrenheit => "f",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Unknown WEATHER_UNITS '{}': expected c or f",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub endpoint: String,
    pub app_id: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub location: String,
    pub units: TemperatureUnit,
    pub timezone: Tz,
}

impl WeatherConfig {
    pub fn is_configured(&self) -> bool {
        use secrecy::ExposeSecret;
        !self.app_id.is_empty()
            && !self.client_id.is_empty()
            && !self.client_secret.expose_secret().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound on in-flight pushes during a broadcast.
    pub concurrency: usize,
    /// Total time a single push may spend retrying transient failures.
    pub retry_max_elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub outbound_timeout: Duration,
    pub inbound_timeout: Duration,
}

impl NotifyRelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let timezone_name = get_env("WEATHER_TIMEZONE", Some("Asia/Tokyo"), false)?;
        let timezone = timezone_name.parse::<Tz>().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid WEATHER_TIMEZONE '{}': {}",
                timezone_name,
                e
            ))
        })?;

        Ok(NotifyRelayConfig {
            common: common_config,
            line: LineConfig {
                channel_access_token: Secret::new(get_env(
                    "LINE_CHANNEL_ACCESS_TOKEN",
                    None,
                    is_prod,
                )?),
                channel_secret: get_optional_env("LINE_CHANNEL_SECRET").map(Secret::new),
                api_base_url: get_env("LINE_API_BASE_URL", Some(DEFAULT_LINE_API_BASE_URL), false)?,
                welcome_message: get_env(
                    "LINE_WELCOME_MESSAGE",
                    Some(DEFAULT_WELCOME_MESSAGE),
                    false,
                )?,
            },
            arduino: ArduinoConfig {
                recipient: get_optional_env("LINE_FALLBACK_RECIPIENT"),
                default_message: get_env(
                    "ARDUINO_DEFAULT_MESSAGE",
                    Some(DEFAULT_SENSOR_MESSAGE),
                    false,
                )?,
            },
            store: StoreConfig {
                backend: get_env("STORE_BACKEND", Some("memory"), is_prod)?.parse()?,
                rest: RestStoreConfig {
                    url: get_env("DATASTORE_URL", Some(""), false)?,
                    api_key: Secret::new(get_env("DATASTORE_KEY", Some(""), false)?),
                    table: get_env("DATASTORE_TABLE", Some("recipients"), false)?,
                },
                mongodb: MongoConfig {
                    uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), false)?,
                    database: get_env("MONGODB_DATABASE", Some("notify_relay"), false)?,
                },
            },
            weather: WeatherConfig {
                endpoint: get_env("WEATHER_ENDPOINT", Some(DEFAULT_WEATHER_ENDPOINT), false)?,
                app_id: get_env("WEATHER_APP_ID", Some(""), is_prod)?,
                client_id: get_env("WEATHER_CLIENT_ID", Some(""), is_prod)?,
                client_secret: Secret::new(get_env("WEATHER_CLIENT_SECRET", Some(""), is_prod)?),
                location: get_env("WEATHER_LOCATION", Some("tokyo,jp"), false)?,
                units: get_env("WEATHER_UNITS", Some("c"), false)?.parse()?,
                timezone,
            },
            dispatch: DispatchConfig {
                concurrency: get_parsed_env("DISPATCH_CONCURRENCY", 1)?.max(1),
                retry_max_elapsed: Duration::from_secs(get_parsed_env(
                    "DISPATCH_RETRY_MAX_SECS",
                    2,
                )?),
            },
            http: HttpConfig {
                outbound_timeout: Duration::from_secs(get_parsed_env("OUTBOUND_TIMEOUT_SECS", 10)?),
                inbound_timeout: Duration::from_secs(get_parsed_env("INBOUND_TIMEOUT_SECS", 30)?),
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_parsed_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_known_names() {
        assert_eq!("rest".parse::<StoreBackend>().unwrap(), StoreBackend::Rest);
        assert_eq!("MongoDB".parse::<StoreBackend>().unwrap(), StoreBackend::Mongo);
        assert_eq!(" memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn temperature_unit_round_trips_query_value() {
        let unit: TemperatureUnit = "f".parse().unwrap();
        assert_eq!(unit, TemperatureUnit::Fahrenheit);
        assert_eq!(unit.query_value(), "f");
        assert_eq!(TemperatureUnit::Celsius.symbol(), "°C");
        assert!("kelvin".parse::<TemperatureUnit>().is_err());
    }

    #[test]
    fn get_env_falls_back_outside_prod() {
        let value = get_env("NOTIFY_RELAY_TEST_UNSET_KEY", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
        assert!(get_env("NOTIFY_RELAY_TEST_UNSET_KEY", Some("fallback"), true).is_err());
        assert!(get_env("NOTIFY_RELAY_TEST_UNSET_KEY", None, false).is_err());
    }
}
