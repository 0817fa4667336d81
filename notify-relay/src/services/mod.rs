pub mod dispatch;
pub mod metrics;
pub mod providers;
pub mod store;

pub use dispatch::{broadcast, BroadcastReport, DispatchFailure, DispatchOutcome};
pub use metrics::{
    get_metrics, init_metrics, record_dispatch, record_registration, record_weather_fetch,
};
pub use providers::{
    LinePushProvider, MockPushProvider, ProviderError, ProviderResponse, PushProvider,
    StaticWeatherProvider, WeatherProvider, YahooWeatherProvider,
};
pub use store::{MemoryRecipientStore, MongoRecipientStore, RecipientStore, RestRecipientStore};
