//! Current-weather lookup.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::core::config::WeatherConfig;
use crate::core::errors::ApiError;

pub const WEATHER_ERROR_PREFIX: &str = "An error occurred while fetching weather data: ";

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Human-readable report for `location`.
    async fn current_weather(&self, location: &str) -> Result<String, ApiError>;
}

/// Looks up weather for the question text as-is.
///
/// No place name is extracted: a question such as "what's the weather in
/// Delhi?" is sent to the provider verbatim. Failures are folded into the
/// returned text so the synthesizer can relay them.
pub async fn fetch_weather(provider: &dyn WeatherProvider, question: &str) -> String {
    match provider.current_weather(question).await {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!("Weather lookup via {} failed: {}", provider.name(), e);
            format!("{}{}", WEATHER_ERROR_PREFIX, error_message(&e))
        }
    }
}

fn error_message(err: &ApiError) -> String {
    match err {
        ApiError::ServiceUnavailable(msg)
        | ApiError::BadRequest(msg)
        | ApiError::NotFound(msg)
        | ApiError::Upstream(msg)
        | ApiError::Internal(msg) => msg.clone(),
    }
}

/// OpenWeatherMap current-weather endpoint.
pub struct OpenWeatherMapProvider {
    base_url: String,
    api_key: Option<String>,
    units: String,
    client: Client,
}

impl OpenWeatherMapProvider {
    pub fn from_config(config: &WeatherConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            units: config.units.clone(),
            client,
        })
    }

    fn request_url(&self, location: &str, api_key: &str) -> String {
        format!(
            "{}/weather?q={}&appid={}&units={}",
            self.base_url,
            urlencoding::encode(location),
            urlencoding::encode(api_key),
            self.units
        )
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapProvider {
    fn name(&self) -> &str {
        "openweathermap"
    }

    async fn current_weather(&self, location: &str) -> Result<String, ApiError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ApiError::ServiceUnavailable("OpenWeatherMap API key is not configured".to_string())
            })?;

        let res = self
            .client
            .get(self.request_url(location, api_key))
            .send()
            .await
            .map_err(ApiError::upstream)?;

        let status = res.status();
        let body: Value = res.json().await.map_err(ApiError::upstream)?;

        if !status.is_success() {
            let message = body["message"].as_str().unwrap_or("unknown error");
            return Err(ApiError::Upstream(format!("{} ({})", message, status.as_u16())));
        }

        Ok(format_report(location, &body, &self.units))
    }
}

fn temperature_unit(units: &str) -> &'static str {
    match units {
        "imperial" => "°F",
        "standard" => "K",
        _ => "°C",
    }
}

fn speed_unit(units: &str) -> &'static str {
    match units {
        "imperial" => "mph",
        _ => "m/s",
    }
}

fn number(value: &Value) -> String {
    value
        .as_f64()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

fn format_report(location: &str, body: &Value, units: &str) -> String {
    let t = temperature_unit(units);
    let main = &body["main"];
    let wind = &body["wind"];
    let status = body["weather"][0]["description"].as_str().unwrap_or("unknown");
    let rain = match &body["rain"] {
        Value::Object(map) if !map.is_empty() => Value::Object(map.clone()).to_string(),
        _ => "{}".to_string(),
    };

    format!(
        "In {}, the current weather is as follows:\n\
         Detailed status: {}\n\
         Wind speed: {} {}, direction: {}°\n\
         Humidity: {}%\n\
         Temperature: \n  \
         - Current: {}{}\n  \
         - High: {}{}\n  \
         - Low: {}{}\n  \
         - Feels like: {}{}\n\
         Rain: {}\n\
         Cloud cover: {}%",
        location,
        status,
        number(&wind["speed"]),
        speed_unit(units),
        number(&wind["deg"]),
        number(&main["humidity"]),
        number(&main["temp"]),
        t,
        number(&main["temp_max"]),
        t,
        number(&main["temp_min"]),
        t,
        number(&main["feels_like"]),
        t,
        rain,
        number(&body["clouds"]["all"]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StubWeather(Result<String, String>);

    #[async_trait]
    impl WeatherProvider for StubWeather {
        fn name(&self) -> &str {
            "stub"
        }

        async fn current_weather(&self, _location: &str) -> Result<String, ApiError> {
            self.0.clone().map_err(ApiError::Upstream)
        }
    }

    #[tokio::test]
    async fn success_returns_report_verbatim() {
        let provider = StubWeather(Ok("In Delhi, 31°C and clear.".to_string()));
        assert_eq!(fetch_weather(&provider, "Delhi").await, "In Delhi, 31°C and clear.");
    }

    #[tokio::test]
    async fn failure_is_folded_into_error_text() {
        let provider = StubWeather(Err("city not found".to_string()));
        assert_eq!(
            fetch_weather(&provider, "Atlantis").await,
            "An error occurred while fetching weather data: city not found"
        );
    }

    #[tokio::test]
    async fn missing_api_key_is_reported_not_raised() {
        let provider = OpenWeatherMapProvider::from_config(&WeatherConfig::default()).unwrap();
        let text = fetch_weather(&provider, "Delhi").await;
        assert!(text.starts_with(WEATHER_ERROR_PREFIX));
        assert!(text.contains("API key"));
    }

    #[test]
    fn request_url_encodes_whole_question() {
        let provider = OpenWeatherMapProvider::from_config(&WeatherConfig::default()).unwrap();
        assert_eq!(
            provider.request_url("weather in New Delhi?", "k"),
            "https://api.openweathermap.org/data/2.5/weather?q=weather%20in%20New%20Delhi%3F&appid=k&units=metric"
        );
    }

    #[test]
    fn formats_openweathermap_payload() {
        let body = json!({
            "weather": [{ "main": "Haze", "description": "haze" }],
            "main": { "temp": 31.5, "feels_like": 35.0, "temp_min": 30.0, "temp_max": 33.0, "humidity": 62 },
            "wind": { "speed": 3.6, "deg": 270 },
            "clouds": { "all": 40 },
            "name": "Delhi"
        });

        let report = format_report("Delhi", &body, "metric");
        assert!(report.starts_with("In Delhi, the current weather is as follows:"));
        assert!(report.contains("Detailed status: haze"));
        assert!(report.contains("Wind speed: 3.6 m/s, direction: 270°"));
        assert!(report.contains("Humidity: 62%"));
        assert!(report.contains("- Current: 31.5°C"));
        assert!(report.contains("- Feels like: 35°C"));
        assert!(report.contains("Rain: {}"));
        assert!(report.contains("Cloud cover: 40%"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_openweathermap() {
        let provider = OpenWeatherMapProvider::from_config(&WeatherConfig {
            api_key: std::env::var("OPENWEATHERMAP_API_KEY").ok(),
            ..WeatherConfig::default()
        })
        .unwrap();
        println!("{}", fetch_weather(&provider, "Delhi").await);
    }
}
