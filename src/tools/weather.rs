use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::env;
use std::fmt::Write;

use super::Tool;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{ToolCall, ToolDefinition};

pub const WEATHER_TOOL_NAME: &str = "GetWeather";
pub const OPEN_METEO_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DEFAULT_CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,weather_code,wind_speed_10m";
const HOURLY_LIMIT: usize = 24;

const WEATHER_TOOL_DESCRIPTION: &str = r#"Use this tool to get current weather and forecast information for a specific location.
Example:
    "What's the weather in Shenzhen?"
Then Action Input is: {"latitude": 22.547, "longitude": 114.058}

You can also request specific weather parameters:
{"latitude": 22.547, "longitude": 114.058, "current": ["temperature_2m", "weather_code"], "daily": ["temperature_2m_max", "temperature_2m_min"]}"#;

/// Arguments the model passes to `GetWeather`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherParams {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub current: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub hourly: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub daily: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub timezone: String,
}

/// `null` decodes to the field's zero value, the same as a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenMeteoResponse {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub current: CurrentWeather,
    pub hourly: Option<HourlyForecast>,
    pub daily: Option<DailyForecast>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CurrentWeather {
    #[serde(deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub temperature_2m: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub relative_humidity_2m: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub wind_speed_10m: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub weather_code: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HourlyForecast {
    pub time: Vec<String>,
    // Open-Meteo puts null in a series where it has no value
    pub temperature_2m: Vec<Option<f64>>,
    pub relative_humidity_2m: Vec<Option<f64>>,
    pub wind_speed_10m: Vec<Option<f64>>,
    pub weather_code: Vec<Option<i64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DailyForecast {
    pub time: Vec<String>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
    pub precipitation_sum: Vec<Option<f64>>,
}

/// WMO weather interpretation codes as used by Open-Meteo
pub fn weather_code_description(code: i64) -> Option<&'static str> {
    let description = match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => return None,
    };
    Some(description)
}

pub fn weather_tool_definition() -> ToolDefinition {
    ToolDefinition::new(
        WEATHER_TOOL_NAME,
        WEATHER_TOOL_DESCRIPTION,
        json!({
            "type": "object",
            "properties": {
                "latitude": {
                    "type": "number",
                    "description": "Latitude coordinate of the location"
                },
                "longitude": {
                    "type": "number",
                    "description": "Longitude coordinate of the location"
                },
                "current": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Current weather parameters to include (e.g., temperature_2m, relative_humidity_2m, wind_speed_10m, weather_code)"
                },
                "hourly": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Hourly forecast parameters to include (e.g., temperature_2m, relative_humidity_2m, wind_speed_10m, weather_code)"
                },
                "daily": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Daily forecast parameters to include (e.g., temperature_2m_max, temperature_2m_min, precipitation_sum)"
                },
                "timezone": {
                    "type": "string",
                    "description": "Timezone for the data (e.g., 'GMT', 'America/New_York', or 'auto' for automatic detection)"
                }
            },
            "required": ["latitude", "longitude"]
        }),
    )
}

/// Query string for the forecast endpoint, with defaults filled in
pub fn build_query(params: &WeatherParams) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("latitude", format!("{:.6}", params.latitude)),
        ("longitude", format!("{:.6}", params.longitude)),
    ];

    if params.current.is_empty() {
        query.push(("current", DEFAULT_CURRENT_FIELDS.to_string()));
    } else {
        query.push(("current", params.current.join(",")));
    }
    if !params.hourly.is_empty() {
        query.push(("hourly", params.hourly.join(",")));
    }
    if !params.daily.is_empty() {
        query.push(("daily", params.daily.join(",")));
    }
    if params.timezone.is_empty() {
        query.push(("timezone", "auto".to_string()));
    } else {
        query.push(("timezone", params.timezone.clone()));
    }

    query
}

/// Human readable summary handed back to the model
pub fn format_weather(data: &OpenMeteoResponse) -> String {
    // Writing to a String cannot fail
    let mut out = String::new();
    let current = &data.current;

    out.push_str("Current Weather:\n");
    let _ = writeln!(out, "Time: {}", current.time);
    let _ = writeln!(out, "Temperature: {:.1}°C", current.temperature_2m);
    if current.relative_humidity_2m != 0.0 {
        let _ = writeln!(out, "Humidity: {:.1}%", current.relative_humidity_2m);
    }
    if current.wind_speed_10m != 0.0 {
        let _ = writeln!(out, "Wind Speed: {:.1} km/h", current.wind_speed_10m);
    }
    if let Some(desc) = weather_code_description(current.weather_code) {
        let _ = writeln!(out, "Conditions: {}", desc);
    }

    if let Some(hourly) = data.hourly.as_ref().filter(|h| !h.time.is_empty()) {
        out.push_str("\nHourly Forecast (next 24 hours):\n");
        for (i, time) in hourly.time.iter().take(HOURLY_LIMIT).enumerate() {
            let _ = writeln!(out, "Time: {}", time);
            if let Some(t) = hourly.temperature_2m.get(i).copied().flatten() {
                let _ = writeln!(out, "  Temperature: {:.1}°C", t);
            }
            if let Some(h) = hourly.relative_humidity_2m.get(i).copied().flatten() {
                let _ = writeln!(out, "  Humidity: {:.1}%", h);
            }
            if let Some(w) = hourly.wind_speed_10m.get(i).copied().flatten() {
                let _ = writeln!(out, "  Wind Speed: {:.1} km/h", w);
            }
            if let Some(desc) = hourly
                .weather_code
                .get(i)
                .copied()
                .flatten()
                .and_then(weather_code_description)
            {
                let _ = writeln!(out, "  Conditions: {}", desc);
            }
            out.push('\n');
        }
    }

    if let Some(daily) = data.daily.as_ref().filter(|d| !d.time.is_empty()) {
        out.push_str("\nDaily Forecast:\n");
        for (i, date) in daily.time.iter().enumerate() {
            let _ = writeln!(out, "Date: {}", date);
            if let Some(t) = daily.temperature_2m_max.get(i).copied().flatten() {
                let _ = writeln!(out, "  Max Temperature: {:.1}°C", t);
            }
            if let Some(t) = daily.temperature_2m_min.get(i).copied().flatten() {
                let _ = writeln!(out, "  Min Temperature: {:.1}°C", t);
            }
            if let Some(p) = daily.precipitation_sum.get(i).copied().flatten() {
                let _ = writeln!(out, "  Precipitation: {:.1} mm", p);
            }
            out.push('\n');
        }
    }

    out
}

/// `GetWeather`, backed by the Open-Meteo forecast API
pub struct WeatherTool {
    client: Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new() -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: OPEN_METEO_FORECAST_URL.to_string(),
        })
    }

    /// Honors `WEATHER_API_URL` when set
    pub fn from_env() -> Result<Self> {
        let tool = Self::new()?;
        Ok(match env::var("WEATHER_API_URL") {
            Ok(url) if !url.is_empty() => tool.with_base_url(url),
            _ => tool,
        })
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn get_weather(&self, params: &WeatherParams) -> Result<String> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&build_query(params))
            .send()
            .await
            .context("error making request to Open-Meteo API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("error reading response body")?;

        if status != StatusCode::OK {
            return Err(anyhow!("API error: {} - {}", status, body));
        }

        let data: OpenMeteoResponse =
            serde_json::from_str(&body).context("error parsing JSON response")?;
        Ok(format_weather(&data))
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn definition(&self) -> ToolDefinition {
        weather_tool_definition()
    }

    async fn call(&self, call: &ToolCall) -> AgentResult<String> {
        let params: WeatherParams = call.parse_arguments()?;
        self.get_weather(&params)
            .await
            .map_err(|e| AgentError::ExecutionError(format!("{:#}", e)))
    }
}
