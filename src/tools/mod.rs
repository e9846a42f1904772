pub mod weather;

pub use weather::{fetch_weather, OpenWeatherMapProvider, WeatherProvider, WEATHER_ERROR_PREFIX};
