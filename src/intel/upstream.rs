use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::{Config, Credentials};

pub const LONDON_LAT: f64 = 51.5074;
pub const LONDON_LON: f64 = -0.1278;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Weather,
    AirQuality,
    RoadStatus,
    TubeStatus,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Weather,
        Endpoint::AirQuality,
        Endpoint::RoadStatus,
        Endpoint::TubeStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Weather => "weather",
            Endpoint::AirQuality => "air_quality",
            Endpoint::RoadStatus => "road_status",
            Endpoint::TubeStatus => "tube_status",
        }
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{endpoint:?} returned HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },
    #[error("{endpoint:?} request failed: {msg}")]
    Transport { endpoint: Endpoint, msg: String },
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
}

/// One JSON GET per endpoint. Non-2xx answers must surface as `UpstreamError::Status`.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get_json(&self, endpoint: Endpoint, creds: &Credentials) -> Result<Value, UpstreamError>;
}

/// OpenWeather + TfL over HTTPS.
pub struct HttpUpstream {
    client: Client,
    openweather_base: String,
    tfl_base: String,
}

impl HttpUpstream {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            openweather_base: cfg.openweather_base.clone(),
            tfl_base: cfg.tfl_base.clone(),
        })
    }

    pub fn url_for(&self, endpoint: Endpoint, creds: &Credentials) -> Result<Url, UpstreamError> {
        let (base, path) = match endpoint {
            Endpoint::Weather => (&self.openweather_base, "/data/2.5/weather"),
            Endpoint::AirQuality => (&self.openweather_base, "/data/2.5/air_pollution"),
            Endpoint::RoadStatus => (&self.tfl_base, "/Road/All/Status"),
            Endpoint::TubeStatus => (&self.tfl_base, "/Line/Mode/tube/Status"),
        };
        let mut url = Url::parse(base.trim_end_matches('/'))?.join(path)?;
        {
            let mut q = url.query_pairs_mut();
            match endpoint {
                Endpoint::Weather => {
                    q.append_pair("q", "London,uk")
                        .append_pair("appid", &creds.openweather_key)
                        .append_pair("units", "metric");
                }
                Endpoint::AirQuality => {
                    q.append_pair("lat", &LONDON_LAT.to_string())
                        .append_pair("lon", &LONDON_LON.to_string())
                        .append_pair("appid", &creds.openweather_key);
                }
                Endpoint::RoadStatus | Endpoint::TubeStatus => {
                    q.append_pair("app_id", &creds.tfl_app_id)
                        .append_pair("app_key", &creds.tfl_app_key);
                }
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_json(&self, endpoint: Endpoint, creds: &Credentials) -> Result<Value, UpstreamError> {
        let url = self.url_for(endpoint, creds)?;
        let transport = |e: reqwest::Error| UpstreamError::Transport {
            endpoint,
            msg: e.without_url().to_string(),
        };

        let resp = self.client.get(url).send().await.map_err(transport)?;
        if !resp.status().is_success() {
            return Err(UpstreamError::Status {
                endpoint,
                status: resp.status().as_u16(),
            });
        }
        resp.json::<Value>().await.map_err(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::from_parts(Some("app-id"), Some("app-key"), Some("ow-key")).unwrap()
    }

    #[test]
    fn test_weather_url() {
        let up = HttpUpstream::new(&Config::default()).unwrap();
        let url = up.url_for(Endpoint::Weather, &creds()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.openweathermap.org/data/2.5/weather?q=London%2Cuk&appid=ow-key&units=metric"
        );
    }

    #[test]
    fn test_air_quality_url_uses_fixed_coordinates() {
        let up = HttpUpstream::new(&Config::default()).unwrap();
        let url = up.url_for(Endpoint::AirQuality, &creds()).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("lat".into(), "51.5074".into())));
        assert!(pairs.contains(&("lon".into(), "-0.1278".into())));
        assert_eq!(url.path(), "/data/2.5/air_pollution");
    }

    #[test]
    fn test_tfl_urls_carry_app_credentials() {
        let up = HttpUpstream::new(&Config::default()).unwrap();
        let roads = up.url_for(Endpoint::RoadStatus, &creds()).unwrap();
        assert_eq!(roads.as_str(), "https://api.tfl.gov.uk/Road/All/Status?app_id=app-id&app_key=app-key");
        let tube = up.url_for(Endpoint::TubeStatus, &creds()).unwrap();
        assert_eq!(tube.path(), "/Line/Mode/tube/Status");
    }

    #[test]
    fn test_custom_base_with_trailing_slash() {
        let cfg = Config {
            tfl_base: "http://localhost:8080/".to_string(),
            ..Config::default()
        };
        let up = HttpUpstream::new(&cfg).unwrap();
        let url = up.url_for(Endpoint::RoadStatus, &creds()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/Road/All/Status?app_id=app-id&app_key=app-key");
    }

    #[test]
    fn test_bad_base_url_is_an_error() {
        let cfg = Config {
            openweather_base: "not a url".to_string(),
            ..Config::default()
        };
        let up = HttpUpstream::new(&cfg).unwrap();
        assert!(matches!(up.url_for(Endpoint::Weather, &creds()), Err(UpstreamError::Url(_))));
    }
}
