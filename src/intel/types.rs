use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiStatus {
    Good,
    Fair,
    Poor,
}

impl AqiStatus {
    /// Provider AQI (1-5) bucketing: 3 is Fair, 4 and above Poor, the rest Good.
    pub fn from_index(value: u32) -> Self {
        match value {
            3 => AqiStatus::Fair,
            v if v >= 4 => AqiStatus::Poor,
            _ => AqiStatus::Good,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AqiStatus::Good => "Good",
            AqiStatus::Fair => "Fair",
            AqiStatus::Poor => "Poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub temp: f64,
    pub rain_mm: f64,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    pub value: u32,
    pub status: AqiStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TubeLine {
    pub line: String,
    pub status: String,
}

impl TubeLine {
    pub fn new(line: &str, status: &str) -> Self {
        Self {
            line: line.to_string(),
            status: status.to_string(),
        }
    }

    /// Widgets show "OK" for any status mentioning Good, "DELAY" otherwise.
    pub fn is_good(&self) -> bool {
        self.status.contains("Good")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traffic {
    pub congestion_level: u32,
    pub tube_status: Vec<TubeLine>,
}

/// One complete London snapshot. Always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LondonData {
    pub weather: Weather,
    pub aqi: AirQuality,
    pub traffic: Traffic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    MissingCredentials,
    UpstreamStatus,
    Transport,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::MissingCredentials => "missing_credentials",
            FallbackReason::UpstreamStatus => "upstream_status",
            FallbackReason::Transport => "transport",
        }
    }
}

/// Result of one acquisition cycle: fully live or fully simulated.
#[derive(Debug, Clone, PartialEq)]
pub enum IntelReading {
    Live(LondonData),
    Simulated { data: LondonData, reason: FallbackReason },
}

impl IntelReading {
    pub fn data(&self) -> &LondonData {
        match self {
            IntelReading::Live(data) => data,
            IntelReading::Simulated { data, .. } => data,
        }
    }

    pub fn into_data(self) -> LondonData {
        match self {
            IntelReading::Live(data) => data,
            IntelReading::Simulated { data, .. } => data,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, IntelReading::Live(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aqi_bucketing_boundaries() {
        assert_eq!(AqiStatus::from_index(1), AqiStatus::Good);
        assert_eq!(AqiStatus::from_index(2), AqiStatus::Good);
        assert_eq!(AqiStatus::from_index(3), AqiStatus::Fair);
        assert_eq!(AqiStatus::from_index(4), AqiStatus::Poor);
        assert_eq!(AqiStatus::from_index(5), AqiStatus::Poor);
    }

    #[test]
    fn test_json_shape_uses_camel_case() {
        let data = LondonData {
            weather: Weather { temp: 11.2, rain_mm: 0.4, condition: "mist".into() },
            aqi: AirQuality { value: 3, status: AqiStatus::Fair },
            traffic: Traffic {
                congestion_level: 55,
                tube_status: vec![TubeLine::new("Central", "Minor Delays")],
            },
        };
        let v = serde_json::to_value(&data).unwrap();
        assert_eq!(v["weather"]["rainMm"], 0.4);
        assert_eq!(v["aqi"]["status"], "Fair");
        assert_eq!(v["traffic"]["congestionLevel"], 55);
        assert_eq!(v["traffic"]["tubeStatus"][0]["line"], "Central");
    }

    #[test]
    fn test_tube_line_good_detection() {
        assert!(TubeLine::new("Jubilee", "Good Service").is_good());
        assert!(!TubeLine::new("Central", "Minor Delays").is_good());
    }
}
