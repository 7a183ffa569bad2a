use serde_json::Value;

use super::types::{AirQuality, AqiStatus, LondonData, Traffic, TubeLine, Weather};

pub const PRIORITY_LINES: [&str; 3] = ["Northern", "Central", "Jubilee"];
pub const BASELINE_CONGESTION: u32 = 45;

/// Raw upstream payloads for one cycle, as parsed JSON.
#[derive(Debug, Clone)]
pub struct RawBundle {
    pub weather: Value,
    pub air_quality: Value,
    pub roads: Value,
    pub tube: Value,
}

/// Round half up to one decimal place.
pub fn round1(x: f64) -> f64 {
    (x * 10.0 + 0.5).floor() / 10.0
}

/// Non-empty string at `pointer`. A mistyped field defaults on its own.
fn str_at<'a>(raw: &'a Value, pointer: &str) -> Option<&'a str> {
    raw.pointer(pointer).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn f64_at(raw: &Value, pointer: &str) -> Option<f64> {
    raw.pointer(pointer).and_then(Value::as_f64).filter(|v| v.is_finite())
}

pub fn weather_from(raw: &Value) -> Weather {
    let temp = f64_at(raw, "/main/temp")
        .filter(|t| *t != 0.0)
        .map(round1)
        .unwrap_or(0.0);
    let rain_mm = f64_at(raw, "/rain/1h").unwrap_or(0.0);
    let condition = str_at(raw, "/weather/0/description").unwrap_or("Unknown").to_string();
    Weather { temp, rain_mm, condition }
}

pub fn air_quality_from(raw: &Value) -> AirQuality {
    let value = f64_at(raw, "/list/0/main/aqi")
        .filter(|v| *v >= 1.0)
        .map(|v| v as u32)
        .unwrap_or(1);
    AirQuality { value, status: AqiStatus::from_index(value) }
}

/// Priority lines in response order, or the single "Network" placeholder.
pub fn tube_status_from(raw: &Value) -> Vec<TubeLine> {
    let lines: Vec<TubeLine> = raw
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|line| {
                    let name = line.get("name").and_then(Value::as_str)?;
                    if !PRIORITY_LINES.contains(&name) {
                        return None;
                    }
                    let status = str_at(line, "/lineStatuses/0/statusSeverityDescription").unwrap_or("Unknown");
                    Some(TubeLine::new(name, status))
                })
                .collect()
        })
        .unwrap_or_default();

    if lines.is_empty() {
        vec![TubeLine::new("Network", "Live Data Offline")]
    } else {
        lines
    }
}

/// 40 + 5 per road not reporting "Good", capped at 99. Non-array payloads give the baseline.
pub fn congestion_from(raw: &Value) -> u32 {
    match raw.as_array() {
        Some(roads) => {
            let degraded = roads
                .iter()
                .filter(|r| r.get("statusSeverity").and_then(Value::as_str) != Some("Good"))
                .count() as u32;
            40u32.saturating_add(degraded.saturating_mul(5)).min(99)
        }
        None => BASELINE_CONGESTION,
    }
}

pub fn transform_live(raw: &RawBundle) -> LondonData {
    LondonData {
        weather: weather_from(&raw.weather),
        aqi: air_quality_from(&raw.air_quality),
        traffic: Traffic {
            congestion_level: congestion_from(&raw.roads),
            tube_status: tube_status_from(&raw.tube),
        },
    }
}
