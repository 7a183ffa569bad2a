use rand::Rng;

use super::transform::round1;
use super::types::{AirQuality, AqiStatus, LondonData, Traffic, TubeLine, Weather};

/// Plausible London snapshot. Same shape as the live transform output.
pub fn generate_mock<R: Rng + ?Sized>(rng: &mut R) -> LondonData {
    let rain_mm = if rng.gen_bool(0.5) {
        round1(rng.gen_range(0.0..2.0))
    } else {
        0.0
    };
    let aqi_value = rng.gen_range(2..=4u32);
    let central = if rng.gen_bool(0.2) { "Minor Delays" } else { "Good Service" };

    LondonData {
        weather: Weather {
            temp: 11.2,
            rain_mm,
            condition: "Overcast & Mist".to_string(),
        },
        aqi: AirQuality {
            value: aqi_value,
            status: AqiStatus::from_index(aqi_value),
        },
        traffic: Traffic {
            congestion_level: rng.gen_range(40..70),
            tube_status: vec![
                TubeLine::new("Northern", "Good Service"),
                TubeLine::new("Central", central),
                TubeLine::new("Jubilee", "Good Service"),
            ],
        },
    }
}

/// True when `data` has the structure `generate_mock` produces.
pub fn has_mock_shape(data: &LondonData) -> bool {
    let lines: Vec<&str> = data.traffic.tube_status.iter().map(|t| t.line.as_str()).collect();
    data.weather.condition == "Overcast & Mist"
        && data.weather.temp == 11.2
        && (0.0..=2.0).contains(&data.weather.rain_mm)
        && (2..=4).contains(&data.aqi.value)
        && data.aqi.status == AqiStatus::from_index(data.aqi.value)
        && (40..70).contains(&data.traffic.congestion_level)
        && lines == ["Northern", "Central", "Jubilee"]
}
