use rand::Rng;

use super::mock::generate_mock;
use super::transform::{transform_live, RawBundle};
use super::types::{FallbackReason, IntelReading};
use super::upstream::{Endpoint, Upstream, UpstreamError};
use crate::config::Credentials;
use crate::logging::{info, obj, v_str, warn, Domain};

/// One acquisition cycle.
///
/// Without a full credential set the network is never touched. With one,
/// all four endpoints are requested concurrently; any failure discards the
/// whole cycle and the result is simulated.
pub async fn fetch_london_data<R: Rng + Send + ?Sized>(
    creds: Option<&Credentials>,
    upstream: &dyn Upstream,
    rng: &mut R,
) -> IntelReading {
    let Some(creds) = creds else {
        warn(
            Domain::Intel,
            "simulation_mode",
            obj(&[("reason", v_str(FallbackReason::MissingCredentials.as_str()))]),
        );
        return IntelReading::Simulated {
            data: generate_mock(rng),
            reason: FallbackReason::MissingCredentials,
        };
    };

    match fetch_all(creds, upstream).await {
        Ok(raw) => {
            info(Domain::Intel, "uplink.ok", obj(&[]));
            IntelReading::Live(transform_live(&raw))
        }
        Err(e) => {
            let reason = match e {
                UpstreamError::Status { .. } => FallbackReason::UpstreamStatus,
                UpstreamError::Transport { .. } | UpstreamError::Url(_) => FallbackReason::Transport,
            };
            warn(
                Domain::Intel,
                "uplink.failed",
                obj(&[("reason", v_str(reason.as_str())), ("msg", v_str(&e.to_string()))]),
            );
            IntelReading::Simulated {
                data: generate_mock(rng),
                reason,
            }
        }
    }
}

async fn fetch_all(creds: &Credentials, upstream: &dyn Upstream) -> Result<RawBundle, UpstreamError> {
    let (weather, air_quality, roads, tube) = tokio::try_join!(
        upstream.get_json(Endpoint::Weather, creds),
        upstream.get_json(Endpoint::AirQuality, creds),
        upstream.get_json(Endpoint::RoadStatus, creds),
        upstream.get_json(Endpoint::TubeStatus, creds),
    )?;
    Ok(RawBundle {
        weather,
        air_quality,
        roads,
        tube,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intel::mock::has_mock_shape;
    use crate::intel::types::AqiStatus;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned JSON per endpoint; the `failing` endpoint answers 503.
    struct Scripted {
        calls: AtomicUsize,
        failing: Option<Endpoint>,
    }

    impl Scripted {
        fn ok() -> Self {
            Self { calls: AtomicUsize::new(0), failing: None }
        }

        fn failing(endpoint: Endpoint) -> Self {
            Self { calls: AtomicUsize::new(0), failing: Some(endpoint) }
        }
    }

    #[async_trait]
    impl Upstream for Scripted {
        async fn get_json(&self, endpoint: Endpoint, _creds: &Credentials) -> Result<Value, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing == Some(endpoint) {
                return Err(UpstreamError::Status { endpoint, status: 503 });
            }
            Ok(match endpoint {
                Endpoint::Weather => json!({"main": {"temp": 14.06}, "weather": [{"description": "clear sky"}]}),
                Endpoint::AirQuality => json!({"list": [{"main": {"aqi": 5}}]}),
                Endpoint::RoadStatus => json!([{"statusSeverity": "Good"}, {"statusSeverity": "Serious"}]),
                Endpoint::TubeStatus => json!([{"name": "Central", "lineStatuses": [{"statusSeverityDescription": "Severe Delays"}]}]),
            })
        }
    }

    fn creds() -> Credentials {
        Credentials::from_parts(Some("a"), Some("b"), Some("c")).unwrap()
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_network() {
        let up = Scripted::ok();
        let mut rng = StdRng::seed_from_u64(1);
        let reading = fetch_london_data(None, &up, &mut rng).await;
        assert_eq!(up.calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            reading,
            IntelReading::Simulated { reason: FallbackReason::MissingCredentials, .. }
        ));
        assert!(has_mock_shape(reading.data()));
    }

    #[tokio::test]
    async fn test_all_ok_is_live() {
        let up = Scripted::ok();
        let mut rng = StdRng::seed_from_u64(1);
        let reading = fetch_london_data(Some(&creds()), &up, &mut rng).await;
        assert!(reading.is_live());
        let data = reading.data();
        assert_eq!(data.weather.temp, 14.1);
        assert_eq!(data.aqi.status, AqiStatus::Poor);
        assert_eq!(data.traffic.congestion_level, 45);
        assert_eq!(data.traffic.tube_status[0].status, "Severe Delays");
        assert_eq!(up.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_any_failure_falls_back_wholesale() {
        for endpoint in Endpoint::ALL {
            let up = Scripted::failing(endpoint);
            let mut rng = StdRng::seed_from_u64(9);
            let reading = fetch_london_data(Some(&creds()), &up, &mut rng).await;
            match &reading {
                IntelReading::Simulated { reason, data } => {
                    assert_eq!(*reason, FallbackReason::UpstreamStatus);
                    assert!(has_mock_shape(data), "partial merge for {:?}: {:?}", endpoint, data);
                }
                IntelReading::Live(_) => panic!("{:?} failure produced live data", endpoint),
            }
        }
    }
}
