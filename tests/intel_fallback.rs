//! Live intel acquisition against a local stand-in for OpenWeather and TfL.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bidsmith::config::{Config, Credentials};
use bidsmith::intel::mock::has_mock_shape;
use bidsmith::intel::{fetch_london_data, AqiStatus, FallbackReason, HttpUpstream, IntelReading};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const WEATHER: &str = r#"{"main":{"temp":9.96},"rain":{"1h":0.34},"weather":[{"description":"light rain"}]}"#;
const AIR: &str = r#"{"list":[{"main":{"aqi":3}}]}"#;
const ROADS: &str = r#"[{"statusSeverity":"Good"},{"statusSeverity":"Serious"},{"statusSeverity":"Closure"},{"statusSeverity":"Good"}]"#;
const TUBE: &str = r#"[
    {"name":"Jubilee","lineStatuses":[{"statusSeverityDescription":"Good Service"}]},
    {"name":"Victoria","lineStatuses":[{"statusSeverityDescription":"Part Suspended"}]},
    {"name":"Northern","lineStatuses":[{"statusSeverityDescription":"Minor Delays"}]}
]"#;

/// Path -> (status, body). Every request line is recorded.
struct Stub {
    routes: HashMap<&'static str, (u16, &'static str)>,
    seen: Mutex<Vec<String>>,
}

impl Stub {
    fn healthy() -> Self {
        let mut routes = HashMap::new();
        routes.insert("/data/2.5/weather", (200, WEATHER));
        routes.insert("/data/2.5/air_pollution", (200, AIR));
        routes.insert("/Road/All/Status", (200, ROADS));
        routes.insert("/Line/Mode/tube/Status", (200, TUBE));
        Self { routes, seen: Mutex::new(Vec::new()) }
    }

    fn with(mut self, path: &'static str, status: u16, body: &'static str) -> Self {
        self.routes.insert(path, (status, body));
        self
    }
}

async fn serve(stub: Arc<Stub>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else { break };
            let stub = stub.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match sock.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf).into_owned();
                let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                stub.seen.lock().unwrap().push(target.clone());

                let path = target.split('?').next().unwrap_or("/");
                let (status, body) = stub.routes.get(path).copied().unwrap_or((404, "{}"));
                let resp = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    addr
}

fn upstream_at(addr: SocketAddr) -> HttpUpstream {
    let cfg = Config {
        openweather_base: format!("http://{}", addr),
        tfl_base: format!("http://{}", addr),
        http_timeout_secs: 5,
        ..Config::default()
    };
    HttpUpstream::new(&cfg).unwrap()
}

fn creds() -> Credentials {
    Credentials::from_parts(Some("tfl-id"), Some("tfl-key"), Some("ow-key")).unwrap()
}

#[tokio::test]
async fn live_when_all_four_answer() {
    let stub = Arc::new(Stub::healthy());
    let addr = serve(stub.clone()).await;
    let up = upstream_at(addr);

    let reading = fetch_london_data(Some(&creds()), &up, &mut StdRng::seed_from_u64(1)).await;
    let data = match reading {
        IntelReading::Live(data) => data,
        other => panic!("expected live data, got {:?}", other),
    };
    assert_eq!(data.weather.temp, 10.0);
    assert_eq!(data.weather.rain_mm, 0.34);
    assert_eq!(data.weather.condition, "light rain");
    assert_eq!(data.aqi.value, 3);
    assert_eq!(data.aqi.status, AqiStatus::Fair);
    assert_eq!(data.traffic.congestion_level, 50);
    let lines: Vec<(&str, &str)> = data
        .traffic
        .tube_status
        .iter()
        .map(|t| (t.line.as_str(), t.status.as_str()))
        .collect();
    assert_eq!(lines, vec![("Jubilee", "Good Service"), ("Northern", "Minor Delays")]);

    let seen = stub.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 4);
    assert!(seen.iter().any(|t| t.starts_with("/data/2.5/weather?") && t.contains("appid=ow-key") && t.contains("units=metric")));
    assert!(seen.iter().any(|t| t.starts_with("/data/2.5/air_pollution?lat=51.5074&lon=-0.1278")));
    assert!(seen.iter().any(|t| t.starts_with("/Road/All/Status?app_id=tfl-id&app_key=tfl-key")));
    assert!(seen.iter().any(|t| t.starts_with("/Line/Mode/tube/Status?")));
}

#[tokio::test]
async fn one_failed_status_discards_the_rest() {
    let stub = Arc::new(Stub::healthy().with("/Line/Mode/tube/Status", 500, r#"{"message":"boom"}"#));
    let addr = serve(stub).await;
    let up = upstream_at(addr);

    let reading = fetch_london_data(Some(&creds()), &up, &mut StdRng::seed_from_u64(2)).await;
    match reading {
        IntelReading::Simulated { data, reason } => {
            assert_eq!(reason, FallbackReason::UpstreamStatus);
            assert!(has_mock_shape(&data));
            assert_ne!(data.weather.condition, "light rain");
        }
        IntelReading::Live(_) => panic!("partial failure produced live data"),
    }
}

#[tokio::test]
async fn unparseable_body_is_a_transport_fallback() {
    let stub = Arc::new(Stub::healthy().with("/data/2.5/air_pollution", 200, "not json"));
    let addr = serve(stub).await;
    let up = upstream_at(addr);

    let reading = fetch_london_data(Some(&creds()), &up, &mut StdRng::seed_from_u64(3)).await;
    assert!(matches!(reading, IntelReading::Simulated { reason: FallbackReason::Transport, .. }));
    assert!(has_mock_shape(reading.data()));
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_fallback() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let up = upstream_at(addr);

    let reading = fetch_london_data(Some(&creds()), &up, &mut StdRng::seed_from_u64(4)).await;
    assert!(matches!(reading, IntelReading::Simulated { reason: FallbackReason::Transport, .. }));
}

#[tokio::test]
async fn partial_credentials_never_touch_the_network() {
    let stub = Arc::new(Stub::healthy());
    let addr = serve(stub.clone()).await;
    let up = upstream_at(addr);

    let cfg = Config {
        tfl_app_id: Some("tfl-id".to_string()),
        tfl_app_key: Some("tfl-key".to_string()),
        openweather_key: Some("   ".to_string()),
        ..Config::default()
    };
    let reading = fetch_london_data(cfg.credentials().as_ref(), &up, &mut StdRng::seed_from_u64(5)).await;
    assert!(matches!(reading, IntelReading::Simulated { reason: FallbackReason::MissingCredentials, .. }));
    assert!(stub.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stalled_provider_times_out_as_transport() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });
    let cfg = Config {
        openweather_base: format!("http://{}", addr),
        tfl_base: format!("http://{}", addr),
        http_timeout_secs: 1,
        ..Config::default()
    };
    let up = HttpUpstream::new(&cfg).unwrap();

    let started = std::time::Instant::now();
    let reading = fetch_london_data(Some(&creds()), &up, &mut StdRng::seed_from_u64(6)).await;
    assert!(matches!(reading, IntelReading::Simulated { reason: FallbackReason::Transport, .. }));
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}
