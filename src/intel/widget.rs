use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::Duration;

use super::fetch::fetch_london_data;
use super::types::{FallbackReason, IntelReading, LondonData};
use super::upstream::Upstream;
use crate::config::Credentials;
use crate::logging::{debug, obj, v_num, v_str, Domain};
use crate::tasks::TaskSet;

/// What the London widget renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntelSnapshot {
    pub data: Option<LondonData>,
    pub fallback: Option<FallbackReason>,
    pub last_updated: Option<DateTime<Utc>>,
    pub loading: bool,
    pub cycles: u64,
}

impl IntelSnapshot {
    pub fn is_live(&self) -> bool {
        self.data.is_some() && self.fallback.is_none()
    }
}

/// Runs one cycle and publishes it. The record is swapped in a single send.
pub async fn refresh_once<R: Rng + Send + ?Sized>(
    state: &watch::Sender<IntelSnapshot>,
    creds: Option<&Credentials>,
    upstream: &dyn Upstream,
    rng: &mut R,
) {
    state.send_modify(|s| s.loading = true);
    let reading = fetch_london_data(creds, upstream, rng).await;
    let fallback = match &reading {
        IntelReading::Live(_) => None,
        IntelReading::Simulated { reason, .. } => Some(*reason),
    };
    let data = reading.into_data();
    let congestion = data.traffic.congestion_level;

    state.send_modify(|s| {
        s.data = Some(data);
        s.fallback = fallback;
        s.last_updated = Some(Utc::now());
        s.loading = false;
        s.cycles += 1;
    });

    debug(
        Domain::Intel,
        "refresh.published",
        obj(&[
            ("source", v_str(fallback.map(|r| r.as_str()).unwrap_or("live"))),
            ("congestion", v_num(congestion as f64)),
        ]),
    );
}

/// Periodic refresh: once on activation, then every `period`.
pub struct IntelWidget {
    state: Arc<watch::Sender<IntelSnapshot>>,
    tasks: TaskSet,
}

impl IntelWidget {
    pub fn activate(
        period: Duration,
        creds: Option<Credentials>,
        upstream: Arc<dyn Upstream>,
        mut rng: StdRng,
    ) -> Self {
        let (tx, _rx) = watch::channel(IntelSnapshot::default());
        let state = Arc::new(tx);
        let tasks = TaskSet::new("intel");

        let tx = state.clone();
        let creds = creds.map(Arc::new);
        tasks.every_now(period, move || {
            let tx = tx.clone();
            let creds = creds.clone();
            let upstream = upstream.clone();
            let mut cycle_rng = StdRng::seed_from_u64(rng.gen());
            async move {
                refresh_once(&tx, creds.as_deref(), upstream.as_ref(), &mut cycle_rng).await;
            }
        });

        Self { state, tasks }
    }

    pub fn subscribe(&self) -> watch::Receiver<IntelSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> IntelSnapshot {
        self.state.borrow().clone()
    }

    /// Stops refreshing. A fetch cut off mid-flight is dropped and `loading` is cleared.
    pub fn deactivate(&self) {
        self.tasks.shutdown();
        self.state.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
    }
}
