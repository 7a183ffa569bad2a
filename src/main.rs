use std::sync::Arc;

use anyhow::{anyhow, Result};
use bidsmith::bid::{BidStep, PaymentForm, Point, Signature};
use bidsmith::config::Config;
use bidsmith::controller::AppController;
use bidsmith::intel::HttpUpstream;
use bidsmith::logging::{error, info, obj, v_num, v_str, Domain};
use bidsmith::mission_control::MissionControl;
use bidsmith::receipt::ReceiptIssuer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::{sleep, Duration};

/// Walks one bid through payment, signature and ratification.
async fn demo_bid(mc: &MissionControl) -> Result<()> {
    let bid = mc.open_bid()?;
    let mut rx = bid.subscribe();

    bid.submit_payment(PaymentForm::new("Demo Agent", "4242 4242 4242 4242", "12/30", "123"))?;
    while *rx.borrow_and_update() != BidStep::Signing {
        rx.changed().await?;
    }

    let mut sig = Signature::new(300.0, 150.0);
    sig.begin_stroke(Point::new(20.0, 110.0));
    for (x, y) in [(60.0, 40.0), (110.0, 120.0), (160.0, 35.0), (210.0, 115.0), (270.0, 60.0)] {
        sig.extend(Point::new(x, y));
    }
    let receipt_id = bid.finalize(sig)?;

    loop {
        match &*rx.borrow_and_update() {
            BidStep::Success { .. } => break,
            BidStep::Signing => return Err(anyhow!("ratification of {} failed", receipt_id)),
            _ => {}
        }
        rx.changed().await?;
    }
    info(Domain::Bid, "demo.ratified", obj(&[("receipt_id", v_str(receipt_id.as_str()))]));
    bid.close()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let rng = match cfg.sim_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let issuer = Arc::new(ReceiptIssuer::open(&cfg.receipt_dir, &cfg.ledger_path)?);
    let upstream = Arc::new(HttpUpstream::new(&cfg)?);

    info(
        Domain::App,
        "app.start",
        obj(&[
            ("intel_mode", v_str(if cfg.credentials().is_some() { "live" } else { "simulated" })),
            ("receipt_dir", v_str(&cfg.receipt_dir.to_string_lossy())),
            ("transition_ms", v_num(cfg.transition_ms as f64)),
        ]),
    );

    let app = AppController::new(cfg.clone(), upstream, issuer, rng);
    let mut state_rx = app.subscribe();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            info(Domain::App, "app.state", obj(&[("state", v_str(state.as_str()))]));
        }
    });

    app.initialize()?;
    let mc = app
        .wait_for_mission_control()
        .await
        .ok_or_else(|| anyhow!("mission control never mounted"))?;

    let mut intel_rx = mc.subscribe_intel();
    tokio::spawn(async move {
        while intel_rx.changed().await.is_ok() {
            let snap = intel_rx.borrow_and_update().clone();
            if snap.loading {
                continue;
            }
            if let Some(data) = snap.data {
                info(
                    Domain::Intel,
                    "intel.snapshot",
                    obj(&[
                        ("live", serde_json::json!(snap.fallback.is_none())),
                        ("temp", v_num(data.weather.temp)),
                        ("aqi", v_num(data.aqi.value as f64)),
                        ("congestion", v_num(data.traffic.congestion_level as f64)),
                    ]),
                );
            }
        }
    });

    if cfg.demo_bid {
        if let Err(e) = demo_bid(&mc).await {
            error(Domain::Bid, "demo.failed", obj(&[("msg", v_str(&format!("{:#}", e)))]));
        }
    }

    match cfg.run_secs {
        Some(secs) => sleep(Duration::from_secs(secs)).await,
        None => {
            tokio::signal::ctrl_c().await?;
        }
    }

    app.shutdown();
    info(Domain::App, "app.stop", obj(&[]));
    Ok(())
}
