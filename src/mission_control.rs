//! The operator dashboard once the vault opens: node grid, market board,
//! London intel, the detail inspector and bid sessions.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;

use crate::bid::BidSession;
use crate::config::Config;
use crate::detail::{DetailInspector, ItemDetail, Selection};
use crate::intel::{IntelSnapshot, IntelWidget, Upstream};
use crate::logging::{debug, info, obj, v_num, v_str, Domain};
use crate::market::{seed_market, MarketMetric};
use crate::nodes::{seed_nodes, tick_nodes, SystemNode};
use crate::receipt::ReceiptIssuer;
use crate::tasks::TaskSet;

pub struct MissionControl {
    cfg: Config,
    nodes: Arc<watch::Sender<Vec<SystemNode>>>,
    market: Vec<MarketMetric>,
    intel: IntelWidget,
    inspector: Mutex<Option<DetailInspector>>,
    issuer: Arc<ReceiptIssuer>,
    rng: Mutex<StdRng>,
    tasks: TaskSet,
}

impl MissionControl {
    /// Starts the node ticker and the intel refresh loop.
    pub fn mount(cfg: &Config, upstream: Arc<dyn Upstream>, issuer: Arc<ReceiptIssuer>, mut rng: StdRng) -> Self {
        let (tx, _rx) = watch::channel(seed_nodes());
        let nodes = Arc::new(tx);
        let tasks = TaskSet::new("mission_control");

        let node_tx = nodes.clone();
        let mut node_rng = StdRng::seed_from_u64(rng.gen());
        tasks.every(cfg.node_tick(), move || {
            let next = tick_nodes(&node_tx.borrow(), &mut node_rng);
            let mean_load = next.iter().map(|n| n.load).sum::<f64>() / next.len().max(1) as f64;
            node_tx.send_replace(next);
            debug(Domain::Nodes, "nodes.tick", obj(&[("mean_load", v_num(mean_load))]));
            async {}
        });

        let intel = IntelWidget::activate(
            cfg.intel_refresh(),
            cfg.credentials(),
            upstream,
            StdRng::seed_from_u64(rng.gen()),
        );

        info(
            Domain::App,
            "mission_control.mount",
            obj(&[
                ("node_tick_ms", v_num(cfg.node_tick().as_millis() as f64)),
                ("intel_refresh_ms", v_num(cfg.intel_refresh().as_millis() as f64)),
                ("intel_mode", v_str(if cfg.credentials().is_some() { "live" } else { "simulated" })),
            ]),
        );

        Self {
            cfg: cfg.clone(),
            nodes,
            market: seed_market(),
            intel,
            inspector: Mutex::new(None),
            issuer,
            rng: Mutex::new(rng),
            tasks,
        }
    }

    pub fn nodes(&self) -> Vec<SystemNode> {
        self.nodes.borrow().clone()
    }

    pub fn subscribe_nodes(&self) -> watch::Receiver<Vec<SystemNode>> {
        self.nodes.subscribe()
    }

    pub fn market(&self) -> &[MarketMetric] {
        &self.market
    }

    pub fn intel(&self) -> IntelSnapshot {
        self.intel.snapshot()
    }

    pub fn subscribe_intel(&self) -> watch::Receiver<IntelSnapshot> {
        self.intel.subscribe()
    }

    fn child_rng(&self) -> Result<StdRng> {
        let mut rng = self.rng.lock().map_err(|_| anyhow!("rng lock poisoned"))?;
        Ok(StdRng::seed_from_u64(rng.gen()))
    }

    /// Opens the inspector on `item`, replacing any open one.
    pub fn select(&self, item: Selection) -> Result<ItemDetail> {
        let inspector = DetailInspector::open(&item, self.child_rng()?);
        let detail = inspector.detail().clone();
        let mut slot = self.inspector.lock().map_err(|_| anyhow!("inspector lock poisoned"))?;
        if let Some(previous) = slot.replace(inspector) {
            previous.close();
        }
        Ok(detail)
    }

    /// Selects by node id against the current (ticking) node values.
    pub fn select_node(&self, id: &str) -> Result<ItemDetail> {
        let node = self
            .nodes()
            .into_iter()
            .find(|n| n.id == id)
            .ok_or_else(|| anyhow!("unknown node {}", id))?;
        self.select(Selection::Node(node))
    }

    pub fn select_market(&self, ticker: &str) -> Result<ItemDetail> {
        let metric = self
            .market
            .iter()
            .find(|m| m.ticker == ticker)
            .cloned()
            .ok_or_else(|| anyhow!("unknown ticker {}", ticker))?;
        self.select(Selection::Market(metric))
    }

    pub fn selected(&self) -> Option<ItemDetail> {
        self.inspector
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|i| i.detail().clone()))
    }

    pub fn hex_lines(&self) -> Vec<String> {
        self.inspector
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|i| i.hex_lines()))
            .unwrap_or_default()
    }

    pub fn clear_selection(&self) {
        if let Ok(mut slot) = self.inspector.lock() {
            if let Some(inspector) = slot.take() {
                inspector.close();
            }
        }
    }

    pub fn open_bid(&self) -> Result<BidSession> {
        info(Domain::Bid, "bid.open", obj(&[]));
        Ok(BidSession::from_config(&self.cfg, self.issuer.clone(), self.child_rng()?))
    }

    /// Stops every ticker owned by the dashboard. Published state stays as last written.
    pub fn unmount(&self) {
        self.tasks.shutdown();
        self.intel.deactivate();
        self.clear_selection();
        info(Domain::App, "mission_control.unmount", obj(&[]));
    }
}
