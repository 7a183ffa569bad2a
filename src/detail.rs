use std::collections::VecDeque;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::watch;
use tokio::time::Duration;

use crate::logging::{debug, obj, v_str, Domain};
use crate::market::MarketMetric;
use crate::nodes::SystemNode;
use crate::tasks::TaskSet;

/// Something on the dashboard that can be opened for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Node(SystemNode),
    Market(MarketMetric),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDetail {
    pub key: String,
    pub title: String,
    pub primary: String,
    pub secondary: String,
}

impl ItemDetail {
    pub fn of(item: &Selection) -> Self {
        match item {
            Selection::Node(n) => Self {
                key: format!("item-{}", n.id),
                title: n.name.clone(),
                primary: format!("{}% LOAD", trim_float(n.load)),
                secondary: format!("{}ms LATENCY", n.latency),
            },
            Selection::Market(m) => Self {
                key: format!("item-{}", m.ticker),
                title: m.ticker.clone(),
                primary: group_thousands(m.value),
                secondary: format!("{}%", trim_float(m.change)),
            },
        }
    }
}

fn trim_float(v: f64) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// `4250.32` -> `4,250.32`; up to three decimals, trailing zeros dropped.
pub fn group_thousands(v: f64) -> String {
    let fixed = trim_float(v.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (fixed.clone(), None),
    };
    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 && fixed != "0" { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

pub const HEX_BYTES_PER_LINE: usize = 12;
pub const HEX_LINES_KEPT: usize = 5;

/// Rolling decorative hex feed shown in the detail panel. Newest line first.
#[derive(Debug, Clone, Default)]
pub struct HexStream {
    lines: VecDeque<String>,
}

impl HexStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &str {
        let line = (0..HEX_BYTES_PER_LINE)
            .map(|_| format!("{:02X}", rng.gen_range(0..255u8)))
            .collect::<Vec<_>>()
            .join(" ");
        self.lines.push_front(line);
        self.lines.truncate(HEX_LINES_KEPT);
        &self.lines[0]
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

pub const HEX_TICK: Duration = Duration::from_millis(200);

/// An open detail panel. The hex feed ticks until the inspector is closed or dropped.
pub struct DetailInspector {
    detail: ItemDetail,
    hex: Arc<watch::Sender<Vec<String>>>,
    tasks: TaskSet,
}

impl DetailInspector {
    pub fn open(item: &Selection, mut rng: StdRng) -> Self {
        let detail = ItemDetail::of(item);
        let (tx, _rx) = watch::channel(Vec::new());
        let hex = Arc::new(tx);
        let tasks = TaskSet::new("detail");

        let feed = hex.clone();
        let mut stream = HexStream::new();
        tasks.every(HEX_TICK, move || {
            stream.push_random(&mut rng);
            feed.send_replace(stream.lines().map(str::to_string).collect());
            async {}
        });

        debug(Domain::App, "detail.open", obj(&[("key", v_str(&detail.key))]));
        Self { detail, hex, tasks }
    }

    pub fn detail(&self) -> &ItemDetail {
        &self.detail
    }

    pub fn hex_lines(&self) -> Vec<String> {
        self.hex.borrow().clone()
    }

    pub fn subscribe_hex(&self) -> watch::Receiver<Vec<String>> {
        self.hex.subscribe()
    }

    pub fn close(&self) {
        self.tasks.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::seed_market;
    use crate::nodes::seed_nodes;
    use rand::SeedableRng;

    #[test]
    fn test_node_detail() {
        let d = ItemDetail::of(&Selection::Node(seed_nodes()[0].clone()));
        assert_eq!(d.title, "Canary Wharf_Main");
        assert_eq!(d.primary, "45% LOAD");
        assert_eq!(d.secondary, "12ms LATENCY");
        assert_eq!(d.key, "item-1");
    }

    #[test]
    fn test_market_detail() {
        let d = ItemDetail::of(&Selection::Market(seed_market()[0].clone()));
        assert_eq!(d.title, "UK_INFRA");
        assert_eq!(d.primary, "4,250.32");
        assert_eq!(d.secondary, "1.2%");

        let d = ItemDetail::of(&Selection::Market(seed_market()[4].clone()));
        assert_eq!(d.secondary, "-1.5%");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(5600.0), "5,600");
        assert_eq!(group_thousands(125.44), "125.44");
        assert_eq!(group_thousands(1234567.891), "1,234,567.891");
        assert_eq!(group_thousands(-9876.5), "-9,876.5");
        assert_eq!(group_thousands(0.0), "0");
    }

    #[test]
    fn test_hex_stream_keeps_newest_five() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut stream = HexStream::new();
        let mut last = String::new();
        for _ in 0..8 {
            last = stream.push_random(&mut rng).to_string();
        }
        assert_eq!(stream.len(), HEX_LINES_KEPT);
        assert_eq!(stream.lines().next().unwrap(), last);
        for line in stream.lines() {
            let bytes: Vec<&str> = line.split(' ').collect();
            assert_eq!(bytes.len(), HEX_BYTES_PER_LINE);
            assert!(bytes.iter().all(|b| b.len() == 2 && b.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase())));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_inspector_feed_ticks_until_closed() {
        let item = Selection::Node(seed_nodes()[1].clone());
        let inspector = DetailInspector::open(&item, StdRng::seed_from_u64(9));
        assert_eq!(inspector.detail().title, "The_Shard_Relay");
        assert!(inspector.hex_lines().is_empty());

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(inspector.hex_lines().len(), 2);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(inspector.hex_lines().len(), HEX_LINES_KEPT);

        inspector.close();
        let before = inspector.hex_lines();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(inspector.hex_lines(), before);
    }
}
