use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Active,
    Warning,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemNode {
    pub id: String,
    pub name: String,
    pub status: NodeStatus,
    /// Milliseconds.
    pub latency: u32,
    /// Percent, 0..=100.
    pub load: f64,
}

impl SystemNode {
    pub fn new(id: &str, name: &str, status: NodeStatus, latency: u32, load: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            status,
            latency,
            load,
        }
    }
}

pub fn seed_nodes() -> Vec<SystemNode> {
    vec![
        SystemNode::new("1", "Canary Wharf_Main", NodeStatus::Active, 12, 45.0),
        SystemNode::new("2", "The_Shard_Relay", NodeStatus::Active, 8, 78.0),
        SystemNode::new("3", "Gherkin_Backup", NodeStatus::Warning, 124, 92.0),
        SystemNode::new("4", "Heathrow_Link_A", NodeStatus::Active, 22, 34.0),
        SystemNode::new("5", "Westminster_Secure", NodeStatus::Active, 5, 12.0),
        SystemNode::new("6", "Grid_North_London", NodeStatus::Offline, 0, 0.0),
    ]
}

/// Next value of a single node. Depends only on the node and fresh randomness.
pub fn tick_node<R: Rng + ?Sized>(node: &SystemNode, rng: &mut R) -> SystemNode {
    let (load, latency) = match node.status {
        NodeStatus::Offline => (0.0, 0),
        _ => {
            let load = (node.load + rng.gen_range(-5.0..=5.0)).clamp(0.0, 100.0);
            let latency = (node.latency as i64 + rng.gen_range(-5..=5)).max(1) as u32;
            (load, latency)
        }
    };
    SystemNode {
        load,
        latency,
        ..node.clone()
    }
}

pub fn tick_nodes<R: Rng + ?Sized>(nodes: &[SystemNode], rng: &mut R) -> Vec<SystemNode> {
    nodes.iter().map(|n| tick_node(n, rng)).collect()
}
