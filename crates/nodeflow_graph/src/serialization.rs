// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural save and restore of a graph.
//!
//! A [`GraphSnapshot`] carries everything needed to rebuild a graph through a
//! [`NodeRegistry`]: counters, links, configuration, globals and one
//! [`NodeSnapshot`] per node. Transient data written during ticks (output
//! slot and link data) is never part of a snapshot.

use crate::globals::GlobalSlot;
use crate::graph::Graph;
use crate::link::{Link, LinkId};
use crate::node::{Node, NodeId, NodeMode};
use crate::registry::NodeRegistry;
use crate::slot::{InputSlot, OutputSlot};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Error reading or writing a snapshot
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON parsing failed
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON serialization failed
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),
}

/// Persisted state of one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Node ID
    pub id: NodeId,
    /// Type ID, resolved through the registry on restore
    #[serde(rename = "type")]
    pub node_type: String,
    /// Display title
    pub title: String,
    /// Execution mode
    #[serde(default)]
    pub mode: NodeMode,
    /// Position in the execution order when saved
    #[serde(default)]
    pub order: usize,
    /// Input slots with their links
    #[serde(default)]
    pub inputs: Vec<InputSlot>,
    /// Output slots with their links
    #[serde(default)]
    pub outputs: Vec<OutputSlot>,
    /// Properties
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
    /// Whether the node may be removed
    #[serde(default = "default_removable")]
    pub removable: bool,
}

fn default_removable() -> bool {
    true
}

impl NodeSnapshot {
    fn capture(id: NodeId, node: &Node) -> Self {
        Self {
            id,
            node_type: node.node_type.clone(),
            title: node.title.clone(),
            mode: node.mode,
            order: node.order,
            inputs: node.inputs.clone(),
            outputs: node
                .outputs
                .iter()
                .map(|output| OutputSlot { data: None, ..output.clone() })
                .collect(),
            properties: node.properties.clone(),
            removable: node.removable,
        }
    }

    fn restore_into(&self, node: &mut Node) {
        node.title.clone_from(&self.title);
        node.mode = self.mode;
        node.order = self.order;
        // Hand-written snapshots may omit slots; keep the type's defaults then
        if !self.inputs.is_empty() {
            node.inputs.clone_from(&self.inputs);
        }
        if !self.outputs.is_empty() {
            node.outputs.clone_from(&self.outputs);
        }
        for (name, value) in &self.properties {
            node.properties.insert(name.clone(), value.clone());
        }
        node.removable = self.removable;
    }
}

/// Persisted state of a graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Ticks run so far
    #[serde(default)]
    pub iteration: u64,
    /// Timer-driven ticks run so far
    #[serde(default)]
    pub frame: u64,
    /// Highest node ID ever assigned
    #[serde(default)]
    pub last_node_id: u32,
    /// Highest link ID ever assigned
    #[serde(default)]
    pub last_link_id: u32,
    /// Links by ID
    #[serde(default)]
    pub links: IndexMap<LinkId, Link>,
    /// Free-form configuration
    #[serde(default)]
    pub config: IndexMap<String, Value>,
    /// Global inputs
    #[serde(default)]
    pub globals_in: IndexMap<String, GlobalSlot>,
    /// Global outputs
    #[serde(default)]
    pub globals_out: IndexMap<String, GlobalSlot>,
    /// Nodes in registration order
    #[serde(default)]
    pub nodes: Vec<NodeSnapshot>,
}

impl GraphSnapshot {
    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON
    pub fn from_json(s: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, SnapshotError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Parse from RON
    pub fn from_ron(s: &str) -> Result<Self, SnapshotError> {
        Ok(ron::from_str(s)?)
    }
}

impl Graph {
    /// Capture the persistent state of the graph
    pub fn serialize(&self) -> GraphSnapshot {
        GraphSnapshot {
            iteration: self.iteration,
            frame: self.frame,
            last_node_id: self.last_node_id,
            last_link_id: self.last_link_id,
            links: self
                .links
                .iter()
                .map(|(id, link)| (*id, Link { data: None, ..link.clone() }))
                .collect(),
            config: self.config.clone(),
            globals_in: self.globals_in.clone(),
            globals_out: self.globals_out.clone(),
            nodes: self
                .nodes
                .iter()
                .map(|(id, node)| NodeSnapshot::capture(*id, node))
                .collect(),
        }
    }

    /// Restore the graph from a snapshot, creating nodes through `registry`.
    ///
    /// The graph is cleared first unless `keep_old` is set. Nodes keep their
    /// stored IDs so stored links resolve. A node whose type is not registered
    /// is skipped and its links are left dangling. The link counter is raised
    /// past every stored link ID. Returns true if any node or link could not
    /// be restored.
    pub fn configure(&mut self, snapshot: &GraphSnapshot, registry: &NodeRegistry, keep_old: bool) -> bool {
        if !keep_old {
            self.clear();
        }

        self.iteration = snapshot.iteration;
        self.frame = snapshot.frame;
        self.last_node_id = self.last_node_id.max(snapshot.last_node_id);
        self.last_link_id = self.last_link_id.max(snapshot.last_link_id);

        let mut had_error = false;
        for (id, link) in &snapshot.links {
            if self.links.contains_key(id) {
                tracing::warn!(link = %id, "Link ID already in use, skipping");
                had_error = true;
                continue;
            }
            self.last_link_id = self.last_link_id.max(id.0);
            self.links.insert(*id, Link { data: None, ..link.clone() });
        }
        for (name, value) in &snapshot.config {
            self.config.insert(name.clone(), value.clone());
        }
        for (name, slot) in &snapshot.globals_in {
            self.globals_in.insert(name.clone(), slot.clone());
        }
        for (name, slot) in &snapshot.globals_out {
            self.globals_out.insert(name.clone(), slot.clone());
        }

        for stored in &snapshot.nodes {
            let Some(node) = registry.create_node(&stored.node_type) else {
                tracing::warn!(node = %stored.id, node_type = %stored.node_type, "Node type not found, skipping");
                had_error = true;
                continue;
            };

            let id = match self.add(node.with_id(stored.id), true) {
                Ok(Some(id)) => id,
                Ok(None) => {
                    tracing::warn!(node = %stored.id, "Duplicate node ID in snapshot, skipping");
                    had_error = true;
                    continue;
                }
                Err(err) => {
                    tracing::warn!(node = %stored.id, "Cannot restore node: {}", err);
                    had_error = true;
                    continue;
                }
            };

            if let Some(node) = self.nodes.get_mut(&id) {
                stored.restore_into(node);
            }
            self.with_behavior(id, |behavior, ctx| behavior.on_configure(ctx, stored));
        }

        self.update_execution_order();
        self.mark_changed();
        tracing::debug!(
            nodes = self.nodes.len(),
            links = self.links.len(),
            had_error,
            "Graph configured"
        );
        had_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::register_basic_nodes;

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        register_basic_nodes(&mut registry);
        registry
    }

    /// const -> add -> watch, with add's second operand from another const
    fn sample(registry: &NodeRegistry) -> (Graph, [NodeId; 4]) {
        let mut graph = Graph::new("sample");
        let mut add = |type_id: &str, value: f32| {
            let node = registry.create_node(type_id).unwrap().with_property("value", value);
            graph.add(node, false).unwrap().unwrap()
        };
        let one = add("basic/const", 1.0);
        let two = add("basic/const", 2.0);
        let sum = add("math/add", 0.0);
        let watch = add("basic/watch", 0.0);
        graph.connect(one, 0, sum, 0).unwrap();
        graph.connect(two, 0, sum, 1).unwrap();
        graph.connect(sum, 0, watch, 0).unwrap();
        graph.config.insert("title".into(), Value::from("sample"));
        (graph, [one, two, sum, watch])
    }

    #[test]
    fn test_snapshot_excludes_transient_data() {
        let registry = registry();
        let (mut graph, _) = sample(&registry);
        graph.run_step(1).unwrap();
        assert!(graph.links().all(|link| link.data.is_some()));

        let snapshot = graph.serialize();
        assert!(snapshot.links.values().all(|link| link.data.is_none()));
        assert!(snapshot.nodes.iter().flat_map(|n| &n.outputs).all(|o| o.data.is_none()));
        assert_eq!(snapshot.iteration, 1);

        let json = snapshot.to_json().unwrap();
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn test_restore_keeps_ids_and_behaviour() {
        let registry = registry();
        let (mut graph, [one, two, sum, watch]) = sample(&registry);
        graph.remove(one);
        let one = graph
            .add(registry.create_node("basic/const").unwrap().with_property("value", 1.0), false)
            .unwrap()
            .unwrap();
        graph.connect(one, 0, sum, 0).unwrap();

        let text = graph.serialize().to_ron().unwrap();
        let snapshot = GraphSnapshot::from_ron(&text).unwrap();

        let mut restored = Graph::new("restored");
        assert!(!restored.configure(&snapshot, &registry, false));
        assert_eq!(restored.node_ids().collect::<Vec<_>>(), vec![two, sum, watch, one]);
        assert_eq!(restored.last_node_id(), graph.last_node_id());
        assert_eq!(restored.last_link_id(), graph.last_link_id());
        assert_eq!(restored.config.get("title"), Some(&Value::from("sample")));
        assert_eq!(restored.execution_order()[..2], [two, one]);

        restored.run_step(1).unwrap();
        assert_eq!(restored.node(watch).unwrap().property("value"), Some(&Value::Float(3.0)));

        // a node added after restore never reuses a stored id
        let next = restored.add(registry.create_node("basic/watch").unwrap(), false).unwrap().unwrap();
        assert!(next > one);
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let registry = registry();
        let (graph, [one, _, sum, _]) = sample(&registry);
        let mut snapshot = graph.serialize();
        snapshot.nodes[2].node_type = "math/unknown".into();

        let mut restored = Graph::new("partial");
        assert!(restored.configure(&snapshot, &registry, false));
        assert_eq!(restored.node_count(), 3);
        assert!(restored.node(sum).is_none());
        // dangling links are kept and tolerated
        assert_eq!(restored.link_count(), 3);
        assert_eq!(restored.execution_order().len(), 3);
        assert!(restored.run_step(2).is_ok());
        assert!(restored.node(one).unwrap().output_data(0).is_some());
    }

    #[test]
    fn test_keep_old_merges_into_existing_graph() {
        let registry = registry();
        let mut graph = Graph::new("base");
        graph.add(registry.create_node("basic/const").unwrap().with_id(NodeId(50)), false).unwrap();

        let snapshot = GraphSnapshot::from_json(
            r#"{
                "last_node_id": 3,
                "nodes": [ { "id": 3, "type": "basic/watch", "title": "seen" } ]
            }"#,
        )
        .unwrap();
        assert!(!graph.configure(&snapshot, &registry, true));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.last_node_id(), 50);
        assert_eq!(graph.node(NodeId(3)).unwrap().title, "seen");
    }

    #[test]
    fn test_link_counter_covers_restored_links() {
        let registry = registry();
        let (graph, [one, _, sum, watch]) = sample(&registry);
        let mut snapshot = graph.serialize();
        snapshot.last_link_id = 0;

        let mut restored = Graph::new("stale counter");
        assert!(!restored.configure(&snapshot, &registry, false));
        assert_eq!(restored.last_link_id(), graph.last_link_id());

        let stored = restored.node(sum).unwrap().inputs[0].link;
        restored.disconnect_input(watch, 0);
        let fresh = restored.connect(one, 0, watch, 0).unwrap();
        assert!(snapshot.links.keys().all(|id| *id != fresh));
        assert_eq!(restored.node(sum).unwrap().inputs[0].link, stored);
        assert_eq!(restored.link(stored.unwrap()).unwrap().target_id, sum);
    }

    #[test]
    fn test_keep_old_skips_colliding_links() {
        let registry = registry();
        let (mut graph, [one, two, sum, _]) = sample(&registry);
        let endpoints = |graph: &Graph| {
            graph
                .links()
                .map(|link| (link.id, link.origin_id, link.target_id, link.target_slot))
                .collect::<Vec<_>>()
        };
        let live = endpoints(&graph);

        let snapshot = GraphSnapshot::from_json(&format!(
            r#"{{
                "links": {{ "1": {{ "id": 1, "origin_id": {two}, "origin_slot": 0,
                                    "target_id": {one}, "target_slot": 0, "type": "number" }} }}
            }}"#,
            two = two.0,
            one = one.0,
        ))
        .unwrap();
        assert!(graph.configure(&snapshot, &registry, true));
        assert_eq!(endpoints(&graph), live);
        assert_eq!(graph.link(LinkId(1)).unwrap().target_id, sum);
    }
}
