// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and links.

use crate::error::GraphError;
use crate::evaluation::{NodeBehavior, NodeContext};
use crate::globals::GlobalSlot;
use crate::link::{Link, LinkId};
use crate::node::{Node, NodeId};
use crate::observer::GraphObserver;
use crate::scheduler::Clock;
use crate::settings::Settings;
use crate::slot::{SlotDirection, SlotType};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// A node graph
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in registration order
    pub(crate) nodes: IndexMap<NodeId, Node>,
    /// Links between nodes
    pub(crate) links: IndexMap<LinkId, Link>,
    pub(crate) globals_in: IndexMap<String, GlobalSlot>,
    pub(crate) globals_out: IndexMap<String, GlobalSlot>,
    /// Free-form configuration, persisted with the graph
    pub config: IndexMap<String, Value>,
    pub(crate) last_node_id: u32,
    pub(crate) last_link_id: u32,
    pub(crate) iteration: u64,
    pub(crate) frame: u64,
    pub(crate) order_list: Vec<NodeId>,
    pub(crate) order_stale: bool,
    pub(crate) clock: Clock,
    version: u64,
    settings: Settings,
    observers: Vec<Rc<dyn GraphObserver>>,
}

impl Graph {
    /// Create a new empty graph with default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, Settings::default())
    }

    /// Create a new empty graph
    pub fn with_settings(name: impl Into<String>, settings: Settings) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            links: IndexMap::new(),
            globals_in: IndexMap::new(),
            globals_out: IndexMap::new(),
            config: IndexMap::new(),
            last_node_id: 0,
            last_link_id: 0,
            iteration: 0,
            frame: 0,
            order_list: Vec::new(),
            order_stale: false,
            clock: Clock::default(),
            version: 0,
            settings,
            observers: Vec::new(),
        }
    }

    /// Engine settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Engine settings, mutably
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Attach an observer
    pub fn attach_observer(&mut self, observer: Rc<dyn GraphObserver>) {
        self.observers.push(observer);
    }

    /// Detach every observer
    pub fn detach_observers(&mut self) {
        self.observers.clear();
    }

    pub(crate) fn observers(&self) -> Vec<Rc<dyn GraphObserver>> {
        self.observers.clone()
    }

    /// True if any attached observer presents the graph in live mode
    pub fn is_live(&self) -> bool {
        self.observers.iter().any(|observer| observer.is_live())
    }

    /// Counter bumped on every change
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Highest node ID ever assigned
    pub fn last_node_id(&self) -> u32 {
        self.last_node_id
    }

    /// Highest link ID ever assigned
    pub fn last_link_id(&self) -> u32 {
        self.last_link_id
    }

    /// Record a change and tell observers that views are stale
    pub(crate) fn mark_changed(&mut self) {
        self.version += 1;
        for observer in &self.observers {
            observer.set_dirty();
        }
    }

    /// Add a node to the graph.
    ///
    /// Returns `Ok(None)` without touching the graph if a node with the same ID
    /// is already registered. A detached node gets the next free ID; a
    /// preassigned ID is kept. Unless `skip_order` is set the execution order
    /// is recomputed immediately.
    pub fn add(&mut self, mut node: Node, skip_order: bool) -> Result<Option<NodeId>, GraphError> {
        if let Some(id) = node.id {
            if self.nodes.contains_key(&id) {
                tracing::warn!(node = %id, "Node already registered, ignoring add");
                return Ok(None);
            }
        }

        if self.nodes.len() >= self.settings.max_nodes {
            return Err(GraphError::CapacityExceeded(self.settings.max_nodes));
        }

        let id = match node.id {
            Some(id) => {
                self.last_node_id = self.last_node_id.max(id.0);
                id
            }
            None => {
                self.last_node_id += 1;
                NodeId(self.last_node_id)
            }
        };
        node.id = Some(id);
        tracing::debug!(node = %id, node_type = %node.node_type, "Node added");
        self.nodes.insert(id, node);

        self.with_behavior(id, |behavior, ctx| behavior.on_added(ctx));
        for observer in self.observers() {
            observer.node_added(id);
        }

        self.mark_changed();
        if skip_order {
            self.order_stale = true;
        } else {
            self.update_execution_order();
        }
        Ok(Some(id))
    }

    /// Remove a node and all of its links.
    ///
    /// Returns `None` if the node is not registered or is not removable.
    /// The returned node is detached; adding it again assigns a fresh ID.
    pub fn remove(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.get(&node_id)?;
        if !node.removable {
            tracing::warn!(node = %node_id, "Node is not removable");
            return None;
        }
        let (input_count, output_count) = (node.inputs.len(), node.outputs.len());

        for slot in 0..input_count {
            self.disconnect_input(node_id, slot);
        }
        for slot in 0..output_count {
            self.disconnect_output(node_id, slot);
        }

        self.with_behavior(node_id, |behavior, ctx| behavior.on_removed(ctx));

        let mut node = self.nodes.shift_remove(&node_id)?;
        node.id = None;
        tracing::debug!(node = %node_id, "Node removed");

        for observer in self.observers() {
            observer.node_removed(node_id);
        }
        self.mark_changed();
        self.update_execution_order();
        Some(node)
    }

    /// Remove every node, link and global, reset the counters, and stop the scheduler.
    /// Settings and observers are kept.
    pub fn clear(&mut self) {
        self.stop();

        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in &ids {
            self.with_behavior(*id, |behavior, ctx| behavior.on_removed(ctx));
        }

        self.nodes.clear();
        for observer in self.observers() {
            for id in &ids {
                observer.node_removed(*id);
            }
        }
        self.links.clear();
        self.globals_in.clear();
        self.globals_out.clear();
        self.config.clear();
        self.last_node_id = 0;
        self.last_link_id = 0;
        self.iteration = 0;
        self.frame = 0;
        self.order_list.clear();
        self.order_stale = false;
        self.clock = Clock::default();
        self.mark_changed();
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes in registration order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs in registration order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Find nodes of a given type
    pub fn find_nodes_by_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a Node> {
        self.nodes.values().filter(move |n| n.node_type == node_type)
    }

    /// Find nodes with a given title
    pub fn find_nodes_by_title<'a>(&'a self, title: &'a str) -> impl Iterator<Item = &'a Node> {
        self.nodes.values().filter(move |n| n.title == title)
    }

    /// Set a property on a node
    pub fn set_property(
        &mut self,
        node_id: NodeId,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        node.properties.insert(name.into(), value);
        self.mark_changed();
        Ok(())
    }

    /// Hand a value to every node titled `name`
    pub fn set_input_data(&mut self, name: &str, value: Value) {
        let targets: Vec<NodeId> = self
            .find_nodes_by_title(name)
            .filter_map(Node::id)
            .collect();
        for id in targets {
            let value = value.clone();
            self.with_behavior(id, |behavior, ctx| behavior.set_value(ctx, value));
        }
    }

    /// Connect an output slot to an input slot.
    ///
    /// An input holds a single link, so an existing link on the target slot is
    /// disconnected first.
    pub fn connect(
        &mut self,
        origin: NodeId,
        origin_slot: usize,
        target: NodeId,
        target_slot: usize,
    ) -> Result<LinkId, ConnectionError> {
        let source_node = self.nodes.get(&origin)
            .ok_or(ConnectionError::NodeNotFound(origin))?;
        let target_node = self.nodes.get(&target)
            .ok_or(ConnectionError::NodeNotFound(target))?;

        let output = source_node.outputs.get(origin_slot)
            .ok_or(ConnectionError::SlotNotFound { node: origin, slot: origin_slot })?;
        let input = target_node.inputs.get(target_slot)
            .ok_or(ConnectionError::SlotNotFound { node: target, slot: target_slot })?;

        if origin == target {
            return Err(ConnectionError::SelfLoop);
        }

        if !output.slot_type.can_connect_to(&input.slot_type) {
            return Err(ConnectionError::IncompatibleSlots {
                from: output.slot_type.clone(),
                to: input.slot_type.clone(),
            });
        }

        let link_type = output.slot_type.clone();
        if input.is_connected() {
            self.disconnect_input(target, target_slot);
        }

        self.last_link_id += 1;
        let id = LinkId(self.last_link_id);
        self.links.insert(id, Link::new(id, origin, origin_slot, target, target_slot, link_type));
        if let Some(output) = self.nodes.get_mut(&origin).and_then(|n| n.outputs.get_mut(origin_slot)) {
            output.links.push(id);
        }
        if let Some(input) = self.nodes.get_mut(&target).and_then(|n| n.inputs.get_mut(target_slot)) {
            input.link = Some(id);
        }
        tracing::debug!(link = %id, %origin, origin_slot, %target, target_slot, "Link created");

        self.with_behavior(origin, |behavior, ctx| {
            behavior.on_connections_change(ctx, SlotDirection::Output, origin_slot, true);
        });
        self.with_behavior(target, |behavior, ctx| {
            behavior.on_connections_change(ctx, SlotDirection::Input, target_slot, true);
        });

        self.mark_changed();
        self.update_execution_order();
        Ok(id)
    }

    /// Disconnect the link on an input slot. Returns false if there was none.
    pub fn disconnect_input(&mut self, node_id: NodeId, slot: usize) -> bool {
        let Some(link_id) = self
            .nodes
            .get_mut(&node_id)
            .and_then(|n| n.inputs.get_mut(slot))
            .and_then(|input| input.link.take())
        else {
            return false;
        };

        if let Some(link) = self.links.shift_remove(&link_id) {
            if let Some(output) = self
                .nodes
                .get_mut(&link.origin_id)
                .and_then(|n| n.outputs.get_mut(link.origin_slot))
            {
                output.links.retain(|l| *l != link_id);
            }
            self.with_behavior(link.origin_id, |behavior, ctx| {
                behavior.on_connections_change(ctx, SlotDirection::Output, link.origin_slot, false);
            });
        }
        self.with_behavior(node_id, |behavior, ctx| {
            behavior.on_connections_change(ctx, SlotDirection::Input, slot, false);
        });
        tracing::debug!(link = %link_id, node = %node_id, slot, "Input disconnected");

        self.mark_changed();
        self.update_execution_order();
        true
    }

    /// Disconnect every link leaving an output slot. Returns false if there were none.
    pub fn disconnect_output(&mut self, node_id: NodeId, slot: usize) -> bool {
        let Some(link_ids) = self
            .nodes
            .get_mut(&node_id)
            .and_then(|n| n.outputs.get_mut(slot))
            .map(|output| std::mem::take(&mut output.links))
        else {
            return false;
        };
        if link_ids.is_empty() {
            return false;
        }

        for link_id in link_ids {
            let Some(link) = self.links.shift_remove(&link_id) else {
                continue;
            };
            let mut cleared = false;
            if let Some(input) = self
                .nodes
                .get_mut(&link.target_id)
                .and_then(|n| n.inputs.get_mut(link.target_slot))
            {
                if input.link == Some(link_id) {
                    input.link = None;
                    cleared = true;
                }
            }
            if cleared {
                self.with_behavior(link.target_id, |behavior, ctx| {
                    behavior.on_connections_change(ctx, SlotDirection::Input, link.target_slot, false);
                });
            }
        }
        self.with_behavior(node_id, |behavior, ctx| {
            behavior.on_connections_change(ctx, SlotDirection::Output, slot, false);
        });
        tracing::debug!(node = %node_id, slot, "Output disconnected");

        self.mark_changed();
        self.update_execution_order();
        true
    }

    /// Remove a single link. Returns false if it does not exist.
    pub fn remove_link(&mut self, link_id: LinkId) -> bool {
        let Some(link) = self.links.get(&link_id) else {
            return false;
        };
        let (target, target_slot) = (link.target_id, link.target_slot);
        let attached = self
            .nodes
            .get(&target)
            .and_then(|n| n.inputs.get(target_slot))
            .is_some_and(|input| input.link == Some(link_id));
        if attached {
            return self.disconnect_input(target, target_slot);
        }

        // Dangling link left over from a partial restore
        if let Some(link) = self.links.shift_remove(&link_id) {
            if let Some(output) = self
                .nodes
                .get_mut(&link.origin_id)
                .and_then(|n| n.outputs.get_mut(link.origin_slot))
            {
                output.links.retain(|l| *l != link_id);
            }
        }
        self.mark_changed();
        self.update_execution_order();
        true
    }

    /// Get a link by ID
    pub fn link(&self, link_id: LinkId) -> Option<&Link> {
        self.links.get(&link_id)
    }

    /// Get all links
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Get links involving a node
    pub fn links_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.involves_node(node_id))
    }

    /// Get the number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Run a callback on a node's behaviour with a context for that node.
    ///
    /// The behaviour is taken out of the node for the duration of the call so
    /// the callback may freely mutate the graph. Returns `None` if the node is
    /// missing or its behaviour is already in use further up the stack.
    pub(crate) fn with_behavior<R>(
        &mut self,
        node_id: NodeId,
        f: impl FnOnce(&mut dyn NodeBehavior, &mut NodeContext<'_>) -> R,
    ) -> Option<R> {
        let mut behavior = self.nodes.get_mut(&node_id)?.behavior.take()?;
        let result = {
            let mut ctx = NodeContext::new(self, node_id);
            f(behavior.as_mut(), &mut ctx)
        };
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.behavior.get_or_insert(behavior);
        }
        Some(result)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.nodes)
            .field("links", &self.links)
            .field("globals_in", &self.globals_in)
            .field("globals_out", &self.globals_out)
            .field("config", &self.config)
            .field("last_node_id", &self.last_node_id)
            .field("last_link_id", &self.last_link_id)
            .field("order_list", &self.order_list)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Error when creating a link
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Slot not found
    #[error("Node {node} has no slot {slot}")]
    SlotNotFound {
        /// Node that was addressed
        node: NodeId,
        /// Missing slot index
        slot: usize,
    },

    /// Incompatible slot types
    #[error("Incompatible slot types: {from} -> {to}")]
    IncompatibleSlots {
        /// Output slot type
        from: SlotType,
        /// Input slot type
        to: SlotType,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Inert;
    use std::cell::RefCell;

    fn passthrough() -> Node {
        Node::new("test/pass", Inert)
            .with_input("in", SlotType::Number)
            .with_output("out", SlotType::Number)
    }

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
        live: bool,
    }

    impl GraphObserver for Recorder {
        fn node_added(&self, node: NodeId) {
            self.events.borrow_mut().push(format!("added {node}"));
        }

        fn node_removed(&self, node: NodeId) {
            self.events.borrow_mut().push(format!("removed {node}"));
        }

        fn is_live(&self) -> bool {
            self.live
        }
    }

    #[test]
    fn test_add_assigns_monotonic_ids() {
        let mut graph = Graph::new("ids");
        let a = graph.add(passthrough(), false).unwrap().unwrap();
        let b = graph.add(passthrough(), false).unwrap().unwrap();
        graph.remove(b);
        let c = graph.add(passthrough(), false).unwrap().unwrap();

        assert!(a < b && b < c);
        assert_eq!(graph.last_node_id(), c.0);
        assert!(graph.node(b).is_none());
    }

    #[test]
    fn test_add_duplicate_id_is_noop() {
        let mut graph = Graph::new("dup");
        graph.add(passthrough().with_id(NodeId(7)), false).unwrap();
        let version = graph.version();

        let result = graph.add(passthrough().with_id(NodeId(7)), false).unwrap();
        assert!(result.is_none());
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.version(), version);
        assert_eq!(graph.last_node_id(), 7);
    }

    #[test]
    fn test_capacity_limit() {
        let mut graph = Graph::with_settings("cap", Settings::default().with_max_nodes(2));
        graph.add(passthrough(), false).unwrap();
        graph.add(passthrough(), false).unwrap();

        let err = graph.add(passthrough(), false).unwrap_err();
        assert!(matches!(err, GraphError::CapacityExceeded(2)));
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_connect_replaces_existing_input_link() {
        let mut graph = Graph::new("fan-in");
        let a = graph.add(passthrough(), false).unwrap().unwrap();
        let b = graph.add(passthrough(), false).unwrap().unwrap();
        let c = graph.add(passthrough(), false).unwrap().unwrap();

        let first = graph.connect(a, 0, c, 0).unwrap();
        let second = graph.connect(b, 0, c, 0).unwrap();

        assert!(graph.link(first).is_none());
        assert_eq!(graph.node(c).unwrap().inputs[0].link, Some(second));
        assert!(graph.node(a).unwrap().outputs[0].links.is_empty());
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn test_connect_errors() {
        let mut graph = Graph::new("errors");
        let a = graph.add(passthrough(), false).unwrap().unwrap();
        let text = graph
            .add(Node::new("test/text", Inert).with_input("in", SlotType::String), false)
            .unwrap()
            .unwrap();

        assert!(matches!(graph.connect(a, 0, a, 0), Err(ConnectionError::SelfLoop)));
        assert!(matches!(
            graph.connect(a, 0, text, 0),
            Err(ConnectionError::IncompatibleSlots { .. })
        ));
        assert!(matches!(
            graph.connect(a, 3, text, 0),
            Err(ConnectionError::SlotNotFound { slot: 3, .. })
        ));
        assert!(matches!(
            graph.connect(a, 0, NodeId(99), 0),
            Err(ConnectionError::NodeNotFound(NodeId(99)))
        ));
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn test_remove_cleans_links() {
        let mut graph = Graph::new("remove");
        let a = graph.add(passthrough(), false).unwrap().unwrap();
        let b = graph.add(passthrough(), false).unwrap().unwrap();
        let c = graph.add(passthrough(), false).unwrap().unwrap();
        graph.connect(a, 0, b, 0).unwrap();
        graph.connect(b, 0, c, 0).unwrap();

        let removed = graph.remove(b).unwrap();
        assert_eq!(removed.id(), None);
        assert!(graph.node(b).is_none());
        assert_eq!(graph.links_for_node(b).count(), 0);
        assert_eq!(graph.link_count(), 0);
        assert!(!graph.node(c).unwrap().is_input_connected(0));
        assert!(graph.node(a).unwrap().outputs[0].links.is_empty());
        assert_eq!(graph.execution_order(), &[a, c]);
    }

    #[test]
    fn test_pinned_node_is_not_removed() {
        let mut graph = Graph::new("pinned");
        let a = graph.add(passthrough().pinned(), false).unwrap().unwrap();
        assert!(graph.remove(a).is_none());
        assert!(graph.node(a).is_some());
        assert!(graph.remove(NodeId(42)).is_none());
    }

    #[test]
    fn test_find_and_set_input_data() {
        let mut graph = Graph::new("find");
        graph.add(passthrough().with_title("gain"), false).unwrap();
        graph.add(passthrough().with_title("gain"), false).unwrap();
        graph.add(Node::new("test/other", Inert).with_title("bias"), false).unwrap();

        assert_eq!(graph.find_nodes_by_type("test/pass").count(), 2);
        graph.set_input_data("gain", Value::Float(0.5));

        let values: Vec<_> = graph
            .find_nodes_by_title("gain")
            .map(|n| n.property("value").cloned())
            .collect();
        assert_eq!(values, vec![Some(Value::Float(0.5)), Some(Value::Float(0.5))]);
        assert!(graph.find_nodes_by_title("bias").next().unwrap().property("value").is_none());
    }

    #[test]
    fn test_set_property() {
        let mut graph = Graph::new("props");
        let a = graph.add(passthrough(), false).unwrap().unwrap();
        graph.set_property(a, "gain", Value::Float(2.0)).unwrap();
        assert_eq!(graph.node(a).unwrap().property("gain"), Some(&Value::Float(2.0)));
        assert!(matches!(
            graph.set_property(NodeId(9), "gain", Value::Null),
            Err(GraphError::NodeNotFound(NodeId(9)))
        ));
    }

    #[test]
    fn test_observers() {
        let mut graph = Graph::new("observed");
        let recorder = Rc::new(Recorder { live: true, ..Default::default() });
        graph.attach_observer(recorder.clone());

        let a = graph.add(passthrough(), false).unwrap().unwrap();
        graph.remove(a);

        assert!(graph.is_live());
        assert_eq!(*recorder.events.borrow(), vec![format!("added {a}"), format!("removed {a}")]);

        graph.detach_observers();
        assert!(!graph.is_live());
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut graph = Graph::new("clear");
        let a = graph.add(passthrough(), false).unwrap().unwrap();
        let b = graph.add(passthrough(), false).unwrap().unwrap();
        graph.connect(a, 0, b, 0).unwrap();
        graph.config.insert("speed".into(), Value::Float(2.0));

        graph.clear();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.link_count(), 0);
        assert_eq!(graph.last_node_id(), 0);
        assert_eq!(graph.last_link_id(), 0);
        assert!(graph.config.is_empty());
    }

    #[test]
    fn test_clear_notifies_observers() {
        let mut graph = Graph::new("clear");
        let a = graph.add(passthrough(), false).unwrap().unwrap();
        let b = graph.add(passthrough(), false).unwrap().unwrap();
        let recorder = Rc::new(Recorder::default());
        graph.attach_observer(recorder.clone());

        graph.clear();
        assert_eq!(*recorder.events.borrow(), vec![format!("removed {a}"), format!("removed {b}")]);
    }
}
