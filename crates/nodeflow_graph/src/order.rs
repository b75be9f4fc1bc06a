// SPDX-License-Identifier: MIT OR Apache-2.0
//! Execution order: a linearization of the graph where producers run before consumers.

use crate::graph::Graph;
use crate::link::LinkId;
use crate::node::NodeId;
use std::collections::{HashMap, HashSet, VecDeque};

impl Graph {
    /// Compute the execution order and stamp every node with its position.
    ///
    /// Kahn's algorithm seeded with the nodes that have no connected input, in
    /// registration order. Nodes that never become ready (cycle members, or
    /// nodes fed by a dangling link) are appended afterwards in registration
    /// order, so the result always covers every node exactly once. The relative
    /// placement of cycle members carries no meaning.
    pub fn compute_execution_order(&mut self) -> Vec<NodeId> {
        let mut remaining: HashMap<NodeId, usize> = HashMap::new();
        let mut ready: VecDeque<NodeId> = VecDeque::new();

        for (id, node) in &self.nodes {
            match node.connected_input_count() {
                0 => ready.push_back(*id),
                count => {
                    remaining.insert(*id, count);
                }
            }
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut placed: HashSet<NodeId> = HashSet::with_capacity(self.nodes.len());
        let mut visited_links: HashSet<LinkId> = HashSet::new();

        while let Some(id) = ready.pop_front() {
            order.push(id);
            placed.insert(id);

            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            for output in &node.outputs {
                for link_id in &output.links {
                    if !visited_links.insert(*link_id) {
                        continue;
                    }
                    let Some(link) = self.links.get(link_id) else {
                        continue;
                    };
                    let target = link.target_id;
                    if !self.nodes.contains_key(&target) {
                        continue;
                    }
                    if let Some(count) = remaining.get_mut(&target) {
                        if *count > 0 {
                            *count -= 1;
                            if *count == 0 {
                                ready.push_back(target);
                            }
                        }
                    }
                }
            }
        }

        let residual: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| !placed.contains(*id))
            .copied()
            .collect();
        if !residual.is_empty() {
            tracing::debug!(count = residual.len(), "Nodes left unordered by cycles or dangling links");
        }
        order.extend(residual);

        for (index, id) in order.iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.order = index;
            }
        }
        order
    }

    /// Recompute and cache the execution order
    pub fn update_execution_order(&mut self) {
        self.order_list = self.compute_execution_order();
        self.order_stale = false;
    }

    /// The cached execution order, recomputed first if a deferred add left it stale
    pub fn execution_order(&mut self) -> &[NodeId] {
        self.ensure_execution_order();
        &self.order_list
    }

    pub(crate) fn ensure_execution_order(&mut self) {
        if self.order_stale || self.order_list.len() != self.nodes.len() {
            self.update_execution_order();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Inert;
    use crate::node::Node;
    use crate::slot::SlotType;
    use proptest::prelude::*;

    fn node(inputs: usize, outputs: usize) -> Node {
        let mut node = Node::new("test/node", Inert);
        for i in 0..inputs {
            node = node.with_input(format!("in{i}"), SlotType::Any);
        }
        for i in 0..outputs {
            node = node.with_output(format!("out{i}"), SlotType::Any);
        }
        node
    }

    fn order_of(graph: &Graph, id: NodeId) -> usize {
        graph.node(id).unwrap().order()
    }

    #[test]
    fn test_sources_before_sink() {
        let mut graph = Graph::new("scenario");
        let a = graph.add(node(0, 1), false).unwrap().unwrap();
        let b = graph.add(node(0, 1), false).unwrap().unwrap();
        let c = graph.add(node(2, 0), false).unwrap().unwrap();
        graph.connect(a, 0, c, 0).unwrap();
        graph.connect(b, 0, c, 1).unwrap();

        assert_eq!(graph.execution_order(), &[a, b, c]);
        assert_eq!(order_of(&graph, a), 0);
        assert_eq!(order_of(&graph, b), 1);
        assert_eq!(order_of(&graph, c), 2);
    }

    #[test]
    fn test_registration_order_does_not_matter_for_dependencies() {
        let mut graph = Graph::new("reversed");
        let sink = graph.add(node(1, 0), false).unwrap().unwrap();
        let mid = graph.add(node(1, 1), false).unwrap().unwrap();
        let source = graph.add(node(0, 1), false).unwrap().unwrap();
        graph.connect(source, 0, mid, 0).unwrap();
        graph.connect(mid, 0, sink, 0).unwrap();

        assert_eq!(graph.execution_order(), &[source, mid, sink]);
    }

    #[test]
    fn test_two_cycle_covers_both_nodes() {
        let mut graph = Graph::new("cycle");
        let a = graph.add(node(1, 1), false).unwrap().unwrap();
        let b = graph.add(node(1, 1), false).unwrap().unwrap();
        graph.connect(a, 0, b, 0).unwrap();
        graph.connect(b, 0, a, 0).unwrap();

        let order = graph.compute_execution_order();
        assert_eq!(order, vec![a, b]);
        assert_eq!(order_of(&graph, a), 0);
        assert_eq!(order_of(&graph, b), 1);
    }

    #[test]
    fn test_cycle_downstream_still_ordered() {
        let mut graph = Graph::new("cycle-tail");
        let source = graph.add(node(0, 1), false).unwrap().unwrap();
        let a = graph.add(node(2, 1), false).unwrap().unwrap();
        let b = graph.add(node(1, 1), false).unwrap().unwrap();
        graph.connect(source, 0, a, 0).unwrap();
        graph.connect(a, 0, b, 0).unwrap();
        graph.connect(b, 0, a, 1).unwrap();

        let order = graph.compute_execution_order();
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], source);
        assert_eq!(&order[1..], &[a, b]);
    }

    #[test]
    fn test_deferred_add_is_recomputed_before_read() {
        let mut graph = Graph::new("deferred");
        let a = graph.add(node(0, 1), true).unwrap().unwrap();
        let b = graph.add(node(1, 0), true).unwrap().unwrap();
        assert!(graph.order_stale);

        assert_eq!(graph.execution_order(), &[a, b]);
        assert!(!graph.order_stale);
    }

    /// Builds a random graph. Links only go from lower to higher index when
    /// `acyclic` is set.
    fn build(node_count: usize, edges: &[(usize, usize)], acyclic: bool) -> (Graph, Vec<NodeId>) {
        let mut graph = Graph::new("random");
        let ids: Vec<NodeId> = (0..node_count)
            .map(|_| graph.add(node(node_count, 1), false).unwrap().unwrap())
            .collect();
        for (slot, &(from, to)) in edges.iter().enumerate() {
            let (from, to) = (from % node_count, to % node_count);
            if from == to || (acyclic && from > to) {
                continue;
            }
            let _ = graph.connect(ids[from], 0, ids[to], slot % node_count);
        }
        (graph, ids)
    }

    proptest! {
        #[test]
        fn prop_acyclic_links_point_forward(
            node_count in 1usize..12,
            edges in proptest::collection::vec((0usize..12, 0usize..12), 0..30),
        ) {
            let (mut graph, _) = build(node_count, &edges, true);
            graph.update_execution_order();
            for link in graph.links() {
                let origin = graph.node(link.origin_id).unwrap().order();
                let target = graph.node(link.target_id).unwrap().order();
                prop_assert!(origin < target);
            }
        }

        #[test]
        fn prop_order_covers_every_node_once(
            node_count in 1usize..12,
            edges in proptest::collection::vec((0usize..12, 0usize..12), 0..30),
        ) {
            let (mut graph, ids) = build(node_count, &edges, false);
            let order = graph.compute_execution_order();
            prop_assert_eq!(order.len(), ids.len());
            let unique: HashSet<NodeId> = order.iter().copied().collect();
            prop_assert_eq!(unique.len(), ids.len());
        }

        #[test]
        fn prop_ids_never_repeat(ops in proptest::collection::vec(any::<bool>(), 1..40)) {
            let mut graph = Graph::new("ids");
            let mut seen: Vec<NodeId> = Vec::new();
            for add in ops {
                if add || graph.node_count() == 0 {
                    let id = graph.add(node(1, 1), false).unwrap().unwrap();
                    prop_assert!(seen.iter().all(|old| *old < id));
                    seen.push(id);
                } else {
                    let first = graph.node_ids().next().unwrap();
                    graph.remove(first);
                    prop_assert!(graph.node(first).is_none());
                    prop_assert!(graph.links_for_node(first).next().is_none());
                }
            }
        }
    }
}
