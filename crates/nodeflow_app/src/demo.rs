// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in sample graph: a pulsing colour shader.

use anyhow::{Context, Result};
use nodeflow_graph::{Graph, Node, NodeId, NodeRegistry, Settings};

fn create(registry: &NodeRegistry, type_id: &str) -> Result<Node> {
    registry
        .create_node(type_id)
        .with_context(|| format!("Node type {type_id} is not registered"))
}

fn attach(graph: &mut Graph, node: Node) -> Result<NodeId> {
    graph.add(node, false)?.context("Node was already registered")
}

/// `u_time -> sin -> mix(sin, 1.0, 0.5) -> output`, with the mix factor
/// coming from the node's own `f` property
pub fn build_demo_graph(registry: &NodeRegistry, settings: Settings) -> Result<Graph> {
    let mut graph = Graph::with_settings("demo", settings);

    let time = attach(
        &mut graph,
        create(registry, "shader/input")?
            .with_title("time")
            .with_property("name", "u_time")
            .with_property("type", "float"),
    )?;
    let sin = attach(&mut graph, create(registry, "shader/sin")?)?;
    let one = attach(&mut graph, create(registry, "shader/const")?.with_property("value", 1.0))?;
    let mix = attach(&mut graph, create(registry, "shader/mix")?.with_property("f", 0.5))?;
    let output = attach(&mut graph, create(registry, "shader/output")?)?;

    graph.connect(time, 0, sin, 0)?;
    graph.connect(sin, 0, mix, 0)?;
    graph.connect(one, 0, mix, 1)?;
    graph.connect(mix, 0, output, 0)?;

    graph.config.insert("description".into(), "Pulsing grey shader".into());
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeflow_graph::shader::FRAGMENT_SHADER_GLOBAL;
    use nodeflow_graph::{create_default_registry, ComposerLibrary};

    #[test]
    fn test_demo_generates_fragment_program() {
        let registry = create_default_registry(&ComposerLibrary::builtin());
        let mut graph = build_demo_graph(&registry, Settings::default()).unwrap();

        graph.run_step(1).unwrap();
        assert!(!graph.errors_in_execution());
        let fragment = graph
            .global_output(FRAGMENT_SHADER_GLOBAL)
            .and_then(|slot| slot.value.as_str())
            .unwrap();
        assert!(fragment.contains("uniform float u_time;"));
        assert!(fragment.contains("= sin(u_time);"));
        assert!(fragment.contains("= mix("));
        assert!(fragment.contains(",0.5);"));
    }

    #[test]
    fn test_demo_survives_snapshot() {
        let registry = create_default_registry(&ComposerLibrary::builtin());
        let graph = build_demo_graph(&registry, Settings::default()).unwrap();
        let text = graph.serialize().to_ron().unwrap();

        let mut restored = Graph::new("restored");
        let snapshot = nodeflow_graph::GraphSnapshot::from_ron(&text).unwrap();
        assert!(!restored.configure(&snapshot, &registry, false));
        restored.run_step(1).unwrap();
        assert!(restored.global_output(FRAGMENT_SHADER_GLOBAL).unwrap().value.as_str().is_some());
    }
}
