use std::fmt::Write as _;

use glam::Vec3;
use stagecraft_assets::{AssetState, ResourceStats};
use stagecraft_common::NodeId;
use stagecraft_scene::{SceneGraph, Stage};

/// Stage inspector for developer tooling.
///
/// Read-only queries against a stage for debugging and the CLI.
pub struct StageInspector;

impl StageInspector {
    /// Produce a summary of the stage state.
    pub fn summary(stage: &Stage) -> StageSummary {
        let graph = stage.graph();
        StageSummary {
            tick: stage.tick_count(),
            node_count: graph.len(),
            top_level: graph.children_of(None).len(),
            pending_events: stage.bus().pending(),
            resources: stage.resource_stats().ok(),
        }
    }

    pub fn inspect_node(graph: &SceneGraph, id: NodeId) -> Option<NodeInfo> {
        graph.get_node(id).map(|node| {
            let t = node.transform();
            NodeInfo {
                id,
                name: node.name().to_string(),
                parent: node.parent(),
                children: node.children().to_vec(),
                position: [t.position.x, t.position.y],
                depth: t.depth,
                scale: [t.scale.x, t.scale.y],
                rotation: t.rotation,
                world_origin: node.world().transform_point3(Vec3::ZERO).to_array(),
                material: node.material().map(|m| m.tag().to_string()),
            }
        })
    }

    /// All node ids, sorted.
    pub fn list_nodes(graph: &SceneGraph) -> Vec<NodeId> {
        graph.ids()
    }

    /// Indented outline of the tree, one node per line, in paint order.
    pub fn tree(graph: &SceneGraph) -> String {
        let mut out = String::from("root\n");
        let mut stack: Vec<(NodeId, usize)> = graph
            .children_of(None)
            .iter()
            .rev()
            .map(|id| (*id, 1))
            .collect();
        while let Some((id, level)) = stack.pop() {
            let Some(node) = graph.get_node(id) else {
                continue;
            };
            let _ = writeln!(
                out,
                "{:indent$}{} {} depth={}",
                "",
                id,
                node.name(),
                node.depth(),
                indent = level * 2
            );
            stack.extend(node.children().iter().rev().map(|c| (*c, level + 1)));
        }
        out
    }

    /// Every registry entry with its refcount, assets first.
    pub fn resources(stage: &Stage) -> Vec<ResourceEntry> {
        let resources = stage.resources();
        let mut entries = Vec::new();
        if let Ok(assets) = resources.assets() {
            for name in assets.names() {
                let state = assets.get(name).map_or("missing", |a| match a.borrow().state {
                    AssetState::Pending => "pending",
                    AssetState::Loaded(_) => "loaded",
                    AssetState::Failed(_) => "failed",
                    AssetState::Unsupported => "unsupported",
                    AssetState::Freed => "freed",
                });
                entries.push(ResourceEntry {
                    kind: "asset",
                    name: name.to_string(),
                    refcount: assets.refcount(name).unwrap_or(0),
                    state,
                });
            }
        }
        if let Ok(textures) = resources.textures() {
            for name in textures.names() {
                let loaded = textures.get(name).is_some_and(|t| t.borrow().is_loaded());
                entries.push(ResourceEntry {
                    kind: "texture",
                    name: name.to_string(),
                    refcount: textures.refcount(name).unwrap_or(0),
                    state: if loaded { "loaded" } else { "placeholder" },
                });
            }
        }
        if let Ok(shaders) = resources.shaders() {
            for name in shaders.names() {
                let ready = shaders.get(name).is_some_and(|s| s.borrow().is_ready());
                entries.push(ResourceEntry {
                    kind: "shader",
                    name: name.to_string(),
                    refcount: shaders.refcount(name).unwrap_or(0),
                    state: if ready { "ready" } else { "placeholder" },
                });
            }
        }
        entries
    }
}

/// Summary of stage state for the inspector.
#[derive(Debug, Clone)]
pub struct StageSummary {
    pub tick: u64,
    pub node_count: usize,
    pub top_level: usize,
    pub pending_events: usize,
    /// `None` once the registries have been reset.
    pub resources: Option<ResourceStats>,
}

impl std::fmt::Display for StageSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Stage: tick={} nodes={} top_level={} pending_events={}",
            self.tick, self.node_count, self.top_level, self.pending_events
        )?;
        match &self.resources {
            Some(r) => write!(
                f,
                " assets={} textures={} shaders={} in_flight={}",
                r.assets, r.textures, r.shaders, r.loads_in_flight
            ),
            None => write!(f, " resources=uninitialized"),
        }
    }
}

/// Detailed info about a single node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub position: [f32; 2],
    pub depth: f32,
    pub scale: [f32; 2],
    pub rotation: f32,
    pub world_origin: [f32; 3],
    pub material: Option<String>,
}

impl std::fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Node {} {:?} pos=({:.2}, {:.2}) depth={:.2} scale=({:.2}, {:.2}) rot={:.2} children={}",
            self.id,
            self.name,
            self.position[0],
            self.position[1],
            self.depth,
            self.scale[0],
            self.scale[1],
            self.rotation,
            self.children.len(),
        )?;
        if let Some(tag) = &self.material {
            write!(f, " material={tag}")?;
        }
        Ok(())
    }
}

/// One row of the resource report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub kind: &'static str,
    pub name: String,
    pub refcount: u32,
    pub state: &'static str,
}

impl std::fmt::Display for ResourceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<8} {:<32} refs={} {}",
            self.kind, self.name, self.refcount, self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use stagecraft_assets::{LoadMode, ResourceSettings};
    use stagecraft_render::{FixedSurface, RecordingRenderer};
    use stagecraft_scene::{Material, Node, StageConfig};

    fn stage_in(dir: &std::path::Path) -> Stage {
        Stage::new(StageConfig {
            resources: ResourceSettings {
                base_dir: dir.to_path_buf(),
                load_mode: LoadMode::Inline,
                ..ResourceSettings::default()
            },
            ..StageConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn summary_empty_stage() {
        let dir = tempfile::tempdir().unwrap();
        let stage = stage_in(dir.path());
        let summary = StageInspector::summary(&stage);
        assert_eq!(summary.tick, 0);
        assert_eq!(summary.node_count, 0);
        assert_eq!(summary.resources, Some(ResourceStats::default()));
    }

    #[test]
    fn summary_display() {
        let dir = tempfile::tempdir().unwrap();
        let stage = stage_in(dir.path());
        let s = format!("{}", StageInspector::summary(&stage));
        assert!(s.contains("tick=0"));
        assert!(s.contains("assets=0"));
    }

    #[test]
    fn inspect_node_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut stage = stage_in(dir.path());
        stage
            .spawn(Node::create(
                NodeId(1),
                "parent",
                Vec2::new(1.0, 2.0),
                3.0,
                Vec2::ONE,
                0.0,
            ))
            .unwrap();
        stage
            .spawn_under(
                NodeId(1),
                Node::new(NodeId(2), "child").with_material(Material::color([1.0; 4])),
            )
            .unwrap();
        stage.graph_mut().update(0.0);

        let info = StageInspector::inspect_node(stage.graph(), NodeId(1)).unwrap();
        assert_eq!(info.position, [1.0, 2.0]);
        assert_eq!(info.children, vec![NodeId(2)]);
        assert_eq!(info.world_origin, [1.0, 2.0, -3.0]);

        let child = StageInspector::inspect_node(stage.graph(), NodeId(2)).unwrap();
        assert_eq!(child.parent, Some(NodeId(1)));
        assert_eq!(child.material.as_deref(), Some("color"));
        assert!(child.to_string().contains("material=color"));
    }

    #[test]
    fn inspect_node_not_found() {
        let graph = SceneGraph::new();
        assert!(StageInspector::inspect_node(&graph, NodeId(9)).is_none());
    }

    #[test]
    fn list_and_tree() {
        let mut graph = SceneGraph::new();
        graph.add_child(Node::new(NodeId(2), "b")).unwrap();
        graph.add_child(Node::new(NodeId(1), "a")).unwrap();
        graph.add_child_to(NodeId(2), Node::new(NodeId(3), "c")).unwrap();

        assert_eq!(
            StageInspector::list_nodes(&graph),
            vec![NodeId(1), NodeId(2), NodeId(3)]
        );
        let tree = StageInspector::tree(&graph);
        let lines: Vec<&str> = tree.lines().collect();
        assert_eq!(lines[0], "root");
        assert_eq!(lines[1], "  #2 b depth=0");
        assert_eq!(lines[2], "    #3 c depth=0");
        assert_eq!(lines[3], "  #1 a depth=0");
    }

    #[test]
    fn resource_report_after_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut stage = stage_in(dir.path());
        stage
            .spawn(Node::new(NodeId(1), "s").with_material(Material::sprite("hero.png")))
            .unwrap();
        let surface = FixedSurface::new(16, 16);
        let mut renderer = RecordingRenderer::new();
        stage.tick(0.0, &surface, &mut renderer).unwrap();

        let report = StageInspector::resources(&stage);
        let kinds: Vec<&str> = report.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec!["asset", "asset", "texture", "shader"]);
        let texture = &report[2];
        assert_eq!(texture.name, "assets/hero.png");
        assert_eq!(texture.refcount, 1);
        assert_eq!(texture.state, "placeholder");
    }
}
