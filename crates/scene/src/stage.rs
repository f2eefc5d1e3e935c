use stagecraft_assets::{ResourceContext, ResourceStats};
use stagecraft_common::NodeId;
use stagecraft_events::{Event, EventBus};
use stagecraft_render::{Renderer, Surface};

use crate::camera::Camera;
use crate::config::StageConfig;
use crate::error::SceneError;
use crate::graph::SceneGraph;
use crate::material::{MaterialDesc, MaterialFactory};
use crate::node::Node;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub loads_completed: usize,
    pub events_dispatched: usize,
    pub events_pending: usize,
    pub nodes: usize,
}

/// A scene with its event bus, resources and frame loop.
#[derive(Debug)]
pub struct Stage {
    config: StageConfig,
    graph: SceneGraph,
    bus: EventBus,
    resources: ResourceContext,
    materials: MaterialFactory,
    tick: u64,
    accumulator: f64,
}

impl Stage {
    pub fn new(config: StageConfig) -> Result<Self, SceneError> {
        let mut resources = ResourceContext::new();
        resources.init(config.resources.clone())?;
        let camera = Camera::new(config.camera_near, config.camera_far);
        tracing::info!(
            asset_root = %config.resources.asset_root,
            drain_budget = config.drain_budget,
            "stage created"
        );
        Ok(Self {
            graph: SceneGraph::with_camera(camera),
            bus: EventBus::new(),
            resources,
            materials: MaterialFactory::with_builtins(),
            tick: 0,
            accumulator: 0.0,
            config,
        })
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn resources(&self) -> &ResourceContext {
        &self.resources
    }

    pub fn materials(&self) -> &MaterialFactory {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialFactory {
        &mut self.materials
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn resource_stats(&self) -> Result<ResourceStats, SceneError> {
        Ok(self.resources.stats()?)
    }

    /// Add a top-level node.
    pub fn spawn(&mut self, node: Node) -> Result<NodeId, SceneError> {
        self.graph.add_child(node)
    }

    pub fn spawn_under(&mut self, parent: NodeId, node: Node) -> Result<NodeId, SceneError> {
        self.graph.add_child_to(parent, node)
    }

    /// Add a top-level node drawn with the material `desc` describes.
    pub fn spawn_with(&mut self, node: Node, desc: &MaterialDesc) -> Result<NodeId, SceneError> {
        let material = self.materials.create(desc)?;
        self.graph.add_child(node.with_material(material))
    }

    /// Post an event. Returns the number of deliveries made or queued.
    pub fn post(&mut self, event: Event) -> usize {
        self.bus.post(event)
    }

    /// Remove a subtree and return its material resources.
    ///
    /// Returns the number of nodes removed; unknown ids remove nothing.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<usize, SceneError> {
        let Some(detached) = self.graph.remove_child(id) else {
            return Ok(0);
        };
        let count = detached.node_count();
        let mut first_error = None;
        for mut node in detached.into_nodes() {
            let node_id = node.id();
            let Some(material) = node.material_mut() else {
                continue;
            };
            if let Err(e) = material.release(&mut self.resources, &mut self.bus) {
                tracing::warn!(node = %node_id, "material release failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        tracing::debug!(node = %id, count, "destroyed");
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(count),
        }
    }

    /// Advance simulation state by `dt` without drawing.
    pub fn step(&mut self, dt: f32) -> Result<TickReport, SceneError> {
        self.graph.update(dt);
        let loads_completed = self.resources.pump(&mut self.bus)?;
        let events_dispatched = self.bus.drain(self.config.drain_budget);
        self.tick += 1;
        Ok(TickReport {
            tick: self.tick,
            loads_completed,
            events_dispatched,
            events_pending: self.bus.pending(),
            nodes: self.graph.len(),
        })
    }

    pub fn render(
        &mut self,
        surface: &dyn Surface,
        renderer: &mut dyn Renderer,
    ) -> Result<(), SceneError> {
        self.graph
            .render(surface, renderer, &mut self.resources, &mut self.bus)
    }

    /// One frame: update, pump loads, drain events, render.
    pub fn tick(
        &mut self,
        dt: f32,
        surface: &dyn Surface,
        renderer: &mut dyn Renderer,
    ) -> Result<TickReport, SceneError> {
        let _span = tracing::info_span!("stage_tick", tick = self.tick + 1).entered();
        let report = self.step(dt)?;
        self.render(surface, renderer)?;
        tracing::trace!(?report, "tick complete");
        Ok(report)
    }

    /// Run as many fixed steps as `elapsed` covers, then render once.
    ///
    /// Leftover time carries into the next call. Returns the steps taken.
    pub fn advance(
        &mut self,
        elapsed: f64,
        surface: &dyn Surface,
        renderer: &mut dyn Renderer,
    ) -> Result<u32, SceneError> {
        let rate = self.config.tick_rate;
        self.accumulator += elapsed;
        let mut steps = 0;
        while self.accumulator >= rate {
            self.accumulator -= rate;
            let _span = tracing::info_span!("stage_tick", tick = self.tick + 1).entered();
            self.step(rate as f32)?;
            steps += 1;
        }
        self.render(surface, renderer)?;
        Ok(steps)
    }

    /// Release every node's material and reset the registries.
    pub fn shutdown(&mut self) -> Result<(), SceneError> {
        for id in self.graph.children_of(None).to_vec() {
            self.destroy_node(id)?;
        }
        self.resources.reset(&mut self.bus);
        self.bus.clear();
        tracing::info!(ticks = self.tick, "stage shut down");
        Ok(())
    }
}
