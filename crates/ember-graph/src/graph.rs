//! Pass graph with dependency-ordered execution.
//!
//! The depth pyramids must be complete before the cascade kernel reads them,
//! and the cascade buffer must be complete before either combine path runs.
//! Those dependencies are explicit edges here rather than submission-order
//! luck: a pass reading a resource is ordered after the pass writing it.

use crate::pass::{PassContext, PassResourceBuilder, RenderPass};
use crate::resource::{ResourceHandle, ResourcePool};
use ember_core::{EmberError, FrameInputs, RadianceSettings, Result, Viewport};
use std::collections::{HashMap, VecDeque};

struct PassNode {
    pass: Box<dyn RenderPass>,
    reads: Vec<ResourceHandle>,
    writes: Vec<ResourceHandle>,
}

/// Ordered collection of passes recorded onto one command encoder per frame.
pub struct RenderGraph {
    passes: Vec<PassNode>,
    execution_order: Vec<usize>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self { passes: Vec::new(), execution_order: Vec::new() }
    }

    pub fn add_pass(&mut self, pass: impl RenderPass + 'static) {
        let mut builder = PassResourceBuilder::default();
        pass.declare_resources(&mut builder);
        self.passes.push(PassNode {
            pass: Box::new(pass),
            reads: builder.reads,
            writes: builder.writes,
        });
    }

    /// Resolve dependencies into an execution order. Fails on cyclic
    /// resource declarations.
    pub fn build(&mut self) -> Result<()> {
        log::info!("building pass graph with {} passes", self.passes.len());

        // Collect all writers first so ordering is independent of the order
        // passes were registered in.
        let mut writers: HashMap<ResourceHandle, usize> = HashMap::new();
        for (i, node) in self.passes.iter().enumerate() {
            for &resource in &node.writes {
                writers.insert(resource, i);
            }
        }

        let mut in_degree = vec![0usize; self.passes.len()];
        let mut adjacent: Vec<Vec<usize>> = vec![Vec::new(); self.passes.len()];
        for (i, node) in self.passes.iter().enumerate() {
            for &resource in &node.reads {
                if let Some(&writer) = writers.get(&resource) {
                    if writer != i {
                        adjacent[writer].push(i);
                        in_degree[i] += 1;
                    }
                }
            }
        }

        // Kahn's algorithm, FIFO so ties keep insertion order.
        let mut queue: VecDeque<usize> =
            (0..self.passes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.passes.len());
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &next in &adjacent[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() != self.passes.len() {
            return Err(EmberError::Graph(
                "cyclic resource dependency between passes".to_string(),
            ));
        }

        for (i, &idx) in order.iter().enumerate() {
            log::debug!("  pass {}: {}", i, self.passes[idx].pass.name());
        }
        self.execution_order = order;
        Ok(())
    }

    /// Names of the passes in resolved execution order.
    pub fn execution_order(&self) -> Vec<&str> {
        self.execution_order
            .iter()
            .map(|&idx| self.passes[idx].pass.name())
            .collect()
    }

    /// Run every pass's `prepare`, in execution order.
    pub fn prepare(&mut self, device: &wgpu::Device, pool: &mut ResourcePool, viewport: Viewport) -> Result<()> {
        for &idx in &self.execution_order {
            self.passes[idx].pass.prepare(device, pool, viewport)?;
        }
        Ok(())
    }

    /// Record every pass, in execution order, onto one encoder.
    pub fn record(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameInputs,
        settings: &RadianceSettings,
        pool: &ResourcePool,
    ) -> Result<()> {
        for &idx in &self.execution_order {
            let node = &mut self.passes[idx];
            log::trace!("recording pass: {}", node.pass.name());
            let mut ctx = PassContext { device, queue, encoder, frame, settings, pool };
            node.pass.record(&mut ctx)?;
        }
        Ok(())
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubPass {
        name: &'static str,
        reads: Vec<ResourceHandle>,
        writes: Vec<ResourceHandle>,
    }

    impl RenderPass for StubPass {
        fn name(&self) -> &str {
            self.name
        }

        fn declare_resources(&self, builder: &mut PassResourceBuilder) {
            for &r in &self.reads {
                builder.reads(r);
            }
            for &w in &self.writes {
                builder.writes(w);
            }
        }

        fn record(&mut self, _ctx: &mut PassContext) -> Result<()> {
            Ok(())
        }
    }

    fn h(name: &str) -> ResourceHandle {
        ResourceHandle::named(name)
    }

    #[test]
    fn readers_follow_writers_regardless_of_registration_order() {
        let mut graph = RenderGraph::new();
        graph.add_pass(StubPass { name: "combine", reads: vec![h("cascade")], writes: vec![] });
        graph.add_pass(StubPass { name: "cascade", reads: vec![h("hiz")], writes: vec![h("cascade")] });
        graph.add_pass(StubPass { name: "hiz", reads: vec![], writes: vec![h("hiz")] });
        graph.build().unwrap();
        assert_eq!(graph.execution_order(), vec!["hiz", "cascade", "combine"]);
    }

    #[test]
    fn cycle_is_a_graph_error() {
        let mut graph = RenderGraph::new();
        graph.add_pass(StubPass { name: "a", reads: vec![h("y")], writes: vec![h("x")] });
        graph.add_pass(StubPass { name: "b", reads: vec![h("x")], writes: vec![h("y")] });
        assert!(matches!(graph.build(), Err(EmberError::Graph(_))));
    }
}
