// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Render queue dispatch against an in-process kernel

use anyhow::{bail, Result};
use fabgraph::graph::{NodeKind, SHAPE_DATUM};
use fabgraph::kernel::{Artifact, ArtifactKind, GeometryKernel, RenderQueue, RenderResult};
use fabgraph::{DatumId, EngineConfig, Graph, RenderRegion, Snapshot};
use nalgebra::Point3;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::time::Duration;

/// Samples the mid-Z slice of the region into a one-byte-per-pixel mask
struct SliceKernel {
    renders: AtomicUsize,
}

impl GeometryKernel for SliceKernel {
    fn render(&self, snapshot: &Snapshot, region: &RenderRegion) -> Result<Artifact> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let expression = snapshot.expression()?;
        let [nx, ny, _] = region.resolution;
        let b = region.bounds;
        let z = (b.min.z + b.max.z) / 2.0;

        let mut data = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let x = b.min.x + (i as f64 + 0.5) / region.scale;
                let y = b.min.y + (j as f64 + 0.5) / region.scale;
                data.push(if expression.contains(&Point3::new(x, y, z)) { 255 } else { 0 });
            }
        }
        Ok(Artifact { kind: ArtifactKind::Raster, width: nx, height: ny, data })
    }
}

struct FailingKernel;

impl GeometryKernel for FailingKernel {
    fn render(&self, _: &Snapshot, _: &RenderRegion) -> Result<Artifact> {
        bail!("kernel offline")
    }
}

/// Blocks its first render until released
struct GatedKernel {
    gate: Arc<Barrier>,
    calls: AtomicUsize,
}

impl GeometryKernel for GatedKernel {
    fn render(&self, snapshot: &Snapshot, region: &RenderRegion) -> Result<Artifact> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.gate.wait();
        }
        Ok(Artifact {
            kind: ArtifactKind::Mesh,
            width: region.resolution[0],
            height: region.resolution[1],
            data: snapshot.formula.clone().into_bytes(),
        })
    }
}

fn single_threaded() -> EngineConfig {
    EngineConfig {
        render_threads: Some(1),
        ..EngineConfig::default()
    }
}

fn circle_node(graph: &mut Graph) -> DatumId {
    let c = graph.create(NodeKind::Circle, "").unwrap();
    let r = graph.get_datum(c, "r").unwrap();
    graph.set_formula(r, "2").unwrap();
    graph.get_datum(c, SHAPE_DATUM).unwrap()
}

#[test]
fn test_render_datum_through_queue() {
    let kernel = Arc::new(SliceKernel { renders: AtomicUsize::new(0) });
    let queue = RenderQueue::new(kernel.clone(), &single_threaded()).unwrap();
    assert_eq!(queue.threads(), 1);

    let mut graph = Graph::new();
    let shape = circle_node(&mut graph);
    let (tx, rx) = mpsc::channel();
    let generation = queue
        .submit_datum(&mut graph, shape, 5.0, move |datum, result: &RenderResult| {
            tx.send((datum, result.clone())).unwrap();
        })
        .unwrap()
        .unwrap();

    let (datum, result) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(datum, shape);
    assert_eq!(result.generation, generation);

    let artifact = result.artifact().unwrap();
    assert_eq!((artifact.width, artifact.height), (20, 20));
    // Center pixel is inside, corner is outside
    assert_eq!(artifact.data[10 * 20 + 10], 255);
    assert_eq!(artifact.data[0], 0);
    assert_eq!(kernel.renders.load(Ordering::SeqCst), 1);

    assert_eq!(queue.result(shape).unwrap().generation, generation);
    queue.forget(shape);
    assert!(queue.result(shape).is_none());
}

#[test]
fn test_kernel_errors_are_reported() {
    let queue = RenderQueue::new(Arc::new(FailingKernel), &single_threaded()).unwrap();
    let mut graph = Graph::new();
    let shape = circle_node(&mut graph);

    let (tx, rx) = mpsc::channel();
    queue
        .submit_datum(&mut graph, shape, 5.0, move |_, result| {
            tx.send(result.clone()).unwrap();
        })
        .unwrap();
    let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(result.artifact().is_none());
    assert_eq!(result.outcome.unwrap_err(), "kernel offline");
}

#[test]
fn test_unbounded_datum_is_not_submitted() {
    let queue = RenderQueue::new(Arc::new(FailingKernel), &single_threaded()).unwrap();
    let mut graph = Graph::new();
    let shape = circle_node(&mut graph);
    let c = graph.datum(shape).unwrap().node();

    let u = graph.create(NodeKind::Union, "").unwrap();
    let shapes = graph.get_datum(u, "shapes").unwrap();
    graph.set_formula(shapes, "~circle(0, 0, 1)").unwrap();
    let union_shape = graph.get_datum(u, SHAPE_DATUM).unwrap();

    let submitted = queue.submit_datum(&mut graph, union_shape, 5.0, |_, _| {}).unwrap();
    assert!(submitted.is_none());

    // Non-expression datums are a type error
    let r = graph.get_datum(c, "r").unwrap();
    assert!(queue.submit_datum(&mut graph, r, 5.0, |_, _| {}).is_err());
}

#[test]
fn test_newer_job_supersedes_queued_one() {
    let gate = Arc::new(Barrier::new(2));
    let kernel = Arc::new(GatedKernel { gate: gate.clone(), calls: AtomicUsize::new(0) });
    let queue = RenderQueue::new(kernel.clone(), &single_threaded()).unwrap();
    let config = EngineConfig::default();

    let mut graph = Graph::new();
    let blocker = circle_node(&mut graph);
    let target = circle_node(&mut graph);

    let snapshot = graph.snapshot(target).unwrap();
    let region = RenderRegion::from_snapshot(&snapshot, 2.0, &config).unwrap();
    let (tx, rx) = mpsc::channel();

    // Occupy the only worker so the next two jobs queue up behind it
    let blocked = queue.submit(blocker, snapshot.clone(), region, |_, _| {});
    let tx_old = tx.clone();
    let old = queue.submit(target, snapshot.clone(), region, move |_, r| {
        tx_old.send(r.generation).unwrap();
    });
    let new = queue.submit(target, snapshot, region, move |_, r| {
        tx.send(r.generation).unwrap();
    });
    assert!(blocked < old && old < new);
    gate.wait();

    assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), new);
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(queue.result(target).unwrap().generation, new);
    assert_eq!(kernel.calls.load(Ordering::SeqCst), 2);
}
