// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Bridge to the external geometry kernel
//!
//! The graph hands the kernel a [`Snapshot`] (prefix formula plus bounds) and
//! a [`RenderRegion`]; rendering runs on a worker pool and the resulting
//! [`Artifact`] comes back through a callback, keyed by the originating datum.

use crate::config::EngineConfig;
use crate::error::EvalError;
use crate::geometry::{Bounds, Expression, Formula, PrefixError};
use crate::graph::{DatumId, Graph};
use anyhow::{Context, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Materialized expression: everything a kernel needs, nothing it can mutate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Prefix-notation formula over X, Y and Z
    pub formula: String,
    pub bounds: Bounds,
}

impl Snapshot {
    pub fn of(expression: &Expression) -> Self {
        Self {
            formula: expression.to_prefix(),
            bounds: *expression.bounds(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize snapshot")
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse snapshot")
    }

    /// Rebuild the expression from its prefix form
    pub fn expression(&self) -> Result<Expression, PrefixError> {
        Formula::from_prefix(&self.formula).map(|f| Expression::new(f, self.bounds))
    }
}

/// Sampling box and per-axis voxel counts for one render
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderRegion {
    pub bounds: Bounds,
    /// Voxels per model unit, after any reduction to respect the voxel cap
    pub scale: f64,
    pub resolution: [usize; 3],
}

impl RenderRegion {
    /// Derive a region from expression bounds.
    ///
    /// Returns `None` when X or Y is unbounded, the box is empty or `scale` is
    /// not a finite positive number. An
    /// unbounded Z is replaced by a slab `flat_depth` thick around zero.
    pub fn new(bounds: &Bounds, scale: f64, config: &EngineConfig) -> Option<Self> {
        if !scale.is_finite() || scale <= 0.0 || bounds.is_empty() || !bounds.has_xy_extent() {
            return None;
        }
        let mut bounds = *bounds;
        if !(bounds.min.z.is_finite() && bounds.max.z.is_finite()) {
            let half = config.flat_depth.max(0.0) / 2.0;
            bounds = bounds.with_z(-half, half);
        }

        let max_voxels = config.max_voxels.max(1);
        let mut scale = scale;
        loop {
            let resolution = Self::resolution(&bounds, scale);
            let count = Self::count(resolution);
            if count <= max_voxels {
                return Some(Self { bounds, scale, resolution });
            }
            let shrink = (max_voxels as f64 / count as f64).cbrt().min(0.95);
            scale *= shrink;
        }
    }

    pub fn from_snapshot(snapshot: &Snapshot, scale: f64, config: &EngineConfig) -> Option<Self> {
        Self::new(&snapshot.bounds, scale, config)
    }

    fn resolution(bounds: &Bounds, scale: f64) -> [usize; 3] {
        let size = bounds.size();
        [0, 1, 2].map(|i| ((size[i] * scale).ceil() as usize).max(1))
    }

    fn count(resolution: [usize; 3]) -> u64 {
        resolution.iter().fold(1u64, |acc, &n| acc.saturating_mul(n as u64))
    }

    pub fn voxel_count(&self) -> u64 {
        Self::count(self.resolution)
    }

    /// True when the region is a single voxel thick in Z
    pub fn is_flat(&self) -> bool {
        self.resolution[2] == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Raster,
    Mesh,
    Toolpath,
}

/// Kernel output, forwarded to the caller uninterpreted
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

/// The external renderer/mesher
pub trait GeometryKernel: Send + Sync {
    fn render(&self, snapshot: &Snapshot, region: &RenderRegion) -> Result<Artifact>;
}

/// Outcome of one render job
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub generation: u64,
    pub region: RenderRegion,
    /// The artifact, or the kernel's error message
    pub outcome: std::result::Result<Arc<Artifact>, String>,
}

impl RenderResult {
    pub fn artifact(&self) -> Option<&Artifact> {
        self.outcome.as_ref().ok().map(Arc::as_ref)
    }
}

/// Thread-safe result store
pub type ResultCache = Arc<DashMap<DatumId, RenderResult>>;

/// Dispatches render jobs to a worker pool.
///
/// Each datum keeps only its newest job: a job that finds a newer generation
/// registered for its datum is dropped without rendering or reporting.
pub struct RenderQueue {
    pool: rayon::ThreadPool,
    kernel: Arc<dyn GeometryKernel>,
    results: ResultCache,
    generations: Arc<DashMap<DatumId, u64>>,
    next_generation: AtomicU64,
}

impl RenderQueue {
    pub fn new(kernel: Arc<dyn GeometryKernel>, config: &EngineConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.render_threads.unwrap_or(0))
            .thread_name(|i| format!("fabgraph-render-{i}"))
            .build()
            .context("Failed to build render thread pool")?;
        Ok(Self {
            pool,
            kernel,
            results: Arc::new(DashMap::new()),
            generations: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(1),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue a render; `callback` runs on a worker once the result is stored
    pub fn submit(
        &self,
        datum: DatumId,
        snapshot: Snapshot,
        region: RenderRegion,
        callback: impl FnOnce(DatumId, &RenderResult) + Send + 'static,
    ) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.generations.insert(datum, generation);
        debug!(datum = %datum, generation, voxels = region.voxel_count(), "Render queued");

        let snapshot = Arc::new(snapshot);
        let kernel = Arc::clone(&self.kernel);
        let results = Arc::clone(&self.results);
        let generations = Arc::clone(&self.generations);

        self.pool.spawn(move || {
            if generations.get(&datum).map(|g| *g) != Some(generation) {
                trace!(datum = %datum, generation, "Render superseded before start");
                return;
            }
            let outcome = match kernel.render(&snapshot, &region) {
                Ok(artifact) => Ok(Arc::new(artifact)),
                Err(err) => {
                    warn!(datum = %datum, generation, "Render failed: {:#}", err);
                    Err(format!("{:#}", err))
                }
            };
            let result = RenderResult { generation, region, outcome };
            if !store_current(&generations, &results, datum, &result) {
                trace!(datum = %datum, generation, "Render superseded");
                return;
            }
            callback(datum, &result);
        });
        generation
    }

    /// Snapshot an Expression datum and queue it at `scale`.
    ///
    /// Returns `Ok(None)` when the datum's bounds cannot be rendered.
    pub fn submit_datum(
        &self,
        graph: &mut Graph,
        datum: DatumId,
        scale: f64,
        callback: impl FnOnce(DatumId, &RenderResult) + Send + 'static,
    ) -> std::result::Result<Option<u64>, EvalError> {
        let snapshot = graph.snapshot(datum)?;
        let Some(region) = RenderRegion::from_snapshot(&snapshot, scale, graph.config()) else {
            debug!(datum = %datum, "Bounds not renderable");
            return Ok(None);
        };
        Ok(Some(self.submit(datum, snapshot, region, callback)))
    }

    /// Latest stored result for a datum
    pub fn result(&self, datum: DatumId) -> Option<RenderResult> {
        self.results.get(&datum).map(|r| r.clone())
    }

    /// Drop a datum's stored result, e.g. after its node is deleted
    pub fn forget(&self, datum: DatumId) {
        self.generations.remove(&datum);
        self.results.remove(&datum);
    }
}

/// Store `result` only if its generation is still the newest for `datum`.
///
/// The generation entry stays read-locked until the insert finishes, so a
/// concurrent `submit` or `forget` for the same datum waits for the store.
fn store_current(
    generations: &DashMap<DatumId, u64>,
    results: &DashMap<DatumId, RenderResult>,
    datum: DatumId,
    result: &RenderResult,
) -> bool {
    let Some(newest) = generations.get(&datum) else {
        return false;
    };
    if *newest != result.generation {
        return false;
    }
    results.insert(datum, result.clone());
    true
}
