//! Pipeline orchestration.
//!
//! [`Pipeline`] wires the stages together: read the model, optimize it,
//! slice it into layers, run the modifier chain and emit G-code. Stage
//! boundaries are synchronous; the two large artifacts (the optimized mesh
//! and the layer vector) are dropped as soon as the next stage finished
//! consuming them.

use crate::config::Options;
use crate::gcode::Generator;
use crate::mesh::{self, TriangleMesh};
use crate::modifier;
use crate::slice::Slicer;
use crate::Result;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Runs the full slicing pipeline for one model.
pub struct Pipeline {
    options: Options,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    /// Create a pipeline with the given options.
    pub fn new(options: Options) -> Self {
        Self {
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cooperative cancellation flag, checked between layers and stages.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Slice the STL file at `input` and write the G-code to `output`.
    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<()> {
        let start = Instant::now();
        self.options.validate()?;

        let mesh = mesh::load_stl(input.as_ref())?;
        info!(
            triangles = mesh.triangle_count(),
            "loaded {}",
            input.as_ref().display()
        );

        let gcode = self.slice_mesh(&mesh)?;

        fs::write(output.as_ref(), gcode)?;
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "wrote {}",
            output.as_ref().display()
        );
        Ok(())
    }

    /// Slice an in-memory mesh and return the G-code text.
    pub fn slice_mesh(&self, mesh: &TriangleMesh) -> Result<String> {
        self.options.validate()?;

        let model = mesh::optimize(mesh)?;
        info!(
            faces = model.face_count(),
            vertices = model.vertices.len(),
            "optimized model"
        );

        let mut layers = Slicer::new(&self.options).slice(&model, &self.cancel)?;
        info!(layers = layers.len(), "sliced model");

        let mut modifiers = modifier::default_modifiers(&self.options);
        modifier::run_modifiers(&mut modifiers, &model, &mut layers, &self.cancel)?;

        let gcode = Generator::new(&self.options).generate(&model, &layers, &self.cancel)?;
        Ok(gcode)
    }
}
