//! Layer modifiers.
//!
//! A modifier annotates the sliced layers with the geometry one pipeline
//! stage needs: perimeter walls, solid skins, internal infill regions,
//! brim rings and support areas. Modifiers run in a fixed order and
//! communicate exclusively through the layers' attribute maps, so each one
//! may read everything its predecessors wrote.

mod brim;
mod infill;
mod perimeter;
mod support;

pub use brim::BrimModifier;
pub use infill::{InfillModifier, InternalInfillModifier};
pub use perimeter::PerimeterModifier;
pub use support::{SupportDetectorModifier, SupportGeneratorModifier};

use crate::config::Options;
use crate::mesh::OptimizedModel;
use crate::slice::PartitionedLayer;
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// A single step of the modifier chain.
pub trait LayerModifier {
    /// Called once with the optimized model before any layer is modified.
    fn init(&mut self, _model: &OptimizedModel) {}

    /// Annotate the layers. Modifiers write their results into the layer
    /// attribute maps; a failure aborts the whole pipeline.
    fn modify(&self, layers: &mut [PartitionedLayer]) -> Result<()>;

    /// Name of the modifier, used in error reports.
    fn name(&self) -> &'static str;
}

/// Build the default modifier chain in its required order.
pub fn default_modifiers(options: &Options) -> Vec<Box<dyn LayerModifier + '_>> {
    vec![
        Box::new(PerimeterModifier::new(options)),
        Box::new(InfillModifier::new(options)),
        Box::new(InternalInfillModifier::new(options)),
        Box::new(BrimModifier::new(options)),
        Box::new(SupportDetectorModifier::new(options)),
        Box::new(SupportGeneratorModifier::new(options)),
    ]
}

/// Run a modifier chain over the layers.
///
/// The cancellation flag is checked between modifiers. Errors are
/// annotated with the failing modifier's name.
pub fn run_modifiers(
    modifiers: &mut [Box<dyn LayerModifier + '_>],
    model: &OptimizedModel,
    layers: &mut [PartitionedLayer],
    cancel: &AtomicBool,
) -> Result<()> {
    for modifier in modifiers {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        debug!(modifier = modifier.name(), "running modifier");
        modifier.init(model);
        modifier
            .modify(layers)
            .map_err(|e| annotate(e, modifier.name()))?;
    }
    Ok(())
}

fn annotate(e: Error, stage: &str) -> Error {
    match e {
        Error::Geometry(msg) => Error::Geometry(format!("{stage}: {msg}")),
        Error::Attribute(msg) => Error::Attribute(format!("{stage}: {msg}")),
        other => other,
    }
}
