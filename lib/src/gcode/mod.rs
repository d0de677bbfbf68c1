//! G-code generation.
//!
//! The generator walks the annotated layers once, calling a fixed sequence
//! of renderers for each layer. The default sequence prints, per layer:
//! bookkeeping, skirt, brim, perimeters, support, support interface,
//! bottom skin, top skin, internal infill, and the end sequence.

mod builder;
mod renderer;

pub use builder::Builder;
pub use renderer::{Brim, Infill, PatternFactory, Perimeter, PostLayer, PreLayer, Renderer, Skirt};

use crate::clipper::LinearPattern;
use crate::config::Options;
use crate::geometry::Point;
use crate::mesh::OptimizedModel;
use crate::slice::PartitionedLayer;
use crate::{Coord, Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Generates G-code from annotated layers through a renderer sequence.
pub struct Generator<'o> {
    options: &'o Options,
    renderers: Vec<Box<dyn Renderer>>,
}

impl<'o> Generator<'o> {
    /// Create a generator with the default renderer sequence.
    pub fn new(options: &'o Options) -> Self {
        let width = options.printer.extrusion_width;
        let spacing = options.print.support.pattern_spacing;
        let rotation = options.print.infill_rotation_degree;
        let infill_percent = options.print.infill_percent;
        let infill_zigzag = options.print.infill_zigzag;
        let overlap = options.print.infill_overlap_percent;

        let top_bottom_pattern = move || -> PatternFactory {
            Box::new(move |min: Point, max: Point| {
                Some(LinearPattern::new(
                    width, width, min, max, rotation, true, false,
                ))
            })
        };

        // Support patterns work on a box grown by one spacing so even the
        // narrowest region catches at least two lines.
        let support_pattern = move |line_spacing: Coord,
                                    rotation_deg: f64|
              -> PatternFactory {
            Box::new(move |min: Point, max: Point| {
                let min = Point::new(min.x - spacing, min.y - spacing);
                let max = Point::new(max.x + spacing, max.y + spacing);
                Some(LinearPattern::new(
                    width,
                    line_spacing,
                    min,
                    max,
                    rotation_deg,
                    false,
                    true,
                ))
            })
        };

        let renderers: Vec<Box<dyn Renderer>> = vec![
            Box::new(PreLayer),
            Box::new(Skirt),
            Box::new(Brim),
            Box::new(Perimeter),
            Box::new(Infill {
                attr_name: "support",
                comments: &["TYPE:SUPPORT"],
                pattern_setup: support_pattern(spacing, 90.0),
                overlap_percent: 0,
            }),
            // The interface is rotated 90° to the support body and packed
            // without spacing between the lines.
            Box::new(Infill {
                attr_name: "supportInterface",
                comments: &["TYPE:SUPPORT"],
                pattern_setup: support_pattern(width, 0.0),
                overlap_percent: 0,
            }),
            Box::new(Infill {
                attr_name: "bottom",
                comments: &["TYPE:FILL", "BOTTOM-FILL"],
                pattern_setup: top_bottom_pattern(),
                overlap_percent: overlap,
            }),
            Box::new(Infill {
                attr_name: "top",
                comments: &["TYPE:FILL", "TOP-FILL"],
                pattern_setup: top_bottom_pattern(),
                overlap_percent: overlap,
            }),
            Box::new(Infill {
                attr_name: "infill",
                comments: &["TYPE:FILL", "INTERNAL-FILL"],
                pattern_setup: Box::new(move |min: Point, max: Point| {
                    if infill_percent == 0 {
                        return None;
                    }
                    // Scale the line spacing so the requested share of a
                    // 10mm span is covered by extruded lines.
                    let line_spacing = width * 100 / infill_percent;
                    Some(LinearPattern::new(
                        width,
                        line_spacing,
                        min,
                        max,
                        rotation,
                        true,
                        infill_zigzag,
                    ))
                }),
                overlap_percent: overlap,
            }),
            Box::new(PostLayer),
        ];

        Self { options, renderers }
    }

    /// Replace the renderer sequence.
    pub fn with_renderers(mut self, renderers: Vec<Box<dyn Renderer>>) -> Self {
        self.renderers = renderers;
        self
    }

    /// Generate the G-code for the given layers.
    ///
    /// The emitter is strictly serial; the cancellation flag is checked
    /// between layers.
    pub fn generate(
        &mut self,
        model: &OptimizedModel,
        layers: &[PartitionedLayer],
        cancel: &AtomicBool,
    ) -> Result<String> {
        for renderer in &mut self.renderers {
            renderer.init(model);
        }

        let mut b = Builder::new();
        let max_layer = layers.len().saturating_sub(1);

        for (layer_nr, layer) in layers.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }

            let z = self.options.print.initial_layer_thickness
                + layer_nr as Coord * self.options.print.layer_thickness;

            for renderer in &self.renderers {
                renderer
                    .render(&mut b, layer_nr, max_layer, layer, z, self.options)
                    .map_err(|e| annotate_layer(e, layer_nr))?;
            }
        }

        debug!(layers = layers.len(), "generated G-code");
        Ok(b.finish())
    }
}

fn annotate_layer(e: Error, nr: usize) -> Error {
    match e {
        Error::Geometry(msg) => Error::Geometry(format!("layer {nr}: {msg}")),
        Error::Attribute(msg) => Error::Attribute(format!("layer {nr}: {msg}")),
        other => other,
    }
}
