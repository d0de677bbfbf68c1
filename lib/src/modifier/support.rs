//! Support detection and generation.
//!
//! Two modifiers cooperate: the detector finds the areas that overhang
//! more than the threshold angle and stores them on the layer where the
//! support column must end, and the generator grows those areas downwards
//! until they reach the bed or the model, splitting off the dense
//! interface layers on the way.

use super::LayerModifier;
use crate::clipper;
use crate::config::Options;
use crate::geometry::LayerParts;
use crate::slice::{LayerAttribute, PartitionedLayer};
use crate::{to_radians, Coord, Result};

/// Detects the regions that need support.
///
/// A face steeper than the threshold angle advances more than
/// `d = layer_thickness * tan(threshold)` per layer. Growing layer *n* by
/// `d` and subtracting it from layer *n+1* therefore leaves exactly the
/// areas that protrude too far. The result is enlarged by one and a half
/// pattern spacings on each side so even narrow regions catch at least two
/// fill lines, and is stored `top_gap_layers` further down as `support`.
pub struct SupportDetectorModifier<'o> {
    options: &'o Options,
}

impl<'o> SupportDetectorModifier<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self { options }
    }
}

impl LayerModifier for SupportDetectorModifier<'_> {
    fn name(&self) -> &'static str {
        "SupportDetector"
    }

    fn modify(&self, layers: &mut [PartitionedLayer]) -> Result<()> {
        let support = &self.options.print.support;
        if !support.enabled {
            return Ok(());
        }

        let thickness = self.options.print.layer_thickness as f64;
        let distance = (thickness * to_radians(support.threshold_angle).tan()).round() as Coord;
        let enlarge = support.pattern_spacing * 3 / 2;

        for layer_nr in 0..layers.len() {
            // The top layer has nothing above it, and results land
            // top_gap_layers below the detection layer.
            if layer_nr == layers.len() - 1 || layer_nr < support.top_gap_layers {
                continue;
            }

            let grown = clipper::offset_parts(layers[layer_nr].parts(), distance);
            let needed = clipper::difference(layers[layer_nr + 1].parts(), &grown)?;

            let needed = clipper::offset_parts(&needed, enlarge);

            if !needed.is_empty() {
                layers[layer_nr - support.top_gap_layers]
                    .set_attribute("support", LayerAttribute::Parts(needed));
            }
        }

        Ok(())
    }
}

/// Grows the detected support areas down to the bed.
///
/// Walking from the second topmost layer towards the bed, the support of
/// each layer is the union of everything still unsupported above plus the
/// areas detected for this layer, minus the model below grown by the
/// configured gap. The topmost `interface_layers` of every column are
/// recorded separately as `supportInterface`; the untrimmed column is kept
/// as `fullSupport` for the interface computation of the layers below.
pub struct SupportGeneratorModifier<'o> {
    options: &'o Options,
}

impl<'o> SupportGeneratorModifier<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self { options }
    }

    fn parts_or_empty(layer: &PartitionedLayer, name: &str) -> Result<LayerParts> {
        Ok(layer.parts_attribute(name)?.cloned().unwrap_or_default())
    }
}

impl LayerModifier for SupportGeneratorModifier<'_> {
    fn name(&self) -> &'static str {
        "SupportGenerator"
    }

    fn modify(&self, layers: &mut [PartitionedLayer]) -> Result<()> {
        let support = &self.options.print.support;
        if !support.enabled || layers.len() < 2 {
            return Ok(());
        }

        let mut last_support: Option<LayerParts> = None;

        // The topmost layer never needs support above it; each step
        // writes the support for the layer below the current one.
        for layer_nr in (1..=layers.len() - 2).rev() {
            let current = match last_support.take() {
                Some(parts) => parts,
                None => Self::parts_or_empty(&layers[layer_nr], "support")?,
            };
            let below = Self::parts_or_empty(&layers[layer_nr - 1], "support")?;

            if current.is_empty() && below.is_empty() {
                continue;
            }

            let combined = clipper::union(&current, &below)?;

            // Clearance so the support does not fuse with the model.
            let bigger_layer = clipper::offset_parts(layers[layer_nr - 1].parts(), support.gap);
            let actual = clipper::difference(&combined, &bigger_layer)?;

            // The interface is whatever carries no support this many
            // layers higher; everything else is the plain column body.
            let above_nr = (layer_nr + support.interface_layers - 1).min(layers.len() - 1);
            let above_interface = Self::parts_or_empty(&layers[above_nr], "fullSupport")?;

            let mut interface = clipper::difference(&actual, &above_interface)?;
            let mut body = clipper::difference(&actual, &interface)?;

            // Never print support over the brim.
            let brim = Self::parts_or_empty(&layers[layer_nr - 1], "brimOuterDimension")?;
            if !brim.is_empty() {
                interface = clipper::difference(&interface, &brim)?;
                body = clipper::difference(&body, &brim)?;
            }

            let target = &mut layers[layer_nr - 1];
            if !actual.is_empty() {
                target.set_attribute("fullSupport", LayerAttribute::Parts(actual.clone()));
            }
            if !interface.is_empty() {
                target.set_attribute("supportInterface", LayerAttribute::Parts(interface));
            }
            // Replace whatever the detector stored; an empty list removes
            // stale detection results.
            target.set_attribute("support", LayerAttribute::Parts(body));

            last_support = Some(actual);
        }

        Ok(())
    }
}
