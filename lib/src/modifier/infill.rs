//! Solid skin and internal infill region computation.

use super::LayerModifier;
use crate::clipper;
use crate::config::Options;
use crate::geometry::LayerParts;
use crate::slice::{LayerAttribute, PartitionedLayer};
use crate::Result;

/// Extract the area enclosed by the innermost perimeter wall of a layer.
///
/// Missing perimeters read as an empty region.
fn innermost_walls(layer: &PartitionedLayer) -> Result<LayerParts> {
    let Some(insets) = layer.insets_attribute("perimeters")? else {
        return Ok(Vec::new());
    };

    let mut interior = LayerParts::new();
    for part_walls in insets {
        if let Some(last_wall) = part_walls.last() {
            interior.extend(last_wall.iter().cloned());
        }
    }
    Ok(interior)
}

/// Intersect the interiors of a window of layers.
///
/// A window reaching past the stack (below the bed or above the top) has
/// an empty intersection, which is what makes the outermost layers fully
/// solid.
fn window_intersection(
    interiors: &[LayerParts],
    range: impl Iterator<Item = i64>,
) -> Result<LayerParts> {
    let mut acc: Option<LayerParts> = None;

    for nr in range {
        if nr < 0 || nr as usize >= interiors.len() {
            return Ok(Vec::new());
        }
        let current = &interiors[nr as usize];
        acc = Some(match acc {
            None => current.clone(),
            Some(prev) => clipper::intersection(&prev, current)?,
        });
        if matches!(&acc, Some(parts) if parts.is_empty()) {
            return Ok(Vec::new());
        }
    }

    Ok(acc.unwrap_or_default())
}

/// Computes the solid top and bottom skin regions.
///
/// For layer *n* the bottom skin is the interior of the innermost
/// perimeter minus whatever the `bottom_layers` layers below all provide,
/// and the top skin is the interior minus whatever the `top_layers` layers
/// above all provide. Near the bed and the ceiling the window leaves the
/// stack and the whole interior becomes solid; above an overhang the
/// uncovered area does the same. Results are stored inset by half a line
/// width as `bottom` and `top`.
pub struct InfillModifier<'o> {
    options: &'o Options,
}

impl<'o> InfillModifier<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self { options }
    }
}

impl LayerModifier for InfillModifier<'_> {
    fn name(&self) -> &'static str {
        "Infill"
    }

    fn modify(&self, layers: &mut [PartitionedLayer]) -> Result<()> {
        let half_width = self.options.printer.extrusion_width / 2;
        let top_layers = self.options.print.top_layers as i64;
        let bottom_layers = self.options.print.bottom_layers as i64;

        let interiors: Vec<LayerParts> = layers
            .iter()
            .map(innermost_walls)
            .collect::<Result<_>>()?;

        for nr in 0..layers.len() {
            let n = nr as i64;
            let interior = &interiors[nr];
            if interior.is_empty() {
                continue;
            }

            let bottom = if bottom_layers == 0 {
                Vec::new()
            } else {
                let below = window_intersection(&interiors, n - bottom_layers..n)?;
                clipper::difference(interior, &below)?
            };

            let top = if top_layers == 0 {
                Vec::new()
            } else {
                let above = window_intersection(&interiors, n + 1..=n + top_layers)?;
                clipper::difference(interior, &above)?
            };

            let layer = &mut layers[nr];
            if !bottom.is_empty() {
                let bottom = clipper::offset_parts(&bottom, -half_width);
                layer.set_attribute("bottom", LayerAttribute::Parts(bottom));
            }
            if !top.is_empty() {
                let top = clipper::offset_parts(&top, -half_width);
                layer.set_attribute("top", LayerAttribute::Parts(top));
            }
        }

        Ok(())
    }
}

/// Computes the sparse internal infill region.
///
/// The region is the innermost perimeter interior minus the solid top and
/// bottom skins of the same layer, stored as `infill`.
pub struct InternalInfillModifier<'o> {
    options: &'o Options,
}

impl<'o> InternalInfillModifier<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self { options }
    }
}

impl LayerModifier for InternalInfillModifier<'_> {
    fn name(&self) -> &'static str {
        "InternalInfill"
    }

    fn modify(&self, layers: &mut [PartitionedLayer]) -> Result<()> {
        let half_width = self.options.printer.extrusion_width / 2;

        for layer in layers.iter_mut() {
            let interior = innermost_walls(layer)?;
            if interior.is_empty() {
                continue;
            }
            // The skins are stored half a line width smaller; shrink the
            // interior the same way so the difference leaves no sliver.
            let interior = clipper::offset_parts(&interior, -half_width);

            let mut region = interior;
            if let Some(bottom) = layer.parts_attribute("bottom")? {
                region = clipper::difference(&region, bottom)?;
            }
            if let Some(top) = layer.parts_attribute("top")? {
                region = clipper::difference(&region, top)?;
            }

            if !region.is_empty() {
                layer.set_attribute("infill", LayerAttribute::Parts(region));
            }
        }

        Ok(())
    }
}
