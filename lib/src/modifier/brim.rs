//! Brim generation.

use super::LayerModifier;
use crate::clipper;
use crate::config::Options;
use crate::geometry::{LayerPart, LayerParts};
use crate::slice::{LayerAttribute, PartitionedLayer};
use crate::Result;

/// Generates the brim rings on the first layer.
///
/// The configured number of rings is offset outwards from the outer
/// contours, one extrusion width apart, starting half a width outside the
/// contour. The rings are stored as `brim` (`[part][ring][subpart]`); the
/// outermost ring additionally lands in `brimOuterDimension` as the filled
/// area the support generator and the skirt keep clear of.
pub struct BrimModifier<'o> {
    options: &'o Options,
}

impl<'o> BrimModifier<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self { options }
    }
}

impl LayerModifier for BrimModifier<'_> {
    fn name(&self) -> &'static str {
        "Brim"
    }

    fn modify(&self, layers: &mut [PartitionedLayer]) -> Result<()> {
        let count = self.options.print.brim_count;
        if count == 0 || layers.is_empty() {
            return Ok(());
        }

        let width = self.options.printer.extrusion_width;
        let layer = &mut layers[0];

        // Brim follows the outer contours only; holes stay untouched.
        let outlines: LayerParts = layer
            .parts()
            .iter()
            .map(|part| LayerPart::new(part.outline.clone()))
            .collect();

        let rings = clipper::inset_layer(&outlines, width, count, width / 2);

        let outer_dimension: LayerParts = rings
            .iter()
            .filter_map(|per_part| per_part.last())
            .flat_map(|subparts| subparts.iter().cloned())
            .collect();

        layer.set_attribute("brim", LayerAttribute::Insets(rings));
        if !outer_dimension.is_empty() {
            layer.set_attribute("brimOuterDimension", LayerAttribute::Parts(outer_dimension));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::modified_layers;
    use crate::config::Options;
    use crate::mesh::TriangleMesh;

    #[test]
    fn test_brim_ring_count_and_spacing() {
        let mut options = Options::default();
        options.print.brim_count = 3;
        let layers = modified_layers(&TriangleMesh::cube(10.0), &options);

        let rings = layers[0].insets_attribute("brim").unwrap().unwrap();
        assert_eq!(rings.len(), 1); // one part
        assert_eq!(rings[0].len(), 3); // three rings

        // Ring centerlines sit at 10.4, 11.2 and 12.0mm on a side
        // (half a width plus one width per ring outside the 10mm square).
        for (ring_nr, subparts) in rings[0].iter().enumerate() {
            assert_eq!(subparts.len(), 1);
            let side = 10_000.0 + 400.0 + 800.0 * ring_nr as f64;
            assert!(
                (subparts[0].area() - side * side).abs() < 500_000.0,
                "ring {ring_nr}: area {}",
                subparts[0].area()
            );
        }

        // Only the first layer carries a brim.
        assert!(!layers[1].has_attribute("brim"));
    }

    #[test]
    fn test_no_brim_by_default() {
        let options = Options::default();
        let layers = modified_layers(&TriangleMesh::cube(10.0), &options);
        assert!(!layers[0].has_attribute("brim"));
    }
}
