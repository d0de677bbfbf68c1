//! Perimeter wall generation.

use super::LayerModifier;
use crate::clipper;
use crate::config::Options;
use crate::slice::{LayerAttribute, PartitionedLayer};
use crate::Result;
use rayon::prelude::*;

/// Computes the perimeter walls of every part.
///
/// The result is stored as the attribute `perimeters`, indexed
/// `[part][wall][subpart]`. Wall 0 is the outermost perimeter, centered
/// half a line width inside the contour; every further wall steps inwards
/// by one line width.
pub struct PerimeterModifier<'o> {
    options: &'o Options,
}

impl<'o> PerimeterModifier<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self { options }
    }
}

impl LayerModifier for PerimeterModifier<'_> {
    fn name(&self) -> &'static str {
        "Perimeter"
    }

    fn modify(&self, layers: &mut [PartitionedLayer]) -> Result<()> {
        let width = self.options.printer.extrusion_width;
        let count = self.options.print.inset_count;

        // Layers are independent here.
        layers.par_iter_mut().for_each(|layer| {
            let insets = clipper::inset_layer(layer.parts(), -width, count, -width / 2);
            layer.set_attribute("perimeters", LayerAttribute::Insets(insets));
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::modified_layers;
    use crate::config::Options;
    use crate::mesh::TriangleMesh;

    #[test]
    fn test_cube_perimeter_walls() {
        let options = Options::default(); // 400µm width, 2 walls
        let layers = modified_layers(&TriangleMesh::cube(10.0), &options);

        for layer in &layers {
            let insets = layer.insets_attribute("perimeters").unwrap().unwrap();
            assert_eq!(insets.len(), 1); // one part
            assert_eq!(insets[0].len(), 2); // two walls

            // Outermost wall: 10mm - 2 * 0.2mm = 9.6mm square centerline
            let outer = &insets[0][0][0];
            assert!((outer.area() - 9_600.0 * 9_600.0).abs() < 300_000.0);

            // Walls shrink strictly inwards
            let inner = &insets[0][1][0];
            assert!(inner.area() < outer.area());
        }
    }

    #[test]
    fn test_hole_walls_follow_holes() {
        let options = Options::default();
        let layers = modified_layers(&TriangleMesh::cube_with_hole(10.0, 2.0, 16), &options);

        let insets = layers[10].insets_attribute("perimeters").unwrap().unwrap();
        // Every wall of the holed part keeps its hole ring
        for wall in &insets[0] {
            for sub in wall {
                assert!(sub.has_holes());
            }
        }
    }
}
