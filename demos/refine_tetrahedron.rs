//! Refine a single tetrahedron towards a point and print a summary.
//!
//! Run with `cargo run --example refine_tetrahedron`.

use simplex_refine::prelude::*;
use simplex_refine::topology::validation::validate_mesh;

fn main() -> Result<(), MeshError> {
    let mut mesh = InMemoryMesh::new();
    let o = mesh.add_node([0.0, 0.0, 0.0])?;
    let x = mesh.add_node([2.0, 0.0, 0.0])?;
    let y = mesh.add_node([0.0, 2.0, 0.0])?;
    let z = mesh.add_node([0.0, 0.0, 2.0])?;
    mesh.add_elem(Elem::tetrahedron([o, x, y, z])?.with_subdomain(1))?;

    let focus = Point::new_3d(0.1, 0.1, 0.1);
    let options = RefineOptions {
        desired_volume: 0.05,
        check_invariants: true,
        ..RefineOptions::default()
    };
    let mut refiner = SimplexRefiner::with_options(&mut mesh, options)?;
    refiner.set_desired_volume_function(move |p: &Point| 1e-3 + 0.05 * p.distance(&focus));
    let summary = refiner.refine_elements_with_summary()?;

    println!(
        "{} passes, {} splits: +{} nodes, +{} / -{} elements",
        summary.passes,
        summary.splits,
        summary.nodes_added,
        summary.elems_added,
        summary.elems_removed
    );
    validate_mesh(&mesh)?;
    let smallest = mesh
        .elems()
        .map(|(id, _)| mesh.elem_volume(id))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .fold(f64::INFINITY, f64::min);
    println!(
        "{} nodes, {} elements, total volume {:.6}, smallest element {smallest:.3e}",
        mesh.n_nodes(),
        mesh.n_elems(),
        mesh.total_volume()?
    );
    Ok(())
}
