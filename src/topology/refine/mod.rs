//! Volume-driven bisection refinement of simplicial meshes.
//!
//! # Expected invariants
//! - The input mesh is conforming: neighbors share whole edges and faces.
//! - Every element has a strictly positive volume (triangles in the XY plane
//!   are counter-clockwise, tetrahedra positively oriented).
//! - Callers serialize access: a [`SimplexRefiner`] holds `&mut` to the mesh
//!   for its whole lifetime.
//!
//! # Algorithm
//! Each pass walks a snapshot of the element ids. An element is bisected
//! when it exceeds its target volume or when one of its edges was already
//! split earlier in the pass. In both cases it splits its own longest edge
//! (longest-edge propagation): edges are ordered by exact length and equal
//! lengths fall back to the smaller [`EdgeKey`]. Children are evaluated
//! depth-first before the walk moves on, so an element keeps bisecting until
//! none of its descendants holds a split edge. When an edge is split for the
//! first time its other live incident elements are scheduled too. Since every
//! face is always cut at its own longest edge, both sides of a shared face
//! end up with the same subdivision and each pass commits a conforming mesh.
//!
//! New nodes, new elements and removals are buffered and handed to
//! [`SimplexMesh::commit`] in one batch once the walk is done; any error
//! drops the buffer instead. With
//! [`check_invariants`](RefineOptions::check_invariants) set, the committed
//! mesh is then checked through [`DebugInvariants`] and
//! [`validate_face_conformity`] against the boundary taken before the pass.
//!
//! Passes repeat until one performs no split.

pub mod bisect;
pub mod registry;

use crate::adapt::{VolumeField, VolumeMetric};
use crate::debug_invariants::DebugInvariants;
use crate::geometry::metrics::{check_positive_volume, simplex_volume};
use crate::geometry::point::Point;
use crate::mesh_error::{MeshError, RefinementCap};
use crate::topology::elem::Elem;
use crate::topology::mesh::{RefinementBatch, SimplexMesh};
use crate::topology::point::{PointId, PointIdAllocator};
use crate::topology::validation::{boundary_facets, validate_face_conformity};
use bisect::bisect;
use hashbrown::{HashMap, HashSet};
use registry::{EdgeKey, EdgeRegistry, MidpointLookup};
use serde::{Deserialize, Serialize};

/// Settings for [`SimplexRefiner`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineOptions {
    /// Scalar desired element volume; 0 disables the scalar constraint.
    pub desired_volume: f64,
    /// Maximum number of passes; a last pass that still splits is an error.
    pub max_passes: usize,
    /// Maximum successive bisections of one element within a pass.
    pub max_depth: usize,
    /// Relative slack before an element counts as too large.
    pub relative_tolerance: f64,
    /// Upper bound on the barycentric lattice level used to sample a field.
    pub max_sample_level: usize,
    /// Validate volumes, edge and face conformity after every commit.
    pub check_invariants: bool,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            desired_volume: 0.0,
            max_passes: 64,
            max_depth: 64,
            relative_tolerance: 1e-8,
            max_sample_level: 8,
            check_invariants: false,
        }
    }
}

/// What one committed pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Bisections performed.
    pub splits: usize,
    /// Midpoint nodes added.
    pub nodes_added: usize,
    /// Elements added (children that survived the pass).
    pub elems_added: usize,
    /// Pre-pass elements removed.
    pub elems_removed: usize,
}

/// Totals over a whole [`SimplexRefiner::refine_elements_with_summary`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefinementSummary {
    /// Passes run, including the final one that found nothing to split.
    pub passes: usize,
    pub splits: usize,
    pub nodes_added: usize,
    pub elems_added: usize,
    pub elems_removed: usize,
}

impl RefinementSummary {
    /// `true` if any pass changed the mesh.
    pub fn changed(&self) -> bool {
        self.splits > 0
    }

    fn absorb(&mut self, pass: PassStats) {
        self.passes += 1;
        self.splits += pass.splits;
        self.nodes_added += pass.nodes_added;
        self.elems_added += pass.elems_added;
        self.elems_removed += pass.elems_removed;
    }
}

/// Refines a simplicial mesh by splitting edges of elements that exceed a
/// volume metric.
///
/// At the time of refining the mesh should be conforming.
pub struct SimplexRefiner<'a, M: SimplexMesh + ?Sized> {
    mesh: &'a mut M,
    metric: VolumeMetric,
    options: RefineOptions,
}

impl<'a, M: SimplexMesh + ?Sized> SimplexRefiner<'a, M> {
    /// Refiner with default options (metric disabled until configured).
    pub fn new(mesh: &'a mut M) -> Self {
        let options = RefineOptions::default();
        Self {
            mesh,
            metric: VolumeMetric::new(options.relative_tolerance, options.max_sample_level),
            options,
        }
    }

    /// Refiner configured from `options`.
    ///
    /// # Errors
    /// [`MeshError::InvalidMetric`] for a negative or non-finite desired
    /// volume or tolerance.
    pub fn with_options(mesh: &'a mut M, options: RefineOptions) -> Result<Self, MeshError> {
        if !options.relative_tolerance.is_finite() || options.relative_tolerance < 0.0 {
            return Err(MeshError::InvalidMetric(format!(
                "relative tolerance must be finite and non-negative, got {}",
                options.relative_tolerance
            )));
        }
        let mut metric = VolumeMetric::new(options.relative_tolerance, options.max_sample_level);
        metric.set_desired_volume(options.desired_volume)?;
        Ok(Self {
            mesh,
            metric,
            options,
        })
    }

    pub fn options(&self) -> &RefineOptions {
        &self.options
    }

    /// Read access to the mesh being refined.
    pub fn mesh(&self) -> &M {
        self.mesh
    }

    /// Scalar desired element volume (0 when disabled).
    pub fn desired_volume(&self) -> f64 {
        self.metric.desired_volume()
    }

    /// Sets the scalar desired volume; 0 disables the scalar constraint.
    ///
    /// With a desired-volume function installed this acts as a minimum that
    /// sets how finely the function is sampled inside large elements.
    pub fn set_desired_volume(&mut self, volume: f64) -> Result<(), MeshError> {
        self.metric.set_desired_volume(volume)?;
        self.options.desired_volume = volume;
        Ok(())
    }

    /// Installs or replaces the position-dependent desired volume.
    pub fn set_desired_volume_function(&mut self, field: impl VolumeField + 'static) {
        self.metric.set_field(field);
    }

    /// Removes the position-dependent desired volume, returning it.
    pub fn clear_desired_volume_function(&mut self) -> Option<Box<dyn VolumeField>> {
        self.metric.clear_field()
    }

    /// The position-dependent desired volume, if one is set.
    pub fn desired_volume_function(&self) -> Option<&dyn VolumeField> {
        self.metric.field()
    }

    /// Finds elements which exceed the metric and refines them until a pass
    /// makes no change.
    ///
    /// Returns `true` iff the mesh actually changed.
    pub fn refine_elements(&mut self) -> Result<bool, MeshError> {
        Ok(self.refine_elements_with_summary()?.changed())
    }

    /// Like [`refine_elements`](Self::refine_elements), reporting totals.
    ///
    /// # Errors
    /// - [`MeshError::GeometryError`] for a degenerate or inverted element.
    /// - [`MeshError::ConformityViolation`] if a shared edge would be split
    ///   inconsistently.
    /// - [`MeshError::NonTerminatingRefinement`] when the pass or depth cap
    ///   is exceeded.
    ///
    /// Each error aborts the current pass before commit; earlier passes stay
    /// committed.
    pub fn refine_elements_with_summary(&mut self) -> Result<RefinementSummary, MeshError> {
        let mut summary = RefinementSummary::default();
        if !self.metric.is_enabled() {
            log::debug!("volume metric disabled; nothing to refine");
        }
        while summary.passes < self.options.max_passes {
            let pass = self.refine_via_edges()?;
            summary.absorb(pass);
            if pass.splits == 0 {
                log::info!(
                    "refinement converged after {} passes: {} splits, {} elements now",
                    summary.passes,
                    summary.splits,
                    self.mesh.n_elems()
                );
                return Ok(summary);
            }
        }
        log::warn!(
            "refinement still splitting after {} passes ({} splits so far)",
            summary.passes,
            summary.splits
        );
        Err(MeshError::NonTerminatingRefinement {
            cap: RefinementCap::Passes,
            limit: self.options.max_passes,
        })
    }

    /// Runs and commits a single pass over the current elements.
    pub fn refine_via_edges(&mut self) -> Result<PassStats, MeshError> {
        let snapshot = self.mesh.elem_ids();
        let boundary = if self.options.check_invariants {
            boundary_facets(&*self.mesh)?
        } else {
            Vec::new()
        };
        let pass = Pass::new(&*self.mesh, &self.metric, self.options.max_depth, &snapshot)?;
        let (batch, splits) = pass.run(&snapshot)?;
        let stats = PassStats {
            splits,
            nodes_added: batch.nodes.len(),
            elems_added: batch.elems.len(),
            elems_removed: batch.removed.len(),
        };
        log::debug!(
            "refinement pass over {} elements: {} splits, +{} nodes, +{} / -{} elements",
            snapshot.len(),
            stats.splits,
            stats.nodes_added,
            stats.elems_added,
            stats.elems_removed
        );
        if !batch.is_empty() {
            self.mesh.commit(batch)?;
        }
        if self.options.check_invariants {
            self.mesh.validate_invariants()?;
            validate_face_conformity(&*self.mesh, &boundary)?;
        }
        Ok(stats)
    }
}

/// New element awaiting commit.
struct PendingElem {
    elem: Elem,
    depth: usize,
}

/// Scratch state of one pass. Reads the mesh, never writes it.
struct Pass<'m, M: SimplexMesh + ?Sized> {
    mesh: &'m M,
    metric: &'m VolumeMetric,
    max_depth: usize,
    ids: PointIdAllocator,
    registry: EdgeRegistry,
    pending: HashMap<PointId, PendingElem>,
    created: Vec<PointId>,
    retired: HashSet<PointId>,
    removed: Vec<PointId>,
    incidence: HashMap<EdgeKey, Vec<PointId>>,
    splits: usize,
}

impl<'m, M: SimplexMesh + ?Sized> Pass<'m, M> {
    fn new(
        mesh: &'m M,
        metric: &'m VolumeMetric,
        max_depth: usize,
        snapshot: &[PointId],
    ) -> Result<Self, MeshError> {
        let mut incidence: HashMap<EdgeKey, Vec<PointId>> = HashMap::new();
        for &id in snapshot {
            for key in mesh.try_elem(id)?.edge_keys() {
                incidence.entry(key).or_default().push(id);
            }
        }
        Ok(Self {
            mesh,
            metric,
            max_depth,
            ids: PointIdAllocator::after(mesh.max_point_id())?,
            registry: EdgeRegistry::new(),
            pending: HashMap::new(),
            created: Vec::new(),
            retired: HashSet::new(),
            removed: Vec::new(),
            incidence,
            splits: 0,
        })
    }

    fn run(mut self, snapshot: &[PointId]) -> Result<(RefinementBatch, usize), MeshError> {
        let mut stack = Vec::new();
        for &root in snapshot {
            stack.push(root);
            while let Some(id) = stack.pop() {
                if self.retired.contains(&id) {
                    continue;
                }
                self.visit(id, &mut stack)?;
            }
        }

        let Pass {
            registry,
            mut pending,
            created,
            retired,
            removed,
            splits,
            ..
        } = self;
        let elems = created
            .into_iter()
            .filter(|id| !retired.contains(id))
            .filter_map(|id| pending.remove(&id).map(|p| (id, p.elem)))
            .collect();
        let batch = RefinementBatch {
            nodes: registry.into_nodes(),
            elems,
            removed,
        };
        Ok((batch, splits))
    }

    fn elem(&self, id: PointId) -> Result<&Elem, MeshError> {
        match self.pending.get(&id) {
            Some(p) => Ok(&p.elem),
            None => self.mesh.try_elem(id),
        }
    }

    fn position(&self, id: PointId) -> Result<Point, MeshError> {
        match self.registry.position_of(id) {
            Some(p) => Ok(p),
            None => self.mesh.try_node(id),
        }
    }

    /// Evaluate one element; bisect it if needed and schedule the follow-ups.
    fn visit(&mut self, id: PointId, stack: &mut Vec<PointId>) -> Result<(), MeshError> {
        let elem = self.elem(id)?.clone();
        let cell_type = elem.cell_type();
        let positions = elem.positions(|v| self.position(v))?;
        check_positive_volume(id, simplex_volume(cell_type, &positions)?)?;
        let violates = self.metric.should_refine(id, cell_type, &positions)?;

        let Some(edge) = self.select_edge(&elem, &positions, violates) else {
            return Ok(());
        };

        let depth = self.pending.get(&id).map_or(0, |p| p.depth) + 1;
        if depth > self.max_depth {
            log::warn!("element {id} needs more than {} bisections in one pass", self.max_depth);
            return Err(MeshError::NonTerminatingRefinement {
                cap: RefinementCap::Depth,
                limit: self.max_depth,
            });
        }

        let mesh = self.mesh;
        let lookup = self.registry.get_or_create_midpoint(
            edge.lo(),
            edge.hi(),
            |v| mesh.try_node(v),
            &mut self.ids,
        )?;
        let midpoint = lookup.node();
        let children = bisect(&elem, edge, midpoint)?;

        self.retired.insert(id);
        if self.pending.remove(&id).is_none() {
            self.removed.push(id);
        }
        self.splits += 1;
        log::trace!(
            "split element {id} on edge {edge} at node {midpoint} ({})",
            if violates { "metric" } else { "propagated" }
        );

        // Neighbors go below the children so the children settle first.
        if let MidpointLookup::Created(_) = lookup {
            if let Some(incident) = self.incidence.get(&edge) {
                stack.extend(
                    incident
                        .iter()
                        .rev()
                        .filter(|n| **n != id && !self.retired.contains(*n)),
                );
            }
        }

        let mut child_ids = [id; 2];
        for (slot, child) in children.into_iter().enumerate() {
            let child_id = self.ids.alloc()?;
            for key in child.edge_keys() {
                self.incidence.entry(key).or_default().push(child_id);
            }
            self.pending.insert(child_id, PendingElem { elem: child, depth });
            self.created.push(child_id);
            child_ids[slot] = child_id;
        }
        stack.push(child_ids[1]);
        stack.push(child_ids[0]);
        Ok(())
    }

    /// The edge to bisect, or `None` if the element stays.
    ///
    /// An element is split when it violates the metric or holds an edge
    /// already split in this pass. Either way it bisects its own longest
    /// edge, so the elements on both sides of a face cut it identically.
    /// Edges are totally ordered by exact length, then by the smaller key.
    fn select_edge(&self, elem: &Elem, positions: &[Point], violates: bool) -> Option<EdgeKey> {
        if !violates && !elem.edge_keys().any(|key| self.registry.contains(&key)) {
            return None;
        }
        let vertices = elem.vertices();
        elem.cell_type()
            .edges()
            .iter()
            .map(|[a, b]| {
                let key = EdgeKey::from_distinct(vertices[*a], vertices[*b]);
                (key, positions[*a].distance(&positions[*b]))
            })
            .max_by(|(key_a, len_a), (key_b, len_b)| {
                len_a.total_cmp(len_b).then_with(|| key_b.cmp(key_a))
            })
            .map(|(key, _)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::mesh::InMemoryMesh;
    use crate::topology::validation::validate_conformity;

    fn unit_right_triangle(mesh: &mut InMemoryMesh) -> PointId {
        let a = mesh.add_node([0.0, 0.0]).unwrap();
        let b = mesh.add_node([1.0, 0.0]).unwrap();
        let c = mesh.add_node([0.0, 1.0]).unwrap();
        mesh.add_elem(Elem::triangle([a, b, c]).unwrap()).unwrap()
    }

    #[test]
    fn disabled_metric_changes_nothing() {
        let mut mesh = InMemoryMesh::new();
        unit_right_triangle(&mut mesh);
        let mut refiner = SimplexRefiner::new(&mut mesh);
        assert!(!refiner.refine_elements().unwrap());
        assert_eq!(mesh.n_elems(), 1);
    }

    #[test]
    fn hypotenuse_is_split_first() {
        let mut mesh = InMemoryMesh::new();
        unit_right_triangle(&mut mesh);
        let mut refiner = SimplexRefiner::new(&mut mesh);
        refiner.set_desired_volume(0.25).unwrap();
        let summary = refiner.refine_elements_with_summary().unwrap();

        assert_eq!(summary.splits, 1);
        assert_eq!(summary.passes, 2);
        assert_eq!(summary.nodes_added, 1);
        let (_, midpoint) = mesh.nodes().last().unwrap();
        assert_eq!(midpoint, Point::new_2d(0.5, 0.5));
        assert_eq!(mesh.n_elems(), 2);
        for (id, _) in mesh.elems() {
            assert!((mesh.elem_volume(id).unwrap() - 0.25).abs() < 1e-15);
        }
    }

    #[test]
    fn equal_edges_break_ties_by_key() {
        // Isosceles triangle: (a, c) and (b, c) have exactly the same length.
        let mut mesh = InMemoryMesh::new();
        let a = mesh.add_node([0.0, 0.0]).unwrap();
        let b = mesh.add_node([1.0, 0.0]).unwrap();
        let c = mesh.add_node([0.5, 2.0]).unwrap();
        mesh.add_elem(Elem::triangle([a, b, c]).unwrap()).unwrap();

        let mut refiner = SimplexRefiner::new(&mut mesh);
        refiner.set_desired_volume(0.5).unwrap();
        assert!(refiner.refine_elements().unwrap());

        assert_eq!(mesh.n_elems(), 2);
        validate_conformity(&mesh).unwrap();
        // Key (1, 3) sorts before (2, 3).
        assert!(mesh.nodes().any(|(_, p)| p == Point::new_2d(0.25, 1.0)));
        assert!(!mesh.nodes().any(|(_, p)| p == Point::new_2d(0.75, 1.0)));
    }

    #[test]
    fn depth_cap_is_reported() {
        let mut mesh = InMemoryMesh::new();
        unit_right_triangle(&mut mesh);
        let options = RefineOptions {
            desired_volume: 0.01,
            max_depth: 3,
            ..RefineOptions::default()
        };
        let mut refiner = SimplexRefiner::with_options(&mut mesh, options).unwrap();
        let err = refiner.refine_elements().unwrap_err();
        assert_eq!(
            err,
            MeshError::NonTerminatingRefinement {
                cap: RefinementCap::Depth,
                limit: 3
            }
        );
        // The failed pass committed nothing.
        assert_eq!(mesh.n_elems(), 1);
        assert_eq!(mesh.n_nodes(), 3);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let mut mesh = InMemoryMesh::new();
        let options = RefineOptions {
            desired_volume: -2.0,
            ..RefineOptions::default()
        };
        assert!(matches!(
            SimplexRefiner::with_options(&mut mesh, options),
            Err(MeshError::InvalidMetric(_))
        ));
        let options = RefineOptions {
            relative_tolerance: f64::NAN,
            ..RefineOptions::default()
        };
        assert!(SimplexRefiner::with_options(&mut mesh, options).is_err());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: RefineOptions =
            serde_json::from_str(r#"{ "desired_volume": 0.5, "check_invariants": true }"#).unwrap();
        assert_eq!(options.desired_volume, 0.5);
        assert!(options.check_invariants);
        assert_eq!(options.max_passes, 64);
        assert_eq!(options.max_depth, 64);
    }
}
