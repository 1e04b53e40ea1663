//! Cell type metadata for simplex elements.

/// Simplex kinds the refiner understands.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CellType {
    /// 1D simplex (segment).
    Segment,
    /// 2D simplex (triangle).
    Triangle,
    /// 3D simplex (tet).
    Tetrahedron,
}

const SEGMENT_EDGES: [[usize; 2]; 1] = [[0, 1]];
const TRIANGLE_EDGES: [[usize; 2]; 3] = [[0, 1], [1, 2], [2, 0]];
const TETRAHEDRON_EDGES: [[usize; 2]; 6] = [[0, 1], [1, 2], [2, 0], [0, 3], [1, 3], [2, 3]];

impl CellType {
    /// Returns the topological dimension of the cell.
    pub fn dimension(self) -> u8 {
        match self {
            CellType::Segment => 1,
            CellType::Triangle => 2,
            CellType::Tetrahedron => 3,
        }
    }

    /// Number of vertices (always `dimension + 1` for a simplex).
    pub fn vertex_count(self) -> usize {
        self.dimension() as usize + 1
    }

    /// Local vertex index pairs of every edge.
    pub fn edges(self) -> &'static [[usize; 2]] {
        match self {
            CellType::Segment => &SEGMENT_EDGES,
            CellType::Triangle => &TRIANGLE_EDGES,
            CellType::Tetrahedron => &TETRAHEDRON_EDGES,
        }
    }

    /// Human-readable name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            CellType::Segment => "segment",
            CellType::Triangle => "triangle",
            CellType::Tetrahedron => "tetrahedron",
        }
    }

    /// The simplex kind with `n` vertices, if any.
    pub fn from_vertex_count(n: usize) -> Option<Self> {
        match n {
            2 => Some(CellType::Segment),
            3 => Some(CellType::Triangle),
            4 => Some(CellType::Tetrahedron),
            _ => None,
        }
    }
}
