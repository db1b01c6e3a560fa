//! Triangle mesh used to draw audio envelopes.

use glam::Vec2;

/// Immutable triangle list. Vertices are in pixel space of the requested
/// waveform size, y growing downward.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriMesh {
    pub vertices: Vec<Vec2>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriMesh {
    pub fn with_capacity(quads: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(quads * 4),
            triangles: Vec::with_capacity(quads * 2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Append an axis-aligned quad as two triangles (0,1,2) and (2,3,0).
    pub fn push_quad(&mut self, min: Vec2, max: Vec2) {
        let base = self.vertices.len() as u32;
        self.vertices.push(Vec2::new(min.x, min.y));
        self.vertices.push(Vec2::new(max.x, min.y));
        self.vertices.push(Vec2::new(max.x, max.y));
        self.vertices.push(Vec2::new(min.x, max.y));
        self.triangles.push([base, base + 1, base + 2]);
        self.triangles.push([base + 2, base + 3, base]);
    }

    /// Vertical extent (min y, max y) of the vertices with x in `[x0, x1]`.
    pub fn column_extent(&self, x0: f32, x1: f32) -> Option<(f32, f32)> {
        self.vertices
            .iter()
            .filter(|v| v.x >= x0 && v.x <= x1)
            .fold(None, |acc, v| match acc {
                None => Some((v.y, v.y)),
                Some((lo, hi)) => Some((lo.min(v.y), hi.max(v.y))),
            })
    }
}
