use ink_common::Vertex;
use serde::{Deserialize, Serialize};

/// CPU-side geometry: vertices plus an optional index list.
///
/// An empty `indices` means the vertices are drawn as a plain triangle list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }
}

/// Built-in unit-sized shapes centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Triangle,
    Quad,
    Pyramid,
    Cube,
}

impl Primitive {
    pub fn mesh_data(self) -> MeshData {
        match self {
            Primitive::Triangle => triangle(),
            Primitive::Quad => quad(),
            Primitive::Pyramid => pyramid(),
            Primitive::Cube => cube(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Triangle => "triangle",
            Primitive::Quad => "quad",
            Primitive::Pyramid => "pyramid",
            Primitive::Cube => "cube",
        }
    }
}

const RED: [f32; 3] = [1.0, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];
const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];
const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

fn triangle() -> MeshData {
    let n = [0.0, 0.0, 1.0];
    #[rustfmt::skip]
    let vertices = vec![
        Vertex::new([ 0.0,  0.5, 0.0], RED,   [0.5, 1.0], n),
        Vertex::new([-0.5, -0.5, 0.0], GREEN, [0.0, 0.0], n),
        Vertex::new([ 0.5, -0.5, 0.0], BLUE,  [1.0, 0.0], n),
    ];
    MeshData::new(vertices, vec![0, 1, 2])
}

fn quad() -> MeshData {
    let n = [0.0, 0.0, 1.0];
    #[rustfmt::skip]
    let vertices = vec![
        Vertex::new([-0.5,  0.5, 0.0], RED,    [0.0, 1.0], n),
        Vertex::new([-0.5, -0.5, 0.0], GREEN,  [0.0, 0.0], n),
        Vertex::new([ 0.5, -0.5, 0.0], BLUE,   [1.0, 0.0], n),
        Vertex::new([ 0.5,  0.5, 0.0], YELLOW, [1.0, 1.0], n),
    ];
    MeshData::new(vertices, vec![0, 1, 2, 0, 2, 3])
}

/// Four-sided pyramid without a base, drawn non-indexed.
fn pyramid() -> MeshData {
    let apex = [0.0, 0.5, 0.0];
    #[rustfmt::skip]
    let vertices = vec![
        // Front
        Vertex::new(apex,               RED,    [0.5, 1.0], [0.0, 0.0, 1.0]),
        Vertex::new([-0.5, -0.5,  0.5], GREEN,  [0.0, 0.0], [0.0, 0.0, 1.0]),
        Vertex::new([ 0.5, -0.5,  0.5], BLUE,   [1.0, 0.0], [0.0, 0.0, 1.0]),
        // Left
        Vertex::new(apex,               YELLOW, [0.5, 1.0], [-1.0, 0.0, 0.0]),
        Vertex::new([-0.5, -0.5, -0.5], BLUE,   [0.0, 0.0], [-1.0, 0.0, 0.0]),
        Vertex::new([-0.5, -0.5,  0.5], BLUE,   [1.0, 0.0], [-1.0, 0.0, 0.0]),
        // Back
        Vertex::new(apex,               YELLOW, [0.5, 1.0], [0.0, 0.0, -1.0]),
        Vertex::new([ 0.5, -0.5, -0.5], BLUE,   [0.0, 0.0], [0.0, 0.0, -1.0]),
        Vertex::new([-0.5, -0.5, -0.5], BLUE,   [1.0, 0.0], [0.0, 0.0, -1.0]),
        // Right
        Vertex::new(apex,               YELLOW, [0.5, 1.0], [1.0, 0.0, 0.0]),
        Vertex::new([ 0.5, -0.5,  0.5], BLUE,   [0.0, 0.0], [1.0, 0.0, 0.0]),
        Vertex::new([ 0.5, -0.5, -0.5], BLUE,   [1.0, 0.0], [1.0, 0.0, 0.0]),
    ];
    MeshData::new(vertices, Vec::new())
}

fn cube() -> MeshData {
    let p = 0.5_f32;
    #[rustfmt::skip]
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([ 0.0,  0.0,  1.0], [[-p, -p,  p], [ p, -p,  p], [ p,  p,  p], [-p,  p,  p]]),
        ([ 0.0,  0.0, -1.0], [[ p, -p, -p], [-p, -p, -p], [-p,  p, -p], [ p,  p, -p]]),
        ([ 1.0,  0.0,  0.0], [[ p, -p,  p], [ p, -p, -p], [ p,  p, -p], [ p,  p,  p]]),
        ([-1.0,  0.0,  0.0], [[-p, -p, -p], [-p, -p,  p], [-p,  p,  p], [-p,  p, -p]]),
        ([ 0.0,  1.0,  0.0], [[-p,  p,  p], [ p,  p,  p], [ p,  p, -p], [-p,  p, -p]]),
        ([ 0.0, -1.0,  0.0], [[-p, -p, -p], [ p, -p, -p], [ p, -p,  p], [-p, -p,  p]]),
    ];
    let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.iter().zip(uvs) {
            vertices.push(Vertex::new(*corner, WHITE, uv, normal));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    MeshData::new(vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices_in_range(mesh: &MeshData) -> bool {
        mesh.indices
            .iter()
            .all(|&i| (i as usize) < mesh.vertices.len())
    }

    #[test]
    fn pyramid_is_non_indexed() {
        let mesh = Primitive::Pyramid.mesh_data();
        assert_eq!(mesh.vertices.len(), 12);
        assert!(!mesh.is_indexed());
        assert_eq!(mesh.vertices.len() % 3, 0);
    }

    #[test]
    fn indexed_primitives_have_valid_indices() {
        for prim in [Primitive::Triangle, Primitive::Quad, Primitive::Cube] {
            let mesh = prim.mesh_data();
            assert!(mesh.is_indexed(), "{} should be indexed", prim.name());
            assert_eq!(mesh.indices.len() % 3, 0);
            assert!(indices_in_range(&mesh));
        }
        assert_eq!(Primitive::Quad.mesh_data().indices.len(), 6);
        assert_eq!(Primitive::Cube.mesh_data().vertices.len(), 24);
        assert_eq!(Primitive::Cube.mesh_data().indices.len(), 36);
    }

    #[test]
    fn primitives_fit_in_unit_box() {
        for prim in [
            Primitive::Triangle,
            Primitive::Quad,
            Primitive::Pyramid,
            Primitive::Cube,
        ] {
            for v in prim.mesh_data().vertices {
                assert!(v.position.iter().all(|c| c.abs() <= 0.5));
            }
        }
    }

    #[test]
    fn cube_faces_point_outward() {
        fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
            [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
        }
        fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
            [
                a[1] * b[2] - a[2] * b[1],
                a[2] * b[0] - a[0] * b[2],
                a[0] * b[1] - a[1] * b[0],
            ]
        }

        let mesh = Primitive::Cube.mesh_data();
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
            let n = cross(sub(b.position, a.position), sub(c.position, a.position));
            let facing: f32 = n.iter().zip(a.normal).map(|(x, y)| x * y).sum();
            assert!(facing > 0.0);
        }
    }
}
