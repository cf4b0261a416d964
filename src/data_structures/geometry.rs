//! Procedural geometry.
//!
//! Generates the vertex/index data for the shapes the scene is made of. All
//! shapes are centred on the origin, wound counter-clockwise when seen from the
//! outside and carry texture coordinates with `v` growing downwards (the wgpu
//! convention), so they can be fed to [`Mesh::new`](crate::data_structures::model::Mesh::new).

use cgmath::{InnerSpace, Vector2, Vector3};

use crate::data_structures::model::ModelVertex;

#[derive(Clone, Debug, Default)]
pub struct Geometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

fn vertex(position: Vector3<f32>, normal: Vector3<f32>, uv: [f32; 2]) -> ModelVertex {
    ModelVertex {
        position: position.into(),
        tex_coords: uv,
        normal: normal.into(),
        tangent: [0.0; 3],
        bitangent: [0.0; 3],
    }
}

#[rustfmt::skip]
const ICOSAHEDRON_FACES: [u32; 60] = [
    0, 11, 5,   0, 5, 1,    0, 1, 7,    0, 7, 10,   0, 10, 11,
    1, 5, 9,    5, 11, 4,   11, 10, 2,  10, 7, 6,   7, 1, 8,
    3, 9, 4,    3, 4, 2,    3, 2, 6,    3, 6, 8,    3, 8, 9,
    4, 9, 5,    2, 4, 11,   6, 2, 10,   8, 6, 7,    9, 8, 1,
];

/// A regular icosahedron with flat shading.
///
/// Every face owns its three vertices so the normals stay faceted. Texture
/// coordinates are derived from each vertex's spherical direction.
pub fn icosahedron(radius: f32) -> Geometry {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;
    let corners = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .map(|(x, y, z)| Vector3::new(x, y, z).normalize() * radius);

    let mut vertices = Vec::with_capacity(ICOSAHEDRON_FACES.len());
    for face in ICOSAHEDRON_FACES.chunks(3) {
        let [a, b, c] = [face[0], face[1], face[2]].map(|i| corners[i as usize]);
        let normal = (b - a).cross(c - a).normalize();
        let mut uvs = [a, b, c].map(spherical_uv);
        fix_seam(&mut uvs);
        for (position, uv) in [a, b, c].into_iter().zip(uvs) {
            vertices.push(vertex(position, normal, uv));
        }
    }
    let indices = (0..vertices.len() as u32).collect();
    let mut geometry = Geometry { vertices, indices };
    compute_tangents(&mut geometry);
    geometry
}

fn spherical_uv(p: Vector3<f32>) -> [f32; 2] {
    let p = p.normalize();
    let u = p.z.atan2(-p.x) / (2.0 * std::f32::consts::PI) + 0.5;
    let v = p.y.clamp(-1.0, 1.0).acos() / std::f32::consts::PI;
    [u, v]
}

/// Faces straddling the `u` wrap-around would otherwise smear the whole texture
/// across themselves.
fn fix_seam(uvs: &mut [[f32; 2]; 3]) {
    let max = uvs.iter().map(|uv| uv[0]).fold(f32::MIN, f32::max);
    let min = uvs.iter().map(|uv| uv[0]).fold(f32::MAX, f32::min);
    if max > 0.9 && min < 0.1 {
        for uv in uvs.iter_mut() {
            if uv[0] < 0.2 {
                uv[0] += 1.0;
            }
        }
    }
}

/// A UV sphere made of `width_segments` meridians and `height_segments` rings.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);
    let mut vertices = Vec::new();
    let mut grid = Vec::with_capacity(height_segments as usize + 1);

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        // Shift the pole vertices half a segment so the texture does not twist.
        let u_offset = if iy == 0 {
            0.5 / width_segments as f32
        } else if iy == height_segments {
            -0.5 / width_segments as f32
        } else {
            0.0
        };
        let mut row = Vec::with_capacity(width_segments as usize + 1);
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * 2.0 * std::f32::consts::PI;
            let theta = v * std::f32::consts::PI;
            let position = Vector3::new(
                -radius * phi.cos() * theta.sin(),
                radius * theta.cos(),
                radius * phi.sin() * theta.sin(),
            );
            let normal = if position.magnitude2() > 0.0 {
                position.normalize()
            } else {
                Vector3::unit_y()
            };
            row.push(vertices.len() as u32);
            vertices.push(vertex(position, normal, [u + u_offset, v]));
        }
        grid.push(row);
    }

    let mut indices = Vec::new();
    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments as usize - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    let mut geometry = Geometry { vertices, indices };
    compute_tangents(&mut geometry);
    geometry
}

/// A single quad in the XY plane facing +Z.
pub fn plane(width: f32, height: f32) -> Geometry {
    let (hw, hh) = (width / 2.0, height / 2.0);
    let normal = Vector3::unit_z();
    let vertices = vec![
        vertex(Vector3::new(-hw, hh, 0.0), normal, [0.0, 0.0]),
        vertex(Vector3::new(hw, hh, 0.0), normal, [1.0, 0.0]),
        vertex(Vector3::new(-hw, -hh, 0.0), normal, [0.0, 1.0]),
        vertex(Vector3::new(hw, -hh, 0.0), normal, [1.0, 1.0]),
    ];
    let indices = vec![0, 2, 1, 2, 3, 1];
    let mut geometry = Geometry { vertices, indices };
    compute_tangents(&mut geometry);
    geometry
}

/// Generated shapes don't come with tangents and bitangents so they have to be
/// calculated for normal maps to work correctly.
pub fn compute_tangents(geometry: &mut Geometry) {
    let vertices = &mut geometry.vertices;
    let mut triangles_included = vec![0u32; vertices.len()];

    for c in geometry.indices.chunks(3) {
        let [i0, i1, i2] = [c[0] as usize, c[1] as usize, c[2] as usize];
        let pos0: Vector3<f32> = vertices[i0].position.into();
        let pos1: Vector3<f32> = vertices[i1].position.into();
        let pos2: Vector3<f32> = vertices[i2].position.into();

        let uv0: Vector2<f32> = vertices[i0].tex_coords.into();
        let uv1: Vector2<f32> = vertices[i1].tex_coords.into();
        let uv2: Vector2<f32> = vertices[i2].tex_coords.into();

        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;
        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() < f32::EPSILON {
            // Collapsed UVs (sphere poles) carry no tangent information.
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        // Flipped to get right-handed normal maps with the wgpu texture coordinates
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

        for i in [i0, i1, i2] {
            vertices[i].tangent = (tangent + Vector3::from(vertices[i].tangent)).into();
            vertices[i].bitangent = (bitangent + Vector3::from(vertices[i].bitangent)).into();
            triangles_included[i] += 1;
        }
    }

    for (v, n) in vertices.iter_mut().zip(triangles_included) {
        if n == 0 {
            continue;
        }
        let denom = 1.0 / n as f32;
        v.tangent = (Vector3::from(v.tangent) * denom).into();
        v.bitangent = (Vector3::from(v.bitangent) * denom).into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_is_outward(g: &Geometry, face: &[u32]) -> bool {
        let p = |i: u32| Vector3::from(g.vertices[i as usize].position);
        let (a, b, c) = (p(face[0]), p(face[1]), p(face[2]));
        let normal = (b - a).cross(c - a);
        let centroid = (a + b + c) / 3.0;
        normal.dot(centroid) > 0.0
    }

    #[test]
    fn icosahedron_has_twenty_flat_faces_on_the_sphere() {
        let g = icosahedron(0.5);
        assert_eq!(g.triangle_count(), 20);
        assert_eq!(g.vertices.len(), 60);
        for v in &g.vertices {
            assert!((Vector3::from(v.position).magnitude() - 0.5).abs() < 1e-5);
        }
        for face in g.vertices.chunks(3) {
            assert_eq!(face[0].normal, face[1].normal);
            assert_eq!(face[1].normal, face[2].normal);
        }
    }

    #[test]
    fn icosahedron_faces_point_outwards() {
        let g = icosahedron(0.5);
        for face in g.indices.chunks(3) {
            assert!(face_is_outward(&g, face));
        }
    }

    #[test]
    fn sphere_vertex_and_index_counts() {
        let g = sphere(0.5, 32, 32);
        assert_eq!(g.vertices.len(), 33 * 33);
        // Two triangles per quad minus the degenerate ones at both poles.
        assert_eq!(g.triangle_count(), 32 * 32 * 2 - 2 * 32);
        assert!(g.indices.iter().all(|&i| (i as usize) < g.vertices.len()));
    }

    #[test]
    fn sphere_faces_point_outwards() {
        let g = sphere(0.5, 16, 8);
        for face in g.indices.chunks(3) {
            assert!(face_is_outward(&g, face));
        }
    }

    #[test]
    fn sphere_normals_are_unit_length() {
        let g = sphere(0.5, 32, 32);
        for v in &g.vertices {
            assert!((Vector3::from(v.normal).magnitude() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn plane_faces_the_camera_and_has_x_tangents() {
        let g = plane(5.0, 5.0);
        assert_eq!(g.triangle_count(), 2);
        for face in g.indices.chunks(3) {
            let p = |i: u32| Vector3::from(g.vertices[i as usize].position);
            let n = (p(face[1]) - p(face[0])).cross(p(face[2]) - p(face[0]));
            assert!(n.z > 0.0);
        }
        for v in &g.vertices {
            let t = Vector3::from(v.tangent).normalize();
            assert!((t.x - 1.0).abs() < 1e-5, "{:?}", v.tangent);
            assert!(v.position[0].abs() == 2.5 && v.position[1].abs() == 2.5);
        }
    }

    #[test]
    fn tangents_are_finite_everywhere() {
        for g in [icosahedron(0.5), sphere(0.5, 32, 32), plane(5.0, 5.0)] {
            for v in &g.vertices {
                assert!(v.tangent.iter().chain(&v.bitangent).all(|c| c.is_finite()));
            }
        }
    }
}
