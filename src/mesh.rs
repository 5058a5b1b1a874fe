//! Mesh ingestion.
//!
//! Turns host vertex/index buffers into renderer [`Geometry`]: triangles
//! tagged with their submesh slot, face and vertex normals, per-corner UVs
//! (flipped to the renderer's convention) and per-corner tangents.

use glam::{Vec2, Vec3};

use crate::errors::{Result, SceneError};
use crate::renderer::scene::{Geometry, ShaderKey};
use crate::scene::material::MaterialKey;

/// UV-area determinant below which a triangle's tangent frame is undefined.
const DEGENERATE_UV_EPSILON: f32 = 1e-12;

/// Host mesh data, as flat arrays.
///
/// `positions` and `normals` hold 3 floats per vertex, `uvs` 2. Submesh `i`
/// owns the next `3 * triangle_counts[i]` entries of `indices` and is drawn
/// with `materials[i]` (or the default surface when `None`).
#[derive(Debug, Clone, Copy)]
pub struct MeshDesc<'a> {
    pub name: &'a str,
    pub positions: &'a [f32],
    pub normals: Option<&'a [f32]>,
    pub uvs: Option<&'a [f32]>,
    pub indices: &'a [u32],
    pub triangle_counts: &'a [u32],
    pub materials: &'a [Option<MaterialKey>],
}

impl MeshDesc<'_> {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[must_use]
    pub fn submesh_count(&self) -> usize {
        self.triangle_counts.len()
    }

    /// Checks buffer sizes and index ranges.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SceneError::InvalidMeshData(msg));

        if self.positions.len() % 3 != 0 {
            return invalid(format!(
                "position array length {} is not a multiple of 3",
                self.positions.len()
            ));
        }
        let vertex_count = self.vertex_count();

        if let Some(normals) = self.normals {
            if normals.len() != vertex_count * 3 {
                return invalid(format!(
                    "normal array holds {} floats, expected {}",
                    normals.len(),
                    vertex_count * 3
                ));
            }
        }
        if let Some(uvs) = self.uvs {
            if uvs.len() != vertex_count * 2 {
                return invalid(format!(
                    "uv array holds {} floats, expected {}",
                    uvs.len(),
                    vertex_count * 2
                ));
            }
        }

        if self.materials.len() < self.submesh_count() {
            return invalid(format!(
                "{} materials for {} submeshes",
                self.materials.len(),
                self.submesh_count()
            ));
        }

        let total: u64 = self.triangle_counts.iter().map(|&c| u64::from(c)).sum();
        if (self.indices.len() as u64) < total * 3 {
            return invalid(format!(
                "index buffer holds {} indices, submeshes need {}",
                self.indices.len(),
                total * 3
            ));
        }

        if let Some(bad) = self.indices[..(total * 3) as usize]
            .iter()
            .find(|&&i| i as usize >= vertex_count)
        {
            return invalid(format!(
                "index {bad} out of range for {vertex_count} vertices"
            ));
        }

        Ok(())
    }
}

/// Layout of one interleaved vertex, in floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: usize,
    pub position: usize,
    pub normal: Option<usize>,
    pub uv: Option<usize>,
}

/// Separate attribute arrays split out of an interleaved buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deinterleaved {
    pub positions: Vec<f32>,
    pub normals: Option<Vec<f32>>,
    pub uvs: Option<Vec<f32>>,
}

/// Splits an interleaved vertex buffer into separate arrays.
pub fn deinterleave(vertices: &[f32], layout: VertexLayout) -> Result<Deinterleaved> {
    let fits = |offset: usize, width: usize| offset + width <= layout.stride;
    if layout.stride == 0
        || !fits(layout.position, 3)
        || layout.normal.is_some_and(|o| !fits(o, 3))
        || layout.uv.is_some_and(|o| !fits(o, 2))
    {
        return Err(SceneError::InvalidMeshData(format!(
            "attribute offsets do not fit stride {}",
            layout.stride
        )));
    }
    if vertices.len() % layout.stride != 0 {
        return Err(SceneError::InvalidMeshData(format!(
            "interleaved buffer length {} is not a multiple of stride {}",
            vertices.len(),
            layout.stride
        )));
    }

    let take = |offset: usize, width: usize| -> Vec<f32> {
        vertices
            .chunks_exact(layout.stride)
            .flat_map(|v| v[offset..offset + width].iter().copied())
            .collect()
    };

    Ok(Deinterleaved {
        positions: take(layout.position, 3),
        normals: layout.normal.map(|o| take(o, 3)),
        uvs: layout.uv.map(|o| take(o, 2)),
    })
}

/// Unit face normals, one per triangle. Zero-area triangles get zero.
#[must_use]
pub fn face_normals(verts: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    triangles
        .iter()
        .map(|&[a, b, c]| {
            let (a, b, c) = (verts[a as usize], verts[b as usize], verts[c as usize]);
            (b - a).cross(c - a).normalize_or_zero()
        })
        .collect()
}

/// Vertex normals averaged from adjacent face normals.
#[must_use]
pub fn vertex_normals(vertex_count: usize, triangles: &[[u32; 3]], faces: &[Vec3]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; vertex_count];
    for (tri, face) in triangles.iter().zip(faces) {
        for &v in tri {
            normals[v as usize] += *face;
        }
    }
    for n in &mut normals {
        *n = n.normalize_or_zero();
    }
    normals
}

/// Fallback tangent for a corner whose UV frame is undefined.
fn fallback_tangent(normal: Vec3) -> Vec3 {
    normal.try_normalize().unwrap_or(Vec3::Z).any_orthonormal_vector()
}

/// Per-corner tangents and handedness signs.
///
/// For each triangle the UV-space tangent is solved from the two edges and
/// the two UV deltas, then Gram–Schmidt orthogonalised against each
/// corner's normal. The sign is `-1` when `(n × t) · b < 0`, else `+1`.
///
/// Triangles whose UV determinant is (near) zero get an arbitrary unit
/// tangent orthogonal to the corner normal and sign `+1`, so no NaN leaves
/// this function.
#[must_use]
pub fn corner_tangents(
    verts: &[Vec3],
    triangles: &[[u32; 3]],
    corner_uvs: &[Vec2],
    normals: &[Vec3],
) -> (Vec<Vec3>, Vec<f32>) {
    let mut tangents = Vec::with_capacity(triangles.len() * 3);
    let mut signs = Vec::with_capacity(triangles.len() * 3);

    for (t, tri) in triangles.iter().enumerate() {
        let [i0, i1, i2] = tri.map(|i| i as usize);
        let (v1, v2, v3) = (verts[i0], verts[i1], verts[i2]);
        let (w1, w2, w3) = (corner_uvs[t * 3], corner_uvs[t * 3 + 1], corner_uvs[t * 3 + 2]);

        let e1 = v2 - v1;
        let e2 = v3 - v1;
        let s1 = w2.x - w1.x;
        let s2 = w3.x - w1.x;
        let t1 = w2.y - w1.y;
        let t2 = w3.y - w1.y;

        let det = s1 * t2 - s2 * t1;
        let r = 1.0 / det;
        let frame = if det.abs() < DEGENERATE_UV_EPSILON || !r.is_finite() {
            None
        } else {
            let sdir = (e1 * t2 - e2 * t1) * r;
            let tdir = (e2 * s1 - e1 * s2) * r;
            Some((sdir, tdir))
        };

        for n in [normals[i0], normals[i1], normals[i2]] {
            match frame {
                Some((tan, bitan)) => {
                    let tangent = (tan - n * n.dot(tan))
                        .try_normalize()
                        .unwrap_or_else(|| fallback_tangent(n));
                    let sign = if n.cross(tan).dot(bitan) < 0.0 { -1.0 } else { 1.0 };
                    tangents.push(tangent);
                    signs.push(sign);
                }
                None => {
                    tangents.push(fallback_tangent(n));
                    signs.push(1.0);
                }
            }
        }
    }

    (tangents, signs)
}

/// Builds renderer geometry from `desc`.
///
/// `used_shaders[i]` is the shader bound to submesh `i`.
pub fn build_geometry(desc: &MeshDesc<'_>, used_shaders: Vec<ShaderKey>) -> Result<Geometry> {
    desc.validate()?;

    let verts: Vec<Vec3> = bytemuck::cast_slice::<f32, Vec3>(desc.positions).to_vec();

    let total: usize = desc.triangle_counts.iter().map(|&c| c as usize).sum();
    let mut triangles = Vec::with_capacity(total);
    let mut shader_slots = Vec::with_capacity(total);
    let mut corners = desc.indices.chunks_exact(3);
    for (slot, &count) in desc.triangle_counts.iter().enumerate() {
        for tri in corners.by_ref().take(count as usize) {
            triangles.push([tri[0], tri[1], tri[2]]);
            shader_slots.push(slot as u32);
        }
    }

    let faces = face_normals(&verts, &triangles);
    let normals = match desc.normals {
        Some(normals) => bytemuck::cast_slice::<f32, Vec3>(normals).to_vec(),
        None => vertex_normals(verts.len(), &triangles, &faces),
    };

    let corner_uvs: Option<Vec<Vec2>> = desc.uvs.map(|uvs| {
        let uvs: &[Vec2] = bytemuck::cast_slice(uvs);
        triangles
            .iter()
            .flatten()
            .map(|&i| {
                let uv = uvs[i as usize];
                Vec2::new(uv.x, 1.0 - uv.y)
            })
            .collect()
    });

    // Tangents need a host-supplied shading frame.
    let (corner_tangents, corner_tangent_signs) = match (desc.normals, corner_uvs.as_deref()) {
        (Some(_), Some(uvs)) => {
            let (t, s) = corner_tangents(&verts, &triangles, uvs, &normals);
            (Some(t), Some(s))
        }
        _ => (None, None),
    };

    log::debug!(
        "Built mesh '{}': {} vertices, {} triangles, {} submeshes",
        desc.name,
        verts.len(),
        triangles.len(),
        desc.submesh_count()
    );

    Ok(Geometry {
        name: desc.name.to_string(),
        smooth: vec![true; triangles.len()],
        verts,
        triangles,
        shader_slots,
        used_shaders,
        face_normals: faces,
        vertex_normals: normals,
        corner_uvs,
        corner_tangents,
        corner_tangent_signs,
    })
}
