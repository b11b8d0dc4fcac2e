//! Tileable ocean mesh with seam replication.
//!
//! The spectral fields are periodic with period N, but the mesh has N + 1
//! vertices per side so neighbouring tile instances share an edge. The last
//! row and column are refreshed from the samples of row and column 0.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::normalize::{SurfaceFields, SurfaceSample};
use crate::error::{OceanError, Result};
use crate::params::OceanConfig;

/// Vertex data for one tile (rest position, animated position, normal, uv)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct WaveVertex {
    /// Rest position on the flat grid (object space)
    pub original_position: [f32; 3],
    /// Displaced position after the last refresh
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// `(x mod N, z mod N) / (N + 1)`; replicas share the uv of row and column 0
    pub tex_coords: [f32; 2],
}

/// One tile's vertex grid and triangle list
#[derive(Debug, Clone)]
pub struct TileMesh {
    pub vertices: Vec<WaveVertex>,
    pub indices: Vec<u32>,
    n: usize,
}

impl TileMesh {
    /// Build the flat (N+1)×(N+1) grid and its 6·N² triangle-list indices.
    ///
    /// Vertices are centered on the origin and span `wave_length` per side.
    /// Local z is negated so the mesh is right-handed with y up.
    pub fn build_grid(config: &OceanConfig) -> Self {
        let n = config.n;
        let point_count = config.point_count();
        let half = point_count as f32 / 2.0;
        let spacing = config.wave_length / n as f32;

        let mut vertices = Vec::with_capacity(point_count * point_count);
        for z in 0..point_count {
            for x in 0..point_count {
                let rest = [
                    (x as f32 - half) * spacing,
                    0.0,
                    -((z as f32 - half) * spacing),
                ];
                vertices.push(WaveVertex {
                    original_position: rest,
                    position: rest,
                    normal: [0.0, 1.0, 0.0],
                    tex_coords: [
                        (x % n) as f32 / point_count as f32,
                        (z % n) as f32 / point_count as f32,
                    ],
                });
            }
        }

        // Two counter-clockwise triangles per quad
        let stride = point_count as u32;
        let mut indices = Vec::with_capacity(6 * n * n);
        for row in 0..n as u32 {
            for column in 0..n as u32 {
                let bottom_left = row * stride + column;
                let bottom_right = bottom_left + 1;
                let top_right = bottom_left + stride + 1;
                let top_left = bottom_left + stride;

                indices.extend_from_slice(&[
                    bottom_left,
                    bottom_right,
                    top_right,
                    bottom_left,
                    top_right,
                    top_left,
                ]);
            }
        }

        log::debug!(
            "Tile mesh: {} vertices, {} triangles",
            vertices.len(),
            indices.len() / 3
        );

        Self {
            vertices,
            indices,
            n,
        }
    }

    /// Unique samples per side
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn vertex(&self, x: usize, z: usize) -> &WaveVertex {
        &self.vertices[z * (self.n + 1) + x]
    }

    /// Move every vertex to its displaced position and update its normal.
    ///
    /// Replicas in the last row and column are recomputed from their own
    /// rest positions with the samples of row and column 0.
    pub fn refresh_positions(&mut self, surface: &SurfaceFields) -> Result<()> {
        let n = self.n;
        if surface.n() != n {
            return Err(OceanError::GridMismatch {
                expected: n,
                actual: surface.n(),
            });
        }
        let point_count = n + 1;

        for z in 0..n {
            for x in 0..n {
                let sample = surface.sample(x, z);
                let index = z * point_count + x;

                self.displace(index, sample);

                if x == 0 {
                    self.displace(index + n, sample);
                }
                if z == 0 {
                    self.displace(index + n * point_count, sample);
                }
                if x == 0 && z == 0 {
                    self.displace(point_count * point_count - 1, sample);
                }
            }
        }
        Ok(())
    }

    fn displace(&mut self, index: usize, sample: &SurfaceSample) {
        let vertex = &mut self.vertices[index];
        let rest = vertex.original_position;
        vertex.position = [rest[0] + sample.dx, sample.height, rest[2] + sample.dz];
        vertex.normal = sample.normal.to_array();
    }

    /// Axis-aligned bounds of the displaced vertices
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), v| {
                let p = Vec3::from_array(v.position);
                (lo.min(p), hi.max(p))
            },
        )
    }
}
