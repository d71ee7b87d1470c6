//! Triangle meshes for components and ASCII STL output

use std::f64::consts::PI;

use super::model::{Component, Primitive};

const RADIAL_SEGMENTS: u32 = 24;
const SPHERE_STACKS: u32 = 12;

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<[f64; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    fn push_vertex(&mut self, v: [f64; 3]) -> u32 {
        self.vertices.push(v);
        (self.vertices.len() - 1) as u32
    }
}

/// Tessellate a component in assembly coordinates (millimetres)
pub fn tessellate(component: &Component) -> Mesh {
    let mut mesh = match component.primitive {
        Primitive::Box { length, width, height } => box_mesh(length, width, height),
        Primitive::Cylinder { radius, height } => cylinder_mesh(radius, height),
        Primitive::Sphere { radius } => sphere_mesh(radius),
    };
    for v in mesh.vertices.iter_mut() {
        *v = component.placement.apply(*v);
    }
    mesh
}

fn box_mesh(length: f64, width: f64, height: f64) -> Mesh {
    let (hx, hy, hz) = (length / 2.0, width / 2.0, height / 2.0);
    let vertices = vec![
        [-hx, -hy, -hz],
        [hx, -hy, -hz],
        [hx, hy, -hz],
        [-hx, hy, -hz],
        [-hx, -hy, hz],
        [hx, -hy, hz],
        [hx, hy, hz],
        [-hx, hy, hz],
    ];
    let triangles = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [1, 2, 6],
        [1, 6, 5],
        [2, 3, 7],
        [2, 7, 6],
        [3, 0, 4],
        [3, 4, 7],
    ];
    Mesh { vertices, triangles }
}

/// Cylinder along local Z, centred on the origin
fn cylinder_mesh(radius: f64, height: f64) -> Mesh {
    let mut mesh = Mesh::default();
    let hz = height / 2.0;
    let bottom_center = mesh.push_vertex([0.0, 0.0, -hz]);
    let top_center = mesh.push_vertex([0.0, 0.0, hz]);

    let ring: Vec<(u32, u32)> = (0..RADIAL_SEGMENTS)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / RADIAL_SEGMENTS as f64;
            let (s, c) = theta.sin_cos();
            let b = mesh.push_vertex([radius * c, radius * s, -hz]);
            let t = mesh.push_vertex([radius * c, radius * s, hz]);
            (b, t)
        })
        .collect();

    for i in 0..ring.len() {
        let (b0, t0) = ring[i];
        let (b1, t1) = ring[(i + 1) % ring.len()];
        mesh.triangles.push([bottom_center, b1, b0]);
        mesh.triangles.push([top_center, t0, t1]);
        mesh.triangles.push([b0, b1, t1]);
        mesh.triangles.push([b0, t1, t0]);
    }
    mesh
}

fn sphere_mesh(radius: f64) -> Mesh {
    let mut mesh = Mesh::default();
    let north = mesh.push_vertex([0.0, 0.0, radius]);

    let mut rings: Vec<Vec<u32>> = Vec::new();
    for stack in 1..SPHERE_STACKS {
        let phi = PI * stack as f64 / SPHERE_STACKS as f64;
        let (sp, cp) = phi.sin_cos();
        let ring = (0..RADIAL_SEGMENTS)
            .map(|i| {
                let theta = 2.0 * PI * i as f64 / RADIAL_SEGMENTS as f64;
                let (st, ct) = theta.sin_cos();
                mesh.push_vertex([radius * sp * ct, radius * sp * st, radius * cp])
            })
            .collect();
        rings.push(ring);
    }
    let south = mesh.push_vertex([0.0, 0.0, -radius]);

    let n = RADIAL_SEGMENTS as usize;
    if let (Some(first), Some(last)) = (rings.first(), rings.last()) {
        for i in 0..n {
            mesh.triangles.push([north, first[i], first[(i + 1) % n]]);
            mesh.triangles.push([south, last[(i + 1) % n], last[i]]);
        }
    }
    for pair in rings.windows(2) {
        let (upper, lower) = (&pair[0], &pair[1]);
        for i in 0..n {
            let j = (i + 1) % n;
            mesh.triangles.push([upper[i], lower[i], lower[j]]);
            mesh.triangles.push([upper[i], lower[j], upper[j]]);
        }
    }
    mesh
}

#[inline]
fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len <= f64::EPSILON {
        [0.0, 0.0, 0.0]
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

#[inline]
fn triangle_normal(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> [f64; 3] {
    let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    normalize(cross(ab, ac))
}

pub fn to_ascii_stl(mesh: &Mesh, name: &str) -> String {
    let mut out = format!("solid {}\n", name);

    for tri in &mesh.triangles {
        let a = mesh.vertices[tri[0] as usize];
        let b = mesh.vertices[tri[1] as usize];
        let c = mesh.vertices[tri[2] as usize];
        let n = triangle_normal(a, b, c);

        out.push_str(&format!("  facet normal {:e} {:e} {:e}\n", n[0], n[1], n[2]));
        out.push_str("    outer loop\n");
        for v in [a, b, c] {
            out.push_str(&format!("      vertex {:e} {:e} {:e}\n", v[0], v[1], v[2]));
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }

    out.push_str(&format!("endsolid {}\n", name));
    out
}
