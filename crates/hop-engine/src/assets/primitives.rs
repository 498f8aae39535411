//! Procedural scenes for geometry that does not come from a model file.

use glam::{Vec2, Vec3};

use super::scene::{ImportedMesh, ImportedScene};

/// Axis-aligned box centered on the origin: 6 faces, 4 vertices each, so
/// every face gets its own flat normal.
pub fn box_mesh(half_extents: Vec3) -> ImportedMesh {
    // (normal, u axis, v axis)
    const SIDES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    let mut mesh = ImportedMesh {
        name: "box".into(),
        ..ImportedMesh::default()
    };
    for (normal, u, v) in SIDES {
        let base = mesh.positions.len() as u32;
        for (cu, cv) in CORNERS {
            mesh.positions.push((normal + u * cu + v * cv) * half_extents);
            mesh.normals.push(normal);
            mesh.uvs.push(Vec2::new((cu + 1.0) * 0.5, (cv + 1.0) * 0.5));
        }
        mesh.faces.push(vec![base, base + 1, base + 2]);
        mesh.faces.push(vec![base, base + 2, base + 3]);
    }
    mesh
}

pub fn box_scene(half_extents: Vec3) -> ImportedScene {
    ImportedScene::single(box_mesh(half_extents))
}

/// Horizontal square at y = 0, facing up.
pub fn plane_scene(half_size: f32) -> ImportedScene {
    let h = half_size;
    ImportedScene::single(ImportedMesh {
        name: "plane".into(),
        positions: vec![
            Vec3::new(-h, 0.0, h),
            Vec3::new(h, 0.0, h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(-h, 0.0, -h),
        ],
        normals: vec![Vec3::Y; 4],
        uvs: vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
        faces: vec![vec![0, 1, 2], vec![0, 2, 3]],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_has_flat_shaded_faces() {
        let mesh = box_mesh(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.positions.len(), 24);
        assert_eq!(mesh.faces.len(), 12);
        assert!(mesh.faces.iter().all(|f| f.len() == 3));
        for p in &mesh.positions {
            assert_eq!(p.abs(), Vec3::new(1.0, 2.0, 3.0));
        }
    }

    #[test]
    fn box_triangles_wind_outward() {
        let mesh = box_mesh(Vec3::ONE);
        for face in &mesh.faces {
            let [a, b, c] = [0, 1, 2].map(|i| mesh.positions[face[i] as usize]);
            let n = mesh.normals[face[0] as usize];
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }

    #[test]
    fn plane_faces_up() {
        let scene = plane_scene(5.0);
        let mesh = &scene.meshes[0];
        let [a, b, c] = [0, 1, 2].map(|i| mesh.positions[mesh.faces[0][i] as usize]);
        assert!((b - a).cross(c - a).y > 0.0);
    }
}
