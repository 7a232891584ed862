//! ASCII PLY export of the mesh buffers.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::Mesh;

/// Errors raised while writing a mesh file
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write mesh: {0}")]
    Write(#[from] std::io::Error),
}

/// Serialize positions, normals, colors and triangles as ASCII PLY
pub fn write_ply<W: Write>(mesh: &Mesh, mut out: W) -> Result<(), ExportError> {
    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {}", mesh.vertex_count())?;
    for property in ["x", "y", "z", "nx", "ny", "nz"] {
        writeln!(out, "property float {}", property)?;
    }
    for channel in ["red", "green", "blue"] {
        writeln!(out, "property uchar {}", channel)?;
    }
    writeln!(out, "element face {}", mesh.triangle_count())?;
    writeln!(out, "property list uchar int vertex_indices")?;
    writeln!(out, "end_header")?;

    for ((p, n), c) in mesh
        .vertices()
        .iter()
        .zip(mesh.normals())
        .zip(mesh.colors())
    {
        writeln!(
            out,
            "{} {} {} {} {} {} {} {} {}",
            p.x,
            p.y,
            p.z,
            n.x,
            n.y,
            n.z,
            to_byte(c[0]),
            to_byte(c[1]),
            to_byte(c[2])
        )?;
    }

    for [a, b, c] in mesh.triangles() {
        writeln!(out, "3 {} {} {}", a, b, c)?;
    }

    out.flush()?;
    Ok(())
}

/// Create `path` and write the mesh into it
pub fn export_ply(mesh: &Mesh, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|source| ExportError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    write_ply(mesh, BufWriter::new(file))
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::SEA_GREEN;
    use glam::Vec3;

    fn triangle() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vec3::ZERO, SEA_GREEN);
        mesh.add_vertex(Vec3::X, SEA_GREEN);
        mesh.add_vertex(Vec3::Y, SEA_GREEN);
        mesh.add_shaded_triangle(0, 1, 2);
        mesh
    }

    #[test]
    fn test_ply_header_counts() {
        let mut buf = Vec::new();
        write_ply(&triangle(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("ply\nformat ascii 1.0\n"));
        assert!(text.contains("element vertex 3\n"));
        assert!(text.contains("element face 1\n"));
        assert!(text.contains("property list uchar int vertex_indices\n"));
    }

    #[test]
    fn test_ply_body_layout() {
        let mut buf = Vec::new();
        write_ply(&triangle(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let body: Vec<&str> = text
            .split("end_header\n")
            .nth(1)
            .unwrap()
            .lines()
            .collect();

        assert_eq!(body.len(), 4);
        assert_eq!(body[1], "1 0 0 0 0 1 46 139 87");
        assert_eq!(body[3], "3 0 1 2");
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let path = Path::new("/nonexistent/testpressing/meshdump_0.ply");
        let err = export_ply(&triangle(), path).unwrap_err();
        assert!(matches!(err, ExportError::Create { .. }));
    }

    #[test]
    fn test_export_writes_file() {
        let path = std::env::temp_dir().join(format!("meshdump_test_{}.ply", std::process::id()));

        export_ply(&triangle(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("element face 1"));
        assert!(text.ends_with("3 0 1 2\n"));

        std::fs::remove_file(&path).unwrap();
    }
}
