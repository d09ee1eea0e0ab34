use crate::AssetError;
use ink_common::Vertex;
use std::path::Path;

/// Import a Wavefront OBJ file as a flat triangle list.
///
/// Faces are triangulated and indices expanded, so the result can be uploaded
/// and drawn without an index buffer. Missing normals or texcoords are zeroed;
/// missing vertex colors default to white. All models in the file are merged.
pub fn load_obj(path: impl AsRef<Path>) -> Result<Vec<Vertex>, AssetError> {
    let path = path.as_ref();
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, _materials) = tobj::load_obj(path, &options).map_err(|source| AssetError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    let mut vertices = Vec::new();
    for model in &models {
        append_mesh(&model.mesh, &mut vertices);
    }

    if vertices.is_empty() {
        return Err(AssetError::EmptyGeometry(path.to_path_buf()));
    }

    tracing::debug!(
        path = %path.display(),
        models = models.len(),
        vertices = vertices.len(),
        "imported OBJ geometry"
    );
    Ok(vertices)
}

fn append_mesh(mesh: &tobj::Mesh, out: &mut Vec<Vertex>) {
    let has_normals = !mesh.normals.is_empty();
    let has_texcoords = !mesh.texcoords.is_empty();
    let has_colors = !mesh.vertex_color.is_empty();

    out.reserve(mesh.indices.len());
    for &index in &mesh.indices {
        let i = index as usize;
        let position = [
            mesh.positions[3 * i],
            mesh.positions[3 * i + 1],
            mesh.positions[3 * i + 2],
        ];
        let color = if has_colors {
            [
                mesh.vertex_color[3 * i],
                mesh.vertex_color[3 * i + 1],
                mesh.vertex_color[3 * i + 2],
            ]
        } else {
            [1.0, 1.0, 1.0]
        };
        let texcoord = if has_texcoords {
            [mesh.texcoords[2 * i], mesh.texcoords[2 * i + 1]]
        } else {
            [0.0, 0.0]
        };
        let normal = if has_normals {
            [
                mesh.normals[3 * i],
                mesh.normals[3 * i + 1],
                mesh.normals[3 * i + 2],
            ]
        } else {
            [0.0, 0.0, 0.0]
        };
        out.push(Vertex::new(position, color, texcoord, normal));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_obj(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn quad_face_is_triangulated_and_expanded() {
        let file = write_obj(
            "v -1 -1 0\nv 1 -1 0\nv 1 1 0\nv -1 1 0\n\
             vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
             vn 0 0 1\n\
             f 1/1/1 2/2/1 3/3/1 4/4/1\n",
        );
        let vertices = load_obj(file.path()).unwrap();
        assert_eq!(vertices.len(), 6);
        assert!(vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert!(vertices.iter().all(|v| v.color == [1.0, 1.0, 1.0]));
        assert_eq!(vertices[0].position, [-1.0, -1.0, 0.0]);
        assert_eq!(vertices[2].texcoord, [1.0, 1.0]);
    }

    #[test]
    fn missing_attributes_are_zeroed() {
        let file = write_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        let vertices = load_obj(file.path()).unwrap();
        assert_eq!(vertices.len(), 3);
        assert!(vertices.iter().all(|v| v.normal == [0.0; 3]));
        assert!(vertices.iter().all(|v| v.texcoord == [0.0; 2]));
    }

    #[test]
    fn file_without_faces_is_rejected() {
        let file = write_obj("v 0 0 0\nv 1 0 0\n");
        assert!(matches!(
            load_obj(file.path()),
            Err(AssetError::EmptyGeometry(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_obj("does/not/exist.obj").unwrap_err();
        assert!(matches!(err, AssetError::Obj { .. }));
        assert!(err.to_string().contains("exist.obj"));
    }
}
