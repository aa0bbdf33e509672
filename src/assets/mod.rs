use crate::scene::{
    Aabb, Geometry, MaterialInfo, NodeId, Primitive, SceneGraph, SceneNode, Transform,
};
use glam::{Quat, Vec3};
use gltf::mesh::Mode;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;

/// A model read from disk, ready to replace the current scene.
#[derive(Debug)]
pub struct LoadedModel {
    pub name: String,
    pub path: PathBuf,
    pub scene: SceneGraph,
    pub bounds: Aabb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: usize,
    pub total: usize,
}

impl LoadProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.loaded as f32 / self.total as f32).clamp(0.0, 1.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read glTF at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse glTF {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("failed to load glTF buffers for {path}: {source}")]
    LoadBuffers {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("glTF {path} contains no scene")]
    NoScene { path: String },
    #[error("failed to start loader thread for {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("loader thread for {path} stopped without a result")]
    WorkerLost { path: String },
}

/// Reads a `.gltf`/`.glb` file into a fresh scene graph.
///
/// `progress` sees one step for the document, one for its buffers and one per
/// mesh; the last call reports `loaded == total`.
pub fn load_model(
    path: &Path,
    mut progress: impl FnMut(LoadProgress),
) -> Result<LoadedModel, AssetError> {
    let display = path.display().to_string();
    std::fs::metadata(path).map_err(|source| AssetError::Read {
        path: display.clone(),
        source,
    })?;

    let gltf::Gltf { document, blob } =
        gltf::Gltf::open(path).map_err(|source| AssetError::Parse {
            path: display.clone(),
            source,
        })?;

    let total = 2 + document.meshes().len();
    let mut loaded = 1;
    progress(LoadProgress { loaded, total });

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let buffers = gltf::import_buffers(&document, Some(base), blob).map_err(|source| {
        AssetError::LoadBuffers {
            path: display.clone(),
            source,
        }
    })?;
    loaded += 1;
    progress(LoadProgress { loaded, total });

    let mut meshes: Vec<Option<Arc<Geometry>>> = Vec::with_capacity(document.meshes().len());
    for mesh in document.meshes() {
        meshes.push(convert_mesh(&mesh, &buffers));
        loaded += 1;
        progress(LoadProgress { loaded, total });
    }

    let gltf_scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| AssetError::NoScene {
            path: display.clone(),
        })?;

    let name = gltf_scene
        .name()
        .map(str::to_string)
        .or_else(|| path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string))
        .unwrap_or_else(|| "model".to_string());

    let mut scene = SceneGraph::new();
    let root = scene.add_node(None, SceneNode::new(name.clone()));
    let mut visited = vec![false; document.nodes().len()];
    let mut stack: Vec<(gltf::Node, NodeId)> =
        gltf_scene.nodes().map(|node| (node, root)).collect();
    stack.reverse();
    while let Some((node, parent)) = stack.pop() {
        if std::mem::replace(&mut visited[node.index()], true) {
            log::warn!("glTF node {} is referenced more than once; skipped", node.index());
            continue;
        }
        let id = scene.add_node(Some(parent), convert_node(&node, &meshes));
        let first_child = stack.len();
        stack.extend(node.children().map(|child| (child, id)));
        stack[first_child..].reverse();
    }

    let bounds = scene.model_bounds();
    log::info!(
        "Loaded glTF {} ({} nodes, {} meshes)",
        display,
        scene.len(),
        meshes.iter().flatten().count()
    );
    Ok(LoadedModel {
        name,
        path: path.to_path_buf(),
        scene,
        bounds,
    })
}

fn convert_node(node: &gltf::Node, meshes: &[Option<Arc<Geometry>>]) -> SceneNode {
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform {
        translation: Vec3::from(translation),
        rotation: Quat::from_array(rotation),
        scale: Vec3::from(scale),
    };

    let mesh = node.mesh();
    let name = node
        .name()
        .or_else(|| mesh.as_ref().and_then(|mesh| mesh.name()))
        .unwrap_or_default();

    let mut out = SceneNode::new(name).with_transform(transform);
    if let Some(geometry) = mesh
        .as_ref()
        .and_then(|mesh| meshes.get(mesh.index()).cloned().flatten())
    {
        out = out.with_geometry(geometry);
    }

    let mesh_extras = mesh.as_ref().and_then(|mesh| parse_extras(mesh.extras()));
    if let Some(metadata) = merge_extras(mesh_extras, parse_extras(node.extras())) {
        out = out.with_metadata(metadata);
    }
    out
}

/// Node keys override mesh keys when both are objects; otherwise node extras win outright.
fn merge_extras(mesh: Option<Value>, node: Option<Value>) -> Option<Value> {
    match (mesh, node) {
        (Some(Value::Object(mut merged)), Some(Value::Object(node))) => {
            for (key, value) in node {
                merged.insert(key, value);
            }
            Some(Value::Object(merged))
        }
        (mesh, node) => node.or(mesh),
    }
}

fn parse_extras(extras: &gltf::json::Extras) -> Option<Value> {
    let raw = extras.as_ref()?;
    match serde_json::from_str::<Value>(raw.get()) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("Ignoring unreadable glTF extras: {}", err);
            None
        }
    }
}

fn convert_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Option<Arc<Geometry>> {
    let label = mesh
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", mesh.index()));
    let mut primitives = Vec::new();
    for primitive in mesh.primitives() {
        let reader = primitive
            .reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            log::warn!(
                "Mesh {} primitive {} has no positions; skipped",
                label,
                primitive.index()
            );
            continue;
        };
        let positions: Vec<[f32; 3]> = positions.collect();
        let vertex_indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let Some(indices) = triangle_list(primitive.mode(), &vertex_indices) else {
            log::warn!(
                "Mesh {} primitive {} uses {:?} topology; only triangles are supported",
                label,
                primitive.index(),
                primitive.mode()
            );
            continue;
        };
        let vertex_count = positions.len() as u32;
        let indices: Vec<u32> = indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&index| index < vertex_count))
            .flatten()
            .copied()
            .collect();
        let normals = match reader.read_normals() {
            Some(normals) => normals.collect::<Vec<_>>(),
            None => Vec::new(),
        };
        let normals = if normals.len() == positions.len() {
            normals
        } else {
            vertex_normals(&positions, &indices)
        };

        let material = primitive.material();
        primitives.push(Primitive {
            positions,
            normals,
            indices,
            material: MaterialInfo {
                name: material.name().map(str::to_string),
                base_color: material.pbr_metallic_roughness().base_color_factor(),
            },
        });
    }

    if primitives.is_empty() {
        log::warn!("Mesh {} has no drawable triangles", label);
        return None;
    }
    Some(Arc::new(Geometry::new(primitives)))
}

/// Expands strips and fans into a plain triangle list. Non-triangle modes yield `None`.
fn triangle_list(mode: Mode, indices: &[u32]) -> Option<Vec<u32>> {
    match mode {
        Mode::Triangles => Some(indices.chunks_exact(3).flatten().copied().collect()),
        Mode::TriangleStrip => Some(
            indices
                .windows(3)
                .enumerate()
                .flat_map(|(i, w)| {
                    if i % 2 == 0 {
                        [w[0], w[1], w[2]]
                    } else {
                        [w[1], w[0], w[2]]
                    }
                })
                .collect(),
        ),
        Mode::TriangleFan => Some(
            indices
                .windows(2)
                .skip(1)
                .flat_map(|w| [indices[0], w[0], w[1]])
                .collect(),
        ),
        Mode::Points | Mode::Lines | Mode::LineLoop | Mode::LineStrip => None,
    }
}

/// Area-weighted smooth normals for meshes exported without them.
fn vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut sums = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [Some(a), Some(b), Some(c)] = [0, 1, 2].map(|k| positions.get(tri[k] as usize)) else {
            continue;
        };
        let (a, b, c) = (Vec3::from(*a), Vec3::from(*b), Vec3::from(*c));
        let face = (b - a).cross(c - a);
        for &index in tri {
            sums[index as usize] += face;
        }
    }
    sums.into_iter()
        .map(|sum| sum.try_normalize().unwrap_or(Vec3::Z).to_array())
        .collect()
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress(LoadProgress),
    Finished(Result<LoadedModel, AssetError>),
}

/// Background model load. The worker owns the file work; the UI thread drains
/// events with [`LoadJob::poll`] once per frame.
pub struct LoadJob {
    path: PathBuf,
    receiver: Receiver<LoadEvent>,
    finished: bool,
}

impl LoadJob {
    pub fn spawn(path: PathBuf) -> Result<Self, AssetError> {
        let (sender, receiver) = mpsc::channel();
        let worker_path = path.clone();
        std::thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || {
                let progress_sender = sender.clone();
                let result = load_model(&worker_path, |progress| {
                    let _ = progress_sender.send(LoadEvent::Progress(progress));
                });
                let _ = sender.send(LoadEvent::Finished(result));
            })
            .map_err(|source| AssetError::Spawn {
                path: path.display().to_string(),
                source,
            })?;
        log::info!("Loading model {}", path.display());
        Ok(Self {
            path,
            receiver,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Events received since the last call. Exactly one `Finished` is ever
    /// returned over the job's lifetime.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while !self.finished {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.finished = matches!(event, LoadEvent::Finished(_));
                    events.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    events.push(LoadEvent::Finished(Err(AssetError::WorkerLost {
                        path: self.path.display().to_string(),
                    })));
                }
            }
        }
        events
    }
}
