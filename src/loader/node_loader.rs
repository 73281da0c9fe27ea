use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use glam::{Mat4, Quat, Vec3};
use gltf_document::types::{CameraKind, Document, LightKind as DocumentLightKind, Node};
use log::warn;
use tokio::task::JoinSet;

use crate::backend::RenderBackend;
use crate::common::types::{CameraParams, CameraProjection, DecodedAccessor, JointDesc, LightKind, LightParams};
use crate::error::LoadError;
use crate::graph::nodes::{GpuResource, MeshInstance, SceneNode, SkinRoot};
use crate::importer::accessor_importer::OutputKind;
use crate::io::common::loader::ByteSource;
use crate::loader::session::LoaderSession;

fn local_transform(node: &Node) -> Mat4 {
    match &node.matrix {
        Some(matrix) => Mat4::from_cols_array(matrix),
        None => Mat4::from_scale_rotation_translation(
            Vec3::from(node.scale),
            Quat::from_array(node.rotation),
            Vec3::from(node.translation),
        ),
    }
}

impl<B: RenderBackend, S: ByteSource> LoaderSession<B, S> {
    /// The node graph must be a forest: every child index in bounds, at most
    /// one parent per node, no cycles. Validated before anything is fetched.
    pub(crate) fn build_parent_table(document: &Document) -> Result<Vec<Option<usize>>, LoadError> {
        let mut parent_of: Vec<Option<usize>> = vec![None; document.nodes.len()];
        for node in &document.nodes {
            for &child in &node.children {
                document.node(child)?;
                if let Some(existing) = parent_of[child] {
                    return Err(LoadError::malformed(format!(
                        "node {} is a child of both node {} and node {}",
                        child, existing, node.index
                    )));
                }
                parent_of[child] = Some(node.index);
            }
        }

        // With single parents enforced, a cycle is a parent chain that never
        // reaches a root.
        for start in 0..parent_of.len() {
            let mut current = start;
            let mut steps = 0;
            while let Some(parent) = parent_of[current] {
                current = parent;
                steps += 1;
                if steps > parent_of.len() {
                    return Err(LoadError::malformed(format!(
                        "the node graph contains a cycle through node {}",
                        start
                    )));
                }
            }
        }
        Ok(parent_of)
    }

    /// Builds the transform node for `index` and recurses into its children,
    /// sibling subtrees concurrently. The first failing branch aborts the
    /// rest.
    pub(crate) fn load_node_tree(
        self: Arc<Self>,
        index: usize,
        parent_world: Mat4,
    ) -> Pin<Box<dyn Future<Output = Result<(), LoadError>> + Send>> {
        Box::pin(async move {
            let node = self.document.node(index)?;
            let local = local_transform(node);
            let world = parent_world * local;

            let scene_node = Arc::new(SceneNode {
                index,
                name: node.name.clone(),
                parent: self.parent_of[index],
                children: node.children.clone(),
                local_transform: local,
                world_transform: world,
                mesh: ArcSwapOption::empty(),
                camera: ArcSwapOption::empty(),
                light: ArcSwapOption::empty(),
                skin_root: ArcSwapOption::empty(),
            });
            self.scene_nodes[index].store(Some(Arc::clone(&scene_node)));

            if let Some(camera_index) = node.camera {
                let handle = self.camera_handle(camera_index).await?;
                scene_node.camera.store(Some(Arc::new(handle)));
            }
            if let Some(light_ref) = &node.extensions.khr_lights_punctual {
                let handle = self.light_handle(light_ref.light).await?;
                scene_node.light.store(Some(Arc::new(handle)));
            }

            match (node.mesh, node.skin) {
                (Some(mesh_index), skin) => {
                    if let Some(skin_index) = skin {
                        let skin_record = self.document.skin(skin_index)?;
                        let name = skin_record
                            .name
                            .clone()
                            .or_else(|| node.name.clone())
                            .unwrap_or_else(|| format!("skin{}", skin_index));
                        scene_node.skin_root.store(Some(Arc::new(SkinRoot {
                            name,
                            world_transform: world,
                        })));
                    }
                    let mesh = self.mesh_handle(mesh_index, skin).await?;
                    let skeleton = match skin {
                        Some(skin_index) => Some(self.skeleton_handle(skin_index).await?),
                        None => None,
                    };
                    scene_node.mesh.store(Some(Arc::new(MeshInstance { mesh, skeleton })));
                }
                (None, Some(_)) => {
                    return Err(LoadError::malformed(format!("node {} has a skin but no mesh", index)));
                }
                (None, None) => {}
            }

            let mut branches = JoinSet::new();
            for &child in &node.children {
                branches.spawn(Arc::clone(&self).load_node_tree(child, world));
            }
            // Sibling branches must all have settled before this branch
            // reports its error, otherwise abort cleanup at the session level
            // could run while a sibling is still mid-construction.
            let mut first_error = None;
            while let Some(joined) = branches.join_next().await {
                let settled = match joined {
                    Ok(settled) => settled,
                    Err(join_error) => Err(join_error.into()),
                };
                if let Err(error) = settled {
                    if first_error.is_none() {
                        branches.abort_all();
                        first_error = Some(error);
                    }
                }
            }
            match first_error {
                Some(error) => Err(error),
                None => Ok(()),
            }
        })
    }

    /// One engine skeleton per skin entity, shared by every mesh the skin
    /// binds.
    pub async fn skeleton_handle(&self, skin_index: usize) -> Result<B::SkeletonHandle, LoadError> {
        let skin = self.document.skin(skin_index)?;
        self.skeleton_cache
            .resolve(skin_index, || async move {
                if skin.joints.is_empty() {
                    return Err(LoadError::malformed(format!("skin {} has no joints", skin_index)));
                }
                let joints = skin
                    .joints
                    .iter()
                    .map(|&joint| {
                        let node = self.document.node(joint)?;
                        Ok(JointDesc {
                            node_index: joint,
                            name: node.name.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>, LoadError>>()?;

                let matrices = match skin.inverse_bind_matrices {
                    Some(accessor_index) => {
                        let decoded = self.decoded_accessor(accessor_index, OutputKind::Floats).await?;
                        match decoded {
                            DecodedAccessor::Floats { components: 16, values } => {
                                values.chunks_exact(16).map(Mat4::from_cols_slice).collect::<Vec<_>>()
                            }
                            _ => {
                                return Err(LoadError::malformed(format!(
                                    "skin {} inverse bind matrices accessor {} is not MAT4 float data",
                                    skin_index, accessor_index
                                )));
                            }
                        }
                    }
                    None => vec![Mat4::IDENTITY; skin.joints.len()],
                };
                if matrices.len() != joints.len() {
                    return Err(LoadError::malformed(format!(
                        "skin {} has {} joints but {} inverse bind matrices",
                        skin_index,
                        joints.len(),
                        matrices.len()
                    )));
                }

                self.ensure_active()?;
                let handle = self.backend.create_skeleton(skin.name.as_deref(), &joints, &matrices)?;
                self.registry.track(GpuResource::Skeleton(handle.clone()));
                Ok(handle)
            })
            .await
    }

    pub async fn camera_handle(&self, camera_index: usize) -> Result<B::CameraHandle, LoadError> {
        let camera = self.document.camera(camera_index)?;
        self.camera_cache
            .resolve(camera_index, || async move {
                let kind = match camera.kind {
                    CameraKind::Perspective => {
                        let perspective = camera.perspective.as_ref().ok_or_else(|| {
                            LoadError::malformed(format!("perspective camera {} has no perspective block", camera_index))
                        })?;
                        CameraProjection::Perspective {
                            aspect_ratio: perspective.aspect_ratio,
                            yfov: perspective.yfov,
                            znear: perspective.znear,
                            zfar: perspective.zfar,
                        }
                    }
                    CameraKind::Orthographic => {
                        let orthographic = camera.orthographic.as_ref().ok_or_else(|| {
                            LoadError::malformed(format!(
                                "orthographic camera {} has no orthographic block",
                                camera_index
                            ))
                        })?;
                        CameraProjection::Orthographic {
                            xmag: orthographic.xmag,
                            ymag: orthographic.ymag,
                            znear: orthographic.znear,
                            zfar: orthographic.zfar,
                        }
                    }
                };

                self.ensure_active()?;
                let handle = self.backend.create_camera(&CameraParams {
                    name: camera.name.clone(),
                    kind,
                })?;
                self.registry.track(GpuResource::Camera(handle.clone()));
                Ok(handle)
            })
            .await
    }

    pub async fn light_handle(&self, light_index: usize) -> Result<B::LightHandle, LoadError> {
        let light = self.document.light(light_index)?;
        self.light_cache
            .resolve(light_index, || async move {
                let kind = match light.kind {
                    DocumentLightKind::Directional => LightKind::Directional,
                    DocumentLightKind::Point => LightKind::Point { range: light.range },
                    DocumentLightKind::Spot => {
                        let spot = light.spot.as_ref();
                        if spot.is_none() {
                            warn!("Spot light {} carries no cone angles, using the defaults", light_index);
                        }
                        LightKind::Spot {
                            range: light.range,
                            inner_cone_angle: spot.map(|s| s.inner_cone_angle).unwrap_or(0.0),
                            outer_cone_angle: spot.map(|s| s.outer_cone_angle).unwrap_or(std::f32::consts::FRAC_PI_4),
                        }
                    }
                };

                self.ensure_active()?;
                let handle = self.backend.create_light(&LightParams {
                    name: light.name.clone(),
                    color: Vec3::from(light.color),
                    intensity: light.intensity,
                    kind,
                })?;
                self.registry.track(GpuResource::Light(handle.clone()));
                Ok(handle)
            })
            .await
    }
}
