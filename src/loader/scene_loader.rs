use std::collections::HashMap;
use std::sync::Arc;

use glam::Mat4;
use log::{debug, error};
use tokio::task::JoinSet;

use crate::backend::RenderBackend;
use crate::error::LoadError;
use crate::graph::nodes::LoadedDocument;
use crate::io::common::loader::ByteSource;
use crate::loader::session::LoaderSession;

impl<B: RenderBackend, S: ByteSource> LoaderSession<B, S> {
    /// Loads one scene of the document end to end and hands back the loaded
    /// graph. On failure every resource constructed so far is released before
    /// the error surfaces; cancellation is the exception and leaves the
    /// registry to the caller.
    pub async fn load_scene(self: Arc<Self>, scene_override: Option<usize>) -> Result<LoadedDocument<B>, LoadError> {
        match Self::load_scene_inner(&self, scene_override).await {
            Ok(loaded) => Ok(loaded),
            Err(error) => {
                if matches!(error, LoadError::Cancelled) {
                    debug!(
                        "Load cancelled, leaving {} constructed resources registered",
                        self.registry.len()
                    );
                } else {
                    let disposed = self.registry.dispose_all();
                    error!("Aborting load, released {} constructed resources: {}", disposed, error);
                }
                Err(error)
            }
        }
    }

    async fn load_scene_inner(session: &Arc<Self>, scene_override: Option<usize>) -> Result<LoadedDocument<B>, LoadError> {
        let roots = if session.document.scenes.is_empty() && scene_override.is_none() {
            // A document without scenes still parses; it just loads empty.
            Vec::new()
        } else {
            let scene_index = scene_override.or(session.document.scene).unwrap_or(0);
            session.document.scene(scene_index)?.nodes.clone()
        };

        let mut branches = JoinSet::new();
        for &root in &roots {
            branches.spawn(Arc::clone(session).load_node_tree(root, Mat4::IDENTITY));
        }
        // On the first error the remaining branches are aborted, but the set
        // is still drained to the end: a branch inside a synchronous backend
        // construction settles (and registers its handle) only after that
        // call returns, and disposing before it settles would leak it.
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
        if let Some(error) = first_error {
            return Err(error);
        }

        // Animations are their own pass: channels target nodes by index and
        // never gate node construction.
        let mut animation_branches = JoinSet::new();
        for index in 0..session.document.animations.len() {
            let session = Arc::clone(session);
            animation_branches.spawn(async move { session.animation_group(index).await.map(|group| (index, group)) });
        }
        let mut groups = Vec::new();
        let mut first_error = None;
        while let Some(joined) = animation_branches.join_next().await {
            let settled = match joined {
                Ok(settled) => settled,
                Err(join_error) => Err(join_error.into()),
            };
            match settled {
                Ok((index, Some(group))) => groups.push((index, group)),
                Ok((_, None)) => {}
                Err(error) => {
                    if first_error.is_none() {
                        animation_branches.abort_all();
                        first_error = Some(error);
                    }
                }
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }
        groups.sort_by_key(|(index, _)| *index);
        let animation_groups = groups.into_iter().map(|(_, group)| group).collect();

        let nodes = session.scene_nodes.iter().map(|slot| slot.load_full()).collect();
        let material_consumers: HashMap<_, _> = session
            .material_consumers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        Ok(LoadedDocument::new(
            nodes,
            roots,
            animation_groups,
            material_consumers,
            Arc::clone(&session.registry),
        ))
    }
}
