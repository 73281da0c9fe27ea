use std::sync::Arc;

use holoscene::common::types::{DecodedAccessor, MaterialVariant, VertexAttributeKind};
use holoscene::error::LoadError;
use holoscene::graph::nodes::{MaterialKey, PrimitiveRef};
use serde_json::json;

mod common;
use common::{CountingSource, MockBackend, StallingBackend, float_bytes, parse, session, u16_bytes};
use holoscene::loader::session::LoaderSession;

#[tokio::test]
async fn loads_positions_end_to_end() -> Result<(), anyhow::Error> {
    let positions: Vec<f32> = (0..12).map(|i| i as f32).collect();
    let indices: Vec<u16> = vec![0, 1, 2, 2, 1, 3];
    let document = json!({
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3"},
            {"bufferView": 1, "componentType": 5123, "count": 6, "type": "SCALAR"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteLength": 48},
            {"buffer": 0, "byteOffset": 48, "byteLength": 12}
        ],
        "buffers": [{"uri": "quad.bin", "byteLength": 60}]
    });
    let mut bytes = float_bytes(&positions);
    bytes.extend(u16_bytes(&indices));
    let source = CountingSource::default().with("quad.bin", bytes);
    let (session, backend, source) = session(&document, source);

    let loaded = Arc::clone(&session).load_scene(None).await?;

    assert_eq!(loaded.stats.nodes, 1);
    assert_eq!(loaded.stats.vertex_buffers, 2);
    assert_eq!(loaded.stats.meshes, 1);
    assert_eq!(source.fetches("quad.bin"), 1);

    let uploads = backend.vertex_data.lock().unwrap();
    assert_eq!(uploads.len(), 2);
    let position = uploads.iter().find(|(k, _)| *k == VertexAttributeKind::Position).unwrap();
    assert_eq!(
        position.1,
        DecodedAccessor::Floats {
            components: 3,
            values: positions
        }
    );
    let index = uploads.iter().find(|(k, _)| *k == VertexAttributeKind::Index).unwrap();
    assert_eq!(index.1, DecodedAccessor::Uints(vec![0, 1, 2, 2, 1, 3]));
    Ok(())
}

#[tokio::test]
async fn one_buffer_is_fetched_once_for_many_accessors() -> Result<(), anyhow::Error> {
    let data: Vec<f32> = (0..24).map(|i| i as f32).collect();
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0, "NORMAL": 1}}]}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3"},
            {"bufferView": 1, "componentType": 5126, "count": 4, "type": "VEC3"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteLength": 48},
            {"buffer": 0, "byteOffset": 48, "byteLength": 48}
        ],
        "buffers": [{"uri": "shared.bin", "byteLength": 96}]
    });
    let source = CountingSource::default().with("shared.bin", float_bytes(&data));
    let (session, backend, source) = session(&document, source);

    let loaded = Arc::clone(&session).load_scene(None).await?;

    assert_eq!(source.fetches("shared.bin"), 1);
    assert_eq!(backend.created_of("vertex buffer"), 2);
    assert_eq!(loaded.stats.vertex_buffers, 2);
    Ok(())
}

#[tokio::test]
async fn one_accessor_consumed_two_ways_is_two_buffers() -> Result<(), anyhow::Error> {
    let data: Vec<f32> = (0..12).map(|i| i as f32).collect();
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0, "NORMAL": 0}}]}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3"}],
        "bufferViews": [{"buffer": 0, "byteLength": 48}],
        "buffers": [{"uri": "quad.bin", "byteLength": 48}]
    });
    let source = CountingSource::default().with("quad.bin", float_bytes(&data));
    let (session, backend, source) = session(&document, source);

    Arc::clone(&session).load_scene(None).await?;

    // One fetch, but one GPU buffer per consumed-as pairing.
    assert_eq!(source.fetches("quad.bin"), 1);
    assert_eq!(backend.created_of("vertex buffer"), 2);
    Ok(())
}

#[tokio::test]
async fn color_and_data_slots_get_distinct_textures_from_one_image() -> Result<(), anyhow::Error> {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "material": 0}]}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "buffers": [{"uri": "tri.bin", "byteLength": 36}],
        "images": [{"uri": "albedo.png"}],
        "textures": [{"source": 0}],
        "materials": [{
            "pbrMetallicRoughness": {
                "baseColorTexture": {"index": 0},
                "metallicRoughnessTexture": {"index": 0}
            }
        }]
    });
    let source = CountingSource::default()
        .with("tri.bin", float_bytes(&[0.0; 9]))
        .with("albedo.png", vec![1, 2, 3, 4]);
    let (session, backend, source) = session(&document, source);

    let loaded = Arc::clone(&session).load_scene(None).await?;

    // The image entity is fetched once; the conflicting interpretations are
    // two distinct GPU textures.
    assert_eq!(source.fetches("albedo.png"), 1);
    assert_eq!(backend.created_of("texture"), 2);
    assert_eq!(loaded.stats.textures, 2);

    let mut flags: Vec<bool> = backend.texture_calls.lock().unwrap().iter().map(|(f, _)| *f).collect();
    flags.sort();
    assert_eq!(flags, vec![false, true]);
    Ok(())
}

#[tokio::test]
async fn two_materials_share_one_texture_entity_per_interpretation() -> Result<(), anyhow::Error> {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [
            {"attributes": {"POSITION": 0}, "material": 0},
            {"attributes": {"POSITION": 0}, "material": 1}
        ]}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "buffers": [{"uri": "tri.bin", "byteLength": 36}],
        "images": [{"uri": "shared.png"}],
        "textures": [{"source": 0}],
        "materials": [
            {"pbrMetallicRoughness": {"baseColorTexture": {"index": 0}}},
            {"normalTexture": {"index": 0}}
        ]
    });
    let source = CountingSource::default()
        .with("tri.bin", float_bytes(&[0.0; 9]))
        .with("shared.png", vec![9, 9, 9]);
    let (session, backend, source) = session(&document, source);

    Arc::clone(&session).load_scene(None).await?;

    assert_eq!(source.fetches("shared.png"), 1);
    assert_eq!(backend.created_of("texture"), 2);
    let mut flags: Vec<bool> = backend.texture_calls.lock().unwrap().iter().map(|(f, _)| *f).collect();
    flags.sort();
    assert_eq!(flags, vec![false, true]);
    Ok(())
}

#[tokio::test]
async fn documents_requiring_unknown_extensions_are_rejected() {
    let document = json!({
        "asset": {"version": "2.0"},
        "extensionsRequired": ["KHR_draco_mesh_compression"],
        "scenes": [{"nodes": []}]
    });
    let parsed = common::parse(&document);
    let result = holoscene::loader::session::LoaderSession::new(
        parsed,
        Arc::new(common::MockBackend::new()),
        Arc::new(CountingSource::default()),
    );
    assert!(matches!(result, Err(LoadError::Unsupported { structural: true, .. })));
}

#[tokio::test]
async fn draw_mode_variants_split_one_material() -> Result<(), anyhow::Error> {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [
            {"attributes": {"POSITION": 0}, "material": 0},
            {"attributes": {"POSITION": 0, "COLOR_0": 1}, "material": 0}
        ]}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
            {"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 36}
        ],
        "buffers": [{"uri": "mesh.bin", "byteLength": 72}],
        "materials": [{"name": "paint"}]
    });
    let source = CountingSource::default().with("mesh.bin", float_bytes(&[0.0; 18]));
    let (session, backend, _source) = session(&document, source);

    let loaded = Arc::clone(&session).load_scene(None).await?;

    assert_eq!(backend.created_of("material"), 2);
    assert_eq!(loaded.stats.materials, 2);

    let plain = MaterialKey {
        index: 0,
        variant: MaterialVariant {
            vertex_colors: false,
            skinned: false,
        },
    };
    let colored = MaterialKey {
        index: 0,
        variant: MaterialVariant {
            vertex_colors: true,
            skinned: false,
        },
    };
    assert_eq!(
        loaded.material_consumers.get(&plain),
        Some(&vec![PrimitiveRef { mesh: 0, primitive: 0 }])
    );
    assert_eq!(
        loaded.material_consumers.get(&colored),
        Some(&vec![PrimitiveRef { mesh: 0, primitive: 1 }])
    );
    Ok(())
}

#[tokio::test]
async fn two_nodes_share_one_mesh_construction() -> Result<(), anyhow::Error> {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0, 1]}],
        "nodes": [{"mesh": 0}, {"mesh": 0, "translation": [1.0, 0.0, 0.0]}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "buffers": [{"uri": "tri.bin", "byteLength": 36}]
    });
    let source = CountingSource::default().with("tri.bin", float_bytes(&[0.0; 9]));
    let (session, backend, _source) = session(&document, source);

    let loaded = Arc::clone(&session).load_scene(None).await?;

    assert_eq!(loaded.stats.nodes, 2);
    assert_eq!(backend.created_of("mesh"), 1);

    let a = loaded.node(0).unwrap().mesh.load_full().unwrap();
    let b = loaded.node(1).unwrap().mesh.load_full().unwrap();
    assert_eq!(a.mesh, b.mesh);
    Ok(())
}

#[tokio::test]
async fn out_of_bounds_reference_constructs_nothing() {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 7}}]}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "buffers": [{"uri": "tri.bin", "byteLength": 36}]
    });
    let source = CountingSource::default().with("tri.bin", float_bytes(&[0.0; 9]));
    let (session, backend, _source) = session(&document, source);

    let result = Arc::clone(&session).load_scene(None).await;

    assert!(matches!(result, Err(LoadError::Document(_))));
    assert!(backend.handles().is_empty());
}

#[tokio::test]
async fn unsupported_animation_channels_degrade() -> Result<(), anyhow::Error> {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}],
        "nodes": [{}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR"},
            {"bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteLength": 8},
            {"buffer": 0, "byteOffset": 8, "byteLength": 24}
        ],
        "buffers": [{"uri": "anim.bin", "byteLength": 32}],
        "animations": [
            {
                "name": "walk",
                "channels": [
                    {"sampler": 0, "target": {"node": 0, "path": "translation"}},
                    {"sampler": 0, "target": {"node": 0, "path": "fov"}},
                    {"sampler": 0, "target": {"path": "translation"}}
                ],
                "samplers": [{"input": 0, "output": 1}]
            },
            {
                "channels": [{"sampler": 0, "target": {"node": 0, "path": "pointerSize"}}],
                "samplers": [{"input": 0, "output": 1}]
            }
        ]
    });
    let mut bytes = float_bytes(&[0.0, 1.0]);
    bytes.extend(float_bytes(&[0.0, 1.0, 0.0, 0.0, 2.0, 0.0]));
    let source = CountingSource::default().with("anim.bin", bytes);
    let (session, backend, _source) = session(&document, source);

    let loaded = Arc::clone(&session).load_scene(None).await?;

    // The first animation survives with its one usable channel; the second
    // degrades to nothing at all.
    assert_eq!(loaded.animation_groups.len(), 1);
    assert_eq!(loaded.stats.animation_groups, 1);
    assert_eq!(backend.created_of("animation group"), 1);
    Ok(())
}

#[tokio::test]
async fn skin_matrix_mismatch_aborts_and_releases() {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0, 1]}],
        "nodes": [
            {"camera": 0, "mesh": 0, "skin": 0},
            {"name": "joint"}
        ],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"},
            {"bufferView": 1, "componentType": 5126, "count": 2, "type": "MAT4"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 128}
        ],
        "buffers": [{"uri": "skin.bin", "byteLength": 164}],
        "skins": [{"joints": [1], "inverseBindMatrices": 1}],
        "cameras": [{"type": "perspective", "perspective": {"yfov": 1.0, "znear": 0.1}}]
    });
    let mut bytes = float_bytes(&[0.0; 9]);
    bytes.extend(float_bytes(&[0.0; 32]));
    let source = CountingSource::default().with("skin.bin", bytes);
    let (session, backend, _source) = session(&document, source);

    let result = Arc::clone(&session).load_scene(None).await;

    assert!(matches!(result, Err(LoadError::Malformed { .. })));
    // Whatever was constructed before the abort is released exactly once.
    let handles = backend.handles();
    assert!(!handles.is_empty());
    for handle in handles {
        assert_eq!(handle.disposals(), 1, "{} #{} not released exactly once", handle.kind, handle.id);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abort_waits_for_in_flight_constructions() {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0, 1]}],
        "nodes": [{"mesh": 0}, {"mesh": 1}],
        "meshes": [
            {"primitives": [{"attributes": {"POSITION": 0}}]},
            {"primitives": [{"attributes": {"POSITION": 1}}]}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3"},
            {"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteLength": 48},
            {"buffer": 0, "byteOffset": 48, "byteLength": 36}
        ],
        "buffers": [{"uri": "pair.bin", "byteLength": 84}]
    });
    let source = Arc::new(CountingSource::default().with("pair.bin", float_bytes(&[0.0; 21])));
    // Node 1's three-element stream fails while node 0's four-element
    // stream is still inside the engine call.
    let backend = Arc::new(StallingBackend {
        inner: MockBackend::new(),
        fail_elements: 3,
    });
    let session = LoaderSession::new(parse(&document), Arc::clone(&backend), source).unwrap();

    let result = Arc::clone(&session).load_scene(None).await;

    assert!(matches!(result, Err(LoadError::Backend(_))));
    // The release sweep must not start until the in-flight sibling has
    // settled, otherwise its handle gets created after the sweep and leaks.
    let handles = backend.inner.handles();
    assert!(!handles.is_empty());
    for handle in handles {
        assert_eq!(handle.disposals(), 1, "{} #{} not released exactly once", handle.kind, handle.id);
    }
}

#[tokio::test]
async fn cancellation_keeps_constructed_resources() {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "buffers": [{"uri": "tri.bin", "byteLength": 36}]
    });
    let source = CountingSource::default().with("tri.bin", float_bytes(&[0.0; 9]));
    let (session, backend, source) = session(&document, source);

    session.cancel();
    let result = Arc::clone(&session).load_scene(None).await;

    assert!(matches!(result, Err(LoadError::Cancelled)));
    assert_eq!(source.fetches("tri.bin"), 0);
    // Cancellation is not an error: nothing is auto-disposed.
    for handle in backend.handles() {
        assert_eq!(handle.disposals(), 0);
    }
}

#[tokio::test]
async fn document_without_scenes_loads_empty() -> Result<(), anyhow::Error> {
    let document = json!({"asset": {"version": "2.0"}});
    let (session, backend, _source) = session(&document, CountingSource::default());

    let loaded = Arc::clone(&session).load_scene(None).await?;

    assert_eq!(loaded.stats.nodes, 0);
    assert!(loaded.roots.is_empty());
    assert!(backend.handles().is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_default_scene_falls_back_to_the_first() -> Result<(), anyhow::Error> {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}, {"nodes": [1]}],
        "nodes": [{"name": "first"}, {"name": "second"}]
    });
    let (session, _backend, _source) = session(&document, CountingSource::default());

    let loaded = Arc::clone(&session).load_scene(None).await?;

    assert_eq!(loaded.roots, vec![0]);
    assert!(loaded.node(0).is_some());
    assert!(loaded.node(1).is_none());
    Ok(())
}

#[tokio::test]
async fn scene_override_picks_the_requested_scene() -> Result<(), anyhow::Error> {
    let document = json!({
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}, {"nodes": [1]}],
        "nodes": [{"name": "first"}, {"name": "second"}]
    });
    let (session, _backend, _source) = session(&document, CountingSource::default());

    let loaded = Arc::clone(&session).load_scene(Some(1)).await?;

    assert_eq!(loaded.roots, vec![1]);
    assert!(loaded.node(0).is_none());
    assert!(loaded.node(1).is_some());
    Ok(())
}

#[tokio::test]
async fn node_with_two_parents_is_rejected_up_front() {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0, 1]}],
        "nodes": [{"children": [2]}, {"children": [2]}, {}]
    });
    let parsed = common::parse(&document);
    let result = holoscene::loader::session::LoaderSession::new(
        parsed,
        Arc::new(common::MockBackend::new()),
        Arc::new(CountingSource::default()),
    );
    assert!(matches!(result, Err(LoadError::Malformed { .. })));
}

#[tokio::test]
async fn glb_bin_chunk_backs_the_uriless_buffer() -> Result<(), anyhow::Error> {
    let positions: Vec<f32> = (0..9).map(|i| i as f32).collect();
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "buffers": [{"byteLength": 36}]
    });
    let glb = common::build_glb(&document, &float_bytes(&positions));

    let parsed = gltf_document::reader::DocumentReader::parse(&glb)?;
    let backend = Arc::new(common::MockBackend::new());
    let session = holoscene::loader::session::LoaderSession::new(
        parsed,
        Arc::clone(&backend),
        Arc::new(CountingSource::default()),
    )?;

    let loaded = Arc::clone(&session).load_scene(None).await?;

    assert_eq!(loaded.stats.vertex_buffers, 1);
    let uploads = backend.vertex_data.lock().unwrap();
    assert_eq!(
        uploads[0].1,
        DecodedAccessor::Floats {
            components: 3,
            values: positions
        }
    );
    Ok(())
}

#[tokio::test]
async fn world_transforms_compose_down_the_tree() -> Result<(), anyhow::Error> {
    let document = json!({
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}],
        "nodes": [
            {"translation": [1.0, 0.0, 0.0], "children": [1]},
            {"translation": [0.0, 2.0, 0.0]}
        ]
    });
    let (session, _backend, _source) = session(&document, CountingSource::default());

    let loaded = Arc::clone(&session).load_scene(None).await?;

    let child = loaded.node(1).unwrap();
    assert_eq!(child.parent, Some(0));
    let origin = child.world_transform.transform_point3(glam::Vec3::ZERO);
    assert_eq!(origin, glam::Vec3::new(1.0, 2.0, 0.0));
    Ok(())
}
