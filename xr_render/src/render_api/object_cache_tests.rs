/// Unit tests for ApiObjectCache: uniqueness, lifecycle links, typed access.

use crate::render_api::mock_backend::{MockApiObject, MockObjectFactory, OtherApiObject};
use crate::render_api::{ApiObjectCache, ApiRenderObject};
use crate::render_object::*;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Barrier};
use std::time::Duration;

fn setup() -> (Arc<RenderObjectRegistry>, Arc<MockObjectFactory>, Arc<ApiObjectCache>) {
    let registry = RenderObjectRegistry::new();
    let factory = MockObjectFactory::new();
    let cache = ApiObjectCache::new(factory.clone());
    (registry, factory, cache)
}

fn texture(registry: &RenderObjectRegistry, name: &str) -> Arc<GenericRenderObject> {
    registry
        .create_texture(name, TextureDesc::texture_2d(16, 16, TextureFormat::R8G8B8A8_UNORM))
        .unwrap()
}

// ============================================================================
// Uniqueness
// ============================================================================

#[test]
fn test_get_or_create_returns_same_wrapper() {
    let (registry, factory, cache) = setup();
    let tex = texture(&registry, "albedo");

    let first = cache.get_or_create(&tex, false).unwrap();
    let second = cache.get_or_create(&tex, false).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(factory.created_count(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_concurrent_first_resolution_creates_one_wrapper() {
    let (registry, factory, cache) = setup();
    *factory.generate_delay.lock().unwrap() = Some(Duration::from_millis(5));
    let tex = texture(&registry, "shared");
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let tex = tex.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                cache.get_or_create(&tex, true).unwrap()
            })
        })
        .collect();

    let wrappers: Vec<Arc<dyn ApiRenderObject>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for wrapper in &wrappers[1..] {
        assert!(Arc::ptr_eq(&wrappers[0], wrapper));
    }
    assert_eq!(factory.created_count(), 1);
    assert_eq!(factory.created_for(tex.id()).unwrap().generate_count(), 1);
    assert!(wrappers[0].is_generated());
}

#[test]
fn test_try_get_does_not_create() {
    let (registry, factory, cache) = setup();
    let tex = texture(&registry, "t");

    assert!(cache.try_get(tex.id()).is_none());
    assert_eq!(factory.created_count(), 0);

    cache.get_or_create(&tex, false);
    assert!(cache.try_get(tex.id()).is_some());
}

#[test]
fn test_generate_now_flag() {
    let (registry, factory, cache) = setup();
    let lazy = texture(&registry, "lazy");
    let eager = texture(&registry, "eager");

    assert!(!cache.get_or_create(&lazy, false).unwrap().is_generated());
    assert!(cache.get_or_create(&eager, true).unwrap().is_generated());
    assert_eq!(factory.created_for(lazy.id()).unwrap().generate_count(), 0);
}

#[test]
fn test_failed_generation_leaves_wrapper_unrealized() {
    let (registry, factory, cache) = setup();
    factory.fail_generate.store(true, Ordering::SeqCst);
    let tex = texture(&registry, "broken");

    let api = cache.get_or_create(&tex, true).unwrap();
    assert!(!api.is_generated());
    assert_eq!(api.handle(), None);
}

#[test]
fn test_refused_kind_returns_none() {
    let (registry, factory, cache) = setup();
    factory.refused.lock().unwrap().push(RenderObjectKind::Shader);
    let shader = registry.create_shader("vs", ShaderStage::Vertex, "a.vert").unwrap();

    assert!(cache.get_or_create(&shader, false).is_none());
    assert!(cache.is_empty());
}

// ============================================================================
// Typed access
// ============================================================================

#[test]
fn test_generic_to_api_typed() {
    let (registry, factory, cache) = setup();
    factory.meshes_as_other.store(true, Ordering::SeqCst);
    let tex = texture(&registry, "t");
    let mesh = registry.create_mesh("m", Mesh::new(3, 0, PrimitiveTopology::TriangleList)).unwrap();

    let typed = cache.generic_to_api::<MockApiObject>(&tex, false).unwrap();
    assert_eq!(typed.generic_id, tex.id());

    assert!(cache.generic_to_api::<MockApiObject>(&mesh, false).is_none());
    assert!(cache.generic_to_api::<OtherApiObject>(&mesh, false).is_some());
    // Wrong-type lookup still cached the wrapper
    assert_eq!(cache.len(), 2);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_destroy_propagates_to_every_cache() {
    let registry = RenderObjectRegistry::new();
    let factory_a = MockObjectFactory::new();
    let factory_b = MockObjectFactory::new();
    let cache_a = ApiObjectCache::new(factory_a.clone());
    let cache_b = ApiObjectCache::new(factory_b.clone());
    let tex = texture(&registry, "shared");

    cache_a.get_or_create(&tex, true);
    cache_b.get_or_create(&tex, true);
    assert_eq!(tex.linked_count(), 3);

    tex.destroy();

    assert!(cache_a.try_get(tex.id()).is_none());
    assert!(cache_b.try_get(tex.id()).is_none());
    for factory in [&factory_a, &factory_b] {
        let mock = factory.created_for(tex.id()).unwrap();
        assert_eq!(mock.destroy_count(), 1);
        assert_eq!(mock.received_events(), vec![GenericEvent::Destroyed]);
    }
}

#[test]
fn test_destroyed_object_not_recreated() {
    let (registry, factory, cache) = setup();
    let tex = texture(&registry, "gone");
    tex.destroy();

    assert!(cache.get_or_create(&tex, true).is_none());
    assert_eq!(factory.created_count(), 0);
}

#[test]
fn test_evict_unlinks_and_releases() {
    let (registry, factory, cache) = setup();
    let tex = texture(&registry, "t");
    cache.get_or_create(&tex, true);
    assert_eq!(tex.linked_count(), 2);

    assert!(cache.evict(tex.id()));
    assert!(!cache.evict(tex.id()));
    assert_eq!(tex.linked_count(), 1);
    assert_eq!(factory.created_for(tex.id()).unwrap().destroy_count(), 1);

    // Destroy after eviction doesn't reach the old wrapper
    tex.destroy();
    assert!(factory.created_for(tex.id()).unwrap().received_events().is_empty());
}

#[test]
fn test_clear_evicts_everything() {
    let (registry, _factory, cache) = setup();
    let a = texture(&registry, "a");
    let b = texture(&registry, "b");
    cache.get_or_create(&a, false);
    cache.get_or_create(&b, false);

    assert_eq!(cache.clear(), 2);
    assert!(cache.is_empty());
    assert_eq!(a.linked_count(), 1);
}

#[test]
fn test_materialize_skips_cached() {
    let (registry, factory, cache) = setup();
    let a = texture(&registry, "a");
    let _b = texture(&registry, "b");
    cache.get_or_create(&a, false);

    assert_eq!(cache.materialize(&registry.live_objects()), 1);
    assert_eq!(cache.len(), 2);
    assert_eq!(factory.created_count(), 2);
}

#[test]
fn test_targets_dirty_flag() {
    let (registry, factory, cache) = setup();
    let color = texture(&registry, "color");
    let fbo = registry.create_frame_buffer("fbo", vec![FrameBufferTarget::color(color, 0)]).unwrap();
    cache.get_or_create(&fbo, false);

    // Set on creation, consumed once
    assert!(cache.take_target_refresh(fbo.id()).is_some());
    assert!(cache.take_target_refresh(fbo.id()).is_none());

    let other = texture(&registry, "other");
    fbo.set_render_targets(vec![FrameBufferTarget::color(other, 0)]);
    assert!(cache.take_target_refresh(fbo.id()).is_some());
    assert_eq!(
        factory.created_for(fbo.id()).unwrap().received_events(),
        vec![GenericEvent::TargetsChanging, GenericEvent::TargetsChanged]
    );
}

#[test]
fn test_target_refresh_returns_attached_targets() {
    let (registry, _factory, cache) = setup();
    let color = texture(&registry, "color");
    let depth = texture(&registry, "depth");
    let fbo = registry
        .create_frame_buffer("fbo", vec![
            FrameBufferTarget::color(color.clone(), 0),
            FrameBufferTarget::with_attachment(depth.clone(), FrameBufferAttachment::DepthStencil),
        ])
        .unwrap();
    cache.get_or_create(&fbo, false);

    // Nothing attached before the first refresh
    assert!(cache.take_target_refresh(fbo.id()).unwrap().is_empty());

    fbo.set_render_targets(vec![FrameBufferTarget::color(color.clone(), 0)]);
    // A second change before any refresh keeps the targets the GPU still has
    fbo.set_render_targets(vec![FrameBufferTarget::color(texture(&registry, "other"), 0)]);

    let previous = cache.take_target_refresh(fbo.id()).unwrap();
    let attachments: Vec<_> = previous.iter().map(|t| (t.target.id(), t.attachment)).collect();
    assert_eq!(attachments, vec![
        (color.id(), FrameBufferAttachment::Color(0)),
        (depth.id(), FrameBufferAttachment::DepthStencil),
    ]);
    assert!(cache.take_target_refresh(fbo.id()).is_none());
}
