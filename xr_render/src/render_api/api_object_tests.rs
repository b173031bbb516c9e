/// Unit tests for the API object residency lifecycle.

use crate::render_api::mock_backend::MockApiObject;
use crate::render_api::{ApiRenderObject, Residency, ResidencyState};
use crate::render_object::{ObjectId, RenderObjectKind};
use std::sync::{Arc, Barrier};

fn mock_object() -> Arc<MockApiObject> {
    Arc::new(MockApiObject::new(ObjectId::new(), RenderObjectKind::Texture, 7))
}

// ============================================================================
// Residency
// ============================================================================

#[test]
fn test_residency_transitions() {
    let residency = Residency::new();
    assert_eq!(residency.state(), ResidencyState::Unrealized);

    assert!(residency.try_begin_generate());
    assert_eq!(residency.state(), ResidencyState::Generating);
    assert!(!residency.try_begin_generate());

    assert!(residency.finish_generate(true));
    assert!(residency.is_resident());

    assert!(residency.reset());
    assert!(!residency.reset());
    assert_eq!(residency.state(), ResidencyState::Unrealized);
}

#[test]
fn test_residency_failed_generation_returns_to_unrealized() {
    let residency = Residency::new();
    assert!(residency.try_begin_generate());
    assert!(residency.finish_generate(false));
    assert_eq!(residency.state(), ResidencyState::Unrealized);
    assert!(residency.try_begin_generate());
}

#[test]
fn test_finish_after_reset_reports_release() {
    let residency = Residency::new();
    assert!(residency.try_begin_generate());
    assert!(!residency.reset());
    assert!(!residency.finish_generate(true));
    assert_eq!(residency.state(), ResidencyState::Unrealized);
}

// ============================================================================
// Generate / destroy
// ============================================================================

#[test]
fn test_generate_once() {
    let mock = mock_object();
    let api: Arc<dyn ApiRenderObject> = mock.clone();

    assert!(!api.is_generated());
    assert_eq!(api.handle(), None);
    assert!(api.generate().unwrap());
    assert!(!api.generate().unwrap());

    assert!(api.is_generated());
    assert_eq!(api.handle(), Some(7));
    assert_eq!(mock.generate_count(), 1);
}

#[test]
fn test_destroy_only_releases_resident() {
    let mock = mock_object();
    let api: Arc<dyn ApiRenderObject> = mock.clone();

    api.destroy();
    assert_eq!(mock.destroy_count(), 0);

    api.generate().unwrap();
    api.destroy();
    api.destroy();
    assert_eq!(mock.destroy_count(), 1);
    assert!(!api.is_generated());
}

#[test]
fn test_concurrent_generate_runs_once() {
    let mock = mock_object();
    let api: Arc<dyn ApiRenderObject> = mock.clone();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let api = api.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                api.generate().unwrap()
            })
        })
        .collect();

    let generated: usize = handles.into_iter().map(|h| h.join().unwrap() as usize).sum();
    assert_eq!(generated, 1);
    assert_eq!(mock.generate_count(), 1);
}
