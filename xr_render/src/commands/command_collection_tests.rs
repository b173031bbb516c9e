/// Unit tests for RenderCommandCollection: buckets, ordering, double buffering.

use crate::commands::*;
use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::render_api::mock_backend::MockBackend;
use crate::render_object::RenderObjectRegistry;
use crate::renderer::AbstractRenderer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    PreRender(u32),
    Swap(u32),
    Render(u32),
}

type EventLog = Arc<Mutex<Vec<Event>>>;

struct TestCommand {
    id: u32,
    pass: RenderPass,
    distance: f32,
    enabled: AtomicBool,
    fail: bool,
    log: EventLog,
}

impl TestCommand {
    fn new(id: u32, pass: RenderPass, distance: f32, log: &EventLog) -> Arc<Self> {
        Arc::new(Self { id, pass, distance, enabled: AtomicBool::new(true), fail: false, log: log.clone() })
    }

    fn failing(id: u32, pass: RenderPass, log: &EventLog) -> Arc<Self> {
        Arc::new(Self { id, pass, distance: 0.0, enabled: AtomicBool::new(true), fail: true, log: log.clone() })
    }
}

impl RenderCommand for TestCommand {
    fn render_pass(&self) -> RenderPass {
        self.pass
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn sort_key(&self) -> SortKey {
        SortKey::new(self.distance, 0)
    }

    fn pre_render(&self) {
        self.log.lock().unwrap().push(Event::PreRender(self.id));
    }

    fn swap_buffers(&self) {
        self.log.lock().unwrap().push(Event::Swap(self.id));
    }

    fn render(&self, _renderer: &mut AbstractRenderer) -> Result<()> {
        self.log.lock().unwrap().push(Event::Render(self.id));
        if self.fail {
            return Err(Error::BackendError("simulated".to_string()));
        }
        Ok(())
    }
}

fn renderer() -> AbstractRenderer {
    AbstractRenderer::new(Box::new(MockBackend::new()), RenderObjectRegistry::new(), RendererConfig::default())
        .unwrap()
}

fn rendered(log: &EventLog) -> Vec<u32> {
    std::mem::take(&mut *log.lock().unwrap())
        .into_iter()
        .filter_map(|event| match event {
            Event::Render(id) => Some(id),
            _ => None,
        })
        .collect()
}

fn near_to_far() -> Option<Arc<dyn RenderCommandSorter>> {
    Some(Arc::new(NearToFarRenderCommandSorter))
}

fn far_to_near() -> Option<Arc<dyn RenderCommandSorter>> {
    Some(Arc::new(FarToNearRenderCommandSorter))
}

// ============================================================================
// Double buffering
// ============================================================================

#[test]
fn test_command_renders_once_after_swap() {
    let log = EventLog::default();
    let mut renderer = renderer();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, None)]);

    assert!(collection.add(TestCommand::new(1, 0, 0.0, &log)));
    assert_eq!(collection.render(0, &mut renderer), 0);

    collection.swap_buffers();
    assert_eq!(collection.render(0, &mut renderer), 1);
    assert_eq!(rendered(&log), vec![1]);

    collection.swap_buffers();
    assert_eq!(collection.render(0, &mut renderer), 0);
    assert!(rendered(&log).is_empty());
}

#[test]
fn test_render_is_repeatable_within_frame() {
    let log = EventLog::default();
    let mut renderer = renderer();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, None)]);
    collection.add(TestCommand::new(1, 0, 0.0, &log));
    collection.swap_buffers();

    // e.g. main pass then shadow pass over the same bucket
    collection.render(0, &mut renderer);
    collection.render(0, &mut renderer);
    assert_eq!(rendered(&log), vec![1, 1]);
}

#[test]
fn test_swap_hooks_fire_on_rendering_side() {
    let log = EventLog::default();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, None), (1, near_to_far())]);
    collection.add(TestCommand::new(1, 0, 0.0, &log));
    collection.add(TestCommand::new(2, 1, 0.0, &log));

    collection.swap_buffers();
    let mut events = std::mem::take(&mut *log.lock().unwrap());
    events.sort_by_key(|event| match event {
        Event::Swap(id) | Event::PreRender(id) | Event::Render(id) => *id,
    });
    assert_eq!(events, vec![Event::Swap(1), Event::Swap(2)]);

    assert_eq!(collection.updating_count(0), 0);
    assert_eq!(collection.rendering_count(0), 1);
    assert_eq!(collection.rendering_count(1), 1);
}

#[test]
fn test_pre_render_fires_once_per_command() {
    let log = EventLog::default();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, None)]);
    collection.add(TestCommand::new(1, 0, 0.0, &log));
    collection.add(TestCommand::new(2, 0, 0.0, &log));
    collection.swap_buffers();
    log.lock().unwrap().clear();

    collection.pre_render();
    assert_eq!(*log.lock().unwrap(), vec![Event::PreRender(1), Event::PreRender(2)]);
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_near_to_far_order() {
    let log = EventLog::default();
    let mut renderer = renderer();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, near_to_far())]);
    for distance in [5.0, 1.0, 3.0] {
        collection.add(TestCommand::new(distance as u32, 0, distance, &log));
    }
    collection.swap_buffers();

    collection.render(0, &mut renderer);
    assert_eq!(rendered(&log), vec![1, 3, 5]);
}

#[test]
fn test_far_to_near_order() {
    let log = EventLog::default();
    let mut renderer = renderer();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, far_to_near())]);
    for distance in [5.0, 1.0, 3.0] {
        collection.add(TestCommand::new(distance as u32, 0, distance, &log));
    }
    collection.swap_buffers();

    collection.render(0, &mut renderer);
    assert_eq!(rendered(&log), vec![5, 3, 1]);
}

#[test]
fn test_equal_keys_are_all_kept_in_insertion_order() {
    let log = EventLog::default();
    let mut renderer = renderer();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, near_to_far())]);
    collection.add(TestCommand::new(10, 0, 2.0, &log));
    collection.add(TestCommand::new(11, 0, 1.0, &log));
    collection.add(TestCommand::new(12, 0, 2.0, &log));
    collection.add(TestCommand::new(13, 0, 2.0, &log));
    collection.swap_buffers();

    collection.render(0, &mut renderer);
    assert_eq!(rendered(&log), vec![11, 10, 12, 13]);
}

#[test]
fn test_unordered_pass_keeps_insertion_order() {
    let log = EventLog::default();
    let mut renderer = renderer();
    let collection = RenderCommandCollection::with_render_passes(vec![(3, None)]);
    for (id, distance) in [(1, 9.0), (2, 1.0), (3, 5.0)] {
        collection.add(TestCommand::new(id, 3, distance, &log));
    }
    collection.swap_buffers();

    collection.render(3, &mut renderer);
    assert_eq!(rendered(&log), vec![1, 2, 3]);
}

#[test]
fn test_nan_distance_sorts_last() {
    let log = EventLog::default();
    let mut renderer = renderer();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, near_to_far())]);
    collection.add(TestCommand::new(1, 0, f32::NAN, &log));
    collection.add(TestCommand::new(2, 0, 4.0, &log));
    collection.swap_buffers();

    collection.render(0, &mut renderer);
    assert_eq!(rendered(&log), vec![2, 1]);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_unknown_pass_is_noop() {
    let log = EventLog::default();
    let mut renderer = renderer();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, None), (1, None)]);

    assert!(!collection.add(TestCommand::new(1, 7, 0.0, &log)));
    collection.swap_buffers();
    assert_eq!(collection.render(0, &mut renderer), 0);
    assert_eq!(collection.render(1, &mut renderer), 0);
    assert_eq!(collection.render(7, &mut renderer), 0);
    assert!(rendered(&log).is_empty());
}

#[test]
fn test_unconfigured_collection_drops_everything() {
    let log = EventLog::default();
    let collection = RenderCommandCollection::new();
    assert!(!collection.add(TestCommand::new(1, 0, 0.0, &log)));
    assert!(collection.render_passes().is_empty());
}

#[test]
fn test_reconfigure_drops_queued_commands() {
    let log = EventLog::default();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, None)]);
    collection.add(TestCommand::new(1, 0, 0.0, &log));

    collection.set_render_passes(vec![(0, None), (2, far_to_near())]);
    assert_eq!(collection.updating_count(0), 0);
    assert_eq!(collection.render_passes(), vec![0, 2]);
    assert!(collection.is_configured(2));
    assert!(!collection.is_configured(1));
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn test_two_pass_frame_scenario() {
    let log = EventLog::default();
    let mut renderer = renderer();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, near_to_far()), (1, None)]);

    collection.add(TestCommand::new(2, 0, 2.0, &log));
    collection.add(TestCommand::new(0, 0, 0.0, &log));
    collection.add(TestCommand::new(1, 0, 1.0, &log));
    collection.add(TestCommand::new(100, 1, 0.0, &log));
    collection.swap_buffers();

    collection.render(0, &mut renderer);
    assert_eq!(rendered(&log), vec![0, 1, 2]);
    collection.render(1, &mut renderer);
    assert_eq!(rendered(&log), vec![100]);

    collection.swap_buffers();
    collection.render(0, &mut renderer);
    assert!(rendered(&log).is_empty());
}

// ============================================================================
// Failures, visibility, concurrency
// ============================================================================

#[test]
fn test_disabled_command_skipped() {
    let log = EventLog::default();
    let mut renderer = renderer();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, None)]);
    let hidden = TestCommand::new(1, 0, 0.0, &log);
    hidden.enabled.store(false, Ordering::SeqCst);
    collection.add(hidden);
    collection.add(TestCommand::new(2, 0, 0.0, &log));
    collection.swap_buffers();

    assert_eq!(collection.render(0, &mut renderer), 1);
    assert_eq!(rendered(&log), vec![2]);
}

#[test]
fn test_failing_command_does_not_stop_pass() {
    let log = EventLog::default();
    let mut renderer = renderer();
    let collection = RenderCommandCollection::with_render_passes(vec![(0, None)]);
    collection.add(TestCommand::failing(1, 0, &log));
    collection.add(TestCommand::new(2, 0, 0.0, &log));
    collection.swap_buffers();

    assert_eq!(collection.render(0, &mut renderer), 1);
    assert_eq!(rendered(&log), vec![1, 2]);
}

#[test]
fn test_add_renderable_respects_visibility() {
    struct Prop {
        infos: Vec<RenderInfo>,
    }
    impl Renderable for Prop {
        fn render_infos(&self) -> &[RenderInfo] {
            &self.infos
        }
    }

    let log = EventLog::default();
    let prop = Prop {
        infos: vec![
            RenderInfo::new(TestCommand::new(1, 0, 0.0, &log)),
            RenderInfo::new(TestCommand::new(2, 0, 0.0, &log)),
            RenderInfo::new(TestCommand::new(3, 5, 0.0, &log)),
        ],
    };
    prop.infos[1].set_visible(false);
    let collection = RenderCommandCollection::with_render_passes(vec![(0, None)]);

    assert_eq!(collection.add_renderable(&prop), 1);
    assert_eq!(collection.updating_count(0), 1);
    assert_eq!(prop.infos[2].render_pass(), 5);
}

#[test]
fn test_concurrent_producers() {
    let log = EventLog::default();
    let collection = Arc::new(RenderCommandCollection::with_render_passes(vec![(0, near_to_far()), (1, None)]));

    let handles: Vec<_> = (0..4)
        .map(|thread| {
            let collection = collection.clone();
            let log = log.clone();
            std::thread::spawn(move || {
                for i in 0..100u32 {
                    let command = TestCommand::new(thread * 1000 + i, (i % 2) as i32, (i % 7) as f32, &log);
                    collection.add(command);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    collection.swap_buffers();
    assert_eq!(collection.rendering_count(0) + collection.rendering_count(1), 400);
}
