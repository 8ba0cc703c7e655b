mod common;

use std::time::{Duration, Instant};

use lumen_engine::device::{BufferUsage, FrameTarget, GpuError, IndexFormat, PixelFormat};
use lumen_engine::render::{FrameOutcome, FrameStage, MeshData, Renderer, RendererConfig, Submesh};

use common::{Event, MockDevice};

fn renderer(device: &MockDevice, frames_in_flight: usize) -> Renderer<MockDevice> {
    let config = RendererConfig {
        max_frames_in_flight: frames_in_flight,
        ..RendererConfig::default()
    };
    Renderer::initialize(
        device,
        &common::library(),
        &common::triangle(),
        PixelFormat::Bgra8UnormSrgb,
        &config,
    )
    .unwrap()
}

#[test]
fn completions_fire_in_submission_order() {
    let device = MockDevice::new(Duration::from_millis(2));
    let mut r = renderer(&device, 3);

    for i in 0..8 {
        let outcome = r.render_frame(common::target(i));
        assert_eq!(outcome, FrameOutcome::Submitted { frame_index: u64::from(i) });
    }
    r.wait_idle();

    let events = device.events();
    let commits: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            Event::Commit { submission, .. } => Some(*submission),
            _ => None,
        })
        .collect();
    let completions: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            Event::Completed { submission } => Some(*submission),
            _ => None,
        })
        .collect();

    assert_eq!(commits, (0..8).collect::<Vec<_>>());
    assert_eq!(completions, commits);
    assert_eq!(r.completed_frames(), 8);
}

#[test]
fn single_slot_never_overlaps_frames() {
    let device = MockDevice::new(Duration::from_millis(5));
    let mut r = renderer(&device, 1);
    device.clear_events();

    for i in 0..4 {
        r.render_frame(common::target(i));
        assert!(r.frames_in_flight() <= 1);
    }
    r.wait_idle();

    let events = device.events();
    let writes: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, Event::Write { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(writes.len(), 4);

    // Frame k+1 only writes its uniforms after frame k completed.
    for k in 0..3u64 {
        let completed = common::position(&events, &Event::Completed { submission: k });
        assert!(
            completed < writes[k as usize + 1],
            "frame {} started before frame {k} completed",
            k + 1
        );
    }
}

#[test]
fn single_slot_reuses_one_uniform_buffer() {
    let device = MockDevice::new(Duration::from_millis(1));
    let mut r = renderer(&device, 1);
    device.clear_events();

    for i in 0..3 {
        r.render_frame(common::target(i));
    }
    r.wait_idle();

    let bound: Vec<u32> = device
        .events()
        .iter()
        .filter_map(|e| match e {
            Event::SetFragmentBuffer { buffer, .. } => Some(*buffer),
            _ => None,
        })
        .collect();
    assert_eq!(bound.len(), 3);
    assert!(bound.iter().all(|&b| b == bound[0]));
}

#[test]
fn uniform_ring_rotates_with_frames_in_flight() {
    let device = MockDevice::new(Duration::from_millis(1));
    let mut r = renderer(&device, 3);
    device.clear_events();

    for i in 0..6 {
        r.render_frame(common::target(i));
    }
    r.wait_idle();

    let written: Vec<u32> = device
        .events()
        .iter()
        .filter_map(|e| match e {
            Event::Write { buffer, .. } => Some(*buffer),
            _ => None,
        })
        .collect();
    assert_eq!(written.len(), 6);
    assert_ne!(written[0], written[1]);
    assert_ne!(written[1], written[2]);
    assert_ne!(written[0], written[2]);
    assert_eq!(&written[..3], &written[3..]);
}

#[test]
fn brightness_follows_accumulated_time() {
    let device = MockDevice::new(Duration::ZERO);
    let mut r = renderer(&device, 1);
    device.clear_events();

    let t0 = Instant::now();
    for s in 0..3 {
        r.render_frame_at(common::target(s), t0 + Duration::from_secs(u64::from(s)));
    }
    r.wait_idle();

    let expected = [1.0, 0.7702, 0.2081];
    let written = common::written_brightness(&device.events());
    assert_eq!(written.len(), 3);
    for (got, want) in written.iter().zip(expected) {
        assert!((got - want).abs() < 1e-3, "wrote {got}, expected {want}");
    }
    assert!((r.current_uniforms().brightness - 0.2081).abs() < 1e-3);
    assert_eq!(r.animation_time(), Duration::from_secs(2));
}

#[test]
fn missing_render_target_drops_the_frame() {
    let device = MockDevice::new(Duration::ZERO);
    let mut r = renderer(&device, 1);
    device.clear_events();

    let outcome = r.render_frame(FrameTarget {
        target: None,
        drawable: Some(7),
    });

    assert_eq!(outcome, FrameOutcome::Dropped);
    assert!(device.events().is_empty());
    assert_eq!(r.frames_in_flight(), 0);
    assert_eq!(r.stage(), FrameStage::Idle);
    assert_eq!(r.stats().dropped, 1);
    assert_eq!(r.stats().submitted, 0);
}

#[test]
fn missing_drawable_drops_the_frame_without_ticking() {
    let device = MockDevice::new(Duration::ZERO);
    let mut r = renderer(&device, 1);
    device.clear_events();

    let t0 = Instant::now();
    r.render_frame_at(
        FrameTarget {
            target: Some(1),
            drawable: None,
        },
        t0,
    );
    r.render_frame_at(common::target(2), t0 + Duration::from_secs(5));
    r.wait_idle();

    // The dropped frame never reached the clock, so the first real frame starts at t = 0.
    assert_eq!(r.animation_time(), Duration::ZERO);
    let written = common::written_brightness(&device.events());
    assert_eq!(written, vec![1.0]);
}

#[test]
fn frame_encodes_bindings_then_draw_then_commit() {
    let device = MockDevice::new(Duration::ZERO);
    let mut r = renderer(&device, 1);
    device.clear_events();

    r.render_frame(common::target(9));
    r.wait_idle();

    let events = device.events();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            Event::Write { .. } => "write",
            Event::BeginPass { .. } => "begin",
            Event::SetPipeline(_) => "pipeline",
            Event::SetVertexBuffer { .. } => "vertices",
            Event::SetFragmentBuffer { .. } => "uniforms",
            Event::Draw(_) => "draw",
            Event::DrawIndexed { .. } => "draw_indexed",
            Event::Commit { .. } => "commit",
            Event::Completed { .. } => "completed",
            Event::NewBuffer { .. } => "new_buffer",
            Event::Lost { .. } => "lost",
        })
        .collect();
    assert_eq!(
        kinds,
        ["write", "begin", "pipeline", "vertices", "uniforms", "draw", "commit", "completed"]
    );
    assert!(events.contains(&Event::Draw(0..3)));
    assert!(events.contains(&Event::BeginPass { target: 9 }));
    assert!(events.contains(&Event::Commit {
        submission: 0,
        drawable: 9
    }));
}

#[test]
fn one_indexed_draw_per_submesh() {
    let device = MockDevice::new(Duration::ZERO);
    let mut vertices = common::triangle().vertices().to_vec();
    vertices.push(common::Vertex {
        color: [1.0; 4],
        pos: [1.0, 1.0],
    });
    let mesh = MeshData::new(vertices, common::vertex_layout()).with_indices_u16(
        vec![0, 1, 2, 2, 3, 0, 0, 1, 3],
        vec![Submesh::new(0, 3), Submesh::new(3, 3), Submesh::new(6, 3)],
    );

    let mut r = Renderer::initialize(
        &device,
        &common::library(),
        &mesh,
        PixelFormat::Bgra8Unorm,
        &RendererConfig::default(),
    )
    .unwrap();
    assert_eq!(r.geometry().draw_count(), 3);

    device.clear_events();
    r.render_frame(common::target(1));
    r.render_frame(common::target(2));
    r.wait_idle();

    let draws: Vec<(IndexFormat, std::ops::Range<u32>)> = device
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::DrawIndexed { format, indices, .. } => Some((format, indices)),
            Event::Draw(_) => panic!("indexed geometry issued a non-indexed draw"),
            _ => None,
        })
        .collect();

    let per_frame = vec![
        (IndexFormat::Uint16, 0..3),
        (IndexFormat::Uint16, 3..6),
        (IndexFormat::Uint16, 6..9),
    ];
    assert_eq!(draws.len(), 6);
    assert_eq!(draws[..3], per_frame[..]);
    assert_eq!(draws[3..], per_frame[..]);
}

#[test]
fn initialize_allocates_buffers_before_compiling() {
    let device = MockDevice::new(Duration::ZERO);
    let r = renderer(&device, 2);

    let usages: Vec<BufferUsage> = device
        .events()
        .iter()
        .filter_map(|e| match e {
            Event::NewBuffer { usage, .. } => Some(*usage),
            _ => None,
        })
        .collect();
    assert_eq!(
        usages,
        [BufferUsage::Vertex, BufferUsage::Uniform, BufferUsage::Uniform]
    );
    assert_eq!(device.pipelines_created.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(r.max_frames_in_flight(), 2);
    assert_eq!(r.pipeline().vertex_program(), "vs_main");
    assert_eq!(r.stage(), FrameStage::Idle);
}

#[test]
fn allocation_failure_aborts_initialize() {
    let device = MockDevice::new(Duration::ZERO).with_max_buffer_len(16);

    let result = Renderer::initialize(
        &device,
        &common::library(),
        &common::triangle(),
        PixelFormat::Bgra8Unorm,
        &RendererConfig::default(),
    );

    assert!(matches!(result, Err(GpuError::Allocation(_))));
    assert_eq!(device.pipelines_created.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn unknown_program_aborts_initialize() {
    let device = MockDevice::new(Duration::ZERO);
    let config = RendererConfig {
        fragment_program: "fragmentShader".to_string(),
        ..RendererConfig::default()
    };

    let result = Renderer::initialize(
        &device,
        &common::library(),
        &common::triangle(),
        PixelFormat::Bgra8Unorm,
        &config,
    );

    assert!(matches!(result, Err(GpuError::Compilation(_))));
}

#[test]
fn lost_submission_frees_its_frame_slot() {
    let device = MockDevice::new(Duration::from_millis(1)).with_lost_submissions(&[1]);
    let mut r = renderer(&device, 1);

    // With one slot, frame 2 would block forever if frame 1's permit leaked.
    for i in 0..3 {
        r.render_frame(common::target(i));
    }
    r.wait_idle();

    assert_eq!(r.stats().submitted, 3);
    assert_eq!(r.completed_frames(), 2);
    assert_eq!(r.frames_in_flight(), 0);
    assert!(device.events().contains(&Event::Lost { submission: 1 }));
}
