use super::*;
use crate::acquire::BufferedAcquisition;
#[cfg(feature = "streaming")]
use crate::acquire::StreamingAcquisition;
use crate::context::FrameContext;
use crate::error::FetchError;
use crate::source::MemorySource;
use crate::source::testing::{closed_port, local_source, serve};

/// A guest that counts start-routine runs and frames, remembers the last event, and keeps
/// requesting frames until it has rendered `frame_limit` of them.
pub(crate) fn animation(frame_limit: i32) -> String {
    format!(
        r#"(module
            (import "env" "wasmframe_request_frame" (func $request_frame))
            (global $starts (export "starts") (mut i32) (i32.const 0))
            (global $frames (export "frames") (mut i32) (i32.const 0))
            (global $last (export "last_event") (mut f64) (f64.const 0))
            (func (export "wasmframe_start")
                global.get $starts
                i32.const 1
                i32.add
                global.set $starts
                call $request_frame)
            (func (export "renderFrame") (param $now f64)
                local.get $now
                global.set $last
                global.get $frames
                i32.const 1
                i32.add
                global.set $frames
                global.get $frames
                i32.const {frame_limit}
                i32.lt_s
                if
                    call $request_frame
                end))"#
    )
}

pub(crate) fn animation_bytes(frame_limit: i32) -> Vec<u8> {
    wat::parse_str(animation(frame_limit)).unwrap()
}

fn strategies() -> Vec<Box<dyn Acquisition>> {
    let mut all: Vec<Box<dyn Acquisition>> = vec![Box::new(BufferedAcquisition)];
    #[cfg(feature = "streaming")]
    all.push(Box::new(StreamingAcquisition));
    all
}

fn bootstrapper(strategy: Box<dyn Acquisition>) -> Bootstrapper {
    Bootstrapper::new(BootConfig::default())
        .unwrap()
        .with_strategy(strategy)
}

fn global_i32(handle: &mut ModuleHandle, name: &str) -> i32 {
    handle.global(name).and_then(|v| v.i32()).unwrap()
}

fn last_event_bits(handle: &mut ModuleHandle) -> u64 {
    match handle.global("last_event") {
        Some(Val::F64(bits)) => bits,
        _ => panic!("last_event missing or not f64"),
    }
}

#[tokio::test]
async fn valid_module_loads_and_starts_exactly_once() {
    for strategy in strategies() {
        let kind = strategy.kind();
        let boot = bootstrapper(strategy);
        let source = MemorySource::new(animation_bytes(i32::MAX)).with_chunk_size(7);

        let mut handle = boot.load(&source).await.unwrap();
        assert_eq!(global_i32(&mut handle, "starts"), 1, "{kind}");
        assert_eq!(handle.start_routine(), Some("wasmframe_start"));
        // The start routine asked for the first frame.
        assert!(handle.take_frame_request());
        assert_eq!(handle.host_state().frame_requests(), 1);
    }
}

#[tokio::test]
async fn unreachable_source_is_a_fetch_error_and_leaves_context_empty() {
    let boot = Bootstrapper::new(BootConfig::default()).unwrap();
    let source = local_source(closed_port().await);
    let mut ctx = FrameContext::new();

    let result = ctx.init(&boot, &source).await;
    assert!(matches!(result, Err(LoadError::Fetch(FetchError::Request { .. }))));
    assert!(!ctx.is_loaded());
}

#[tokio::test]
async fn error_status_is_a_fetch_error() {
    let boot = Bootstrapper::new(BootConfig::default()).unwrap();
    let source = local_source(serve(500, b"oops".to_vec()).await);

    match boot.load(&source).await.err() {
        Some(LoadError::Fetch(FetchError::Status { status, .. })) => assert_eq!(status, 500),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn loads_over_http() {
    let boot = Bootstrapper::new(BootConfig::default()).unwrap();
    let source = local_source(serve(200, animation_bytes(i32::MAX)).await);

    let mut ctx = FrameContext::new();
    ctx.init(&boot, &source).await.unwrap();
    ctx.forward_frame(FrameEvent(16.0)).await.unwrap();
    let handle = ctx.handle_mut().unwrap();
    assert_eq!(global_i32(handle, "frames"), 1);
}

#[tokio::test]
async fn invalid_bytes_are_an_instantiation_error_and_leave_context_empty() {
    let mut broken = animation_bytes(i32::MAX);
    broken.truncate(broken.len() - 3);
    let payloads: [Vec<u8>; 3] = [b"<!doctype html><p>moved</p>".to_vec(), b"\0asm".to_vec(), broken];

    for payload in payloads {
        for strategy in strategies() {
            let kind = strategy.kind();
            let boot = bootstrapper(strategy);
            let source = MemorySource::new(payload.clone()).with_chunk_size(4);
            let mut ctx = FrameContext::new();

            let result = ctx.init(&boot, &source).await;
            assert!(
                matches!(result, Err(LoadError::Instantiation(_))),
                "{kind}: {result:?}"
            );
            assert!(!ctx.is_loaded());
        }
    }
}

#[tokio::test]
async fn frame_reaches_export_once_and_unchanged() {
    let boot = Bootstrapper::new(BootConfig::default()).unwrap();
    let source = MemorySource::new(animation_bytes(i32::MAX));
    let mut ctx = FrameContext::new();
    ctx.init(&boot, &source).await.unwrap();

    for (n, value) in [1234.5678_f64, -0.0, f64::MAX].into_iter().enumerate() {
        ctx.forward_frame(FrameEvent(value)).await.unwrap();
        let handle = ctx.handle_mut().unwrap();
        assert_eq!(global_i32(handle, "frames"), n as i32 + 1);
        assert_eq!(last_event_bits(handle), value.to_bits());
    }
}

#[tokio::test]
async fn forwarding_before_load_fails_loudly() {
    let mut ctx = FrameContext::new();
    assert!(matches!(
        ctx.forward_frame(FrameEvent(0.0)).await,
        Err(FrameError::NotLoaded)
    ));
}

#[cfg(feature = "streaming")]
#[tokio::test]
async fn strategies_are_interchangeable() {
    let bytes = animation_bytes(i32::MAX);
    let events = [0.0, 16.7, 33.3, 50.0];

    let mut observed = Vec::new();
    for strategy in strategies() {
        let boot = bootstrapper(strategy);
        let mut handle = boot
            .load(&MemorySource::new(bytes.clone()).with_chunk_size(3))
            .await
            .unwrap();

        let mut trace = vec![(global_i32(&mut handle, "starts"), handle.take_frame_request())];
        for event in events {
            handle.forward_frame(FrameEvent(event)).await.unwrap();
            trace.push((global_i32(&mut handle, "frames"), handle.take_frame_request()));
        }
        observed.push((handle.start_routine(), trace, last_event_bits(&mut handle)));
    }

    assert_eq!(observed.len(), 2);
    assert_eq!(observed[0], observed[1]);
}

#[tokio::test]
async fn unsatisfied_import_is_an_instantiation_error() {
    let boot = Bootstrapper::new(BootConfig::default()).unwrap();
    let source = MemorySource::new(
        &br#"(module
            (import "env" "glClear" (func (param i32)))
            (func (export "renderFrame") (param f64)))"#[..],
    );

    assert!(matches!(
        boot.load(&source).await.err(),
        Some(LoadError::Instantiation(InstantiationError::Link(_)))
    ));
}

#[tokio::test]
async fn frame_export_must_exist_with_the_right_signature() {
    let boot = Bootstrapper::new(BootConfig::default()).unwrap();

    let missing = MemorySource::new(&br#"(module (func (export "draw")))"#[..]);
    match boot.load(&missing).await.err() {
        Some(LoadError::Instantiation(InstantiationError::MissingExport(name))) => {
            assert_eq!(name, "renderFrame")
        }
        other => panic!("expected missing export, got {other:?}"),
    }

    let wrong = MemorySource::new(&br#"(module (func (export "renderFrame") (param i32)))"#[..]);
    assert!(matches!(
        boot.load(&wrong).await.err(),
        Some(LoadError::Instantiation(InstantiationError::ExportSignature { .. }))
    ));
}

#[tokio::test]
async fn frame_export_name_is_configurable() {
    let config = BootConfig {
        frame_export: "tick".to_string(),
        ..BootConfig::default()
    };
    let boot = Bootstrapper::new(config).unwrap();
    let source = MemorySource::new(
        &br#"(module
            (global $n (export "n") (mut i32) (i32.const 0))
            (func (export "tick") (param f64)
                global.get $n
                i32.const 1
                i32.add
                global.set $n))"#[..],
    );

    let mut handle = boot.load(&source).await.unwrap();
    assert_eq!(handle.start_routine(), None);
    handle.forward_frame(FrameEvent(1.0)).await.unwrap();
    assert_eq!(global_i32(&mut handle, "n"), 1);
}

#[tokio::test]
async fn start_routine_falls_back_to_underscore_start() {
    let boot = Bootstrapper::new(BootConfig::default()).unwrap();
    let source = MemorySource::new(
        &br#"(module
            (func (export "_start"))
            (func (export "main"))
            (func (export "renderFrame") (param f64)))"#[..],
    );

    let handle = boot.load(&source).await.unwrap();
    assert_eq!(handle.start_routine(), Some("_start"));
}

#[tokio::test]
async fn trapping_start_routine_fails_the_load() {
    let boot = Bootstrapper::new(BootConfig::default()).unwrap();
    let source = MemorySource::new(
        &br#"(module
            (func (export "wasmframe_start") unreachable)
            (func (export "renderFrame") (param f64)))"#[..],
    );

    assert!(matches!(
        boot.load(&source).await.err(),
        Some(LoadError::Instantiation(InstantiationError::Start {
            name: "wasmframe_start",
            ..
        }))
    ));
}

#[tokio::test]
async fn guest_trap_during_frame_is_reported() {
    let boot = Bootstrapper::new(BootConfig::default()).unwrap();
    let source = MemorySource::new(
        &br#"(module (func (export "renderFrame") (param f64) unreachable))"#[..],
    );
    let mut ctx = FrameContext::new();
    ctx.init(&boot, &source).await.unwrap();

    assert!(matches!(
        ctx.forward_frame(FrameEvent(0.0)).await,
        Err(FrameError::Trap(_))
    ));
}

#[tokio::test]
async fn context_loads_only_once() {
    let boot = Bootstrapper::new(BootConfig::default()).unwrap();
    let source = MemorySource::new(animation_bytes(i32::MAX));
    let mut ctx = FrameContext::new();
    ctx.init(&boot, &source).await.unwrap();

    assert!(matches!(
        ctx.init(&boot, &source).await,
        Err(LoadError::AlreadyLoaded)
    ));
    // The original instance is untouched.
    assert_eq!(global_i32(ctx.handle_mut().unwrap(), "starts"), 1);
}

#[tokio::test]
async fn oversized_payload_is_rejected() {
    let config = BootConfig {
        max_module_bytes: 16,
        ..BootConfig::default()
    };
    for strategy in strategies() {
        let boot = Bootstrapper::new(config.clone())
            .unwrap()
            .with_strategy(strategy);
        let source = MemorySource::new(animation_bytes(i32::MAX)).with_chunk_size(8);
        assert!(matches!(
            boot.load(&source).await.err(),
            Some(LoadError::Fetch(FetchError::TooLarge { limit: 16, .. }))
        ));
    }
}

#[test]
fn frame_event_from_elapsed_is_milliseconds() {
    assert_eq!(
        FrameEvent::from_elapsed(Duration::from_micros(16_500)),
        FrameEvent(16.5)
    );
}

/// Writes to stdout through WASI from both the start routine and every frame.
const WASI_GUEST: &str = r#"(module
    (import "wasi_snapshot_preview1" "fd_write"
        (func $fd_write (param i32 i32 i32 i32) (result i32)))
    (memory (export "memory") 1)
    (data (i32.const 16) "frame\n")
    (global $errno (export "errno") (mut i32) (i32.const -1))
    (func $say
        (i32.store (i32.const 0) (i32.const 16))
        (i32.store (i32.const 4) (i32.const 6))
        (global.set $errno
            (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 8))))
    (func (export "wasmframe_start") call $say)
    (func (export "renderFrame") (param f64)
        (global.set $errno (i32.const -1))
        call $say))"#;

async fn load_wasi_guest() {
    let config = BootConfig {
        wasi: true,
        ..BootConfig::default()
    };
    let boot = Bootstrapper::new(config).unwrap();
    let mut ctx = FrameContext::new();
    ctx.init(&boot, &MemorySource::new(WASI_GUEST.as_bytes().to_vec()))
        .await
        .unwrap();
    assert_eq!(global_i32(ctx.handle_mut().unwrap(), "errno"), 0);

    ctx.forward_frame(FrameEvent(16.0)).await.unwrap();
    assert_eq!(global_i32(ctx.handle_mut().unwrap(), "errno"), 0);
}

#[tokio::test]
async fn wasi_guest_writes_from_start_and_frames() {
    load_wasi_guest().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn wasi_guest_writes_on_multi_thread_runtime() {
    load_wasi_guest().await;
}

#[tokio::test]
async fn wasi_exit_zero_from_start_is_success() {
    let config = BootConfig {
        wasi: true,
        ..BootConfig::default()
    };
    let boot = Bootstrapper::new(config).unwrap();
    let source = MemorySource::new(
        &br#"(module
            (import "wasi_snapshot_preview1" "proc_exit" (func $exit (param i32)))
            (memory (export "memory") 1)
            (func (export "_start") (call $exit (i32.const 0)))
            (func (export "renderFrame") (param f64)))"#[..],
    );

    let handle = boot.load(&source).await.unwrap();
    assert_eq!(handle.start_routine(), Some("_start"));
}
