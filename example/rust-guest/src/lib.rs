// Spinning-cube guest for wasmframe.
//
// Build with `cargo build -p rust_guest --target wasm32-unknown-unknown --release` and run
// `wasmframe target/wasm32-unknown-unknown/release/rust_guest.wasm`.
//
// The host calls:
// - `wasmframe_start()` once after instantiation.
// - `renderFrame(now)` once per animation frame, `now` in milliseconds.

use wasmframe_sdk::prelude::*;

static mut TMARK: f64 = 0.0;
static mut ROTATION: f32 = 0.0;
static mut FRAMES: u64 = 0;
static mut MODEL: [f32; 16] = IDENTITY;

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

#[unsafe(no_mangle)]
pub extern "C" fn wasmframe_start() {
    if !abi_compatible() {
        wasmframe_sdk::error("host ABI version mismatch");
        return;
    }
    wasmframe_sdk::info("cube ready");
    request_frame();
}

#[unsafe(export_name = "renderFrame")]
pub extern "C" fn render_frame(now: f64) {
    let (rotation, frames) = unsafe {
        let tdiff = now - TMARK;
        TMARK = now;
        ROTATION += tdiff as f32 / 500.0;
        FRAMES += 1;
        (ROTATION, FRAMES)
    };

    let model = mul(
        mul(rotate_x(0.5 * rotation), rotate_y(0.3 * rotation)),
        rotate_z(0.2 * rotation),
    );
    unsafe {
        MODEL = model;
    }

    if frames % 60 == 0 {
        log(
            LogLevel::Debug,
            &format!("frame {frames}: t={now:.1}ms rotation={rotation:.3}"),
        );
    }

    request_frame();
}

/// Column-major model matrix for the current frame, 16 `f32`s.
#[unsafe(no_mangle)]
pub extern "C" fn model_matrix() -> *const f32 {
    (&raw const MODEL).cast()
}

fn rotate_x(angle: f32) -> [f32; 16] {
    let (s, c) = angle.sin_cos();
    let mut m = IDENTITY;
    m[5] = c;
    m[6] = s;
    m[9] = -s;
    m[10] = c;
    m
}

fn rotate_y(angle: f32) -> [f32; 16] {
    let (s, c) = angle.sin_cos();
    let mut m = IDENTITY;
    m[0] = c;
    m[2] = -s;
    m[8] = s;
    m[10] = c;
    m
}

fn rotate_z(angle: f32) -> [f32; 16] {
    let (s, c) = angle.sin_cos();
    let mut m = IDENTITY;
    m[0] = c;
    m[1] = s;
    m[4] = -s;
    m[5] = c;
    m
}

fn mul(a: [f32; 16], b: [f32; 16]) -> [f32; 16] {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}
