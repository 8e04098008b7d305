//! CHIP-8 emulator frontend.
//!
//! Drives the interpreter core at a configurable instruction rate, renders
//! the 64×32 pixel buffer into a scaled minifb window, translates the host
//! keyboard into the hex keypad, and decrements the delay timer at 60 Hz.
//!
//! Two execution modes:
//!
//! - **GUI mode** (default): scaled window, keyboard input, pause on a
//!   runaway program counter.
//! - **Headless mode** (`--headless`): automated runs with ASCII snapshots.

use chip8_core::{Chip8, Fault, SCREEN_HEIGHT, SCREEN_WIDTH};
use minifb::{Key, Scale, ScaleMode, Window, WindowOptions};
use std::env;
use std::fs;
use std::process;

/// Window pixels per CHIP-8 pixel
const DEFAULT_SCALE: usize = 10;
/// Interpreted instructions per second
const DEFAULT_IPS: usize = 600;
/// Frames per second driven by the window loop; also the timer rate
const FRAME_RATE: usize = 60;

/// Host keyboard → hex keypad, laid out as the classic 4×4 block:
///
/// ```text
/// 1 2 3 4        1 2 3 C
/// Q W E R   →    4 5 6 D
/// A S D F        7 8 9 E
/// Z X C V        A 0 B F
/// ```
const KEY_MAP: [(Key, u8); 16] = [
    (Key::Key1, 0x1), (Key::Key2, 0x2), (Key::Key3, 0x3), (Key::Key4, 0xC),
    (Key::Q, 0x4),    (Key::W, 0x5),    (Key::E, 0x6),    (Key::R, 0xD),
    (Key::A, 0x7),    (Key::S, 0x8),    (Key::D, 0x9),    (Key::F, 0xE),
    (Key::Z, 0xA),    (Key::X, 0x0),    (Key::C, 0xB),    (Key::V, 0xF),
];

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("CHIP-8 Emulator - Rust");
        eprintln!("Usage: {} <rom.ch8> [options]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --headless           Run without GUI");
        eprintln!("  --frames N           Run N frames in headless mode (default 60)");
        eprintln!("  --snapshot F         Print display at frame F (repeatable)");
        eprintln!("  --ips N              Instructions per second (default {})", DEFAULT_IPS);
        eprintln!("  --scale N            Window scale 1-20 (default {})", DEFAULT_SCALE);
        eprintln!("  --seed N             Seed the random source for reproducible runs");
        eprintln!("  --debug              Show diagnostics");
        eprintln!();
        eprintln!("GUI keys: 1234/QWER/ASDF/ZXCV = keypad, Esc = quit");
        process::exit(1);
    }

    let rom_path = &args[1];
    let headless = args.iter().any(|a| a == "--headless");
    let debug = args.iter().any(|a| a == "--debug");

    let ips: usize = flag_value(&args, "--ips").unwrap_or(DEFAULT_IPS).max(FRAME_RATE);
    let scale: usize = flag_value(&args, "--scale")
        .unwrap_or(DEFAULT_SCALE)
        .clamp(1, 20);
    let seed: Option<u64> = flag_value(&args, "--seed");

    let mut chip8 = match seed {
        Some(s) => Chip8::with_seed(s),
        None => Chip8::new(),
    };
    chip8.debug = debug;

    let mut file = match fs::File::open(rom_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}: {}", rom_path, e);
            process::exit(1);
        }
    };
    match chip8.load_rom(&mut file) {
        Ok(size) => {
            if debug {
                println!("Loaded {} bytes from {}", size, rom_path);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", rom_path, e);
            process::exit(1);
        }
    }

    if headless {
        run_headless(&args, &mut chip8);
    } else {
        run_gui(&mut chip8, rom_path, scale, ips, debug);
    }
}

/// Parse `--flag value` from the argument list.
fn flag_value<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

// ─── GUI Mode ───────────────────────────────────────────────────────────────

fn run_gui(chip8: &mut Chip8, rom_path: &str, scale: usize, ips: usize, debug: bool) {
    let scaled_w = SCREEN_WIDTH * scale;
    let scaled_h = SCREEN_HEIGHT * scale;

    let mut window = Window::new(
        &format!("CHIP-8 - {}", rom_path),
        scaled_w,
        scaled_h,
        WindowOptions {
            scale: Scale::X1,
            scale_mode: ScaleMode::AspectRatioStretch,
            resize: true,
            ..Default::default()
        },
    )
    .unwrap_or_else(|e| {
        eprintln!("Failed to create window: {}", e);
        process::exit(1);
    });
    window.set_target_fps(FRAME_RATE);

    let steps_per_frame = ips / FRAME_RATE;
    let mut scaled_buf = vec![0u32; scaled_w * scaled_h];
    let mut paused = false;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        for (host_key, pad_key) in KEY_MAP {
            chip8.set_key(pad_key, window.is_key_down(host_key));
        }

        if !paused {
            for _ in 0..steps_per_frame {
                match chip8.step() {
                    Ok(()) => {}
                    Err(Fault::AddressOutOfRange { addr }) => {
                        eprintln!("PC out of bounds (0x{:04X}), pausing", addr);
                        paused = true;
                        break;
                    }
                    // Other faults are non-fatal; the core already logged
                    // them when --debug is on.
                    Err(_) => {}
                }
            }
            chip8.tick_delay_timer();
        }

        if chip8.take_redraw() | chip8.take_cleared() {
            upscale(&chip8.framebuffer_u32(), &mut scaled_buf, scale);
        }
        if window.update_with_buffer(&scaled_buf, scaled_w, scaled_h).is_err() {
            break;
        }
    }

    if debug {
        println!("{} instructions executed", chip8.cpu.tick);
    }
}

/// Replicate each CHIP-8 pixel into a scale×scale block.
fn upscale(pixels: &[u32], scaled: &mut [u32], scale: usize) {
    let scaled_w = SCREEN_WIDTH * scale;
    for y in 0..SCREEN_HEIGHT {
        for x in 0..SCREEN_WIDTH {
            let c = pixels[y * SCREEN_WIDTH + x];
            for sy in 0..scale {
                let base = (y * scale + sy) * scaled_w + x * scale;
                scaled[base..base + scale].fill(c);
            }
        }
    }
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

fn run_headless(args: &[String], chip8: &mut Chip8) {
    let frames: usize = flag_value(args, "--frames").unwrap_or(60);
    let ips: usize = flag_value(args, "--ips").unwrap_or(DEFAULT_IPS).max(FRAME_RATE);
    let debug = args.iter().any(|a| a == "--debug");
    let steps_per_frame = ips / FRAME_RATE;

    let mut snapshots: Vec<usize> = Vec::new();
    {
        let mut i = 0;
        while i < args.len() {
            if args[i] == "--snapshot" {
                if let Some(f) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                    snapshots.push(f);
                }
                i += 2;
            } else {
                i += 1;
            }
        }
    }

    if debug {
        println!("Running {} frames at {} instructions/s...", frames, ips);
    }
    let mut stopped = false;
    for frame in 0..frames {
        if !stopped {
            for _ in 0..steps_per_frame {
                match chip8.step() {
                    Ok(()) => {}
                    Err(Fault::AddressOutOfRange { addr }) => {
                        eprintln!("PC out of bounds (0x{:04X}) on frame {}, stopping", addr, frame + 1);
                        stopped = true;
                        break;
                    }
                    Err(_) => {}
                }
            }
            chip8.tick_delay_timer();
        }

        let redrew = chip8.take_redraw() | chip8.take_cleared();
        if debug && redrew {
            let lit = chip8.framebuffer().iter().filter(|&&p| p != 0).count();
            println!("  Frame {:3}: {} px lit", frame + 1, lit);
        }
        if snapshots.contains(&(frame + 1)) || (debug && frame == frames - 1) {
            println!("\n  === Frame {} ===", frame + 1);
            print_display(chip8);
        }
    }
    if debug {
        println!("\nDone. {} instructions.", chip8.cpu.tick);
    }
}

fn print_display(chip8: &Chip8) {
    let fb = chip8.framebuffer();
    let lit = fb.iter().filter(|&&p| p != 0).count();
    println!("  ({} px lit)", lit);
    for y in (0..SCREEN_HEIGHT).step_by(2) {
        let mut l = String::with_capacity(SCREEN_WIDTH + 4);
        l.push_str("  |");
        for x in 0..SCREEN_WIDTH {
            let t = fb[y * SCREEN_WIDTH + x] != 0;
            let b = y + 1 < SCREEN_HEIGHT && fb[(y + 1) * SCREEN_WIDTH + x] != 0;
            l.push(match (t, b) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                _ => ' ',
            });
        }
        l.push('|');
        println!("{}", l);
    }
}
