//! # chip8-core
//!
//! Interpreter core for the CHIP-8 virtual machine.
//!
//! Emulates the classic 4 KB CHIP-8 machine: 16 8-bit registers, a 16-bit
//! index register, a 16-entry call stack, a 64×32 monochrome pixel buffer,
//! a 16-key hex keypad, and a delay timer. Instructions are two bytes,
//! fetched big-endian and dispatched on the top nibble.
//!
//! ## Architecture
//!
//! - [`Chip8`] — Top-level machine that wires together CPU, memory, display, and keypad
//! - [`Cpu`] — Register file V0–VF, index register I, PC, call stack, delay timer
//! - [`Memory`] — 4096-byte address space with the font table in the reserved area
//! - [`opcodes`] — Instruction decoder producing a typed [`Instruction`](opcodes::Instruction)
//! - [`Display`] — 64×32 pixel buffer with XOR compositing and one-shot signals
//! - [`Keypad`] — 16-key state array written by the frontend
//!
//! The core is a closed, single-threaded state machine. A driving loop calls
//! [`Chip8::step`] per instruction, forwards key events via [`Chip8::set_key`],
//! decrements the delay timer at 60 Hz via [`Chip8::tick_delay_timer`], and
//! presents the pixel buffer when [`Chip8::take_redraw`] or
//! [`Chip8::take_cleared`] fires.

pub mod cpu;
pub mod memory;
pub mod opcodes;
pub mod display;
pub mod keypad;

pub use cpu::Cpu;
pub use display::Display;
pub use keypad::Keypad;
pub use memory::Memory;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::fmt;
use std::io;

/// Addressable memory size: 4 KB
pub const MEM_SIZE: usize = 4096;
/// First address of loaded program bytes; 0x000–0x1FF is the reserved
/// interpreter/font area
pub const PROGRAM_START: u16 = 0x200;
/// Largest loadable program image
pub const MAX_ROM_SIZE: usize = MEM_SIZE - PROGRAM_START as usize;

/// Pixel buffer width
pub const SCREEN_WIDTH: usize = 64;
/// Pixel buffer height
pub const SCREEN_HEIGHT: usize = 32;

/// Number of general-purpose registers (V0–VF)
pub const REG_COUNT: usize = 16;
/// VF doubles as the carry/borrow/collision flag and is clobbered by
/// arithmetic, shift, and draw instructions
pub const FLAG_REG: usize = 0xF;
/// Call stack capacity
pub const STACK_DEPTH: usize = 16;
/// Number of keypad keys (0x0–0xF)
pub const KEY_COUNT: usize = 16;
/// Bytes per font glyph; glyph for digit `d` lives at `d * FONT_GLYPH_SIZE`
pub const FONT_GLYPH_SIZE: u16 = 5;

/// Error returned when a program image cannot be loaded.
#[derive(Debug)]
pub enum LoadError {
    /// The image does not fit in the 3584 bytes above the reserved area.
    ImageTooLarge { len: usize },
    /// The image could not be read from its source.
    SourceUnavailable(io::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::ImageTooLarge { len } => {
                write!(f, "ROM image is {} bytes, limit is {}", len, MAX_ROM_SIZE)
            }
            LoadError::SourceUnavailable(e) => write!(f, "ROM image unreadable: {}", e),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::SourceUnavailable(e) => Some(e),
            LoadError::ImageTooLarge { .. } => None,
        }
    }
}

/// Runtime condition reported by [`Chip8::step`].
///
/// Faults are non-fatal: the state effects of the instruction have already
/// been applied as specified and the machine stays steppable. The driver
/// decides whether to log, pause, or ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// A call was issued with the stack at full depth; the return address
    /// was dropped and the jump still taken.
    StackOverflow { pc: u16 },
    /// A return was issued with an empty stack; PC keeps its post-fetch value.
    StackUnderflow { pc: u16 },
    /// The fetched word matches no instruction; PC has already advanced.
    UnknownOpcode { opcode: u16, pc: u16 },
    /// A recognized family with a malformed fixed field
    /// (`5xy?`/`9xy?` with a nonzero low nibble).
    InvalidOpcodeFormat { opcode: u16, pc: u16 },
    /// An instruction addressed memory outside the 4096-byte space.
    AddressOutOfRange { addr: u16 },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::StackOverflow { pc } => write!(f, "stack overflow at 0x{:04X}", pc),
            Fault::StackUnderflow { pc } => write!(f, "stack underflow at 0x{:04X}", pc),
            Fault::UnknownOpcode { opcode, pc } => {
                write!(f, "unknown opcode 0x{:04X} at 0x{:04X}", opcode, pc)
            }
            Fault::InvalidOpcodeFormat { opcode, pc } => {
                write!(f, "invalid opcode format 0x{:04X} at 0x{:04X}", opcode, pc)
            }
            Fault::AddressOutOfRange { addr } => {
                write!(f, "address 0x{:04X} outside memory", addr)
            }
        }
    }
}

impl std::error::Error for Fault {}

/// Main CHIP-8 machine combining all subsystems
pub struct Chip8 {
    pub cpu: Cpu,
    pub mem: Memory,
    pub display: Display,
    pub keypad: Keypad,
    /// Random byte source for the `Cxkk` instruction
    pub(crate) rng: SmallRng,
    /// Enable diagnostic output (eprintln)
    pub debug: bool,
}

impl Chip8 {
    /// Create a machine with all state at power-on defaults and an
    /// OS-seeded random source.
    pub fn new() -> Self {
        Self::from_rng(SmallRng::from_os_rng())
    }

    /// Create a machine with a deterministic random source for
    /// reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(SmallRng::seed_from_u64(seed))
    }

    fn from_rng(rng: SmallRng) -> Self {
        Chip8 {
            cpu: Cpu::new(),
            mem: Memory::new(),
            display: Display::new(),
            keypad: Keypad::new(),
            rng,
            debug: false,
        }
    }

    /// Load a program image into memory at 0x200 and reset the machine.
    ///
    /// Returns the number of bytes loaded. On failure memory is untouched:
    /// the image is read and size-checked before any copy.
    pub fn load_rom(&mut self, reader: &mut impl io::Read) -> Result<usize, LoadError> {
        let mut image = Vec::new();
        reader
            .read_to_end(&mut image)
            .map_err(LoadError::SourceUnavailable)?;
        let size = self.mem.load_program(&image)?;
        self.reset();
        Ok(size)
    }

    /// Reset registers, stack, display, keypad, and timer to power-on state.
    ///
    /// Memory is preserved (it holds the loaded program and the font table).
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        self.display = Display::new();
        self.keypad = Keypad::new();
    }

    /// Execute one fetch-decode-execute cycle.
    ///
    /// Fetches the big-endian word at PC, advances PC by 2 before the
    /// instruction body runs, then executes. Runtime conditions come back
    /// as a [`Fault`]; the machine stays steppable after any of them.
    pub fn step(&mut self) -> Result<(), Fault> {
        let pc = self.cpu.pc;
        if pc as usize + 1 >= MEM_SIZE {
            return Err(Fault::AddressOutOfRange { addr: pc });
        }
        let word = self.mem.read_word(pc);
        let inst = opcodes::decode(word);
        self.cpu.tick += 1;
        self.execute_inst(inst)
    }

    /// Decrement the delay timer by one if nonzero.
    ///
    /// The core never decrements the timer on its own; the driving loop is
    /// expected to call this at 60 Hz.
    pub fn tick_delay_timer(&mut self) {
        if self.cpu.delay > 0 {
            self.cpu.delay -= 1;
        }
    }

    /// Set key state (true = pressed). Key indices above 0xF are masked.
    pub fn set_key(&mut self, key: u8, pressed: bool) {
        self.keypad.set_key(key, pressed);
    }

    /// Pixel buffer as one byte per pixel (0 or 1), row-major 64×32.
    pub fn framebuffer(&self) -> &[u8] {
        self.display.pixels()
    }

    /// Pixel buffer converted to 0RGB words for windowing backends.
    pub fn framebuffer_u32(&self) -> Vec<u32> {
        self.display.to_u32()
    }

    /// Take and clear the one-shot redraw signal.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.display.redraw)
    }

    /// Take and clear the one-shot clear-screen signal.
    pub fn take_cleared(&mut self) -> bool {
        std::mem::take(&mut self.display.cleared)
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenReader;

    impl io::Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "gone"))
        }
    }

    #[test]
    fn test_load_and_add_scenario() {
        // LD V0, 5 then ADD V0, 10
        let mut c = Chip8::with_seed(1);
        let mut rom: &[u8] = &[0x60, 0x05, 0x70, 0x0A];
        assert_eq!(c.load_rom(&mut rom).unwrap(), 4);
        c.step().unwrap();
        c.step().unwrap();
        assert_eq!(c.cpu.v[0], 15);
        assert_eq!(c.cpu.pc, 0x204);
    }

    #[test]
    fn test_draw_scenario_sets_redraw() {
        // LD I, 0x200 then DRW V0, V0, 5 — the instruction bytes double as
        // the sprite rows.
        let mut c = Chip8::with_seed(1);
        let mut rom: &[u8] = &[0xA2, 0x00, 0xD0, 0x05];
        c.load_rom(&mut rom).unwrap();
        c.step().unwrap();
        assert_eq!(c.cpu.i, 0x200);
        c.step().unwrap();
        assert!(c.take_redraw());
        // First sprite row is 0xA2: pixel (0,0) lit, (1,0) dark, (2,0) lit
        assert_eq!(c.display.pixel(0, 0), 1);
        assert_eq!(c.display.pixel(1, 0), 0);
        assert_eq!(c.display.pixel(2, 0), 1);
    }

    #[test]
    fn test_ret_on_empty_stack_reports_underflow() {
        let mut c = Chip8::with_seed(1);
        let mut rom: &[u8] = &[0x00, 0xEE];
        c.load_rom(&mut rom).unwrap();
        let err = c.step().unwrap_err();
        assert_eq!(err, Fault::StackUnderflow { pc: 0x200 });
        // PC keeps its post-fetch value
        assert_eq!(c.cpu.pc, 0x202);
    }

    #[test]
    fn test_step_out_of_range_pc() {
        let mut c = Chip8::with_seed(1);
        c.cpu.pc = 0x0FFF;
        assert_eq!(
            c.step().unwrap_err(),
            Fault::AddressOutOfRange { addr: 0x0FFF }
        );
        // Still steppable from a valid address
        c.cpu.pc = PROGRAM_START;
        c.mem.write_byte(0x200, 0x60);
        c.mem.write_byte(0x201, 0x42);
        c.step().unwrap();
        assert_eq!(c.cpu.v[0], 0x42);
    }

    #[test]
    fn test_load_rom_too_large() {
        let mut c = Chip8::with_seed(1);
        let image = vec![0u8; MAX_ROM_SIZE + 1];
        let err = c.load_rom(&mut image.as_slice()).unwrap_err();
        assert!(matches!(err, LoadError::ImageTooLarge { len } if len == MAX_ROM_SIZE + 1));
        // Nothing written
        assert_eq!(c.mem.read_byte(0x200), 0);
    }

    #[test]
    fn test_load_rom_source_unavailable() {
        let mut c = Chip8::with_seed(1);
        let err = c.load_rom(&mut BrokenReader).unwrap_err();
        assert!(matches!(err, LoadError::SourceUnavailable(_)));
        assert_eq!(c.mem.read_byte(0x200), 0);
    }

    #[test]
    fn test_load_rom_resets_state() {
        let mut c = Chip8::with_seed(1);
        c.cpu.v[3] = 9;
        c.cpu.pc = 0x300;
        c.set_key(0x4, true);
        let mut rom: &[u8] = &[0x12, 0x00];
        c.load_rom(&mut rom).unwrap();
        assert_eq!(c.cpu.v[3], 0);
        assert_eq!(c.cpu.pc, PROGRAM_START);
        assert!(!c.keypad.is_pressed(0x4));
    }

    #[test]
    fn test_delay_timer_hook() {
        let mut c = Chip8::with_seed(1);
        c.cpu.delay = 2;
        c.tick_delay_timer();
        c.tick_delay_timer();
        c.tick_delay_timer(); // saturates at zero
        assert_eq!(c.cpu.delay, 0);
    }

    #[test]
    fn test_redraw_signal_is_one_shot() {
        let mut c = Chip8::with_seed(1);
        c.display.redraw = true;
        assert!(c.take_redraw());
        assert!(!c.take_redraw());
    }
}
