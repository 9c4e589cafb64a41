//! Interrupts
//!
//! This module implements interrupt request/enable resolution for the
//! Game Boy interrupt system.
//!
//! - IE register (0xFFFF) - interrupt enable
//! - IF register (0xFF0F) - interrupt flags
//!
//! Interrupts are resolved in fixed priority order, which matches the
//! ordering of their dispatch vectors:
//! - VBlank: 0x0040
//! - LCD STAT: 0x0048
//! - Timer: 0x0050
//! - Serial: 0x0058
//! - Joypad: 0x0060

use log::debug;

use crate::common::{Byte, Word};
use crate::memory::{MemoryBus, IE_ADDRESS, IF_ADDRESS};

/// Interrupt types supported by the Game Boy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptKind {
    /// VBlank interrupt (highest priority)
    VBlank,
    /// LCD STAT interrupt
    LcdStat,
    /// Timer interrupt
    Timer,
    /// Serial interrupt
    Serial,
    /// Joypad interrupt (lowest priority)
    Joypad,
}

impl InterruptKind {
    /// Mask for this interrupt in IE/IF registers
    pub fn flag(self) -> Byte {
        self.descriptor().flag
    }

    /// Interrupt vector address
    pub fn vector(self) -> Word {
        self.descriptor().vector
    }

    /// Fixed descriptor for this kind
    pub fn descriptor(self) -> &'static InterruptDescriptor {
        match self {
            InterruptKind::VBlank => &DESCRIPTORS[0],
            InterruptKind::LcdStat => &DESCRIPTORS[1],
            InterruptKind::Timer => &DESCRIPTORS[2],
            InterruptKind::Serial => &DESCRIPTORS[3],
            InterruptKind::Joypad => &DESCRIPTORS[4],
        }
    }

    /// All interrupt kinds in priority order
    pub fn all() -> &'static [InterruptKind] {
        &[
            InterruptKind::VBlank,
            InterruptKind::LcdStat,
            InterruptKind::Timer,
            InterruptKind::Serial,
            InterruptKind::Joypad,
        ]
    }

    /// Whether this kind's bit is set in an IF or IE value
    pub fn is_set(self, value: Byte) -> bool {
        value & self.flag() != 0
    }
}

/// Dispatch vector and flag mask for one interrupt kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptDescriptor {
    pub kind: InterruptKind,
    pub vector: Word,
    pub flag: Byte,
}

/// Descriptor table, in priority order
pub static DESCRIPTORS: [InterruptDescriptor; 5] = [
    InterruptDescriptor { kind: InterruptKind::VBlank, vector: 0x0040, flag: 0x01 },
    InterruptDescriptor { kind: InterruptKind::LcdStat, vector: 0x0048, flag: 0x02 },
    InterruptDescriptor { kind: InterruptKind::Timer, vector: 0x0050, flag: 0x04 },
    InterruptDescriptor { kind: InterruptKind::Serial, vector: 0x0058, flag: 0x08 },
    InterruptDescriptor { kind: InterruptKind::Joypad, vector: 0x0060, flag: 0x10 },
];

/// An interrupt selected for servicing.
///
/// Handed to the CPU dispatcher; the descriptor table itself is never
/// mutated, so nothing carries over between resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingInterrupt {
    pub descriptor: &'static InterruptDescriptor,
}

impl PendingInterrupt {
    pub fn kind(&self) -> InterruptKind {
        self.descriptor.kind
    }

    pub fn vector(&self) -> Word {
        self.descriptor.vector
    }
}

/// Highest priority interrupt that is both requested and enabled.
///
/// Lower priority requests stay in IF untouched; the caller re-resolves at
/// every instruction boundary.
pub fn resolve(request_flags: Byte, enable_mask: Byte) -> Option<PendingInterrupt> {
    let pending = request_flags & enable_mask & 0x1F;
    if pending == 0 {
        return None;
    }

    DESCRIPTORS
        .iter()
        .find(|descriptor| pending & descriptor.flag != 0)
        .map(|descriptor| PendingInterrupt { descriptor })
}

/// Set an interrupt's request bit in IF
pub fn request<M: MemoryBus + ?Sized>(mem: &mut M, kind: InterruptKind) {
    let flags = mem.read_raw(IF_ADDRESS);
    mem.write(IF_ADDRESS, flags | kind.flag());
    debug!("interrupt requested: {:?}", kind);
}

/// Clear a serviced interrupt's request bit in IF
pub fn acknowledge<M: MemoryBus + ?Sized>(mem: &mut M, pending: PendingInterrupt) {
    let flags = mem.read_raw(IF_ADDRESS);
    mem.write(IF_ADDRESS, flags & !pending.descriptor.flag);
}

/// Interrupt controller state held on behalf of the CPU dispatcher
#[derive(Debug, Clone, Default)]
pub struct InterruptController {
    /// Interrupt Master Enable flag
    pub ime: bool,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve against the IF/IE registers in memory.
    ///
    /// Nothing is pending while IME is off, whatever IF and IE hold.
    pub fn pending<M: MemoryBus + ?Sized>(&self, mem: &M) -> Option<PendingInterrupt> {
        if !self.ime {
            return None;
        }
        resolve(mem.read_raw(IF_ADDRESS), mem.read_raw(IE_ADDRESS))
    }

    /// Take the highest-priority pending interrupt: clear its IF bit and
    /// disable IME until `return_from_interrupt`.
    pub fn service<M: MemoryBus + ?Sized>(&mut self, mem: &mut M) -> Option<PendingInterrupt> {
        let pending = self.pending(mem)?;
        acknowledge(mem, pending);
        self.ime = false;
        Some(pending)
    }

    /// RETI: re-enable IME
    pub fn return_from_interrupt(&mut self) {
        self.ime = true;
    }
}
