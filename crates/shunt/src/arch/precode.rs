//! Precode stub recognition.
//!
//! Until the JIT has produced native code for a method, the host runtime
//! parks a small architecture-specific routine (a precode or fixup stub) at
//! the method's entry address. The patterns below are empirical shapes
//! observed per architecture; they are configuration data, kept in one
//! table per architecture so a runtime revision bump is a table edit, not a
//! logic change. If no pattern matches, the body is compiled.

use super::Arch;

/// A byte pattern identifying a runtime-installed stub at a method entry.
#[derive(Debug, Clone, Copy)]
pub struct StubPattern {
    /// Offset from the entry address where the pattern begins.
    pub offset: usize,
    /// The bytes expected at that offset.
    pub bytes: &'static [u8],
}

const X86_PATTERNS: &[StubPattern] = &[
    // precode: mov eax, imm32 marker at offset 5
    StubPattern { offset: 5, bytes: &[0xB8] },
    // fixup precode: relative jmp
    StubPattern { offset: 0, bytes: &[0xE9] },
];

const X86_64_PATTERNS: &[StubPattern] = &[
    // precode: mov r10, imm64 marker
    StubPattern { offset: 0, bytes: &[0x49, 0xBA] },
    // fixup precode: relative jmp
    StubPattern { offset: 0, bytes: &[0xE9] },
];

const ARM_PATTERNS: &[StubPattern] = &[
    // precode: ldr.w / ldr.w pair
    StubPattern {
        offset: 0,
        bytes: &[0xF8, 0xDF, 0xC0, 0x08, 0xF8, 0xDF, 0xF0, 0x00],
    },
    // fixup precode
    StubPattern {
        offset: 0,
        bytes: &[0x46, 0xFC, 0xF8, 0xDF, 0xF0, 0x04],
    },
];

const AARCH64_PATTERNS: &[StubPattern] = &[
    // precode (little-endian word order)
    StubPattern {
        offset: 0,
        bytes: &[
            0x89, 0x00, 0x00, 0x10, 0x2A, 0x31, 0x40, 0xA9, 0x40, 0x01, 0x1F, 0xD6,
        ],
    },
    // fixup precode
    StubPattern {
        offset: 0,
        bytes: &[
            0x0C, 0x00, 0x00, 0x10, 0x6B, 0x00, 0x00, 0x58, 0x60, 0x01, 0x1F, 0xD6,
        ],
    },
];

/// The stub patterns for one architecture.
pub fn stub_patterns(arch: Arch) -> &'static [StubPattern] {
    match arch {
        Arch::X86 => X86_PATTERNS,
        Arch::X86_64 => X86_64_PATTERNS,
        Arch::Arm => ARM_PATTERNS,
        Arch::Aarch64 => AARCH64_PATTERNS,
    }
}

/// How many bytes must be readable at an entry to run every pattern check.
pub fn probe_len(arch: Arch) -> usize {
    stub_patterns(arch)
        .iter()
        .map(|p| p.offset + p.bytes.len())
        .max()
        .unwrap_or(0)
}

/// Whether `code`, read from a method entry, still holds a precode stub.
pub fn matches_precode(code: &[u8], arch: Arch) -> bool {
    stub_patterns(arch).iter().any(|p| {
        code.len() >= p.offset + p.bytes.len()
            && code[p.offset..p.offset + p.bytes.len()] == *p.bytes
    })
}

/// Whether the memory at `entry` holds JIT-produced native code rather than
/// a runtime stub.
///
/// # Safety
///
/// `entry` must be readable for at least [`probe_len`] bytes.
pub unsafe fn is_compiled(entry: *const u8, arch: Arch) -> bool {
    let code = crate::mem::read_code(entry, probe_len(arch));
    !matches_precode(&code, arch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_lens() {
        assert_eq!(probe_len(Arch::X86), 6);
        assert_eq!(probe_len(Arch::X86_64), 2);
        assert_eq!(probe_len(Arch::Arm), 8);
        assert_eq!(probe_len(Arch::Aarch64), 12);
    }

    #[test]
    fn test_x86_64_stub_and_fixup() {
        assert!(matches_precode(&[0x49, 0xBA, 0x00, 0x11], Arch::X86_64));
        assert!(matches_precode(&[0xE9, 0x10, 0x20, 0x30, 0x40], Arch::X86_64));
        // compiled prologue: push rbp / mov rbp, rsp
        assert!(!matches_precode(&[0x55, 0x48, 0x89, 0xE5], Arch::X86_64));
    }

    #[test]
    fn test_x86_marker_at_offset() {
        // mov eax, imm32 marker sits at offset 5
        assert!(matches_precode(
            &[0x00, 0x00, 0x00, 0x00, 0x00, 0xB8, 0x01],
            Arch::X86
        ));
        // same byte at the entry itself is an ordinary mov, not a stub
        assert!(!matches_precode(
            &[0xB8, 0x01, 0x00, 0x00, 0x00, 0xC3],
            Arch::X86
        ));
    }

    #[test]
    fn test_arm_patterns() {
        assert!(matches_precode(
            &[0xF8, 0xDF, 0xC0, 0x08, 0xF8, 0xDF, 0xF0, 0x00],
            Arch::Arm
        ));
        assert!(matches_precode(
            &[0x46, 0xFC, 0xF8, 0xDF, 0xF0, 0x04, 0xAA, 0xBB],
            Arch::Arm
        ));
        assert!(!matches_precode(&[0x00; 8], Arch::Arm));
    }

    #[test]
    fn test_aarch64_patterns() {
        let stub = [
            0x89, 0x00, 0x00, 0x10, 0x2A, 0x31, 0x40, 0xA9, 0x40, 0x01, 0x1F, 0xD6,
        ];
        let fixup = [
            0x0C, 0x00, 0x00, 0x10, 0x6B, 0x00, 0x00, 0x58, 0x60, 0x01, 0x1F, 0xD6,
        ];
        assert!(matches_precode(&stub, Arch::Aarch64));
        assert!(matches_precode(&fixup, Arch::Aarch64));
        // stp x29, x30, [sp, #-16]! prologue
        assert!(!matches_precode(
            &[0xFD, 0x7B, 0xBF, 0xA9, 0xFD, 0x03, 0x00, 0x91, 0x00, 0x00, 0x00, 0x00],
            Arch::Aarch64
        ));
    }

    #[test]
    fn test_short_reads_never_match() {
        // A read shorter than any pattern classifies as compiled.
        assert!(!matches_precode(&[0x49], Arch::X86_64));
        assert!(!matches_precode(&[], Arch::Arm));
    }
}
