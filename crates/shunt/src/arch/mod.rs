//! Architecture dispatch and absolute-jump encodings.
//!
//! Every supported architecture gets the shortest absolute,
//! position-independent jump to a 32- or 64-bit destination. The encodings
//! are plain data, constructible for any [`Arch`] value on any host, so the
//! tables stay testable everywhere; [`Arch::host`] picks the variant the
//! process actually runs on.

pub mod precode;

use crate::error::DetourResult;

/// A CPU architecture the patcher knows how to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// 32-bit x86.
    X86,
    /// 64-bit x86.
    X86_64,
    /// 32-bit ARM.
    Arm,
    /// 64-bit ARM.
    Aarch64,
}

impl Arch {
    /// The architecture of the running process.
    pub fn host() -> DetourResult<Arch> {
        #[cfg(target_arch = "x86")]
        {
            Ok(Arch::X86)
        }

        #[cfg(target_arch = "x86_64")]
        {
            Ok(Arch::X86_64)
        }

        #[cfg(target_arch = "arm")]
        {
            Ok(Arch::Arm)
        }

        #[cfg(target_arch = "aarch64")]
        {
            Ok(Arch::Aarch64)
        }

        #[cfg(not(any(
            target_arch = "x86",
            target_arch = "x86_64",
            target_arch = "arm",
            target_arch = "aarch64"
        )))]
        {
            Err(crate::error::DetourError::UnsupportedArchitecture(
                std::env::consts::ARCH,
            ))
        }
    }

    /// Length of the patch written at a method entry.
    pub fn patch_size(self) -> usize {
        match self {
            Arch::X86 => 6,
            Arch::X86_64 => 12,
            Arch::Arm => 8,
            Arch::Aarch64 => 16,
        }
    }

    /// The absolute jump to `dest`, exactly [`patch_size`](Self::patch_size)
    /// bytes long.
    pub fn jmp_bytes(self, dest: usize) -> Vec<u8> {
        let code = match self {
            // push imm32 / ret
            Arch::X86 => {
                let mut code = vec![0x68];
                code.extend_from_slice(&(dest as u32).to_le_bytes());
                code.push(0xC3);
                code
            }
            // mov rax, imm64 / jmp rax
            Arch::X86_64 => {
                let mut code = vec![0x48, 0xB8];
                code.extend_from_slice(&(dest as u64).to_le_bytes());
                code.extend_from_slice(&[0xFF, 0xE0]);
                code
            }
            // ldr pc, [pc, #-4] / address literal
            Arch::Arm => {
                let mut code = vec![0x04, 0xF0, 0x1F, 0xE5];
                code.extend_from_slice(&(dest as u32).to_le_bytes());
                code
            }
            // ldr x16, #8 / br x16 / address literal
            //
            // x16 is the intra-procedure-call scratch register, free to
            // clobber at an entry point.
            Arch::Aarch64 => {
                let mut code = vec![0x50, 0x00, 0x00, 0x58, 0x00, 0x02, 0x1F, 0xD6];
                code.extend_from_slice(&(dest as u64).to_le_bytes());
                code
            }
        };
        debug_assert_eq!(code.len(), self.patch_size());
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_sizes() {
        assert_eq!(Arch::X86.patch_size(), 6);
        assert_eq!(Arch::X86_64.patch_size(), 12);
        assert_eq!(Arch::Arm.patch_size(), 8);
        assert_eq!(Arch::Aarch64.patch_size(), 16);
    }

    #[test]
    fn test_jmp_lengths_match_patch_size() {
        for arch in [Arch::X86, Arch::X86_64, Arch::Arm, Arch::Aarch64] {
            assert_eq!(arch.jmp_bytes(0x1122_3344).len(), arch.patch_size());
        }
    }

    #[test]
    fn test_x86_encoding() {
        assert_eq!(
            Arch::X86.jmp_bytes(0x1122_3344),
            [0x68, 0x44, 0x33, 0x22, 0x11, 0xC3]
        );
    }

    #[test]
    fn test_x86_64_encoding() {
        assert_eq!(
            Arch::X86_64.jmp_bytes(0xDEAD_BEEF_CAFE_BABE),
            [0x48, 0xB8, 0xBE, 0xBA, 0xFE, 0xCA, 0xEF, 0xBE, 0xAD, 0xDE, 0xFF, 0xE0]
        );
    }

    #[test]
    fn test_arm_encoding() {
        assert_eq!(
            Arch::Arm.jmp_bytes(0x1122_3344),
            [0x04, 0xF0, 0x1F, 0xE5, 0x44, 0x33, 0x22, 0x11]
        );
    }

    #[test]
    fn test_aarch64_encoding() {
        let code = Arch::Aarch64.jmp_bytes(0xDEAD_BEEF_CAFE_BABE);
        // ldr x16, #8
        assert_eq!(&code[..4], [0x50, 0x00, 0x00, 0x58]);
        // br x16
        assert_eq!(&code[4..8], [0x00, 0x02, 0x1F, 0xD6]);
        // little-endian destination literal
        assert_eq!(&code[8..], 0xDEAD_BEEF_CAFE_BABEu64.to_le_bytes());
    }

    #[test]
    fn test_host_is_supported_here() {
        // The test suite only runs on architectures the patcher targets.
        let arch = Arch::host().unwrap();
        assert!(arch.patch_size() > 0);
    }
}
