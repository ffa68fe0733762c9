//! Page protection and raw code copies.
//!
//! The patcher needs exactly three memory operations: make the pages behind
//! a method entry writable, snapshot bytes out of a code region, and copy a
//! byte sequence over one. Protection goes through `VirtualProtect` on
//! Windows and `mprotect` on Linux/macOS; on ARM hosts the targeted managed
//! runtimes leave their code pages writable, so the protection call is a
//! no-op there.

use crate::arch::Arch;
use crate::error::{DetourError, DetourResult};

/// Make the pages covering `[addr, addr + len)` readable, writable, and
/// executable.
///
/// No-op on ARM and ARM64 hosts. Fails with
/// [`DetourError::MemoryProtect`] carrying the OS error code when the
/// protection change is refused.
pub fn allow_rw(addr: *const u8, len: usize) -> DetourResult<()> {
    if matches!(Arch::host()?, Arch::Arm | Arch::Aarch64) {
        return Ok(());
    }
    protect_rwx(addr, len)
}

#[cfg(unix)]
fn protect_rwx(addr: *const u8, len: usize) -> DetourResult<()> {
    use libc::{PROT_EXEC, PROT_READ, PROT_WRITE, _SC_PAGESIZE};

    // Safety: sysconf only queries configuration.
    let page = unsafe { libc::sysconf(_SC_PAGESIZE) } as usize;
    let start = addr as usize & !(page - 1);
    let span = addr as usize + len - start;

    // Safety: start is page-aligned and span covers the requested range.
    let ret = unsafe {
        libc::mprotect(
            start as *mut libc::c_void,
            span,
            PROT_READ | PROT_WRITE | PROT_EXEC,
        )
    };
    if ret != 0 {
        return Err(DetourError::MemoryProtect(last_os_error()));
    }
    Ok(())
}

#[cfg(windows)]
fn protect_rwx(addr: *const u8, len: usize) -> DetourResult<()> {
    use windows_sys::Win32::System::Memory::{VirtualProtect, PAGE_EXECUTE_READWRITE};

    let mut old = 0u32;
    // Safety: the kernel expands the span to page granularity itself.
    let ok = unsafe {
        VirtualProtect(
            addr as *const core::ffi::c_void,
            len,
            PAGE_EXECUTE_READWRITE,
            &mut old,
        )
    };
    if ok == 0 {
        return Err(DetourError::MemoryProtect(last_os_error()));
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn protect_rwx(_addr: *const u8, _len: usize) -> DetourResult<()> {
    Err(DetourError::MemoryProtect(-1))
}

#[cfg(any(unix, windows))]
fn last_os_error() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(-1)
}

/// Snapshot `len` bytes out of a code region.
///
/// # Safety
///
/// `addr` must be readable for `len` bytes.
pub unsafe fn read_code(addr: *const u8, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    std::ptr::copy_nonoverlapping(addr, out.as_mut_ptr(), len);
    out
}

/// Copy `bytes` over a code region and perform instruction-cache
/// maintenance for the span.
///
/// # Safety
///
/// `addr` must be writable for `bytes.len()` bytes (see [`allow_rw`]), and
/// no thread may be executing inside the span during the copy.
pub unsafe fn write_code(addr: *mut u8, bytes: &[u8]) {
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), addr, bytes.len());
    flush_icache(addr, bytes.len());
}

#[cfg(not(target_arch = "aarch64"))]
fn flush_icache(_addr: *mut u8, _len: usize) {
    // Coherent I-cache; a barrier orders the copy before re-entry.
    std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
}

#[cfg(target_arch = "aarch64")]
fn flush_icache(addr: *mut u8, len: usize) {
    // Clean D-cache to the point of unification, then invalidate the
    // I-cache over the patched lines.
    unsafe {
        let start = addr as usize;
        let end = start + len;
        for line in (start..end).step_by(64) {
            core::arch::asm!("dc cvau, {a}", a = in(reg) line, options(nostack));
        }
        core::arch::asm!("dsb ish", options(nostack));
        for line in (start..end).step_by(64) {
            core::arch::asm!("ic ivau, {a}", a = in(reg) line, options(nostack));
        }
        core::arch::asm!("dsb ish", "isb", options(nostack));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    struct Mapping {
        base: *mut u8,
        size: usize,
    }

    impl Mapping {
        fn new(size: usize, prot: i32) -> Mapping {
            let base = unsafe {
                libc::mmap(
                    std::ptr::null_mut(),
                    size,
                    prot,
                    libc::MAP_PRIVATE | libc::MAP_ANON,
                    -1,
                    0,
                )
            };
            assert_ne!(base, libc::MAP_FAILED);
            Mapping { base: base as *mut u8, size }
        }
    }

    impl Drop for Mapping {
        fn drop(&mut self) {
            unsafe { libc::munmap(self.base as *mut libc::c_void, self.size) };
        }
    }

    #[test]
    fn test_copy_round_trip() {
        let map = Mapping::new(4096, libc::PROT_READ | libc::PROT_WRITE);
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF, 0x12];
        unsafe {
            write_code(map.base, &bytes);
            assert_eq!(read_code(map.base, bytes.len()), bytes);
        }
    }

    #[test]
    fn test_allow_rw_on_writable_page() {
        let map = Mapping::new(4096, libc::PROT_READ | libc::PROT_WRITE);
        allow_rw(map.base, 16).unwrap();
    }

    // ARM hosts skip the protection change entirely, so only the x86
    // family can prove the page really became writable.
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[test]
    fn test_allow_rw_unlocks_readonly_page() {
        let map = Mapping::new(4096, libc::PROT_READ | libc::PROT_EXEC);
        allow_rw(map.base, 16).unwrap();
        unsafe {
            write_code(map.base, &[0x90, 0x90, 0x90]);
            assert_eq!(read_code(map.base, 3), [0x90, 0x90, 0x90]);
        }
    }

    // A span that straddles a page boundary must unlock both pages.
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[test]
    fn test_allow_rw_spans_page_boundary() {
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let map = Mapping::new(page * 2, libc::PROT_READ | libc::PROT_EXEC);
        let near_end = unsafe { map.base.add(page - 4) };
        allow_rw(near_end, 12).unwrap();
        unsafe {
            write_code(near_end, &[0xAA; 12]);
            assert_eq!(read_code(near_end, 12), [0xAA; 12]);
        }
    }
}
