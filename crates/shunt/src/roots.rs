//! Process-wide descriptor rooting.
//!
//! The host collector must not reclaim a method while a redirection holds
//! its entry address. Every live redirection appends both of its
//! descriptors here and removes them again on disposal; the collector
//! treats the list as part of its root set via [`scan`]. No ordering, no
//! uniqueness - a method redirected twice appears twice.

use std::sync::LazyLock;

use parking_lot::Mutex;
use shunt_host::MethodId;

static ROOTS: LazyLock<Mutex<Vec<MethodId>>> = LazyLock::new(|| Mutex::new(Vec::new()));

/// Pin `method` against collection.
pub(crate) fn root(method: MethodId) {
    ROOTS.lock().push(method);
}

/// Release one occurrence of `method`.
pub(crate) fn unroot(method: MethodId) {
    let mut roots = ROOTS.lock();
    if let Some(pos) = roots.iter().position(|&m| m == method) {
        roots.swap_remove(pos);
    }
}

/// Visit every rooted descriptor; the host collector calls this while
/// marking.
pub fn scan(mut visit: impl FnMut(MethodId)) {
    for &method in ROOTS.lock().iter() {
        visit(method);
    }
}

/// Number of rooted descriptors (one entry per live redirection end).
pub fn count() -> usize {
    ROOTS.lock().len()
}
