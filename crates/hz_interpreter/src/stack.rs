//! Stack growth for deeply nested programs.
//!
//! Statement execution and expression evaluation recurse on the host stack, so
//! every level goes through [`ensure_sufficient_stack`].

/// Run `f`, first growing the stack onto the heap when little of it is left.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (100KB red zone).
    const RED_ZONE: usize = 100 * 1024;

    /// Stack space to allocate when growing (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
