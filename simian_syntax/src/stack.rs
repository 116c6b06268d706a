/// Remaining stack below which a new segment is allocated.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f`, first growing the stack onto the heap if less than the
/// red zone is left. Wrap every recursive step of the parser and the
/// interpreter in this, so nesting depth is bounded by the explicit
/// limits rather than by the native stack of the calling thread.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
