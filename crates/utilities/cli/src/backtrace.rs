//! Helper to set the backtrace env var.

/// Sets `RUST_BACKTRACE` to 1 unless it was explicitly provided.
///
/// Call at the very start of `main`, before any thread is spawned.
pub fn enable() {
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        // SAFETY: called before the runtime starts, while the process is single threaded.
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }
}
