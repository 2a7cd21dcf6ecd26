//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `tracemap_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("tracemap_core ping={}", tracemap_core::ping());
    println!("tracemap_core version={}", tracemap_core::core_version());
}
