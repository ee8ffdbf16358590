//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `pagegrid_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("pagegrid_core ping={}", pagegrid_core::ping());
    println!("pagegrid_core version={}", pagegrid_core::core_version());
}
