// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
// Test code may unwrap and glob-import its parent module.
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::wildcard_imports
    )
)]

//! Shared-clock stage engine for decorative orbit, label and lens-blob
//! animations.
//!
//! A single elapsed time since the global start maps to one
//! [`AnimationStage`](animation::AnimationStage) per frame. Every orbiting
//! ring and the lens blob consume that same stage and smooth their radius,
//! scale and label state toward per-stage targets, so independently
//! configured objects never drift apart. Rendering is gated on viewport
//! intersection and page visibility; re-entering the viewport restarts the
//! cycle from zero.
//!
//! # Key entry points
//!
//! - [`engine::OrbitSystemManager`] - owns the clock, the render gate and
//!   the controllers
//! - [`options::Options`] - stage durations, ring and blob tables, TOML
//!   presets
//! - [`host`] - collaborator traits the host implements (scheduler,
//!   projector, visuals, observers)
//! - [`lifecycle::RenderLifecycleGate`] - viewport/visibility render gating
//!
//! # Driving a manager
//!
//! The host forwards display frames and timers back into the manager:
//!
//! ```ignore
//! manager.start(Instant::now());
//! // from requestAnimationFrame / setTimeout / signal callbacks:
//! manager.on_frame(request, Instant::now());
//! manager.on_timer(handle, Instant::now());
//! manager.handle_viewport_change(entered, Instant::now());
//! ```
//!
//! [`host::ManualScheduler`] pumps the same callbacks deterministically for
//! tests and headless runs.

pub mod animation;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod host;
pub mod lifecycle;
pub mod options;
#[cfg(feature = "web")]
pub mod web;
