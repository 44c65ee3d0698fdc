//! Audio output sink resolution and device enumeration
//!
//! This crate is the chokepoint between a media pipeline's desired
//! output device/format and the native audio APIs that may satisfy it.
//! Callers hand in a `"[DRIVER:]path"` device string and a desired
//! [`AudioFormat`]; they get back either a live, initialized [`Sink`]
//! (with the format rewritten to what the hardware negotiated) or
//! nothing. Independently, [`enumerate`] aggregates the available output
//! devices across every backend compiled into the build.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             media pipeline (caller)          │
//! └──────────┬───────────────────┬──────────────┘
//!            │ create            │ enumerate
//!            ▼                   ▼
//! ┌─────────────────────────────────────────────┐
//! │                  Registry                    │
//! │  parse_device(), try_sink(), enumerate()     │
//! │  one descriptor per compiled-in backend      │
//! └──────┬──────────┬──────────┬────────────────┘
//!        ▼          ▼          ▼
//! ┌──────────┐ ┌──────────┐ ┌──────────────┐
//! │ Pulse /  │ │ ALSA     │ │ PROFILER /   │
//! │ CoreAudio│ │          │ │ NULL         │
//! └──────────┘ └──────────┘ └──────────────┘
//! ```
//!
//! The registry is the single source of truth: the driver prefixes that
//! parse are exactly the backends that dispatch. Backend membership is
//! fixed at build time (target plus cargo features); the `PROFILER` and
//! `NULL` pseudo-drivers exist in every build.
//!
//! Resolution is deterministic and caller-directed: one attempt against
//! the named backend, no fallback chain, and a guaranteed
//! deinitialize-and-destroy of any instance that fails to come up.

pub mod error;
pub mod factory;
pub mod registry;
pub mod sink;
pub mod sinks;
pub mod types;

// Re-exports for convenience
pub use error::{Result, SinkError};
pub use factory::{create, enumerate};
pub use registry::Registry;
pub use sink::{Sink, SinkDescriptor};
pub use types::*;
