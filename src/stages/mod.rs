//! Pipeline stages
//!
//! Each stage is a free function taking its inputs explicitly; nothing is
//! threaded through globals. Stages run strictly top to bottom and every
//! failure aborts the run, except the per-volume snapshot loop.

pub mod identity;
pub mod preflight;
pub mod snapshot;
pub mod update;
