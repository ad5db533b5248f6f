//! Hotpatch - incremental patch distribution for independently versioned
//! business units.
//!
//! This library provides the client-side coordination layer that asks a
//! remote service whether newer patches exist, then drives one download per
//! business unit while reporting progress and outcomes to observers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       UpdateOrchestrator                          │
//! │                                                                   │
//! │  check_for_update ──► CheckRequest ──► TaskExecutor ──► Check     │
//! │                                                        Transport  │
//! │                                                           │       │
//! │                 SharedCheckState ◄── response ◄───────────┘       │
//! │                        │                                          │
//! │                        ▼ (success)                                │
//! │  BusinessInfoRegistry ◄── fan-out ──► PatchRegistry               │
//! │                        │                                          │
//! │                        ▼ (per business with a LatestPatch)        │
//! │            DownloadTransport ──► DownloadEvents ──► listeners     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Collaborators (transports, patch registry, executor) are injected as
//! trait objects so the orchestrator can be exercised with scripted mocks.

pub mod business;
pub mod check;
pub mod config;
pub mod executor;
pub mod logging;
pub mod orchestrator;
pub mod registry;
pub mod telemetry;
pub mod transport;

pub use business::{BusinessInfo, BusinessInfoRegistry, BusinessPatch, LatestPatch, UpdateState};
pub use check::{CheckForUpdateResponse, CheckUpdateState};
pub use orchestrator::{
    CheckOutcome, Collaborators, DownloadTaskListener, OrchestratorError, UpdateOrchestrator,
};
pub use registry::{InMemoryPatchRegistry, PatchRegistry};
