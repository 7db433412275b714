//! devstart: brings up the local development VM.
//!
//! [`start::Orchestrator`] runs the startup pipeline against the collaborator
//! ports in [`ports`]; [`adapters::collaborators`] wires the Hyper-V backed
//! implementations. The watchdog armed during startup outlives the run and
//! tears the VM down if a supervised daemon dies.

pub mod adapters;
pub mod analytics;
pub mod constants;
pub mod hypervisor;
pub mod layout;
pub mod logging;
pub mod memory;
pub mod metadata;
pub mod net;
pub mod options;
pub mod pipeline;
pub mod ports;
pub mod resource;
pub mod start;
pub mod util;
pub mod watchdog;

pub use devstart_shared::errors::{DevstartError, DevstartResult};
pub use layout::FilesystemLayout;
pub use memory::{MemoryDecision, MemoryWarning};
pub use options::DevstartOptions;
pub use start::{Orchestrator, StartOutcome, StartReport, StartupArgs, StartupState};
pub use watchdog::{WatchdogOutcome, watchdog_channel};
