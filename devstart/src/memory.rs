//! VM memory allocation policy.
//!
//! A non-zero request is always honored; warnings are advisory only. The base
//! value is substituted only when nothing was requested.

use std::fmt;

/// Advisory produced while picking the VM memory size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryWarning {
    /// Nothing requested and the machine has less free memory than the base.
    InsufficientFreeRam { deployment: String, base_mb: u64 },
    /// Less memory available than explicitly requested.
    InsufficientAvailableRam,
    /// Explicit request below the recommended base.
    BelowRecommended { deployment: String, base_mb: u64 },
}

impl fmt::Display for MemoryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryWarning::InsufficientFreeRam {
                deployment,
                base_mb,
            } => write!(
                f,
                "WARNING: {} Dev requires {} MB of RAM to run. This machine may not have enough free RAM.",
                deployment.to_uppercase(),
                base_mb
            ),
            MemoryWarning::InsufficientAvailableRam => write!(
                f,
                "WARNING: This machine may not have enough available RAM to run with what is specified."
            ),
            MemoryWarning::BelowRecommended {
                deployment,
                base_mb,
            } => write!(
                f,
                "WARNING: It is recommended that you run {} Dev with at least {} MB of RAM.",
                deployment.to_uppercase(),
                base_mb
            ),
        }
    }
}

/// Outcome of one allocation decision. All sizes in MB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDecision {
    pub requested_mb: u64,
    pub base_mb: u64,
    pub available_mb: u64,
    pub allocated_mb: u64,
    pub warnings: Vec<MemoryWarning>,
}

/// Decide how much memory the VM gets.
///
/// `requested_mb == 0` means "auto" and yields `base_mb`.
pub fn allocate(
    requested_mb: u64,
    base_mb: u64,
    available_mb: u64,
    deployment: &str,
) -> MemoryDecision {
    let mut warnings = Vec::new();

    let allocated_mb = if requested_mb == 0 {
        if available_mb < base_mb {
            warnings.push(MemoryWarning::InsufficientFreeRam {
                deployment: deployment.to_string(),
                base_mb,
            });
        }
        base_mb
    } else {
        if requested_mb < base_mb {
            warnings.push(MemoryWarning::BelowRecommended {
                deployment: deployment.to_string(),
                base_mb,
            });
        }
        if available_mb < requested_mb {
            warnings.push(MemoryWarning::InsufficientAvailableRam);
        }
        requested_mb
    };

    MemoryDecision {
        requested_mb,
        base_mb,
        available_mb,
        allocated_mb,
        warnings,
    }
}

/// Whole megabytes in `bytes`, rounded down.
pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes / (1024 * 1024)
}
