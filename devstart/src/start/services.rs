//! `--services` selector validation.

use crate::metadata::Service;
use devstart_shared::errors::{DevstartError, DevstartResult};

/// `all` and `none` (any case) always pass; otherwise every comma-separated
/// token must name a known service flag, case-insensitively.
pub fn is_service_supported(selector: &str, services: &[Service]) -> bool {
    let lowered = selector.trim().to_lowercase();
    if lowered == "all" || lowered == "none" {
        return true;
    }

    selector.split(',').map(str::trim).all(|token| {
        services
            .iter()
            .any(|service| service.flagname.eq_ignore_ascii_case(token))
    })
}

pub fn validate_selector(selector: &str, services: &[Service]) -> DevstartResult<()> {
    if is_service_supported(selector, services) {
        Ok(())
    } else {
        Err(DevstartError::InvalidInput(format!(
            "Service: '{}' is not supported",
            selector
        )))
    }
}
