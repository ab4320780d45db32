//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check group identities are complete and unique
//! - Validate value ranges (timings > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: WatchConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted into the system, including hot reloads

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::WatchConfig;
use crate::topology::types::GroupId;

/// A single semantic violation in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("watch.probe_interval_ms must be greater than zero")]
    ZeroProbeInterval,

    #[error("watch.probe_timeout_ms must be greater than zero")]
    ZeroProbeTimeout,

    #[error("watch.update_buffer must be greater than zero")]
    ZeroUpdateBuffer,

    #[error("group #{0} must have both a namespace and a name")]
    UnnamedGroup(usize),

    #[error("group {0} is defined more than once")]
    DuplicateGroup(GroupId),

    #[error("group {group} lists an empty endpoint address")]
    EmptyAddress { group: GroupId },

    #[error("group {group} declares port \"{name}\" as zero")]
    ZeroPort { group: GroupId, name: String },
}

/// Validate semantic constraints, returning every violation found.
pub fn validate_config(config: &WatchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.watch.probe_interval_ms == 0 {
        errors.push(ValidationError::ZeroProbeInterval);
    }
    if config.watch.probe_timeout_ms == 0 {
        errors.push(ValidationError::ZeroProbeTimeout);
    }
    if config.watch.update_buffer == 0 {
        errors.push(ValidationError::ZeroUpdateBuffer);
    }

    let mut seen = HashSet::new();
    for (index, group) in config.groups.iter().enumerate() {
        if group.namespace.is_empty() || group.name.is_empty() {
            errors.push(ValidationError::UnnamedGroup(index));
            continue;
        }

        let id = GroupId::new(group.namespace.clone(), group.name.clone());
        if !seen.insert(id.clone()) {
            errors.push(ValidationError::DuplicateGroup(id.clone()));
        }

        for port in &group.vip_ports {
            if port.port == 0 {
                errors.push(ValidationError::ZeroPort {
                    group: id.clone(),
                    name: port.name.clone(),
                });
            }
        }
        for endpoint in &group.endpoints {
            if endpoint.addresses.iter().any(|a| a.is_empty()) {
                errors.push(ValidationError::EmptyAddress { group: id.clone() });
            }
            for port in &endpoint.ports {
                if port.port == 0 {
                    errors.push(ValidationError::ZeroPort {
                        group: id.clone(),
                        name: port.name.clone(),
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
