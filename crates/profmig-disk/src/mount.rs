//! Mount designator resolution.
//!
//! Designators are polled at a fixed settle interval until two consecutive
//! observations agree and are non-empty. A stable set with several entries is
//! narrowed to the designators whose root is reachable; exactly one must remain.

use std::path::Path;
use std::time::Duration;

use profmig_core::{BlockStorage, MountPoint};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{ProvisioningError, ProvisioningResult};

/// Polling budget for mount resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountPolicy {
    /// Maximum number of enumerations.
    pub attempts: u32,
    /// Delay between enumerations.
    pub settle: Duration,
}

/// Resolve the single designator of an attached container.
///
/// # Errors
///
/// Returns [`ProvisioningError::MountUnavailable`] when no stable non-empty set
/// is observed, [`ProvisioningError::AmbiguousMount`] when more than one
/// reachable designator remains, and [`ProvisioningError::Storage`] when the
/// enumeration itself fails.
pub async fn resolve_mount(
    storage: &dyn BlockStorage,
    backing_path: &Path,
    policy: MountPolicy,
) -> ProvisioningResult<MountPoint> {
    let mut previous: Option<Vec<MountPoint>> = None;
    let mut stable = None;

    for attempt in 1..=policy.attempts {
        let mut current = storage
            .mount_points(backing_path)
            .await
            .map_err(|source| ProvisioningError::storage("enumerate mounts", backing_path, source))?;
        current.sort();
        current.dedup();
        debug!(
            backing = %backing_path.display(),
            attempt,
            designators = current.len(),
            "observed mount designators"
        );

        if !current.is_empty() && previous.as_ref() == Some(&current) {
            stable = Some(current);
            break;
        }
        previous = Some(current);
        if attempt < policy.attempts {
            sleep(policy.settle).await;
        }
    }

    let Some(designators) = stable else {
        return Err(ProvisioningError::MountUnavailable {
            path: backing_path.to_path_buf(),
            attempts: policy.attempts,
        });
    };

    if let [only] = designators.as_slice() {
        return Ok(only.clone());
    }

    let reachable: Vec<MountPoint> = designators
        .iter()
        .filter(|designator| designator.root().exists())
        .cloned()
        .collect();
    if let [only] = reachable.as_slice() {
        warn!(
            backing = %backing_path.display(),
            chosen = %only,
            "multiple designators reported; using the only reachable one"
        );
        return Ok(only.clone());
    }

    Err(ProvisioningError::AmbiguousMount {
        path: backing_path.to_path_buf(),
        designators: designators.iter().map(ToString::to_string).collect(),
    })
}
