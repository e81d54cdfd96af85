//! Target expansion: `role:<name>` references → member ids.

use std::collections::{BTreeSet, HashSet};

use tracing::warn;

use hivesched_core::traits::RoleDirectory;

/// Expand a target list, resolving each `role:<name>` reference to its
/// member ids — one lookup per distinct role. The result is
/// deduplicated and deterministically ordered. A role that fails to
/// resolve contributes nothing — the failure is logged, never
/// propagated, so one bad role cannot sink the rest of the list.
pub async fn expand_targets(raw: &[String], roles: &dyn RoleDirectory) -> Vec<String> {
    let mut expanded: BTreeSet<String> = BTreeSet::new();
    let mut seen_roles: HashSet<&str> = HashSet::new();
    for entry in raw {
        if let Some(role_name) = entry.strip_prefix("role:") {
            if !seen_roles.insert(role_name) {
                continue;
            }
            match roles.role_members(role_name).await {
                Ok(members) => {
                    expanded.extend(members);
                }
                Err(e) => {
                    warn!("⚠️ Failed to resolve role '{role_name}': {e}");
                }
            }
        } else if !entry.is_empty() {
            expanded.insert(entry.clone());
        }
    }
    expanded.into_iter().collect()
}
