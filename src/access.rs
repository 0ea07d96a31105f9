//! Per-connection-profile access filter
//!
//! A profile's `access` key is a comma-separated allow-list of user names.
//! The check is advisory: callers translate a `false` into a 403-equivalent
//! rejection before honoring a profile reference.

use crate::auth::Identity;
use crate::profiles::ConnectionProfile;

/// Decide whether an identity may use a connection profile
///
/// No `access` key (or an empty one) means the profile is unrestricted.
/// A restricted profile admits only a present, non-empty identity that is an
/// exact member of the list; anonymous callers are always denied.
#[must_use]
pub fn has_access(identity: Option<&Identity>, profile: &ConnectionProfile) -> bool {
    let Some(list) = profile.access().filter(|a| !a.is_empty()) else {
        return true;
    };

    match identity {
        Some(user) if !user.as_str().is_empty() => {
            list.split(',').any(|entry| entry == user.as_str())
        }
        _ => false,
    }
}
