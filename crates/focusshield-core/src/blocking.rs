//! App-shielding contract.
//!
//! The platform shielding API (Family Controls / managed settings on the
//! host OS) is an external collaborator with a narrow contract: turn
//! restrictions on for a mode, turn them off, and answer authorization
//! queries. The timer service treats every gateway failure as
//! best-effort -- a session never fails because shielding did.
//!
//! The policy question of *what* to shield for a given mode is answered
//! here, in [`BlockingDirective::for_mode`], so it stays unit-testable
//! without a platform behind it.

use serde::{Deserialize, Serialize};

use crate::error::BlockingError;

/// Policy governing which apps stay reachable during a focus session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockingMode {
    /// Shield everything except the host app.
    Strict,
    /// Shield everything except the user's allow-list.
    Whitelist,
    /// No shielding (honor system).
    Relaxed,
}

impl Default for BlockingMode {
    fn default() -> Self {
        BlockingMode::Strict
    }
}

impl BlockingMode {
    pub fn description(self) -> &'static str {
        match self {
            BlockingMode::Strict => "Block all apps during focus time",
            BlockingMode::Whitelist => "Only use selected apps during focus time",
            BlockingMode::Relaxed => "No app blocking (honor system)",
        }
    }
}

/// Opaque platform identifier for an allow-listed app.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub String);

impl From<&str> for AppId {
    fn from(s: &str) -> Self {
        AppId(s.to_string())
    }
}

/// Resolved shielding decision for one focus session.
///
/// Whitelist mode with an empty allow-list resolves to `NoShield` with a
/// warning rather than silently shielding everything: the user asked for
/// "only my selected apps" and selected none, which is a configuration
/// gap, not consent to a total lockout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockingDirective {
    ShieldAll,
    ShieldAllExcept(Vec<AppId>),
    NoShield { warning: Option<String> },
}

impl BlockingDirective {
    pub fn for_mode(mode: BlockingMode, allow_list: &[AppId]) -> Self {
        match mode {
            BlockingMode::Strict => BlockingDirective::ShieldAll,
            BlockingMode::Whitelist if allow_list.is_empty() => BlockingDirective::NoShield {
                warning: Some(
                    "whitelist mode has no allowed apps selected; session runs unshielded"
                        .to_string(),
                ),
            },
            BlockingMode::Whitelist => BlockingDirective::ShieldAllExcept(allow_list.to_vec()),
            BlockingMode::Relaxed => BlockingDirective::NoShield { warning: None },
        }
    }

    /// Whether this directive asks the gateway to engage restrictions.
    pub fn engages_shield(&self) -> bool {
        !matches!(self, BlockingDirective::NoShield { .. })
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            BlockingDirective::NoShield { warning } => warning.as_deref(),
            _ => None,
        }
    }
}

/// Operations the timer core needs from the platform shielding API.
///
/// `start_blocking` is only ever called with a directive that engages
/// the shield, and only after `has_permission`/`request_permission`
/// granted authorization. `stop_blocking` is idempotent.
pub trait BlockingGateway: Send + Sync {
    fn has_permission(&self) -> bool;

    /// Ask the platform for shielding authorization. `Ok(false)` means
    /// the user declined; the session proceeds unshielded.
    fn request_permission(&self) -> Result<bool, BlockingError>;

    fn start_blocking(&self, directive: &BlockingDirective) -> Result<(), BlockingError>;

    fn stop_blocking(&self) -> Result<(), BlockingError>;
}

/// Gateway stand-in for platforms without a shielding API (and for
/// tests): always authorized, shields nothing.
#[derive(Debug, Default)]
pub struct NullGateway;

impl BlockingGateway for NullGateway {
    fn has_permission(&self) -> bool {
        true
    }

    fn request_permission(&self) -> Result<bool, BlockingError> {
        Ok(true)
    }

    fn start_blocking(&self, _directive: &BlockingDirective) -> Result<(), BlockingError> {
        Ok(())
    }

    fn stop_blocking(&self) -> Result<(), BlockingError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_shields_everything() {
        let d = BlockingDirective::for_mode(BlockingMode::Strict, &[]);
        assert_eq!(d, BlockingDirective::ShieldAll);
        assert!(d.engages_shield());
        assert!(d.warning().is_none());
    }

    #[test]
    fn whitelist_shields_all_except_selection() {
        let allowed = vec![AppId::from("com.example.notes")];
        let d = BlockingDirective::for_mode(BlockingMode::Whitelist, &allowed);
        assert_eq!(d, BlockingDirective::ShieldAllExcept(allowed));
        assert!(d.engages_shield());
    }

    #[test]
    fn empty_whitelist_does_not_shield_and_warns() {
        let d = BlockingDirective::for_mode(BlockingMode::Whitelist, &[]);
        assert!(!d.engages_shield());
        assert!(d.warning().is_some());
    }

    #[test]
    fn relaxed_does_not_shield_and_stays_quiet() {
        let d = BlockingDirective::for_mode(BlockingMode::Relaxed, &[]);
        assert_eq!(d, BlockingDirective::NoShield { warning: None });
        assert!(d.warning().is_none());
    }

    #[test]
    fn default_mode_is_strict() {
        assert_eq!(BlockingMode::default(), BlockingMode::Strict);
    }
}
