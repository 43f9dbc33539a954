use std::sync::Arc;

use crate::error::PlannerError;
use crate::models::PermissionState;
use crate::notify::NotificationCapability;

/// Consent state for local notifications.
///
/// Starts from whatever the host reports and only changes through
/// [`PermissionGate::request_permission`].
pub struct PermissionGate {
    capability: Arc<dyn NotificationCapability>,
    state: PermissionState,
}

impl PermissionGate {
    pub fn new(capability: Arc<dyn NotificationCapability>) -> Self {
        let state = if capability.is_supported() {
            capability.permission()
        } else {
            PermissionState::Unknown
        };
        Self { capability, state }
    }

    pub fn state(&self) -> PermissionState {
        self.state
    }

    pub fn request_permission(&mut self) -> Result<PermissionState, PlannerError> {
        if !self.capability.is_supported() {
            log::warn!("permission: notifications unsupported, state stays {:?}", self.state);
            return Err(PlannerError::UnsupportedCapability);
        }
        if self.state == PermissionState::Granted {
            return Ok(PermissionState::Granted);
        }
        // A previous denial is not sticky here; the host decides whether to re-prompt.
        let answer = self.capability.request_permission();
        log::info!("permission: prompt answered from={:?} to={answer:?}", self.state);
        self.state = answer;
        Ok(answer)
    }
}
