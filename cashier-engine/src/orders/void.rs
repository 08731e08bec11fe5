//! Voiding sent lines under manager authorization

use super::store::OrderHandle;
use crate::audit_log;
use crate::error::{EngineError, EngineResult, ValidationError};
use crate::remote::OrderApi;
use shared::order::wire::VoidLinesRequest;
use shared::order::{LocalId, RemoteLineId};

/// Manager id and password forwarded to the void endpoint
#[derive(Clone)]
pub struct ManagerCredentials {
    pub manager_id: String,
    pub password: String,
}

impl ManagerCredentials {
    pub fn new(manager_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            manager_id: manager_id.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for ManagerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerCredentials")
            .field("manager_id", &self.manager_id)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoidOutcome {
    pub removed: Vec<LocalId>,
    pub voided_remote_ids: usize,
}

/// Void the selected lines
///
/// Sent lines are voided remotely and removed only after success; unsent
/// lines are simply removed.
pub async fn void_lines(
    handle: &OrderHandle,
    api: &dyn OrderApi,
    selected: &[LocalId],
    credentials: &ManagerCredentials,
) -> EngineResult<VoidOutcome> {
    if selected.is_empty() {
        return Err(ValidationError::EmptySelection.into());
    }
    if credentials.manager_id.trim().is_empty() || credentials.password.is_empty() {
        return Err(ValidationError::MissingManagerCredentials.into());
    }

    let mut ids = selected.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let (_busy, (remote_ids, context)) = handle.try_lock_lines_with(|store| {
        let remote_ids: Vec<RemoteLineId> = ids
            .iter()
            .filter_map(|id| store.line(*id))
            .flat_map(|l| l.remote_line_ids.iter().cloned())
            .collect();
        Ok((ids.clone(), (remote_ids, store.context().clone())))
    })?;

    if !remote_ids.is_empty() {
        let request = VoidLinesRequest {
            table_id: context.table_id().map(str::to_string),
            remote_line_ids: remote_ids.clone(),
            manager_id: credentials.manager_id.clone(),
            manager_password: credentials.password.clone(),
        };
        api.void_lines(request).await.map_err(|e| {
            tracing::warn!(context = %context, error = %e, "Void rejected");
            EngineError::from(e)
        })?;
    }

    handle.lock().remove_lines(&ids);
    let resource = format!("order:{}", context);
    let details = format!("{} lines, {} remote", ids.len(), remote_ids.len());
    audit_log!(credentials.manager_id, "void_lines", resource, details);
    Ok(VoidOutcome {
        removed: ids,
        voided_remote_ids: remote_ids.len(),
    })
}
