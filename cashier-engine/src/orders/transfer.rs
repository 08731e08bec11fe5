//! Transfer Coordinator
//!
//! Moving an order between tables is a two-step flow: the cashier picks the
//! source order (intent recorded in the session store, so it survives
//! navigating to the floor plan) and then the destination table.

use super::registry::OrderRegistry;
use super::sync::reload_from_remote;
use crate::audit_log;
use crate::error::{EngineError, EngineResult, ValidationError};
use crate::kv::{KeyValueStoreExt, SharedKv};
use crate::remote::OrderApi;
use serde::{Deserialize, Serialize};
use shared::order::wire::TransferRequest;
use shared::order::{OrderContext, RemoteLineId};

const TRANSFER_KEY: &str = "transfer:pending";

/// Recorded transfer intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferIntent {
    pub source_table_id: String,
    pub remote_line_ids: Vec<RemoteLineId>,
    /// Unix millis
    pub started_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub source_table_id: String,
    pub destination_table_id: String,
    pub moved_lines: usize,
    /// Whether the destination order was refreshed from the remote order
    pub destination_reloaded: bool,
}

pub struct TransferCoordinator {
    kv: SharedKv,
}

impl TransferCoordinator {
    pub fn new(kv: SharedKv) -> Self {
        Self { kv }
    }

    /// Record which table's lines are about to move
    pub fn begin_transfer(
        &self,
        source_table_id: impl Into<String>,
        remote_line_ids: Vec<RemoteLineId>,
    ) -> EngineResult<TransferIntent> {
        let source_table_id = source_table_id.into();
        if source_table_id.trim().is_empty() {
            return Err(ValidationError::MissingTable.into());
        }
        if remote_line_ids.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }

        let intent = TransferIntent {
            source_table_id,
            remote_line_ids,
            started_at: chrono::Utc::now().timestamp_millis(),
        };
        self.kv.set_json(TRANSFER_KEY, &intent);
        tracing::info!(source_table_id = %intent.source_table_id, lines = intent.remote_line_ids.len(), "Transfer started");
        Ok(intent)
    }

    pub fn pending_transfer(&self) -> Option<TransferIntent> {
        self.kv.get_json(TRANSFER_KEY)
    }

    pub fn cancel_transfer(&self) -> Option<TransferIntent> {
        let intent = self.pending_transfer();
        self.kv.remove(TRANSFER_KEY);
        intent
    }

    /// Move the recorded lines to `destination_table_id`
    ///
    /// Rejected without a remote call when nothing is pending, the
    /// destination is the source, or the destination holds lines that were
    /// never sent and a reload would drop (the intent is kept). After the call the
    /// intent is cleared either way; on success the source order is dropped
    /// locally and the destination is reloaded from the remote order.
    pub async fn complete_transfer(
        &self,
        destination_table_id: &str,
        api: &dyn OrderApi,
        registry: &OrderRegistry,
    ) -> EngineResult<TransferOutcome> {
        let intent = self
            .pending_transfer()
            .ok_or(EngineError::NoPendingTransfer)?;
        if destination_table_id.trim().is_empty() {
            return Err(ValidationError::MissingTable.into());
        }
        if destination_table_id == intent.source_table_id {
            return Err(ValidationError::SameTable.into());
        }
        let destination = registry.open(&OrderContext::dine_in(destination_table_id));
        let has_unsent = destination
            .lock()
            .lines()
            .iter()
            .any(|l| !l.has_remote_ids());
        if has_unsent {
            return Err(
                ValidationError::DestinationHasUnsentLines(destination_table_id.to_string()).into(),
            );
        }

        let request = TransferRequest {
            source_table_id: intent.source_table_id.clone(),
            destination_table_id: destination_table_id.to_string(),
            remote_line_ids: intent.remote_line_ids.clone(),
        };
        let result = api.transfer(request).await;
        self.kv.remove(TRANSFER_KEY);

        if let Err(e) = result {
            tracing::warn!(
                source_table_id = %intent.source_table_id,
                destination_table_id,
                error = %e,
                "Transfer rejected"
            );
            return Err(e.into());
        }

        registry.remove(&OrderContext::dine_in(&intent.source_table_id));
        let destination_reloaded = match reload_from_remote(&destination, api).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(destination_table_id, error = %e, "Destination reload failed after transfer");
                false
            }
        };

        let resource = format!("table:{}", intent.source_table_id);
        let details = format!("to table {}", destination_table_id);
        audit_log!("cashier", "transfer_order", resource, details);

        Ok(TransferOutcome {
            source_table_id: intent.source_table_id,
            destination_table_id: destination_table_id.to_string(),
            moved_lines: intent.remote_line_ids.len(),
            destination_reloaded,
        })
    }
}
