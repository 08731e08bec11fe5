//! Preparation Status Machine
//!
//! Forward-only kitchen status transitions, mirrored to the remote kitchen
//! endpoint. Local status changes only after the remote call succeeds.

use super::store::{OrderHandle, OrderLineStore};
use crate::error::{EngineError, EngineResult, ValidationError};
use crate::remote::OrderApi;
use shared::order::wire::StatusUpdateRequest;
use shared::order::{LocalId, PreparationStatus, RemoteLineId};
use std::collections::BTreeSet;

/// Result of a single-line advance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Advanced {
        local_id: LocalId,
        status: PreparationStatus,
    },
    /// Nothing was sent or changed
    Skipped { notice: String },
}

/// Result of a bulk transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
    pub status: PreparationStatus,
    pub updated: Vec<LocalId>,
    /// How many remote ids were sent to the kitchen
    pub synced: usize,
}

/// Next status and its request, or why nothing is sent
type PreparedAdvance = Result<(PreparationStatus, StatusUpdateRequest), AdvanceOutcome>;

/// Move one line to its next status
pub async fn advance_one(
    handle: &OrderHandle,
    api: &dyn OrderApi,
    local_id: LocalId,
) -> EngineResult<AdvanceOutcome> {
    let (_busy, prepared) = handle.try_lock_lines_with(|store| {
        let line = store
            .line(local_id)
            .ok_or(EngineError::LineNotFound(local_id))?;

        let skip = |notice: String| -> EngineResult<(Vec<LocalId>, PreparedAdvance)> {
            Ok((Vec::new(), Err(AdvanceOutcome::Skipped { notice })))
        };
        let Some(next) = line.preparation_status.next() else {
            let notice = if line.preparation_status == PreparationStatus::NotTracked {
                "This item is not tracked by the kitchen"
            } else {
                "This item has already been served"
            };
            return skip(notice.to_string());
        };
        let descriptor = next.descriptor();
        let Some(value) = descriptor.remote_value.filter(|_| descriptor.remote_syncable) else {
            return skip(format!("{} is not sent to the kitchen", descriptor.label));
        };
        if !line.has_remote_ids() {
            return skip("Send the item to the kitchen first".to_string());
        }

        let request = StatusUpdateRequest {
            table_id: store.context().table_id().map(str::to_string),
            remote_line_ids: line.remote_line_ids.clone(),
            status: value.to_string(),
        };
        Ok((vec![local_id], Ok((next, request))))
    })?;
    let (next, request) = match prepared {
        Ok(prepared) => prepared,
        Err(skipped) => return Ok(skipped),
    };

    if let Err(e) = api.update_status(request).await {
        tracing::warn!(local_id = %local_id, target_status = ?next, error = %e, "Kitchen status update rejected");
        return Err(e.into());
    }

    handle.lock().set_status(&[local_id], next);
    tracing::info!(local_id = %local_id, status = ?next, "Line advanced");
    Ok(AdvanceOutcome::Advanced {
        local_id,
        status: next,
    })
}

/// Move every selected line to `target`, all-or-nothing
///
/// Every line must be strictly below the target. Lines that already have
/// remote ids are sent in one batch call when the target is kitchen-visible;
/// the local status of the whole selection changes only after that call
/// succeeds (or when there was nothing to send).
pub async fn advance_bulk(
    handle: &OrderHandle,
    api: &dyn OrderApi,
    selected: &[LocalId],
    target: Option<PreparationStatus>,
) -> EngineResult<BulkOutcome> {
    let ids = dedup(selected);
    if ids.is_empty() {
        return Err(ValidationError::EmptySelection.into());
    }
    let target = target.ok_or(ValidationError::MissingTarget)?;

    let (_busy, (remote_ids, table_id)) = handle.try_lock_lines_with(|store| {
        let mut remote_ids: Vec<RemoteLineId> = Vec::new();
        for id in &ids {
            let line = store.line(*id).ok_or(EngineError::LineNotFound(*id))?;
            if line.preparation_status == PreparationStatus::NotTracked {
                return Err(ValidationError::NotTracked(*id).into());
            }
            if !line.preparation_status.can_advance_to(target) {
                return Err(ValidationError::BackwardTransition {
                    local_id: *id,
                    from: line.preparation_status,
                    to: target,
                }
                .into());
            }
            remote_ids.extend(line.remote_line_ids.iter().cloned());
        }
        let table_id = store.context().table_id().map(str::to_string);
        Ok((ids.clone(), (remote_ids, table_id)))
    })?;

    let descriptor = target.descriptor();
    let mut synced = 0;
    if let Some(value) = descriptor.remote_value.filter(|_| descriptor.remote_syncable)
        && !remote_ids.is_empty()
    {
        synced = remote_ids.len();
        let request = StatusUpdateRequest {
            table_id,
            remote_line_ids: remote_ids,
            status: value.to_string(),
        };
        if let Err(e) = api.update_status(request).await {
            tracing::warn!(lines = ids.len(), target_status = ?target, error = %e, "Bulk status update rejected");
            return Err(e.into());
        }
    }

    handle.lock().set_status(&ids, target);
    tracing::info!(lines = ids.len(), synced, status = ?target, "Bulk status applied");
    Ok(BulkOutcome {
        status: target,
        updated: ids,
        synced,
    })
}

/// Kitchen-visible statuses the whole selection can move to
///
/// A target qualifies only if it is strictly ahead of the most advanced
/// selected line. Untracked or unknown lines yield no targets.
pub fn eligible_targets(store: &OrderLineStore, selected: &[LocalId]) -> Vec<PreparationStatus> {
    let ids = dedup(selected);
    if ids.is_empty() {
        return Vec::new();
    }

    let mut highest = 0u8;
    for id in &ids {
        let Some(rank) = store.line(*id).and_then(|l| l.preparation_status.rank()) else {
            return Vec::new();
        };
        highest = highest.max(rank);
    }

    PreparationStatus::TRACKED
        .into_iter()
        .filter(|s| s.descriptor().remote_syncable)
        .filter(|s| s.rank().is_some_and(|r| r > highest))
        .collect()
}

pub async fn mark_preparing(
    handle: &OrderHandle,
    api: &dyn OrderApi,
    selected: &[LocalId],
) -> EngineResult<BulkOutcome> {
    advance_bulk(handle, api, selected, Some(PreparationStatus::Preparing)).await
}

pub async fn mark_done(
    handle: &OrderHandle,
    api: &dyn OrderApi,
    selected: &[LocalId],
) -> EngineResult<BulkOutcome> {
    advance_bulk(handle, api, selected, Some(PreparationStatus::Done)).await
}

/// Selection order is irrelevant and duplicates collapse
fn dedup(selected: &[LocalId]) -> Vec<LocalId> {
    selected
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use crate::orders::store::OrderLineStore;
    use crate::testing::{ApiOp, MockOrderApi};
    use rust_decimal::Decimal;
    use shared::order::{LineCandidate, OrderContext};

    fn handle_with_lines(n: usize, sent: bool) -> (OrderHandle, Vec<LocalId>) {
        let mut store = OrderLineStore::new(OrderContext::dine_in("T2"), MemoryStore::shared());
        let mut ids = Vec::new();
        for i in 0..n {
            let line = store
                .add_line(
                    LineCandidate::new(format!("p-{i}"), format!("Dish {i}"), Decimal::from(10)),
                    Decimal::ONE,
                )
                .unwrap();
            if sent {
                store.assign_remote_ids(vec![(line.local_id, vec![format!("r-{i}")])]);
            }
            ids.push(line.local_id);
        }
        (OrderHandle::new(store), ids)
    }

    fn status_of(handle: &OrderHandle, id: LocalId) -> PreparationStatus {
        handle.lock().line(id).unwrap().preparation_status
    }

    #[tokio::test]
    async fn test_advance_one_after_success() {
        let (handle, ids) = handle_with_lines(1, true);
        let api = MockOrderApi::new();

        let outcome = advance_one(&handle, &api, ids[0]).await.unwrap();
        assert_eq!(
            outcome,
            AdvanceOutcome::Advanced {
                local_id: ids[0],
                status: PreparationStatus::Preparing
            }
        );
        let sent = api.status_updates();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].status, "preparing");
        assert_eq!(sent[0].table_id.as_deref(), Some("T2"));
        assert!(!handle.lock().is_busy(ids[0]));
    }

    #[tokio::test]
    async fn test_advance_one_failure_keeps_status() {
        let (handle, ids) = handle_with_lines(1, true);
        let api = MockOrderApi::new();
        api.fail(ApiOp::UpdateStatus);

        let err = advance_one(&handle, &api, ids[0]).await.unwrap_err();
        assert!(matches!(err, EngineError::Remote(_)));
        assert_eq!(status_of(&handle, ids[0]), PreparationStatus::Pending);
        assert!(!handle.lock().is_busy(ids[0]));
    }

    #[tokio::test]
    async fn test_advance_one_unsent_line_is_noop() {
        let (handle, ids) = handle_with_lines(1, false);
        let api = MockOrderApi::new();

        let outcome = advance_one(&handle, &api, ids[0]).await.unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Skipped { .. }));
        assert!(api.calls().is_empty());
        assert_eq!(status_of(&handle, ids[0]), PreparationStatus::Pending);
    }

    #[tokio::test]
    async fn test_advance_one_served_line_is_noop() {
        let (handle, ids) = handle_with_lines(1, true);
        handle.lock().set_status(&ids, PreparationStatus::Done);
        let api = MockOrderApi::new();

        let outcome = advance_one(&handle, &api, ids[0]).await.unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Skipped { .. }));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_requires_selection_and_target() {
        let (handle, ids) = handle_with_lines(1, true);
        let api = MockOrderApi::new();

        let err = advance_bulk(&handle, &api, &[], Some(PreparationStatus::Ready))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Validation(ValidationError::EmptySelection));

        let err = advance_bulk(&handle, &api, &ids, None).await.unwrap_err();
        assert_eq!(err, EngineError::Validation(ValidationError::MissingTarget));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_rejects_backward_and_same_rank() {
        let (handle, ids) = handle_with_lines(2, true);
        handle.lock().set_status(&ids[1..], PreparationStatus::Ready);
        let api = MockOrderApi::new();

        for target in [PreparationStatus::Preparing, PreparationStatus::Ready] {
            let err = advance_bulk(&handle, &api, &ids, Some(target))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                EngineError::Validation(ValidationError::BackwardTransition { .. })
            ));
        }
        assert!(api.calls().is_empty());
        assert_eq!(status_of(&handle, ids[0]), PreparationStatus::Pending);
    }

    #[tokio::test]
    async fn test_bulk_single_batch_call() {
        let (handle, mut ids) = handle_with_lines(2, true);
        // an unsent line moves locally but is not part of the batch
        let unsent = handle
            .lock()
            .add_line(
                LineCandidate::new("p-new", "Fresh", Decimal::from(4)),
                Decimal::ONE,
            )
            .unwrap();
        ids.push(unsent.local_id);
        let api = MockOrderApi::new();

        let outcome = mark_done(&handle, &api, &ids).await.unwrap();
        assert_eq!(outcome.synced, 2);
        assert_eq!(outcome.updated.len(), 3);

        let sent = api.status_updates();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].remote_line_ids, vec!["r-0", "r-1"]);
        assert_eq!(sent[0].status, "done");
        for id in ids {
            assert_eq!(status_of(&handle, id), PreparationStatus::Done);
        }
    }

    #[tokio::test]
    async fn test_lines_stay_reserved_from_check_to_apply() {
        let (handle, ids) = handle_with_lines(1, true);
        let api = MockOrderApi::shared();
        api.hold(ApiOp::UpdateStatus);

        let in_flight = {
            let handle = handle.clone();
            let api = api.clone();
            let ids = ids.clone();
            tokio::spawn(async move { mark_done(&handle, &*api, &ids).await })
        };
        for _ in 0..100 {
            if api.call_count(ApiOp::UpdateStatus) > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(api.call_count(ApiOp::UpdateStatus), 1);

        // an overlapping update cannot slip in behind the pending one
        let err = advance_bulk(&handle, &*api, &ids, Some(PreparationStatus::Ready))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::LineBusy(ids[0]));
        assert_eq!(api.call_count(ApiOp::UpdateStatus), 1);

        api.release(ApiOp::UpdateStatus);
        in_flight.await.unwrap().unwrap();
        assert_eq!(status_of(&handle, ids[0]), PreparationStatus::Done);

        let err = advance_bulk(&handle, &*api, &ids, Some(PreparationStatus::Ready))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::BackwardTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_bulk_remote_failure_leaves_selection_unchanged() {
        let (handle, ids) = handle_with_lines(2, true);
        let api = MockOrderApi::new();
        api.fail(ApiOp::UpdateStatus);

        let err = mark_preparing(&handle, &api, &ids).await.unwrap_err();
        assert!(matches!(err, EngineError::Remote(_)));
        for id in &ids {
            assert_eq!(status_of(&handle, *id), PreparationStatus::Pending);
        }
        assert!(!handle.lock().has_busy_lines());
    }

    #[tokio::test]
    async fn test_bulk_rejects_untracked_lines() {
        let mut store = OrderLineStore::new(OrderContext::delivery("C1"), MemoryStore::shared());
        let line = store
            .add_line(LineCandidate::new("p", "Pizza", Decimal::TEN), Decimal::ONE)
            .unwrap();
        let handle = OrderHandle::new(store);
        let api = MockOrderApi::new();

        let err = mark_done(&handle, &api, &[line.local_id]).await.unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation(ValidationError::NotTracked(line.local_id))
        );
    }

    #[test]
    fn test_eligible_targets_follow_most_advanced_line() {
        let (handle, ids) = handle_with_lines(2, true);
        {
            let store = handle.lock();
            assert_eq!(
                eligible_targets(&store, &ids),
                vec![
                    PreparationStatus::Preparing,
                    PreparationStatus::Ready,
                    PreparationStatus::Done
                ]
            );
        }

        handle.lock().set_status(&ids[..1], PreparationStatus::Ready);
        let store = handle.lock();
        assert_eq!(
            eligible_targets(&store, &ids),
            vec![PreparationStatus::Done]
        );
        assert!(eligible_targets(&store, &[]).is_empty());
        assert!(eligible_targets(&store, &[LocalId(99)]).is_empty());
    }
}
