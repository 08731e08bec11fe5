//! Line sync with the remote order

use super::store::OrderHandle;
use crate::error::{EngineError, EngineResult, RemoteError};
use crate::remote::OrderApi;
use shared::ErrorCode;
use shared::order::LocalId;
use shared::order::wire::{CreateLinesRequest, FlattenedProduct};

/// Send every line that has no remote id yet
///
/// Returns how many lines were sent. On failure nothing changes locally.
pub async fn send_new_lines(handle: &OrderHandle, api: &dyn OrderApi) -> EngineResult<usize> {
    let (busy, request) = handle.try_lock_lines_with(|store| {
        let pending: Vec<_> = store
            .lines()
            .iter()
            .filter(|l| !l.has_remote_ids() && !store.is_busy(l.local_id))
            .collect();
        let ids: Vec<LocalId> = pending.iter().map(|l| l.local_id).collect();
        let request = CreateLinesRequest {
            context: store.context().clone(),
            products: pending.iter().map(|l| FlattenedProduct::from(*l)).collect(),
        };
        Ok((ids, request))
    })?;
    let ids = busy.ids().to_vec();
    if ids.is_empty() {
        return Ok(0);
    }
    let context = request.context.clone();
    let response = api.create_lines(request).await.map_err(|e| {
        tracing::warn!(context = %context, lines = ids.len(), error = %e, "Sending lines failed");
        EngineError::from(e)
    })?;

    if response.remote_line_ids.len() != ids.len() {
        return Err(RemoteError::rejected(
            ErrorCode::InternalError,
            Some(format!(
                "Expected ids for {} lines, received {}",
                ids.len(),
                response.remote_line_ids.len()
            )),
        )
        .into());
    }

    let count = ids.len();
    handle
        .lock()
        .assign_remote_ids(ids.into_iter().zip(response.remote_line_ids).collect());
    tracing::info!(context = %context, lines = count, "Lines sent");
    Ok(count)
}

/// Replace the local lines with the lines of the remote order
///
/// Refused while any line has an operation in flight.
pub async fn reload_from_remote(handle: &OrderHandle, api: &dyn OrderApi) -> EngineResult<usize> {
    let context = {
        let store = handle.lock();
        if let Some(busy) = store.lines().iter().find(|l| store.is_busy(l.local_id)) {
            return Err(EngineError::LineBusy(busy.local_id));
        }
        store.context().clone()
    };

    let remote = api.fetch_order(&context).await?;

    let mut store = handle.lock();
    if let Some(busy) = store.lines().iter().find(|l| store.is_busy(l.local_id)) {
        return Err(EngineError::LineBusy(busy.local_id));
    }
    store.replace_with_remote(remote);
    tracing::info!(context = %context, lines = store.len(), "Reloaded order from remote");
    Ok(store.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use crate::orders::store::OrderLineStore;
    use crate::testing::{ApiOp, MockOrderApi};
    use rust_decimal::Decimal;
    use shared::order::wire::RemoteOrderLine;
    use shared::order::{LineCandidate, OrderContext, PreparationStatus};

    fn handle() -> OrderHandle {
        OrderHandle::new(OrderLineStore::new(
            OrderContext::dine_in("T5"),
            MemoryStore::shared(),
        ))
    }

    #[tokio::test]
    async fn test_send_assigns_ids_in_order() {
        let handle = handle();
        {
            let mut store = handle.lock();
            store
                .add_line(LineCandidate::new("p-1", "Soup", Decimal::TEN), Decimal::ONE)
                .unwrap();
            store
                .add_line(LineCandidate::new("p-2", "Rice", Decimal::TEN), Decimal::TWO)
                .unwrap();
        }
        let api = MockOrderApi::new();

        assert_eq!(send_new_lines(&handle, &api).await.unwrap(), 2);
        let store = handle.lock();
        assert_eq!(store.lines()[0].remote_line_ids, vec!["rl-1"]);
        assert_eq!(store.lines()[1].remote_line_ids, vec!["rl-2"]);
        drop(store);

        // nothing left to send
        assert_eq!(send_new_lines(&handle, &api).await.unwrap(), 0);
        assert_eq!(api.call_count(ApiOp::CreateLines), 1);
    }

    #[tokio::test]
    async fn test_send_skips_reserved_lines() {
        let handle = handle();
        let (soup, rice) = {
            let mut store = handle.lock();
            let soup = store
                .add_line(LineCandidate::new("p-1", "Soup", Decimal::TEN), Decimal::ONE)
                .unwrap();
            let rice = store
                .add_line(LineCandidate::new("p-2", "Rice", Decimal::TEN), Decimal::ONE)
                .unwrap();
            (soup.local_id, rice.local_id)
        };
        let api = MockOrderApi::new();

        let guard = handle.try_lock_lines(&[soup]).unwrap();
        assert_eq!(send_new_lines(&handle, &api).await.unwrap(), 1);
        let store = handle.lock();
        assert!(!store.line(soup).unwrap().has_remote_ids());
        assert!(store.line(rice).unwrap().has_remote_ids());
        assert!(store.is_busy(soup));
        drop(store);
        drop(guard);
    }

    #[tokio::test]
    async fn test_send_failure_changes_nothing() {
        let handle = handle();
        handle
            .lock()
            .add_line(LineCandidate::new("p-1", "Soup", Decimal::TEN), Decimal::ONE)
            .unwrap();
        let api = MockOrderApi::new();
        api.fail(ApiOp::CreateLines);

        assert!(send_new_lines(&handle, &api).await.is_err());
        let store = handle.lock();
        assert!(!store.lines()[0].has_remote_ids());
        assert!(!store.has_busy_lines());
    }

    #[tokio::test]
    async fn test_reload_replaces_lines() {
        let handle = handle();
        handle
            .lock()
            .add_line(LineCandidate::new("p-old", "Old", Decimal::TEN), Decimal::ONE)
            .unwrap();
        let api = MockOrderApi::new();
        api.set_remote_order(
            &OrderContext::dine_in("T5"),
            vec![RemoteOrderLine {
                remote_line_ids: vec!["r-9".into()],
                product: LineCandidate::new("p-9", "Grill", Decimal::from(80)),
                quantity: Decimal::ONE,
                preparation_status: PreparationStatus::Ready,
            }],
        );

        assert_eq!(reload_from_remote(&handle, &api).await.unwrap(), 1);
        let store = handle.lock();
        assert_eq!(store.lines()[0].product_id, "p-9");
        assert_eq!(store.lines()[0].preparation_status, PreparationStatus::Ready);
    }
}
