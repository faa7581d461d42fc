use super::*;
use crate::state::test_helpers::text_element;
use tokio::time::{Duration, timeout};

async fn recv_message(rx: &mut mpsc::Receiver<Outbound>) -> ServerMessage {
    let msg = timeout(Duration::from_millis(200), rx.recv())
        .await
        .expect("message receive timed out")
        .expect("channel closed");
    (*msg).clone()
}

async fn recv_blocks(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Element> {
    let ServerMessage::UpdateBlocks { blocks } = recv_message(rx).await;
    blocks
}

async fn assert_channel_empty(rx: &mut mpsc::Receiver<Outbound>) {
    assert!(
        timeout(Duration::from_millis(50), rx.recv()).await.is_err(),
        "expected channel to remain empty"
    );
}

async fn attach_client(hub: &SessionHub) -> (Uuid, mpsc::Receiver<Outbound>) {
    let (conn, mut rx) = ConnectionHandle::channel(16);
    let id = conn.id();
    hub.attach(conn).await;
    // Drain the attach snapshot.
    recv_message(&mut rx).await;
    (id, rx)
}

// =============================================================================
// attach / detach
// =============================================================================

#[tokio::test]
async fn attach_sends_empty_snapshot_for_new_hub() {
    let hub = SessionHub::new(7);
    let (conn, mut rx) = ConnectionHandle::channel(8);
    hub.attach(conn).await;

    assert!(recv_blocks(&mut rx).await.is_empty());
    assert_eq!(hub.connection_count().await, 1);
}

#[tokio::test]
async fn attach_snapshot_contains_exactly_current_elements() {
    let hub = SessionHub::with_state(
        1,
        SessionState::from_elements(vec![text_element(1, "a"), text_element(2, "b")]),
    );
    hub.apply_delete(1).await;
    hub.apply_upsert(text_element(3, "c")).await;

    let (conn, mut rx) = ConnectionHandle::channel(8);
    hub.attach(conn).await;

    let blocks = recv_blocks(&mut rx).await;
    assert_eq!(blocks, hub.elements().await);
    let ids: Vec<i64> = blocks.iter().map(|el| el.id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[tokio::test]
async fn attach_only_sends_snapshot_to_new_connection() {
    let hub = SessionHub::new(1);
    let (_, mut rx_a) = attach_client(&hub).await;
    let (_b, _rx_b) = attach_client(&hub).await;

    assert_channel_empty(&mut rx_a).await;
}

#[tokio::test]
async fn attach_with_closed_receiver_is_not_registered() {
    let hub = SessionHub::new(1);
    let (conn, rx) = ConnectionHandle::channel(8);
    drop(rx);
    hub.attach(conn).await;
    assert_eq!(hub.connection_count().await, 0);
}

#[tokio::test]
async fn detach_is_idempotent() {
    let hub = SessionHub::new(1);
    let (id, _rx) = attach_client(&hub).await;

    assert!(hub.detach(id).await);
    assert!(!hub.detach(id).await);
    assert_eq!(hub.connection_count().await, 0);
}

#[tokio::test]
async fn detached_connection_stops_receiving() {
    let hub = SessionHub::new(1);
    let (id, mut rx) = attach_client(&hub).await;
    hub.detach(id).await;

    hub.apply_upsert(text_element(1, "x")).await;
    // Hub dropped the only sender, so the queue reports end-of-stream.
    let next = timeout(Duration::from_millis(200), rx.recv()).await.expect("recv timed out");
    assert!(next.is_none());
}

// =============================================================================
// mutations + broadcast
// =============================================================================

#[tokio::test]
async fn upsert_broadcasts_to_all_including_sender() {
    let hub = SessionHub::new(1);
    let (_, mut rx_a) = attach_client(&hub).await;
    let (_, mut rx_b) = attach_client(&hub).await;

    hub.apply_upsert(text_element(1, "hi")).await;

    let expected = vec![text_element(1, "hi")];
    assert_eq!(recv_blocks(&mut rx_a).await, expected);
    assert_eq!(recv_blocks(&mut rx_b).await, expected);
}

#[tokio::test]
async fn upsert_same_value_twice_broadcasts_twice_identically() {
    let hub = SessionHub::new(1);
    let (_, mut rx) = attach_client(&hub).await;

    hub.apply_upsert(text_element(4, "same")).await;
    hub.apply_upsert(text_element(4, "same")).await;

    let first = recv_blocks(&mut rx).await;
    let second = recv_blocks(&mut rx).await;
    assert_eq!(first, second);
    assert_eq!(hub.elements().await.len(), 1);
}

#[tokio::test]
async fn delete_unknown_id_still_broadcasts_unchanged_state() {
    let hub = SessionHub::new(1);
    hub.apply_upsert(text_element(1, "keep")).await;
    let (_, mut rx) = attach_client(&hub).await;

    hub.apply_delete(42).await;

    assert_eq!(recv_blocks(&mut rx).await, vec![text_element(1, "keep")]);
    assert_eq!(hub.elements().await, vec![text_element(1, "keep")]);
}

#[tokio::test]
async fn every_connection_converges_to_hub_state() {
    let hub = SessionHub::new(1);
    let (_, mut rx_a) = attach_client(&hub).await;
    let (_, mut rx_b) = attach_client(&hub).await;

    hub.apply_upsert(text_element(1, "a")).await;
    hub.apply_upsert(text_element(2, "b")).await;
    hub.apply_upsert(text_element(1, "a2")).await;
    hub.apply_delete(2).await;

    let mut last_a = Vec::new();
    let mut last_b = Vec::new();
    for _ in 0..4 {
        last_a = recv_blocks(&mut rx_a).await;
        last_b = recv_blocks(&mut rx_b).await;
    }
    let current = hub.elements().await;
    assert_eq!(last_a, current);
    assert_eq!(last_b, current);
    assert_eq!(current, vec![text_element(1, "a2")]);
}

#[tokio::test]
async fn snapshots_arrive_in_mutation_order() {
    let hub = SessionHub::new(1);
    let (_, mut rx) = attach_client(&hub).await;

    for n in 1..=5 {
        hub.apply_upsert(text_element(1, &n.to_string())).await;
    }
    for n in 1..=5 {
        let blocks = recv_blocks(&mut rx).await;
        assert_eq!(blocks[0].content, n.to_string());
    }
}

#[tokio::test]
async fn replace_all_broadcasts_new_state() {
    let hub = SessionHub::new(1);
    hub.apply_upsert(text_element(1, "old")).await;
    let (_, mut rx) = attach_client(&hub).await;

    hub.replace_all(vec![text_element(5, "loaded")]).await;

    assert_eq!(recv_blocks(&mut rx).await, vec![text_element(5, "loaded")]);
}

// =============================================================================
// failure isolation
// =============================================================================

#[tokio::test]
async fn closed_connection_is_detached_and_others_still_receive() {
    let hub = SessionHub::new(1);
    let (_, mut rx_a) = attach_client(&hub).await;
    let (_, rx_b) = attach_client(&hub).await;
    let (_, mut rx_c) = attach_client(&hub).await;
    drop(rx_b);

    hub.apply_upsert(text_element(1, "x")).await;

    assert_eq!(recv_blocks(&mut rx_a).await, vec![text_element(1, "x")]);
    assert_eq!(recv_blocks(&mut rx_c).await, vec![text_element(1, "x")]);
    assert_eq!(hub.connection_count().await, 2);
}

#[tokio::test]
async fn full_queue_is_treated_as_disconnect() {
    let hub = SessionHub::new(1);
    let (_, mut rx_fast) = attach_client(&hub).await;

    // Capacity 1: the attach snapshot fills it and the client never drains.
    let (slow, _rx_slow) = ConnectionHandle::channel(1);
    let slow_id = slow.id();
    hub.attach(slow).await;
    assert_eq!(hub.connection_count().await, 2);

    hub.apply_upsert(text_element(1, "x")).await;

    assert_eq!(recv_blocks(&mut rx_fast).await, vec![text_element(1, "x")]);
    assert_eq!(hub.connection_count().await, 1);
    assert!(!hub.detach(slow_id).await);
}

#[tokio::test]
async fn explicit_broadcast_reaches_every_connection() {
    let hub = SessionHub::new(1);
    let (_, mut rx_a) = attach_client(&hub).await;
    let (_, mut rx_b) = attach_client(&hub).await;

    hub.broadcast(ServerMessage::snapshot(vec![text_element(8, "direct")])).await;

    assert_eq!(recv_blocks(&mut rx_a).await[0].id, 8);
    assert_eq!(recv_blocks(&mut rx_b).await[0].id, 8);
}

#[tokio::test]
async fn concurrent_upserts_all_land() {
    let hub = Arc::new(SessionHub::new(1));
    let mut tasks = Vec::new();
    for id in 0..32 {
        let hub = Arc::clone(&hub);
        tasks.push(tokio::spawn(async move { hub.apply_upsert(text_element(id, "c")).await }));
    }
    for task in tasks {
        task.await.expect("upsert task panicked");
    }
    assert_eq!(hub.elements().await.len(), 32);
}
