use super::*;
use std::time::Duration;

#[test]
fn test_signal_display() {
    assert_eq!(DaemonSignal::Shutdown.to_string(), "SHUTDOWN");
    assert_eq!(DaemonSignal::Reload.to_string(), "RELOAD");
}

#[test]
fn test_signal_handler_new() {
    let handler = SignalHandler::new();
    assert!(!handler.is_shutdown_requested());
    assert!(!handler.is_reload_requested());
}

#[test]
fn test_request_shutdown() {
    let handler = SignalHandler::new();
    handler.request_shutdown();
    assert!(handler.is_shutdown_requested());
    assert!(!handler.is_reload_requested());
}

#[test]
fn test_take_reload() {
    let handler = SignalHandler::new();
    assert!(!handler.take_reload());

    handler.request_reload();
    assert!(handler.is_reload_requested());
    assert!(handler.take_reload());
    assert!(!handler.is_reload_requested());
}

#[tokio::test]
async fn test_multiple_subscribers() {
    let handler = SignalHandler::new();
    let mut rx1 = handler.subscribe();
    let mut rx2 = handler.subscribe();

    handler.send(DaemonSignal::Reload);

    assert_eq!(rx1.recv().await.unwrap(), DaemonSignal::Reload);
    assert_eq!(rx2.recv().await.unwrap(), DaemonSignal::Reload);
}

#[tokio::test]
async fn test_wait_for_shutdown_already_requested() {
    let handler = SignalHandler::new();
    handler.request_shutdown();

    tokio::time::timeout(Duration::from_secs(1), handler.wait_for_shutdown())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_wait_for_shutdown_ignores_reload() {
    let handler = SignalHandler::new();
    let waiter = handler.clone();
    let task = tokio::spawn(async move { waiter.wait_for_shutdown().await });

    tokio::task::yield_now().await;
    handler.request_reload();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!task.is_finished());

    handler.request_shutdown();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
}

#[test]
fn test_handler_clone_shares_state() {
    let handler = SignalHandler::new();
    let cloned = handler.clone();

    handler.request_shutdown();
    assert!(cloned.is_shutdown_requested());
}
