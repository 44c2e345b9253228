use chrono::{DateTime, Duration, TimeZone, Utc};
use monitor_core::{update, MonitorConfig, MonitorState, Msg, NotificationQueue, ToastSeverity};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 2, 8, 0, 0).unwrap()
}

#[test]
fn sixth_push_drops_the_oldest() {
    let mut queue = NotificationQueue::default();
    let ids: Vec<_> = (0..6)
        .map(|i| queue.push(format!("msg {i}"), ToastSeverity::Info, t0()))
        .collect();

    assert_eq!(queue.len(), 5);
    let held: Vec<_> = queue.iter().map(|toast| toast.id).collect();
    assert_eq!(held, ids[1..].to_vec());
    assert_eq!(queue.iter().next().map(|t| t.message.as_str()), Some("msg 1"));
}

#[test]
fn each_toast_expires_on_its_own_schedule() {
    let mut queue = NotificationQueue::new(5, Duration::milliseconds(5_000));
    queue.push("first", ToastSeverity::Info, t0());
    queue.push("second", ToastSeverity::Warning, t0() + Duration::seconds(2));

    assert_eq!(queue.expire(t0() + Duration::milliseconds(4_999)), 0);
    assert_eq!(queue.expire(t0() + Duration::seconds(5)), 1);
    let remaining: Vec<_> = queue.iter().map(|t| t.message.clone()).collect();
    assert_eq!(remaining, vec!["second".to_string()]);
    assert_eq!(queue.next_expiry(), Some(t0() + Duration::seconds(7)));
}

#[test]
fn dismiss_removes_immediately_and_is_idempotent() {
    let mut queue = NotificationQueue::default();
    let keep = queue.push("keep", ToastSeverity::Info, t0());
    let gone = queue.push("gone", ToastSeverity::Error, t0());

    assert!(queue.dismiss(gone));
    assert!(!queue.dismiss(gone));
    assert_eq!(queue.iter().map(|t| t.id).collect::<Vec<_>>(), vec![keep]);
}

#[test]
fn queue_never_exceeds_capacity_under_bursts() {
    let mut queue = NotificationQueue::default();
    for i in 0..50 {
        queue.push(format!("burst {i}"), ToastSeverity::Info, t0());
        assert!(queue.len() <= 5);
    }
    let messages: Vec<_> = queue.iter().map(|t| t.message.clone()).collect();
    assert_eq!(messages.first().map(String::as_str), Some("burst 45"));
    assert_eq!(messages.last().map(String::as_str), Some("burst 49"));
}

#[test]
fn tick_expires_toasts_held_by_the_monitor() {
    let state = MonitorState::new(MonitorConfig::default());
    let (state, effects) = update(state, Msg::Tick, t0());
    assert!(effects.is_empty());
    assert!(state.view().toasts.is_empty());
    let record = monitor_core::SessionRecord::new(
        monitor_core::AgentId::new("a"),
        "https://target.example",
        t0(),
    );
    let (state, _) = update(state, Msg::RunStarted(record), t0());
    assert_eq!(state.view().toasts.len(), 1);

    let toast_id = state.view().toasts[0].id;
    let (state, _) = update(state, Msg::Tick, t0() + Duration::seconds(4));
    assert_eq!(state.view().toasts.len(), 1);
    let (state, _) = update(state, Msg::Tick, t0() + Duration::seconds(5));
    assert!(state.view().toasts.is_empty());

    let (state, _) = update(state, Msg::ToastDismissed(toast_id), t0() + Duration::seconds(6));
    assert!(state.view().toasts.is_empty());
}
