use std::time::Duration;

use candela_core::stream::StreamHandle;
use tokio::sync::oneshot;

#[tokio::test(flavor = "multi_thread")]
async fn stop_waits_for_graceful_exit() {
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (done_tx, done_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let _ = stop_rx.await;
        let _ = done_tx.send(());
    });

    let handle = StreamHandle::new(task, stop_tx);
    handle.stop().await;

    tokio::time::timeout(Duration::from_millis(100), done_rx)
        .await
        .expect("task did not complete after stop()")
        .expect("task exited without signalling");
}

#[tokio::test]
async fn stop_after_the_task_exited_returns() {
    let (stop_tx, _stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async {});
    let handle = StreamHandle::new(task, stop_tx);

    tokio::time::timeout(Duration::from_millis(100), async {
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("task never finished");

    tokio::time::timeout(Duration::from_millis(100), handle.stop())
        .await
        .expect("stop() hung on a finished task");
}

#[tokio::test]
async fn drop_sends_stop_to_a_cooperative_task() {
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (done_tx, done_rx) = oneshot::channel::<&'static str>();

    let task = tokio::spawn(async move {
        let why = if stop_rx.await.is_ok() { "stopped" } else { "dropped" };
        let _ = done_tx.send(why);
    });

    drop(StreamHandle::new(task, stop_tx));

    let why = tokio::time::timeout(Duration::from_millis(100), done_rx)
        .await
        .expect("task never observed the stop signal");
    // The task may be aborted before it reports; either way it must not run on.
    if let Ok(why) = why {
        assert_eq!(why, "stopped");
    }
}

#[tokio::test(start_paused = true)]
async fn abort_cancels_a_task_that_ignores_stop() {
    let (stop_tx, _stop_rx) = oneshot::channel::<()>();
    let (alive_tx, mut alive_rx) = tokio::sync::mpsc::channel::<()>(1);

    let task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if alive_tx.send(()).await.is_err() {
                break;
            }
        }
    });

    let handle = StreamHandle::new(task, stop_tx);
    assert!(!handle.is_finished());
    handle.abort();

    // An aborted task drops its sender, which closes the channel.
    let next = tokio::time::timeout(Duration::from_secs(5), alive_rx.recv())
        .await
        .expect("channel stayed open after abort");
    assert!(next.is_none() || alive_rx.recv().await.is_none());
}
