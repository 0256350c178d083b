//! Async driver tests
//!
//! The scripted connector plays the server side: sockets open at once and
//! every command is acknowledged, so a driven player reaches steady loading
//! without any network.

mod common;

use common::*;
use fluplay::*;
use std::time::Duration;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

const WAIT: Duration = Duration::from_secs(5);

struct Driven {
    handle: PlayerHandle,
    task: tokio::task::JoinHandle<()>,
    events: EventStream,
    media: MemoryHandle,
    connector: RecordingConnector,
}

fn spawn_driver() -> Driven {
    let queue = DispatchQueue::new();
    let renderer = MemoryRenderer::new(queue.dispatcher()).auto_complete(true);
    let media = renderer.handle();
    let connector = RecordingConnector::scripted();
    let (player, events) = builder()
        .build(renderer, connector.clone(), queue.dispatcher())
        .unwrap();
    let (handle, task) = PlayerDriver::spawn(player, queue);
    Driven {
        handle,
        task,
        events,
        media,
        connector,
    }
}

async fn wait_for(
    handle: &mut PlayerHandle,
    check: impl Fn(&PlaybackStatus) -> bool,
) -> PlaybackStatus {
    timeout(WAIT, async {
        loop {
            let status = handle.changed().await.unwrap();
            if check(&status) {
                return status;
            }
        }
    })
    .await
    .expect("status never matched")
}

fn sent(connector: &RecordingConnector) -> Vec<String> {
    connector
        .log
        .lock()
        .sent
        .iter()
        .map(|(_, text)| text.clone())
        .collect()
}

#[tokio::test]
async fn test_driver_plays_until_stopped() {
    let mut driven = spawn_driver();
    assert!(driven.handle.status().paused);

    assert_ok!(driven.handle.play());
    let status = wait_for(&mut driven.handle, |status| {
        status.loading && status.waiting_data && status.connection == ConnectionState::Open
    })
    .await;
    assert!(!status.paused);
    assert!(driven.media.is_playing());

    let event = timeout(WAIT, driven.events.next()).await.unwrap();
    assert_eq!(event, Some(Event::Play));

    assert_ok!(driven.handle.stop());
    assert_ok!(timeout(WAIT, driven.task).await.unwrap());

    assert_eq!(sent(&driven.connector), vec!["resume", "pause"]);
    assert_eq!(driven.connector.log.lock().closed.len(), 1);
    assert!(driven.media.is_ended());
    assert!(driven.handle.status().stopped);
}

#[tokio::test]
async fn test_handle_fails_after_driver_exits() {
    let driven = spawn_driver();

    assert_ok!(driven.handle.stop());
    assert_ok!(timeout(WAIT, driven.task).await.unwrap());

    assert!(!driven.handle.is_running());
    let err = assert_err!(driven.handle.play());
    assert_eq!(err.error_code(), "INVALID_STATE");
}

#[tokio::test]
async fn test_dropping_every_handle_stops_player() {
    let driven = spawn_driver();
    let spare = driven.handle.clone();

    drop(driven.handle);
    assert!(spare.is_running());
    drop(spare);

    assert_ok!(timeout(WAIT, driven.task).await.unwrap());
    assert!(driven.media.is_ended());
}

#[tokio::test]
async fn test_seek_through_handle() {
    let mut driven = spawn_driver();
    assert_ok!(driven.handle.play());
    wait_for(&mut driven.handle, |status| status.loading).await;

    assert_ok!(driven.handle.seek(START - 60.0));
    let status = wait_for(&mut driven.handle, |status| !status.live).await;
    assert_eq!(status.cursor, START - 60.0);
    wait_for(&mut driven.handle, |status| status.waiting_data).await;
    assert_eq!(sent(&driven.connector), vec!["resume", "play_from=1699999940"]);

    assert_ok!(driven.handle.seek(SeekTarget::Live));
    wait_for(&mut driven.handle, |status| status.live).await;
    assert_eq!(sent(&driven.connector).last().unwrap(), "live");

    assert_ok!(driven.handle.stop());
    assert_ok!(timeout(WAIT, driven.task).await.unwrap());
}

#[tokio::test]
async fn test_rate_reported_in_status() {
    let mut driven = spawn_driver();

    assert_ok!(driven.handle.set_rate(0.5));
    let status = wait_for(&mut driven.handle, |status| status.rate == 0.5).await;
    assert!(!status.live);
    assert_eq!(driven.handle.rate(), 0.5);
    assert_eq!(driven.handle.time(), None);

    assert_ok!(driven.handle.stop());
    assert_ok!(timeout(WAIT, driven.task).await.unwrap());
}
