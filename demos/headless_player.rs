//! Headless player
//!
//! Connects to a live segment stream and plays it into the in-memory
//! renderer, printing player events until Ctrl+C.
//!
//! ```text
//! cargo run --example headless_player -- ws://localhost:8080/camera/mse_ld
//! ```

use fluplay::{
    DebugLogger, DispatchQueue, Event, MemoryRenderer, PlayerBuilder, PlayerDriver,
    ReconnectPolicy, WebSocketConnector,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    DebugLogger::init_logging()?;

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://localhost:8080/camera/mse_ld".to_string());
    println!("📺 Playing {}", url);

    let queue = DispatchQueue::new();
    let renderer = MemoryRenderer::new(queue.dispatcher())
        .auto_complete(true)
        .simulate_segment_duration(1.0);
    let media = renderer.handle();

    let (player, mut events) = PlayerBuilder::new()
        .url(&url)
        .video_track("camera")
        .reconnect(ReconnectPolicy::exponential(
            Duration::from_millis(500),
            Duration::from_secs(10),
        ))
        .build(renderer, WebSocketConnector::new()?, queue.dispatcher())?;
    let (handle, driver) = PlayerDriver::spawn(player, queue);

    // stand-in for a real media element advancing its clock
    let clock = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            if media.is_playing() {
                media.advance_to(media.position() + media.rate());
            }
        }
    });

    handle.play()?;

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Event::Progress { time }) => {
                    let status = handle.status();
                    println!(
                        "⏱️  {:.1} ({}) live: {}, loading: {}",
                        time,
                        status.utc.map(|utc| utc.to_rfc3339()).unwrap_or_default(),
                        status.live,
                        status.loading
                    );
                }
                Some(Event::Disconnected { reason }) => {
                    println!("❌ Disconnected: {}", reason);
                    break;
                }
                Some(other) => println!("📣 {:?}", other),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("🛑 Stopping");
                break;
            }
        }
    }

    let _ = handle.stop();
    driver.await?;
    clock.abort();

    let stats = handle.status().stats;
    println!(
        "✅ Done: {} segments accepted, {} stale, {} reconnects",
        stats.segments_accepted, stats.segments_stale, stats.reconnects
    );
    Ok(())
}
