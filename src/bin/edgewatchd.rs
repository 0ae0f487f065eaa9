//! edgewatchd - edge detection daemon
//!
//! This daemon:
//! 1. Ingests frames from the configured source on a capture thread
//! 2. Runs the detector backend on each frame
//! 3. Applies the debounced emitter (threshold + cooldown)
//! 4. Delivers emitted events to the cloud, or logs them in dry-run mode
//! 5. Exits cleanly on end-of-stream or Ctrl-C, logging a run summary

use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use edgewatch::emit::{DEFAULT_CLASS_OF_INTEREST, DEFAULT_COOLDOWN, DEFAULT_THRESHOLD};
use edgewatch::{
    backend_for, DebouncedEmitter, DeliveryClient, DeliveryResult, EmitterConfig, Provenance,
    RawFrame, RtspConfig, RtspSource, UNKNOWN_DEVICE_ID,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Edge person detection daemon")]
struct Args {
    /// Video source address. `stub://<name>` runs the synthetic source.
    #[arg(long, env = "INPUT_RTSP", default_value = "stub://camera")]
    input_rtsp: String,

    /// Confidence threshold for qualifying detections (0.0-1.0).
    #[arg(long, env = "PERSON_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    person_threshold: f32,

    /// Debounce window in seconds. Fractional values are allowed.
    #[arg(long, env = "EVENT_COOLDOWN_SEC", default_value_t = DEFAULT_COOLDOWN.as_secs_f64())]
    event_cooldown_sec: f64,

    /// Identifier stamped on emitted events.
    #[arg(long, env = "DEVICE_ID", default_value = UNKNOWN_DEVICE_ID)]
    device_id: String,

    /// Detector version stamped on emitted events.
    #[arg(long, env = "MODEL", default_value = "mobilenet-ssd")]
    model: String,

    /// Deployment artifact identifier stamped on emitted events.
    #[arg(long, env = "IMAGE_TAG", default_value = "edgewatch/edge:latest")]
    image_tag: String,

    /// Ingestion endpoint base URL. Empty selects dry-run mode.
    #[arg(long, env = "CLOUD_API_BASE")]
    cloud_api_base: Option<String>,

    /// Detector backend name.
    #[arg(long, env = "DETECTOR_BACKEND", default_value = "stub")]
    detector_backend: String,

    /// Target capture rate in frames per second.
    #[arg(long, env = "TARGET_FPS", default_value_t = 10)]
    target_fps: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !args.event_cooldown_sec.is_finite() || args.event_cooldown_sec < 0.0 {
        return Err(anyhow!("EVENT_COOLDOWN_SEC must be >= 0"));
    }
    let emitter_config = EmitterConfig {
        threshold: args.person_threshold,
        cooldown: Duration::from_secs_f64(args.event_cooldown_sec),
        class_of_interest: DEFAULT_CLASS_OF_INTEREST.to_string(),
    };
    let provenance = Provenance {
        device_id: args.device_id.clone(),
        model: args.model.clone(),
        image_tag: args.image_tag.clone(),
    };
    let mut emitter = DebouncedEmitter::new(emitter_config, provenance)?;

    // Startup failures (bad config, missing detector) are fatal before the
    // main loop; nothing mid-run is.
    let mut detector = backend_for(&args.detector_backend)?;
    detector.warm_up()?;

    let client = DeliveryClient::from_base(args.cloud_api_base.as_deref());
    if client.is_dry_run() {
        log::info!("no CLOUD_API_BASE configured; events will be logged, not sent");
    }

    let source_config = RtspConfig {
        url: args.input_rtsp.clone(),
        target_fps: args.target_fps,
        ..RtspConfig::default()
    };
    let frame_interval = Duration::from_millis(1000 / u64::from(source_config.target_fps.max(1)));
    let mut source = RtspSource::new(source_config)?;
    source.connect()?;

    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit = quit.clone();
        ctrlc::set_handler(move || quit.store(true, Ordering::SeqCst))?;
    }

    log::info!(
        "edgewatchd running: device_id={} model={} threshold={} cooldown={:.1}s source={}",
        args.device_id,
        args.model,
        args.person_threshold,
        args.event_cooldown_sec,
        args.input_rtsp
    );

    // Capture runs on its own thread so inference latency never stalls the
    // source; frames queue in a small bounded channel.
    let (frame_tx, frame_rx) = mpsc::sync_channel::<RawFrame>(4);
    let capture = std::thread::spawn(move || {
        let mut last_health_log = Instant::now();
        loop {
            match source.next_frame() {
                Ok(Some(frame)) => {
                    if frame_tx.send(frame).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    log::info!("frame source ended");
                    break;
                }
                Err(err) => {
                    log::error!("frame capture failed: {}", err);
                    break;
                }
            }
            if last_health_log.elapsed() >= Duration::from_secs(5) {
                let stats = source.stats();
                log::info!(
                    "source health={} frames={} url={}",
                    source.is_healthy(),
                    stats.frames_captured,
                    stats.url
                );
                last_health_log = Instant::now();
            }
            std::thread::sleep(frame_interval);
        }
    });

    // Detection and debounce stay on this single thread: one authoritative
    // clock, one last-emission timestamp.
    let started = Instant::now();
    let mut frames_seen = 0u64;
    let mut events_emitted = 0u64;

    while !quit.load(Ordering::SeqCst) {
        let frame = match frame_rx.recv_timeout(Duration::from_millis(250)) {
            Ok(frame) => frame,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        frames_seen += 1;

        let detections = match detector.detect(&frame) {
            Ok(detections) => detections,
            Err(err) => {
                log::warn!("detection failed on frame {}: {}", frame.index(), err);
                continue;
            }
        };

        if let Some(event) = emitter.observe(&detections, frame.captured_at())? {
            events_emitted += 1;
            log::info!(
                "event #{}: {} person_count={} top_confidence={:.4}",
                events_emitted,
                event.event,
                event.person_count,
                event.top_confidence
            );

            // Fire and forget: delivery must never block the frame loop,
            // and a failed delivery is dropped, not retried.
            let client = client.clone();
            std::thread::spawn(move || match client.deliver(&event) {
                DeliveryResult::Delivered => {
                    log::info!("event delivered: ts={} device={}", event.ts, event.device_id);
                }
                DeliveryResult::DryRun => {
                    let payload = serde_json::to_string(&event).unwrap_or_default();
                    log::info!("event (dry run): {}", payload);
                }
                DeliveryResult::Failed(reason) => {
                    log::warn!(
                        "event delivery failed (dropping): {} ts={} device={}",
                        reason,
                        event.ts,
                        event.device_id
                    );
                }
            });
        }
    }

    drop(frame_rx);
    capture
        .join()
        .map_err(|_| anyhow!("capture thread panicked"))?;

    let elapsed = started.elapsed().as_secs_f64();
    let fps = if elapsed > 0.0 {
        frames_seen as f64 / elapsed
    } else {
        0.0
    };
    log::info!(
        "edgewatchd exiting: frames={} events={} elapsed={:.2}s approx_fps={:.2}",
        frames_seen,
        events_emitted,
        elapsed,
        fps
    );
    Ok(())
}
