use crate::events::{AppEvent, SpinEvent};
use crate::wheel::{FRAME_INTERVAL, GenerateOptions, OutcomeGenerator, Step, Wheel};
use async_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::{Instant, MissedTickBehavior};

/// Generator shared between the control socket and the frame loop.
pub type SharedGenerator = Arc<Mutex<OutcomeGenerator>>;

pub fn start_background_services(tx: Sender<AppEvent>, generator: SharedGenerator) {
    tokio::spawn(async move {
        crate::sys::server::run_server(tx, generator).await;
    });
}

/// Owns the wheel: applies requests from `rx` and advances the live spin once per frame.
///
/// Returns on [`AppEvent::Shutdown`] or when every sender is gone.
pub async fn run_frame_loop(
    mut wheel: Wheel,
    generator: SharedGenerator,
    defaults: GenerateOptions,
    rx: Receiver<AppEvent>,
) {
    let mut interval = tokio::time::interval(FRAME_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(AppEvent::Spin { forced_slot, reply }) => {
                    let options = GenerateOptions {
                        forced_slot,
                        ..defaults.clone()
                    };
                    let result = {
                        let mut generator = generator.lock();
                        wheel.spin(&mut *generator, options)
                    };
                    // first frame of a new spin measures from now
                    last = Instant::now();
                    if reply.send(result.map(|handle| handle.outcome().clone())).is_err() {
                        log::debug!("Spin requester went away before the reply");
                    }
                }
                Ok(AppEvent::Cancel) => wheel.cancel(),
                Ok(AppEvent::Shutdown) => {
                    log::info!("Shutting down");
                    break;
                }
                Err(_) => break,
            },
            now = interval.tick() => {
                let dt = now.saturating_duration_since(last);
                last = now;
                if let Step::Finished(_) = wheel.tick(dt) {
                    log::debug!("Wheel at rest at {:.2}", wheel.display_rotation());
                }
            }
        }
    }
}

/// Logs what the wheel reports through its observer.
pub async fn report_events(rx: Receiver<SpinEvent>) {
    while let Ok(event) = rx.recv().await {
        match event {
            SpinEvent::Generated(outcome) => log::info!(
                "Spin {}: slot {} ({}), {} turns",
                outcome.id,
                outcome.target_slot,
                outcome.prize.label,
                outcome.full_turns
            ),
            SpinEvent::Progress(angle) => log::trace!("Rotation {:.2}", angle),
            SpinEvent::Completed(completion) if completion.is_consistent() => log::info!(
                "Spin {} landed on slot {}: {} ({})",
                completion.spin_id,
                completion.slot,
                completion.prize.label,
                completion.prize.value
            ),
            SpinEvent::Completed(completion) => log::warn!(
                "Spin {} awarded slot {} but stopped over slot {}",
                completion.spin_id,
                completion.slot,
                completion.resolved_slot
            ),
            SpinEvent::Cancelled(angle) => log::info!("Spin cancelled at {:.2}", angle),
        }
    }
}
