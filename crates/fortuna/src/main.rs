use fortuna::config;
use fortuna::sys::runtime;
use fortuna::wheel::{ChannelObserver, OutcomeGenerator, Wheel};
use parking_lot::Mutex;
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    if let Err(e) = config::write_default_config() {
        log::warn!("Could not write default config: {}", e);
    }
    let config = config::load_or_default();
    let layout = config.layout()?;
    let prizes = config.prize_table()?;

    let generator = Arc::new(Mutex::new(OutcomeGenerator::new(layout, prizes.clone())));

    let (event_tx, event_rx) = async_channel::bounded(256);
    let mut wheel = Wheel::new(config.animation.clone());
    wheel.init_wheel(layout, prizes);
    wheel.set_observer(ChannelObserver::new(event_tx));

    let (tx, rx) = async_channel::bounded(32);

    // Start Background Services
    runtime::start_background_services(tx, generator.clone());
    tokio::spawn(runtime::report_events(event_rx));

    runtime::run_frame_loop(wheel, generator, config.spin.options(), rx).await;
    Ok(())
}
