//! ltc-node entry point.
//!
//! ESP-IDF: encoder on GPIO25 (LEDC), decoder on GPIO36 (ADC1), 25 fps,
//! every newly decoded timecode printed to the console.
//!
//! Host: the same node wired through a [`LoopbackWire`] for a few seconds.

use std::time::{Duration, Instant};

use ltc_node::config::{DEFAULT_INPUT_PIN, DEFAULT_OUTPUT_PIN};
use ltc_node::hal::{DutyOutput, SampleInput};
use ltc_node::log_drain::{drain_all, spawn_log_drain};
use ltc_node::logging::LogSource;
use ltc_node::{ltc_error, ltc_info, LtcNode, APP_LOG_STREAM};

/// Frame rate of the demo.
const FPS: u32 = 25;

/// Timecode the generator starts from.
const START_TIMECODE: &str = "01:00:00:00";

/// Console poll interval.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

fn main() {
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        // The decoder spins on this core; see APP_TASK_PRIORITY.
        unsafe {
            esp_idf_svc::sys::vTaskPrioritySet(
                core::ptr::null_mut(),
                u32::from(ltc_node::config::APP_TASK_PRIORITY),
            );
        }
    }

    let drain = match spawn_log_drain(std::io::stdout()) {
        Ok(task) => Some(task),
        Err(err) => {
            eprintln!("log drain not started: {}", err);
            None
        }
    };

    ltc_info!(APP_LOG_STREAM, LogSource::App, "{}", env!("VERSION_STRING"));

    #[cfg(target_os = "espidf")]
    {
        use ltc_node::hal::{Adc1Input, LedcOutput};

        let mut node = LtcNode::new(LedcOutput::new(), Adc1Input::new());
        run_node(&mut node, None);
    }

    #[cfg(not(target_os = "espidf"))]
    {
        use ltc_node::hal::LoopbackWire;

        let wire = LoopbackWire::new();
        let mut node = LtcNode::new(wire.output(), wire.input());
        run_node(&mut node, Some(Duration::from_secs(3)));
    }

    match drain.map(|task| task.stop()) {
        Some(Ok(mut out)) => {
            drain_all(&mut out);
        }
        Some(Err(err)) => eprintln!("log drain: {}", err),
        None => {
            drain_all(&mut std::io::stdout());
        }
    }
}

/// Start both sessions and print decoded timecodes until `limit` elapses
/// (forever with `None`).
fn run_node<P: DutyOutput, I: SampleInput>(node: &mut LtcNode<P, I>, limit: Option<Duration>) {
    if let Err(err) = node.begin_encoder(FPS, DEFAULT_OUTPUT_PIN) {
        ltc_error!(APP_LOG_STREAM, LogSource::App, "encoder: {}", err);
    }
    if let Err(err) = node.begin_decoder(FPS, DEFAULT_INPUT_PIN) {
        ltc_error!(APP_LOG_STREAM, LogSource::App, "decoder: {}", err);
    }
    if let Err(err) = node.set_timecode_str(START_TIMECODE) {
        ltc_error!(APP_LOG_STREAM, LogSource::App, "timecode: {}", err);
    }

    node.run_decoder();
    node.run_encoder();

    let started = Instant::now();
    while limit.map_or(true, |limit| started.elapsed() < limit) {
        if node.available() {
            println!("LTC {}", node.timecode_string());
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    node.stop_encoder();
    node.stop_decoder();
    ltc_info!(
        APP_LOG_STREAM,
        LogSource::App,
        "stopped: {} frames out, {} frames in",
        node.encoder().frames_emitted(),
        node.decoder().frames_decoded()
    );
}
