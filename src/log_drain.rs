//! Log drain: moves entries from the log streams to a byte sink.
//!
//! On ESP-IDF the sink is stdout, which the IDF routes to UART0; on the
//! host it is the terminal. The drain runs as a low-priority task away from
//! the sample loops and is the only place that may block on output.
//!
//! Line format: `[timestamp_us] LEVEL source: message`

use std::io::Write;
use std::time::Duration;

use crate::config::{TaskSpec, DROP_REPORT_INTERVAL_US, LOG_DRAIN_IDLE_MS};
use crate::hal::task::{RtTask, TaskError};
use crate::hal::timer::timestamp_us;
use crate::logging::{BufWriter, LogEntry, LogStream};
use crate::{APP_LOG_STREAM, RT_LOG_STREAM};

/// Size of one formatted line.
pub const LINE_BUF_LEN: usize = 160;

/// Format one entry into `buf`, returning the number of bytes used.
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    use core::fmt::Write as _;

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = writeln!(
        writer,
        "[{:10}] {} {}: {}",
        entry.timestamp_us,
        entry.level.as_str(),
        entry.source.as_str(),
        entry.message()
    );
    writer.pos
}

/// Write every ready entry of `stream` to `out`. Returns the entry count.
pub fn drain_stream<const N: usize, W: Write>(stream: &LogStream<N>, out: &mut W) -> usize {
    let mut line = [0u8; LINE_BUF_LEN];
    let mut count = 0;
    while let Some(entry) = stream.drain() {
        let len = format_log_entry(&entry, &mut line);
        let _ = out.write_all(&line[..len]);
        count += 1;
    }
    count
}

/// Drain the real-time stream first, then the application stream.
pub fn drain_all<W: Write>(out: &mut W) -> usize {
    let count = drain_stream(&RT_LOG_STREAM, out) + drain_stream(&APP_LOG_STREAM, out);
    if count > 0 {
        let _ = out.flush();
    }
    count
}

/// Report and reset the dropped counters. Returns `true` if anything was
/// reported.
pub fn report_dropped<W: Write>(out: &mut W) -> bool {
    let rt = RT_LOG_STREAM.dropped();
    let app = APP_LOG_STREAM.dropped();
    if rt == 0 && app == 0 {
        return false;
    }
    let _ = writeln!(out, "[{:10}] WARN log: dropped rt={} app={}", timestamp_us(), rt, app);
    RT_LOG_STREAM.reset_dropped();
    APP_LOG_STREAM.reset_dropped();
    true
}

/// Start the drain task. It runs until stopped and hands the sink back.
pub fn spawn_log_drain<W: Write + Send + 'static>(out: W) -> Result<RtTask<W>, TaskError> {
    RtTask::spawn_with(&TaskSpec::LOG_DRAIN, out, |mut out, cancel| {
        let mut last_report = timestamp_us();
        while !cancel.is_cancelled() {
            let drained = drain_all(&mut out);

            let now = timestamp_us();
            if now - last_report > DROP_REPORT_INTERVAL_US {
                report_dropped(&mut out);
                last_report = now;
            }

            if drained == 0 {
                std::thread::sleep(Duration::from_millis(LOG_DRAIN_IDLE_MS));
            }
        }
        drain_all(&mut out);
        out
    })
    .map_err(|(err, _)| err)
}
