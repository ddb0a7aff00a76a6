//! Fault escalation — fan-out broadcast to registered channels.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use phrasedrop_core::error::Result;
use phrasedrop_core::report::FaultReport;
use phrasedrop_core::traits::EscalationChannel;

/// How much of the operational log tail a report carries.
const LOG_TAIL_BYTES: u64 = 512 * 1024;

/// Fans each fault report out to every registered channel, in registration
/// order. This is a broadcast, not a priority chain: every channel is always
/// attempted, and a failing channel never stops the rest or reaches the
/// caller. The baseline log channel is registered first and cannot fail.
pub struct EscalationPipeline {
    channels: Vec<Box<dyn EscalationChannel>>,
    log_path: Option<PathBuf>,
    version: Option<String>,
}

impl EscalationPipeline {
    pub fn new() -> Self {
        Self {
            channels: vec![Box::new(LogChannel)],
            log_path: None,
            version: None,
        }
    }

    /// Operational log whose tail is excerpted into every report.
    pub fn with_log_path(mut self, path: PathBuf) -> Self {
        self.log_path = Some(path);
        self
    }

    /// Version identifier stamped into every report.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn add_channel(&mut self, channel: Box<dyn EscalationChannel>) {
        self.channels.push(channel);
    }

    /// Broadcast one report. Channel failures are swallowed after being
    /// recorded through the baseline log.
    pub async fn notify(&self, mut report: FaultReport) {
        report.command_line = Some(std::env::args().collect::<Vec<_>>().join(" "));
        report.worker = Some(
            std::thread::current()
                .name()
                .unwrap_or("unnamed")
                .to_string(),
        );
        report.version = self.version.clone();
        if let Some(path) = &self.log_path {
            match read_log_tail(path, LOG_TAIL_BYTES) {
                Ok(tail) => report.logs.push(tail),
                Err(e) => report.logs.push(format!("failed to read log file: {e}")),
            }
        }

        for channel in &self.channels {
            if let Err(e) = channel.notify(&report).await {
                tracing::error!("⚠️ Escalation channel '{}' failed: {e}", channel.name());
            }
        }
    }
}

impl Default for EscalationPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Baseline channel — writes the rendered report to the operational log.
/// This is the floor the pipeline degrades to, so it must never fail.
pub struct LogChannel;

#[async_trait]
impl EscalationChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, report: &FaultReport) -> Result<()> {
        tracing::error!("{}", report.render());
        Ok(())
    }
}

fn read_log_tail(path: &Path, max_bytes: u64) -> std::io::Result<String> {
    use std::io::{Read, Seek, SeekFrom};
    let mut file = std::fs::File::open(path)?;
    let len = file.metadata()?.len();
    file.seek(SeekFrom::Start(len.saturating_sub(max_bytes)))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phrasedrop_core::error::PhrasedropError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct CountingChannel {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        order: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl EscalationChannel for CountingChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn notify(&self, _report: &FaultReport) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(self.name);
            if self.fail {
                return Err(PhrasedropError::channel("channel down"));
            }
            Ok(())
        }
    }

    fn pipeline_with(channels: Vec<(&'static str, bool)>) -> (EscalationPipeline, Vec<Arc<AtomicUsize>>, Arc<Mutex<Vec<&'static str>>>) {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = EscalationPipeline::new();
        let mut counters = Vec::new();
        for (name, fail) in channels {
            let calls = Arc::new(AtomicUsize::new(0));
            counters.push(calls.clone());
            pipeline.add_channel(Box::new(CountingChannel {
                name,
                calls,
                order: order.clone(),
                fail,
            }));
        }
        (pipeline, counters, order)
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_stop_the_rest() {
        let (pipeline, counters, _order) =
            pipeline_with(vec![("one", false), ("two", true), ("three", false)]);

        let err = PhrasedropError::channel("boom");
        pipeline.notify(FaultReport::expected(&err)).await;
        pipeline.notify(FaultReport::expected(&err)).await;

        for counter in &counters {
            assert_eq!(counter.load(Ordering::SeqCst), 2);
        }
    }

    #[tokio::test]
    async fn test_channels_run_in_registration_order() {
        let (pipeline, _counters, order) =
            pipeline_with(vec![("one", false), ("two", false), ("three", false)]);

        let err = PhrasedropError::channel("boom");
        pipeline.notify(FaultReport::expected(&err)).await;

        assert_eq!(*order.lock().unwrap(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_report_is_stamped_with_ambient_context() {
        struct Capture(Arc<Mutex<Option<FaultReport>>>);

        #[async_trait]
        impl EscalationChannel for Capture {
            fn name(&self) -> &str {
                "capture"
            }

            async fn notify(&self, report: &FaultReport) -> Result<()> {
                *self.0.lock().unwrap() = Some(report.clone());
                Ok(())
            }
        }

        let slot = Arc::new(Mutex::new(None));
        let mut pipeline = EscalationPipeline::new().with_version("1.2.3");
        pipeline.add_channel(Box::new(Capture(slot.clone())));

        let err = PhrasedropError::channel("boom");
        pipeline.notify(FaultReport::unexpected(&err)).await;

        let report = slot.lock().unwrap().take().unwrap();
        assert_eq!(report.version.as_deref(), Some("1.2.3"));
        assert!(report.command_line.is_some());
        assert!(report.worker.is_some());
    }

    #[test]
    fn test_log_tail_is_bounded() {
        let dir = std::env::temp_dir().join("phrasedrop-test-logtail");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("run.log");
        std::fs::write(&path, "0123456789").unwrap();

        let tail = read_log_tail(&path, 4).unwrap();
        assert_eq!(tail, "6789");

        let whole = read_log_tail(&path, 1024).unwrap();
        assert_eq!(whole, "0123456789");
        std::fs::remove_dir_all(&dir).ok();
    }
}
