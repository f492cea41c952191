use log::{info, warn, error, debug, trace};
use std::time::{Duration, Instant};
use std::sync::{Arc, Mutex, MutexGuard};
use std::collections::VecDeque;
use chrono::{DateTime, Utc};

/// Environment variable selecting the log level
pub const LOG_LEVEL_ENV: &str = "NARRATOR_LOG_LEVEL";

const SYNTHESIS_THRESHOLD: Duration = Duration::from_secs(8);
const DECODE_THRESHOLD: Duration = Duration::from_millis(50);
const FIRST_AUDIO_THRESHOLD: Duration = Duration::from_secs(10);

/// Timing of the most recent pipeline operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceMetrics {
    pub last_synthesis_latency: Duration,
    pub last_decode_time: Duration,
    pub first_audio_latency: Option<Duration>,
    pub units_synthesized: u64,
    pub units_skipped: u64,
}

/// Narration event for logging and debugging
#[derive(Debug, Clone)]
pub struct NarrationEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: NarrationEventType,
    pub duration: Option<Duration>,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationEventType {
    SessionStarted,
    UnitSynthesized,
    UnitSkipped,
    UnitStarted,
    Paused,
    Resumed,
    Stopped,
    Completed,
    RateChanged,
    ServiceError,
    DecodeError,
    DeviceChanged,
    PerformanceWarning,
}

impl NarrationEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrationEventType::SessionStarted => "SESSION_STARTED",
            NarrationEventType::UnitSynthesized => "UNIT_SYNTHESIZED",
            NarrationEventType::UnitSkipped => "UNIT_SKIPPED",
            NarrationEventType::UnitStarted => "UNIT_STARTED",
            NarrationEventType::Paused => "PAUSED",
            NarrationEventType::Resumed => "RESUMED",
            NarrationEventType::Stopped => "STOPPED",
            NarrationEventType::Completed => "COMPLETED",
            NarrationEventType::RateChanged => "RATE_CHANGED",
            NarrationEventType::ServiceError => "SERVICE_ERROR",
            NarrationEventType::DecodeError => "DECODE_ERROR",
            NarrationEventType::DeviceChanged => "DEVICE_CHANGED",
            NarrationEventType::PerformanceWarning => "PERFORMANCE_WARNING",
        }
    }
}

/// Logger for narration operations and debugging
#[derive(Clone)]
pub struct NarrationLogger {
    events: Arc<Mutex<VecDeque<NarrationEvent>>>,
    max_events: usize,
    performance_metrics: Arc<Mutex<PerformanceMetrics>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl NarrationLogger {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            max_events: 1000,
            performance_metrics: Arc::new(Mutex::new(PerformanceMetrics::default())),
        }
    }

    /// Initialize the `log` backend. Level comes from NARRATOR_LOG_LEVEL, then RUST_LOG.
    pub fn init() -> Result<(), Box<dyn std::error::Error>> {
        let log_level = std::env::var(LOG_LEVEL_ENV)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "warn".to_string());

        let mut builder = env_logger::Builder::new();

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] [{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });

        builder.filter_level(parse_level(&log_level));
        builder.try_init()?;

        info!("Narrator logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Log a narration event
    pub fn log_event(&self, event_type: NarrationEventType, details: String, duration: Option<Duration>) {
        match event_type {
            NarrationEventType::SessionStarted
            | NarrationEventType::Stopped
            | NarrationEventType::Completed
            | NarrationEventType::RateChanged
            | NarrationEventType::DeviceChanged => {
                info!("[{}] {}", event_type.as_str(), details);
            }
            NarrationEventType::UnitSynthesized => {
                debug!("[{}] {} (took: {:?})", event_type.as_str(), details, duration);
            }
            NarrationEventType::UnitStarted
            | NarrationEventType::Paused
            | NarrationEventType::Resumed => {
                debug!("[{}] {}", event_type.as_str(), details);
            }
            NarrationEventType::UnitSkipped | NarrationEventType::DecodeError => {
                warn!("[{}] {}", event_type.as_str(), details);
            }
            NarrationEventType::ServiceError => {
                error!("[{}] {}", event_type.as_str(), details);
            }
            NarrationEventType::PerformanceWarning => {
                warn!("[{}] {} (duration: {:?})", event_type.as_str(), details, duration);
            }
        }

        let mut events = locked(&self.events);
        events.push_back(NarrationEvent {
            timestamp: Utc::now(),
            event_type,
            duration,
            details,
        });
        while events.len() > self.max_events {
            events.pop_front();
        }
    }

    pub fn log_session_started(&self, reference: &str, from_unit: u32) {
        self.log_event(
            NarrationEventType::SessionStarted,
            format!("Narrating {} from verse {}", reference, from_unit),
            None,
        );
    }

    pub fn log_unit_synthesized(&self, unit_id: u32, latency: Duration) {
        {
            let mut metrics = locked(&self.performance_metrics);
            metrics.last_synthesis_latency = latency;
            metrics.units_synthesized += 1;
        }
        self.log_event(
            NarrationEventType::UnitSynthesized,
            format!("Verse {} synthesized", unit_id),
            Some(latency),
        );
        if latency > SYNTHESIS_THRESHOLD {
            self.log_performance_warning("Speech synthesis", latency, SYNTHESIS_THRESHOLD);
        }
    }

    pub fn log_unit_skipped(&self, unit_id: u32, reason: &str) {
        locked(&self.performance_metrics).units_skipped += 1;
        self.log_event(
            NarrationEventType::UnitSkipped,
            format!("Verse {} skipped: {}", unit_id, reason),
            None,
        );
    }

    pub fn log_unit_started(&self, unit_id: u32, audio_duration: Duration) {
        self.log_event(
            NarrationEventType::UnitStarted,
            format!("Verse {} sounding ({:.1}s)", unit_id, audio_duration.as_secs_f64()),
            None,
        );
    }

    pub fn log_paused(&self, unit_id: Option<u32>) {
        self.log_event(NarrationEventType::Paused, format!("Paused at verse {:?}", unit_id), None);
    }

    pub fn log_resumed(&self, unit_id: Option<u32>) {
        self.log_event(NarrationEventType::Resumed, format!("Resumed at verse {:?}", unit_id), None);
    }

    pub fn log_stopped(&self, resume_offset: u32) {
        self.log_event(
            NarrationEventType::Stopped,
            format!("Stopped, next play starts at verse {}", resume_offset),
            None,
        );
    }

    pub fn log_completed(&self) {
        self.log_event(NarrationEventType::Completed, "Chapter narration finished".to_string(), None);
    }

    pub fn log_rate_changed(&self, rate: f32) {
        self.log_event(NarrationEventType::RateChanged, format!("Rate set to {:.1}x", rate), None);
    }

    pub fn log_service_error(&self, error: &str) {
        self.log_event(NarrationEventType::ServiceError, error.to_string(), None);
    }

    pub fn log_decode_error(&self, unit_id: u32, error: &str) {
        self.log_event(
            NarrationEventType::DecodeError,
            format!("Verse {} could not be decoded: {}", unit_id, error),
            None,
        );
    }

    pub fn log_device_changed(&self, device: &str) {
        self.log_event(
            NarrationEventType::DeviceChanged,
            format!("Audio device set to '{}'", device),
            None,
        );
    }

    pub fn log_performance_warning(&self, operation: &str, duration: Duration, threshold: Duration) {
        self.log_event(
            NarrationEventType::PerformanceWarning,
            format!(
                "{} took {}ms (threshold: {}ms)",
                operation,
                duration.as_millis(),
                threshold.as_millis()
            ),
            Some(duration),
        );
    }

    pub fn update_decode_metrics(&self, decode_time: Duration) {
        locked(&self.performance_metrics).last_decode_time = decode_time;
        if decode_time > DECODE_THRESHOLD {
            self.log_performance_warning("Audio decode", decode_time, DECODE_THRESHOLD);
        }
    }

    /// Record time from pressing play to the first audible verse
    pub fn update_first_audio_latency(&self, latency: Duration) {
        locked(&self.performance_metrics).first_audio_latency = Some(latency);
        if latency > FIRST_AUDIO_THRESHOLD {
            self.log_performance_warning("First audio", latency, FIRST_AUDIO_THRESHOLD);
        }
    }

    /// Get recent events for debugging, oldest first
    pub fn get_recent_events(&self, count: usize) -> Vec<NarrationEvent> {
        let events = locked(&self.events);
        let skip = events.len().saturating_sub(count);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        locked(&self.performance_metrics).clone()
    }

    pub fn clear_events(&self) {
        locked(&self.events).clear();
    }

    pub fn count_events(&self, event_type: NarrationEventType) -> usize {
        locked(&self.events)
            .iter()
            .filter(|event| event.event_type == event_type)
            .count()
    }
}

impl Default for NarrationLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_level(level: &str) -> log::LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" | "warning" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Warn,
    }
}

/// Timer utility for measuring operation durations
pub struct OperationTimer {
    start_time: Instant,
    operation_name: String,
}

impl OperationTimer {
    pub fn new(operation_name: String) -> Self {
        trace!("Starting operation: {}", operation_name);
        Self {
            start_time: Instant::now(),
            operation_name,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn finish(self) -> Duration {
        let duration = self.elapsed();
        trace!("Completed operation '{}' in {}ms", self.operation_name, duration.as_millis());
        duration
    }
}

/// Time a block, yielding `(result, duration)`
#[macro_export]
macro_rules! time_operation {
    ($name:expr, $code:block) => {{
        let timer = $crate::logging::OperationTimer::new($name.to_string());
        let result = $code;
        let duration = timer.finish();
        (result, duration)
    }};
}
