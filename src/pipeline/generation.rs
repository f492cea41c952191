use std::sync::Arc;
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::audio::decode_payload;
use crate::error::ServiceError;
use crate::logging::{NarrationLogger, OperationTimer};
use crate::models::{QueueEntry, TextUnit};
use crate::pipeline::PlaybackQueue;
use crate::services::SpeechSource;
use crate::time_operation;

/// How a generation run ended
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// Every unit was handled; `queued` reached the queue
    Completed { queued: usize, skipped: usize },
    /// The token was cancelled before the end
    Cancelled,
    /// A service request failed; later units were never requested
    Failed(ServiceError),
}

/// Turns units into queued audio one request at a time
pub struct GenerationController {
    speech: Arc<dyn SpeechSource>,
    queue: Arc<PlaybackQueue>,
    token: CancellationToken,
    logger: NarrationLogger,
}

/// Units from the one with `offset` onward, or all of them if no unit has that id
pub fn units_from(units: &[TextUnit], offset: u32) -> &[TextUnit] {
    let start = units.iter().position(|u| u.id == offset).unwrap_or(0);
    &units[start..]
}

impl GenerationController {
    pub fn new(
        speech: Arc<dyn SpeechSource>,
        queue: Arc<PlaybackQueue>,
        token: CancellationToken,
        logger: NarrationLogger,
    ) -> Self {
        Self {
            speech,
            queue,
            token,
            logger,
        }
    }

    /// Synthesize `units` in order and push each decoded result.
    ///
    /// The token is cancelled when the run completes or is cancelled. On failure it
    /// is left to the caller, which stops the whole session.
    pub async fn run(self, units: &[TextUnit]) -> GenerationOutcome {
        let mut queued = 0;
        let mut skipped = 0;

        for unit in units {
            if !unit.is_speakable() {
                debug!("Verse {} has no text, skipping", unit.id);
                continue;
            }

            if self.token.is_cancelled() {
                return GenerationOutcome::Cancelled;
            }

            let timer = OperationTimer::new(format!("synthesize verse {}", unit.id));
            let response = tokio::select! {
                biased;
                _ = self.token.cancelled() => return GenerationOutcome::Cancelled,
                response = self.speech.synthesize(&unit.content) => response,
            };
            let latency = timer.finish();

            if self.token.is_cancelled() {
                return GenerationOutcome::Cancelled;
            }

            let payload = match response {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    self.logger.log_unit_skipped(unit.id, "no audio returned");
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    self.logger.log_service_error(&format!("Verse {}: {}", unit.id, e));
                    return GenerationOutcome::Failed(e);
                }
            };
            self.logger.log_unit_synthesized(unit.id, latency);

            let (decoded, decode_time) = time_operation!("decode speech", { decode_payload(&payload) });
            self.logger.update_decode_metrics(decode_time);

            if self.token.is_cancelled() {
                return GenerationOutcome::Cancelled;
            }

            match decoded {
                Ok(audio) => {
                    self.queue.push(QueueEntry::new(audio, unit.id));
                    queued += 1;
                }
                Err(e) => {
                    self.logger.log_decode_error(unit.id, &e.to_string());
                    skipped += 1;
                }
            }
        }

        info!("Generation finished: {} verses queued, {} skipped", queued, skipped);
        self.token.cancel();
        GenerationOutcome::Completed { queued, skipped }
    }
}
