#[cfg(test)]
mod integration_tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::audio::AudioOutput;
    use crate::catalog;
    use crate::logging::{NarrationEventType, NarrationLogger};
    use crate::models::{PlaybackRate, SessionState};
    use crate::pipeline::testing::{wait_until, FakeOutput, FixedChapters, Reply, ScriptedSpeech};
    use crate::pipeline::{ChannelObserver, PlayAction, PlaybackEvent, PlaybackSession};
    use crate::progress::ReadProgress;
    use crate::services::{ChapterSource, SpeechSource};

    struct Narrator {
        session: PlaybackSession,
        output: Arc<FakeOutput>,
        logger: NarrationLogger,
        events: tokio::sync::mpsc::UnboundedReceiver<PlaybackEvent>,
    }

    fn narrator(speech: ScriptedSpeech) -> Narrator {
        let output = Arc::new(FakeOutput::new());
        let (observer, events) = ChannelObserver::new();
        let logger = NarrationLogger::new();
        let session = PlaybackSession::new(
            Arc::new(speech) as Arc<dyn SpeechSource>,
            Arc::new(FixedChapters::new()) as Arc<dyn ChapterSource>,
            Arc::clone(&output) as Arc<dyn AudioOutput>,
            Arc::new(observer),
            logger.clone(),
            PlaybackRate::default(),
        );
        Narrator {
            session,
            output,
            logger,
            events,
        }
    }

    fn drain(events: &mut tokio::sync::mpsc::UnboundedReceiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        seen
    }

    async fn play_out(narrator: &Narrator) {
        wait_until(|| {
            narrator.output.finish();
            matches!(narrator.session.state(), SessionState::Idle | SessionState::Stopped)
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_and_narrate_whole_chapter() {
        let mut narrator = narrator(ScriptedSpeech::new(Duration::from_millis(30)));

        let chapter = narrator.session.open_chapter("룻기", 1).await.unwrap();
        assert_eq!(chapter.units.len(), 3);
        drain(&mut narrator.events);
        assert_eq!(
            narrator.session.play().unwrap(),
            PlayAction::Started { from_unit: 1 }
        );
        play_out(&narrator).await;

        // Base64 payloads decode to two frames each
        assert_eq!(narrator.output.started(), vec![2, 2, 2]);

        let events = drain(&mut narrator.events);
        let sounded: Vec<u32> = events
            .iter()
            .filter_map(|event| match event {
                PlaybackEvent::SoundingChanged(Some(unit)) => Some(*unit),
                _ => None,
            })
            .collect();
        assert_eq!(sounded, vec![1, 2, 3]);
        assert_eq!(events.first(), Some(&PlaybackEvent::StateChanged(SessionState::Generating)));
        assert!(events.contains(&PlaybackEvent::ChapterFinished));

        assert_eq!(narrator.logger.count_events(NarrationEventType::UnitSynthesized), 3);
        assert_eq!(narrator.logger.count_events(NarrationEventType::Completed), 1);
        assert!(narrator.logger.get_performance_metrics().first_audio_latency.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_verse_does_not_interrupt_narration() {
        let speech = ScriptedSpeech::new(Duration::from_millis(30)).reply("룻기 1:2", Reply::Garbage);
        let mut narrator = narrator(speech);

        narrator.session.open_chapter("룻기", 1).await.unwrap();
        narrator.session.play().unwrap();
        play_out(&narrator).await;

        let events = drain(&mut narrator.events);
        assert!(events.contains(&PlaybackEvent::SoundingChanged(Some(3))));
        assert!(!events.contains(&PlaybackEvent::SoundingChanged(Some(2))));
        assert!(!events.iter().any(|e| matches!(e, PlaybackEvent::Failed(_))));
        assert_eq!(narrator.logger.count_events(NarrationEventType::DecodeError), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reading_progress_follows_next_chapter() {
        let narrator = narrator(ScriptedSpeech::new(Duration::from_millis(30)));
        let temp_dir = TempDir::new().unwrap();
        let mut progress = ReadProgress::load(temp_dir.path().join("progress.json"));

        narrator.session.open_chapter("룻기", 4).await.unwrap();
        narrator.session.play().unwrap();
        wait_until(|| narrator.session.status().sounding_unit == Some(1)).await;

        let current = narrator.session.chapter().unwrap();
        progress.mark_read(&current.book, current.chapter).unwrap();
        let next = narrator.session.next_chapter().await.unwrap().unwrap();

        assert_eq!(next.book, "사무엘상");
        assert_eq!(narrator.session.status().resume_offset, 1);
        assert_eq!(narrator.session.state(), SessionState::Idle);
        assert!(ReadProgress::load(progress.path()).is_read("룻기", 4));
        assert_eq!(catalog::next_chapter(&next.book, next.chapter).unwrap().map(|(_, c)| c), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_change_mid_chapter() {
        let narrator = narrator(ScriptedSpeech::new(Duration::from_millis(30)));
        narrator.session.open_chapter("룻기", 1).await.unwrap();
        narrator.session.play().unwrap();
        wait_until(|| narrator.session.state() == SessionState::Playing).await;

        narrator.session.set_rate(1.7).unwrap();
        assert_eq!(narrator.output.rate(), 1.7);
        play_out(&narrator).await;

        assert_eq!(narrator.session.status().rate.value(), 1.7);
        assert_eq!(narrator.logger.count_events(NarrationEventType::RateChanged), 1);
    }
}
