use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use scripture_narrator::audio::{AudioOutput, CpalOutput, DeviceManager};
use scripture_narrator::cli::{CliApp, Commands, DeviceAction, ParseError, StatusDisplay};
use scripture_narrator::config::ConfigManager;
use scripture_narrator::error::{ErrorSeverity, NarratorError};
use scripture_narrator::logging::NarrationLogger;
use scripture_narrator::models::SessionState;
use scripture_narrator::pipeline::{ChannelObserver, PlayAction, PlaybackEvent, PlaybackSession};
use scripture_narrator::progress::ReadProgress;
use scripture_narrator::services::{ChapterSource, GeminiClient, SpeechSource, WordAnalysisSource};

type Events = mpsc::UnboundedReceiver<PlaybackEvent>;

/// Main application controller that coordinates all components
pub struct AppController {
    session: PlaybackSession,
    words: Arc<dyn WordAnalysisSource>,
    config_manager: ConfigManager,
    progress: ReadProgress,
    logger: NarrationLogger,
}

impl AppController {
    /// Build the controller and the receiver of its playback events
    pub fn new() -> Result<(Self, Events), NarratorError> {
        let config_manager = ConfigManager::new()?;
        let config = config_manager.effective_config();

        let client = Arc::new(GeminiClient::new(&config)?);
        if !client.has_api_key() {
            eprintln!(
                "Warning: no API key configured. Set {} or add api_key to {}",
                scripture_narrator::config::API_KEY_ENV,
                config_manager.config_path().display()
            );
        }

        let output: Arc<dyn AudioOutput> = Arc::new(CpalOutput::new(config.preferred_device.as_deref())?);
        let (observer, events) = ChannelObserver::new();
        let logger = NarrationLogger::new();

        let session = PlaybackSession::new(
            Arc::clone(&client) as Arc<dyn SpeechSource>,
            Arc::clone(&client) as Arc<dyn ChapterSource>,
            output,
            Arc::new(observer),
            logger.clone(),
            config.default_rate,
        );
        let progress = ReadProgress::load(&config.progress_file);

        info!("Application controller initialized successfully");

        Ok((
            Self {
                session,
                words: client,
                config_manager,
                progress,
                logger,
            },
            events,
        ))
    }

    /// Open the chapter the last run ended on
    pub async fn initialize(&mut self) {
        let config = self.config_manager.get_config().clone();
        match self.session.open_chapter(&config.start_book, config.start_chapter).await {
            Ok(chapter) => println!("Opened {} ({} verses)", chapter.reference(), chapter.units.len()),
            Err(e) => self.handle_error(&e),
        }
    }

    /// Execute a single command
    pub async fn execute_command(&mut self, command: Commands) -> Result<(), NarratorError> {
        match command {
            Commands::Open { book, chapter } => {
                let chapter = self.session.open_chapter(&book, chapter).await?;
                println!("Opened {} ({} verses)", chapter.reference(), chapter.units.len());
                self.remember_position();
            }
            Commands::Play => match self.session.play()? {
                PlayAction::Started { from_unit } => {
                    if let Some(chapter) = self.session.chapter() {
                        println!("▶ Narrating {} from verse {}", chapter.reference(), from_unit);
                    }
                }
                PlayAction::Paused | PlayAction::Resumed => {
                    StatusDisplay::display_compact_status(&self.session.status())
                }
                PlayAction::StillLoading => println!("Still loading the first verse..."),
            },
            Commands::Pause => {
                self.session.pause()?;
                StatusDisplay::display_compact_status(&self.session.status());
            }
            Commands::Resume => {
                self.session.resume()?;
                StatusDisplay::display_compact_status(&self.session.status());
            }
            Commands::Stop => {
                self.session.stop();
                StatusDisplay::display_compact_status(&self.session.status());
            }
            Commands::Next => {
                if let Some(current) = self.session.chapter() {
                    self.progress.mark_read(&current.book, current.chapter)?;
                }
                match self.session.next_chapter().await? {
                    Some(chapter) => {
                        println!("Opened {} ({} verses)", chapter.reference(), chapter.units.len());
                        self.remember_position();
                    }
                    None => println!("That was the last chapter of the last book"),
                }
            }
            Commands::Rate { rate } => {
                let rate = self.session.set_rate(rate)?;
                self.config_manager.set_default_rate(rate.value())?;
                println!("OK: Speed {}", rate);
            }
            Commands::Status => {
                CliApp::display_status(&self.session.status());
                StatusDisplay::display_metrics(
                    &self.logger.get_performance_metrics(),
                    &self.logger.get_recent_events(5),
                );
            }
            Commands::Text => match self.session.chapter() {
                Some(chapter) => {
                    StatusDisplay::display_chapter_text(&chapter, self.session.status().sounding_unit)
                }
                None => println!("No chapter open"),
            },
            Commands::Progress { book } => {
                StatusDisplay::display_progress(&self.progress, book.as_deref());
            }
            Commands::Mark { book, chapter } => {
                let now_read = self.progress.toggle(&book, chapter)?;
                let verb = if now_read { "read" } else { "unread" };
                println!("OK: {} {}장 marked {}", book.trim(), chapter, verb);
            }
            Commands::Word { word } => {
                let word = word.join(" ");
                let book = match self.session.chapter() {
                    Some(chapter) => chapter.book.clone(),
                    None => self.config_manager.get_config().start_book.clone(),
                };
                println!("Looking up '{}'...", word);
                match self.words.analyze_word(&word, &book).await {
                    Some(analysis) => StatusDisplay::display_word_analysis(&word, &analysis),
                    None => println!("No analysis available for '{}'", word),
                }
            }
            Commands::Device { action } => {
                let mut devices = DeviceManager::new()?;
                match action {
                    DeviceAction::List => {
                        let infos = devices.device_info();
                        if infos.is_empty() {
                            println!("No audio devices found");
                        } else {
                            println!("Available audio devices:");
                            let current = self.session.status().output_device;
                            for info in infos {
                                let marker = if Some(&info.name) == current.as_ref() { "*" } else { " " };
                                println!("{} {} ({} Hz, {} ch)", marker, info.name, info.sample_rate, info.channels);
                            }
                        }
                    }
                    DeviceAction::Set { device } => {
                        devices.select_device(Some(device.as_str()))?;
                        self.config_manager.set_preferred_device(Some(device.clone()))?;
                        self.logger.log_device_changed(&device);
                        println!("Audio device set to: {} (used from the next launch)", device);
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_event(&self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::SoundingChanged(Some(unit_id)) => {
                if let Some(unit) = self.session.chapter().and_then(|c| c.unit(unit_id).cloned()) {
                    println!("\r{:>3} {}", unit.id, unit.content);
                }
            }
            PlaybackEvent::ChapterFinished => {
                if let Some(chapter) = self.session.chapter() {
                    println!("\n{} finished. Type 'next' to continue.", chapter.reference());
                }
            }
            PlaybackEvent::Failed(error) => {
                StatusDisplay::display_error(&NarratorError::Service(error));
            }
            PlaybackEvent::LoadingChanged(true) => println!("Loading narration..."),
            PlaybackEvent::SoundingChanged(None)
            | PlaybackEvent::LoadingChanged(false)
            | PlaybackEvent::PlayingChanged(_)
            | PlaybackEvent::StateChanged(_) => {}
        }
    }

    /// Run one command, then keep narrating until the chapter ends
    pub async fn run_single_command(&mut self, command: Commands, mut events: Events) -> Result<(), NarratorError> {
        self.execute_command(command).await?;

        let mut shutdown = Self::install_shutdown_handler();
        while matches!(
            self.session.state(),
            SessionState::Generating | SessionState::Playing | SessionState::Paused
        ) {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                _ = shutdown.recv() => break,
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Run interactive mode
    pub async fn run_interactive_mode(&mut self, mut events: Events) -> Result<(), NarratorError> {
        println!("Scripture Narrator v0.1.0");
        println!("Type 'help' for available commands, 'exit' or 'quit' to quit.");
        println!();

        let mut shutdown = Self::install_shutdown_handler();

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    // EOF or a broken terminal ends the session
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line.trim().to_string()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        let mut awaiting_input = false;

        loop {
            if !awaiting_input {
                print!("> ");
                let _ = std::io::Write::flush(&mut std::io::stdout());
                awaiting_input = true;
            }

            tokio::select! {
                biased;

                _ = shutdown.recv() => break,

                line = rx.recv() => {
                    awaiting_input = false;
                    let Some(line) = line else {
                        println!();
                        break;
                    };
                    if line.is_empty() {
                        continue;
                    }
                    if line == "exit" || line == "quit" {
                        println!("Goodbye!");
                        break;
                    }
                    match CliApp::parse_command(&line) {
                        Ok(command) => {
                            if let Err(e) = self.execute_command(command).await {
                                self.handle_error(&e);
                            }
                        }
                        Err(ParseError::HelpRequested) => CliApp::display_help(),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            println!("Type 'help' for available commands.");
                        }
                    }
                }

                event = events.recv() => {
                    if let Some(event) = event {
                        self.handle_event(event);
                    }
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    fn install_shutdown_handler() -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Err(e) = ctrlc::set_handler(move || {
            println!("\nReceived interrupt signal. Shutting down gracefully...");
            let _ = tx.send(());
        }) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }
        rx
    }

    /// Stop narration and remember where the reader is
    pub fn shutdown(&mut self) {
        println!("Shutting down...");
        self.session.stop();
        self.remember_position();
        println!("Shutdown complete.");
    }

    fn remember_position(&mut self) {
        if let Some(chapter) = self.session.chapter() {
            if let Err(e) = self.config_manager.set_start_position(&chapter.book, chapter.chapter) {
                warn!("Could not save position: {}", e);
            }
        }
    }

    fn handle_error(&self, error: &NarratorError) {
        match error.severity() {
            ErrorSeverity::Info => info!("{}", error),
            ErrorSeverity::Warning => warn!("{}", error),
            ErrorSeverity::Error | ErrorSeverity::Critical => error!("{}", error),
        }
        StatusDisplay::display_error(error);
    }
}

#[tokio::main]
async fn main() -> Result<(), NarratorError> {
    if let Err(e) = NarrationLogger::init() {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let cli = CliApp::parse();

    let (mut app, events) = match AppController::new() {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to initialize application: {}", e);
            StatusDisplay::display_simple_error(&e);
            std::process::exit(1);
        }
    };
    app.initialize().await;

    let result = match cli.command {
        Some(command) => app.run_single_command(command, events).await,
        None => app.run_interactive_mode(events).await,
    };
    if let Err(e) = result {
        app.handle_error(&e);
        std::process::exit(1);
    }

    info!("Application shutdown complete");
    Ok(())
}
