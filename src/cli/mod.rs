use crate::models::{PlaybackRate, PlayerStatus};
use clap::{Parser, Subcommand};

pub mod status;
pub use status::StatusDisplay;

/// Scripture narrator CLI
#[derive(Parser)]
#[command(name = "narrate")]
#[command(about = "Reads scripture chapters aloud, verse by verse, with synthesized speech")]
#[command(version = "0.1.0")]
pub struct CliApp {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Commands {
    /// Open a chapter for narration
    Open {
        /// Book name, e.g. 창세기
        book: String,
        chapter: u32,
    },
    /// Start narration, or pause/resume it when already running
    Play,
    /// Pause the sounding verse
    Pause,
    /// Continue a paused verse
    Resume,
    /// Stop narration; play continues from the verse that was sounding
    Stop,
    /// Mark the chapter read and open the next one
    Next,
    /// Set narration speed (0.8, 1.0, 1.1, 1.3, 1.5, 1.7)
    Rate { rate: f32 },
    /// Display narrator status
    Status,
    /// Print the open chapter's text
    Text,
    /// Show reading progress, for one book or all
    Progress { book: Option<String> },
    /// Toggle a chapter's read mark
    Mark { book: String, chapter: u32 },
    /// Look up a word in the original language
    Word {
        #[arg(num_args = 1..)]
        word: Vec<String>,
    },
    /// Audio output device management
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },
}

/// Device management subcommands
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum DeviceAction {
    /// List available audio output devices
    List,
    /// Use a device from the next launch on
    Set {
        /// Device name
        device: String,
    },
}

impl CliApp {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Parse command from string (for interactive mode)
    pub fn parse_command(input: &str) -> Result<Commands, ParseError> {
        let args: Vec<&str> = input.split_whitespace().collect();
        if args.is_empty() {
            return Err(ParseError::EmptyCommand);
        }

        match args[0] {
            "open" => {
                let (book, chapter) = Self::parse_book_chapter("open", &args[1..])?;
                Ok(Commands::Open { book, chapter })
            }
            "play" => Ok(Commands::Play),
            "pause" => Ok(Commands::Pause),
            "resume" => Ok(Commands::Resume),
            "stop" => Ok(Commands::Stop),
            "next" => Ok(Commands::Next),
            "rate" | "speed" => match args.get(1) {
                Some(value) => Ok(Commands::Rate {
                    rate: Self::parse_rate(value)?,
                }),
                None => Err(ParseError::MissingArgument {
                    command: "rate".to_string(),
                    argument: "rate".to_string(),
                }),
            },
            "status" => Ok(Commands::Status),
            "text" => Ok(Commands::Text),
            "progress" => {
                let book = (args.len() > 1).then(|| args[1..].join(" "));
                Ok(Commands::Progress { book })
            }
            "mark" => {
                let (book, chapter) = Self::parse_book_chapter("mark", &args[1..])?;
                Ok(Commands::Mark { book, chapter })
            }
            "word" => {
                if args.len() > 1 {
                    Ok(Commands::Word {
                        word: args[1..].iter().map(|w| w.to_string()).collect(),
                    })
                } else {
                    Err(ParseError::MissingArgument {
                        command: "word".to_string(),
                        argument: "word".to_string(),
                    })
                }
            }
            "devices" => Ok(Commands::Device {
                action: DeviceAction::List,
            }),
            "device" => match args.get(1).copied() {
                Some("list") => Ok(Commands::Device {
                    action: DeviceAction::List,
                }),
                Some("set") if args.len() > 2 => Ok(Commands::Device {
                    action: DeviceAction::Set {
                        device: args[2..].join(" "),
                    },
                }),
                Some("set") => Err(ParseError::MissingArgument {
                    command: "device set".to_string(),
                    argument: "device".to_string(),
                }),
                Some(other) => Err(ParseError::UnknownCommand {
                    command: format!("device {}", other),
                }),
                None => Err(ParseError::MissingArgument {
                    command: "device".to_string(),
                    argument: "action".to_string(),
                }),
            },
            "help" => Err(ParseError::HelpRequested),
            _ => Err(ParseError::UnknownCommand {
                command: args[0].to_string(),
            }),
        }
    }

    /// `<book...> <chapter>`; the book name may contain spaces
    fn parse_book_chapter(command: &str, args: &[&str]) -> Result<(String, u32), ParseError> {
        match args {
            [] => Err(ParseError::MissingArgument {
                command: command.to_string(),
                argument: "book".to_string(),
            }),
            [_] => Err(ParseError::MissingArgument {
                command: command.to_string(),
                argument: "chapter".to_string(),
            }),
            [book @ .., chapter] => {
                let chapter = chapter.parse::<u32>().ok().filter(|&c| c > 0).ok_or_else(|| {
                    ParseError::InvalidArgument {
                        argument: "chapter".to_string(),
                        value: chapter.to_string(),
                        expected: "a chapter number starting at 1".to_string(),
                    }
                })?;
                Ok((book.join(" "), chapter))
            }
        }
    }

    /// Accepts "1.3" or "1.3x"; the value must be one of the offered speeds
    pub fn parse_rate(value: &str) -> Result<f32, ParseError> {
        let invalid = || ParseError::InvalidArgument {
            argument: "rate".to_string(),
            value: value.to_string(),
            expected: Self::rate_options(),
        };

        let rate: f32 = value
            .trim()
            .trim_end_matches(|c: char| c == 'x' || c == 'X')
            .parse()
            .map_err(|_| invalid())?;
        PlaybackRate::new(rate).map(|r| r.value()).map_err(|_| invalid())
    }

    fn rate_options() -> String {
        let options: Vec<String> = PlaybackRate::OPTIONS.iter().map(|r| format!("{:.1}", r)).collect();
        format!("one of {}", options.join(", "))
    }

    /// Display narrator status in a formatted way
    pub fn display_status(status: &PlayerStatus) {
        StatusDisplay::display_full_status(status);
    }

    /// Display help information
    pub fn display_help() {
        println!("Scripture Narrator - Available Commands:");
        println!();
        println!("Chapters:");
        println!("  open <book> <chapter>  - Open a chapter (e.g. 'open 창세기 1')");
        println!("  next                   - Mark this chapter read and open the next");
        println!("  text                   - Show the chapter text");
        println!();
        println!("Narration:");
        println!("  play            - Start narration, or pause/resume while running");
        println!("  pause           - Pause narration");
        println!("  resume          - Resume narration");
        println!("  stop            - Stop; play continues from the sounding verse");
        println!("  rate <speed>    - Set speed ({})", Self::rate_options());
        println!();
        println!("Information:");
        println!("  status               - Show narrator status");
        println!("  progress [book]      - Show reading progress");
        println!("  mark <book> <ch>     - Toggle a chapter's read mark");
        println!("  word <word>          - Original-language word study");
        println!();
        println!("Device Management:");
        println!("  devices              - List available audio devices");
        println!("  device set <name>    - Use a device from the next launch");
        println!();
        println!("General:");
        println!("  help            - Show this help message");
        println!("  exit, quit      - Exit the narrator");
    }
}

/// Command parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid argument {argument}: got '{value}', expected {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    #[error("Help requested")]
    HelpRequested,
}
