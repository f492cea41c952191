use crate::catalog;
use crate::error::{ErrorSeverity, NarratorError};
use crate::logging::{NarrationEvent, PerformanceMetrics};
use crate::models::{Chapter, PlayerStatus, SessionState, WordAnalysis};
use crate::progress::ReadProgress;

/// Status display formatter for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// Display the narrator state, open chapter and output settings
    pub fn display_full_status(status: &PlayerStatus) {
        println!("┌─ Narrator Status ───────────────────────────────────────┐");

        match status.reference() {
            Some(reference) => {
                println!("│ Chapter: {}", reference);
                Self::display_narration_info(status);
            }
            None => {
                println!("│ No chapter open");
                println!("│ Status: {}", Self::format_state(status.state));
            }
        }

        Self::display_system_info(status);
        println!("└─────────────────────────────────────────────────────────┘");
    }

    /// One-line status
    pub fn display_compact_status(status: &PlayerStatus) {
        println!("{}", Self::compact_line(status));
    }

    pub fn compact_line(status: &PlayerStatus) -> String {
        match status.reference() {
            Some(reference) => {
                let verse = status
                    .sounding_unit
                    .map(|unit| format!("{}절", unit))
                    .unwrap_or_else(|| format!("from {}절", status.resume_offset));
                format!(
                    "{} | {} {} | {}",
                    Self::format_state(status.state),
                    reference,
                    verse,
                    status.rate
                )
            }
            None => format!("{} | No chapter open", Self::format_state(status.state)),
        }
    }

    fn display_narration_info(status: &PlayerStatus) {
        println!("│");
        println!("│ Status: {}", Self::format_state(status.state));

        match status.sounding_unit {
            Some(unit) => println!("│ Verse: {} of {}", unit, status.total_units),
            None => println!("│ Starts at verse: {}", status.resume_offset),
        }
        if status.total_units > 0 {
            let position = status.sounding_unit.unwrap_or(status.resume_offset);
            let progress = position.saturating_sub(1) as f32 / status.total_units as f32;
            println!("│ Progress: [{}]", Self::create_progress_bar(progress, 40));
        }
        if status.is_loading {
            println!("│ Synthesizing: {} verses ready", status.queued_units);
        }
        if let (Some(book), Some(chapter)) = (&status.book, status.chapter) {
            println!("│ Next: {}", Self::next_chapter_label(book, chapter));
        }
        if let Some(error) = &status.last_error {
            println!("│ Last error: {}", Self::truncate(error, 45));
        }
    }

    /// Where `next` would go from this chapter
    pub fn next_chapter_label(book: &str, chapter: u32) -> String {
        if catalog::is_last_chapter(book, chapter) {
            return "none, this is the last chapter".to_string();
        }
        match catalog::next_chapter(book, chapter) {
            Ok(Some((next, chapter))) => format!("{} {}장", next.name, chapter),
            _ => "unknown".to_string(),
        }
    }

    fn display_system_info(status: &PlayerStatus) {
        println!("│");
        println!("│ Speed: {}", status.rate);
        match &status.output_device {
            Some(device) => println!("│ Device: {}", Self::truncate(device, 49)),
            None => println!("│ Device: Default"),
        }
    }

    /// Pipeline timings and the latest narration events
    pub fn display_metrics(metrics: &PerformanceMetrics, recent: &[NarrationEvent]) {
        println!("┌─ Narration Timing ──────────────────────────────────────┐");
        println!(
            "│ Verses synthesized: {} ({} skipped)",
            metrics.units_synthesized, metrics.units_skipped
        );
        println!("│ Last synthesis: {:.2}s", metrics.last_synthesis_latency.as_secs_f64());
        println!("│ Last decode: {:.1}ms", metrics.last_decode_time.as_secs_f64() * 1000.0);
        if let Some(latency) = metrics.first_audio_latency {
            println!("│ First audio after: {:.2}s", latency.as_secs_f64());
        }
        if !recent.is_empty() {
            println!("│");
            for event in recent {
                println!(
                    "│ {} {:<18} {}",
                    event.timestamp.format("%H:%M:%S"),
                    event.event_type.as_str(),
                    Self::truncate(&event.details, 30)
                );
            }
        }
        println!("└─────────────────────────────────────────────────────────┘");
    }

    /// Print the chapter, marking the sounding verse
    pub fn display_chapter_text(chapter: &Chapter, sounding: Option<u32>) {
        println!("── {} ──", chapter.reference());
        for unit in &chapter.units {
            let marker = if Some(unit.id) == sounding { "▶" } else { " " };
            println!("{} {:>3} {}", marker, unit.id, unit.content);
        }
    }

    /// Read counts for one book, or a summary of every book
    pub fn display_progress(progress: &ReadProgress, book: Option<&str>) {
        match book.and_then(catalog::find_book) {
            Some(book) => {
                let read = progress.read_count(book.name);
                println!("{}: {}/{} chapters read", book.name, read, book.chapters);
                let marks: String = (1..=book.chapters)
                    .map(|chapter| if progress.is_read(book.name, chapter) { '■' } else { '□' })
                    .collect();
                for line in marks.chars().collect::<Vec<_>>().chunks(30) {
                    println!("  {}", line.iter().collect::<String>());
                }
            }
            None => {
                if let Some(name) = book {
                    println!("Unknown book: {}", name);
                    return;
                }
                let total = catalog::total_chapters();
                let read = progress.total_read();
                println!(
                    "Read {}/{} chapters [{}]",
                    read,
                    total,
                    Self::create_progress_bar(read as f32 / total as f32, 30)
                );
                for book in catalog::all_books() {
                    let count = progress.read_count(book.name);
                    if count > 0 {
                        println!("  {:<8} {:>3}/{}", book.name, count, book.chapters);
                    }
                }
            }
        }
    }

    pub fn display_word_analysis(word: &str, analysis: &WordAnalysis) {
        println!("┌─ {} ─", word);
        println!("│ Original: {} ({})", analysis.original_word, analysis.pronunciation);
        for line in Self::wrap_text(&analysis.strongs_analysis, 55) {
            println!("│ {}", line.trim_end());
        }
        if !analysis.example_verses.is_empty() {
            println!("│");
            for example in &analysis.example_verses {
                println!("│ {}: {}", example.reference, example.text);
            }
        }
        println!("└─");
    }

    /// Display error message with formatting and recovery suggestions
    pub fn display_error(error: &NarratorError) {
        let severity = error.severity();
        let severity_icon = match severity {
            ErrorSeverity::Info => "ℹ",
            ErrorSeverity::Warning => "⚠",
            ErrorSeverity::Error => "✗",
            ErrorSeverity::Critical => "🔥",
        };

        eprintln!(
            "┌─ {} {} ─────────────────────────────────────────────────┐",
            severity_icon,
            severity.as_str()
        );
        for line in Self::wrap_text(&error.user_message(), 55) {
            eprintln!("│ {}", line);
        }

        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            eprintln!("│");
            eprintln!("│ Suggestions:");
            for suggestion in suggestions.iter().take(3) {
                for line in Self::wrap_text(&format!("• {}", suggestion), 53) {
                    eprintln!("│   {}", line);
                }
            }
        }
        eprintln!("└─────────────────────────────────────────────────────────┘");
    }

    /// Display a simple error message for non-interactive contexts
    pub fn display_simple_error(error: &NarratorError) {
        eprintln!("[{}] {}", error.severity().as_str(), error.user_message());
        if let Some(suggestion) = error.recovery_suggestions().first() {
            eprintln!("Suggestion: {}", suggestion);
        }
    }

    /// Wrap text to fit within specified width
    pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            let current_len = current_line.chars().count();
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_len + word.chars().count() < width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(current_line);
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }

        lines
            .into_iter()
            .map(|line| format!("{:<width$}", line, width = width))
            .collect()
    }

    /// Truncate to `max_len` characters
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len || max_len <= 3 {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }

    pub fn create_progress_bar(progress: f32, width: usize) -> String {
        let filled = ((progress.clamp(0.0, 1.0)) * width as f32) as usize;
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }

    pub fn format_state(state: SessionState) -> String {
        match state {
            SessionState::Idle => "○ Idle".to_string(),
            SessionState::Generating => "… Loading".to_string(),
            SessionState::Playing => "▶ Playing".to_string(),
            SessionState::Paused => "⏸ Paused".to_string(),
            SessionState::Stopped => "⏹ Stopped".to_string(),
        }
    }
}
