use lectern_core::{BatchReport, ExtractedArticle};
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "Lectern".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Web pages and email to Markdown and speech\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print timing information with color coding
pub fn print_timing(label: &str, duration: std::time::Duration) {
    let ms = duration.as_secs_f64() * 1000.0;
    let label = format!("{}:", label);
    if ms < 500.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "fast".dimmed());
    } else if ms < 2000.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "moderate".bright_yellow());
    } else {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "slow".bright_red());
    }
}

fn print_field(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// Print the headline facts of one article
pub fn print_article_summary(article: &ExtractedArticle) {
    print_field("Title", &article.title);
    if let Some(author) = &article.author {
        print_field("Author", author);
    }
    if let Some(source) = article.source_name() {
        print_field("Source", &source);
    }
    print_field("Words", &article.word_count.to_string());
    print_field("Reading time", &format!("{} min", article.reading_time_minutes));
    print_field("Markdown", &format_size(article.content_markdown.len()));
}

/// Print the outcome of a directory import
pub fn print_batch_summary(report: &BatchReport) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Import Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    print_field("Messages", &report.total().to_string());
    eprintln!(
        "  {} {}",
        "Processed:".dimmed(),
        report.processed.len().to_string().bright_green()
    );
    eprintln!(
        "  {} {}\n",
        "Failed:".dimmed(),
        report.failed.len().to_string().bright_red()
    );
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
