use colored::Colorize;
use std::io::Write;

/// Prints a bold, prominent title for major sections of output.
pub fn print_title(text: &str) {
    println!("{}", format!("\n{}", text).bold());
}

/// Prints a plain informational message.
pub fn print_info(text: &str) {
    println!("{}", text);
}

pub fn print_divider() {
    println!();
}

/// Prints a highlighted section header with yellow bold text and surrounding markers.
pub fn print_section_header(text: &str) {
    println!("{}", format!("\n=== {} ===", text).yellow().bold());
}

/// Prints an informational message with a cyan arrow prefix.
pub fn print_message(text: &str) {
    println!("{}", format!("→ {}", text).cyan());
}

/// Prints a balance or rate with a blue diamond prefix.
pub fn print_count(text: &str) {
    println!("{}", format!("⟐ {}", text).blue());
}

pub fn print_success(text: &str) {
    println!("{}", format!("✓ {}", text).green());
}

/// Prints an error message with a red cross prefix to indicate failure.
pub fn print_error(text: &str) {
    println!("{}", format!("✗ {}", text).red());
}

/// Redraws a single status line in place.
pub fn print_live(text: &str) {
    print!("\r\x1b[2K{}", text.dimmed());
    let _ = std::io::stdout().flush();
}

/// Ends a line started by [`print_live`].
pub fn end_live() {
    println!();
}
