use std::io::{self, Write};
use crossterm::{
    queue,
    style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor},
};

use super::shared::{truncate_str, writeln};
use crate::store::{DashboardState, Notice, NoticeLevel};

pub const TITLE: &str = "Home Server Manager";

/// Title, running/total counts and the clock, then a separator. Two rows.
pub fn render_header(
    out: &mut impl Write,
    state: &DashboardState,
    api_url: &str,
    time: &str,
    width: usize,
) -> io::Result<()> {
    let counts = format!(" {}/{} running ", state.running_count(), state.records.len());
    let right = format!("{}  {} ", truncate_str(api_url, 40), time);

    write!(out, "  ")?;
    queue!(out, SetAttribute(Attribute::Bold))?;
    write!(out, "{}", TITLE)?;
    queue!(out, SetAttribute(Attribute::Reset))?;

    let color = if state.running_count() == state.records.len() {
        Color::Green
    } else {
        Color::DarkYellow
    };
    queue!(out, SetForegroundColor(color))?;
    write!(out, " {}", counts)?;
    queue!(out, ResetColor)?;

    if state.any_loading() {
        queue!(out, SetForegroundColor(Color::Yellow))?;
        write!(out, " syncing")?;
        queue!(out, ResetColor)?;
    }

    // right-align the API URL and clock
    let used = 2 + TITLE.len() + 1 + counts.chars().count() + if state.any_loading() { 8 } else { 0 };
    let pad = width.saturating_sub(used + right.chars().count());
    queue!(out, SetForegroundColor(Color::DarkGrey))?;
    write!(out, "{:pad$}{}", "", right, pad = pad)?;
    queue!(out, ResetColor)?;
    writeln(out, "")?;

    queue!(out, SetForegroundColor(Color::DarkGrey))?;
    writeln(out, &"─".repeat(width))?;
    queue!(out, ResetColor)
}

/// One banner row; blank when there is nothing to say.
pub fn render_notice(out: &mut impl Write, notice: Option<&Notice>, width: usize) -> io::Result<()> {
    let Some(notice) = notice else {
        return writeln(out, "");
    };
    let (color, prefix) = match notice.level {
        NoticeLevel::Info => (Color::Yellow, ""),
        NoticeLevel::Error => (Color::Red, "Error: "),
    };
    queue!(out, SetForegroundColor(color))?;
    let text = format!("  {}{}", prefix, notice.text.replace(['\r', '\n'], " "));
    writeln(out, &truncate_str(&text, width))?;
    queue!(out, ResetColor)
}
