mod card;
mod confirmation;
mod header;
mod shared;

use std::io::{self, Write};
use crossterm::{execute, cursor, queue, style::{Color, SetForegroundColor, ResetColor}, terminal};

use crate::model::CardUIState;
use crate::store::DashboardState;

pub use card::{Badge, BadgeColor, Button, CardAction, CardModel, Field, render_card, state_color};
pub use header::TITLE;
pub use shared::{fit_width, truncate_str};

pub struct Presenter;

/// Minimum terminal dimensions for usable rendering.
pub const MIN_COLS: u16 = 80;
pub const MIN_ROWS: u16 = 10;

/// Header (2 rows), notice (1), spacer above the footer (1), footer (1).
const CHROME_ROWS: usize = 5;

const HELP: &str = "q: Quit | ↑/↓: Select | →/←/Enter: Details | u/s/t/r/p/d: Up Start Stop Restart Pull Down | f/F: Refresh | R/D: Restart/Down all | Esc: Dismiss";

/// Everything one frame of the dashboard needs.
pub struct DashboardView<'a> {
    pub state: &'a DashboardState,
    pub ui: &'a CardUIState,
    pub api_url: &'a str,
    pub time: &'a str,
    pub confirmation: Option<&'a str>,
}

impl Presenter {
    /// Check if the terminal is large enough. If not, render a "too small"
    /// message and return `true` (meaning "skip normal rendering").
    pub fn render_size_guard() -> io::Result<bool> {
        let (cols, rows) = terminal::size()?;
        if cols < MIN_COLS || rows < MIN_ROWS {
            let mut out = std::io::stdout();
            execute!(out, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0))?;
            let msg = format!(
                "Terminal too small ({}x{}). Resize to at least {}x{}.",
                cols, rows, MIN_COLS, MIN_ROWS
            );
            let y = rows / 2;
            let x = cols.saturating_sub(msg.len() as u16) / 2;
            queue!(out, cursor::MoveTo(x, y), SetForegroundColor(Color::Yellow))?;
            write!(out, "{}", msg)?;
            queue!(out, ResetColor)?;
            out.flush()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Draw a full frame into `out`, sized `cols` x `rows`.
    pub fn render_dashboard(
        out: &mut impl Write,
        view: &DashboardView<'_>,
        cols: u16,
        rows: u16,
    ) -> io::Result<()> {
        let width = cols as usize;
        queue!(out, terminal::Clear(terminal::ClearType::All), cursor::MoveTo(0, 0))?;

        header::render_header(out, view.state, view.api_url, view.time, width)?;
        header::render_notice(out, view.state.notice.as_ref(), width)?;

        let cards = cards(view.state, view.ui);
        if cards.is_empty() {
            shared::writeln(out, "")?;
            shared::writeln(out, "  No services yet. Press F to reload the service list.")?;
        } else {
            let selected = view.ui.selected_index.min(cards.len() - 1);
            let heights: Vec<usize> = cards
                .iter()
                .enumerate()
                .map(|(i, c)| c.height(i == selected))
                .collect();
            let available = (rows as usize).saturating_sub(CHROME_ROWS);
            let (start, end) = visible_range(&heights, selected, available);
            for (i, card) in cards.iter().enumerate().take(end).skip(start) {
                render_card(out, card, i == selected, width)?;
            }
        }

        let footer_y = rows.saturating_sub(1);
        queue!(out, cursor::MoveTo(0, footer_y), SetForegroundColor(Color::DarkGrey))?;
        write!(out, "{}", fit_width(&format!(" {}", HELP), width))?;
        queue!(out, ResetColor)?;

        if let Some(prompt) = view.confirmation {
            confirmation::render_confirmation(out, prompt, width, rows.saturating_sub(3))?;
        }

        out.flush()
    }
}

/// Card models for every known service, in display order.
pub fn cards(state: &DashboardState, ui: &CardUIState) -> Vec<CardModel> {
    state
        .records
        .iter()
        .map(|r| CardModel::from_record(r, ui.expanded.contains(&r.service)))
        .collect()
}

/// Card index range `[start, end)` that fits `available` rows and includes `selected`.
fn visible_range(heights: &[usize], selected: usize, available: usize) -> (usize, usize) {
    let mut start = 0;
    while start < selected && heights[start..=selected].iter().sum::<usize>() > available {
        start += 1;
    }

    let mut end = selected + 1;
    let mut used: usize = heights[start..end].iter().sum();
    while end < heights.len() && used + heights[end] <= available {
        used += heights[end];
        end += 1;
    }
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContainerState, Observation, ServiceRecord};
    use crate::store::Notice;
    use crate::test_support::container;

    fn state(names: &[&str]) -> DashboardState {
        DashboardState {
            records: names
                .iter()
                .map(|n| ServiceRecord {
                    observation: Observation::Present(container(n, ContainerState::Running)),
                    ..ServiceRecord::new(*n)
                })
                .collect(),
            notice: None,
        }
    }

    fn render(state: &DashboardState, ui: &CardUIState, confirmation: Option<&str>, rows: u16) -> String {
        let view = DashboardView {
            state,
            ui,
            api_url: "http://localhost:5000",
            time: "09:00:00",
            confirmation,
        };
        let mut buf = Vec::new();
        Presenter::render_dashboard(&mut buf, &view, 120, rows).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn one_card_per_service() {
        let state = state(&["immich", "jellyfin", "nextcloud"]);
        let ui = CardUIState::default();
        assert_eq!(cards(&state, &ui).len(), 3);

        let text = render(&state, &ui, None, 40);
        for title in ["IMMICH", "JELLYFIN", "NEXTCLOUD"] {
            assert_eq!(text.matches(title).count(), 1, "{}", title);
        }
        assert!(text.contains("3/3 running"));
    }

    #[test]
    fn empty_dashboard_explains_itself() {
        let text = render(&DashboardState::default(), &CardUIState::default(), None, 24);
        assert!(text.contains("No services yet"));
    }

    #[test]
    fn notice_and_confirmation_are_drawn() {
        let mut state = state(&["immich"]);
        state.notice = Some(Notice::info("Stopping immich..."));
        let text = render(&state, &CardUIState::default(), Some("Take down immich?"), 24);
        assert!(text.contains("Stopping immich..."));
        assert!(text.contains("Take down immich? (y to confirm"));
    }

    #[test]
    fn small_terminal_scrolls_to_selection() {
        let state = state(&["a", "b", "c", "d", "e", "f"]);
        let ui = CardUIState {
            selected_index: 5,
            ..Default::default()
        };
        // 3 rows per selected card, 2 per other card
        let text = render(&state, &ui, None, 12);
        assert!(text.contains(" F "));
        assert!(!text.contains(" A "));
    }

    #[test]
    fn visible_range_keeps_selection_on_screen() {
        let heights = [2, 2, 3, 2, 2];
        assert_eq!(visible_range(&heights, 0, 100), (0, 5));
        assert_eq!(visible_range(&heights, 2, 5), (1, 3));
        assert_eq!(visible_range(&heights, 4, 4), (3, 5));
        // a card taller than the screen is still shown
        assert_eq!(visible_range(&[2, 9], 1, 4), (1, 2));
    }
}
