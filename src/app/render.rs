use std::io;

use crate::view::{DashboardView, Presenter};

use super::App;

pub fn render(app: &mut App) -> io::Result<()> {
    let (cols, rows) = crossterm::terminal::size()?;
    let time = chrono::Local::now().format("%H:%M:%S").to_string();
    let state = app.monitor.snapshot();

    let view = DashboardView {
        state: &state,
        ui: &app.monitor.ui_state,
        api_url: &app.options.api_url,
        time: &time,
        confirmation: app.pending_action.as_ref().map(|pa| pa.description.as_str()),
    };

    let mut out = io::stdout();
    Presenter::render_dashboard(&mut out, &view, cols, rows)
}
