use std::collections::HashSet;

/// Cursor and expansion state of the card list.
#[derive(Default)]
pub struct CardUIState {
    pub selected_index: usize,
    pub total_rows: usize,
    pub expanded: HashSet<String>,
}

impl CardUIState {
    /// Keep the cursor inside the list after it shrinks or grows.
    pub fn clamp(&mut self, total: usize) {
        self.total_rows = total;
        if self.selected_index >= total && total > 0 {
            self.selected_index = total - 1;
        }
        if total == 0 {
            self.selected_index = 0;
        }
    }

    pub fn toggle_expanded(&mut self, service: &str) {
        if !self.expanded.remove(service) {
            self.expanded.insert(service.to_string());
        }
    }
}
