use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor},
};

use super::shared::{truncate_str, write_highlighted, writeln};
use crate::model::{Action, ContainerState, Observation, ServiceRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BadgeColor {
    Green,
    Red,
    Orange,
    Gray,
}

impl BadgeColor {
    fn color(self) -> Color {
        match self {
            BadgeColor::Green => Color::Green,
            BadgeColor::Red => Color::Red,
            BadgeColor::Orange => Color::DarkYellow,
            BadgeColor::Gray => Color::DarkGrey,
        }
    }
}

pub fn state_color(state: ContainerState) -> BadgeColor {
    match state {
        ContainerState::Running => BadgeColor::Green,
        ContainerState::Exited => BadgeColor::Red,
        ContainerState::Paused => BadgeColor::Orange,
        _ => BadgeColor::Gray,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Badge {
    pub label: String,
    pub color: BadgeColor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

/// What a card button does when pressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardAction {
    Run(Action),
    Refresh,
}

impl CardAction {
    pub fn key(&self) -> char {
        match self {
            CardAction::Run(action) => action.key(),
            CardAction::Refresh => 'f',
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CardAction::Run(action) => action.label(),
            CardAction::Refresh => "Refresh",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Button {
    pub action: CardAction,
    pub enabled: bool,
}

/// Everything a card shows, derived from one service record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardModel {
    pub service: String,
    pub title: String,
    pub badge: Badge,
    pub loading: bool,
    pub fields: Vec<Field>,
    pub error: Option<String>,
    pub buttons: Vec<Button>,
}

impl CardModel {
    pub fn from_record(record: &ServiceRecord, expanded: bool) -> Self {
        let observation = &record.observation;
        let loading = record.loading();
        let container = observation.container();

        let badge = match observation {
            Observation::Present(c) => Badge {
                label: or_fallback(&c.state_label, "Unknown"),
                color: state_color(c.state),
            },
            Observation::Absent => Badge { label: "DOWN".into(), color: BadgeColor::Gray },
            Observation::NotFetched => Badge { label: "UNKNOWN".into(), color: BadgeColor::Gray },
            Observation::Failed(_) => Badge { label: "ERROR".into(), color: BadgeColor::Red },
        };

        let mut fields = vec![
            Field {
                label: "Service",
                value: container.map_or_else(|| "N/A".into(), |c| or_fallback(&c.service, "N/A")),
            },
            Field {
                label: "State",
                value: container.map_or_else(|| "Unknown".into(), |c| or_fallback(&c.state_label, "Unknown")),
            },
            Field {
                label: "Status",
                value: container.map_or_else(|| "N/A".into(), |c| or_fallback(&c.status, "N/A")),
            },
            Field {
                label: "Size",
                value: container
                    .and_then(|c| c.size.as_deref())
                    .map_or_else(|| "N/A".into(), |s| or_fallback(s, "N/A")),
            },
        ];
        if expanded {
            fields.push(Field {
                label: "Container",
                value: container.map_or_else(|| "N/A".into(), |c| or_fallback(&c.name, "N/A")),
            });
            let ports = container
                .map(|c| c.ports.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            fields.push(Field {
                label: "Ports",
                value: or_fallback(&ports, "none"),
            });
            fields.push(Field {
                label: "Updated",
                value: record
                    .updated_at
                    .map_or_else(|| "never".into(), |t| t.format("%H:%M:%S").to_string()),
            });
        }

        let error = match observation {
            Observation::Failed(message) => Some(message.clone()),
            _ => None,
        };

        let running = observation.is_running();
        let absent = matches!(observation, Observation::Absent);
        let stopped = container.is_some_and(|c| c.state.is_stopped());

        let buttons = Action::SERVICE_ACTIONS
            .iter()
            .map(|&action| {
                let applicable = match action {
                    Action::Up => !running,
                    Action::Start => stopped,
                    Action::Stop => running,
                    Action::Restart | Action::Down => !absent,
                    _ => true,
                };
                Button {
                    action: CardAction::Run(action),
                    enabled: !loading && applicable,
                }
            })
            .chain(std::iter::once(Button {
                action: CardAction::Refresh,
                enabled: !loading,
            }))
            .collect();

        Self {
            service: record.service.clone(),
            title: record.service.to_uppercase(),
            badge,
            loading,
            fields,
            error,
            buttons,
        }
    }

    pub fn button(&self, action: CardAction) -> Option<&Button> {
        self.buttons.iter().find(|b| b.action == action)
    }

    /// Whether pressing `action` on this card would do anything.
    pub fn allows(&self, action: CardAction) -> bool {
        self.button(action).is_some_and(|b| b.enabled)
    }

    /// Screen rows `render_card` uses for this card.
    pub fn height(&self, selected: bool) -> usize {
        let extra_fields = self.fields.len().saturating_sub(BASE_FIELDS);
        2 + extra_fields + usize::from(self.error.is_some()) + usize::from(selected)
    }
}

const BASE_FIELDS: usize = 4;

fn or_fallback(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

pub fn render_card(out: &mut impl Write, card: &CardModel, selected: bool, width: usize) -> io::Result<()> {
    let marker = if selected { '▸' } else { ' ' };
    let title = format!(" {} {:<24}", marker, truncate_str(&card.title, 24));
    queue!(out, SetAttribute(Attribute::Bold))?;
    write_highlighted(out, &title, selected)?;
    queue!(out, SetAttribute(Attribute::Reset))?;

    queue!(out, SetForegroundColor(card.badge.color.color()), SetAttribute(Attribute::Bold))?;
    write!(out, " {} ", card.badge.label)?;
    queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
    if card.loading {
        queue!(out, SetForegroundColor(Color::Yellow))?;
        write!(out, " working...")?;
        queue!(out, ResetColor)?;
    }
    writeln(out, "")?;

    let budget = width.saturating_sub(5);
    let summary = card.fields[..BASE_FIELDS.min(card.fields.len())]
        .iter()
        .map(|f| format!("{}: {}", f.label, f.value))
        .collect::<Vec<_>>()
        .join("  ");
    writeln(out, &format!("     {}", truncate_str(&summary, budget)))?;

    if card.fields.len() > BASE_FIELDS {
        queue!(out, SetForegroundColor(Color::DarkGrey))?;
        for field in &card.fields[BASE_FIELDS..] {
            let line = format!("{:<10} {}", format!("{}:", field.label), field.value);
            writeln(out, &format!("     {}", truncate_str(&line, budget)))?;
        }
        queue!(out, ResetColor)?;
    }

    if let Some(error) = &card.error {
        queue!(out, SetForegroundColor(Color::Red))?;
        writeln(out, &format!("     {}", truncate_str(error, budget)))?;
        queue!(out, ResetColor)?;
    }

    if selected {
        write!(out, "    ")?;
        for button in &card.buttons {
            if button.enabled {
                queue!(out, SetForegroundColor(Color::White))?;
            } else {
                queue!(out, SetForegroundColor(Color::DarkGrey))?;
            }
            write!(out, " [{}] {}", button.action.key(), button.action.label())?;
        }
        queue!(out, ResetColor)?;
        writeln(out, "")?;
    }

    Ok(())
}
