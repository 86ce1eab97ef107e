use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub text: Style,
    pub selection: Style,
    pub footer: Style,
    pub footer_enabled: Style,
    pub footer_disabled: Style,
    pub tooltip_border: Style,
    pub tooltip_text: Style,
    pub tooltip_loading: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text: Style::default().fg(Color::White),
            selection: Style::default().fg(Color::Yellow).bg(Color::DarkGray),
            footer: Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
            footer_enabled: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            footer_disabled: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            tooltip_border: Style::default().fg(Color::Magenta).bg(Color::Black),
            tooltip_text: Style::default().fg(Color::White).bg(Color::Black),
            tooltip_loading: Style::default().fg(Color::Gray).bg(Color::Black).add_modifier(Modifier::ITALIC),
        }
    }
}
