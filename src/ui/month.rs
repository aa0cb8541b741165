use tui::buffer::Buffer;
use tui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Span, Spans, Text};
use tui::widgets::{Block, Borders, Paragraph, StatefulWidget, Widget};

use crate::calendar::{CalendarCell, CalendarDate, WEEKDAY_LABELS};
use crate::config::HexColor;
use crate::schedule::{EntryKind, Roster, ScheduleEntry};

use super::context::{Context, Theme};

pub(crate) fn color(color: HexColor) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

pub struct DayCell<'a> {
    date: CalendarDate,
    entry: Option<&'a ScheduleEntry>,
    roster: &'a Roster,
    selected: bool,
    is_today: bool,
}

/// The displayed month of the session as a grid of day cells.
#[derive(Default)]
pub struct MonthView;

impl<'a> DayCell<'a> {
    pub fn new(date: CalendarDate, roster: &'a Roster) -> Self {
        DayCell {
            date,
            entry: None,
            roster,
            selected: false,
            is_today: false,
        }
    }

    pub fn entry(mut self, entry: Option<&'a ScheduleEntry>) -> Self {
        self.entry = entry;
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn today(mut self, is_today: bool) -> Self {
        self.is_today = is_today;
        self
    }

    fn text(&self, theme: &Theme) -> Text<'a> {
        let day_style = if self.date.is_weekend() {
            theme.weekend_style
        } else {
            theme.day_style
        };

        let mut first = vec![Span::styled(
            self.date.day().to_string(),
            day_style.add_modifier(Modifier::BOLD),
        )];
        if self.is_today {
            if let Some(symbol) = theme.today_symbol {
                first.push(Span::styled(symbol.to_string(), day_style));
            }
        }

        let mut lines = vec![Spans::from(first)];

        if let Some(entry) = self.entry {
            if entry.shows_stamp_glyph() {
                let style = match entry.kind {
                    EntryKind::Rest => theme.rest_stamp_style,
                    EntryKind::Class => theme.class_stamp_style,
                };
                lines.push(Spans::from(Span::styled(
                    format!("({})", entry.kind.stamp()),
                    style,
                )));
            }

            lines.extend(entry.attendees(self.roster).into_iter().map(|person| {
                Spans::from(Span::styled(
                    person.name.clone(),
                    Style::default()
                        .fg(color(person.color))
                        .add_modifier(Modifier::BOLD),
                ))
            }));
        }

        Text::from(lines)
    }

    fn render(self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let border_style = if self.selected {
            theme.focus_style.add_modifier(Modifier::BOLD)
        } else {
            theme.padding_style
        };

        Paragraph::new(self.text(theme))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style),
            )
            .render(area, buf);
    }
}

impl MonthView {
    fn columns(area: Rect) -> Vec<Rect> {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, 7); 7])
            .split(area)
    }
}

impl StatefulWidget for MonthView {
    type State = Context;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let theme = state.tui_context().theme().clone();
        let session = state.session();
        let cells = session.cells();
        let rows = (cells.len() + 6) / 7;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)].as_ref())
            .split(area);

        for (col, (label, label_area)) in WEEKDAY_LABELS
            .iter()
            .zip(Self::columns(chunks[0]))
            .enumerate()
        {
            let style = if col >= 5 {
                theme.weekend_style
            } else {
                theme.weekday_style
            };
            Paragraph::new(Span::styled(*label, style))
                .alignment(Alignment::Center)
                .render(label_area, buf);
        }

        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
            .split(chunks[1]);

        let cursor = *state.cursor();
        let today = state.tui_context().today;
        let mut day_areas = Vec::with_capacity(cells.len());

        for (row, row_area) in cells.chunks(7).zip(row_areas) {
            for (cell, cell_area) in row.iter().zip(Self::columns(row_area)) {
                match cell {
                    CalendarCell::Empty => Block::default()
                        .borders(Borders::ALL)
                        .border_style(theme.padding_style.add_modifier(Modifier::DIM))
                        .render(cell_area, buf),
                    CalendarCell::Day(date) => {
                        DayCell::new(*date, session.roster())
                            .entry(session.entry(date))
                            .selected(*date == cursor)
                            .today(Some(*date) == today)
                            .render(cell_area, buf, &theme);
                        day_areas.push((cell_area, *date));
                    }
                }
            }
        }

        state.tui_context_mut().day_areas = day_areas;
    }
}
