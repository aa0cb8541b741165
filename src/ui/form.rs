use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Modifier, Style};
use tui::text::{Span, Spans, Text};
use tui::widgets::{Block, Borders, Clear, Paragraph, StatefulWidget, Widget};

use crate::calendar;
use crate::schedule::{EntryKind, Roster};
use crate::session::EditForm;

use super::context::{Context, Theme};
use super::month::color;
use super::util;

/// Popup editing the day that is currently open in the session.
#[derive(Default)]
pub struct FormView;

const WIDTH: u16 = 40;

fn kind_button<'a>(kind: EntryKind, active: bool, theme: &Theme) -> Span<'a> {
    let style = match (kind, active) {
        (EntryKind::Class, true) => theme.class_stamp_style.add_modifier(Modifier::REVERSED),
        (EntryKind::Rest, true) => theme.rest_stamp_style.add_modifier(Modifier::REVERSED),
        (_, false) => theme.hint_style,
    };
    Span::styled(format!(" {} ", kind.label()), style)
}

fn form_text<'a>(form: &EditForm, roster: &Roster, theme: &Theme) -> Text<'a> {
    let kind = form.kind();
    let mut lines = vec![
        Spans::from(Span::styled("類型", theme.hint_style)),
        Spans::from(vec![
            kind_button(EntryKind::Class, kind == EntryKind::Class, theme),
            Span::raw("  "),
            kind_button(EntryKind::Rest, kind == EntryKind::Rest, theme),
        ]),
        Spans::default(),
    ];

    match kind {
        EntryKind::Class => {
            lines.push(Spans::from(Span::styled("選擇人員", theme.hint_style)));
            if roster.is_empty() {
                lines.push(Spans::from(Span::styled(
                    "尚未設定人員，請在設定檔加入 [[people]]。",
                    theme.notice_style,
                )));
            }
            for (idx, person) in roster.people().iter().enumerate() {
                let present = form.entry().is_present(&person.name);
                let style = if present {
                    Style::default()
                        .fg(color(person.color))
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                lines.push(Spans::from(vec![
                    Span::styled(format!("{} ", idx + 1), theme.hint_style),
                    Span::styled(if present { "[x] " } else { "[ ] " }, style),
                    Span::styled(person.name.clone(), style),
                ]));
            }
        }
        EntryKind::Rest => {
            lines.push(Spans::from(Span::styled(
                "休息模式將隱藏人員。",
                theme.hint_style,
            )));
        }
    }

    lines.push(Spans::default());
    lines.push(Spans::from(Span::styled(
        "Tab 類型  Enter 儲存  x 清除  Esc 取消",
        theme.hint_style,
    )));

    Text::from(lines)
}

impl StatefulWidget for FormView {
    type State = Context;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let session = state.session();
        let form = match session.form() {
            Some(form) => form,
            None => return,
        };

        let theme = state.tui_context().theme();
        let text = form_text(form, session.roster(), theme);
        let popup = util::center_in(WIDTH, text.height() as u16 + 2, &area);

        Clear.render(popup, buf);
        Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.focus_style)
                    .title(Span::styled(
                        format!("設定：{}", calendar::display_label(form.date())),
                        theme.title_style,
                    )),
            )
            .render(popup, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarDate;
    use crate::config::Config;
    use crate::session::Session;

    fn plain(text: &Text) -> Vec<String> {
        text.lines
            .iter()
            .map(|spans| spans.0.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    fn session() -> Session {
        let start = CalendarDate::from_ymd0(2024, 2, 1).unwrap();
        Session::new(&Config::default(), start)
    }

    #[test]
    fn class_form_lists_roster() {
        let mut session = session();
        session
            .open_day(CalendarDate::from_ymd0(2024, 2, 15).unwrap())
            .toggle_person("OLLIE");

        let text = form_text(
            session.form().unwrap(),
            session.roster(),
            &Theme::default(),
        );
        let lines = plain(&text);

        assert_eq!(lines[3], "選擇人員");
        assert_eq!(lines[4], "1 [ ] CHARLES");
        assert_eq!(lines[5], "2 [x] OLLIE");
    }

    #[test]
    fn rest_form_hides_roster() {
        let mut session = session();
        session
            .open_day(CalendarDate::from_ymd0(2024, 2, 15).unwrap())
            .set_kind(EntryKind::Rest);

        let text = form_text(
            session.form().unwrap(),
            session.roster(),
            &Theme::default(),
        );

        assert_eq!(plain(&text)[3], "休息模式將隱藏人員。");
        assert_eq!(text.height(), 6);
    }

    #[test]
    fn empty_roster_is_explained() {
        let config = Config {
            people: Vec::new(),
            ..Config::default()
        };
        let mut session = Session::new(&config, CalendarDate::from_ymd0(2024, 2, 1).unwrap());
        session.open_day(CalendarDate::from_ymd0(2024, 2, 15).unwrap());

        let text = form_text(
            session.form().unwrap(),
            session.roster(),
            &Theme::default(),
        );
        let lines = plain(&text);

        assert_eq!(lines[3], "選擇人員");
        assert_eq!(lines[4], "尚未設定人員，請在設定檔加入 [[people]]。");
        assert_eq!(text.height(), 7);
    }

    #[test]
    fn renders_nothing_without_form() {
        let mut context = Context::new(session());
        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);

        FormView::default().render(area, &mut buf, &mut context);
        assert_eq!(buf, Buffer::empty(area));
    }
}
