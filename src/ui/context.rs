use chrono::Local;
use tui::layout::Rect;
use tui::style::{Color, Modifier, Style};

use crate::calendar::CalendarDate;
use crate::export::TitleField;
use crate::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Edit,
    Title,
    Command,
}

#[derive(Clone, Debug)]
pub struct Theme {
    pub title_style: Style,
    pub month_label_style: Style,
    pub weekday_style: Style,
    pub day_style: Style,
    pub weekend_style: Style,
    pub focus_style: Style,
    pub today_symbol: Option<char>,
    pub padding_style: Style,
    pub class_stamp_style: Style,
    pub rest_stamp_style: Style,
    pub hint_style: Style,
    pub notice_style: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            title_style: Style::default().add_modifier(Modifier::BOLD),
            month_label_style: Style::default().fg(Color::Yellow),
            weekday_style: Style::default().fg(Color::Gray),
            day_style: Style::default().fg(Color::DarkGray),
            weekend_style: Style::default().fg(Color::Red),
            focus_style: Style::default().fg(Color::Blue),
            today_symbol: Some('*'),
            padding_style: Style::default().fg(Color::DarkGray),
            class_stamp_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            rest_stamp_style: Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            hint_style: Style::default().fg(Color::DarkGray),
            notice_style: Style::default().fg(Color::Yellow),
        }
    }
}

/// Single line text buffer with a caret, counted in chars.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineEdit {
    text: String,
    caret: usize,
}

impl LineEdit {
    pub fn with_text(text: &str) -> Self {
        LineEdit {
            text: text.to_owned(),
            caret: text.chars().count(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    fn byte_offset(&self, caret: usize) -> usize {
        self.text
            .char_indices()
            .nth(caret)
            .map_or(self.text.len(), |(idx, _)| idx)
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_offset(self.caret);
        self.text.insert(at, c);
        self.caret += 1;
    }

    pub fn delete_backwards(&mut self) {
        if self.caret > 0 {
            self.caret -= 1;
            let at = self.byte_offset(self.caret);
            self.text.remove(at);
        }
    }

    pub fn delete_forwards(&mut self) {
        if self.caret < self.text.chars().count() {
            let at = self.byte_offset(self.caret);
            self.text.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.caret = self.caret.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.caret = (self.caret + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.caret = 0;
    }

    pub fn end(&mut self) {
        self.caret = self.text.chars().count();
    }

    /// Takes the text out and resets the buffer.
    pub fn finish_line(&mut self) -> String {
        self.caret = 0;
        std::mem::take(&mut self.text)
    }
}

pub struct TuiContext {
    pub mode: Mode,
    pub theme: Theme,
    pub cursor: CalendarDate,
    pub today: Option<CalendarDate>,
    pub command_line: LineEdit,
    pub title_line: LineEdit,
    pub notice: Option<String>,
    /// Screen areas of the day cells from the last frame.
    pub day_areas: Vec<(Rect, CalendarDate)>,
    pub export_requested: bool,
    pub quit: bool,
}

impl TuiContext {
    pub fn new(cursor: CalendarDate) -> Self {
        TuiContext {
            mode: Mode::Normal,
            theme: Theme::default(),
            cursor,
            today: CalendarDate::from_naive(Local::now().date_naive()),
            command_line: LineEdit::default(),
            title_line: LineEdit::default(),
            notice: None,
            day_areas: Vec::new(),
            export_requested: false,
            quit: false,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Day under the terminal position `(x, y)`, 0-based.
    pub fn day_at(&self, x: u16, y: u16) -> Option<CalendarDate> {
        self.day_areas
            .iter()
            .find(|(area, _)| {
                x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
            })
            .map(|(_, date)| *date)
    }
}

pub struct Context {
    tui_context: TuiContext,
    session: Session,
}

impl Context {
    pub fn new(session: Session) -> Self {
        let displayed = *session.displayed_month();
        let mut tui_context = TuiContext::new(displayed);
        if let Some(today) = tui_context.today.filter(|t| t.same_month(&displayed)) {
            tui_context.cursor = today;
        }

        Context {
            tui_context,
            session,
        }
    }

    pub fn tui_context(&self) -> &TuiContext {
        &self.tui_context
    }

    pub fn tui_context_mut(&mut self) -> &mut TuiContext {
        &mut self.tui_context
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn mode(&self) -> Mode {
        self.tui_context.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.tui_context.mode = mode;
    }

    pub fn cursor(&self) -> &CalendarDate {
        &self.tui_context.cursor
    }

    /// Moves the selected day; the displayed month follows it.
    pub fn select(&mut self, date: CalendarDate) {
        self.tui_context.cursor = date;
        self.session.show_month(&date);
    }

    pub fn move_cursor(&mut self, days: i64) {
        let date = self.tui_context.cursor.add_days(days);
        self.select(date);
    }

    pub fn select_today(&mut self) {
        if let Some(today) = self.tui_context.today {
            self.select(today);
        }
    }

    /// Changes the displayed month and keeps the selection inside it.
    pub fn change_month(&mut self, offset: i64) {
        self.session.change_month(offset);
        let displayed = *self.session.displayed_month();
        let cursor = &self.tui_context.cursor;
        let last = crate::calendar::days_of_month(&displayed);

        self.tui_context.cursor = CalendarDate::from_ymd0(
            displayed.year(),
            displayed.month0(),
            cursor.day().min(last),
        )
        .unwrap_or(displayed);
    }

    pub fn open_day(&mut self, date: CalendarDate) {
        self.select(date);
        self.session.open_day(date);
        self.tui_context.mode = Mode::Edit;
    }

    pub fn close_form(&mut self) {
        self.session.cancel();
        self.tui_context.mode = Mode::Normal;
    }

    pub fn begin_title_edit(&mut self) {
        self.tui_context.title_line = LineEdit::with_text(self.session.title());
        self.tui_context.mode = Mode::Title;
    }

    pub fn commit_title(&mut self) {
        let title = self.tui_context.title_line.finish_line();
        self.session.set_title(title);
        self.tui_context.mode = Mode::Normal;
    }

    /// The title as currently shown, editable while it is being edited.
    pub fn title_field(&self) -> TitleField {
        match self.tui_context.mode {
            Mode::Title => TitleField::Editable {
                text: self.tui_context.title_line.as_str().to_owned(),
                caret: self.tui_context.title_line.caret(),
            },
            _ => TitleField::Static(self.session.title().to_owned()),
        }
    }

    pub fn update(&mut self) {
        self.tui_context.today = CalendarDate::from_naive(Local::now().date_naive());
    }

    pub fn request_export(&mut self) {
        self.tui_context.export_requested = true;
    }

    pub fn take_export_request(&mut self) -> bool {
        std::mem::take(&mut self.tui_context.export_requested)
    }

    pub fn notify(&mut self, notice: &str) {
        self.tui_context.notice = Some(notice.to_owned());
    }

    pub fn dismiss_notice(&mut self) {
        self.tui_context.notice = None;
    }
}
