use std::sync::mpsc::Sender;

use termion::event::{Event as TermEvent, Key, MouseButton, MouseEvent};
use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use tui::text::{Span, Spans};
use tui::widgets::Paragraph;
use tui::{Frame, Terminal};

use crate::calendar;
use crate::events::{Dispatcher, Event};
use crate::export;
use crate::schedule::EntryKind;
use crate::session::{Capability, Session};

use super::command::CommandParser;
use super::context::{Context, Mode};
use super::form::FormView;
use super::month::MonthView;

pub const LOADING_NOTICE: &str = "載入中，請稍候...";
pub const EXPORT_FAILED_NOTICE: &str = "圖片匯出失敗";

const NORMAL_HINT: &str = "hjkl 移動  Enter 編輯  [ ] 換月  t 標題  e 匯出  : 指令  q 離開";
const TITLE_HINT: &str = "Enter 確定  Esc 取消  Ctrl-e 匯出";

pub struct App {
    context: Context,
}

/// Column offset of `text` centered in `width`, the way `Paragraph` centers it.
fn centered_offset(width: u16, text: &str) -> u16 {
    let text_width = Span::raw(text).width() as u16;
    width.saturating_sub(text_width) / 2
}

fn draw_header<B: Backend>(f: &mut Frame<B>, area: Rect, context: &Context) {
    let theme = context.tui_context().theme();
    let title = context.title_field();

    let header = Paragraph::new(vec![
        Spans::from(Span::styled(title.text().to_owned(), theme.title_style)),
        Spans::from(Span::styled(
            calendar::month_label(context.session().displayed_month()),
            theme.month_label_style,
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(header, area);

    if context.mode() == Mode::Title {
        let line = &context.tui_context().title_line;
        let before: String = line.as_str().chars().take(line.caret()).collect();
        let x = area.x
            + centered_offset(area.width, line.as_str())
            + Span::raw(before).width() as u16;
        f.set_cursor(x.min(area.x + area.width.saturating_sub(1)), area.y);
    }
}

fn status_line(context: &Context) -> Spans<'static> {
    let tui_context = context.tui_context();
    let theme = tui_context.theme();

    if let Some(notice) = &tui_context.notice {
        return Spans::from(Span::styled(notice.clone(), theme.notice_style));
    }

    let hint = match context.mode() {
        Mode::Title => TITLE_HINT,
        _ => NORMAL_HINT,
    };
    let mut spans = vec![Span::styled(hint, theme.hint_style)];

    if let Capability::Loading = context.session().capability() {
        spans.push(Span::styled("  字型載入中", theme.hint_style));
    }

    let pending = context.session().pending_exports();
    if pending > 0 {
        spans.push(Span::styled(
            format!("  匯出中 ({})", pending),
            theme.notice_style,
        ));
    }

    Spans::from(spans)
}

fn draw_status<B: Backend>(f: &mut Frame<B>, area: Rect, context: &Context) {
    if context.mode() == Mode::Command {
        let line = &context.tui_context().command_line;
        let before: String = line.as_str().chars().take(line.caret()).collect();

        f.render_widget(Paragraph::new(format!(":{}", line.as_str())), area);
        f.set_cursor(area.x + 1 + Span::raw(before).width() as u16, area.y);
    } else {
        f.render_widget(Paragraph::new(status_line(context)), area);
    }
}

pub fn draw<B: Backend>(f: &mut Frame<B>, context: &mut Context) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.size());

    draw_header(f, layout[0], context);
    f.render_stateful_widget(MonthView::default(), layout[1], context);
    draw_status(f, layout[2], context);

    if context.mode() == Mode::Edit {
        f.render_stateful_widget(FormView::default(), f.size(), context);
    }
}

impl App {
    pub fn new(session: Session) -> Self {
        App {
            context: Context::new(session),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn run<B: Backend>(
        &mut self,
        dispatcher: Dispatcher,
        terminal: &mut Terminal<B>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        while !self.context.tui_context().quit {
            let context = &mut self.context;
            terminal.draw(|f| draw(f, context))?;

            let event = dispatcher.next()?;
            self.handle(event, dispatcher.event_sink());
        }

        Ok(())
    }

    pub fn handle(&mut self, event: Event, sink: &Sender<Event>) {
        match event {
            Event::Update => self.context.update(),
            Event::Input(input) => {
                self.handle_input(input);
                if self.context.take_export_request() {
                    self.export(sink);
                }
            }
            Event::CapabilityLoaded(loaded) => {
                self.context.session_mut().set_capability(loaded);
            }
            Event::Exported(result) => {
                self.context.session_mut().export_finished();
                match result {
                    Ok(path) => self
                        .context
                        .notify(&format!("已匯出 {}", path.display())),
                    Err(_) => self.context.notify(EXPORT_FAILED_NOTICE),
                }
            }
        }
    }

    fn export(&mut self, sink: &Sender<Event>) {
        let title = self.context.title_field();

        match self.context.session_mut().prepare_export(Some(title)) {
            Ok((job, rasterizer)) => {
                let path = job.path.clone();
                match export::spawn(job, rasterizer, sink.clone()) {
                    Ok(_) => self
                        .context
                        .notify(&format!("匯出中 {}", path.display())),
                    Err(err) => {
                        log::error!("Failed to start export: {}", err);
                        self.context.session_mut().export_finished();
                        self.context.notify(EXPORT_FAILED_NOTICE);
                    }
                }
            }
            Err(err) if err.is_unavailable() => {
                log::warn!("Export requested while unavailable: {}", err);
                let notice = match self.context.session().capability() {
                    Capability::Failed(reason) => format!("{}: {}", EXPORT_FAILED_NOTICE, reason),
                    _ => LOADING_NOTICE.to_owned(),
                };
                self.context.notify(&notice);
            }
            Err(err) => {
                log::error!("Export failed: {}", err);
                self.context.notify(EXPORT_FAILED_NOTICE);
            }
        }
    }

    fn handle_input(&mut self, input: TermEvent) {
        match input {
            TermEvent::Key(key) => {
                if self.context.mode() != Mode::Command {
                    self.context.dismiss_notice();
                }
                match self.context.mode() {
                    Mode::Normal => self.normal_key(key),
                    Mode::Edit => self.edit_key(key),
                    Mode::Title => self.title_key(key),
                    Mode::Command => self.command_key(key),
                }
            }
            TermEvent::Mouse(MouseEvent::Press(MouseButton::Left, x, y)) => {
                if self.context.mode() != Mode::Normal {
                    return;
                }
                // termion reports 1-based coordinates
                let hit = self
                    .context
                    .tui_context()
                    .day_at(x.saturating_sub(1), y.saturating_sub(1));
                if let Some(date) = hit {
                    self.context.dismiss_notice();
                    self.context.open_day(date);
                }
            }
            _ => {}
        }
    }

    fn normal_key(&mut self, key: Key) {
        let context = &mut self.context;

        match key {
            Key::Char('q') => context.tui_context_mut().quit = true,
            Key::Char(':') => context.set_mode(Mode::Command),
            Key::Char('h') | Key::Left => context.move_cursor(-1),
            Key::Char('l') | Key::Right => context.move_cursor(1),
            Key::Char('k') | Key::Up => context.move_cursor(-7),
            Key::Char('j') | Key::Down => context.move_cursor(7),
            Key::Char('[') => context.change_month(-1),
            Key::Char(']') => context.change_month(1),
            Key::Char('\n') | Key::Char(' ') => {
                let cursor = *context.cursor();
                context.open_day(cursor);
            }
            Key::Char('t') => context.begin_title_edit(),
            Key::Char('e') => context.request_export(),
            _ => {}
        }
    }

    fn edit_key(&mut self, key: Key) {
        let context = &mut self.context;

        match key {
            Key::Esc => context.close_form(),
            Key::Char('\n') => {
                if let Some(key) = context.session_mut().save() {
                    log::info!("Saved {}", key);
                }
                context.set_mode(Mode::Normal);
            }
            Key::Char('x') | Key::Delete => {
                if let Some(key) = context.session_mut().clear() {
                    log::info!("Cleared {}", key);
                }
                context.set_mode(Mode::Normal);
            }
            Key::Char('\t') => {
                if let Some(form) = context.session_mut().form_mut() {
                    form.toggle_kind();
                }
            }
            Key::Char('c') | Key::Char('r') => {
                let kind = if key == Key::Char('c') {
                    EntryKind::Class
                } else {
                    EntryKind::Rest
                };
                if let Some(form) = context.session_mut().form_mut() {
                    form.set_kind(kind);
                }
            }
            Key::Char(digit @ '1'..='9') => {
                let idx = digit as usize - '1' as usize;
                let roster = context.session().roster().clone();
                if let Some(form) = context.session_mut().form_mut() {
                    form.toggle_nth(&roster, idx);
                }
            }
            _ => {}
        }
    }

    fn title_key(&mut self, key: Key) {
        if key == Key::Ctrl('e') {
            self.context.request_export();
            return;
        }

        let line = &mut self.context.tui_context_mut().title_line;
        match key {
            Key::Esc => self.context.set_mode(Mode::Normal),
            Key::Char('\n') => self.context.commit_title(),
            Key::Backspace => line.delete_backwards(),
            Key::Delete => line.delete_forwards(),
            Key::Left => line.left(),
            Key::Right => line.right(),
            Key::Home => line.home(),
            Key::End => line.end(),
            Key::Char(c) if !c.is_control() => line.insert(c),
            _ => {}
        }
    }

    fn command_key(&mut self, key: Key) {
        let line = &mut self.context.tui_context_mut().command_line;
        match key {
            Key::Esc => {
                line.finish_line();
                self.context.set_mode(Mode::Normal);
            }
            Key::Backspace if line.as_str().is_empty() => self.context.set_mode(Mode::Normal),
            Key::Char('\n') => {
                let cmd = line.finish_line();
                self.context.set_mode(Mode::Normal);
                if let Err(err) = CommandParser::new(&mut self.context).run_command(&cmd) {
                    log::warn!("Command '{}' failed: {}", cmd, err);
                    self.context.notify(&format!("{}", err));
                }
            }
            Key::Backspace => line.delete_backwards(),
            Key::Delete => line.delete_forwards(),
            Key::Left => line.left(),
            Key::Right => line.right(),
            Key::Char(c) if !c.is_control() => line.insert(c),
            _ => {}
        }
    }
}
