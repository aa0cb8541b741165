use std::result::Result;

use nom::{
    character::complete::{alpha1, digit0, space1},
    combinator::{all_consuming, rest},
    error::{Error, ErrorKind, ParseError},
    sequence::{pair, separated_pair},
    Err, IResult,
};

use super::context::Context;
use crate::calendar;

pub struct CommandParser<'a> {
    context: &'a mut Context,
}

/// Parses a command name and looks it up in `c`.
pub fn match_action<'a, 's, T: ?Sized, Act: 's>(
    c: &'a T,
) -> impl Fn(&str) -> IResult<&str, (&'s str, &'s Act)> + 'a
where
    &'a T: IntoIterator<Item = &'s (&'s str, Act)>,
{
    move |input| {
        let (remaining, name) = alpha1(input)?;

        if let Some((name, act)) = c.into_iter().find(|(known, _)| *known == name) {
            Ok((remaining, (*name, act)))
        } else {
            Err(Err::Error(ParseError::from_error_kind(input, ErrorKind::Tag)))
        }
    }
}

fn error(input: &str, kind: ErrorKind) -> Error<String> {
    ParseError::from_error_kind(input.to_owned(), kind)
}

impl<'a> CommandParser<'a> {
    pub fn new(context: &'a mut Context) -> Self {
        CommandParser { context }
    }

    pub fn run_command(&mut self, cmd: &str) -> ActionResult {
        let cmd = cmd.trim();
        log::debug!("Running command '{}'", cmd);

        let res = all_consuming(pair(digit0, match_action(COMMANDS)))(cmd);

        if let Ok((_, (repeat, (_, Action::Repeatable(act))))) = res {
            let repeats = if repeat.is_empty() {
                1
            } else {
                repeat
                    .parse::<u32>()
                    .map_err(|_| error(repeat, ErrorKind::Digit))?
            };

            return act(self.context, repeats);
        }

        let res = all_consuming(separated_pair(match_action(COMMANDS), space1, rest))(cmd);

        if let Ok((_, ((_, act), arg))) = res {
            return match act {
                Action::Arg(a) => a(self.context, arg.trim().to_owned()),
                _ => Err(error(cmd, ErrorKind::Eof)),
            };
        }

        let (_, (_, act)) =
            all_consuming(match_action(COMMANDS))(cmd).map_err(|_| error(cmd, ErrorKind::Tag))?;

        match act {
            Action::NoArg(a) => a(self.context),
            Action::Repeatable(a) => a(self.context, 1),
            Action::Arg(_) => Err(error(cmd, ErrorKind::Space)),
        }
    }
}

pub type ActionResult = Result<(), Error<String>>;

pub enum Action {
    Arg(fn(&mut Context, String) -> ActionResult),
    NoArg(fn(&mut Context) -> ActionResult),
    Repeatable(fn(&mut Context, u32) -> ActionResult),
}

const COMMANDS: &[(&str, Action)] = &[
    (
        "gm",
        Action::Repeatable(|c, p| {
            c.change_month(p as i64);
            Ok(())
        }),
    ),
    (
        "gM",
        Action::Repeatable(|c, p| {
            c.change_month(-(p as i64));
            Ok(())
        }),
    ),
    (
        "gw",
        Action::Repeatable(|c, p| {
            c.move_cursor(7 * p as i64);
            Ok(())
        }),
    ),
    (
        "gW",
        Action::Repeatable(|c, p| {
            c.move_cursor(-7 * p as i64);
            Ok(())
        }),
    ),
    (
        "gd",
        Action::Repeatable(|c, p| {
            c.move_cursor(p as i64);
            Ok(())
        }),
    ),
    (
        "gD",
        Action::Repeatable(|c, p| {
            c.move_cursor(-(p as i64));
            Ok(())
        }),
    ),
    (
        "today",
        Action::NoArg(|c| {
            c.select_today();
            Ok(())
        }),
    ),
    (
        "goto",
        Action::Arg(|c, arg| {
            let month = calendar::parse_month(&arg).map_err(|_| error(&arg, ErrorKind::Verify))?;
            c.select(month);
            Ok(())
        }),
    ),
    (
        "title",
        Action::Arg(|c, arg| {
            c.session_mut().set_title(arg);
            Ok(())
        }),
    ),
    (
        "export",
        Action::NoArg(|c| {
            c.request_export();
            Ok(())
        }),
    ),
    (
        "w",
        Action::NoArg(|c| {
            c.request_export();
            Ok(())
        }),
    ),
    (
        "clear",
        Action::NoArg(|c| {
            let cursor = *c.cursor();
            c.session_mut().clear_day(&cursor);
            Ok(())
        }),
    ),
    (
        "q",
        Action::NoArg(|c| {
            c.tui_context_mut().quit = true;
            Ok(())
        }),
    ),
    (
        "quit",
        Action::NoArg(|c| {
            c.tui_context_mut().quit = true;
            Ok(())
        }),
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarDate;
    use crate::config::Config;
    use crate::schedule::{EntryKind, ScheduleEntry};
    use crate::session::Session;

    fn context() -> Context {
        let start = CalendarDate::from_ymd0(2024, 2, 1).unwrap();
        let mut context = Context::new(Session::new(&Config::default(), start));
        context.select(CalendarDate::from_ymd0(2024, 2, 10).unwrap());
        context
    }

    fn date(year: i32, month0: u32, day: u32) -> CalendarDate {
        CalendarDate::from_ymd0(year, month0, day).unwrap()
    }

    #[test]
    fn repeat_prefix() {
        let mut context = context();
        CommandParser::new(&mut context).run_command("3gd").unwrap();
        assert_eq!(context.cursor(), &date(2024, 2, 13));

        CommandParser::new(&mut context).run_command("gW").unwrap();
        assert_eq!(context.cursor(), &date(2024, 2, 6));
    }

    #[test]
    fn month_jumps_carry_years() {
        let mut context = context();
        CommandParser::new(&mut context).run_command("10gm").unwrap();
        assert_eq!(context.session().displayed_month(), &date(2025, 0, 1));
        assert_eq!(context.cursor(), &date(2025, 0, 10));

        CommandParser::new(&mut context).run_command(" 13gM ").unwrap();
        assert_eq!(context.session().displayed_month(), &date(2023, 11, 1));
    }

    #[test]
    fn huge_month_counts_clamp_to_range() {
        let mut context = context();
        CommandParser::new(&mut context)
            .run_command("2147483648gM")
            .unwrap();
        assert_eq!(
            context.session().displayed_month(),
            &date(CalendarDate::MIN_YEAR, 0, 1)
        );
        assert_eq!(context.cursor(), &date(CalendarDate::MIN_YEAR, 0, 10));

        CommandParser::new(&mut context)
            .run_command("3000000000gm")
            .unwrap();
        assert_eq!(
            context.session().displayed_month(),
            &date(CalendarDate::MAX_YEAR, 11, 1)
        );

        CommandParser::new(&mut context)
            .run_command("4294967295gm")
            .unwrap();
        assert_eq!(context.session().displayed_month().year(), CalendarDate::MAX_YEAR);
    }

    #[test]
    fn huge_day_counts_keep_cursor() {
        let mut context = context();
        CommandParser::new(&mut context)
            .run_command("4000000000gd")
            .unwrap();
        assert_eq!(context.cursor(), &date(2024, 2, 10));

        CommandParser::new(&mut context)
            .run_command("4294967295gW")
            .unwrap();
        assert_eq!(context.cursor(), &date(2024, 2, 10));
        assert_eq!(context.session().displayed_month(), &date(2024, 2, 1));
    }

    #[test]
    fn goto_and_title_take_arguments() {
        let mut context = context();
        CommandParser::new(&mut context)
            .run_command("goto 2023-07")
            .unwrap();
        assert_eq!(context.session().displayed_month(), &date(2023, 6, 1));

        CommandParser::new(&mut context)
            .run_command("title 七月 課表")
            .unwrap();
        assert_eq!(context.session().title(), "七月 課表");
    }

    #[test]
    fn goto_rejects_bad_month() {
        let mut context = context();
        let err = CommandParser::new(&mut context)
            .run_command("goto 2023-13")
            .unwrap_err();

        assert_eq!(err.input, "2023-13");
        assert_eq!(context.session().displayed_month(), &date(2024, 2, 1));
    }

    #[test]
    fn argument_mismatches() {
        let mut context = context();
        assert!(CommandParser::new(&mut context).run_command("goto").is_err());
        assert!(CommandParser::new(&mut context)
            .run_command("today 2024")
            .is_err());
        assert!(CommandParser::new(&mut context).run_command("2today").is_err());
        assert!(CommandParser::new(&mut context).run_command("nope").is_err());
        assert!(CommandParser::new(&mut context).run_command("").is_err());
    }

    #[test]
    fn export_is_requested() {
        let mut context = context();
        CommandParser::new(&mut context).run_command("w").unwrap();
        assert!(context.take_export_request());
        assert!(!context.take_export_request());

        CommandParser::new(&mut context).run_command("export").unwrap();
        assert!(context.take_export_request());
    }

    #[test]
    fn clear_removes_selected_day() {
        let mut context = context();
        let selected = *context.cursor();
        context.session_mut().open_day(selected).set_kind(EntryKind::Rest);
        context.session_mut().save();
        assert_eq!(
            context.session().entry(&selected).map(ScheduleEntry::is_rest),
            Some(true)
        );

        CommandParser::new(&mut context).run_command("clear").unwrap();
        assert_eq!(context.session().entry(&selected), None);
    }

    #[test]
    fn quit() {
        let mut context = context();
        CommandParser::new(&mut context).run_command("quit").unwrap();
        assert!(context.tui_context().quit);
    }
}
