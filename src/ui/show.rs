use itertools::Itertools;

use crate::calendar::{self, CalendarCell, WEEKDAY_LABELS};
use crate::schedule::ScheduleEntry;
use crate::session::Session;

fn marker(entry: Option<&ScheduleEntry>) -> &'static str {
    match entry {
        None => "  ",
        Some(entry) if entry.shows_stamp_glyph() => entry.kind.stamp(),
        Some(_) => "＋",
    }
}

/// The displayed month as plain text, followed by one line per scheduled day.
pub fn render_month(session: &Session) -> String {
    let month = session.displayed_month();
    let cells = session.cells();

    let mut lines = vec![
        session.title().to_owned(),
        calendar::month_label(month),
        String::new(),
        WEEKDAY_LABELS.iter().map(|label| format!("  {}", label)).join(" "),
    ];

    lines.extend(cells.chunks(7).map(|row| {
        row.iter()
            .map(|cell| match cell {
                CalendarCell::Empty => "    ".to_owned(),
                CalendarCell::Day(date) => {
                    format!("{:>2}{}", date.day(), marker(session.entry(date)))
                }
            })
            .join(" ")
            .trim_end()
            .to_owned()
    }));

    let scheduled: Vec<String> = cells
        .iter()
        .filter_map(CalendarCell::date)
        .filter_map(|date| session.entry(date).map(|entry| (date, entry)))
        .map(|(date, entry)| {
            let attendees = entry
                .attendees(session.roster())
                .iter()
                .map(|person| person.name.as_str())
                .join(", ");

            format!(
                "{}  {}  {}",
                calendar::display_label(date),
                entry.kind.label(),
                attendees
            )
            .trim_end()
            .to_owned()
        })
        .collect();

    if !scheduled.is_empty() {
        lines.push(String::new());
        lines.extend(scheduled);
    }

    lines.join("\n")
}
