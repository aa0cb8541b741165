use crate::calendar::{self, CalendarCell, CalendarDate, WEEKDAY_LABELS};
use crate::config::HexColor;
use crate::schedule::{EntryKind, Roster, ScheduleStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TitleField {
    /// Title while it is being edited, with the caret as a char index.
    Editable { text: String, caret: usize },
    Static(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub color: HexColor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DayView {
    pub day: u32,
    pub weekend: bool,
    pub stamp: Option<EntryKind>,
    pub tags: Vec<Tag>,
}

/// Owned snapshot of everything the exported image shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    pub title: TitleField,
    pub title_padding: u32,
    pub month_label: String,
    pub weekdays: [&'static str; 7],
    pub cells: Vec<Option<DayView>>,
}

impl TitleField {
    pub fn text(&self) -> &str {
        match self {
            TitleField::Editable { text, .. } => text,
            TitleField::Static(text) => text,
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, TitleField::Editable { .. })
    }
}

impl DayView {
    fn new(date: &CalendarDate, store: &ScheduleStore, roster: &Roster) -> Self {
        let entry = store.get(&date.key());

        DayView {
            day: date.day(),
            weekend: date.is_weekend(),
            stamp: entry
                .filter(|entry| entry.shows_stamp_glyph())
                .map(|entry| entry.kind),
            tags: entry
                .map(|entry| {
                    entry
                        .attendees(roster)
                        .into_iter()
                        .map(|person| Tag {
                            name: person.name.clone(),
                            color: person.color,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl Surface {
    pub fn from_month(
        title: TitleField,
        month: &CalendarDate,
        store: &ScheduleStore,
        roster: &Roster,
    ) -> Self {
        let cells = calendar::days_in_month(month)
            .iter()
            .map(|cell| match cell {
                CalendarCell::Empty => None,
                CalendarCell::Day(date) => Some(DayView::new(date, store, roster)),
            })
            .collect();

        Surface {
            title,
            title_padding: 0,
            month_label: calendar::month_label(month),
            weekdays: WEEKDAY_LABELS,
            cells,
        }
    }

    pub fn rows(&self) -> usize {
        (self.cells.len() + 6) / 7
    }
}

/// Pre-capture hook of the default export: the editable title is replaced by
/// its static text, which gets extra top padding.
pub fn static_title(surface: &mut Surface) {
    if surface.title.is_editable() {
        surface.title = TitleField::Static(surface.title.text().to_owned());
    }
    surface.title_padding += 10;
}
