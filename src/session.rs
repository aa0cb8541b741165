use std::sync::Arc;

use crate::calendar::{self, CalendarCell, CalendarDate, DateKey};
use crate::config::{Config, ExportConfig};
use crate::error::{Error, ErrorKind, Result};
use crate::export::raster::CloneHook;
use crate::export::{self, surface, ExportJob, RasterOptions, Rasterize, Surface, TitleField};
use crate::schedule::{EntryKind, Roster, ScheduleEntry, ScheduleStore};

/// State of the rasterization capability, which is loaded in the background.
pub enum Capability {
    Loading,
    Ready(Arc<dyn Rasterize>),
    Failed(String),
}

/// The day currently being edited and the not yet saved entry for it.
#[derive(Clone, Debug, PartialEq)]
pub struct EditForm {
    date: CalendarDate,
    entry: ScheduleEntry,
}

/// Everything one interactive session owns. Nothing outlives it.
pub struct Session {
    store: ScheduleStore,
    roster: Roster,
    export_config: ExportConfig,
    default_kind: EntryKind,
    displayed: CalendarDate,
    title: String,
    form: Option<EditForm>,
    capability: Capability,
    pending_exports: usize,
}

impl EditForm {
    pub fn date(&self) -> &CalendarDate {
        &self.date
    }

    pub fn entry(&self) -> &ScheduleEntry {
        &self.entry
    }

    pub fn kind(&self) -> EntryKind {
        self.entry.kind
    }

    /// Attendee flags survive switching to rest and back.
    pub fn set_kind(&mut self, kind: EntryKind) {
        self.entry.kind = kind;
    }

    pub fn toggle_kind(&mut self) {
        self.set_kind(self.entry.kind.toggled());
    }

    pub fn toggle_person(&mut self, name: &str) {
        self.entry.toggle(name);
    }

    /// Toggles the `idx`th roster member; false if there is none or the
    /// form is in rest mode.
    pub fn toggle_nth(&mut self, roster: &Roster, idx: usize) -> bool {
        if self.entry.is_rest() {
            return false;
        }

        match roster.get(idx) {
            Some(person) => {
                self.entry.toggle(&person.name);
                true
            }
            None => false,
        }
    }
}

impl Session {
    pub fn new(config: &Config, start: CalendarDate) -> Self {
        Session {
            store: ScheduleStore::new(),
            roster: Roster::new(config.people.clone()),
            export_config: config.export.clone(),
            default_kind: config.default_kind,
            displayed: start.first_day(),
            title: config.title.clone(),
            form: None,
            capability: Capability::Loading,
            pending_exports: 0,
        }
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn displayed_month(&self) -> &CalendarDate {
        &self.displayed
    }

    pub fn cells(&self) -> Vec<CalendarCell> {
        calendar::days_in_month(&self.displayed)
    }

    pub fn entry(&self, date: &CalendarDate) -> Option<&ScheduleEntry> {
        self.store.get(&date.key())
    }

    pub fn change_month(&mut self, offset: i64) {
        self.displayed = calendar::advance_month(&self.displayed, offset);
        log::info!("Showing {}", calendar::month_label(&self.displayed));
    }

    pub fn show_month(&mut self, date: &CalendarDate) {
        if !self.displayed.same_month(date) {
            self.displayed = date.first_day();
            log::info!("Showing {}", calendar::month_label(&self.displayed));
        }
    }

    /// Opens the edit form for `date`, pre-filled from its stored entry.
    pub fn open_day(&mut self, date: CalendarDate) -> &mut EditForm {
        let entry = self
            .entry(&date)
            .cloned()
            .unwrap_or_else(|| ScheduleEntry::blank(self.default_kind, &self.roster));

        self.form.insert(EditForm { date, entry })
    }

    pub fn form(&self) -> Option<&EditForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut EditForm> {
        self.form.as_mut()
    }

    /// Stores the form's entry and closes the form.
    pub fn save(&mut self) -> Option<DateKey> {
        let form = self.form.take()?;
        let key = form.date.key();
        self.store.save(key.clone(), form.entry);
        Some(key)
    }

    /// Removes the entry of the form's day and closes the form.
    pub fn clear(&mut self) -> Option<DateKey> {
        let form = self.form.take()?;
        let key = form.date.key();
        self.store.clear(&key);
        Some(key)
    }

    pub fn clear_day(&mut self, date: &CalendarDate) -> Option<ScheduleEntry> {
        self.store.clear(&date.key())
    }

    pub fn cancel(&mut self) {
        self.form = None;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn set_capability(&mut self, loaded: Result<Arc<dyn Rasterize>>) {
        self.capability = match loaded {
            Ok(rasterizer) => Capability::Ready(rasterizer),
            Err(err) => Capability::Failed(err.to_string()),
        };
    }

    pub fn pending_exports(&self) -> usize {
        self.pending_exports
    }

    pub fn export_finished(&mut self) {
        self.pending_exports = self.pending_exports.saturating_sub(1);
    }

    /// Snapshot of the displayed month; `title` defaults to the static title.
    pub fn surface(&self, title: Option<TitleField>) -> Surface {
        Surface::from_month(
            title.unwrap_or_else(|| TitleField::Static(self.title.clone())),
            &self.displayed,
            &self.store,
            &self.roster,
        )
    }

    /// Builds the export of the displayed month. Fails while the
    /// rasterization capability is not ready; the session is left unchanged
    /// in that case.
    pub fn prepare_export(
        &mut self,
        title: Option<TitleField>,
    ) -> Result<(ExportJob, Arc<dyn Rasterize>)> {
        let rasterizer = match &self.capability {
            Capability::Ready(rasterizer) => Arc::clone(rasterizer),
            Capability::Loading => {
                return Err(Error::new(ErrorKind::ExportUnavailable, "still loading"))
            }
            Capability::Failed(reason) => {
                return Err(Error::new(ErrorKind::ExportUnavailable, reason))
            }
        };

        let on_clone: CloneHook = Arc::new(surface::static_title);
        let job = ExportJob {
            surface: self.surface(title),
            options: RasterOptions {
                scale: self.export_config.scale(),
                background: self.export_config.background,
                on_clone: Some(on_clone),
            },
            quality: self.export_config.quality(),
            path: self
                .export_config
                .directory()
                .join(export::export_filename(&self.displayed)),
        };

        self.pending_exports += 1;
        Ok((job, rasterizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::People;
    use image::RgbaImage;
    use std::path::PathBuf;

    struct Blank;

    impl Rasterize for Blank {
        fn rasterize(&self, _: &Surface, _: &RasterOptions) -> Result<RgbaImage> {
            Ok(RgbaImage::new(1, 1))
        }
    }

    fn date(month0: u32, day: u32) -> CalendarDate {
        CalendarDate::from_ymd0(2024, month0, day).unwrap()
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.export.directory = Some(PathBuf::from("/tmp/stampcal-out"));
        config
    }

    fn session() -> Session {
        Session::new(&config(), date(2, 20))
    }

    #[test]
    fn march_2024_end_to_end() {
        let mut session = session();
        assert!(session.store().is_empty());
        assert_eq!(session.displayed_month(), &date(2, 1));

        let cells = session.cells();
        assert_eq!(cells.len(), 35);
        assert_eq!(cells.iter().filter(|c| c.is_empty()).count(), 4);
        assert!(cells[..4].iter().all(CalendarCell::is_empty));

        let form = session.open_day(date(2, 15));
        form.set_kind(EntryKind::Class);
        form.toggle_person("CHARLES");
        let key = session.save().unwrap();

        let expected = ScheduleEntry::new(
            EntryKind::Class,
            People::from([("CHARLES".to_owned(), true), ("OLLIE".to_owned(), false)]),
        );
        assert_eq!(key, date(2, 15).key());
        assert_eq!(session.store().get(&key), Some(&expected));
        assert!(session.form().is_none());

        session.open_day(date(2, 15));
        assert_eq!(session.clear(), Some(key.clone()));
        assert_eq!(session.store().get(&key), None);
    }

    #[test]
    fn form_is_prefilled() {
        let mut session = session();
        let fresh = session.open_day(date(2, 3)).clone();
        assert_eq!(fresh.kind(), EntryKind::Class);
        assert!(!fresh.entry().has_any_person());
        assert_eq!(fresh.entry().people.len(), 2);

        session.form_mut().unwrap().toggle_kind();
        session.save();

        let reopened = session.open_day(date(2, 3));
        assert_eq!(reopened.kind(), EntryKind::Rest);
    }

    #[test]
    fn cancel_discards_edits() {
        let mut session = session();
        session.open_day(date(2, 3)).toggle_person("OLLIE");
        session.cancel();

        assert!(session.form().is_none());
        assert!(session.store().is_empty());
    }

    #[test]
    fn editing_after_save_does_not_touch_store() {
        let mut session = session();
        session.open_day(date(2, 3)).toggle_person("OLLIE");
        session.save();

        session.open_day(date(2, 3)).toggle_person("OLLIE");
        assert!(session.entry(&date(2, 3)).unwrap().is_present("OLLIE"));
        session.cancel();
        assert!(session.entry(&date(2, 3)).unwrap().is_present("OLLIE"));
    }

    #[test]
    fn rest_preserves_people() {
        let mut session = session();
        let form = session.open_day(date(2, 4));
        form.toggle_person("CHARLES");
        form.set_kind(EntryKind::Rest);
        session.save();

        let stored = session.entry(&date(2, 4)).unwrap().clone();
        assert!(stored.is_rest());
        assert!(stored.is_present("CHARLES"));
        assert!(stored.shows_stamp_glyph());

        let form = session.open_day(date(2, 4));
        form.set_kind(EntryKind::Class);
        assert!(form.entry().is_present("CHARLES"));
        assert!(!form.entry().shows_stamp_glyph());
    }

    #[test]
    fn toggle_nth_respects_roster_and_kind() {
        let mut session = session();
        let roster = session.roster().clone();
        let form = session.open_day(date(2, 5));

        assert!(form.toggle_nth(&roster, 1));
        assert!(form.entry().is_present("OLLIE"));
        assert!(!form.toggle_nth(&roster, 2));

        form.set_kind(EntryKind::Rest);
        assert!(!form.toggle_nth(&roster, 0));
        assert!(!form.entry().is_present("CHARLES"));
    }

    #[test]
    fn save_and_clear_without_form_do_nothing() {
        let mut session = session();
        assert_eq!(session.save(), None);
        assert_eq!(session.clear(), None);
        assert!(session.store().is_empty());
    }

    #[test]
    fn month_navigation() {
        let mut session = session();
        session.change_month(10);
        assert_eq!(session.displayed_month(), &CalendarDate::from_ymd0(2025, 0, 1).unwrap());
        session.change_month(-13);
        assert_eq!(session.displayed_month(), &CalendarDate::from_ymd0(2023, 11, 1).unwrap());

        session.show_month(&date(6, 9));
        assert_eq!(session.displayed_month(), &date(6, 1));
    }

    #[test]
    fn export_unavailable_while_loading() {
        let mut session = session();
        let err = session.prepare_export(None).err().unwrap();

        assert!(err.is_unavailable());
        assert_eq!(session.pending_exports(), 0);

        session.set_capability(Err(Error::new(ErrorKind::AssetLoad, "no font")));
        let err = session.prepare_export(None).err().unwrap();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("no font"));
    }

    #[test]
    fn export_job_for_displayed_month() {
        let mut session = session();
        session.set_capability(Ok(Arc::new(Blank)));
        session.set_title("Studio".to_owned());

        let (job, _) = session
            .prepare_export(Some(TitleField::Editable {
                text: "Studio".to_owned(),
                caret: 2,
            }))
            .unwrap();

        assert_eq!(
            job.path,
            PathBuf::from("/tmp/stampcal-out/Schedule_2024_3.jpg")
        );
        assert_eq!(job.quality, 100);
        assert_eq!(job.options.scale, 2);
        assert!(job.surface.title.is_editable());
        assert!(job.options.on_clone.is_some());
        assert_eq!(session.pending_exports(), 1);

        session.export_finished();
        session.export_finished();
        assert_eq!(session.pending_exports(), 0);
    }

    #[test]
    fn surface_uses_stored_title() {
        let mut session = session();
        session.set_title("Rota".to_owned());
        assert_eq!(session.surface(None).title, TitleField::Static("Rota".to_owned()));
    }
}
