//! Rendering the displayed month into a JPEG file.
//!
//! The month is snapshotted into a [`Surface`] on the UI thread and rasterized
//! on a worker thread, so the session stays interactive while an export runs.

pub mod assets;
pub mod raster;
pub mod surface;

use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, RgbaImage};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use crate::calendar::CalendarDate;
use crate::config::HexColor;
use crate::error::Result;
use crate::events::Event;

pub use raster::{RasterOptions, Rasterize};
pub use surface::{Surface, TitleField};

pub struct ExportJob {
    pub surface: Surface,
    pub options: RasterOptions,
    pub quality: u8,
    pub path: PathBuf,
}

pub fn export_filename(month: &CalendarDate) -> String {
    format!("Schedule_{}_{}.jpg", month.year(), month.month0() + 1)
}

/// Rasterizes a detached copy of `surface`, after passing it through the
/// `on_clone` hook. The live surface is never touched.
pub fn capture(
    rasterizer: &dyn Rasterize,
    surface: &Surface,
    options: &RasterOptions,
) -> Result<RgbaImage> {
    let mut detached = surface.clone();
    if let Some(hook) = &options.on_clone {
        hook(&mut detached);
    }

    rasterizer.rasterize(&detached, options)
}

/// Composites `image` onto an opaque `background`.
pub fn flatten(image: &RgbaImage, background: HexColor) -> RgbImage {
    let bg = background.rgb();

    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let px = image.get_pixel(x, y).0;
        let alpha = px[3] as u32;
        let blend = |c: usize| ((px[c] as u32 * alpha + bg[c] as u32 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([blend(0), blend(1), blend(2)])
    })
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
        encoder.encode_image(image)?;
    }
    Ok(bytes)
}

static PART_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Temporary name next to `path`, distinct for every write in this process.
fn part_path(path: &Path) -> PathBuf {
    let seq = PART_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_extension(format!("jpg.{}-{}.part", std::process::id(), seq))
}

/// Writes through a `.part` file so a failed write leaves nothing behind.
fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let part = part_path(path);
    let written = fs::write(&part, bytes).and_then(|_| fs::rename(&part, path));
    if written.is_err() {
        let _ = fs::remove_file(&part);
    }

    Ok(written?)
}

pub fn run(job: ExportJob, rasterizer: &dyn Rasterize) -> Result<PathBuf> {
    let image = capture(rasterizer, &job.surface, &job.options)?;
    let flat = flatten(&image, job.options.background);
    let bytes = encode_jpeg(&flat, job.quality)?;

    write_file(&job.path, &bytes)?;
    log::info!("Exported {} ({} bytes)", job.path.display(), bytes.len());

    Ok(job.path)
}

/// Runs `job` on its own thread; the outcome arrives as [`Event::Exported`].
pub fn spawn(
    job: ExportJob,
    rasterizer: Arc<dyn Rasterize>,
    sink: Sender<Event>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stampcal-export".to_owned())
        .spawn(move || {
            log::info!("Exporting to {}", job.path.display());
            let result = run(job, rasterizer.as_ref());

            if let Err(err) = &result {
                log::error!("Export failed: {}", err);
            }

            let _ = sink.send(Event::Exported(result));
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use image::Rgba;
    use std::sync::{mpsc, Mutex};

    /// Paints the left half opaque red and records what it was asked to draw.
    #[derive(Default)]
    struct HalfRed {
        seen: Mutex<Vec<Surface>>,
    }

    impl Rasterize for HalfRed {
        fn rasterize(&self, surface: &Surface, options: &RasterOptions) -> Result<RgbaImage> {
            self.seen.lock().unwrap().push(surface.clone());
            let size = 8 * options.scale;
            Ok(RgbaImage::from_fn(size, size, |x, _| {
                if x < size / 2 {
                    Rgba([0xff, 0, 0, 0xff])
                } else {
                    Rgba([0, 0, 0, 0])
                }
            }))
        }
    }

    struct Failing;

    impl Rasterize for Failing {
        fn rasterize(&self, _: &Surface, _: &RasterOptions) -> Result<RgbaImage> {
            Err(Error::new(ErrorKind::Rasterize, "boom"))
        }
    }

    fn surface() -> Surface {
        Surface {
            title: TitleField::Editable {
                text: "Studio".to_owned(),
                caret: 6,
            },
            title_padding: 0,
            month_label: "2024 / 03".to_owned(),
            weekdays: crate::calendar::WEEKDAY_LABELS,
            cells: vec![None; 35],
        }
    }

    fn options(hook: bool) -> RasterOptions {
        let static_title: raster::CloneHook = Arc::new(surface::static_title);
        RasterOptions {
            scale: 2,
            background: HexColor::new(0, 0, 0xff),
            on_clone: if hook { Some(static_title) } else { None },
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("stampcal-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn filename_uses_one_based_month() {
        let march = CalendarDate::from_ymd0(2024, 2, 1).unwrap();
        let december = CalendarDate::from_ymd0(2023, 11, 31).unwrap();

        assert_eq!(export_filename(&march), "Schedule_2024_3.jpg");
        assert_eq!(export_filename(&december), "Schedule_2023_12.jpg");
    }

    #[test]
    fn hook_sees_detached_copy() {
        let rasterizer = HalfRed::default();
        let live = surface();

        capture(&rasterizer, &live, &options(true)).unwrap();

        let seen = rasterizer.seen.lock().unwrap();
        assert_eq!(seen[0].title, TitleField::Static("Studio".to_owned()));
        assert_eq!(seen[0].title_padding, 10);
        assert_eq!(live, surface());
    }

    #[test]
    fn without_hook_surface_is_drawn_as_is() {
        let rasterizer = HalfRed::default();
        capture(&rasterizer, &surface(), &options(false)).unwrap();
        assert_eq!(rasterizer.seen.lock().unwrap()[0], surface());
    }

    #[test]
    fn transparent_pixels_take_background() {
        let image = HalfRed::default()
            .rasterize(&surface(), &options(false))
            .unwrap();
        let flat = flatten(&image, HexColor::new(0x1e, 0x29, 0x3b));

        assert_eq!(flat.get_pixel(0, 0).0, [0xff, 0, 0]);
        assert_eq!(flat.get_pixel(15, 15).0, [0x1e, 0x29, 0x3b]);
    }

    #[test]
    fn half_transparent_pixels_blend() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([0xff, 0xff, 0xff, 0x80]));
        let flat = flatten(&image, HexColor::new(0, 0, 0));
        assert_eq!(flat.get_pixel(0, 0).0, [0x80, 0x80, 0x80]);
    }

    #[test]
    fn encodes_jpeg() {
        let image = RgbImage::from_pixel(16, 16, image::Rgb([10, 20, 30]));
        let bytes = encode_jpeg(&image, 100).unwrap();
        assert_eq!(&bytes[..2], &[0xff, 0xd8]);
    }

    #[test]
    fn run_writes_file() {
        let dir = scratch_dir("export-ok");
        let path = dir.join("Schedule_2024_3.jpg");
        let job = ExportJob {
            surface: surface(),
            options: options(true),
            quality: 90,
            path: path.clone(),
        };

        assert_eq!(run(job, &HalfRed::default()).unwrap(), path);
        assert_eq!(&fs::read(&path).unwrap()[..2], &[0xff, 0xd8]);
        assert_eq!(dir_entries(&dir), vec!["Schedule_2024_3.jpg"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn part_names_differ_per_write() {
        let path = Path::new("out/Schedule_2024_3.jpg");
        let first = part_path(path);
        let second = part_path(path);

        assert_ne!(first, second);
        assert_eq!(first.parent(), path.parent());
        assert!(first.to_string_lossy().ends_with(".part"));
    }

    #[test]
    fn concurrent_runs_to_same_file() {
        let dir = scratch_dir("export-concurrent");
        let path = dir.join("Schedule_2024_3.jpg");
        let rasterizer: Arc<dyn Rasterize> = Arc::new(HalfRed::default());
        let (tx, rx) = mpsc::channel();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let job = ExportJob {
                    surface: surface(),
                    options: options(true),
                    quality: 90,
                    path: path.clone(),
                };
                spawn(job, Arc::clone(&rasterizer), tx.clone()).unwrap()
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        drop(tx);

        let results: Vec<_> = rx.iter().collect();
        assert_eq!(results.len(), 4);
        for event in results {
            match event {
                Event::Exported(Ok(written)) => assert_eq!(written, path),
                _ => panic!("export did not succeed"),
            }
        }
        assert_eq!(&fs::read(&path).unwrap()[..2], &[0xff, 0xd8]);
        assert_eq!(dir_entries(&dir), vec!["Schedule_2024_3.jpg"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failed_run_leaves_no_file() {
        let dir = scratch_dir("export-fail");
        let path = dir.join("Schedule_2024_3.jpg");
        let job = ExportJob {
            surface: surface(),
            options: options(true),
            quality: 90,
            path: path.clone(),
        };

        let err = run(job, &Failing).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Rasterize));
        assert!(!path.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn spawned_export_reports_back() {
        let dir = scratch_dir("export-spawn");
        let (tx, rx) = mpsc::channel();
        let job = ExportJob {
            surface: surface(),
            options: options(true),
            quality: 90,
            path: dir.join("out.jpg"),
        };

        spawn(job, Arc::new(Failing), tx).unwrap().join().unwrap();

        match rx.recv().unwrap() {
            Event::Exported(Err(err)) => assert!(matches!(err.kind, ErrorKind::Rasterize)),
            _ => panic!("expected a failed export"),
        }
    }
}
