use ab_glyph::FontVec;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use super::raster::{GlyphRasterizer, Rasterize};
use crate::error::{Error, ErrorKind, Result};
use crate::events::Event;

/// The font used by the built-in rasterizer. Acquired once per session and
/// released when the last rasterizer holding it is dropped.
pub struct FontAsset {
    path: PathBuf,
    font: FontVec,
}

impl FontAsset {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let font = FontVec::try_from_vec(data)
            .map_err(|err| Error::from(err).with_msg(&format!("{}", path.display())))?;

        Ok(FontAsset {
            path: path.to_owned(),
            font,
        })
    }

    /// Loads the first candidate that exists.
    pub fn load_first(candidates: &[PathBuf]) -> Result<Self> {
        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Self::load(path),
            None => Err(Error::new(
                ErrorKind::AssetLoad,
                &format!(
                    "no font found, tried {}",
                    candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn font(&self) -> &FontVec {
        &self.font
    }
}

impl Drop for FontAsset {
    fn drop(&mut self) {
        log::debug!("Releasing font asset {}", self.path.display());
    }
}

/// Loads the font on a helper thread and reports the resulting rasterizer
/// through `sink`.
pub fn spawn_loader(
    candidates: Vec<PathBuf>,
    sink: Sender<Event>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stampcal-assets".to_owned())
        .spawn(move || {
            let result = FontAsset::load_first(&candidates).map(|font| {
                log::info!("Loaded font asset {}", font.path().display());
                Arc::new(GlyphRasterizer::new(font)) as Arc<dyn Rasterize>
            });

            if let Err(err) = &result {
                log::error!("Export capability unavailable: {}", err);
            }

            let _ = sink.send(Event::CapabilityLoaded(result));
        })
}
