use ab_glyph::{Font, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut,
    draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use std::sync::Arc;

use super::assets::FontAsset;
use super::surface::{DayView, Surface, TitleField};
use crate::config::HexColor;
use crate::error::Result;
use crate::schedule::EntryKind;

/// Turns a [`Surface`] into pixels.
pub trait Rasterize: Send + Sync {
    fn rasterize(&self, surface: &Surface, options: &RasterOptions) -> Result<RgbaImage>;
}

pub type CloneHook = Arc<dyn Fn(&mut Surface) + Send + Sync>;

#[derive(Clone)]
pub struct RasterOptions {
    pub scale: u32,
    /// Fill colour of transparent regions.
    pub background: HexColor,
    /// Applied to a detached copy of the surface right before capture.
    pub on_clone: Option<CloneHook>,
}

/// Pixel geometry of the exported month, in unscaled units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub scale: u32,
    pub rows: u32,
}

impl Layout {
    pub const CELL_WIDTH: u32 = 120;
    pub const CELL_HEIGHT: u32 = 120;
    pub const HEADER_HEIGHT: u32 = 64;
    pub const WEEKDAY_HEIGHT: u32 = 44;
    pub const COLUMNS: u32 = 7;

    pub fn new(surface: &Surface, scale: u32) -> Self {
        Layout {
            scale: scale.max(1),
            rows: surface.rows() as u32,
        }
    }

    pub fn grid_top(&self) -> u32 {
        Self::HEADER_HEIGHT + Self::WEEKDAY_HEIGHT
    }

    pub fn width(&self) -> u32 {
        Self::COLUMNS * Self::CELL_WIDTH * self.scale
    }

    pub fn height(&self) -> u32 {
        (self.grid_top() + self.rows * Self::CELL_HEIGHT) * self.scale
    }

    /// Unscaled top-left corner of cell `idx`.
    pub fn cell_origin(&self, idx: usize) -> (u32, u32) {
        let col = idx as u32 % Self::COLUMNS;
        let row = idx as u32 / Self::COLUMNS;
        (
            col * Self::CELL_WIDTH,
            self.grid_top() + row * Self::CELL_HEIGHT,
        )
    }
}

mod palette {
    use image::Rgba;

    pub const HEADER: Rgba<u8> = Rgba([0x1e, 0x29, 0x3b, 0xff]);
    pub const HEADER_TEXT: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);
    pub const WEEKDAY_TEXT: Rgba<u8> = Rgba([0xcb, 0xd5, 0xe1, 0xff]);
    pub const DIVIDER: Rgba<u8> = Rgba([0x33, 0x41, 0x55, 0xff]);
    pub const CELL: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);
    pub const PADDING_CELL: Rgba<u8> = Rgba([0xf9, 0xfa, 0xfb, 0xff]);
    pub const GRID: Rgba<u8> = Rgba([0xe5, 0xe7, 0xeb, 0xff]);
    pub const DAY: Rgba<u8> = Rgba([0x64, 0x74, 0x8b, 0xff]);
    pub const WEEKEND: Rgba<u8> = Rgba([0xef, 0x44, 0x44, 0xff]);
    pub const REST: Rgba<u8> = Rgba([0xef, 0x44, 0x44, 0xff]);
    pub const REST_FILL: Rgba<u8> = Rgba([0xfe, 0xf2, 0xf2, 0xff]);
    pub const CLASS: Rgba<u8> = Rgba([0x25, 0x63, 0xeb, 0xff]);
    pub const CLASS_FILL: Rgba<u8> = Rgba([0xef, 0xf6, 0xff, 0xff]);
}

fn opaque(color: HexColor) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, 0xff])
}

/// Light tint of `color`, used as tag background.
fn tint(color: HexColor) -> Rgba<u8> {
    let mix = |c: u8| ((c as u32 + 9 * 0xff) / 10) as u8;
    Rgba([mix(color.r), mix(color.g), mix(color.b), 0xff])
}

/// Built-in rasterizer drawing with the session's font asset.
pub struct GlyphRasterizer {
    font: FontAsset,
}

struct Painter<'a, F: Font> {
    canvas: RgbaImage,
    scale: u32,
    font: &'a F,
}

impl<'a, F: Font> Painter<'a, F> {
    fn px(&self, v: u32) -> i32 {
        (v * self.scale) as i32
    }

    fn rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
        let rect = Rect::at(self.px(x), self.px(y)).of_size(w * self.scale, h * self.scale);
        draw_filled_rect_mut(&mut self.canvas, rect, color);
    }

    fn line(&mut self, from: (u32, u32), to: (u32, u32), color: Rgba<u8>) {
        let start = (self.px(from.0) as f32, self.px(from.1) as f32);
        let end = (self.px(to.0) as f32, self.px(to.1) as f32);
        draw_line_segment_mut(&mut self.canvas, start, end, color);
    }

    fn text_width(&self, size: u32, text: &str) -> u32 {
        let (w, _) = text_size(PxScale::from((size * self.scale) as f32), self.font, text);
        w / self.scale
    }

    fn text(&mut self, x: u32, y: u32, size: u32, color: Rgba<u8>, text: &str) {
        let scale = PxScale::from((size * self.scale) as f32);
        let (x, y) = (self.px(x), self.px(y));
        draw_text_mut(&mut self.canvas, color, x, y, scale, self.font, text);
    }

    fn centered_text(&mut self, cx: u32, y: u32, size: u32, color: Rgba<u8>, text: &str) -> u32 {
        let w = self.text_width(size, text);
        let x = cx.saturating_sub(w / 2);
        self.text(x, y, size, color, text);
        x
    }

    fn stamp(&mut self, cx: u32, cy: u32, kind: EntryKind) {
        let (fill, border) = match kind {
            EntryKind::Rest => (palette::REST_FILL, palette::REST),
            EntryKind::Class => (palette::CLASS_FILL, palette::CLASS),
        };
        let center = (self.px(cx), self.px(cy));
        let radius = self.px(24);

        draw_filled_circle_mut(&mut self.canvas, center, radius, fill);
        for inset in 0..(2 * self.scale as i32) {
            draw_hollow_circle_mut(&mut self.canvas, center, radius - inset, border);
        }
        self.centered_text(cx, cy - 13, 24, border, kind.stamp());
    }

    fn header(&mut self, surface: &Surface, layout: &Layout) {
        let width = Layout::COLUMNS * Layout::CELL_WIDTH;

        self.rect(0, 0, width, layout.grid_top(), palette::HEADER);

        let title_y = 16 + surface.title_padding.min(Layout::HEADER_HEIGHT - 40);
        let title = surface.title.text();
        let left = self.centered_text(width / 2, title_y, 28, palette::HEADER_TEXT, title);
        if let TitleField::Editable { text, caret } = &surface.title {
            let before: String = text.chars().take(*caret).collect();
            let caret_x = left + self.text_width(28, &before);
            self.line(
                (caret_x + 1, title_y),
                (caret_x + 1, title_y + 30),
                palette::HEADER_TEXT,
            );
        }

        let label_w = self.text_width(22, &surface.month_label);
        self.text(
            width.saturating_sub(label_w + 16),
            20,
            22,
            palette::HEADER_TEXT,
            &surface.month_label,
        );

        self.line(
            (0, Layout::HEADER_HEIGHT),
            (width, Layout::HEADER_HEIGHT),
            palette::DIVIDER,
        );

        for (col, label) in surface.weekdays.iter().enumerate() {
            let cx = col as u32 * Layout::CELL_WIDTH + Layout::CELL_WIDTH / 2;
            self.centered_text(cx, Layout::HEADER_HEIGHT + 12, 16, palette::WEEKDAY_TEXT, label);
        }
    }

    fn cell(&mut self, x: u32, y: u32, view: Option<&DayView>) {
        let (w, h) = (Layout::CELL_WIDTH, Layout::CELL_HEIGHT);

        match view {
            None => self.rect(x, y, w, h, palette::PADDING_CELL),
            Some(view) => {
                self.rect(x, y, w, h, palette::CELL);

                let day_color = if view.weekend {
                    palette::WEEKEND
                } else {
                    palette::DAY
                };
                self.text(x + 10, y + 6, 18, day_color, &view.day.to_string());

                if let Some(kind) = view.stamp {
                    self.stamp(x + w / 2, y + h / 2 + 10, kind);
                }

                for (idx, tag) in view.tags.iter().enumerate() {
                    let top = y + 34 + idx as u32 * 26;
                    self.rect(x + 8, top, w - 16, 22, tint(tag.color));
                    self.centered_text(x + w / 2, top + 3, 14, opaque(tag.color), &tag.name);
                }
            }
        }

        self.line((x + w - 1, y), (x + w - 1, y + h), palette::GRID);
        self.line((x, y + h - 1), (x + w, y + h - 1), palette::GRID);
    }
}

impl GlyphRasterizer {
    pub fn new(font: FontAsset) -> Self {
        GlyphRasterizer { font }
    }
}

impl Rasterize for GlyphRasterizer {
    fn rasterize(&self, surface: &Surface, options: &RasterOptions) -> Result<RgbaImage> {
        let layout = Layout::new(surface, options.scale);
        log::debug!(
            "Rasterizing {}x{} px with {}",
            layout.width(),
            layout.height(),
            self.font.path().display()
        );

        // Starts fully transparent; whatever is not painted takes the
        // background colour when flattened.
        let mut painter = Painter {
            canvas: RgbaImage::new(layout.width(), layout.height()),
            scale: layout.scale,
            font: self.font.font(),
        };

        painter.header(surface, &layout);

        for (idx, view) in surface.cells.iter().enumerate() {
            let (x, y) = layout.cell_origin(idx);
            painter.cell(x, y, view.as_ref());
        }

        let grid_bottom = layout.grid_top() + layout.rows * Layout::CELL_HEIGHT;
        painter.line((0, layout.grid_top()), (0, grid_bottom), palette::GRID);

        Ok(painter.canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::surface::TitleField;

    fn surface(cells: usize) -> Surface {
        Surface {
            title: TitleField::Static(String::new()),
            title_padding: 0,
            month_label: String::new(),
            weekdays: crate::calendar::WEEKDAY_LABELS,
            cells: vec![None; cells],
        }
    }

    #[test]
    fn layout_of_five_rows() {
        let layout = Layout::new(&surface(35), 2);

        assert_eq!(layout.rows, 5);
        assert_eq!(layout.width(), 1680);
        assert_eq!(layout.height(), (64 + 44 + 600) * 2);
        assert_eq!(layout.cell_origin(0), (0, 108));
        assert_eq!(layout.cell_origin(8), (120, 228));
        assert_eq!(layout.cell_origin(34), (720, 588));
    }

    #[test]
    fn partial_last_row_counts() {
        assert_eq!(Layout::new(&surface(36), 1).rows, 6);
        assert_eq!(Layout::new(&surface(28), 1).rows, 4);
        assert_eq!(Layout::new(&surface(28), 0).scale, 1);
    }

    #[test]
    fn tint_is_lighter() {
        let Rgba([r, g, b, a]) = tint(HexColor::new(0, 0x80, 0xff));
        assert!(r > 200 && g > 200);
        assert_eq!(b, 0xff);
        assert_eq!(a, 0xff);
    }
}
