use tui::layout::Rect;

/// A `width` x `height` rect centered in `area`, shrunk to fit if needed.
pub(crate) fn center_in(width: u16, height: u16, area: &Rect) -> Rect {
    let (width, height) = (width.min(area.width), height.min(area.height));

    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
