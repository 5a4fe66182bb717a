use std::f64::consts::TAU;

use web_sys::CanvasRenderingContext2d;

use cidade_shared::colors::rgba_css;
use cidade_shared::marker::{MarkerKey, MarkerLayer};
use cidade_shared::tiles::visible_tiles;
use cidade_shared::viewport::Viewport;

use crate::tiles::TileCache;

/// Distance from a pin's tip (its anchor) to the centre of its head.
pub(crate) const PIN_HEAD_OFFSET: f64 = 16.0;
pub(crate) const PIN_RADIUS: f64 = 8.0;

const BACKGROUND: &str = "#e8e4dc";
const TILE_PLACEHOLDER: &str = "#dcd8cf";

/// Paint tiles then pins. Problem pins first so the user pin stays on top.
pub(crate) fn draw_scene(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    tiles: &TileCache,
    markers: &MarkerLayer,
    selected: Option<MarkerKey>,
) {
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, vp.width, vp.height);

    let placements = visible_tiles(vp);
    for placement in &placements {
        // Snap to whole pixels and overdraw by one to hide seams between tiles.
        let x = placement.sx.floor();
        let y = placement.sy.floor();
        let size = placement.size.ceil() + 1.0;
        match tiles.ready(placement.tile) {
            Some(image) => {
                ctx.draw_image_with_html_image_element_and_dw_and_dh(&image, x, y, size, size)
                    .ok();
            }
            None => {
                ctx.set_fill_style_str(TILE_PLACEHOLDER);
                ctx.fill_rect(x + 0.5, y + 0.5, size - 2.0, size - 2.0);
            }
        }
    }
    tiles.request(&placements);

    for marker in markers.iter() {
        let (x, y) = vp.coordinate_to_screen(marker.coordinate);
        if x < -PIN_RADIUS * 2.0
            || y < -PIN_RADIUS
            || x > vp.width + PIN_RADIUS * 2.0
            || y > vp.height + PIN_HEAD_OFFSET * 2.0
        {
            continue;
        }
        draw_pin(
            ctx,
            x,
            y,
            marker.color,
            selected == Some(marker.key),
            marker.key == MarkerKey::User,
        );
    }
}

fn draw_pin(
    ctx: &CanvasRenderingContext2d,
    x: f64,
    y: f64,
    (r, g, b): (u8, u8, u8),
    selected: bool,
    is_user: bool,
) {
    let head_y = y - PIN_HEAD_OFFSET;
    let radius = if is_user { PIN_RADIUS + 1.5 } else { PIN_RADIUS };

    if is_user {
        ctx.begin_path();
        ctx.arc(x, y, 10.0, 0.0, TAU).ok();
        ctx.set_fill_style_str(&rgba_css(r, g, b, 0.18));
        ctx.fill();
    }

    ctx.begin_path();
    ctx.move_to(x, y);
    ctx.line_to(x - radius * 0.72, head_y + radius * 0.55);
    ctx.arc(
        x,
        head_y,
        radius,
        TAU * 0.375 + TAU * 0.03,
        TAU * 0.125 - TAU * 0.03 + TAU,
    )
    .ok();
    ctx.line_to(x, y);
    ctx.close_path();
    ctx.set_fill_style_str(&rgba_css(r, g, b, 1.0));
    ctx.fill();

    if selected {
        ctx.set_line_width(2.5);
        ctx.set_stroke_style_str("rgba(255,255,255,0.95)");
    } else {
        ctx.set_line_width(1.25);
        ctx.set_stroke_style_str("rgba(20,22,30,0.55)");
    }
    ctx.stroke();

    ctx.begin_path();
    ctx.arc(x, head_y, radius * 0.38, 0.0, TAU).ok();
    ctx.set_fill_style_str("rgba(255,255,255,0.92)");
    ctx.fill();
}
