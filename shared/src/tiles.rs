use crate::viewport::{TILE_SIZE, Viewport};

pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";
/// Highest zoom level the public tile server renders.
pub const MAX_TILE_ZOOM: u8 = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

/// A tile and the screen rectangle it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub tile: TileId,
    pub sx: f64,
    pub sy: f64,
    pub size: f64,
}

/// Tiles covering the viewport at the nearest integer zoom, nearest-to-center first.
/// Columns wrap around the antimeridian; rows outside the world are skipped.
pub fn visible_tiles(vp: &Viewport) -> Vec<TilePlacement> {
    if vp.width <= 0.0 || vp.height <= 0.0 {
        return Vec::new();
    }

    let z = vp.zoom.round().clamp(0.0, MAX_TILE_ZOOM as f64) as u8;
    let n = 1i64 << z;
    let tiles_per_unit = n as f64;
    let size = TILE_SIZE * (vp.zoom - z as f64).exp2();

    let (left, top) = vp.screen_to_world(0.0, 0.0);
    let (right, bottom) = vp.screen_to_world(vp.width, vp.height);
    let col_start = (left * tiles_per_unit).floor() as i64;
    let col_end = (right * tiles_per_unit).floor() as i64;
    let row_start = ((top * tiles_per_unit).floor() as i64).max(0);
    let row_end = ((bottom * tiles_per_unit).floor() as i64).min(n - 1);

    let mut placements = Vec::new();
    for row in row_start..=row_end {
        for col in col_start..=col_end {
            let (sx, sy) =
                vp.world_to_screen(col as f64 / tiles_per_unit, row as f64 / tiles_per_unit);
            placements.push(TilePlacement {
                tile: TileId {
                    z,
                    x: col.rem_euclid(n) as u32,
                    y: row as u32,
                },
                sx,
                sy,
                size,
            });
        }
    }

    let (cx, cy) = (vp.width / 2.0, vp.height / 2.0);
    placements.sort_by(|a, b| {
        let da = (a.sx + a.size / 2.0 - cx).powi(2) + (a.sy + a.size / 2.0 - cy).powi(2);
        let db = (b.sx + b.size / 2.0 - cx).powi(2) + (b.sy + b.size / 2.0 - cy).powi(2);
        da.total_cmp(&db).then_with(|| a.tile.cmp(&b.tile))
    });
    placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    #[test]
    fn formats_tile_url() {
        let tile = TileId {
            z: 15,
            x: 11723,
            y: 19135,
        };
        assert_eq!(
            tile.url(OSM_TILE_URL),
            "https://tile.openstreetmap.org/15/11723/19135.png"
        );
    }

    #[test]
    fn small_viewport_at_integer_zoom_covers_at_most_four_tiles() {
        let vp = Viewport::centered(Coordinate::new(-29.1683, -51.1894), 15.0, 256.0, 256.0);
        let tiles = visible_tiles(&vp);
        assert!((1..=4).contains(&tiles.len()));
        assert!(tiles.iter().all(|t| t.tile.z == 15 && t.size == TILE_SIZE));
    }

    #[test]
    fn first_tile_contains_viewport_center() {
        let vp = Viewport::centered(Coordinate::new(-29.1683, -51.1894), 14.3, 800.0, 600.0);
        let first = visible_tiles(&vp)[0];
        assert!(first.sx <= 400.0 && first.sx + first.size >= 400.0);
        assert!(first.sy <= 300.0 && first.sy + first.size >= 300.0);
    }

    #[test]
    fn columns_wrap_across_antimeridian() {
        let vp = Viewport::centered(Coordinate::new(0.0, 179.99), 3.0, 800.0, 400.0);
        let tiles = visible_tiles(&vp);
        assert!(tiles.iter().any(|t| t.tile.x == 0));
        assert!(tiles.iter().any(|t| t.tile.x == 7));
        assert!(tiles.iter().all(|t| t.tile.x < 8));
    }

    #[test]
    fn empty_canvas_has_no_tiles() {
        let vp = Viewport::centered(Coordinate::new(0.0, 0.0), 5.0, 0.0, 0.0);
        assert!(visible_tiles(&vp).is_empty());
    }
}
