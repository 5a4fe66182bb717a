use crate::geo::Coordinate;

/// Side of one raster tile in CSS pixels.
pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: f64 = 2.0;
pub const MAX_ZOOM: f64 = 19.0;
/// Web Mercator cannot represent the poles; latitudes are clamped here.
const MAX_LATITUDE: f64 = 85.051_128_78;
const ZOOM_SENSITIVITY: f64 = 0.002;

/// Viewport manages the pan/zoom transformation from Web Mercator world space
/// (normalized to `0.0..1.0` on both axes) to CSS-pixel screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center_x: f64,
    pub center_y: f64,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

/// Project a coordinate into normalized Web Mercator space.
pub fn project(coord: Coordinate) -> (f64, f64) {
    let lat = coord.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (coord.longitude + 180.0) / 360.0;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(x: f64, y: f64) -> Coordinate {
    let longitude = x * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * y);
    let latitude = n.sinh().atan().to_degrees();
    Coordinate::new(latitude, longitude)
}

impl Viewport {
    pub fn centered(center: Coordinate, zoom: f64, width: f64, height: f64) -> Self {
        let (center_x, center_y) = project(center);
        Self {
            center_x,
            center_y,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// Screen pixels per normalized world unit.
    pub fn scale(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Convert world coordinates to screen coordinates.
    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        let scale = self.scale();
        (
            (wx - self.center_x) * scale + self.width / 2.0,
            (wy - self.center_y) * scale + self.height / 2.0,
        )
    }

    /// Convert screen coordinates to world coordinates.
    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        let scale = self.scale();
        (
            (sx - self.width / 2.0) / scale + self.center_x,
            (sy - self.height / 2.0) / scale + self.center_y,
        )
    }

    pub fn coordinate_to_screen(&self, coord: Coordinate) -> (f64, f64) {
        let (wx, wy) = project(coord);
        self.world_to_screen(wx, wy)
    }

    pub fn screen_to_coordinate(&self, sx: f64, sy: f64) -> Coordinate {
        let (wx, wy) = self.screen_to_world(sx, sy);
        unproject(wx, wy)
    }

    /// Pan by screen-space delta. Dragging right reveals what lies to the west.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let scale = self.scale();
        self.center_x = (self.center_x - dx / scale).rem_euclid(1.0);
        self.center_y = (self.center_y - dy / scale).clamp(0.0, 1.0);
    }

    /// Zoom toward a focus point (screen coordinates) by a wheel delta.
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        self.set_zoom_at(self.zoom - delta * ZOOM_SENSITIVITY, screen_x, screen_y);
    }

    /// Step the zoom level around the screen centre (used by the +/- buttons).
    pub fn zoom_by(&mut self, steps: f64) {
        let (cx, cy) = (self.width / 2.0, self.height / 2.0);
        self.set_zoom_at(self.zoom + steps, cx, cy);
    }

    fn set_zoom_at(&mut self, zoom: f64, screen_x: f64, screen_y: f64) {
        // Keep the point under the cursor fixed.
        let (fx, fy) = self.screen_to_world(screen_x, screen_y);
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let scale = self.scale();
        self.center_x = fx - (screen_x - self.width / 2.0) / scale;
        self.center_y = fy - (screen_y - self.height / 2.0) / scale;
    }

    /// Re-apply a center and zoom without touching the canvas size.
    pub fn recenter(&mut self, center: Coordinate, zoom: f64) {
        let (center_x, center_y) = project(center);
        self.center_x = center_x;
        self.center_y = center_y;
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, eps: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < eps, "expected {expected}, got {actual} (diff: {diff})");
    }

    #[test]
    fn projects_null_island_to_world_center() {
        let (x, y) = project(Coordinate::new(0.0, 0.0));
        assert_close(x, 0.5, 1e-12);
        assert_close(y, 0.5, 1e-12);
    }

    #[test]
    fn unproject_inverts_project() {
        let coord = Coordinate::new(-29.1683, -51.1894);
        let (x, y) = project(coord);
        let back = unproject(x, y);
        assert_close(back.latitude, coord.latitude, 1e-9);
        assert_close(back.longitude, coord.longitude, 1e-9);
    }

    #[test]
    fn center_coordinate_lands_mid_screen() {
        let coord = Coordinate::new(-29.1683, -51.1894);
        let vp = Viewport::centered(coord, 15.0, 800.0, 600.0);
        let (sx, sy) = vp.coordinate_to_screen(coord);
        assert_close(sx, 400.0, 1e-6);
        assert_close(sy, 300.0, 1e-6);
    }

    #[test]
    fn zoom_at_keeps_focus_point_fixed() {
        let mut vp = Viewport::centered(Coordinate::new(10.0, 20.0), 12.0, 800.0, 600.0);
        let before = vp.screen_to_coordinate(100.0, 450.0);
        vp.zoom_at(-300.0, 100.0, 450.0);
        assert_close(vp.zoom, 12.6, 1e-9);
        let after = vp.screen_to_coordinate(100.0, 450.0);
        assert_close(after.latitude, before.latitude, 1e-9);
        assert_close(after.longitude, before.longitude, 1e-9);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = Viewport::centered(Coordinate::new(0.0, 0.0), 18.5, 400.0, 400.0);
        vp.zoom_by(5.0);
        assert_eq!(vp.zoom, MAX_ZOOM);
        vp.zoom_by(-40.0);
        assert_eq!(vp.zoom, MIN_ZOOM);
    }

    #[test]
    fn pan_moves_center_against_drag() {
        let mut vp = Viewport::centered(Coordinate::new(0.0, 0.0), 4.0, 400.0, 400.0);
        let x0 = vp.center_x;
        vp.pan(vp.scale() * 0.01, 0.0);
        assert_close(vp.center_x, x0 - 0.01, 1e-12);
    }

    #[test]
    fn recenter_restores_center_and_zoom() {
        let home = Coordinate::new(-29.1683, -51.1894);
        let mut vp = Viewport::centered(home, 15.0, 640.0, 480.0);
        vp.pan(250.0, -120.0);
        vp.zoom_by(-3.0);
        vp.recenter(home, 15.0);
        assert_eq!(vp, Viewport::centered(home, 15.0, 640.0, 480.0));
    }
}
