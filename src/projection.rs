// Web Mercator conversions shared by the frame renderer and hit testing
use std::f64::consts::PI;

pub const TILE_SIZE: u32 = 256;

/// Global pixel position of a coordinate at `zoom`, origin at the
/// north-west corner of tile (0, 0).
pub fn world_pixel(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32) * TILE_SIZE as f64;
    let x = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_world_centre() {
        let (x, y) = world_pixel(0.0, 0.0, 0);
        assert!((x - 128.0).abs() < 1e-9);
        assert!((y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn each_zoom_doubles_the_world() {
        let (x4, y4) = world_pixel(38.0, -95.0, 4);
        let (x5, y5) = world_pixel(38.0, -95.0, 5);
        assert!((x5 - 2.0 * x4).abs() < 1e-9);
        assert!((y5 - 2.0 * y4).abs() < 1e-9);
    }

    #[test]
    fn london_lands_on_its_osm_tile() {
        let (x, y) = world_pixel(51.505, -0.09, 13);
        let size = TILE_SIZE as f64;
        assert_eq!(((x / size) as u32, (y / size) as u32), (4093, 2724));
    }
}
