//! Speckle cleanup: a single-pass 3×3 filter that whitens isolated black
//! pixels in a binarised raster.
//!
//! Decisions are read from a snapshot of the black mask taken before any
//! pixel is written, so clearing one speck never influences its neighbour's
//! verdict. The 1-pixel border is never modified.

use image::RgbaImage;

/// Maximum number of black cells (the pixel itself included) in a 3×3
/// neighbourhood for the centre pixel to be treated as a speck.
pub const MAX_SPECK_NEIGHBOURHOOD: usize = 1;

#[inline]
fn is_black(p: &image::Rgba<u8>) -> bool {
    p[0] == 0 && p[1] == 0 && p[2] == 0
}

/// Whiten every interior pixel whose 3×3 neighbourhood holds at most one
/// pure-black pixel. Returns how many pixels changed.
pub fn remove_speckles(raster: &mut RgbaImage) -> usize {
    let (w, h) = raster.dimensions();
    if w < 3 || h < 3 {
        return 0;
    }

    let snapshot: Vec<bool> = raster.pixels().map(is_black).collect();
    let at = |x: u32, y: u32| snapshot[(y * w + x) as usize];

    let mut changed = 0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut black = 0;
            for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    if at(nx, ny) {
                        black += 1;
                    }
                }
            }
            if black > MAX_SPECK_NEIGHBOURHOOD {
                continue;
            }

            let pixel = raster.get_pixel_mut(x, y);
            if pixel[0] != 255 || pixel[1] != 255 || pixel[2] != 255 {
                pixel[0] = 255;
                pixel[1] = 255;
                pixel[2] = 255;
                changed += 1;
            }
        }
    }

    changed
}
