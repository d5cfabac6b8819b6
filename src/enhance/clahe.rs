//! Contrast-limited adaptive histogram equalization on a single plane.

use image::{GrayImage, Luma};

/// Tile boundaries along one axis: `tiles + 1` edges splitting `len` evenly
fn tile_edges(len: u32, tiles: u32) -> Vec<u32> {
    (0..=tiles).map(|i| i * len / tiles).collect()
}

/// Clip a histogram at `limit` and spread the excess uniformly over all bins
fn clip_histogram(hist: &mut [u32; 256], limit: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let batch = excess / 256;
    let residual = excess % 256;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (256 / residual).max(1) as usize;
        for bin in hist.iter_mut().step_by(step).take(residual as usize) {
            *bin += 1;
        }
    }
}

/// Equalization lookup table for one tile
fn tile_lut(plane: &GrayImage, x0: u32, x1: u32, y0: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[plane.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let area = (x1 - x0) * (y1 - y0);
    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    clip_histogram(&mut hist, limit);

    let mut lut = [0u8; 256];
    let scale = 255.0 / area as f32;
    let mut cdf = 0u32;
    for (value, count) in hist.iter().enumerate() {
        cdf += count;
        lut[value] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Map a pixel coordinate to the two neighboring tile indices and the blend weight
fn neighbors(pos: u32, len: u32, tiles: u32) -> (usize, usize, f32) {
    let tile_size = len as f32 / tiles as f32;
    let t = (pos as f32 + 0.5) / tile_size - 0.5;
    let lo = t.floor();
    let frac = t - lo;
    let last = tiles as i64 - 1;
    let first = (lo as i64).clamp(0, last) as usize;
    let second = (lo as i64 + 1).clamp(0, last) as usize;
    (first, second, frac)
}

/// Equalize each tile of a `grid.0 x grid.1` grid with a clipped histogram,
/// then blend neighboring tile mappings bilinearly so tile seams vanish.
pub fn clahe(plane: &GrayImage, clip_limit: f32, grid: (u32, u32)) -> GrayImage {
    let (w, h) = plane.dimensions();
    if w == 0 || h == 0 {
        return plane.clone();
    }
    let tiles_x = grid.0.clamp(1, w);
    let tiles_y = grid.1.clamp(1, h);
    let xs = tile_edges(w, tiles_x);
    let ys = tile_edges(h, tiles_y);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y as usize {
        for tx in 0..tiles_x as usize {
            luts.push(tile_lut(plane, xs[tx], xs[tx + 1], ys[ty], ys[ty + 1], clip_limit));
        }
    }
    let lut_at = |tx: usize, ty: usize| &luts[ty * tiles_x as usize + tx];

    let column_neighbors: Vec<_> = (0..w).map(|x| neighbors(x, w, tiles_x)).collect();
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let (ty1, ty2, fy) = neighbors(y, h, tiles_y);
        for x in 0..w {
            let (tx1, tx2, fx) = column_neighbors[x as usize];
            let v = plane.get_pixel(x, y)[0] as usize;
            let top = lut_at(tx1, ty1)[v] as f32 * (1.0 - fx) + lut_at(tx2, ty1)[v] as f32 * fx;
            let bottom = lut_at(tx1, ty2)[v] as f32 * (1.0 - fx) + lut_at(tx2, ty2)[v] as f32 * fx;
            let blended = top * (1.0 - fy) + bottom * fy;
            out.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}
