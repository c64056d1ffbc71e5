//! Text rendering of a hit region.

use dom::Viewport;
use hit_region::Coordinate;
use rustc_hash::FxHashSet;

/// Draw the sampling grid over `viewport`, one character per cell: `#` for
/// cells in `region`, `.` elsewhere.
pub fn render_grid(region: &[Coordinate], viewport: Viewport, resolution: u32) -> String {
    let step = resolution.max(1);
    let marked: FxHashSet<Coordinate> = region.iter().copied().collect();
    let mut out = String::new();
    for y in (0..viewport.height).step_by(step as usize) {
        for x in (0..viewport.width).step_by(step as usize) {
            out.push(if marked.contains(&Coordinate::new(x, y)) {
                '#'
            } else {
                '.'
            });
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_region_cells() {
        let region = [
            Coordinate::new(0, 0),
            Coordinate::new(50, 0),
            Coordinate::new(0, 50),
        ];
        assert_eq!(
            render_grid(&region, Viewport::new(100, 100), 50),
            "##\n#.\n"
        );
    }

    #[test]
    fn partial_cells_still_render() {
        assert_eq!(render_grid(&[], Viewport::new(25, 5), 10), "...\n");
        assert_eq!(render_grid(&[], Viewport::new(0, 0), 10), "");
    }
}
