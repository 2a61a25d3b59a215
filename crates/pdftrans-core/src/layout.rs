use std::cmp::Ordering;

use crate::block::{BlockKind, PageModel, RawBlock, RawLine, RawSpan};
use crate::error::ExtractOptions;
use crate::geometry::BBox;

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn cmp_top_then_left(a: &BBox, b: &BBox) -> Ordering {
    cmp_f64(a.top, b.top).then(cmp_f64(a.x0, b.x0))
}

/// Cluster runs into lines based on y-proximity.
///
/// Runs whose vertical midpoints are within `y_tolerance` of a line's
/// vertical midpoint are grouped into the same line. Runs within each
/// line are sorted left-to-right.
pub fn cluster_spans_into_lines(spans: Vec<RawSpan>, y_tolerance: f64) -> Vec<RawLine> {
    let mut sorted = spans;
    sorted.sort_by(|a, b| cmp_top_then_left(&a.bbox, &b.bbox));

    let mut lines: Vec<RawLine> = Vec::new();
    for span in sorted {
        let mid = span.bbox.mid_y();
        match lines
            .iter_mut()
            .find(|line| (mid - line.bbox.mid_y()).abs() <= y_tolerance)
        {
            Some(line) => {
                line.bbox = line.bbox.union(&span.bbox);
                line.spans.push(span);
            }
            None => lines.push(RawLine {
                bbox: span.bbox,
                spans: vec![span],
            }),
        }
    }

    for line in &mut lines {
        line.spans.sort_by(|a, b| cmp_f64(a.bbox.x0, b.bbox.x0));
    }
    lines.sort_by(|a, b| cmp_top_then_left(&a.bbox, &b.bbox));
    lines
}

/// Split lines at horizontal gaps wider than `x_density`.
///
/// Side-by-side text (table cells, columns) then lands in separate blocks.
pub fn split_lines_at_gaps(lines: Vec<RawLine>, x_density: f64) -> Vec<RawLine> {
    let mut result = Vec::new();
    for line in lines {
        let mut spans = line.spans.into_iter();
        let Some(first) = spans.next() else {
            continue;
        };
        let mut current = RawLine {
            bbox: first.bbox,
            spans: vec![first],
        };
        for span in spans {
            if span.bbox.x0 - current.bbox.x1 > x_density {
                let done = std::mem::replace(
                    &mut current,
                    RawLine {
                        bbox: span.bbox,
                        spans: Vec::new(),
                    },
                );
                result.push(done);
            } else {
                current.bbox = current.bbox.union(&span.bbox);
            }
            current.spans.push(span);
        }
        result.push(current);
    }

    result.sort_by(|a, b| cmp_top_then_left(&a.bbox, &b.bbox));
    result
}

/// Cluster line segments into text blocks based on x-overlap and vertical proximity.
///
/// A line joins the closest block above it whose bottom is within `y_density`
/// and whose x-range overlaps the line's.
pub fn cluster_lines_into_blocks(lines: Vec<RawLine>, y_density: f64) -> Vec<RawBlock> {
    let mut blocks: Vec<RawBlock> = Vec::new();

    for line in lines {
        let mut best: Option<(usize, f64)> = None;
        for (i, block) in blocks.iter().enumerate() {
            let gap = line.bbox.top - block.bbox.bottom;
            // Lines of one paragraph may overlap slightly when leading < font size.
            let gap = if gap < 0.0 && gap > -0.5 * line.bbox.height() {
                0.0
            } else {
                gap
            };
            if gap >= 0.0
                && gap <= y_density
                && line.bbox.overlaps_x(&block.bbox)
                && best.is_none_or(|(_, g)| gap < g)
            {
                best = Some((i, gap));
            }
        }

        match best {
            Some((idx, _)) => {
                blocks[idx].bbox = blocks[idx].bbox.union(&line.bbox);
                blocks[idx].lines.push(line);
            }
            None => blocks.push(RawBlock {
                kind: BlockKind::Text,
                bbox: line.bbox,
                lines: vec![line],
            }),
        }
    }

    for block in &mut blocks {
        block.lines.sort_by(|a, b| cmp_f64(a.bbox.top, b.bbox.top));
    }
    blocks
}

/// Sort blocks top-to-bottom, then left-to-right.
pub fn sort_blocks_reading_order(blocks: &mut [RawBlock]) {
    blocks.sort_by(|a, b| cmp_top_then_left(&a.bbox, &b.bbox));
}

/// Assemble a page model from interpreted runs and image placements.
///
/// Runs with no visible text are discarded before clustering.
pub fn build_page_model(
    width: f64,
    height: f64,
    spans: Vec<RawSpan>,
    images: Vec<BBox>,
    options: &ExtractOptions,
) -> PageModel {
    let spans: Vec<RawSpan> = spans
        .into_iter()
        .filter(|s| !s.text.trim().is_empty() && s.bbox.is_finite())
        .collect();

    let lines = cluster_spans_into_lines(spans, options.y_tolerance);
    let lines = split_lines_at_gaps(lines, options.x_density);
    let mut blocks = cluster_lines_into_blocks(lines, options.y_density);
    blocks.extend(images.into_iter().map(|bbox| RawBlock {
        kind: BlockKind::Image,
        bbox,
        lines: Vec::new(),
    }));
    sort_blocks_reading_order(&mut blocks);

    PageModel {
        width,
        height,
        blocks,
    }
}
