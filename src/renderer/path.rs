//! Fill and stroke contour reconstruction
//!
//! Edge records describe each boundary once, tagged with the fill on its left
//! and on its right. A closed contour for one fill is recovered by taking the
//! sub-paths that have the fill on their left as drawn, plus the ones that have
//! it on their right traced backwards, then stitching sub-paths end to start.

use crate::parser::model::{px, Segment, StyleRun};

/// Split a path at every moveto
///
/// Segments before the first moveto form a sub-path starting at the origin.
fn split(path: &[Segment]) -> Vec<Vec<Segment>> {
    let mut result: Vec<Vec<Segment>> = Vec::new();
    for seg in path {
        if seg.is_move() || result.is_empty() {
            let mut sub = Vec::new();
            if !seg.is_move() {
                sub.push(Segment::Move {
                    x: 0.0,
                    y: 0.0,
                    styles: StyleRun::default(),
                });
            }
            result.push(sub);
        }
        if let Some(sub) = result.last_mut() {
            sub.push(*seg);
        }
    }
    result
}

/// Absolute start and end point of a sub-path
fn anchors(sub: &[Segment]) -> ((f64, f64), (f64, f64)) {
    let mut begin = (0.0, 0.0);
    let mut end = (0.0, 0.0);
    for (i, seg) in sub.iter().enumerate() {
        match *seg {
            Segment::Move { x, y, .. } => {
                end = (x, y);
                if i == 0 {
                    begin = end;
                }
            }
            Segment::Line { dx, dy } => {
                end.0 += dx;
                end.1 += dy;
            }
            Segment::Curve { dx1, dy1, dx2, dy2 } => {
                end.0 += dx1 + dx2;
                end.1 += dy1 + dy2;
            }
        }
    }
    (begin, end)
}

/// Trace every sub-path backwards
///
/// Each sub-path becomes a moveto at its old end point followed by its
/// segments in reverse order with negated deltas. Curves swap the roles of
/// their two deltas so the control point stays in place.
pub fn reverse(path: &[Segment]) -> Vec<Segment> {
    let mut result = Vec::with_capacity(path.len());
    for sub in split(path) {
        let (_, (x, y)) = anchors(&sub);
        result.push(Segment::Move {
            x,
            y,
            styles: StyleRun::default(),
        });
        for seg in sub.iter().rev() {
            match *seg {
                Segment::Move { .. } => {}
                Segment::Line { dx, dy } => result.push(Segment::Line { dx: -dx, dy: -dy }),
                Segment::Curve { dx1, dy1, dx2, dy2 } => result.push(Segment::Curve {
                    dx1: -dx2,
                    dy1: -dy2,
                    dx2: -dx1,
                    dy2: -dy1,
                }),
            }
        }
    }
    result
}

/// Pixel position rounded to 3 decimals, for joining sub-paths
fn join_key(p: (f64, f64)) -> (i64, i64) {
    (
        (px(p.0) * 1000.0).round() as i64,
        (px(p.1) * 1000.0).round() as i64,
    )
}

/// Stitch sub-paths into contours
///
/// Starts from the last sub-path and repeatedly appends the first remaining
/// sub-path that begins where the contour currently ends. When nothing
/// continues the contour, a new one starts from the first remaining sub-path.
/// Each contour keeps only its first moveto.
pub fn merge(path: &[Segment]) -> Vec<Vec<Segment>> {
    let mut pending: Vec<(Vec<Segment>, ((f64, f64), (f64, f64)))> = split(path)
        .into_iter()
        .map(|sub| {
            let a = anchors(&sub);
            (sub, a)
        })
        .collect();

    let Some(first) = pending.pop() else {
        return Vec::new();
    };

    let mut contours: Vec<Vec<Vec<Segment>>> = vec![vec![first.0]];
    let mut end = (first.1).1;

    while !pending.is_empty() {
        let next = pending
            .iter()
            .position(|(_, (begin, _))| join_key(*begin) == join_key(end));
        match next {
            Some(i) => {
                let (sub, (_, sub_end)) = pending.remove(i);
                end = sub_end;
                if let Some(contour) = contours.last_mut() {
                    contour.push(sub);
                }
            }
            None => {
                let (sub, (_, sub_end)) = pending.remove(0);
                end = sub_end;
                contours.push(vec![sub]);
            }
        }
    }

    contours
        .into_iter()
        .map(|subs| {
            let mut merged = Vec::new();
            if let Some(head) = subs.first().and_then(|s| s.first()) {
                merged.push(*head);
            }
            merged.extend(subs.iter().flatten().filter(|s| !s.is_move()).copied());
            merged
        })
        .collect()
}

/// Pixels with negative zero folded into zero
fn coord(twips: f64) -> f64 {
    px(twips) + 0.0
}

/// SVG path data for a contour, in pixels
///
/// Movetos are absolute; lines and curves are relative. A curve's control
/// point is its first delta and its end point the sum of both.
pub fn path_data(contour: &[Segment], precision: usize) -> String {
    let p = precision;
    let mut d = String::new();
    for seg in contour {
        match *seg {
            Segment::Move { x, y, .. } => {
                d.push_str(&format!("M{:.p$} {:.p$} ", coord(x), coord(y)));
            }
            Segment::Line { dx, dy } => {
                d.push_str(&format!("l{:.p$} {:.p$} ", coord(dx), coord(dy)));
            }
            Segment::Curve { dx1, dy1, dx2, dy2 } => {
                d.push_str(&format!(
                    "q{:.p$} {:.p$} {:.p$} {:.p$} ",
                    coord(dx1),
                    coord(dy1),
                    coord(dx1 + dx2),
                    coord(dy1 + dy2)
                ));
            }
        }
    }
    d
}

/// Path data for a list of sub-paths after stitching
pub fn merged_path_data(path: &[Segment], precision: usize) -> String {
    merge(path)
        .iter()
        .map(|contour| path_data(contour, precision))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mv(x: f64, y: f64) -> Segment {
        Segment::Move {
            x,
            y,
            styles: StyleRun::default(),
        }
    }

    fn line(dx: f64, dy: f64) -> Segment {
        Segment::Line { dx, dy }
    }

    fn square() -> Vec<Segment> {
        vec![
            mv(4800.0, 0.0),
            line(-4800.0, 0.0),
            line(0.0, 4800.0),
            line(4800.0, 0.0),
            line(0.0, -4800.0),
        ]
    }

    #[test]
    fn test_path_data_of_square() {
        assert_eq!(
            path_data(&square(), 4),
            "M240.0000 0.0000 l-240.0000 0.0000 l0.0000 240.0000 l240.0000 0.0000 l0.0000 -240.0000 "
        );
    }

    #[test]
    fn test_curve_data_uses_absolute_sum() {
        let c = vec![
            mv(0.0, 0.0),
            Segment::Curve {
                dx1: 20.0,
                dy1: 40.0,
                dx2: 60.0,
                dy2: -20.0,
            },
        ];
        assert_eq!(path_data(&c, 2), "M0.00 0.00 q1.00 2.00 4.00 1.00 ");
    }

    #[test]
    fn test_reverse_square() {
        let reversed = reverse(&square());
        assert_eq!(reversed[0], mv(4800.0, 0.0));
        assert_eq!(reversed[1], line(0.0, 4800.0));
        assert_eq!(reversed[4], line(4800.0, -0.0));
        assert_eq!(reversed.len(), 5);
    }

    #[test]
    fn test_reversed_path_data_has_no_negative_zero() {
        assert_eq!(
            path_data(&reverse(&square()), 1),
            "M240.0 0.0 l0.0 240.0 l-240.0 0.0 l0.0 -240.0 l240.0 0.0 "
        );
    }

    #[test]
    fn test_reverse_twice_is_identity() {
        let path = vec![
            mv(100.0, 100.0),
            line(20.0, 0.0),
            Segment::Curve {
                dx1: 10.0,
                dy1: 10.0,
                dx2: -5.0,
                dy2: 20.0,
            },
            mv(0.0, 0.0),
            line(0.0, 40.0),
        ];
        assert_eq!(reverse(&reverse(&path)), path);
    }

    #[test]
    fn test_reverse_swaps_curve_deltas() {
        let path = vec![
            mv(0.0, 0.0),
            Segment::Curve {
                dx1: 1.0,
                dy1: 2.0,
                dx2: 3.0,
                dy2: 4.0,
            },
        ];
        assert_eq!(
            reverse(&path),
            vec![
                mv(4.0, 6.0),
                Segment::Curve {
                    dx1: -3.0,
                    dy1: -4.0,
                    dx2: -1.0,
                    dy2: -2.0,
                }
            ]
        );
    }

    #[test]
    fn test_merge_stitches_matching_ends() {
        // two halves of a square given in an order that needs stitching
        let path = vec![
            mv(0.0, 0.0),
            line(20.0, 0.0),
            line(0.0, 20.0),
            mv(20.0, 20.0),
            line(-20.0, 0.0),
            line(0.0, -20.0),
        ];
        let merged = merge(&path);
        assert_eq!(merged.len(), 1);
        assert_eq!(
            merged[0],
            vec![
                mv(20.0, 20.0),
                line(-20.0, 0.0),
                line(0.0, -20.0),
                line(20.0, 0.0),
                line(0.0, 20.0),
            ]
        );
    }

    #[test]
    fn test_merge_keeps_disjoint_contours() {
        let path = vec![
            mv(0.0, 0.0),
            line(20.0, 0.0),
            mv(100.0, 100.0),
            line(20.0, 0.0),
        ];
        let merged = merge(&path);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0][0], mv(100.0, 100.0));
        assert_eq!(merged[1][0], mv(0.0, 0.0));
    }

    #[test]
    fn test_merge_of_empty_path() {
        assert!(merge(&[]).is_empty());
        assert_eq!(merged_path_data(&[], 4), "");
    }
}
