// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Stroke-font text layout
//!
//! Glyphs are polylines in a cell one unit tall. Each segment becomes a
//! rotated rectangle with round caps, so a laid-out string is just a union of
//! primitives.

use super::shapes::{circle, rectangle};
use super::transforms::{rotate_z, translate};
use super::Expression;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Stroke radius as a fraction of the glyph height
const STROKE: f64 = 0.06;

/// Space left between glyph cells, in glyph heights
const GAP: f64 = 0.2;

type Polyline = &'static [(f64, f64)];

struct Glyph {
    width: f64,
    strokes: &'static [Polyline],
}

const O_RING: Polyline = &[
    (0.1, 0.0),
    (0.0, 0.1),
    (0.0, 0.9),
    (0.1, 1.0),
    (0.4, 1.0),
    (0.5, 0.9),
    (0.5, 0.1),
    (0.4, 0.0),
    (0.1, 0.0),
];

const P_BOWL: Polyline = &[(0.0, 0.0), (0.0, 1.0), (0.4, 1.0), (0.5, 0.9), (0.5, 0.6), (0.4, 0.5), (0.0, 0.5)];

fn cell(width: f64, strokes: &'static [Polyline]) -> Glyph {
    Glyph { width, strokes }
}

fn glyph(c: char) -> Option<Glyph> {
    let glyph = match c {
        ' ' => cell(0.5, &[]),
        'A' => cell(0.5, &[&[(0.0, 0.0), (0.25, 1.0), (0.5, 0.0)], &[(0.1, 0.4), (0.4, 0.4)]]),
        'B' => cell(
            0.5,
            &[
                &[(0.0, 0.0), (0.0, 1.0), (0.35, 1.0), (0.45, 0.9), (0.45, 0.6), (0.35, 0.5), (0.0, 0.5)],
                &[(0.35, 0.5), (0.5, 0.4), (0.5, 0.1), (0.4, 0.0), (0.0, 0.0)],
            ],
        ),
        'C' => cell(0.5, &[&[(0.5, 1.0), (0.1, 1.0), (0.0, 0.9), (0.0, 0.1), (0.1, 0.0), (0.5, 0.0)]]),
        'D' => cell(
            0.5,
            &[&[(0.0, 0.0), (0.0, 1.0), (0.3, 1.0), (0.5, 0.8), (0.5, 0.2), (0.3, 0.0), (0.0, 0.0)]],
        ),
        'E' => cell(0.5, &[&[(0.5, 1.0), (0.0, 1.0), (0.0, 0.0), (0.5, 0.0)], &[(0.0, 0.5), (0.35, 0.5)]]),
        'F' => cell(0.5, &[&[(0.5, 1.0), (0.0, 1.0), (0.0, 0.0)], &[(0.0, 0.5), (0.35, 0.5)]]),
        'G' => cell(
            0.5,
            &[&[
                (0.5, 0.9),
                (0.4, 1.0),
                (0.1, 1.0),
                (0.0, 0.9),
                (0.0, 0.1),
                (0.1, 0.0),
                (0.4, 0.0),
                (0.5, 0.1),
                (0.5, 0.4),
                (0.25, 0.4),
            ]],
        ),
        'H' => cell(
            0.5,
            &[&[(0.0, 0.0), (0.0, 1.0)], &[(0.5, 0.0), (0.5, 1.0)], &[(0.0, 0.5), (0.5, 0.5)]],
        ),
        'I' => cell(
            0.3,
            &[&[(0.0, 1.0), (0.3, 1.0)], &[(0.15, 1.0), (0.15, 0.0)], &[(0.0, 0.0), (0.3, 0.0)]],
        ),
        'J' => cell(0.5, &[&[(0.5, 1.0), (0.5, 0.1), (0.4, 0.0), (0.1, 0.0), (0.0, 0.1), (0.0, 0.3)]]),
        'K' => cell(
            0.5,
            &[&[(0.0, 0.0), (0.0, 1.0)], &[(0.5, 1.0), (0.0, 0.4)], &[(0.15, 0.55), (0.5, 0.0)]],
        ),
        'L' => cell(0.5, &[&[(0.0, 1.0), (0.0, 0.0), (0.5, 0.0)]]),
        'M' => cell(0.5, &[&[(0.0, 0.0), (0.0, 1.0), (0.25, 0.5), (0.5, 1.0), (0.5, 0.0)]]),
        'N' => cell(0.5, &[&[(0.0, 0.0), (0.0, 1.0), (0.5, 0.0), (0.5, 1.0)]]),
        'O' => cell(0.5, &[O_RING]),
        'P' => cell(0.5, &[P_BOWL]),
        'Q' => cell(0.5, &[O_RING, &[(0.3, 0.2), (0.5, 0.0)]]),
        'R' => cell(0.5, &[P_BOWL, &[(0.2, 0.5), (0.5, 0.0)]]),
        'S' => cell(
            0.5,
            &[&[
                (0.5, 0.9),
                (0.4, 1.0),
                (0.1, 1.0),
                (0.0, 0.9),
                (0.0, 0.6),
                (0.1, 0.5),
                (0.4, 0.5),
                (0.5, 0.4),
                (0.5, 0.1),
                (0.4, 0.0),
                (0.1, 0.0),
                (0.0, 0.1),
            ]],
        ),
        'T' => cell(0.5, &[&[(0.0, 1.0), (0.5, 1.0)], &[(0.25, 1.0), (0.25, 0.0)]]),
        'U' => cell(0.5, &[&[(0.0, 1.0), (0.0, 0.1), (0.1, 0.0), (0.4, 0.0), (0.5, 0.1), (0.5, 1.0)]]),
        'V' => cell(0.5, &[&[(0.0, 1.0), (0.25, 0.0), (0.5, 1.0)]]),
        'W' => cell(0.5, &[&[(0.0, 1.0), (0.1, 0.0), (0.25, 0.5), (0.4, 0.0), (0.5, 1.0)]]),
        'X' => cell(0.5, &[&[(0.0, 0.0), (0.5, 1.0)], &[(0.0, 1.0), (0.5, 0.0)]]),
        'Y' => cell(0.5, &[&[(0.0, 1.0), (0.25, 0.5), (0.5, 1.0)], &[(0.25, 0.5), (0.25, 0.0)]]),
        'Z' => cell(0.5, &[&[(0.0, 1.0), (0.5, 1.0), (0.0, 0.0), (0.5, 0.0)]]),
        '0' => cell(0.5, &[O_RING, &[(0.0, 0.1), (0.5, 0.9)]]),
        '1' => cell(0.3, &[&[(0.0, 0.8), (0.15, 1.0), (0.15, 0.0)], &[(0.0, 0.0), (0.3, 0.0)]]),
        '2' => cell(
            0.5,
            &[&[(0.0, 0.9), (0.1, 1.0), (0.4, 1.0), (0.5, 0.9), (0.5, 0.6), (0.0, 0.0), (0.5, 0.0)]],
        ),
        '3' => cell(
            0.5,
            &[
                &[
                    (0.0, 0.9),
                    (0.1, 1.0),
                    (0.4, 1.0),
                    (0.5, 0.9),
                    (0.5, 0.6),
                    (0.4, 0.5),
                    (0.5, 0.4),
                    (0.5, 0.1),
                    (0.4, 0.0),
                    (0.1, 0.0),
                    (0.0, 0.1),
                ],
                &[(0.15, 0.5), (0.4, 0.5)],
            ],
        ),
        '4' => cell(0.5, &[&[(0.4, 0.0), (0.4, 1.0), (0.0, 0.3), (0.5, 0.3)]]),
        '5' => cell(
            0.5,
            &[&[
                (0.5, 1.0),
                (0.0, 1.0),
                (0.0, 0.55),
                (0.4, 0.55),
                (0.5, 0.45),
                (0.5, 0.1),
                (0.4, 0.0),
                (0.0, 0.0),
            ]],
        ),
        '6' => cell(
            0.5,
            &[&[
                (0.45, 1.0),
                (0.1, 1.0),
                (0.0, 0.9),
                (0.0, 0.1),
                (0.1, 0.0),
                (0.4, 0.0),
                (0.5, 0.1),
                (0.5, 0.45),
                (0.4, 0.55),
                (0.0, 0.55),
            ]],
        ),
        '7' => cell(0.5, &[&[(0.0, 1.0), (0.5, 1.0), (0.15, 0.0)]]),
        '8' => cell(
            0.5,
            &[
                &[(0.1, 0.5), (0.0, 0.6), (0.0, 0.9), (0.1, 1.0), (0.4, 1.0), (0.5, 0.9), (0.5, 0.6), (0.4, 0.5), (0.1, 0.5)],
                &[(0.1, 0.5), (0.0, 0.4), (0.0, 0.1), (0.1, 0.0), (0.4, 0.0), (0.5, 0.1), (0.5, 0.4), (0.4, 0.5)],
            ],
        ),
        '9' => cell(
            0.5,
            &[&[
                (0.5, 0.45),
                (0.1, 0.45),
                (0.0, 0.55),
                (0.0, 0.9),
                (0.1, 1.0),
                (0.4, 1.0),
                (0.5, 0.9),
                (0.5, 0.1),
                (0.4, 0.0),
                (0.05, 0.0),
            ]],
        ),
        '.' => cell(0.0, &[&[(0.0, 0.0)]]),
        ',' => cell(0.1, &[&[(0.1, 0.1), (0.0, -0.1)]]),
        ':' => cell(0.0, &[&[(0.0, 0.7)], &[(0.0, 0.2)]]),
        '!' => cell(0.0, &[&[(0.0, 1.0), (0.0, 0.3)], &[(0.0, 0.0)]]),
        '?' => cell(
            0.5,
            &[
                &[(0.0, 0.9), (0.1, 1.0), (0.4, 1.0), (0.5, 0.9), (0.5, 0.6), (0.25, 0.4), (0.25, 0.3)],
                &[(0.25, 0.0)],
            ],
        ),
        '-' => cell(0.3, &[&[(0.0, 0.5), (0.3, 0.5)]]),
        '+' => cell(0.4, &[&[(0.0, 0.5), (0.4, 0.5)], &[(0.2, 0.3), (0.2, 0.7)]]),
        '=' => cell(0.4, &[&[(0.0, 0.35), (0.4, 0.35)], &[(0.0, 0.65), (0.4, 0.65)]]),
        '/' => cell(0.5, &[&[(0.0, 0.0), (0.5, 1.0)]]),
        '_' => cell(0.5, &[&[(0.0, 0.0), (0.5, 0.0)]]),
        c if c.is_ascii_lowercase() => return glyph(c.to_ascii_uppercase()),
        _ => return None,
    };
    Some(glyph)
}

/// Horizontal anchor of each line relative to the insertion point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical anchor of the whole block relative to the insertion point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    Top,
    Center,
    #[default]
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Align {
    pub horizontal: HAlign,
    pub vertical: VAlign,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid text alignment '{0}': expected [LCR][TBC]")]
pub struct AlignError(pub String);

impl FromStr for Align {
    type Err = AlignError;

    /// Parse codes like `"L"`, `"CT"` or `"RB"`; missing parts fall back to the defaults
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let horizontal = match chars.next() {
            None | Some('L') => HAlign::Left,
            Some('C') => HAlign::Center,
            Some('R') => HAlign::Right,
            Some(_) => return Err(AlignError(s.to_string())),
        };
        let vertical = match chars.next() {
            None | Some('B') => VAlign::Bottom,
            Some('C') => VAlign::Center,
            Some('T') => VAlign::Top,
            Some(_) => return Err(AlignError(s.to_string())),
        };
        if chars.next().is_some() {
            return Err(AlignError(s.to_string()));
        }
        Ok(Self { horizontal, vertical })
    }
}

/// One straight stroke with round caps, in world units
fn segment((ax, ay): (f64, f64), (bx, by): (f64, f64), r: f64) -> Expression {
    let length = (bx - ax).hypot(by - ay);
    let caps = circle(ax, ay, r).union(&circle(bx, by, r));
    if length == 0.0 {
        return caps;
    }
    let angle = (by - ay).atan2(bx - ax).to_degrees();
    let bar = rotate_z(&rectangle(0.0, length, -r, r), angle, 0.0, 0.0);
    translate(&bar, ax, ay, 0.0).union(&caps)
}

/// Width of one line in glyph heights, without the trailing gap
fn line_width(line: &str) -> f64 {
    let total: f64 = line
        .chars()
        .map(|c| glyph(c).map_or(0.5, |g| g.width) + GAP)
        .sum();
    (total - GAP).max(0.0)
}

/// Lay out `text` with its anchor at `(x, y)`.
///
/// Lines are separated by `\n` and advance downward by `line_spacing` glyph
/// heights. Characters without a glyph are laid out as spaces.
pub fn text(text: &str, x: f64, y: f64, height: f64, align: Align, line_spacing: f64) -> Expression {
    let lines: Vec<&str> = text.split('\n').collect();
    let block = 1.0 + (lines.len() as f64 - 1.0) * line_spacing;
    let top = match align.vertical {
        VAlign::Top => y,
        VAlign::Center => y + block * height / 2.0,
        VAlign::Bottom => y + block * height,
    };
    let r = STROKE * height;

    let mut pieces = Vec::new();
    for (row, line) in lines.iter().enumerate() {
        let baseline = top - height - row as f64 * line_spacing * height;
        let width = line_width(line) * height;
        let mut cursor = match align.horizontal {
            HAlign::Left => x,
            HAlign::Center => x - width / 2.0,
            HAlign::Right => x - width,
        };

        for c in line.chars() {
            let Some(g) = glyph(c) else {
                debug!(character = ?c, "No glyph; laying out as space");
                cursor += (0.5 + GAP) * height;
                continue;
            };
            let place = |(px, py): (f64, f64)| (cursor + px * height, baseline + py * height);
            for stroke in g.strokes {
                let mut points = stroke.iter().copied().map(place);
                let Some(mut prev) = points.next() else { continue };
                if stroke.len() == 1 {
                    pieces.push(circle(prev.0, prev.1, r));
                }
                for next in points {
                    pieces.push(segment(prev, next, r));
                    prev = next;
                }
            }
            cursor += (g.width + GAP) * height;
        }
    }
    Expression::union_all(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_align_parsing() {
        assert_eq!("".parse::<Align>().unwrap(), Align::default());
        let ct: Align = "CT".parse().unwrap();
        assert_eq!(ct.horizontal, HAlign::Center);
        assert_eq!(ct.vertical, VAlign::Top);
        assert!("Q".parse::<Align>().is_err());
        assert!("LBX".parse::<Align>().is_err());
    }

    #[test]
    fn test_single_glyph_covers_strokes() {
        let t = text("L", 0.0, 0.0, 1.0, Align::default(), 1.2);
        assert!(t.contains(&Point3::new(0.0, 0.5, 0.0)));
        assert!(t.contains(&Point3::new(0.4, 0.0, 0.0)));
        assert!(!t.contains(&Point3::new(0.4, 0.6, 0.0)));

        let b = t.bounds();
        assert!(b.min.x <= -STROKE && b.max.x >= 0.5 + STROKE);
        assert!(b.min.y <= -STROKE && b.max.y >= 1.0 + STROKE);
    }

    #[test]
    fn test_alignment_shifts_block() {
        let left = text("HI", 0.0, 0.0, 2.0, Align::default(), 1.2);
        let right = text("HI", 0.0, 0.0, 2.0, "RT".parse().unwrap(), 1.2);
        assert!(left.bounds().min.x < 0.0 && left.bounds().max.x > 1.0);
        assert!(right.bounds().max.x <= 0.2 && right.bounds().max.y <= 0.2);
    }

    #[test]
    fn test_lowercase_and_unknown_characters() {
        let upper = text("AB", 0.0, 0.0, 1.0, Align::default(), 1.2);
        let lower = text("ab", 0.0, 0.0, 1.0, Align::default(), 1.2);
        assert_eq!(upper, lower);

        let spaced = text("A~B", 0.0, 0.0, 1.0, Align::default(), 1.2);
        assert!(spaced.bounds().max.x > upper.bounds().max.x);
        assert!(text("", 0.0, 0.0, 1.0, Align::default(), 1.2).bounds().is_empty());
    }

    #[test]
    fn test_lines_stack_downward() {
        let one = text("A", 0.0, 0.0, 1.0, Align::default(), 1.5);
        let two = text("A\nA", 0.0, 0.0, 1.0, Align::default(), 1.5);
        assert!(two.bounds().max.y > one.bounds().max.y + 1.0);
        assert!((two.bounds().min.y - one.bounds().min.y).abs() < 1e-9);
    }
}
