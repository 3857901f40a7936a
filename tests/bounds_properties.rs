// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Conservativeness of bounds under the shape algebra

use fabgraph::geometry::shapes::{circle, rectangle, sphere};
use fabgraph::geometry::transforms::{
    attract, blend, revolve_y, rotate_z, scale_xyz, taper_x_y, translate,
};
use fabgraph::{Bounds, Expression};
use nalgebra::Point3;
use proptest::prelude::*;

const EPS: f64 = 1e-9;

fn any_circle() -> impl Strategy<Value = Expression> {
    (-50.0..50.0f64, -50.0..50.0f64, 0.1..20.0f64).prop_map(|(x, y, r)| circle(x, y, r))
}

fn any_rectangle() -> impl Strategy<Value = Expression> {
    (-50.0..50.0f64, 0.1..30.0f64, -50.0..50.0f64, 0.1..30.0f64)
        .prop_map(|(x, w, y, h)| rectangle(x, x + w, y, y + h))
}

fn any_shape() -> impl Strategy<Value = Expression> {
    prop_oneof![any_circle(), any_rectangle()]
}

/// Grid samples inside a box that the expression classifies as inside
fn inside_samples(e: &Expression, region: &Bounds, z: f64) -> Vec<Point3<f64>> {
    let n = 24;
    let mut out = Vec::new();
    for i in 0..=n {
        for j in 0..=n {
            let x = region.min.x + (region.max.x - region.min.x) * i as f64 / n as f64;
            let y = region.min.y + (region.max.y - region.min.y) * j as f64 / n as f64;
            let p = Point3::new(x, y, z);
            if e.contains(&p) {
                out.push(p);
            }
        }
    }
    out
}

fn grown(b: &Bounds) -> Bounds {
    b.grow(1e-6)
}

proptest! {
    #[test]
    fn union_bounds_contain_operands(a in any_shape(), b in any_shape()) {
        let u = a.union(&b);
        prop_assert!(u.bounds().contains(a.bounds()));
        prop_assert!(u.bounds().contains(b.bounds()));
    }

    #[test]
    fn intersection_bounds_inside_operands(a in any_shape(), b in any_shape()) {
        let i = a.intersection(&b);
        prop_assert!(a.bounds().contains(i.bounds()));
        prop_assert!(b.bounds().contains(i.bounds()));
    }

    #[test]
    fn move_round_trip(s in any_shape(), dx in -100.0..100.0f64, dy in -100.0..100.0f64, dz in -100.0..100.0f64) {
        let back = translate(&translate(&s, dx, dy, dz), -dx, -dy, -dz);
        prop_assert!(back.bounds().approx_eq(s.bounds(), 1e-6));
        for (x, y) in [(0.0, 0.0), (10.0, -5.0), (-20.0, 30.0)] {
            prop_assert!((back.eval(x, y, 0.0) - s.eval(x, y, 0.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn rotated_points_stay_inside_bounds(s in any_rectangle(), angle in -360.0..360.0f64) {
        let r = rotate_z(&s, angle, 0.0, 0.0);
        let region = r.bounds().grow(1.0);
        for p in inside_samples(&r, &region, 0.0) {
            prop_assert!(grown(r.bounds()).contains_point(&p), "{:?} outside {:?}", p, r.bounds());
        }
    }

    #[test]
    fn scaled_points_stay_inside_bounds(
        s in any_circle(),
        sx in 0.2..4.0f64,
        sy in 0.2..4.0f64,
    ) {
        let scaled = scale_xyz(&s, (1.0, -2.0, 0.0), (sx, sy, 1.0));
        let region = scaled.bounds().grow(1.0);
        for p in inside_samples(&scaled, &region, 0.0) {
            prop_assert!(grown(scaled.bounds()).contains_point(&p));
        }
    }

    #[test]
    fn blend_bounds_contain_union(a in any_circle(), b in any_circle(), amount in 0.0..2.0f64) {
        let blended = blend(&a, &b, amount);
        prop_assert!(blended.bounds().contains(a.union(&b).bounds()));
    }
}

#[test]
fn scenario_circle_union_bounds() {
    let a = circle(0.0, 0.0, 5.0);
    let b = circle(10.0, 0.0, 5.0);
    let u = a.union(&b);

    let expect = |e: &Expression, xmin: f64, ymin: f64, xmax: f64, ymax: f64| {
        let bounds = e.bounds();
        assert!((bounds.min.x - xmin).abs() < EPS);
        assert!((bounds.min.y - ymin).abs() < EPS);
        assert!((bounds.max.x - xmax).abs() < EPS);
        assert!((bounds.max.y - ymax).abs() < EPS);
    };
    expect(&a, -5.0, -5.0, 5.0, 5.0);
    expect(&b, 5.0, -5.0, 15.0, 5.0);
    expect(&u, -5.0, -5.0, 15.0, 5.0);
}

#[test]
fn disjoint_intersection_is_empty_but_representable() {
    let i = circle(0.0, 0.0, 1.0).intersection(&circle(10.0, 0.0, 1.0));
    assert!(i.bounds().is_empty());
    assert_eq!(i.bounds().min.x, 9.0);
    assert_eq!(i.bounds().max.x, 1.0);
}

#[test]
fn difference_keeps_left_operand_box() {
    let d = rectangle(0.0, 10.0, 0.0, 10.0).difference(&circle(5.0, 5.0, 2.0));
    assert!(d.bounds().approx_eq(&Bounds::flat(0.0, 0.0, 10.0, 10.0), EPS));
}

#[test]
fn revolve_encloses_swept_profile() {
    let profile = rectangle(2.0, 3.0, -1.0, 1.0);
    let solid = revolve_y(&profile, 0.0);
    let bounds = solid.bounds();
    assert!(bounds.has_xyz_extent());
    for angle in [0.0f64, 45.0, 90.0, 180.0, 270.0] {
        let (s, c) = angle.to_radians().sin_cos();
        let p = Point3::new(2.5 * c, 0.0, 2.5 * s);
        assert!(solid.contains(&p), "{angle}");
        assert!(bounds.contains_point(&p));
    }
}

#[test]
fn warp_and_taper_stay_conservative() {
    let s = sphere(0.0, 0.0, 0.0, 2.0);
    let warped = attract(&s, (1.0, 0.0, 0.0), 1.0);
    assert!(warped.bounds().contains(s.bounds()));

    let tapered = taper_x_y(&rectangle(-1.0, 1.0, 0.0, 4.0), 0.0, 0.0, 4.0, 1.0, 0.5);
    let region = tapered.bounds().grow(1.0);
    for p in inside_samples(&tapered, &region, 0.0) {
        assert!(grown(tapered.bounds()).contains_point(&p));
    }
}

#[test]
fn infinite_bounds_are_never_narrowed() {
    let half_plane = Expression::new(fabgraph::geometry::Formula::X, Bounds::everything());
    let moved = translate(&half_plane, 1.0, 2.0, 3.0);
    assert_eq!(*moved.bounds(), Bounds::everything());
    let rotated = rotate_z(&half_plane, 30.0, 0.0, 0.0);
    assert!(!rotated.bounds().has_xy_extent());
}
