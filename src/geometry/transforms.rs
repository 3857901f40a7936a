// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Shape transforms and combinators
//!
//! Coordinate remaps are expressed as a [`Transform`]: the forward
//! substitution rewrites the formula, and the inverse substitution (or an
//! explicit [`BoundsRule`]) rewrites the bounds. Angles are in degrees.

use super::{Axis, Bounds, BoundsRule, Expression, Formula, Substitution, Transform};
use crate::utils::math::deg_to_rad;
use std::f64::consts::E;

fn var(axis: Axis) -> Formula {
    match axis {
        Axis::X => Formula::X,
        Axis::Y => Formula::Y,
        Axis::Z => Formula::Z,
    }
}

fn substitution(entries: Vec<(Axis, Formula)>) -> Substitution {
    let mut map = Substitution::default();
    for (axis, formula) in entries {
        match axis {
            Axis::X => map.x = Some(formula),
            Axis::Y => map.y = Some(formula),
            Axis::Z => map.z = Some(formula),
        }
    }
    map
}

/// Shift a shape by `(dx, dy, dz)`
pub fn translate(e: &Expression, dx: f64, dy: f64, dz: f64) -> Expression {
    let forward = Substitution::new(
        Some(Formula::X - dx),
        Some(Formula::Y - dy),
        Some(Formula::Z - dz),
    );
    let inverse = Substitution::new(
        Some(Formula::X + dx),
        Some(Formula::Y + dy),
        Some(Formula::Z + dz),
    );
    e.map(&Transform::new(forward, inverse))
}

/// Rotate in the plane of `u` and `v`, turning `u` toward `v`, about `(u0, v0)`.
///
/// The inverse map is linear, so interval evaluation over the old box gives
/// the axis-aligned box of its rotated corners.
fn rotate_plane(e: &Expression, angle: f64, (u, u0): (Axis, f64), (v, v0): (Axis, f64)) -> Expression {
    let (s, c) = deg_to_rad(angle).sin_cos();
    let du = var(u) - u0;
    let dv = var(v) - v0;

    let forward = substitution(vec![
        (u, u0 + c * du.clone() + s * dv.clone()),
        (v, v0 - s * du.clone() + c * dv.clone()),
    ]);
    let inverse = substitution(vec![
        (u, u0 + c * du.clone() - s * dv.clone()),
        (v, v0 + s * du + c * dv),
    ]);
    e.map(&Transform::new(forward, inverse))
}

/// Rotate about an axis parallel to X through `(y0, z0)`
pub fn rotate_x(e: &Expression, angle: f64, y0: f64, z0: f64) -> Expression {
    rotate_plane(e, angle, (Axis::Y, y0), (Axis::Z, z0))
}

/// Rotate about an axis parallel to Y through `(x0, z0)`
pub fn rotate_y(e: &Expression, angle: f64, x0: f64, z0: f64) -> Expression {
    rotate_plane(e, angle, (Axis::Z, z0), (Axis::X, x0))
}

/// Rotate about an axis parallel to Z through `(x0, y0)`
pub fn rotate_z(e: &Expression, angle: f64, x0: f64, y0: f64) -> Expression {
    rotate_plane(e, angle, (Axis::X, x0), (Axis::Y, y0))
}

fn reflect(e: &Expression, axis: Axis, pivot: f64) -> Expression {
    let map = substitution(vec![(axis, 2.0 * pivot - var(axis))]);
    e.map(&Transform::new(map.clone(), map))
}

/// Mirror across the plane `X = x0`
pub fn reflect_x(e: &Expression, x0: f64) -> Expression {
    reflect(e, Axis::X, x0)
}

/// Mirror across the plane `Y = y0`
pub fn reflect_y(e: &Expression, y0: f64) -> Expression {
    reflect(e, Axis::Y, y0)
}

/// Mirror across the plane `Z = z0`
pub fn reflect_z(e: &Expression, z0: f64) -> Expression {
    reflect(e, Axis::Z, z0)
}

fn swap(e: &Expression, a: Axis, b: Axis) -> Expression {
    let map = substitution(vec![(a, var(b)), (b, var(a))]);
    e.map(&Transform::new(map.clone(), map))
}

/// Mirror across the plane `X = Y`
pub fn reflect_xy(e: &Expression) -> Expression {
    swap(e, Axis::X, Axis::Y)
}

/// Mirror across the plane `X = Z`
pub fn reflect_xz(e: &Expression) -> Expression {
    swap(e, Axis::X, Axis::Z)
}

/// Mirror across the plane `Y = Z`
pub fn reflect_yz(e: &Expression) -> Expression {
    swap(e, Axis::Y, Axis::Z)
}

fn scale_axes(e: &Expression, entries: &[(Axis, f64, f64)]) -> Expression {
    let forward = substitution(
        entries
            .iter()
            .map(|&(axis, origin, s)| (axis, origin + (var(axis) - origin) / s))
            .collect(),
    );
    let inverse = substitution(
        entries
            .iter()
            .map(|&(axis, origin, s)| (axis, origin + (var(axis) - origin) * s))
            .collect(),
    );
    e.map(&Transform::new(forward, inverse))
}

pub fn scale_x(e: &Expression, x0: f64, sx: f64) -> Expression {
    scale_axes(e, &[(Axis::X, x0, sx)])
}

pub fn scale_y(e: &Expression, y0: f64, sy: f64) -> Expression {
    scale_axes(e, &[(Axis::Y, y0, sy)])
}

pub fn scale_z(e: &Expression, z0: f64, sz: f64) -> Expression {
    scale_axes(e, &[(Axis::Z, z0, sz)])
}

pub fn scale_xyz(
    e: &Expression,
    (x0, y0, z0): (f64, f64, f64),
    (sx, sy, sz): (f64, f64, f64),
) -> Expression {
    scale_axes(e, &[(Axis::X, x0, sx), (Axis::Y, y0, sy), (Axis::Z, z0, sz)])
}

/// Linear ramp from `a` at `t0` to `b` at `t1` along `axis`
fn ramp(axis: Axis, t0: f64, t1: f64, a: f64, b: f64) -> Formula {
    a + (var(axis) - t0) * ((b - a) / (t1 - t0))
}

/// Shift X by an amount that varies linearly from `dx0` at `y0` to `dx1` at `y1`
pub fn shear_x_y(e: &Expression, y0: f64, y1: f64, dx0: f64, dx1: f64) -> Expression {
    let offset = ramp(Axis::Y, y0, y1, dx0, dx1);
    let forward = Substitution::new(Some(Formula::X - offset.clone()), None, None);
    let inverse = Substitution::new(Some(Formula::X + offset), None, None);
    e.map(&Transform::new(forward, inverse))
}

/// Scale X about `x0` by a factor varying linearly from `s0` at `y0` to `s1` at `y1`
pub fn taper_x_y(e: &Expression, x0: f64, y0: f64, y1: f64, s0: f64, s1: f64) -> Expression {
    let factor = ramp(Axis::Y, y0, y1, s0, s1);
    let dx = Formula::X - x0;
    let forward = Substitution::new(Some(x0 + dx.clone() / factor.clone()), None, None);
    let inverse = Substitution::new(Some(x0 + dx * factor), None, None);
    e.map(&Transform::new(forward, inverse))
}

/// Scale X and Y about `(x0, y0)` by a factor varying linearly from `s0` at `z0` to `s1` at `z1`
pub fn taper_xy_z(
    e: &Expression,
    (x0, y0): (f64, f64),
    (z0, z1): (f64, f64),
    (s0, s1): (f64, f64),
) -> Expression {
    let factor = ramp(Axis::Z, z0, z1, s0, s1);
    let dx = Formula::X - x0;
    let dy = Formula::Y - y0;
    let forward = Substitution::new(
        Some(x0 + dx.clone() / factor.clone()),
        Some(y0 + dy.clone() / factor.clone()),
        None,
    );
    let inverse = Substitution::new(Some(x0 + dx * factor.clone()), Some(y0 + dy * factor), None);
    e.map(&Transform::new(forward, inverse))
}

/// Rotate about `(x0, y0)` by an angle growing from 0 at `z0` to `angle` at `z1`
pub fn twist_z(e: &Expression, (x0, y0): (f64, f64), (z0, z1): (f64, f64), angle: f64) -> Expression {
    let theta = ramp(Axis::Z, z0, z1, 0.0, deg_to_rad(angle));
    let (s, c) = (theta.clone().sin(), theta.cos());
    let dx = Formula::X - x0;
    let dy = Formula::Y - y0;

    let forward = Substitution::new(
        Some(x0 + c.clone() * dx.clone() + s.clone() * dy.clone()),
        Some(y0 - s.clone() * dx.clone() + c.clone() * dy.clone()),
        None,
    );
    let inverse = Substitution::new(
        Some(x0 + c.clone() * dx.clone() - s.clone() * dy.clone()),
        Some(y0 + s * dx + c * dy),
        None,
    );
    e.map(&Transform::new(forward, inverse))
}

/// Revolve the XY profile about the line `Y = y0, Z = 0`
pub fn revolve_x(e: &Expression, y0: f64) -> Expression {
    let r = ((Formula::Y - y0).square() + Formula::Z.square()).sqrt();
    let forward = Substitution::new(None, Some(y0 + r), Some(Formula::constant(0.0)));
    e.map(&Transform::with_rule(
        forward,
        BoundsRule::Revolve { axis: Axis::X, center: y0 },
    ))
}

/// Revolve the XY profile about the line `X = x0, Z = 0`
pub fn revolve_y(e: &Expression, x0: f64) -> Expression {
    let r = ((Formula::X - x0).square() + Formula::Z.square()).sqrt();
    let forward = Substitution::new(Some(x0 + r), None, Some(Formula::constant(0.0)));
    e.map(&Transform::with_rule(
        forward,
        BoundsRule::Revolve { axis: Axis::Y, center: x0 },
    ))
}

/// Revolve the XZ profile about the line `X = x0, Y = 0`
pub fn revolve_z(e: &Expression, x0: f64) -> Expression {
    let r = ((Formula::X - x0).square() + Formula::Y.square()).sqrt();
    let forward = Substitution::new(Some(x0 + r), Some(Formula::constant(0.0)), None);
    e.map(&Transform::with_rule(
        forward,
        BoundsRule::Revolve { axis: Axis::Z, center: x0 },
    ))
}

fn slab_z(zmin: f64, zmax: f64) -> Formula {
    Formula::max(zmin - Formula::Z, Formula::Z - zmax)
}

/// Bound a 2D shape between two Z planes
pub fn extrude_z(e: &Expression, zmin: f64, zmax: f64) -> Expression {
    Expression::new(
        Formula::max(e.formula().clone(), slab_z(zmin, zmax)),
        e.bounds().with_z(zmin, zmax),
    )
}

/// Blend from 2D shape `a` at `zmin` to 2D shape `b` at `zmax`
pub fn loft(a: &Expression, b: &Expression, zmin: f64, zmax: f64) -> Expression {
    let weighted = ((Formula::Z - zmin) * b.formula().clone()
        + (zmax - Formula::Z) * a.formula().clone())
        / (zmax - zmin);
    Expression::new(
        Formula::max(weighted, slab_z(zmin, zmax)),
        a.bounds().union(b.bounds()).with_z(zmin, zmax),
    )
}

/// Union with a rounded fillet where the two shapes meet.
///
/// The fillet only exists where `|a|` and `|b|` are both below `amount^2`, so
/// for distance-like fields the union box grown by `amount^2` encloses it.
pub fn blend(a: &Expression, b: &Expression, amount: f64) -> Expression {
    let fillet = a.formula().clone().abs().sqrt() + b.formula().clone().abs().sqrt() - amount;
    let joined = a.union(b);
    Expression::new(
        Formula::min(joined.formula().clone(), fillet),
        joined.bounds().grow(amount * amount),
    )
}

/// Interpolate between two shapes; `weight` 0 gives `a`, 1 gives `b`
pub fn morph(a: &Expression, b: &Expression, weight: f64) -> Expression {
    let formula = a.formula().clone() * (1.0 - weight) + b.formula().clone() * weight;
    // A convex combination is negative only where one operand is
    let bounds = if (0.0..=1.0).contains(&weight) {
        a.bounds().union(b.bounds())
    } else {
        Bounds::everything()
    };
    Expression::new(formula, bounds)
}

fn radial_warp(e: &Expression, (x, y, z): (f64, f64, f64), radius: f64, sign: f64) -> Expression {
    let dx = Formula::X - x;
    let dy = Formula::Y - y;
    let dz = Formula::Z - z;
    let distance = (dx.clone().square() + dy.clone().square() + dz.clone().square()).sqrt();
    let falloff = 1.0 + sign * (-(distance / radius)).exp();

    let forward = Substitution::new(
        Some(x + dx * falloff.clone()),
        Some(y + dy * falloff.clone()),
        Some(z + dz * falloff),
    );
    e.map(&Transform::with_rule(forward, BoundsRule::Grow(radius / E)))
}

/// Pull the surface toward `(x, y, z)` with an exponential falloff of `radius`
pub fn attract(e: &Expression, center: (f64, f64, f64), radius: f64) -> Expression {
    radial_warp(e, center, radius, 1.0)
}

/// Push the surface away from `(x, y, z)` with an exponential falloff of `radius`
pub fn repel(e: &Expression, center: (f64, f64, f64), radius: f64) -> Expression {
    radial_warp(e, center, radius, -1.0)
}

/// Grow (positive) or shrink (negative) a distance-like shape
pub fn offset(e: &Expression, amount: f64) -> Expression {
    let bounds = if amount > 0.0 { e.bounds().grow(amount) } else { *e.bounds() };
    Expression::new(e.formula().clone() - amount, bounds)
}

/// Hollow out a shape, keeping a wall of the given thickness
pub fn shell(e: &Expression, thickness: f64) -> Expression {
    e.difference(&offset(e, -thickness))
}

/// Grid of `nx` by `ny` copies spaced by `(dx, dy)`
pub fn array_2d(e: &Expression, nx: usize, ny: usize, dx: f64, dy: f64) -> Expression {
    let copies = (0..ny).flat_map(|j| {
        (0..nx).map(move |i| translate(e, i as f64 * dx, j as f64 * dy, 0.0))
    });
    Expression::union_all(copies)
}

/// `n` copies rotated evenly about `(x0, y0)`
pub fn array_polar(e: &Expression, n: usize, x0: f64, y0: f64) -> Expression {
    Expression::union_all((0..n).map(|i| rotate_z(e, 360.0 * i as f64 / n as f64, x0, y0)))
}
