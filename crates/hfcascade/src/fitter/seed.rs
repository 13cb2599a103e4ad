//! Transverse crossing points of two trajectories, used as fit seeds.

use crate::track::Trajectory2D;

/// Lines whose direction cross product is below this are treated as parallel.
const PARALLEL_EPS: f64 = 1e-9;
/// Centers closer than this are treated as concentric.
const CONCENTRIC_EPS: f64 = 1e-9;

/// Candidate vertex position in the transverse plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Seed2D {
    pub x: f64,
    pub y: f64,
    /// Squared transverse gap between the trajectories at this point.
    pub sep2: f64,
}

/// Up to two seeds; tangent or non-crossing trajectories give one, parallel
/// lines and concentric circles give none.
pub(crate) fn crossings(a: &Trajectory2D, b: &Trajectory2D) -> Vec<Seed2D> {
    use Trajectory2D::{Circle, Line};
    match (*a, *b) {
        (Circle { xc: x1, yc: y1, r: r1 }, Circle { xc: x2, yc: y2, r: r2 }) => {
            circle_circle([x1, y1], r1, [x2, y2], r2)
        }
        (Circle { xc, yc, r }, Line { x0, y0, ux, uy })
        | (Line { x0, y0, ux, uy }, Circle { xc, yc, r }) => {
            circle_line([xc, yc], r, [x0, y0], [ux, uy])
        }
        (
            Line { x0: ax, y0: ay, ux: aux, uy: auy },
            Line { x0: bx, y0: by, ux: bux, uy: buy },
        ) => line_line([ax, ay], [aux, auy], [bx, by], [bux, buy])
            .into_iter()
            .collect(),
    }
}

fn circle_circle(c1: [f64; 2], r1: f64, c2: [f64; 2], r2: f64) -> Vec<Seed2D> {
    let dx = c2[0] - c1[0];
    let dy = c2[1] - c1[1];
    let d = dx.hypot(dy);
    if d < CONCENTRIC_EPS {
        return Vec::new();
    }
    let (ux, uy) = (dx / d, dy / d);

    if d > r1 + r2 {
        // Disjoint: split the gap between the closest points.
        let gap = d - r1 - r2;
        let t = r1 + 0.5 * gap;
        return vec![Seed2D {
            x: c1[0] + ux * t,
            y: c1[1] + uy * t,
            sep2: gap * gap,
        }];
    }
    if d < (r1 - r2).abs() {
        // Nested: closest points lie on the far side of the inner circle.
        let (p1, p2) = if r1 > r2 {
            ([c1[0] + ux * r1, c1[1] + uy * r1], [c2[0] + ux * r2, c2[1] + uy * r2])
        } else {
            ([c1[0] - ux * r1, c1[1] - uy * r1], [c2[0] - ux * r2, c2[1] - uy * r2])
        };
        let gap = (r1 - r2).abs() - d;
        return vec![Seed2D {
            x: 0.5 * (p1[0] + p2[0]),
            y: 0.5 * (p1[1] + p2[1]),
            sep2: gap * gap,
        }];
    }

    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();
    let bx = c1[0] + ux * a;
    let by = c1[1] + uy * a;
    if h < CONCENTRIC_EPS {
        return vec![Seed2D { x: bx, y: by, sep2: 0.0 }];
    }
    vec![
        Seed2D { x: bx - uy * h, y: by + ux * h, sep2: 0.0 },
        Seed2D { x: bx + uy * h, y: by - ux * h, sep2: 0.0 },
    ]
}

fn circle_line(c: [f64; 2], r: f64, p0: [f64; 2], u: [f64; 2]) -> Vec<Seed2D> {
    let wx = p0[0] - c[0];
    let wy = p0[1] - c[1];
    let b = u[0] * wx + u[1] * wy;
    let disc = b * b - (wx * wx + wy * wy - r * r);
    if disc >= 0.0 {
        let root = disc.sqrt();
        let mut out = vec![Seed2D {
            x: p0[0] + u[0] * (-b - root),
            y: p0[1] + u[1] * (-b - root),
            sep2: 0.0,
        }];
        if root > CONCENTRIC_EPS {
            out.push(Seed2D {
                x: p0[0] + u[0] * (-b + root),
                y: p0[1] + u[1] * (-b + root),
                sep2: 0.0,
            });
        }
        return out;
    }
    // No intersection: midpoint between the line's closest point to the
    // center and the circle point facing it.
    let qx = p0[0] - u[0] * b;
    let qy = p0[1] - u[1] * b;
    let dist = (qx - c[0]).hypot(qy - c[1]);
    if dist < CONCENTRIC_EPS {
        return Vec::new();
    }
    let px = c[0] + r * (qx - c[0]) / dist;
    let py = c[1] + r * (qy - c[1]) / dist;
    let gap = dist - r;
    vec![Seed2D {
        x: 0.5 * (px + qx),
        y: 0.5 * (py + qy),
        sep2: gap * gap,
    }]
}

fn line_line(p1: [f64; 2], u1: [f64; 2], p2: [f64; 2], u2: [f64; 2]) -> Option<Seed2D> {
    let cross = u1[0] * u2[1] - u1[1] * u2[0];
    if cross.abs() < PARALLEL_EPS {
        return None;
    }
    let wx = p2[0] - p1[0];
    let wy = p2[1] - p1[1];
    let t = (wx * u2[1] - wy * u2[0]) / cross;
    Some(Seed2D {
        x: p1[0] + u1[0] * t,
        y: p1[1] + u1[1] * t,
        sep2: 0.0,
    })
}
