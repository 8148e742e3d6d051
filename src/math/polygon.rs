use super::{Point2, Point3, Vector3, TOLERANCE};

/// Computes the (unnormalized) normal of a polygon using Newell's method.
///
/// The magnitude equals twice the polygon area, so a near-zero result
/// indicates a degenerate polygon.
#[must_use]
pub fn newell_normal(points: &[Point3]) -> Vector3 {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    normal
}

/// Returns the unit face normal of a polygon, or `None` if it is degenerate.
#[must_use]
pub fn face_normal(points: &[Point3]) -> Option<Vector3> {
    let normal = newell_normal(points);
    let len = normal.norm();
    (len > TOLERANCE).then(|| normal / len)
}

/// Arithmetic mean of a set of points. Returns the origin for an empty slice.
#[must_use]
pub fn centroid(points: &[Point3]) -> Point3 {
    if points.is_empty() {
        return Point3::origin();
    }
    #[allow(clippy::cast_precision_loss)]
    let inv_n = 1.0 / points.len() as f64;
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum * inv_n)
}

/// Builds an orthonormal `(u, v)` basis spanning the plane with the given normal.
#[must_use]
pub fn plane_basis(normal: &Vector3) -> (Vector3, Vector3) {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = normal.cross(&helper).normalize();
    let v = normal.cross(&u);
    (u, v)
}

/// Projects 3D points onto the plane through `origin` spanned by `(u, v)`.
#[must_use]
pub fn project_to_plane(points: &[Point3], origin: &Point3, u: &Vector3, v: &Vector3) -> Vec<Point2> {
    points
        .iter()
        .map(|p| {
            let d = p - origin;
            Point2::new(d.dot(u), d.dot(v))
        })
        .collect()
}
