use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Force-directed layout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub enabled: bool,
    /// A band must hold more vertices than this for the layout to run.
    pub min_vertices: usize,
    pub iterations: u32,
    pub repulsion: f64,
    pub attraction: f64,
    pub damping: f64,
    pub boundary_strength: f64,
    pub convergence_threshold: f64,
    pub initial_temperature: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_vertices: 50,
            iterations: 200,
            repulsion: 1200.0,
            attraction: 0.02,
            damping: 0.85,
            boundary_strength: 0.5,
            convergence_threshold: 0.05,
            initial_temperature: 12.0,
        }
    }
}

impl LayoutConfig {
    pub fn applies_to(&self, vertex_count: usize) -> bool {
        self.enabled && vertex_count > self.min_vertices
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutReport {
    pub iterations: u32,
    pub converged: bool,
    pub max_displacement: f64,
}

/// Radius-normalized distance from `center`: 1.0 on the ellipse boundary.
fn elliptic_norm(rel: DVec2, radii: DVec2) -> f64 {
    let rx = radii.x.max(f64::EPSILON);
    let ry = radii.y.max(f64::EPSILON);
    ((rel.x / rx).powi(2) + (rel.y / ry).powi(2)).sqrt()
}

/// Relax `positions` in place inside the ellipse at `center` with semi-axes
/// `radii`. `edges` index into `positions`; out-of-range entries are ignored.
pub fn apply_layout(
    positions: &mut [DVec2],
    edges: &[(usize, usize)],
    center: DVec2,
    radii: DVec2,
    cfg: &LayoutConfig,
) -> LayoutReport {
    let n = positions.len();
    let mut report = LayoutReport::default();
    if n == 0 || cfg.iterations == 0 {
        return report;
    }

    let mut velocities = vec![DVec2::ZERO; n];
    let mut forces = vec![DVec2::ZERO; n];
    let mut temperature = cfg.initial_temperature;
    let cooling = 1.0 - 1.0 / f64::from(cfg.iterations);

    for iter in 0..cfg.iterations {
        forces.iter_mut().for_each(|f| *f = DVec2::ZERO);

        for i in 0..n {
            for j in i + 1..n {
                let delta = positions[i] - positions[j];
                let d2 = delta.length_squared().max(0.01);
                let dir = if d2 > 0.01 {
                    delta / d2.sqrt()
                } else {
                    // coincident points: split along a fixed axis
                    DVec2::from_angle((i + j) as f64)
                };
                let f = dir * (cfg.repulsion / d2);
                forces[i] += f;
                forces[j] -= f;
            }
        }

        for &(a, b) in edges {
            if a >= n || b >= n || a == b {
                continue;
            }
            let f = (positions[b] - positions[a]) * cfg.attraction;
            forces[a] += f;
            forces[b] -= f;
        }

        for (p, f) in positions.iter().zip(forces.iter_mut()) {
            let rel = *p - center;
            let norm = elliptic_norm(rel, radii);
            if norm > 0.9 {
                *f -= rel * (cfg.boundary_strength * (norm - 0.9) / norm);
            }
        }

        let mut max_disp: f64 = 0.0;
        for ((p, v), f) in positions.iter_mut().zip(&mut velocities).zip(&forces) {
            *v = (*v + *f) * cfg.damping;
            let mut step = *v;
            let len = step.length();
            if len > temperature {
                step *= temperature / len;
            }
            let before = *p;
            let mut next = *p + step;
            let rel = next - center;
            let norm = elliptic_norm(rel, radii);
            if norm > 1.0 {
                next = center + rel / norm * 0.999;
            }
            *p = next;
            max_disp = max_disp.max(before.distance(next));
        }

        temperature *= cooling;
        report.iterations = iter + 1;
        report.max_displacement = max_disp;
        if max_disp < cfg.convergence_threshold {
            report.converged = true;
            break;
        }
    }

    tracing::trace!(
        vertices = n,
        iterations = report.iterations,
        converged = report.converged,
        "layout pass"
    );
    report
}
