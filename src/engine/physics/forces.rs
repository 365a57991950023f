use std::collections::HashMap;
use std::f32::consts::TAU;

use glam::{Vec2, vec2};

use super::{Body, Force};

const MIN_DISTANCE: f32 = 0.0001;

/// Pushes bodies back inside an axis-aligned rectangle. A body exactly on the
/// boundary receives no correction; one outside is pushed in proportionally
/// to how far it strayed, scaled by alpha.
pub struct BorderForce {
    pub width: f32,
    pub height: f32,
    pub center: Vec2,
    pub node_radius: f32,
    pub strength: f32,
}

impl Force for BorderForce {
    fn apply(&self, bodies: &mut [Body], alpha: f32) {
        let min = self.center - vec2(self.width, self.height) * 0.5
            + vec2(self.node_radius, self.node_radius);
        let max = self.center + vec2(self.width, self.height) * 0.5
            - vec2(self.node_radius, self.node_radius);
        let scale = self.strength * alpha;

        for body in bodies {
            if body.position.x < min.x {
                body.velocity.x += (min.x - body.position.x) * scale;
            } else if body.position.x > max.x {
                body.velocity.x -= (body.position.x - max.x) * scale;
            }
            if body.position.y < min.y {
                body.velocity.y += (min.y - body.position.y) * scale;
            } else if body.position.y > max.y {
                body.velocity.y -= (body.position.y - max.y) * scale;
            }
        }
    }
}

/// Pushes every body away from the centroid of every qualifying cluster other
/// than its own. Used both for annotation groups and for Louvain communities.
pub struct GroupRepulsionForce {
    assignment: Vec<Option<usize>>,
    min_group_size: usize,
    strength: f32,
}

/// Community separation is the same centroid repulsion, keyed by Louvain
/// community instead of annotation group.
pub type CommunityForce = GroupRepulsionForce;

impl GroupRepulsionForce {
    pub fn new(assignment: Vec<Option<usize>>, min_group_size: usize, strength: f32) -> Self {
        Self {
            assignment,
            min_group_size,
            strength,
        }
    }

    fn qualifying_centroids(&self, bodies: &[Body]) -> HashMap<usize, Vec2> {
        let mut sums: HashMap<usize, (Vec2, usize)> = HashMap::new();
        for (body, assigned) in bodies.iter().zip(&self.assignment) {
            if let Some(cluster) = assigned {
                let entry = sums.entry(*cluster).or_insert((Vec2::ZERO, 0));
                entry.0 += body.position;
                entry.1 += 1;
            }
        }

        sums.into_iter()
            .filter(|(_, (_, count))| *count >= self.min_group_size)
            .map(|(cluster, (sum, count))| (cluster, sum / count as f32))
            .collect()
    }
}

impl Force for GroupRepulsionForce {
    fn apply(&self, bodies: &mut [Body], alpha: f32) {
        let centroids = self.qualifying_centroids(bodies);
        if centroids.is_empty() {
            return;
        }

        let scale = self.strength * self.min_group_size as f32 * alpha;
        for (index, body) in bodies.iter_mut().enumerate() {
            let own = self.assignment.get(index).copied().flatten();
            for (&cluster, &centroid) in &centroids {
                if own == Some(cluster) {
                    continue;
                }
                let delta = body.position - centroid;
                let distance = delta.length();
                if distance < MIN_DISTANCE {
                    continue;
                }
                body.velocity += (delta / distance) * (scale / distance);
            }
        }
    }
}

/// Arranges every sufficiently large component on a circle around its own
/// centroid, highest-degree member at angle zero, and pushes overlapping
/// component circles apart.
pub struct CircularForce {
    pub component_of: Vec<Option<usize>>,
    pub adjacency: Vec<usize>,
    pub min_circle_size: usize,
    pub strength: f32,
}

struct Cluster {
    members: Vec<usize>,
    centroid: Vec2,
    radius: f32,
}

impl CircularForce {
    fn clusters(&self, bodies: &[Body]) -> Vec<Cluster> {
        let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
        for (index, assigned) in self.component_of.iter().enumerate() {
            if let Some(component) = assigned {
                members.entry(*component).or_default().push(index);
            }
        }

        let mut clusters: Vec<Cluster> = members
            .into_values()
            .filter(|members| members.len() >= self.min_circle_size)
            .map(|mut members| {
                // Descending degree, index as the tie-break, so the highest
                // connected member lands at angle zero.
                members.sort_by(|&a, &b| {
                    self.adjacency[b]
                        .cmp(&self.adjacency[a])
                        .then_with(|| a.cmp(&b))
                });
                let centroid = members
                    .iter()
                    .fold(Vec2::ZERO, |sum, &index| sum + bodies[index].position)
                    / members.len() as f32;
                let radius = 50.0 * (members.len() as f32).sqrt();
                Cluster {
                    members,
                    centroid,
                    radius,
                }
            })
            .collect();

        // Deterministic pair iteration for the overlap pass.
        clusters.sort_by_key(|cluster| cluster.members[0]);
        clusters
    }
}

impl Force for CircularForce {
    fn apply(&self, bodies: &mut [Body], alpha: f32) {
        let clusters = self.clusters(bodies);

        for cluster in &clusters {
            let count = cluster.members.len();
            for (slot, &index) in cluster.members.iter().enumerate() {
                let angle = (slot as f32 / count as f32) * TAU;
                let target = cluster.centroid + vec2(angle.cos(), angle.sin()) * cluster.radius;
                bodies[index].velocity += (target - bodies[index].position) * self.strength * alpha;
            }
        }

        for first in 0..clusters.len() {
            for second in (first + 1)..clusters.len() {
                let a = &clusters[first];
                let b = &clusters[second];
                let delta = a.centroid - b.centroid;
                let distance = delta.length();
                let overlap = (a.radius + b.radius) - distance;
                if overlap <= 0.0 {
                    continue;
                }

                let direction = if distance < MIN_DISTANCE {
                    vec2(1.0, 0.0)
                } else {
                    delta / distance
                };
                let push = direction * (overlap * 0.5 * self.strength * alpha);
                for &index in &a.members {
                    bodies[index].velocity += push;
                }
                for &index in &b.members {
                    bodies[index].velocity -= push;
                }
            }
        }
    }
}

/// Linear spring pulling every body toward a fixed point.
pub struct GravityForce {
    pub target: Vec2,
    pub strength: f32,
}

impl Force for GravityForce {
    fn apply(&self, bodies: &mut [Body], alpha: f32) {
        for body in bodies {
            body.velocity += (self.target - body.position) * self.strength * alpha;
        }
    }
}

/// Spring along links toward a preferred distance.
pub struct LinkForce {
    pub links: Vec<(usize, usize)>,
    pub distance: f32,
    pub strength: f32,
}

impl Force for LinkForce {
    fn apply(&self, bodies: &mut [Body], alpha: f32) {
        for &(source, target) in &self.links {
            if source >= bodies.len() || target >= bodies.len() || source == target {
                continue;
            }

            let delta = bodies[source].position - bodies[target].position;
            let distance = delta.length();
            if distance < MIN_DISTANCE {
                continue;
            }

            let correction =
                (delta / distance) * ((distance - self.distance) * self.strength * alpha * 0.5);
            bodies[source].velocity -= correction;
            bodies[target].velocity += correction;
        }
    }
}

/// Pairwise many-body repulsion with a softening floor. Quadratic in the node
/// count, which the interactive-scale graphs this engine serves stay inside.
pub struct ChargeForce {
    pub strength: f32,
}

impl Force for ChargeForce {
    fn apply(&self, bodies: &mut [Body], alpha: f32) {
        let softening = 4.0;
        for first in 0..bodies.len() {
            for second in (first + 1)..bodies.len() {
                let delta = bodies[first].position - bodies[second].position;
                let distance_sq = delta.length_squared();
                let distance = distance_sq.sqrt();
                let direction = if distance < MIN_DISTANCE {
                    let angle = ((first as f32) * 0.618_034 + (second as f32) * 0.414_214) * TAU;
                    vec2(angle.cos(), angle.sin())
                } else {
                    delta / distance
                };

                let push = direction * (self.strength * alpha / (distance_sq + softening));
                bodies[first].velocity += push;
                bodies[second].velocity -= push;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(x: f32, y: f32) -> Body {
        Body {
            id: String::new(),
            position: vec2(x, y),
            velocity: Vec2::ZERO,
        }
    }

    #[test]
    fn test_border_zero_on_boundary() {
        let force = BorderForce {
            width: 200.0,
            height: 200.0,
            center: Vec2::ZERO,
            node_radius: 0.0,
            strength: 1.0,
        };

        let mut bodies = vec![body(100.0, 0.0)];
        force.apply(&mut bodies, 1.0);
        assert_eq!(bodies[0].velocity, Vec2::ZERO);
    }

    #[test]
    fn test_border_push_scales_with_alpha() {
        let force = BorderForce {
            width: 200.0,
            height: 200.0,
            center: Vec2::ZERO,
            node_radius: 0.0,
            strength: 1.0,
        };

        let mut bodies = vec![body(101.0, 0.0)];
        force.apply(&mut bodies, 1.0);
        assert!((bodies[0].velocity.x - (-1.0)).abs() < 1e-6);

        let mut bodies = vec![body(101.0, 0.0)];
        force.apply(&mut bodies, 0.5);
        assert!((bodies[0].velocity.x - (-0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_border_respects_node_radius() {
        let force = BorderForce {
            width: 200.0,
            height: 200.0,
            center: Vec2::ZERO,
            node_radius: 10.0,
            strength: 1.0,
        };

        let mut bodies = vec![body(95.0, 0.0)];
        force.apply(&mut bodies, 1.0);
        assert!(bodies[0].velocity.x < 0.0);
    }

    #[test]
    fn test_group_repulsion_skips_own_and_small_groups() {
        let force = GroupRepulsionForce::new(
            vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1), Some(2)],
            3,
            1.0,
        );
        let mut bodies = vec![
            body(-10.0, 0.0),
            body(-12.0, 1.0),
            body(-11.0, -1.0),
            body(10.0, 0.0),
            body(12.0, 1.0),
            body(11.0, -1.0),
            body(0.0, 30.0),
        ];
        force.apply(&mut bodies, 1.0);

        // Left cluster pushed further left, away from the right centroid.
        assert!(bodies[0].velocity.x < 0.0);
        assert!(bodies[3].velocity.x > 0.0);
        // The singleton group is below threshold and owns no centroid, but is
        // still repelled by the qualifying clusters.
        assert!(bodies[6].velocity.y > 0.0);
    }

    #[test]
    fn test_group_repulsion_guards_zero_distance() {
        let force = GroupRepulsionForce::new(vec![Some(0), Some(0), Some(1), Some(1)], 2, 1.0);
        let mut bodies = vec![body(0.0, 0.0), body(0.0, 0.0), body(0.0, 0.0), body(0.0, 0.0)];
        force.apply(&mut bodies, 1.0);
        for body in &bodies {
            assert!(body.velocity.is_finite());
        }
    }

    #[test]
    fn test_circular_orders_by_descending_degree() {
        let force = CircularForce {
            component_of: vec![Some(0), Some(0), Some(0)],
            adjacency: vec![1, 4, 2],
            min_circle_size: 3,
            strength: 1.0,
        };
        let mut bodies = vec![body(0.0, 0.0), body(1.0, 0.0), body(0.0, 1.0)];
        force.apply(&mut bodies, 1.0);

        // Highest degree member (index 1) is pulled toward angle zero on a
        // radius of 50 * sqrt(3) around the centroid.
        let centroid = vec2(1.0 / 3.0, 1.0 / 3.0);
        let radius = 50.0 * 3.0_f32.sqrt();
        let target = centroid + vec2(radius, 0.0);
        let expected = target - vec2(1.0, 0.0);
        assert!((bodies[1].velocity - expected).length() < 1e-3);
    }

    #[test]
    fn test_circular_ignores_small_components() {
        let force = CircularForce {
            component_of: vec![Some(0), Some(0)],
            adjacency: vec![1, 1],
            min_circle_size: 3,
            strength: 1.0,
        };
        let mut bodies = vec![body(0.0, 0.0), body(5.0, 0.0)];
        force.apply(&mut bodies, 1.0);
        assert_eq!(bodies[0].velocity, Vec2::ZERO);
        assert_eq!(bodies[1].velocity, Vec2::ZERO);
    }

    #[test]
    fn test_circular_pushes_overlapping_clusters_apart() {
        let force = CircularForce {
            component_of: vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1)],
            adjacency: vec![2, 2, 2, 2, 2, 2],
            min_circle_size: 3,
            strength: 1.0,
        };
        // Two clusters whose 50 * sqrt(3) radii overlap heavily.
        let mut bodies = vec![
            body(-20.0, 0.0),
            body(-25.0, 5.0),
            body(-15.0, -5.0),
            body(20.0, 0.0),
            body(25.0, 5.0),
            body(15.0, -5.0),
        ];
        force.apply(&mut bodies, 1.0);

        let left: f32 = (0..3).map(|index| bodies[index].velocity.x).sum();
        let right: f32 = (3..6).map(|index| bodies[index].velocity.x).sum();
        assert!(left < right);
    }

    #[test]
    fn test_gravity_pulls_toward_target() {
        let force = GravityForce {
            target: Vec2::ZERO,
            strength: 0.1,
        };
        let mut bodies = vec![body(10.0, -20.0)];
        force.apply(&mut bodies, 1.0);
        assert!(bodies[0].velocity.x < 0.0);
        assert!(bodies[0].velocity.y > 0.0);
    }

    #[test]
    fn test_link_force_contracts_long_links() {
        let force = LinkForce {
            links: vec![(0, 1)],
            distance: 10.0,
            strength: 1.0,
        };
        let mut bodies = vec![body(0.0, 0.0), body(100.0, 0.0)];
        force.apply(&mut bodies, 1.0);
        assert!(bodies[0].velocity.x > 0.0);
        assert!(bodies[1].velocity.x < 0.0);
    }

    #[test]
    fn test_charge_separates_coincident_bodies() {
        let force = ChargeForce { strength: 10.0 };
        let mut bodies = vec![body(0.0, 0.0), body(0.0, 0.0)];
        force.apply(&mut bodies, 1.0);
        assert!(bodies[0].velocity.is_finite());
        assert!(bodies[0].velocity.length() > 0.0);
        assert!((bodies[0].velocity + bodies[1].velocity).length() < 1e-5);
    }
}
