mod forces;

use std::collections::HashMap;

use glam::{Vec2, vec2};

use crate::data::Graph;
use crate::util::stable_pair;

use super::{adjacency_of, communities_of, components_of};
pub use forces::{
    BorderForce, ChargeForce, CircularForce, CommunityForce, GravityForce, GroupRepulsionForce,
    LinkForce,
};

const DEFAULT_ALPHA_MIN: f32 = 0.001;
const DEFAULT_ALPHA_DECAY: f32 = 0.0228;
const DEFAULT_VELOCITY_DAMPING: f32 = 0.6;

#[derive(Clone, Debug)]
pub struct Body {
    pub id: String,
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimState {
    Idle,
    Running,
    Stopped,
}

/// A velocity-mutating force. Forces run once per tick in registration order;
/// the runtime integrates positions afterwards.
pub trait Force {
    fn apply(&self, bodies: &mut [Body], alpha: f32);
}

pub struct Simulation {
    bodies: Vec<Body>,
    forces: Vec<Box<dyn Force>>,
    state: SimState,
    alpha: f32,
    alpha_min: f32,
    alpha_decay: f32,
    velocity_damping: f32,
}

impl Simulation {
    /// Seed one body per node. Initial positions are spread deterministically
    /// from the node id hash so repeated runs produce the same layout.
    pub fn new(graph: &Graph) -> Self {
        let count = graph.nodes.len();
        let spread = (count.max(1) as f32).sqrt() * 30.0;
        let bodies = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let (jx, jy) = stable_pair(&node.id);
                let mut direction = vec2(jx, jy);
                if direction.length_squared() <= 0.0001 {
                    let angle = ((index as f32) * 0.618_034 + 0.11) * std::f32::consts::TAU;
                    direction = vec2(angle.cos(), angle.sin());
                }
                Body {
                    id: node.id.clone(),
                    position: direction * spread,
                    velocity: Vec2::ZERO,
                }
            })
            .collect();

        Self {
            bodies,
            forces: Vec::new(),
            state: SimState::Idle,
            alpha: 1.0,
            alpha_min: DEFAULT_ALPHA_MIN,
            alpha_decay: DEFAULT_ALPHA_DECAY,
            velocity_damping: DEFAULT_VELOCITY_DAMPING,
        }
    }

    pub fn add_force(&mut self, force: Box<dyn Force>) {
        self.forces.push(force);
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    /// Idle -> Running. A stopped simulation stays stopped.
    pub fn start(&mut self) {
        if self.state == SimState::Idle {
            self.state = SimState::Running;
        }
    }

    /// Terminal: no further ticks advance once stopped.
    pub fn stop(&mut self) {
        self.state = SimState::Stopped;
    }

    /// One simulation step: cool alpha, apply every force in registration
    /// order, then integrate velocities into positions. Returns false without
    /// touching anything unless the simulation is running. A body whose
    /// velocity turns non-finite is skipped for the tick instead of smearing
    /// NaN across the layout.
    pub fn tick(&mut self) -> bool {
        if self.state != SimState::Running {
            return false;
        }

        self.alpha += (0.0 - self.alpha) * self.alpha_decay;

        for force in &self.forces {
            force.apply(&mut self.bodies, self.alpha);
        }

        for body in &mut self.bodies {
            if !body.velocity.is_finite() {
                body.velocity = Vec2::ZERO;
                continue;
            }
            body.velocity *= self.velocity_damping;
            body.position += body.velocity;
        }

        if self.alpha < self.alpha_min {
            self.state = SimState::Idle;
        }

        true
    }

    /// Drive the simulation for at most `max_ticks`, stopping early once the
    /// cooling schedule settles back to idle.
    pub fn run(&mut self, max_ticks: usize) -> usize {
        self.start();
        let mut ticks = 0;
        while ticks < max_ticks && self.state == SimState::Running {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    pub fn positions(&self) -> impl Iterator<Item = (&str, Vec2)> {
        self.bodies
            .iter()
            .map(|body| (body.id.as_str(), body.position))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutMode {
    /// Standard link-distance layout.
    Links,
    /// Per-component circular packing; replaces the link force.
    Circular,
    /// Louvain community separation; replaces the link force.
    Community,
}

#[derive(Clone, Debug)]
pub struct LayoutParams {
    pub mode: LayoutMode,
    pub width: f32,
    pub height: f32,
    pub node_radius: f32,
    pub border_strength: f32,
    pub gravity_strength: f32,
    pub charge_strength: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub group_repulsion: bool,
    pub group_strength: f32,
    pub min_group_size: usize,
    pub min_circle_size: usize,
    pub circle_strength: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            mode: LayoutMode::Links,
            width: 1280.0,
            height: 920.0,
            node_radius: 8.0,
            border_strength: 0.1,
            gravity_strength: 0.02,
            charge_strength: 28.0,
            link_distance: 60.0,
            link_strength: 0.08,
            group_repulsion: false,
            group_strength: 0.6,
            min_group_size: 3,
            min_circle_size: 3,
            circle_strength: 0.12,
        }
    }
}

/// Assemble a simulation for the active subgraph. The circular and community
/// modes take the link force's place; mixing them with the link force is the
/// caller's coordination contract, not enforced here.
pub fn build_simulation(graph: &Graph, params: &LayoutParams) -> Simulation {
    let mut simulation = Simulation::new(graph);
    let index_by_id = graph.index_by_id();
    let center = Vec2::ZERO;

    simulation.add_force(Box::new(BorderForce {
        width: params.width,
        height: params.height,
        center,
        node_radius: params.node_radius,
        strength: params.border_strength,
    }));

    simulation.add_force(Box::new(ChargeForce {
        strength: params.charge_strength,
    }));

    match params.mode {
        LayoutMode::Links => {
            let links = graph
                .links
                .iter()
                .filter_map(|link| {
                    let source = *index_by_id.get(link.source.as_str())?;
                    let target = *index_by_id.get(link.target.as_str())?;
                    (source != target).then_some((source, target))
                })
                .collect();
            simulation.add_force(Box::new(LinkForce {
                links,
                distance: params.link_distance,
                strength: params.link_strength,
            }));
        }
        LayoutMode::Circular => {
            let (components, _sizes) = components_of(graph);
            let adjacency = adjacency_of(graph);
            simulation.add_force(Box::new(CircularForce {
                component_of: assignment_vec(graph, &index_by_id, &components),
                adjacency: graph
                    .nodes
                    .iter()
                    .map(|node| adjacency.get(&node.id).copied().unwrap_or(0))
                    .collect(),
                min_circle_size: params.min_circle_size,
                strength: params.circle_strength,
            }));
        }
        LayoutMode::Community => {
            let communities = communities_of(graph);
            simulation.add_force(Box::new(CommunityForce::new(
                assignment_vec(graph, &index_by_id, &communities),
                params.min_group_size,
                params.group_strength,
            )));
        }
    }

    if params.group_repulsion {
        let mut group_ids: HashMap<&str, usize> = HashMap::new();
        let assignment = graph
            .nodes
            .iter()
            .map(|node| {
                // A node's first group decides its cluster for repulsion.
                node.groups.first().map(|group| {
                    let next = group_ids.len();
                    *group_ids.entry(group.as_str()).or_insert(next)
                })
            })
            .collect();
        simulation.add_force(Box::new(GroupRepulsionForce::new(
            assignment,
            params.min_group_size,
            params.group_strength,
        )));
    }

    simulation.add_force(Box::new(GravityForce {
        target: center,
        strength: params.gravity_strength,
    }));

    simulation
}

fn assignment_vec(
    graph: &Graph,
    index_by_id: &HashMap<&str, usize>,
    assignment: &HashMap<String, usize>,
) -> Vec<Option<usize>> {
    let mut result = vec![None; graph.nodes.len()];
    for (id, &value) in assignment {
        if let Some(&index) = index_by_id.get(id.as_str()) {
            result[index] = Some(value);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Link, Node};

    fn graph(ids: &[&str], links: &[(&str, &str)]) -> Graph {
        Graph {
            nodes: ids
                .iter()
                .map(|id| Node {
                    id: (*id).to_owned(),
                    groups: Vec::new(),
                })
                .collect(),
            links: links
                .iter()
                .map(|(source, target)| Link {
                    source: (*source).to_owned(),
                    target: (*target).to_owned(),
                    weights: vec![1.0],
                    attribs: vec!["a".to_owned()],
                })
                .collect(),
        }
    }

    #[test]
    fn test_state_machine() {
        let mut simulation = Simulation::new(&graph(&["A"], &[]));
        assert_eq!(simulation.state(), SimState::Idle);
        assert!(!simulation.tick());

        simulation.start();
        assert_eq!(simulation.state(), SimState::Running);
        assert!(simulation.tick());

        simulation.stop();
        assert_eq!(simulation.state(), SimState::Stopped);
        assert!(!simulation.tick());
        simulation.start();
        assert_eq!(simulation.state(), SimState::Stopped);
    }

    #[test]
    fn test_cooling_returns_to_idle() {
        let mut simulation = Simulation::new(&graph(&["A", "B"], &[("A", "B")]));
        let ticks = simulation.run(10_000);
        assert!(ticks < 10_000);
        assert_eq!(simulation.state(), SimState::Idle);
        assert!(simulation.alpha() < DEFAULT_ALPHA_MIN);
    }

    #[test]
    fn test_seed_positions_deterministic() {
        let graph = graph(&["A", "B", "C"], &[]);
        let first = Simulation::new(&graph);
        let second = Simulation::new(&graph);
        for (a, b) in first.bodies().iter().zip(second.bodies()) {
            assert_eq!(a.position, b.position);
        }
    }

    #[test]
    fn test_nan_velocity_is_clamped() {
        let mut simulation = Simulation::new(&graph(&["A", "B"], &[]));
        simulation.start();
        simulation.bodies_mut()[0].velocity = Vec2::new(f32::NAN, 0.0);
        let before = simulation.bodies()[0].position;
        simulation.tick();
        let body = &simulation.bodies()[0];
        assert!(body.position.is_finite());
        assert_eq!(body.position, before);
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_build_simulation_runs_each_mode() {
        let graph = graph(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        for mode in [LayoutMode::Links, LayoutMode::Circular, LayoutMode::Community] {
            let params = LayoutParams {
                mode,
                ..LayoutParams::default()
            };
            let mut simulation = build_simulation(&graph, &params);
            simulation.run(50);
            for body in simulation.bodies() {
                assert!(body.position.is_finite());
            }
        }
    }
}
