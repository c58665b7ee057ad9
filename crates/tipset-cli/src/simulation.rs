//! Deterministic in-process network simulation
//!
//! Every simulated node runs a [`TipsetEventCreator`] over a shared manual
//! clock. At each step a randomly chosen node attempts to create an event;
//! created events get their nGen assigned and are delivered to every node.
//! The event window moves forward one round every `steps_per_round` steps.

use crate::ordering::OrderingLayer;
use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tipset_core::{AncientMode, Generation, ManualClock, NodeId, PlatformEvent, Roster, RosterEntry};
use tipset_creator::{CreationStats, EventCreationConfig, EventCreator, NoTransactions, TipsetEventCreator};
use tipset_crypto::Ed25519HashSigner;
use tracing::info;

/// Simulation parameters
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Nodes with weight 1
    pub nodes: usize,
    /// Additional nodes with weight 0
    pub zero_weight_nodes: usize,
    /// Creation attempts
    pub steps: usize,
    /// Attempts between event window advances, 0 keeps the genesis window
    pub steps_per_round: usize,
    pub seed: u64,
    pub ancient_mode: AncientMode,
    pub event_creation: EventCreationConfig,
}

/// Outcome for one node
#[derive(Clone, Debug, Serialize)]
pub struct NodeReport {
    pub node_id: NodeId,
    pub weight: u64,
    pub stats: CreationStats,
}

/// Outcome of a whole run
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub steps: usize,
    pub events_created: u64,
    pub latest_consensus_round: u64,
    pub max_generation: Generation,
    pub nodes: Vec<NodeReport>,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} events in {} steps, latest consensus round {}, max generation {}",
            self.events_created, self.steps, self.latest_consensus_round, self.max_generation
        )?;
        writeln!(
            f,
            "{:>6} {:>6} {:>8} {:>8} {:>6} {:>10} {:>8} {:>8} {:>11}",
            "node", "weight", "created", "genesis", "pity", "no parent", "ancient", "selfish", "last ratio"
        )?;
        for node in &self.nodes {
            writeln!(
                f,
                "{:>6} {:>6} {:>8} {:>8} {:>6} {:>10} {:>8} {:>8} {:>11.3}",
                node.node_id.id(),
                node.weight,
                node.stats.events_created,
                node.stats.genesis_events,
                node.stats.pity_parents_used,
                node.stats.refused_no_parent,
                node.stats.refused_ancient,
                node.stats.max_selfishness,
                node.stats.last_advancement_ratio
            )?;
        }
        Ok(())
    }
}

struct Simulation {
    roster: Arc<Roster>,
    creators: Vec<TipsetEventCreator>,
    clock: Arc<ManualClock>,
    ordering: OrderingLayer,
}

impl Simulation {
    fn new(config: &SimulationConfig) -> anyhow::Result<Self> {
        let entries = (0..config.nodes + config.zero_weight_nodes)
            .map(|id| RosterEntry::new(NodeId::new(id as u64), u64::from(id < config.nodes)))
            .collect();
        let roster = Arc::new(Roster::new(entries).context("Invalid roster")?);
        let clock = Arc::new(ManualClock::default());
        let master_seed = master_seed(config.seed);

        let creators = roster
            .node_ids()
            .map(|node_id| {
                let event_creation = EventCreationConfig {
                    rng_seed: config.seed.wrapping_add(node_id.id()),
                    ..config.event_creation.clone()
                };
                TipsetEventCreator::new(
                    &event_creation,
                    node_id,
                    roster.clone(),
                    config.ancient_mode,
                    clock.clone(),
                    Arc::new(Ed25519HashSigner::for_node(&master_seed, node_id)),
                    Arc::new(NoTransactions),
                )
                .with_context(|| format!("Failed to create event creator for {}", node_id))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            ordering: OrderingLayer::new(config.ancient_mode, roster.len() as u64),
            roster,
            creators,
            clock,
        })
    }

    fn attempt(&mut self, index: usize) -> anyhow::Result<Option<PlatformEvent>> {
        self.clock.advance_millis(1);
        let Some(event) = self.creators[index].maybe_create_event()? else {
            return Ok(None);
        };

        let event = self.ordering.order(event);
        for creator in self.creators.iter_mut() {
            creator.register_event(&event);
        }
        Ok(Some(event))
    }

    /// Move consensus forward by one round
    fn advance_round(&mut self) -> anyhow::Result<()> {
        let event_window = self.ordering.advance_round()?;
        for creator in self.creators.iter_mut() {
            creator.set_event_window(event_window);
        }
        Ok(())
    }
}

/// Expand the numeric seed into signing key material
fn master_seed(seed: u64) -> [u8; 32] {
    let mut master = [0u8; 32];
    ChaCha8Rng::seed_from_u64(seed).fill(&mut master);
    master
}

/// Run a simulation to completion
pub fn run_simulation(config: &SimulationConfig) -> anyhow::Result<SimulationReport> {
    anyhow::ensure!(config.nodes > 0, "At least one node must have weight");

    let mut simulation = Simulation::new(config)?;
    let mut schedule = ChaCha8Rng::seed_from_u64(config.seed);
    let size = simulation.creators.len();
    let mut events_created = 0u64;

    info!(
        "Simulating {} nodes ({} with zero weight) for {} steps",
        size, config.zero_weight_nodes, config.steps
    );

    for step in 1..=config.steps {
        let index = schedule.gen_range(0..size);
        if simulation.attempt(index)?.is_some() {
            events_created += 1;
        }
        if config.steps_per_round > 0 && step % config.steps_per_round == 0 {
            simulation.advance_round()?;
        }
    }

    let nodes = simulation
        .creators
        .iter()
        .map(|creator| NodeReport {
            node_id: creator.self_id(),
            weight: simulation.roster.weight_of(&creator.self_id()),
            stats: creator.stats(),
        })
        .collect();

    Ok(SimulationReport {
        steps: config.steps,
        events_created,
        latest_consensus_round: simulation.ordering.event_window().latest_consensus_round(),
        max_generation: simulation.ordering.max_generation(),
        nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(nodes: usize, zero_weight_nodes: usize) -> SimulationConfig {
        SimulationConfig {
            nodes,
            zero_weight_nodes,
            steps: 500,
            steps_per_round: 20,
            seed: 11,
            ancient_mode: AncientMode::BirthRoundThreshold,
            event_creation: EventCreationConfig::default(),
        }
    }

    #[test]
    fn test_simulation_creates_events() {
        let report = run_simulation(&make_config(4, 0)).unwrap();
        assert_eq!(report.nodes.len(), 4);
        assert_eq!(report.latest_consensus_round, 25);
        assert!(report.events_created > 100);

        let total: u64 = report.nodes.iter().map(|n| n.stats.events_created).sum();
        assert_eq!(total, report.events_created);
    }

    #[test]
    fn test_simulation_is_deterministic() {
        let config = make_config(5, 2);
        let first = run_simulation(&config).unwrap();
        let second = run_simulation(&config).unwrap();
        assert_eq!(first.events_created, second.events_created);
        for (a, b) in first.nodes.iter().zip(&second.nodes) {
            assert_eq!(a.stats, b.stats);
        }
    }

    #[test]
    fn test_zero_weight_nodes_reported() {
        let report = run_simulation(&make_config(3, 2)).unwrap();
        assert_eq!(report.nodes[3].weight, 0);
        assert_eq!(report.nodes[4].weight, 0);
        assert!(report.to_string().contains("no parent"));
    }

    #[test]
    fn test_ancient_events_forgotten() {
        for ancient_mode in [AncientMode::BirthRoundThreshold, AncientMode::GenerationThreshold] {
            let config = SimulationConfig {
                ancient_mode,
                ..make_config(4, 0)
            };
            let mut simulation = Simulation::new(&config).unwrap();
            let mut schedule = ChaCha8Rng::seed_from_u64(config.seed);
            let mut created = 0usize;

            for _ in 0..100 {
                for _ in 0..config.steps_per_round {
                    if simulation.attempt(schedule.gen_range(0..4)).unwrap().is_some() {
                        created += 1;
                    }
                }
                simulation.advance_round().unwrap();
            }

            let window = *simulation.ordering.event_window();
            assert!(window.ancient_threshold() > ancient_mode.first_indicator());
            assert!(simulation.ordering.len() < created);
            for creator in &simulation.creators {
                assert_eq!(creator.event_window(), &window);
            }
        }
    }

    #[test]
    fn test_requires_weighted_node() {
        assert!(run_simulation(&make_config(0, 3)).is_err());
    }
}
