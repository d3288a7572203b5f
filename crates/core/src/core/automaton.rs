use std::collections::{BTreeMap, HashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::{debug, info};

use crate::config::CellConfig;
use crate::grid::{CellId, Grid, Patch};
use crate::prng::Prng;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cell {
    pub id: CellId,
    pub patch: Patch,
    pub age: u32,
    pub divisions: u32,
    /// Ticks since the last successful division (or since birth).
    pub since_division: u32,
}

impl Cell {
    fn new(id: CellId, patch: Patch) -> Self {
        Self {
            id,
            patch,
            age: 0,
            divisions: 0,
            since_division: 0,
        }
    }

    fn tick(&mut self) {
        self.age = self.age.saturating_add(1);
        self.since_division = self.since_division.saturating_add(1);
    }
}

/// Lifetime counters of one run. All of them only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimStats {
    pub total_cells: u64,
    pub total_deaths: u64,
    pub death_by_age: u64,
    pub death_by_division_limit: u64,
    pub death_by_overcrowding: u64,
    pub divisions: u64,
}

impl SimStats {
    /// Named counters in display order.
    pub fn named(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("Total cells", self.total_cells),
            ("Total deaths", self.total_deaths),
            ("Death by age limit", self.death_by_age),
            ("Death by division limit", self.death_by_division_limit),
            ("Death by overcrowding", self.death_by_overcrowding),
            ("Divisions", self.divisions),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopReason {
    /// No live cells remain.
    Extinct,
    /// The configured time limit was reached.
    TimeLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunOutcome {
    pub ticks: u64,
    pub reason: StopReason,
}

/// Cellular automaton on a toroidal grid.
///
/// Each tick runs four phases over the cells alive when the tick started:
/// division, ageing, overcrowding correction, death. Cells born during the tick
/// skip ageing and overcrowding checks but are evaluated for death.
#[derive(Debug, Clone)]
pub struct CellSim {
    cfg: CellConfig,
    grid: Grid,
    // Keyed by creation-ordered id, so iteration order is deterministic.
    cells: BTreeMap<CellId, Cell>,
    next_id: u64,
    ticks: u64,
    stats: SimStats,
    rng: Prng,
}

impl CellSim {
    /// Create the grid and place the initial population.
    pub fn new(cfg: CellConfig) -> Self {
        let rng = Prng::from_seed(cfg.seed);
        Self::with_rng(cfg, rng)
    }

    pub fn with_rng(cfg: CellConfig, rng: Prng) -> Self {
        let mut sim = Self::empty(cfg, rng);
        sim.populate();
        sim
    }

    /// Grid with no cells; place them with [`spawn`](Self::spawn).
    pub fn empty(cfg: CellConfig, rng: Prng) -> Self {
        Self {
            grid: Grid::new(cfg.rows, cfg.cols),
            cfg,
            cells: BTreeMap::new(),
            next_id: 0,
            ticks: 0,
            stats: SimStats::default(),
            rng,
        }
    }

    fn populate(&mut self) {
        let k = self.cfg.initial_population.min(self.grid.patch_count());
        for index in self.rng.sample_indices(self.grid.patch_count(), k) {
            let patch = self.grid.patch_at(index);
            self.spawn(patch);
        }
    }

    /// Put a new cell on `patch`. `None` when the patch is taken or outside the grid.
    pub fn spawn(&mut self, patch: Patch) -> Option<CellId> {
        let id = CellId(self.next_id);
        if !self.grid.place(patch, id) {
            return None;
        }
        self.next_id += 1;
        self.cells.insert(id, Cell::new(id, patch));
        self.stats.total_cells += 1;
        Some(id)
    }

    pub fn config(&self) -> &CellConfig {
        &self.cfg
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(&id)
    }

    /// Live cells in creation order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn population(&self) -> usize {
        self.cells.len()
    }

    pub fn is_finished(&self) -> bool {
        self.cells.is_empty() || self.ticks >= self.cfg.time_limit
    }

    /// Advance one tick and return the new tick count.
    pub fn tick(&mut self) -> u64 {
        let snapshot: Vec<CellId> = self.cells.keys().copied().collect();

        for &id in &snapshot {
            self.attempt_division(id);
        }
        for id in &snapshot {
            if let Some(cell) = self.cells.get_mut(id) {
                cell.tick();
            }
        }
        let mut victims: HashSet<CellId> = HashSet::new();
        for &id in &snapshot {
            self.correct_overcrowding(id, &mut victims);
        }
        let live: Vec<CellId> = self.cells.keys().copied().collect();
        for id in live {
            self.evaluate_death(id, victims.contains(&id));
        }

        self.ticks += 1;
        debug!(
            tick = self.ticks,
            population = self.cells.len(),
            deaths = self.stats.total_deaths,
            "automaton tick"
        );
        self.ticks
    }

    /// Tick until extinct or the time limit is reached.
    pub fn run(&mut self) -> RunOutcome {
        while !self.is_finished() {
            self.tick();
        }
        let outcome = self.outcome();
        info!(ticks = outcome.ticks, reason = ?outcome.reason, "automaton run finished");
        outcome
    }

    /// Why the run stopped, or would stop now.
    pub fn outcome(&self) -> RunOutcome {
        let reason = if self.cells.is_empty() {
            StopReason::Extinct
        } else {
            StopReason::TimeLimit
        };
        RunOutcome {
            ticks: self.ticks,
            reason,
        }
    }

    fn attempt_division(&mut self, id: CellId) {
        let Some(cell) = self.cells.get(&id) else {
            return;
        };

        let free = self.grid.free_neighbours(cell.patch);
        if free.is_empty() {
            return;
        }
        if cell.divisions >= self.cfg.division_limit {
            return;
        }
        // Cooldown only applies once the cell has divided.
        if cell.divisions > 0 && cell.since_division <= self.cfg.division_cooldown {
            return;
        }
        if self.rng.next_f64_01() > self.cfg.division_probability {
            return;
        }

        let target = free[self.rng.gen_range_usize(0, free.len())];
        if self.spawn(target).is_none() {
            return;
        }
        if let Some(parent) = self.cells.get_mut(&id) {
            parent.divisions += 1;
            parent.since_division = 0;
        }
        self.stats.divisions += 1;
    }

    /// Mark one age-weighted victim if `id`'s neighbourhood has no free patch.
    ///
    /// Patches of cells already marked this tick count as free, so one overcrowded
    /// neighbourhood produces one victim.
    fn correct_overcrowding(&mut self, id: CellId, victims: &mut HashSet<CellId>) {
        let Some(cell) = self.cells.get(&id) else {
            return;
        };

        let mut candidates: Vec<CellId> = Vec::with_capacity(9);
        for patch in self.grid.neighbourhood(cell.patch) {
            match self.grid.occupant(patch) {
                Some(other) if !victims.contains(&other) => candidates.push(other),
                _ => return,
            }
        }

        let weights: Vec<u64> = candidates
            .iter()
            .map(|c| self.cells.get(c).map_or(0, |c| u64::from(c.age)))
            .collect();
        if let Some(i) = self.rng.choose_weighted(&weights) {
            victims.insert(candidates[i]);
        }
    }

    fn evaluate_death(&mut self, id: CellId, overcrowded: bool) {
        let Some(cell) = self.cells.get(&id) else {
            return;
        };

        let mut dies = false;
        if cell.age >= self.cfg.age_limit {
            self.stats.death_by_age += 1;
            dies = true;
        }
        if cell.divisions >= self.cfg.division_limit {
            self.stats.death_by_division_limit += 1;
            dies = true;
        }
        if overcrowded {
            self.stats.death_by_overcrowding += 1;
            dies = true;
        }

        if dies {
            if let Some(cell) = self.cells.remove(&id) {
                self.grid.vacate(cell.patch);
                self.stats.total_deaths += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CellConfig {
        CellConfig {
            rows: 9,
            cols: 9,
            initial_population: 1,
            age_limit: 100,
            division_limit: 5,
            division_probability: 1.0,
            division_cooldown: 0,
            time_limit: 50,
            seed: Some(1),
        }
    }

    fn lone_cell(cfg: CellConfig) -> CellSim {
        let mut sim = CellSim::empty(cfg, Prng::new(3));
        sim.spawn(Patch::new(4, 4));
        sim
    }

    #[test]
    fn populate_places_distinct_cells() {
        let sim = CellSim::new(CellConfig {
            initial_population: 40,
            ..cfg()
        });
        assert_eq!(sim.population(), 40);
        assert_eq!(sim.grid().occupied_count(), 40);
        assert_eq!(sim.stats().total_cells, 40);
    }

    #[test]
    fn population_is_capped_by_grid_size() {
        let sim = CellSim::new(CellConfig {
            rows: 5,
            cols: 5,
            initial_population: 100,
            ..cfg()
        });
        assert_eq!(sim.population(), 25);
    }

    #[test]
    fn certain_division_on_first_tick() {
        let mut sim = lone_cell(CellConfig {
            division_limit: 2,
            ..cfg()
        });
        sim.tick();
        assert_eq!(sim.population(), 2);
        assert_eq!(sim.stats().divisions, 1);
        assert_eq!(sim.stats().total_cells, 2);

        let parent = sim.cell(CellId(0)).unwrap();
        assert_eq!(parent.divisions, 1);
        assert_eq!(parent.age, 1);
        // Reset at division, then aged once in the same tick.
        assert_eq!(parent.since_division, 1);

        let child = sim.cell(CellId(1)).unwrap();
        assert_eq!(child.age, 0);
        assert!(sim.grid().neighbourhood(Patch::new(4, 4)).contains(&child.patch));
    }

    #[test]
    fn zero_probability_never_divides() {
        let mut sim = lone_cell(CellConfig {
            division_probability: 0.0,
            ..cfg()
        });
        for _ in 0..20 {
            sim.tick();
        }
        assert_eq!(sim.stats().divisions, 0);
        assert_eq!(sim.population(), 1);
    }

    #[test]
    fn cooldown_blocks_back_to_back_divisions() {
        let mut sim = lone_cell(CellConfig {
            division_cooldown: 2,
            division_limit: 10,
            ..cfg()
        });
        sim.tick();
        assert_eq!(sim.cell(CellId(0)).unwrap().divisions, 1);
        // since_division is 1 then 2: both within the cooldown.
        sim.tick();
        sim.tick();
        assert_eq!(sim.cell(CellId(0)).unwrap().divisions, 1);
        // since_division is 3 now.
        sim.tick();
        assert_eq!(sim.cell(CellId(0)).unwrap().divisions, 2);
    }

    #[test]
    fn division_limit_kills_the_parent() {
        let mut sim = lone_cell(CellConfig {
            division_limit: 1,
            ..cfg()
        });
        sim.tick();
        assert!(sim.cell(CellId(0)).is_none());
        assert!(sim.cell(CellId(1)).is_some());
        assert_eq!(sim.stats().death_by_division_limit, 1);
        assert_eq!(sim.stats().total_deaths, 1);
        assert!(sim.grid().is_free(Patch::new(4, 4)));
    }

    #[test]
    fn age_limit_kills() {
        let mut sim = lone_cell(CellConfig {
            age_limit: 3,
            division_probability: 0.0,
            ..cfg()
        });
        sim.tick();
        sim.tick();
        assert_eq!(sim.population(), 1);
        sim.tick();
        assert_eq!(sim.population(), 0);
        assert_eq!(sim.stats().death_by_age, 1);
        assert_eq!(sim.outcome().reason, StopReason::Extinct);
    }

    #[test]
    fn full_neighbourhood_loses_exactly_one_cell() {
        let mut sim = CellSim::empty(
            CellConfig {
                division_probability: 0.0,
                ..cfg()
            },
            Prng::new(12),
        );
        let centre = Patch::new(4, 4);
        for p in sim.grid().neighbourhood(centre) {
            sim.spawn(p);
        }
        // A bystander far away that must never be picked.
        let bystander = sim.spawn(Patch::new(0, 0)).unwrap();
        assert_eq!(sim.population(), 10);

        sim.tick();
        assert_eq!(sim.stats().death_by_overcrowding, 1);
        assert_eq!(sim.stats().total_deaths, 1);
        assert_eq!(sim.population(), 9);
        assert!(sim.cell(bystander).is_some());
    }

    #[test]
    fn wrapped_corner_neighbourhood_loses_exactly_one_cell() {
        let mut sim = CellSim::empty(
            CellConfig {
                division_probability: 0.0,
                ..cfg()
            },
            Prng::new(31),
        );
        let corner = Patch::new(0, 0);
        let neighbourhood = sim.grid().neighbourhood(corner);
        assert!(neighbourhood.contains(&Patch::new(8, 8)));
        for p in neighbourhood {
            assert!(sim.spawn(p).is_some());
        }
        let bystander = sim.spawn(Patch::new(4, 4)).unwrap();
        assert_eq!(sim.population(), 10);

        sim.tick();
        assert_eq!(sim.stats().death_by_overcrowding, 1);
        assert_eq!(sim.stats().total_deaths, 1);
        assert_eq!(sim.population(), 9);
        assert!(sim.cell(bystander).is_some());
    }

    #[test]
    fn spawn_outside_the_grid_is_refused() {
        let mut sim = CellSim::empty(cfg(), Prng::new(1));
        assert_eq!(sim.spawn(Patch::new(0, 10)), None);
        assert_eq!(sim.spawn(Patch::new(9, 0)), None);
        assert_eq!(sim.population(), 0);
        assert_eq!(sim.stats().total_cells, 0);
        assert_eq!(sim.grid().occupant(Patch::new(1, 1)), None);

        let id = sim.spawn(Patch::new(8, 8)).unwrap();
        assert_eq!(id, CellId(0));
    }

    #[test]
    fn overcrowding_prefers_older_cells() {
        let mut old_deaths = 0;
        for seed in 0..200 {
            let mut sim = CellSim::empty(
                CellConfig {
                    division_probability: 0.0,
                    ..cfg()
                },
                Prng::new(seed),
            );
            let centre = Patch::new(4, 4);
            let neighbourhood = sim.grid().neighbourhood(centre);
            for p in &neighbourhood {
                sim.spawn(*p);
            }
            // Age one cell well past the others.
            let old = sim.grid().occupant(neighbourhood[0]).unwrap();
            sim.cells.get_mut(&old).unwrap().age = 80;
            sim.tick();
            if sim.cell(old).is_none() {
                old_deaths += 1;
            }
        }
        // Weight 81 of 89 per tick; far above the uniform 1 in 9.
        assert!(old_deaths > 150, "old cell died {old_deaths} times");
    }

    #[test]
    fn counters_never_decrease() {
        let mut sim = CellSim::new(CellConfig {
            rows: 12,
            cols: 12,
            initial_population: 10,
            age_limit: 8,
            division_limit: 3,
            division_probability: 0.6,
            division_cooldown: 1,
            time_limit: 60,
            seed: Some(77),
        });
        let mut prev = *sim.stats();
        while !sim.is_finished() {
            sim.tick();
            let now = *sim.stats();
            for ((_, a), (_, b)) in prev.named().into_iter().zip(now.named()) {
                assert!(b >= a);
            }
            assert_eq!(
                now.total_cells - now.total_deaths,
                sim.population() as u64
            );
            assert_eq!(sim.grid().occupied_count(), sim.population());
            prev = now;
        }
    }

    #[test]
    fn run_stops_at_time_limit() {
        let mut sim = lone_cell(CellConfig {
            division_probability: 0.0,
            time_limit: 7,
            ..cfg()
        });
        let outcome = sim.run();
        assert_eq!(
            outcome,
            RunOutcome {
                ticks: 7,
                reason: StopReason::TimeLimit
            }
        );
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let run = || {
            let mut sim = CellSim::new(CellConfig {
                initial_population: 6,
                division_probability: 0.5,
                ..cfg()
            });
            sim.run();
            (*sim.stats(), sim.ticks())
        };
        assert_eq!(run(), run());
    }
}
