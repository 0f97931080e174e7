//! Combat resolution.
//!
//! Each strategy is a pure function of the world: it decides who dies and
//! who gets credit, and the state machine applies the result. Every
//! strategy only looks at ants with an enemy within `attackradius2`, found
//! through [`World::nearby_ants`]. Live ants are visited row-major.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::game::PlayerId;
use crate::game::entities::AntId;
use crate::game::fraction::Fraction;
use crate::game::world::World;

/// Which combat rule the game uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackStrategy {
    /// Die if as weak as or weaker than the strongest nearby enemy.
    #[default]
    Power,
    /// Mutually closest enemies eliminate each other, nearest first.
    Closest,
    /// Die if outnumbered by nearby enemies.
    Support,
    /// Split one unit of damage over nearby enemies; die at one damage.
    Damage,
}

impl AttackStrategy {
    /// All strategies.
    pub const ALL: [AttackStrategy; 4] = [Self::Power, Self::Closest, Self::Support, Self::Damage];

    /// Lowercase name used in options and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Closest => "closest",
            Self::Support => "support",
            Self::Damage => "damage",
        }
    }
}

impl fmt::Display for AttackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttackStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| format!("unknown attack strategy: {s}"))
    }
}

/// Points credited to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    /// Receiving player.
    pub player: PlayerId,
    /// Amount.
    pub points: Fraction,
}

/// Result of one combat phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatOutcome {
    /// Ants to kill, in the order they were decided.
    pub killed: Vec<AntId>,
    /// Points for the killers.
    pub awards: Vec<Award>,
}

impl CombatOutcome {
    fn share_among(&mut self, world: &World, recipients: &[AntId]) {
        if recipients.is_empty() {
            return;
        }
        let points = Fraction::share(recipients.len());
        self.awards.extend(recipients.iter().map(|&id| Award {
            player: world.ant(id).owner,
            points,
        }));
    }
}

/// Decide the outcome of combat with the given strategy.
#[must_use]
pub fn resolve_combat(strategy: AttackStrategy, world: &World, attackradius2: u32) -> CombatOutcome {
    match strategy {
        AttackStrategy::Power => resolve_power(world, attackradius2),
        AttackStrategy::Closest => resolve_closest(world, attackradius2),
        AttackStrategy::Support => resolve_support(world, attackradius2),
        AttackStrategy::Damage => resolve_damage(world, attackradius2),
    }
}

/// Nearby enemies of every live ant, row-major.
fn nearby_enemies(world: &World, attackradius2: u32) -> Vec<(AntId, Vec<AntId>)> {
    world
        .live_ants()
        .map(|ant| (ant.id, world.nearby_ants(ant.loc, attackradius2, Some(ant.owner))))
        .collect()
}

/// Each ant deals `1/|enemies|` to every nearby enemy; one damage kills.
#[must_use]
pub fn resolve_damage(world: &World, attackradius2: u32) -> CombatOutcome {
    let enemies = nearby_enemies(world, attackradius2);
    let mut damage: HashMap<AntId, Fraction> = HashMap::new();
    for (_, targets) in &enemies {
        if targets.is_empty() {
            continue;
        }
        let dealt = Fraction::share(targets.len());
        for &target in targets {
            *damage.entry(target).or_default() += dealt;
        }
    }

    let mut outcome = CombatOutcome::default();
    for (ant, attackers) in &enemies {
        if damage.get(ant).is_some_and(|&taken| taken >= Fraction::ONE) {
            outcome.killed.push(*ant);
            outcome.share_among(world, attackers);
        }
    }
    outcome
}

/// An ant dies when nearby enemies outnumber nearby friends (self excluded).
#[must_use]
pub fn resolve_support(world: &World, attackradius2: u32) -> CombatOutcome {
    let mut outcome = CombatOutcome::default();
    for ant in world.live_ants() {
        let (friends, enemies): (Vec<AntId>, Vec<AntId>) = world
            .nearby_ants(ant.loc, attackradius2, None)
            .into_iter()
            .partition(|&other| world.ant(other).owner == ant.owner);
        if friends.len() < enemies.len() {
            outcome.killed.push(ant.id);
            outcome.share_among(world, &enemies);
        }
    }
    outcome
}

/// Weakness is the number of nearby enemies; an ant dies if some nearby
/// enemy is at least as strong (weakness no greater than its own).
#[must_use]
pub fn resolve_power(world: &World, attackradius2: u32) -> CombatOutcome {
    let enemies = nearby_enemies(world, attackradius2);
    let weakness: HashMap<AntId, usize> = enemies
        .iter()
        .map(|(ant, targets)| (*ant, targets.len()))
        .collect();

    let mut outcome = CombatOutcome::default();
    for (ant, targets) in &enemies {
        let own = targets.len();
        if own == 0 {
            continue;
        }
        let strongest = targets
            .iter()
            .map(|enemy| weakness.get(enemy).copied().unwrap_or(0))
            .min()
            .unwrap_or(usize::MAX);
        if strongest <= own {
            outcome.killed.push(*ant);
            outcome.share_among(world, targets);
        }
    }
    outcome
}

/// For each squared distance `1..attackradius2`, groups of ants linked by
/// "surviving enemy at exactly this distance" with more than one member are
/// eliminated together; every member's owner gets `1/|group|`.
#[must_use]
pub fn resolve_closest(world: &World, attackradius2: u32) -> CombatOutcome {
    let torus = world.torus();
    let order: Vec<AntId> = world.live_ants().map(|ant| ant.id).collect();
    let by_distance: HashMap<AntId, BTreeMap<u32, Vec<AntId>>> = nearby_enemies(world, attackradius2)
        .into_iter()
        .map(|(ant, targets)| {
            let loc = world.ant(ant).loc;
            let mut rings: BTreeMap<u32, Vec<AntId>> = BTreeMap::new();
            for target in targets {
                rings
                    .entry(torus.distance(loc, world.ant(target).loc))
                    .or_default()
                    .push(target);
            }
            (ant, rings)
        })
        .collect();

    let mut dead: HashSet<AntId> = HashSet::new();
    let mut outcome = CombatOutcome::default();
    for distance in 1..attackradius2 {
        for &start in &order {
            let has_enemies = by_distance.get(&start).is_some_and(|rings| !rings.is_empty());
            if !has_enemies || dead.contains(&start) {
                continue;
            }

            let mut group = vec![start];
            let mut in_group: HashSet<AntId> = HashSet::from([start]);
            let mut stack = vec![start];
            while let Some(current) = stack.pop() {
                let ring = by_distance
                    .get(&current)
                    .and_then(|rings| rings.get(&distance))
                    .map_or(&[][..], Vec::as_slice);
                for &enemy in ring {
                    if !dead.contains(&enemy) && in_group.insert(enemy) {
                        group.push(enemy);
                        stack.push(enemy);
                    }
                }
            }

            if group.len() > 1 {
                outcome.share_among(world, &group);
                for &member in &group {
                    dead.insert(member);
                    outcome.killed.push(member);
                }
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::Grid;
    use crate::game::torus::{Loc, Torus};
    use crate::game::world::AntOrigin;

    fn world_with(ants: &[(usize, usize, PlayerId)]) -> World {
        let mut world = World::new(Grid::new(Torus::new(12, 12).unwrap()), &[5]);
        for &(row, col, owner) in ants {
            world.add_ant(AntOrigin::Loc(Loc::new(row, col)), owner).unwrap();
        }
        world
    }

    fn total(outcome: &CombatOutcome, player: PlayerId) -> Fraction {
        outcome
            .awards
            .iter()
            .filter(|a| a.player == player)
            .fold(Fraction::ZERO, |acc, a| acc + a.points)
    }

    #[test]
    fn test_one_on_one_trade() {
        for strategy in [AttackStrategy::Power, AttackStrategy::Support, AttackStrategy::Damage] {
            let world = world_with(&[(5, 5, 0), (5, 6, 1)]);
            let outcome = resolve_combat(strategy, &world, 5);
            assert_eq!(outcome.killed.len(), 2, "{strategy}");
            assert_eq!(total(&outcome, 0), Fraction::ONE, "{strategy}");
            assert_eq!(total(&outcome, 1), Fraction::ONE, "{strategy}");
        }

        // Closest shares one point over the whole eliminated group.
        let world = world_with(&[(5, 5, 0), (5, 6, 1)]);
        let outcome = resolve_combat(AttackStrategy::Closest, &world, 5);
        assert_eq!(outcome.killed.len(), 2);
        assert_eq!(total(&outcome, 0), Fraction::share(2));
    }

    #[test]
    fn test_out_of_range_no_combat() {
        for strategy in AttackStrategy::ALL {
            let world = world_with(&[(0, 0, 0), (6, 6, 1)]);
            assert_eq!(resolve_combat(strategy, &world, 5), CombatOutcome::default());
        }
    }

    #[test]
    fn test_damage_two_on_one() {
        // Lone ant splits its damage, each attacker takes 1/2.
        let world = world_with(&[(5, 5, 1), (5, 4, 0), (5, 6, 0)]);
        let outcome = resolve_damage(&world, 1);
        assert_eq!(outcome.killed, vec![world.ant_at(Loc::new(5, 5)).unwrap().id]);
        assert_eq!(total(&outcome, 0), Fraction::ONE);
        assert_eq!(outcome.awards.len(), 2);
    }

    #[test]
    fn test_support_counts_friends() {
        // Two friends side by side against one enemy touching both.
        let world = world_with(&[(5, 5, 0), (5, 6, 0), (6, 5, 1)]);
        let outcome = resolve_support(&world, 2);
        let enemy = world.ant_at(Loc::new(6, 5)).unwrap().id;
        assert_eq!(outcome.killed, vec![enemy]);
        assert_eq!(total(&outcome, 0), Fraction::ONE);
    }

    #[test]
    fn test_power_outnumbered_dies() {
        let world = world_with(&[(5, 5, 1), (5, 4, 0), (5, 6, 0)]);
        let outcome = resolve_power(&world, 1);
        // The lone ant has weakness 2, each attacker weakness 1.
        assert_eq!(outcome.killed, vec![world.ant_at(Loc::new(5, 5)).unwrap().id]);
        assert_eq!(total(&outcome, 0), Fraction::ONE);
    }

    #[test]
    fn test_closest_nearest_pair_first() {
        // (5,5)-(5,6) are at distance 1, (5,8) is at distance 4 from (5,6).
        let world = world_with(&[(5, 5, 0), (5, 6, 1), (5, 8, 0)]);
        let outcome = resolve_closest(&world, 5);
        assert_eq!(outcome.killed.len(), 2);
        assert!(world.ant_at(Loc::new(5, 8)).is_some());
        assert!(!outcome.killed.contains(&world.ant_at(Loc::new(5, 8)).unwrap().id));
        assert_eq!(total(&outcome, 0), Fraction::share(2));
        assert_eq!(total(&outcome, 1), Fraction::share(2));
    }

    #[test]
    fn test_closest_chain_dies_together() {
        // Every neighbour in the row is an enemy at distance 1.
        let world = world_with(&[(5, 4, 0), (5, 5, 1), (5, 6, 0), (5, 7, 1)]);
        let outcome = resolve_closest(&world, 5);
        assert_eq!(outcome.killed.len(), 4);
        assert_eq!(outcome.awards.len(), 4);
        assert!(outcome.awards.iter().all(|a| a.points == Fraction::share(4)));
        assert_eq!(total(&outcome, 0), Fraction::share(2));
        assert_eq!(total(&outcome, 1), Fraction::share(2));
    }

    #[test]
    fn test_closest_three_player_chain() {
        let world = world_with(&[(5, 4, 0), (5, 5, 1), (5, 6, 2)]);
        let outcome = resolve_closest(&world, 2);
        assert_eq!(outcome.killed.len(), 3);
        for player in 0..3 {
            assert_eq!(total(&outcome, player), Fraction::share(3));
        }
    }

    #[test]
    fn test_closest_pair_at_attack_radius_survives() {
        // Distance 4 is in range, but only distances below the radius fight.
        let world = world_with(&[(5, 5, 0), (5, 7, 1)]);
        let outcome = resolve_closest(&world, 4);
        assert_eq!(outcome, CombatOutcome::default());

        let outcome = resolve_closest(&world, 5);
        assert_eq!(outcome.killed.len(), 2);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("support".parse(), Ok(AttackStrategy::Support));
        assert!("nuke".parse::<AttackStrategy>().is_err());
    }
}
