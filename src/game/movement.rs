//! Simultaneous movement and collision kills.

use std::collections::BTreeMap;

use crate::error::ConsistencyError;
use crate::game::combat::Award;
use crate::game::entities::AntId;
use crate::game::fraction::Fraction;
use crate::game::torus::{Direction, Loc};
use crate::game::world::{Collision, World};

/// What happened during the movement phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementOutcome {
    /// Cells where ants collided, row-major.
    pub collisions: Vec<Collision>,
    /// Points earned from collision kills.
    pub awards: Vec<Award>,
}

/// Move every ant, kill all ants sharing a cell, and score the kills.
///
/// Each collision cluster is worth one point. The point is split evenly
/// over a list built by concatenating, for every ant in the cluster, the
/// surviving ants and the collision casualties not owned by that ant's
/// owner within `attackradius2` of the cluster cell. An owner appearing
/// several times in the list is credited several times.
///
/// # Errors
///
/// Propagates [`ConsistencyError`] from the registry.
pub fn resolve_moves(
    world: &mut World,
    orders: &BTreeMap<Loc, Direction>,
    attackradius2: u32,
) -> Result<MovementOutcome, ConsistencyError> {
    let collisions = world.move_ants(orders);
    let torus = world.torus();
    let casualties: Vec<AntId> = collisions
        .iter()
        .flat_map(|collision| collision.ants.iter().copied())
        .collect();

    let mut awards = Vec::new();
    for collision in &collisions {
        let mut credited: Vec<AntId> = Vec::new();
        for &member in &collision.ants {
            let owner = world.ant(member).owner;
            credited.extend(world.nearby_ants(collision.loc, attackradius2, Some(owner)));
            credited.extend(casualties.iter().copied().filter(|&other| {
                let other = world.ant(other);
                other.owner != owner && torus.distance(collision.loc, other.loc) <= attackradius2
            }));
        }
        if credited.is_empty() {
            continue;
        }
        let share = Fraction::share(credited.len());
        awards.extend(credited.iter().map(|&id| Award {
            player: world.ant(id).owner,
            points: share,
        }));
    }

    for &id in &casualties {
        world.kill_ant(id, true)?;
    }
    tracing::debug!(
        turn = world.turn(),
        collisions = collisions.len(),
        casualties = casualties.len(),
        "movement resolved"
    );
    Ok(MovementOutcome { collisions, awards })
}
