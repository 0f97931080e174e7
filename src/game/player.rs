//! Player state management.

use std::collections::BTreeSet;

use crate::game::entities::FoodId;
use crate::game::fraction::Fraction;
use crate::game::torus::Loc;

/// Unique identifier for a player (`0..num_players`, first-seen map order).
pub type PlayerId = u8;

/// A player's private numbering of the other players.
///
/// Every player sees itself as 0. Others get 1, 2, 3... in the order this
/// player first observes one of their ants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Perspective {
    slots: Vec<Option<PlayerId>>,
    assigned: PlayerId,
}

impl Perspective {
    /// Fresh table for `me` in a game of `num_players`.
    #[must_use]
    pub fn new(me: PlayerId, num_players: usize) -> Self {
        let mut slots = vec![None; num_players];
        slots[usize::from(me)] = Some(0);
        Self { slots, assigned: 1 }
    }

    /// Local id for `global`, if already assigned.
    #[must_use]
    pub fn get(&self, global: PlayerId) -> Option<PlayerId> {
        self.slots.get(usize::from(global)).copied().flatten()
    }

    /// Local id for `global`, assigning the next free one on first sight.
    pub fn resolve(&mut self, global: PlayerId) -> PlayerId {
        if let Some(local) = self.get(global) {
            return local;
        }
        let local = self.assigned;
        self.slots[usize::from(global)] = Some(local);
        self.assigned += 1;
        local
    }

    /// Global id behind a local id.
    #[must_use]
    pub fn global(&self, local: PlayerId) -> Option<PlayerId> {
        self.slots
            .iter()
            .position(|&slot| slot == Some(local))
            .and_then(|idx| PlayerId::try_from(idx).ok())
    }

    /// Reorder per-player data into this player's numbering.
    ///
    /// Entry `i` holds the value for whoever this player knows as `i`, or
    /// `None` for slots not discovered yet.
    #[must_use]
    pub fn reorder<T: Clone>(&self, data: &[T]) -> Vec<Option<T>> {
        (0..self.slots.len().max(data.len()))
            .map(|local| {
                PlayerId::try_from(local)
                    .ok()
                    .and_then(|local| self.global(local))
                    .and_then(|global| data.get(usize::from(global)).cloned())
            })
            .collect()
    }
}

/// State for a single player.
#[derive(Debug, Clone)]
pub struct Player {
    /// Unique identifier for this player.
    pub id: PlayerId,
    /// Set by the supervisor; evicted players no longer move or score.
    pub evicted: bool,
    /// Running score, including the turn in progress.
    pub score: Fraction,
    /// Score at the end of every committed turn, starting with 0.
    pub history: Vec<Fraction>,
    /// End-of-game bonus.
    pub bonus: Fraction,
    /// Private numbering of opponents.
    pub perspective: Perspective,
    /// Food this player has seen and not yet seen disappear.
    pub seen_food: BTreeSet<FoodId>,
    /// Cells where seen food was observed gone during the latest update.
    pub removed_food: Vec<Loc>,
}

impl Player {
    /// Create a player with a zero score.
    #[must_use]
    pub fn new(id: PlayerId, num_players: usize) -> Self {
        Self {
            id,
            evicted: false,
            score: Fraction::ZERO,
            history: vec![Fraction::ZERO],
            bonus: Fraction::ZERO,
            perspective: Perspective::new(id, num_players),
            seen_food: BTreeSet::new(),
            removed_food: Vec::new(),
        }
    }

    /// Score as of the last committed turn.
    #[must_use]
    pub fn committed_score(&self) -> Fraction {
        self.history.last().copied().unwrap_or_default()
    }

    /// Record the running score as this turn's result.
    pub fn commit(&mut self) {
        self.history.push(self.score);
    }

    /// Make the running score the turn-0 entry of the history, so points
    /// for the starting ants survive an eviction before the first commit.
    pub fn start_history(&mut self) {
        self.history = vec![self.score];
    }

    /// Undo everything scored since the last commit.
    pub fn rollback(&mut self) {
        self.score = self.committed_score();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perspective_self_is_zero() {
        let perspective = Perspective::new(2, 4);
        assert_eq!(perspective.get(2), Some(0));
        assert_eq!(perspective.get(0), None);
    }

    #[test]
    fn test_perspective_first_seen_order() {
        let mut perspective = Perspective::new(1, 4);
        assert_eq!(perspective.resolve(3), 1);
        assert_eq!(perspective.resolve(0), 2);
        assert_eq!(perspective.resolve(3), 1);
        assert_eq!(perspective.resolve(1), 0);
        assert_eq!(perspective.global(2), Some(0));
    }

    #[test]
    fn test_reorder() {
        let mut perspective = Perspective::new(1, 3);
        perspective.resolve(2);
        let ordered = perspective.reorder(&[10, 20, 30]);
        assert_eq!(ordered, vec![Some(20), Some(30), None]);
    }

    #[test]
    fn test_commit_and_rollback() {
        let mut player = Player::new(0, 2);
        player.score += Fraction::ONE;
        player.commit();
        player.score += Fraction::share(2);
        player.rollback();
        assert_eq!(player.score, Fraction::ONE);
        assert_eq!(player.history, vec![Fraction::ZERO, Fraction::ONE]);
    }
}
