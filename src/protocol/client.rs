//! Agent-side protocol handling.
//!
//! [`BotDriver`] collects engine lines until a `ready` or `go` sentinel,
//! keeps a [`BotWorld`] up to date and asks the [`Bot`] for orders.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};

use thiserror::Error;

use crate::game::{Cell, Direction, Grid, Loc, PlayerId, Torus};
use crate::protocol::{END_ORDERS, GO, READY};

/// Errors raised while parsing engine messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A line could not be parsed.
    #[error("bad line {line:?}: {reason}")]
    BadLine {
        /// The offending line.
        line: String,
        /// What was wrong with it.
        reason: &'static str,
    },
    /// The setup block lacked a required key.
    #[error("setup is missing {0}")]
    MissingSetting(&'static str),
    /// A `go` block arrived before the `ready` block.
    #[error("turn data received before setup")]
    NotConfigured,
    /// Reading from the engine or writing orders failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

fn bad_line(line: &str, reason: &'static str) -> ProtocolError {
    ProtocolError::BadLine {
        line: line.to_string(),
        reason,
    }
}

fn parse_number<T: std::str::FromStr>(line: &str, token: Option<&str>) -> Result<T, ProtocolError> {
    token
        .ok_or_else(|| bad_line(line, "missing value"))?
        .parse()
        .map_err(|_| bad_line(line, "value is not a number"))
}

/// Game parameters from the setup block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotSettings {
    /// Milliseconds allowed for setup.
    pub loadtime: u32,
    /// Milliseconds allowed per turn.
    pub turntime: u32,
    /// Grid height.
    pub rows: usize,
    /// Grid width.
    pub cols: usize,
    /// Maximum number of turns.
    pub turns: u32,
    /// Squared view radius.
    pub viewradius2: u32,
    /// Squared attack radius.
    pub attackradius2: u32,
    /// Squared spawn radius.
    pub spawnradius2: u32,
    /// Seed for the agent's own randomness.
    pub player_seed: u64,
}

impl BotSettings {
    /// Parse a setup block. Unknown keys are skipped.
    ///
    /// # Errors
    ///
    /// Fails on an unparseable value or when `rows` or `cols` is missing.
    pub fn parse(block: &str) -> Result<Self, ProtocolError> {
        let mut settings = Self::default();
        let mut rows = None;
        let mut cols = None;
        for line in block.lines() {
            let line = line.trim();
            let mut tokens = line.split_whitespace();
            let Some(key) = tokens.next() else {
                continue;
            };
            let value = tokens.next();
            match key.to_ascii_lowercase().as_str() {
                "rows" => rows = Some(parse_number(line, value)?),
                "cols" => cols = Some(parse_number(line, value)?),
                "loadtime" => settings.loadtime = parse_number(line, value)?,
                "turntime" => settings.turntime = parse_number(line, value)?,
                "turns" => settings.turns = parse_number(line, value)?,
                "viewradius2" => settings.viewradius2 = parse_number(line, value)?,
                "attackradius2" => settings.attackradius2 = parse_number(line, value)?,
                "spawnradius2" => settings.spawnradius2 = parse_number(line, value)?,
                "player_seed" => settings.player_seed = parse_number(line, value)?,
                _ => {}
            }
        }
        settings.rows = rows.ok_or(ProtocolError::MissingSetting("rows"))?;
        settings.cols = cols.ok_or(ProtocolError::MissingSetting("cols"))?;
        Ok(settings)
    }
}

/// An ant reported by the engine, with the owner in this agent's numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeenAnt {
    /// Where it is.
    pub loc: Loc,
    /// Owner; 0 is this agent.
    pub owner: PlayerId,
}

/// What an agent knows about the game.
///
/// Water is remembered for the whole game. Ants, food and corpses only
/// describe the latest turn. Corpses count as unoccupied.
#[derive(Debug, Clone)]
pub struct BotWorld {
    settings: BotSettings,
    grid: Grid,
    turn: u32,
    my_ants: Vec<Loc>,
    enemy_ants: Vec<SeenAnt>,
    food: Vec<Loc>,
    dead: Vec<SeenAnt>,
    orders: Vec<(Loc, Direction)>,
}

impl BotWorld {
    /// An all-land world of the configured size.
    ///
    /// # Errors
    ///
    /// Fails if either dimension is zero.
    pub fn new(settings: BotSettings) -> Result<Self, ProtocolError> {
        let torus = Torus::new(settings.rows, settings.cols).ok_or(ProtocolError::MissingSetting("rows and cols"))?;
        Ok(Self {
            settings,
            grid: Grid::new(torus),
            turn: 0,
            my_ants: Vec::new(),
            enemy_ants: Vec::new(),
            food: Vec::new(),
            dead: Vec::new(),
            orders: Vec::new(),
        })
    }

    /// Setup parameters.
    #[must_use]
    pub const fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Grid geometry.
    #[must_use]
    pub const fn torus(&self) -> Torus {
        self.grid.torus()
    }

    /// Number of turn blocks received.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// This agent's live ants, in message order.
    #[must_use]
    pub fn my_ants(&self) -> &[Loc] {
        &self.my_ants
    }

    /// Visible enemy ants.
    #[must_use]
    pub fn enemy_ants(&self) -> &[SeenAnt] {
        &self.enemy_ants
    }

    /// Visible food.
    #[must_use]
    pub fn food(&self) -> &[Loc] {
        &self.food
    }

    /// Ants that died last turn.
    #[must_use]
    pub fn dead(&self) -> &[SeenAnt] {
        &self.dead
    }

    /// Not known to be water.
    #[must_use]
    pub fn passable(&self, loc: Loc) -> bool {
        self.grid.get(loc).passable()
    }

    /// Land or a corpse.
    #[must_use]
    pub fn unoccupied(&self, loc: Loc) -> bool {
        self.grid.get(loc).unoccupied()
    }

    /// Cell one step away, wrapped.
    #[must_use]
    pub fn destination(&self, loc: Loc, direction: Direction) -> Loc {
        self.torus().destination(loc, direction)
    }

    /// Toroidal Manhattan distance.
    #[must_use]
    pub fn distance(&self, a: Loc, b: Loc) -> usize {
        let torus = self.torus();
        let d_row = a.row.abs_diff(b.row);
        let d_col = a.col.abs_diff(b.col);
        d_row.min(torus.rows() - d_row) + d_col.min(torus.cols() - d_col)
    }

    /// Directions that bring `from` closer to `to`.
    ///
    /// When the target sits exactly half way round an axis both ways along
    /// that axis are returned.
    #[must_use]
    pub fn directions(&self, from: Loc, to: Loc) -> Vec<Direction> {
        let torus = self.torus();
        let mut directions = Vec::with_capacity(4);
        let half_rows = torus.rows() / 2;
        let half_cols = torus.cols() / 2;
        if from.row < to.row {
            let d = to.row - from.row;
            if d >= half_rows {
                directions.push(Direction::North);
            }
            if d <= half_rows {
                directions.push(Direction::South);
            }
        }
        if to.row < from.row {
            let d = from.row - to.row;
            if d >= half_rows {
                directions.push(Direction::South);
            }
            if d <= half_rows {
                directions.push(Direction::North);
            }
        }
        if from.col < to.col {
            let d = to.col - from.col;
            if d >= half_cols {
                directions.push(Direction::West);
            }
            if d <= half_cols {
                directions.push(Direction::East);
            }
        }
        if to.col < from.col {
            let d = from.col - to.col;
            if d >= half_cols {
                directions.push(Direction::East);
            }
            if d <= half_cols {
                directions.push(Direction::West);
            }
        }
        directions
    }

    /// First of `directions` leading onto a free, passable cell.
    #[must_use]
    pub fn passable_direction(&self, loc: Loc, directions: &[Direction]) -> Option<Direction> {
        directions.iter().copied().find(|&direction| {
            let next = self.destination(loc, direction);
            self.passable(next) && self.unoccupied(next)
        })
    }

    /// Nearest visible food by Manhattan distance.
    #[must_use]
    pub fn closest_food(&self, loc: Loc) -> Option<Loc> {
        self.food.iter().copied().min_by_key(|&food| self.distance(loc, food))
    }

    /// Nearest visible enemy by Manhattan distance.
    #[must_use]
    pub fn closest_enemy(&self, loc: Loc) -> Option<SeenAnt> {
        self.enemy_ants
            .iter()
            .copied()
            .min_by_key(|enemy| self.distance(loc, enemy.loc))
    }

    /// Queue an order for this turn.
    pub fn issue_order(&mut self, loc: Loc, direction: Direction) {
        self.orders.push((loc, direction));
    }

    /// Orders queued this turn, in the order given.
    #[must_use]
    pub fn orders(&self) -> &[(Loc, Direction)] {
        &self.orders
    }

    fn take_orders(&mut self) -> Vec<String> {
        self.orders
            .drain(..)
            .map(|(loc, direction)| format!("o {} {} {direction}", loc.row, loc.col))
            .collect()
    }

    fn parse_loc(&self, line: &str, row: Option<&str>, col: Option<&str>) -> Result<Loc, ProtocolError> {
        let loc = Loc::new(parse_number(line, row)?, parse_number(line, col)?);
        if self.torus().contains(loc) {
            Ok(loc)
        } else {
            Err(bad_line(line, "location outside the map"))
        }
    }

    /// Apply a turn block.
    ///
    /// # Errors
    ///
    /// Fails on malformed lines; the world may be partially updated.
    pub fn update(&mut self, block: &str) -> Result<(), ProtocolError> {
        let stale: BTreeSet<Loc> = self
            .my_ants
            .iter()
            .copied()
            .chain(self.enemy_ants.iter().map(|ant| ant.loc))
            .chain(self.food.iter().copied())
            .collect();
        for loc in stale {
            self.grid.place(loc, Cell::Land);
        }
        self.my_ants.clear();
        self.enemy_ants.clear();
        self.food.clear();
        self.dead.clear();
        self.orders.clear();
        self.turn += 1;

        for line in block.lines() {
            let line = line.trim();
            let mut tokens = line.split_whitespace();
            let Some(kind) = tokens.next() else {
                continue;
            };
            if kind.starts_with('#') {
                continue;
            }
            let (row, col) = (tokens.next(), tokens.next());
            match kind.to_ascii_lowercase().as_str() {
                "w" => {
                    let loc = self.parse_loc(line, row, col)?;
                    self.grid.place(loc, Cell::Water);
                }
                "f" => {
                    let loc = self.parse_loc(line, row, col)?;
                    self.grid.place(loc, Cell::Food);
                    self.food.push(loc);
                }
                "a" => {
                    let loc = self.parse_loc(line, row, col)?;
                    let owner: PlayerId = parse_number(line, tokens.next())?;
                    self.grid.place(loc, Cell::Ant(owner));
                    if owner == 0 {
                        self.my_ants.push(loc);
                    } else {
                        self.enemy_ants.push(SeenAnt { loc, owner });
                    }
                }
                "d" => {
                    let loc = self.parse_loc(line, row, col)?;
                    let owner: PlayerId = parse_number(line, tokens.next())?;
                    self.dead.push(SeenAnt { loc, owner });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Known map, one string per row, unseen land rendered as land.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        self.grid.render_rows()
    }
}

/// Turn logic plugged into a [`BotDriver`].
pub trait Bot {
    /// Called once after the setup block.
    fn setup(&mut self, _world: &BotWorld) {}

    /// Called every turn; queue orders with [`BotWorld::issue_order`].
    fn do_turn(&mut self, world: &mut BotWorld);
}

/// Drives a [`Bot`] from protocol text.
#[derive(Debug)]
pub struct BotDriver<B> {
    bot: B,
    world: Option<BotWorld>,
    buffer: String,
}

impl<B: Bot> BotDriver<B> {
    /// Wrap a bot.
    pub const fn new(bot: B) -> Self {
        Self {
            bot,
            world: None,
            buffer: String::new(),
        }
    }

    /// The wrapped bot.
    pub const fn bot(&self) -> &B {
        &self.bot
    }

    /// World state, once the setup block has been seen.
    pub const fn world(&self) -> Option<&BotWorld> {
        self.world.as_ref()
    }

    /// Feed one line.
    ///
    /// Returns the order lines when the line completes a block: empty for
    /// `ready`, the bot's orders for `go`. Other lines are buffered.
    ///
    /// # Errors
    ///
    /// Fails if the completed block cannot be parsed.
    pub fn feed_line(&mut self, line: &str) -> Result<Option<Vec<String>>, ProtocolError> {
        let sentinel = line.trim().to_ascii_lowercase();
        if sentinel == READY {
            let block = std::mem::take(&mut self.buffer);
            let world = BotWorld::new(BotSettings::parse(&block)?)?;
            self.bot.setup(&world);
            self.world = Some(world);
            return Ok(Some(Vec::new()));
        }
        if sentinel == GO {
            let block = std::mem::take(&mut self.buffer);
            let world = self.world.as_mut().ok_or(ProtocolError::NotConfigured)?;
            world.update(&block)?;
            self.bot.do_turn(world);
            return Ok(Some(world.take_orders()));
        }
        self.buffer.push_str(line);
        self.buffer.push('\n');
        Ok(None)
    }

    /// Feed a whole message; returns the orders of the last completed block.
    ///
    /// # Errors
    ///
    /// Fails if a completed block cannot be parsed.
    pub fn receive(&mut self, message: &str) -> Result<Vec<String>, ProtocolError> {
        let mut orders = Vec::new();
        for line in message.lines() {
            if let Some(answer) = self.feed_line(line)? {
                orders = answer;
            }
        }
        Ok(orders)
    }

    /// Serve the protocol until `input` ends, answering every block with
    /// its order lines and a closing `go`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or unparseable blocks.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<(), ProtocolError> {
        for line in input.lines() {
            if let Some(orders) = self.feed_line(&line?)? {
                for order in orders {
                    writeln!(output, "{order}")?;
                }
                writeln!(output, "{END_ORDERS}")?;
                output.flush()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SETUP: &str = "turn 0\nloadtime 3000\nturntime 1000\nrows 4\ncols 6\nturns 50\nviewradius2 9\nattackradius2 2\nspawnradius2 1\nplayer_seed 42\n";

    /// Sends every ant north.
    struct NorthBot;

    impl Bot for NorthBot {
        fn do_turn(&mut self, world: &mut BotWorld) {
            for loc in world.my_ants().to_vec() {
                world.issue_order(loc, Direction::North);
            }
        }
    }

    fn configured() -> BotWorld {
        BotWorld::new(BotSettings::parse(SETUP).unwrap()).unwrap()
    }

    #[test]
    fn test_settings_parse() {
        let settings = BotSettings::parse(SETUP).unwrap();
        assert_eq!(settings.rows, 4);
        assert_eq!(settings.cols, 6);
        assert_eq!(settings.player_seed, 42);
        assert_eq!(settings.attackradius2, 2);
    }

    #[test]
    fn test_settings_require_dimensions() {
        let err = BotSettings::parse("turn 0\ncols 4\n").unwrap_err();
        assert!(matches!(err, ProtocolError::MissingSetting("rows")));
        let err = BotSettings::parse("rows x\n").unwrap_err();
        assert!(matches!(err, ProtocolError::BadLine { .. }));
    }

    #[test]
    fn test_update_keeps_water_clears_ants() {
        let mut world = configured();
        world.update("w 0 1\na 1 1 0\na 2 2 1\nf 3 3\nd 0 5 1\n").unwrap();
        assert_eq!(world.my_ants(), &[Loc::new(1, 1)]);
        assert_eq!(world.enemy_ants(), &[SeenAnt { loc: Loc::new(2, 2), owner: 1 }]);
        assert_eq!(world.food(), &[Loc::new(3, 3)]);
        assert!(world.unoccupied(Loc::new(0, 5)));

        world.update("a 0 0 0\n").unwrap();
        assert!(!world.passable(Loc::new(0, 1)));
        assert!(world.unoccupied(Loc::new(1, 1)));
        assert!(world.unoccupied(Loc::new(3, 3)));
        assert!(world.enemy_ants().is_empty());
        assert_eq!(world.turn(), 2);
    }

    #[test]
    fn test_update_rejects_out_of_bounds() {
        let mut world = configured();
        assert!(world.update("a 9 0 0\n").is_err());
        assert!(world.update("a 0 0\n").is_err());
    }

    #[test]
    fn test_distance_and_directions_wrap() {
        let world = configured();
        assert_eq!(world.distance(Loc::new(0, 0), Loc::new(3, 5)), 2);
        assert_eq!(
            world.directions(Loc::new(0, 0), Loc::new(3, 1)),
            vec![Direction::North, Direction::East]
        );
        // Half way round both ways are equally short.
        assert_eq!(
            world.directions(Loc::new(0, 0), Loc::new(2, 0)),
            vec![Direction::North, Direction::South]
        );
        assert!(world.directions(Loc::new(1, 1), Loc::new(1, 1)).is_empty());
    }

    #[test]
    fn test_driver_ready_then_go() {
        let mut driver = BotDriver::new(NorthBot);
        let answer = driver.receive(&format!("{SETUP}ready\n")).unwrap();
        assert!(answer.is_empty());
        let answer = driver.receive("a 1 2 0\na 3 3 1\ngo\n").unwrap();
        assert_eq!(answer, vec!["o 1 2 n".to_string()]);
    }

    #[test]
    fn test_driver_go_before_ready() {
        let mut driver = BotDriver::new(NorthBot);
        assert!(matches!(driver.receive("go\n"), Err(ProtocolError::NotConfigured)));
    }

    #[test]
    fn test_driver_run_writes_go() {
        let mut driver = BotDriver::new(NorthBot);
        let input = format!("{SETUP}ready\na 2 2 0\ngo\n");
        let mut output = Vec::new();
        driver.run(input.as_bytes(), &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "go\no 2 2 n\ngo\n");
    }
}
