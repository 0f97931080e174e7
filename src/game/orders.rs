//! Order parsing and validation.
//!
//! An order line is `o <row> <col> <direction>`. Lines are lowercased and
//! trimmed; blank lines and `#` comments are skipped. Each remaining line
//! ends up in exactly one of the report's three buckets.

use std::collections::HashSet;
use std::fmt;

use crate::game::PlayerId;
use crate::game::map::{Cell, Grid};
use crate::game::torus::{Direction, Loc};

/// Why an order line was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderRejection {
    /// First token is not `o`.
    UnknownAction,
    /// Wrong number of tokens.
    BadFormat,
    /// Row or column is not an integer.
    BadLocation,
    /// Direction is not one of `n e s w`.
    BadDirection,
    /// A second order for the same ant.
    Duplicate,
    /// Location outside the grid.
    OutOfBounds,
    /// Location does not hold one of the issuer's ants.
    NotPlayerAnt,
    /// Destination is food or water; the ant stays put. Not fatal.
    Blocked,
}

impl OrderRejection {
    /// Whether the order is merely ignored rather than invalid.
    #[must_use]
    pub const fn is_ignored(self) -> bool {
        matches!(self, Self::Blocked)
    }

    /// Reason text reported back to the agent.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::UnknownAction => "unknown action",
            Self::BadFormat => "incorrectly formatted order",
            Self::BadLocation => "invalid row or col",
            Self::BadDirection => "invalid direction",
            Self::Duplicate => "duplicate order",
            Self::OutOfBounds => "out of bounds",
            Self::NotPlayerAnt => "not player ant",
            Self::Blocked => "move blocked",
        }
    }
}

impl fmt::Display for OrderRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// A rejected line together with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOrder {
    /// The normalized (lowercased, trimmed) line.
    pub line: String,
    /// Why it was rejected.
    pub reason: OrderRejection,
}

impl fmt::Display for RejectedOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} # {}", self.line, self.reason)
    }
}

/// A validated move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    /// Cell of the ant being moved.
    pub loc: Loc,
    /// Where it goes.
    pub direction: Direction,
}

/// Outcome of processing one player's order text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderReport {
    /// Orders that will be executed.
    pub accepted: Vec<Order>,
    /// Physically blocked orders (the ant stays).
    pub ignored: Vec<RejectedOrder>,
    /// Malformed or illegal orders.
    pub invalid: Vec<RejectedOrder>,
}

impl OrderReport {
    fn reject(&mut self, line: String, reason: OrderRejection) {
        let rejected = RejectedOrder { line, reason };
        if reason.is_ignored() {
            self.ignored.push(rejected);
        } else {
            self.invalid.push(rejected);
        }
    }

    /// Whether every line was accepted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.ignored.is_empty() && self.invalid.is_empty()
    }
}

/// A syntactically valid order whose coordinates are not checked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedOrder {
    line: String,
    row: i64,
    col: i64,
    direction: Direction,
}

fn parse_line(line: &str) -> Result<(i64, i64, Direction), OrderRejection> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.first() != Some(&"o") {
        return Err(OrderRejection::UnknownAction);
    }
    let [_, row, col, direction] = tokens.as_slice() else {
        return Err(OrderRejection::BadFormat);
    };
    let (Ok(row), Ok(col)) = (row.parse::<i64>(), col.parse::<i64>()) else {
        return Err(OrderRejection::BadLocation);
    };
    let direction = Direction::from_token(direction).ok_or(OrderRejection::BadDirection)?;
    Ok((row, col, direction))
}

/// Parse, then validate, one player's order lines against the current grid.
///
/// Checks run in this order: duplicate location, bounds, ownership, blocked
/// destination. Only accepted orders count towards duplicate detection.
#[must_use]
pub fn process_orders<'a, I>(grid: &Grid, player: PlayerId, lines: I) -> OrderReport
where
    I: IntoIterator<Item = &'a str>,
{
    let mut report = OrderReport::default();
    let mut parsed = Vec::new();
    for raw in lines {
        let line = raw.trim().to_lowercase();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(&line) {
            Ok((row, col, direction)) => parsed.push(ParsedOrder {
                line,
                row,
                col,
                direction,
            }),
            Err(reason) => report.reject(line, reason),
        }
    }

    let torus = grid.torus();
    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    for order in parsed {
        if seen.contains(&(order.row, order.col)) {
            report.reject(order.line, OrderRejection::Duplicate);
            continue;
        }
        let loc = match (usize::try_from(order.row), usize::try_from(order.col)) {
            (Ok(row), Ok(col)) if torus.contains(Loc::new(row, col)) => Loc::new(row, col),
            _ => {
                report.reject(order.line, OrderRejection::OutOfBounds);
                continue;
            }
        };
        if grid.get(loc) != Cell::Ant(player) {
            report.reject(order.line, OrderRejection::NotPlayerAnt);
            continue;
        }
        let dest = torus.destination(loc, order.direction);
        if matches!(grid.get(dest), Cell::Food | Cell::Water) {
            report.reject(order.line, OrderRejection::Blocked);
            continue;
        }
        seen.insert((order.row, order.col));
        report.accepted.push(Order {
            loc,
            direction: order.direction,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::torus::Torus;

    fn grid() -> Grid {
        let mut grid = Grid::new(Torus::new(4, 4).unwrap());
        grid.place(Loc::new(0, 0), Cell::Ant(1));
        grid.place(Loc::new(1, 1), Cell::Ant(0));
        grid.place(Loc::new(0, 1), Cell::Water);
        grid.place(Loc::new(2, 1), Cell::Food);
        grid.place(Loc::new(3, 3), Cell::Ant(0));
        grid
    }

    fn reasons(rejected: &[RejectedOrder]) -> Vec<OrderRejection> {
        rejected.iter().map(|r| r.reason).collect()
    }

    #[test]
    fn test_not_player_ant() {
        let report = process_orders(&grid(), 0, ["o 0 0 n"]);
        assert!(report.accepted.is_empty());
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].to_string(), "o 0 0 n # not player ant");
    }

    #[test]
    fn test_parse_errors() {
        let report = process_orders(
            &grid(),
            0,
            ["x 1 1 n", "o 1 1", "o a 1 n", "o 1 1 q", "", "# note"],
        );
        assert_eq!(
            reasons(&report.invalid),
            vec![
                OrderRejection::UnknownAction,
                OrderRejection::BadFormat,
                OrderRejection::BadLocation,
                OrderRejection::BadDirection,
            ]
        );
    }

    #[test]
    fn test_blocked_is_ignored_not_invalid() {
        let report = process_orders(&grid(), 0, ["o 1 1 n", "o 1 1 s"]);
        // North is water, south is food.
        assert!(report.invalid.is_empty());
        assert_eq!(report.ignored.len(), 2);
        assert!(report.accepted.is_empty());
    }

    #[test]
    fn test_duplicate_only_after_accepted() {
        let report = process_orders(&grid(), 0, ["o 1 1 n", "o 1 1 e", "o 1 1 w"]);
        assert_eq!(
            report.accepted,
            vec![Order {
                loc: Loc::new(1, 1),
                direction: Direction::East
            }]
        );
        assert_eq!(reasons(&report.ignored), vec![OrderRejection::Blocked]);
        assert_eq!(reasons(&report.invalid), vec![OrderRejection::Duplicate]);
    }

    #[test]
    fn test_out_of_bounds_includes_negative() {
        let report = process_orders(&grid(), 0, ["o -1 0 n", "o 4 0 n", "O 3 3 E"]);
        assert_eq!(
            reasons(&report.invalid),
            vec![OrderRejection::OutOfBounds, OrderRejection::OutOfBounds]
        );
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].direction, Direction::East);
    }
}
