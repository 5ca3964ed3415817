// Closed categorical domains for the canonical tables
// Every enumerated field is a sum type, so invalid values die at the
// validation boundary instead of propagating as strings.

use serde::{Deserialize, Serialize};

// ============================================================================
// ROLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Hitter,
    Pitcher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Hitter => "hitter",
            Role::Pitcher => "pitcher",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hitter" | "bat" | "position" => Some(Role::Hitter),
            "pitcher" | "arm" => Some(Role::Pitcher),
            _ => None,
        }
    }
}

// ============================================================================
// ASSIGNED / PLAYED LEVEL
// ============================================================================

/// Minor-league ladder, ordered low to high. `Ord` follows ladder order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Rookie,
    LowA,
    SingleA,
    HighA,
    DoubleA,
    TripleA,
    Mlb,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Rookie => "R",
            Level::LowA => "A-",
            Level::SingleA => "A",
            Level::HighA => "A+",
            Level::DoubleA => "AA",
            Level::TripleA => "AAA",
            Level::Mlb => "MLB",
        }
    }

    pub fn parse(s: &str) -> Option<Level> {
        match s.trim().to_ascii_uppercase().as_str() {
            "R" | "ROK" | "CPX" => Some(Level::Rookie),
            "A-" => Some(Level::LowA),
            "A" => Some(Level::SingleA),
            "A+" => Some(Level::HighA),
            "AA" => Some(Level::DoubleA),
            "AAA" => Some(Level::TripleA),
            "MLB" => Some(Level::Mlb),
            _ => None,
        }
    }
}

// ============================================================================
// POSITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    Catcher,
    FirstBase,
    SecondBase,
    ThirdBase,
    Shortstop,
    LeftField,
    CenterField,
    RightField,
    Outfield,
    DesignatedHitter,
    Utility,
    Starter,
    Reliever,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Catcher => "C",
            Position::FirstBase => "1B",
            Position::SecondBase => "2B",
            Position::ThirdBase => "3B",
            Position::Shortstop => "SS",
            Position::LeftField => "LF",
            Position::CenterField => "CF",
            Position::RightField => "RF",
            Position::Outfield => "OF",
            Position::DesignatedHitter => "DH",
            Position::Utility => "UTIL",
            Position::Starter => "SP",
            Position::Reliever => "RP",
        }
    }

    pub fn parse(s: &str) -> Option<Position> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" => Some(Position::Catcher),
            "1B" => Some(Position::FirstBase),
            "2B" => Some(Position::SecondBase),
            "3B" => Some(Position::ThirdBase),
            "SS" => Some(Position::Shortstop),
            "LF" => Some(Position::LeftField),
            "CF" => Some(Position::CenterField),
            "RF" => Some(Position::RightField),
            "OF" => Some(Position::Outfield),
            "DH" => Some(Position::DesignatedHitter),
            "UTIL" | "UT" => Some(Position::Utility),
            "SP" => Some(Position::Starter),
            "RP" | "SIRP" | "MIRP" => Some(Position::Reliever),
            _ => None,
        }
    }

    /// Which role this position implies, used as a consistency check
    /// against the explicit role column.
    pub fn implied_role(&self) -> Role {
        match self {
            Position::Starter | Position::Reliever => Role::Pitcher,
            _ => Role::Hitter,
        }
    }
}

// ============================================================================
// HANDEDNESS (bats / throws)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
    Switch,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handedness::Left => "L",
            Handedness::Right => "R",
            Handedness::Switch => "S",
        }
    }

    pub fn parse(s: &str) -> Option<Handedness> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Some(Handedness::Left),
            "R" => Some(Handedness::Right),
            "S" | "B" => Some(Handedness::Switch),
            _ => None,
        }
    }
}

// ============================================================================
// FUTURE VALUE (the valuation label)
// ============================================================================

/// The discretized valuation label. The grid is fixed: any other value
/// is a row-level validation failure, never a rounding candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FutureValue {
    Fv20,
    Fv30,
    Fv35,
    Fv40,
    Fv42_5,
    Fv45,
    Fv47_5,
    Fv50,
    Fv55,
    Fv60,
    Fv65,
    Fv70,
}

impl FutureValue {
    pub const ALL: [FutureValue; 12] = [
        FutureValue::Fv20,
        FutureValue::Fv30,
        FutureValue::Fv35,
        FutureValue::Fv40,
        FutureValue::Fv42_5,
        FutureValue::Fv45,
        FutureValue::Fv47_5,
        FutureValue::Fv50,
        FutureValue::Fv55,
        FutureValue::Fv60,
        FutureValue::Fv65,
        FutureValue::Fv70,
    ];

    pub fn as_f64(&self) -> f64 {
        match self {
            FutureValue::Fv20 => 20.0,
            FutureValue::Fv30 => 30.0,
            FutureValue::Fv35 => 35.0,
            FutureValue::Fv40 => 40.0,
            FutureValue::Fv42_5 => 42.5,
            FutureValue::Fv45 => 45.0,
            FutureValue::Fv47_5 => 47.5,
            FutureValue::Fv50 => 50.0,
            FutureValue::Fv55 => 55.0,
            FutureValue::Fv60 => 60.0,
            FutureValue::Fv65 => 65.0,
            FutureValue::Fv70 => 70.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FutureValue::Fv20 => "20",
            FutureValue::Fv30 => "30",
            FutureValue::Fv35 => "35",
            FutureValue::Fv40 => "40",
            FutureValue::Fv42_5 => "42.5",
            FutureValue::Fv45 => "45",
            FutureValue::Fv47_5 => "47.5",
            FutureValue::Fv50 => "50",
            FutureValue::Fv55 => "55",
            FutureValue::Fv60 => "60",
            FutureValue::Fv65 => "65",
            FutureValue::Fv70 => "70",
        }
    }

    /// Parse a raw FV cell. Accepts "45", "45.0", "42.5"; rejects
    /// anything off the grid (including "44" or "45+").
    pub fn parse(s: &str) -> Option<FutureValue> {
        let v: f64 = s.trim().parse().ok()?;
        FutureValue::from_f64(v)
    }

    pub fn from_f64(v: f64) -> Option<FutureValue> {
        FutureValue::ALL
            .iter()
            .copied()
            .find(|fv| (fv.as_f64() - v).abs() < 1e-9)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fv_grid_is_closed() {
        assert_eq!(FutureValue::parse("45"), Some(FutureValue::Fv45));
        assert_eq!(FutureValue::parse("42.5"), Some(FutureValue::Fv42_5));
        assert_eq!(FutureValue::parse("47.5"), Some(FutureValue::Fv47_5));
        assert_eq!(FutureValue::parse("45.0"), Some(FutureValue::Fv45));

        // Off-grid values are rejected, not rounded
        assert_eq!(FutureValue::parse("44"), None);
        assert_eq!(FutureValue::parse("45+"), None);
        assert_eq!(FutureValue::parse("80"), None);
        assert_eq!(FutureValue::parse(""), None);
    }

    #[test]
    fn test_fv_roundtrip_all() {
        for fv in FutureValue::ALL {
            assert_eq!(FutureValue::parse(fv.as_str()), Some(fv));
            assert_eq!(FutureValue::from_f64(fv.as_f64()), Some(fv));
        }
    }

    #[test]
    fn test_fv_ordering() {
        assert!(FutureValue::Fv40 < FutureValue::Fv42_5);
        assert!(FutureValue::Fv42_5 < FutureValue::Fv45);
        assert!(FutureValue::Fv47_5 < FutureValue::Fv50);
    }

    #[test]
    fn test_level_parse_and_order() {
        assert_eq!(Level::parse("AA"), Some(Level::DoubleA));
        assert_eq!(Level::parse("a+"), Some(Level::HighA));
        assert_eq!(Level::parse("CPX"), Some(Level::Rookie));
        assert_eq!(Level::parse("Short-A"), None);
        assert!(Level::SingleA < Level::DoubleA);
        assert!(Level::TripleA < Level::Mlb);
    }

    #[test]
    fn test_role_and_position_agree() {
        assert_eq!(Position::parse("SS"), Some(Position::Shortstop));
        assert_eq!(Position::Shortstop.implied_role(), Role::Hitter);
        assert_eq!(Position::parse("SP"), Some(Position::Starter));
        assert_eq!(Position::Starter.implied_role(), Role::Pitcher);
    }

    #[test]
    fn test_handedness_parse() {
        assert_eq!(Handedness::parse("L"), Some(Handedness::Left));
        assert_eq!(Handedness::parse("b"), Some(Handedness::Switch));
        assert_eq!(Handedness::parse("X"), None);
    }
}
