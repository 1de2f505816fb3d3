//! Entity data model shared by the server simulation and client replica.
//!
//! Each entity serializes to one JSON object per line; the name of the id
//! field (`ship` / `proj` / `star`) doubles as the type discriminant.

use crate::component::{OverrideFn, OverrideTable, PowerUp, PowerUpKind};
use crate::math::Vec2;
use crate::protocol::Action;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    #[serde(rename = "ship")]
    pub id: u32,
    pub loc: Vec2,
    pub dir: Vec2,
    pub thrust: bool,
    pub name: String,
    pub hp: i32,
    pub score: i32,

    // Server-side state, never on the wire.
    #[serde(skip)]
    pub velocity: Vec2,
    #[serde(skip)]
    pub respawn_timer: u32,
    #[serde(skip)]
    pub power_ups: Vec<PowerUp>,
    #[serde(skip)]
    pub overrides: OverrideTable,
}

impl Ship {
    pub fn new(id: u32, name: String, loc: Vec2, hp: i32, respawn_timer: u32) -> Ship {
        Ship {
            id,
            loc,
            dir: Vec2::new(0.0, -1.0),
            thrust: false,
            name,
            hp,
            score: 0,
            velocity: Vec2::ZERO,
            respawn_timer,
            power_ups: Vec::new(),
            overrides: OverrideTable::default(),
        }
    }

    pub fn has_power_up(&self, kind: PowerUpKind) -> bool {
        self.power_ups.iter().any(|p| p.kind == kind)
    }

    pub fn power_up_mut(&mut self, kind: PowerUpKind) -> Option<&mut PowerUp> {
        self.power_ups.iter_mut().find(|p| p.kind == kind)
    }

    /// Attaches a power-up unless one of the same kind is already present.
    /// Returns whether it was attached.
    pub fn attach(&mut self, power_up: PowerUp) -> bool {
        if self.has_power_up(power_up.kind) {
            return false;
        }
        self.power_ups.push(power_up);
        true
    }

    pub fn add_override(&mut self, action: Action, override_fn: OverrideFn) {
        self.overrides.add(action, override_fn);
    }

    pub fn remove_override(&mut self, action: Action, override_fn: OverrideFn) -> bool {
        self.overrides.remove(action, override_fn)
    }
}

/// Lightweight by design: projectiles are high-churn and carry no power-ups
/// or override table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    #[serde(rename = "proj")]
    pub id: u32,
    pub loc: Vec2,
    pub dir: Vec2,
    pub alive: bool,
    pub owner: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Star {
    #[serde(rename = "star")]
    pub id: u32,
    pub loc: Vec2,
    pub mass: f64,
    /// Reserved for the burn rule; not replicated.
    #[serde(skip)]
    pub hp: i32,
}

impl Star {
    pub fn new(id: u32) -> Star {
        Star {
            id,
            loc: Vec2::ZERO,
            mass: 0.015,
            hp: 1000,
        }
    }
}

/// One parsed snapshot line. The variant is picked by which id field the
/// JSON object carries.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireEntity {
    Ship(Ship),
    Projectile(Projectile),
    Star(Star),
}

/// Parses one snapshot line into its tagged entity.
pub fn parse_entity(line: &str) -> Result<WireEntity, serde_json::Error> {
    serde_json::from_str(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ship_defaults() {
        let ship = Ship::new(2, "Icarus".to_string(), Vec2::new(10.0, -20.0), 5, 300);
        assert_eq!(ship.dir, Vec2::new(0.0, -1.0));
        assert_eq!(ship.velocity, Vec2::ZERO);
        assert!(!ship.thrust);
        assert_eq!(ship.score, 0);
        assert!(ship.power_ups.is_empty());
    }

    #[test]
    fn test_power_up_never_attached_twice() {
        use crate::component::{PowerUp, PowerUpKind, Removal};

        let mut ship = Ship::new(2, "a".to_string(), Vec2::ZERO, 5, 300);
        assert!(ship.attach(PowerUp::new(PowerUpKind::QuadFire, Removal::OwnerDead)));
        assert!(!ship.attach(PowerUp::new(PowerUpKind::QuadFire, Removal::OwnerDead)));
        assert_eq!(ship.power_ups.len(), 1);
    }

    #[test]
    fn test_ship_wire_roundtrip() {
        let mut ship = Ship::new(7, "Icarus".to_string(), Vec2::new(1.0, 2.0), 4, 120);
        ship.score = 3;
        ship.thrust = true;

        let json = serde_json::to_string(&ship).unwrap();
        assert!(json.contains("\"ship\":7"));

        match parse_entity(&json).unwrap() {
            WireEntity::Ship(parsed) => {
                assert_eq!(parsed.id, 7);
                assert_eq!(parsed.loc, ship.loc);
                assert_eq!(parsed.dir, ship.dir);
                assert_eq!(parsed.name, "Icarus");
                assert_eq!(parsed.hp, 4);
                assert_eq!(parsed.score, 3);
                assert!(parsed.thrust);
            }
            other => panic!("expected ship, got {:?}", other),
        }
    }

    #[test]
    fn test_projectile_wire_roundtrip() {
        let proj = Projectile {
            id: 42,
            loc: Vec2::new(-3.0, 8.5),
            dir: Vec2::new(0.0, 1.0),
            alive: true,
            owner: 2,
        };

        let json = serde_json::to_string(&proj).unwrap();
        assert!(json.contains("\"proj\":42"));

        match parse_entity(&json).unwrap() {
            WireEntity::Projectile(parsed) => {
                assert_eq!(parsed.id, 42);
                assert_eq!(parsed.owner, 2);
                assert!(parsed.alive);
                assert_eq!(parsed.loc, proj.loc);
            }
            other => panic!("expected projectile, got {:?}", other),
        }
    }

    #[test]
    fn test_star_wire_roundtrip() {
        let star = Star::new(1);
        let json = serde_json::to_string(&star).unwrap();
        assert!(json.contains("\"star\":1"));

        match parse_entity(&json).unwrap() {
            WireEntity::Star(parsed) => {
                assert_eq!(parsed.id, 1);
                assert_eq!(parsed.loc, Vec2::ZERO);
                assert_eq!(parsed.mass, 0.015);
            }
            other => panic!("expected star, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        assert!(parse_entity("not json").is_err());
        assert!(parse_entity(r#"{"unknown":1}"#).is_err());
    }
}
