pub mod component;
pub mod entity;
pub mod math;
pub mod protocol;

pub use component::{OverrideFn, OverrideTable, PowerUp, PowerUpKind, Removal};
pub use entity::{parse_entity, Projectile, Ship, Star, WireEntity};
pub use math::Vec2;
pub use protocol::{extract_messages, Action, CommandSet, DEFAULT_PORT};
