//! Domain layer: aggregates, value objects, events and the cashback rules.
pub mod aggregates;
pub mod events;
pub mod loyalty;
pub mod value_objects;
