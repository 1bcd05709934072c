// Domain layer: session/record models and the ports (Transport, Pacer, RosterSource)
// the core depends on. Concrete implementations live in `adapters`.

pub mod model;
pub mod ports;
