// Domain layer: the row model and the ports (storage, configuration, pipeline)
// the core is written against.

pub mod model;
pub mod ports;
