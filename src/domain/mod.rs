// Domain layer: models, user criteria and ports. No I/O here.

pub mod criteria;
pub mod model;
pub mod ports;
