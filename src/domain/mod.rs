// Domain layer: invoice model, the static component descriptor, and the collaborator ports.

pub mod descriptor;
pub mod model;
pub mod ports;
