// Adapters layer: concrete collaborators for the renderer process, file storage and binary provisioning.

pub mod local_store;
pub mod process_renderer;
pub mod provisioning;
