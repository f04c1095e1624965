mod registry;
mod selectors;

pub use registry::{ModelRegistry, ModelSpec, CAPABILITY_EDIT, CAPABILITY_IMAGE, CAPABILITY_TEXT};
pub use selectors::{ModelResolution, ModelSelection, ModelSelector};
