//! Kernel commands discovered at link time

pub mod metadata;
pub mod params;

pub use metadata::{KernelDescriptor, KernelFactory, ParameterSchema};
pub use params::KernelParams;

/// Find the Kernel registered under `name`
pub fn lookup(name: &str) -> Option<&'static KernelDescriptor> {
    inventory::iter::<KernelDescriptor>
        .into_iter()
        .find(|descriptor| descriptor.name == name)
}

/// Every registered Kernel, sorted by name
pub fn all() -> Vec<&'static KernelDescriptor> {
    let mut descriptors: Vec<&'static KernelDescriptor> = inventory::iter::<KernelDescriptor>.into_iter().collect();
    descriptors.sort_by_key(|descriptor| descriptor.name);
    descriptors
}
