use crate::core::{Kernel, SampleFormat, StageResult};
use crate::registry::KernelParams;
use serde::Serialize;

/// Schema for one positional parameter
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParameterSchema {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub param_type: &'static str,
    /// Value used when the parameter is omitted; `None` means required
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

impl ParameterSchema {
    pub const fn required(name: &'static str, param_type: &'static str) -> Self {
        Self {
            name,
            param_type,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, param_type: &'static str, default: &'static str) -> Self {
        Self {
            name,
            param_type,
            default: Some(default),
        }
    }
}

/// Factory function type for creating Kernel instances from positional parameters
pub type KernelFactory = fn(&KernelParams) -> StageResult<Box<dyn Kernel>>;

/// Complete description of one Kernel command
#[derive(Debug, Clone, Serialize)]
pub struct KernelDescriptor {
    pub name: &'static str,
    pub usage: &'static str,
    pub input: SampleFormat,
    pub output: SampleFormat,
    pub parameters: &'static [ParameterSchema],
    /// Fields per control line; 0 when the Kernel takes no live updates
    pub control: usize,
    #[serde(skip)]
    pub factory: KernelFactory,
}

impl KernelDescriptor {
    /// Build a configured instance of this Kernel
    pub fn create(&self, params: &KernelParams) -> StageResult<Box<dyn Kernel>> {
        (self.factory)(params)
    }

    pub fn accepts_control(&self) -> bool {
        self.control > 0
    }
}

inventory::collect!(KernelDescriptor);
