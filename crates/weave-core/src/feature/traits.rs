use crate::feature::descriptor::{Capabilities, FeatureDescriptor};
use crate::feature::state::StateBlob;
use crate::kernel::error::Result;

/// Core trait that all features must implement
pub trait Feature: Send + Sync {
    /// Declared interfaces and the handlers bound to them.
    ///
    /// Called once per compose pass, right after the module is instantiated.
    fn descriptor(&self) -> FeatureDescriptor;

    /// Which of `save`/`load` the kernel should call.
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Hand over owned state before this instance is retired.
    fn save(&self) -> Result<StateBlob> {
        Ok(StateBlob::empty())
    }

    /// Adopt state saved by the previous instance. The blob may be empty.
    fn load(&self, _state: StateBlob) -> Result<()> {
        Ok(())
    }

    /// Release exit-time resources. Called at most once per instance.
    fn exit(&self) {}
}
