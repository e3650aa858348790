//! Specialization notifications.

use jitrt_ir::{AttrDict, DenseElementsAttr, HostType};

/// Observer of one `specialize_function` call.
///
/// Both methods default to doing nothing. Calls are synchronous: every
/// `notify_value_specialized` (in argument order) comes before the single
/// `notify_module_specialized`. A call that fails never reaches
/// `notify_module_specialized`, but may already have reported sunk values.
pub trait SpecializationListener {
    /// Argument `index` was replaced by the constant `value` of type `ty`.
    fn notify_value_specialized(&mut self, index: usize, ty: &HostType, value: &DenseElementsAttr) {
        let _ = (index, ty, value);
    }

    /// Specialization finished with these input types and argument
    /// attributes.
    fn notify_module_specialized(&mut self, inputs: &[HostType], attrs: &[AttrDict]) {
        let _ = (inputs, attrs);
    }
}
