use crate::error::{InvocationError, LifecycleError, SetupError};
use crate::runtime::{
    Runtimes,
    vm::{
        Arg, ControlInterface, MethodId, NATIVE_LIBRARY_CLASS, NATIVE_LIBRARY_RUBY_CLASS,
        VmOptions,
    },
};

use super::{BackendKind, BenchmarkCase, InvocationBackend, Library};

pub const DISTANCE_METHOD: &str = "distance";
pub const DISTANCE_DESCRIPTOR: &str = "(DDDD)D";

/// Calls a static `distance(DDDD)D` through the VM: the host-native
/// `bench/NativeLibrary` or the Ruby-backed `bench/NativeLibraryRuby`.
#[derive(Debug)]
pub struct VmDirectBackend {
    options: VmOptions,
    bound: Option<(ControlInterface, MethodId)>,
}

impl VmDirectBackend {
    pub fn new(options: VmOptions) -> Self {
        Self {
            options,
            bound: None,
        }
    }
}

impl InvocationBackend for VmDirectBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::VmDirect
    }

    fn set_up(&mut self, runtimes: &mut Runtimes, case: &BenchmarkCase) -> Result<(), SetupError> {
        let control = runtimes.ensure_vm(&self.options)?;
        let class = control.find_class(match case.library {
            Library::Host => NATIVE_LIBRARY_CLASS,
            Library::PrecompiledRuby => NATIVE_LIBRARY_RUBY_CLASS,
        })?;
        let method = control.get_static_method_id(class, DISTANCE_METHOD, DISTANCE_DESCRIPTOR)?;
        self.bound = Some((control, method));
        Ok(())
    }

    fn prepare(&mut self, _case: &BenchmarkCase) -> Result<(), InvocationError> {
        Ok(())
    }

    fn invoke(&mut self, case: &BenchmarkCase) -> Result<f64, InvocationError> {
        let (control, method) = self
            .bound
            .as_ref()
            .ok_or(LifecycleError::NotInitialized("VM"))?;
        let [a_lat, a_long, b_lat, b_long] = case.coordinates.to_array();
        control
            .call_static_method(
                *method,
                &[
                    Arg::Double(a_lat),
                    Arg::Double(a_long),
                    Arg::Double(b_lat),
                    Arg::Double(b_long),
                ],
            )?
            .into_double()
    }

    fn tear_down(&mut self) {
        self.bound = None;
    }
}
