use log::{debug, warn};

use crate::error::{InvocationError, LifecycleError, SetupError};
use crate::guest::ContextConfig;
use crate::runtime::{
    Runtimes,
    vm::{ControlInterface, ObjectRef, VmOptions},
};
use crate::scripts::fragment_for;

use super::{BackendKind, BenchmarkCase, InvocationBackend};

/// Objects prepared for one case: the guest callable and its boxed
/// arguments, packed once into an argument array.
#[derive(Debug)]
struct PreparedCall {
    function: ObjectRef,
    args: ObjectRef,
    boxed: Vec<ObjectRef>,
}

impl PreparedCall {
    fn references(&self) -> Vec<ObjectRef> {
        let mut references = vec![self.function, self.args];
        references.extend(&self.boxed);
        references
    }
}

/// Evaluates the guest fragment through `polyglot/Context` and executes it
/// through `polyglot/Value`.
#[derive(Debug)]
pub struct VmGuestBackend {
    options: VmOptions,
    context_config: ContextConfig,
    control: Option<ControlInterface>,
    /// Built once per VM and kept across cases until `release`; a reference
    /// from a destroyed VM is rebuilt.
    context: Option<(ControlInterface, ObjectRef)>,
    prepared: Option<PreparedCall>,
}

impl VmGuestBackend {
    pub fn new(options: VmOptions, context_config: ContextConfig) -> Self {
        Self {
            options,
            context_config,
            control: None,
            context: None,
            prepared: None,
        }
    }

    fn control(&self) -> Result<&ControlInterface, LifecycleError> {
        self.control
            .as_ref()
            .ok_or(LifecycleError::NotInitialized("VM"))
    }

    fn release_prepared(&mut self) {
        if let (Some(prepared), Some(control)) = (self.prepared.take(), &self.control) {
            control.release(&prepared.references());
        }
    }
}

impl InvocationBackend for VmGuestBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::VmGuest
    }

    fn set_up(&mut self, runtimes: &mut Runtimes, _case: &BenchmarkCase) -> Result<(), SetupError> {
        let control = runtimes.ensure_vm(&self.options)?;
        let current = self
            .context
            .take()
            .filter(|(_, context)| context.vm_id() == control.vm_id() && control.is_alive());
        self.context = match current {
            Some(context) => Some(context),
            None => {
                let context = control.build_guest_context(&self.context_config)?;
                debug!("guest context built in VM {}", control.vm_id());
                Some((control.clone(), context))
            }
        };
        self.control = Some(control);
        Ok(())
    }

    fn prepare(&mut self, case: &BenchmarkCase) -> Result<(), InvocationError> {
        self.release_prepared();
        let control = self.control()?;
        let context = self
            .context
            .as_ref()
            .map(|(_, context)| *context)
            .ok_or(LifecycleError::NotInitialized("guest context"))?;

        let fragment = fragment_for(case.language);
        let function = control.eval(context, fragment.language, fragment.source)?;
        if !control.can_execute(function)? {
            control.release(&[function]);
            return Err(InvocationError::NotExecutable {
                language: case.language,
            });
        }

        let mut boxed = Vec::with_capacity(4);
        for value in case.coordinates.to_array() {
            boxed.push(control.box_double(value)?);
        }
        let args = control.new_object_array(&boxed)?;
        self.prepared = Some(PreparedCall {
            function,
            args,
            boxed,
        });
        Ok(())
    }

    fn invoke(&mut self, _case: &BenchmarkCase) -> Result<f64, InvocationError> {
        let control = self.control()?;
        let prepared = self
            .prepared
            .as_ref()
            .ok_or(LifecycleError::NotInitialized("guest callable"))?;
        let result = control.execute(prepared.function, prepared.args)?;
        let distance = control.as_double(result);
        control.delete_local_ref(result)?;
        distance
    }

    fn tear_down(&mut self) {
        self.release_prepared();
        self.control = None;
    }

    /// Closes the guest context through `polyglot/Context.close` and drops
    /// the reference to it.
    fn release(&mut self) {
        self.release_prepared();
        let Some((control, context)) = self.context.take() else {
            return;
        };
        if !control.is_alive() {
            return;
        }
        if let Err(err) = control.close_context(context) {
            warn!("closing guest context in VM {} failed: {}", control.vm_id(), err);
        }
        control.release(&[context]);
        debug!("guest context closed in VM {}", control.vm_id());
    }
}
