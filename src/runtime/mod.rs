//! Lifecycle of the two runtimes the backends run on.
//!
//! [`Runtimes`] owns at most one [`isolate::Isolate`] and one
//! [`vm::EmbeddedVm`]. Handles derived from them (isolate threads, control
//! interfaces) are cheap clones that fail with a [`LifecycleError`] once their
//! owner is released. Dropping `Runtimes` releases both.
//!
//! [`LifecycleError`]: crate::error::LifecycleError

use log::debug;

use crate::error::SetupError;
use crate::guest::ContextConfig;

pub mod entry_points;
pub mod isolate;
pub mod vm;

use isolate::{Isolate, IsolateThread};
use vm::{ControlInterface, EmbeddedVm, VmOptions};

/// Lifecycle counters, mostly for tests and `--verbose`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub isolates_created: usize,
    pub isolates_torn_down: usize,
    pub vms_created: usize,
    pub vms_destroyed: usize,
}

impl RuntimeStats {
    pub fn lifecycle_objects_created(&self) -> usize {
        self.isolates_created + self.vms_created
    }
}

#[derive(Default)]
pub struct Runtimes {
    context_config: ContextConfig,
    isolate: Option<Isolate>,
    vm: Option<EmbeddedVm>,
    stats: RuntimeStats,
}

impl Runtimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Isolates created by this value build their guest context from `config`.
    pub fn with_context_config(config: ContextConfig) -> Self {
        Self {
            context_config: config,
            isolate: None,
            vm: None,
            stats: RuntimeStats::default(),
        }
    }

    pub fn context_config(&self) -> &ContextConfig {
        &self.context_config
    }

    pub fn stats(&self) -> RuntimeStats {
        self.stats
    }

    pub fn create_isolate(&mut self) -> Result<IsolateThread, SetupError> {
        if self.isolate.is_some() {
            return Err(SetupError::IsolateAlreadyActive);
        }
        let isolate = Isolate::create(&self.context_config)?;
        let thread = isolate.thread();
        self.isolate = Some(isolate);
        self.stats.isolates_created += 1;
        Ok(thread)
    }

    /// The live isolate's thread, creating the isolate first if needed.
    pub fn ensure_isolate(&mut self) -> Result<IsolateThread, SetupError> {
        match &self.isolate {
            Some(isolate) => Ok(isolate.thread()),
            None => self.create_isolate(),
        }
    }

    pub fn isolate_thread(&self) -> Option<IsolateThread> {
        self.isolate.as_ref().map(Isolate::thread)
    }

    /// Tears the isolate down; a no-op when none is alive.
    pub fn destroy_isolate(&mut self) {
        if let Some(isolate) = self.isolate.take() {
            isolate.tear_down();
            self.stats.isolates_torn_down += 1;
        }
    }

    pub fn create_vm(&mut self, options: &VmOptions) -> Result<ControlInterface, SetupError> {
        if self.vm.is_some() {
            return Err(SetupError::VmAlreadyActive);
        }
        let vm = EmbeddedVm::create(options)?;
        let control = vm.control();
        self.vm = Some(vm);
        self.stats.vms_created += 1;
        Ok(control)
    }

    /// The live VM's control interface, creating the VM first if needed.
    /// Options only apply when a VM is created.
    pub fn ensure_vm(&mut self, options: &VmOptions) -> Result<ControlInterface, SetupError> {
        match &self.vm {
            Some(vm) => Ok(vm.control()),
            None => self.create_vm(options),
        }
    }

    pub fn control_interface(&self) -> Option<ControlInterface> {
        self.vm.as_ref().map(EmbeddedVm::control)
    }

    /// Destroys the VM; a no-op when none is alive.
    pub fn destroy_vm(&mut self) {
        if let Some(vm) = self.vm.take() {
            vm.destroy();
            self.stats.vms_destroyed += 1;
        }
    }

    pub fn destroy_all(&mut self) {
        self.destroy_isolate();
        self.destroy_vm();
    }
}

impl Drop for Runtimes {
    fn drop(&mut self) {
        if self.isolate.is_some() || self.vm.is_some() {
            debug!("releasing runtimes on drop");
        }
        self.destroy_all();
    }
}
