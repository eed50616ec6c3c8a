//! Embedded managed VM hosting the guest runtime.
//!
//! The host talks to the VM only through a [`ControlInterface`]: it finds
//! classes and methods by name, calls them with [`Arg`]s and receives
//! [`ObjectRef`]s to objects on the VM heap. Destroying the VM closes every
//! guest context built in it and turns all outstanding references stale.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use log::{debug, warn};
use serde::Deserialize;

use crate::error::{InvocationError, LifecycleError, SetupError};
use crate::guest::{ContextBuilder, ContextConfig, GuestContext, GuestValue};
use crate::scripts::{Language, fragment_for};

mod binding;
mod classes;
mod heap;

pub use binding::BindingTable;
pub use classes::{
    Arg, CONTEXT_BUILDER_CLASS, CONTEXT_CLASS, ClassId, DOUBLE_CLASS, MethodId,
    NATIVE_LIBRARY_CLASS, NATIVE_LIBRARY_RUBY_CLASS, Return, STRING_CLASS, VALUE_CLASS,
};
pub use heap::ObjectRef;

use classes::{ClassRegistry, Invocation};
use heap::{Heap, HeapObject};

pub const CLASS_PATH_PROPERTY: &str = "host.class.path";
/// Class path entry holding `bench/NativeLibrary` and `bench/NativeLibraryRuby`.
pub const LIBRARY_CLASS_PATH: &str = "/usr/lib/polycall";

static NEXT_VM_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VmOptions {
    pub options: Vec<String>,
    pub ignore_unrecognized: bool,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            options: vec![format!("-D{}={}", CLASS_PATH_PROPERTY, LIBRARY_CLASS_PATH)],
            ignore_unrecognized: false,
        }
    }
}

impl VmOptions {
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: options.into_iter().map(Into::into).collect(),
            ignore_unrecognized: false,
        }
    }

    pub fn ignore_unrecognized(mut self, ignore: bool) -> Self {
        self.ignore_unrecognized = ignore;
        self
    }
}

/// Options after parsing: `-D` system properties and `-X` flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmProperties {
    properties: HashMap<String, String>,
    flags: Vec<String>,
}

impl VmProperties {
    pub fn parse(options: &VmOptions) -> Result<Self, SetupError> {
        let mut parsed = Self::default();
        for option in &options.options {
            if let Some(property) = option.strip_prefix("-D") {
                let (key, value) = property.split_once('=').unwrap_or((property, ""));
                if !key.is_empty() {
                    parsed.properties.insert(key.to_string(), value.to_string());
                    continue;
                }
            } else if let Some(flag) = option.strip_prefix("-X") {
                if !flag.is_empty() {
                    parsed.flags.push(flag.to_string());
                    continue;
                }
            }

            if options.ignore_unrecognized {
                warn!("ignoring unrecognized VM option '{}'", option);
            } else {
                return Err(SetupError::UnrecognizedVmOption(option.clone()));
            }
        }
        Ok(parsed)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn class_path(&self) -> impl Iterator<Item = &str> {
        self.property(CLASS_PATH_PROPERTY)
            .unwrap_or("")
            .split(':')
            .filter(|entry| !entry.is_empty())
    }
}

pub(crate) struct VmShared {
    id: u64,
    alive: AtomicBool,
    properties: VmProperties,
    registry: ClassRegistry,
    heap: Mutex<Heap>,
    contexts: Mutex<Vec<GuestContext>>,
    /// Context and function behind `bench/NativeLibraryRuby`, set up by the
    /// first call into the class.
    library_ruby: Mutex<Option<(GuestContext, GuestValue)>>,
}

impl VmShared {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    fn check_alive(&self) -> Result<(), LifecycleError> {
        if self.alive.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(LifecycleError::VmDestroyed)
        }
    }

    fn heap(&self) -> MutexGuard<'_, Heap> {
        // Method bodies never leave the heap half-updated.
        self.heap.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records a newly built guest context; returns how many this VM built.
    pub(crate) fn register_context(&self, context: GuestContext) -> usize {
        let mut contexts = self.contexts.lock().unwrap_or_else(|e| e.into_inner());
        contexts.push(context);
        contexts.len()
    }

    /// The Ruby function of `bench/NativeLibraryRuby`, evaluated once per VM.
    pub(crate) fn library_ruby_distance(&self) -> Result<GuestValue, InvocationError> {
        let mut slot = self.library_ruby.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((_, function)) = slot.as_ref() {
            return Ok(function.clone());
        }
        let context = ContextBuilder::from_config(&ContextConfig::default())
            .build()
            .map_err(|err| InvocationError::VmCall(err.to_string()))?;
        let fragment = fragment_for(Language::Ruby);
        let function = context.eval(fragment.language, fragment.source)?;
        if !function.can_execute() {
            context.close();
            return Err(InvocationError::NotExecutable {
                language: Language::Ruby,
            });
        }
        debug!(
            "VM {} evaluated the {} fragment for {}",
            self.id,
            fragment.language,
            NATIVE_LIBRARY_RUBY_CLASS
        );
        *slot = Some((context, function.clone()));
        Ok(function)
    }
}

/// Owning handle of a live VM.
pub struct EmbeddedVm {
    shared: Arc<VmShared>,
    control: ControlInterface,
}

impl EmbeddedVm {
    pub(crate) fn create(options: &VmOptions) -> Result<Self, SetupError> {
        let properties = VmProperties::parse(options)?;
        let load_library = properties
            .class_path()
            .any(|entry| entry == LIBRARY_CLASS_PATH);
        let registry = ClassRegistry::new(load_library);
        let bindings = BindingTable::resolve(&registry)?;

        let id = NEXT_VM_ID.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(VmShared {
            id,
            alive: AtomicBool::new(true),
            properties,
            registry,
            heap: Mutex::new(Heap::new(id)),
            contexts: Mutex::new(Vec::new()),
            library_ruby: Mutex::new(None),
        });
        debug!(
            "VM {} created (flags {:?}, library classes {})",
            id,
            shared.properties.flags(),
            if load_library { "loaded" } else { "absent" }
        );
        let control = ControlInterface {
            vm: Arc::clone(&shared),
            bindings: Arc::new(bindings),
        };
        Ok(Self { shared, control })
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn control(&self) -> ControlInterface {
        self.control.clone()
    }

    pub(crate) fn destroy(self) {
        self.shared.alive.store(false, Ordering::Release);
        let contexts = std::mem::take(
            &mut *self
                .shared
                .contexts
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
        );
        for context in &contexts {
            context.close();
        }
        let library_ruby = self
            .shared
            .library_ruby
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some((context, _)) = library_ruby {
            context.close();
        }
        self.shared.heap().clear();
        debug!(
            "VM {} destroyed ({} guest contexts closed)",
            self.shared.id,
            contexts.len()
        );
    }
}

/// Host-side interface to one VM. Clones share the VM; every call fails with
/// [`LifecycleError::VmDestroyed`] once it is gone.
#[derive(Clone)]
pub struct ControlInterface {
    vm: Arc<VmShared>,
    bindings: Arc<BindingTable>,
}

impl std::fmt::Debug for ControlInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ControlInterface(vm {})", self.vm.id)
    }
}

impl ControlInterface {
    pub fn vm_id(&self) -> u64 {
        self.vm.id
    }

    pub fn is_alive(&self) -> bool {
        self.vm.alive.load(Ordering::Acquire)
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.vm.properties.property(key)
    }

    /// Number of guest contexts built in this VM.
    pub fn contexts_built(&self) -> usize {
        self.vm
            .contexts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Guest contexts built in this VM that are still open.
    pub fn contexts_open(&self) -> usize {
        self.vm
            .contexts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|context| context.is_open())
            .count()
    }

    /// Objects currently alive on the VM heap.
    pub fn live_objects(&self) -> usize {
        self.vm.heap().live_count()
    }

    pub fn find_class(&self, name: &str) -> Result<ClassId, SetupError> {
        self.vm.check_alive()?;
        binding::class(&self.vm.registry, name)
    }

    pub fn get_static_method_id(
        &self,
        class: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Result<MethodId, SetupError> {
        self.vm.check_alive()?;
        binding::method(&self.vm.registry, class, name, descriptor, true)
    }

    pub fn get_method_id(
        &self,
        class: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Result<MethodId, SetupError> {
        self.vm.check_alive()?;
        binding::method(&self.vm.registry, class, name, descriptor, false)
    }

    pub fn call_static_method(
        &self,
        method: MethodId,
        args: &[Arg],
    ) -> Result<Return, InvocationError> {
        if !method.is_static() {
            return Err(InvocationError::VmCall(
                "instance method called as static".into(),
            ));
        }
        self.dispatch(method, None, args)
    }

    pub fn call_method(
        &self,
        receiver: ObjectRef,
        method: MethodId,
        args: &[Arg],
    ) -> Result<Return, InvocationError> {
        if method.is_static() {
            return Err(InvocationError::VmCall(
                "static method called on an instance".into(),
            ));
        }
        self.dispatch(method, Some(receiver), args)
    }

    fn dispatch(
        &self,
        method: MethodId,
        receiver: Option<ObjectRef>,
        args: &[Arg],
    ) -> Result<Return, InvocationError> {
        self.vm.check_alive()?;
        let body = self.vm.registry.prepare_call(method, args)?;
        let mut heap = self.vm.heap();
        let mut invocation = Invocation {
            vm: &*self.vm,
            heap: &mut *heap,
            receiver,
            args,
        };
        body(&mut invocation)
    }

    pub fn new_string_utf(&self, value: &str) -> Result<ObjectRef, LifecycleError> {
        self.vm.check_alive()?;
        Ok(self.vm.heap().alloc(HeapObject::String(value.to_string())))
    }

    pub fn new_object_array(&self, elements: &[ObjectRef]) -> Result<ObjectRef, LifecycleError> {
        self.vm.check_alive()?;
        let mut heap = self.vm.heap();
        for element in elements {
            heap.get(*element)?;
        }
        Ok(heap.alloc(HeapObject::Array(elements.to_vec())))
    }

    pub fn delete_local_ref(&self, object: ObjectRef) -> Result<(), LifecycleError> {
        self.vm.check_alive()?;
        self.vm.heap().delete(object).map(|_| ())
    }

    /// Deletes references whose owner no longer needs them. References that
    /// already went stale are skipped.
    pub fn release(&self, objects: &[ObjectRef]) {
        for object in objects {
            if let Err(err) = self.delete_local_ref(*object) {
                debug!("skipping release of {:?}: {}", object, err);
            }
        }
    }

    pub fn box_double(&self, value: f64) -> Result<ObjectRef, InvocationError> {
        self.call_static_method(self.bindings.double_value_of, &[Arg::Double(value)])?
            .into_object()
    }

    pub fn unbox_double(&self, object: ObjectRef) -> Result<f64, InvocationError> {
        self.call_method(object, self.bindings.double_value, &[])?
            .into_double()
    }

    /// Builds a guest context through `Context.newBuilder(...).build()`.
    pub fn build_guest_context(&self, config: &ContextConfig) -> Result<ObjectRef, SetupError> {
        let mut temporaries = Vec::new();
        let result = self.build_guest_context_with(config, &mut temporaries);
        self.release(&temporaries);
        result.map_err(|err| match err {
            InvocationError::Lifecycle(lifecycle) => SetupError::Lifecycle(lifecycle),
            other => SetupError::ContextConstruction(other.to_string()),
        })
    }

    fn build_guest_context_with(
        &self,
        config: &ContextConfig,
        temporaries: &mut Vec<ObjectRef>,
    ) -> Result<ObjectRef, InvocationError> {
        let mut permitted = Vec::new();
        for language in Language::ALL {
            let tag = self.new_string_utf(language.id())?;
            temporaries.push(tag);
            permitted.push(tag);
        }
        let permitted = self.new_object_array(&permitted)?;
        temporaries.push(permitted);

        let builder = self
            .call_static_method(self.bindings.context_new_builder, &[Arg::Object(permitted)])?
            .into_object()?;
        temporaries.push(builder);
        self.call_method(
            builder,
            self.bindings.builder_allow_experimental_options,
            &[Arg::Boolean(config.allow_experimental_features)],
        )?;
        for (key, value) in config.options() {
            let key = self.new_string_utf(key)?;
            let value = self.new_string_utf(&value)?;
            temporaries.extend([key, value]);
            self.call_method(
                builder,
                self.bindings.builder_option,
                &[Arg::Object(key), Arg::Object(value)],
            )?;
        }
        self.call_method(builder, self.bindings.builder_build, &[])?
            .into_object()
    }

    /// `Context.eval(language, source)`, returning a reference to the value.
    pub fn eval(
        &self,
        context: ObjectRef,
        language: Language,
        source: &str,
    ) -> Result<ObjectRef, InvocationError> {
        let tag = self.new_string_utf(language.id())?;
        let code = self.new_string_utf(source)?;
        let result = self.call_method(
            context,
            self.bindings.context_eval,
            &[Arg::Object(tag), Arg::Object(code)],
        );
        self.release(&[tag, code]);
        result?.into_object()
    }

    pub fn close_context(&self, context: ObjectRef) -> Result<(), InvocationError> {
        self.call_method(context, self.bindings.context_close, &[])?;
        Ok(())
    }

    pub fn can_execute(&self, value: ObjectRef) -> Result<bool, InvocationError> {
        self.call_method(value, self.bindings.value_can_execute, &[])?
            .into_bool()
    }

    /// `Value.execute(args)` where `args` is an object array.
    pub fn execute(&self, value: ObjectRef, args: ObjectRef) -> Result<ObjectRef, InvocationError> {
        self.call_method(value, self.bindings.value_execute, &[Arg::Object(args)])?
            .into_object()
    }

    pub fn as_double(&self, value: ObjectRef) -> Result<f64, InvocationError> {
        self.call_method(value, self.bindings.value_as_double, &[])?
            .into_double()
    }
}
