//! Reflective class registry of the embedded VM.
//!
//! Classes are looked up by name and methods by `(name, descriptor)`, with
//! descriptors in the usual `(DDDD)D` form. Each method is a host function
//! operating on the VM heap.

use log::warn;

use crate::error::InvocationError;
use crate::geo::haversine_distance;
use crate::guest::{ContextBuilder, GuestValue};
use crate::scripts::Language;

use super::VmShared;
use super::heap::{Heap, HeapObject, ObjectRef};

pub const DOUBLE_CLASS: &str = "host/lang/Double";
pub const STRING_CLASS: &str = "host/lang/String";
pub const CONTEXT_CLASS: &str = "polyglot/Context";
pub const CONTEXT_BUILDER_CLASS: &str = "polyglot/Context$Builder";
pub const VALUE_CLASS: &str = "polyglot/Value";
pub const NATIVE_LIBRARY_CLASS: &str = "bench/NativeLibrary";
pub const NATIVE_LIBRARY_RUBY_CLASS: &str = "bench/NativeLibraryRuby";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId {
    class: ClassId,
    index: u32,
    is_static: bool,
}

impl MethodId {
    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg {
    Boolean(bool),
    Double(f64),
    Object(ObjectRef),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Return {
    Void,
    Boolean(bool),
    Double(f64),
    Object(ObjectRef),
}

impl Return {
    pub fn into_double(self) -> Result<f64, InvocationError> {
        match self {
            Return::Double(value) => Ok(value),
            other => Err(mismatch("a double", other)),
        }
    }

    pub fn into_bool(self) -> Result<bool, InvocationError> {
        match self {
            Return::Boolean(value) => Ok(value),
            other => Err(mismatch("a boolean", other)),
        }
    }

    pub fn into_object(self) -> Result<ObjectRef, InvocationError> {
        match self {
            Return::Object(object) => Ok(object),
            other => Err(mismatch("an object", other)),
        }
    }
}

fn mismatch(expected: &str, got: Return) -> InvocationError {
    InvocationError::VmCall(format!("expected {} return, got {:?}", expected, got))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamKind {
    Boolean,
    Double,
    Object,
}

/// Parameter kinds of a method descriptor; `None` if it is malformed.
pub(crate) fn parameter_kinds(descriptor: &str) -> Option<Vec<ParamKind>> {
    let params = descriptor.strip_prefix('(')?.split(')').next()?;
    let mut kinds = Vec::new();
    let mut chars = params.chars();
    while let Some(c) = chars.next() {
        let kind = match c {
            'Z' => ParamKind::Boolean,
            'D' => ParamKind::Double,
            '[' => {
                // Arrays of references are the only arrays the VM hands out.
                match chars.next()? {
                    'L' => {
                        chars.by_ref().find(|&c| c == ';')?;
                    }
                    _ => return None,
                }
                ParamKind::Object
            }
            'L' => {
                chars.by_ref().find(|&c| c == ';')?;
                ParamKind::Object
            }
            _ => return None,
        };
        kinds.push(kind);
    }
    Some(kinds)
}

/// State handed to a method body.
pub(crate) struct Invocation<'a> {
    pub(crate) vm: &'a VmShared,
    pub(crate) heap: &'a mut Heap,
    pub(crate) receiver: Option<ObjectRef>,
    pub(crate) args: &'a [Arg],
}

impl Invocation<'_> {
    fn double(&self, index: usize) -> Result<f64, InvocationError> {
        match self.args.get(index) {
            Some(Arg::Double(value)) => Ok(*value),
            other => Err(bad_argument(index, other)),
        }
    }

    fn boolean(&self, index: usize) -> Result<bool, InvocationError> {
        match self.args.get(index) {
            Some(Arg::Boolean(value)) => Ok(*value),
            other => Err(bad_argument(index, other)),
        }
    }

    fn object(&self, index: usize) -> Result<ObjectRef, InvocationError> {
        match self.args.get(index) {
            Some(Arg::Object(object)) => Ok(*object),
            other => Err(bad_argument(index, other)),
        }
    }

    fn string(&self, index: usize) -> Result<String, InvocationError> {
        match self.heap.get(self.object(index)?)? {
            HeapObject::String(value) => Ok(value.clone()),
            other => Err(wrong_class(STRING_CLASS, other)),
        }
    }

    fn receiver(&self) -> Result<ObjectRef, InvocationError> {
        self.receiver
            .ok_or_else(|| InvocationError::VmCall("instance method called without a receiver".into()))
    }

    fn receiver_object(&self) -> Result<&HeapObject, InvocationError> {
        Ok(self.heap.get(self.receiver()?)?)
    }

    fn receiver_value(&self) -> Result<&GuestValue, InvocationError> {
        match self.receiver_object()? {
            HeapObject::Value(value) => Ok(value),
            other => Err(wrong_class(VALUE_CLASS, other)),
        }
    }

    /// Replaces the receiving builder with `update(builder)`.
    fn update_builder(
        &mut self,
        update: impl FnOnce(ContextBuilder) -> ContextBuilder,
    ) -> Result<Return, InvocationError> {
        let receiver = self.receiver()?;
        match self.heap.get_mut(receiver)? {
            HeapObject::ContextBuilder(builder) => {
                *builder = update(builder.clone());
                Ok(Return::Object(receiver))
            }
            other => Err(wrong_class(CONTEXT_BUILDER_CLASS, other)),
        }
    }
}

fn bad_argument(index: usize, got: Option<&Arg>) -> InvocationError {
    InvocationError::VmCall(format!("argument {} has the wrong kind: {:?}", index, got))
}

fn wrong_class(expected: &str, got: &HeapObject) -> InvocationError {
    InvocationError::VmCall(format!(
        "expected an instance of {}, got {}",
        expected,
        got.class_name()
    ))
}

type MethodBody = fn(&mut Invocation<'_>) -> Result<Return, InvocationError>;

pub(crate) struct MethodDef {
    name: &'static str,
    descriptor: &'static str,
    is_static: bool,
    body: MethodBody,
}

pub(crate) struct ClassDef {
    name: &'static str,
    methods: &'static [MethodDef],
}

macro_rules! method {
    (static $name:literal, $descriptor:literal, $body:expr) => {
        MethodDef {
            name: $name,
            descriptor: $descriptor,
            is_static: true,
            body: $body,
        }
    };
    ($name:literal, $descriptor:literal, $body:expr) => {
        MethodDef {
            name: $name,
            descriptor: $descriptor,
            is_static: false,
            body: $body,
        }
    };
}

const BOOTSTRAP_CLASSES: &[ClassDef] = &[
    ClassDef {
        name: DOUBLE_CLASS,
        methods: &[
            method!(static "valueOf", "(D)Lhost/lang/Double;", double_value_of),
            method!("doubleValue", "()D", double_double_value),
        ],
    },
    ClassDef {
        name: STRING_CLASS,
        methods: &[],
    },
    ClassDef {
        name: CONTEXT_CLASS,
        methods: &[
            method!(
                static "newBuilder",
                "([Lhost/lang/String;)Lpolyglot/Context$Builder;",
                context_new_builder
            ),
            method!(
                "eval",
                "(Lhost/lang/String;Lhost/lang/String;)Lpolyglot/Value;",
                context_eval
            ),
            method!("close", "()V", context_close),
        ],
    },
    ClassDef {
        name: CONTEXT_BUILDER_CLASS,
        methods: &[
            method!(
                "allowExperimentalOptions",
                "(Z)Lpolyglot/Context$Builder;",
                builder_allow_experimental_options
            ),
            method!(
                "option",
                "(Lhost/lang/String;Lhost/lang/String;)Lpolyglot/Context$Builder;",
                builder_option
            ),
            method!("build", "()Lpolyglot/Context;", builder_build),
        ],
    },
    ClassDef {
        name: VALUE_CLASS,
        methods: &[
            method!("canExecute", "()Z", value_can_execute),
            method!(
                "execute",
                "([Lhost/lang/Object;)Lpolyglot/Value;",
                value_execute
            ),
            method!("asDouble", "()D", value_as_double),
        ],
    },
];

const LIBRARY_CLASSES: &[ClassDef] = &[
    ClassDef {
        name: NATIVE_LIBRARY_CLASS,
        methods: &[method!(static "distance", "(DDDD)D", native_library_distance)],
    },
    ClassDef {
        name: NATIVE_LIBRARY_RUBY_CLASS,
        methods: &[method!(static "distance", "(DDDD)D", native_library_ruby_distance)],
    },
];

struct ClassEntry {
    def: &'static ClassDef,
    parameters: Vec<Vec<ParamKind>>,
}

/// Classes loaded into one VM.
pub(crate) struct ClassRegistry {
    classes: Vec<ClassEntry>,
}

impl ClassRegistry {
    pub(crate) fn new(load_library: bool) -> Self {
        let libraries: &'static [ClassDef] = if load_library { LIBRARY_CLASSES } else { &[] };
        let classes = BOOTSTRAP_CLASSES
            .iter()
            .chain(libraries)
            .map(|def| ClassEntry {
                def,
                parameters: def
                    .methods
                    .iter()
                    .map(|method| parameter_kinds(method.descriptor).unwrap_or_default())
                    .collect(),
            })
            .collect();
        Self { classes }
    }

    pub(crate) fn find_class(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|entry| entry.def.name == name)
            .map(|index| ClassId(index as u32))
    }

    pub(crate) fn class_name(&self, class: ClassId) -> Option<&'static str> {
        self.classes.get(class.0 as usize).map(|entry| entry.def.name)
    }

    pub(crate) fn find_method(
        &self,
        class: ClassId,
        name: &str,
        descriptor: &str,
        is_static: bool,
    ) -> Option<MethodId> {
        let entry = self.classes.get(class.0 as usize)?;
        entry
            .def
            .methods
            .iter()
            .position(|method| {
                method.name == name
                    && method.descriptor == descriptor
                    && method.is_static == is_static
            })
            .map(|index| MethodId {
                class,
                index: index as u32,
                is_static,
            })
    }

    /// The method body, after checking `args` against its descriptor.
    pub(crate) fn prepare_call(
        &self,
        method: MethodId,
        args: &[Arg],
    ) -> Result<MethodBody, InvocationError> {
        let entry = self
            .classes
            .get(method.class.0 as usize)
            .ok_or_else(|| InvocationError::VmCall("method id does not belong to this VM".into()))?;
        let def = entry
            .def
            .methods
            .get(method.index as usize)
            .ok_or_else(|| InvocationError::VmCall("method id does not belong to this VM".into()))?;
        let expected = &entry.parameters[method.index as usize];
        let matches = expected.len() == args.len()
            && expected.iter().zip(args).all(|(kind, arg)| {
                matches!(
                    (kind, arg),
                    (ParamKind::Boolean, Arg::Boolean(_))
                        | (ParamKind::Double, Arg::Double(_))
                        | (ParamKind::Object, Arg::Object(_))
                )
            });
        if !matches {
            return Err(InvocationError::VmCall(format!(
                "arguments {:?} do not match {}.{}{}",
                args, entry.def.name, def.name, def.descriptor
            )));
        }
        Ok(def.body)
    }
}

fn double_value_of(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    let value = call.double(0)?;
    Ok(Return::Object(call.heap.alloc(HeapObject::Double(value))))
}

fn double_double_value(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    match call.receiver_object()? {
        HeapObject::Double(value) => Ok(Return::Double(*value)),
        other => Err(wrong_class(DOUBLE_CLASS, other)),
    }
}

fn context_new_builder(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    match call.heap.get(call.object(0)?)? {
        HeapObject::Array(languages) => {
            for language in languages {
                if !matches!(call.heap.get(*language)?, HeapObject::String(_)) {
                    return Err(InvocationError::VmCall(
                        "permitted languages must be strings".into(),
                    ));
                }
            }
        }
        other => return Err(wrong_class("[Lhost/lang/String;", other)),
    }
    let builder = call.heap.alloc(HeapObject::ContextBuilder(ContextBuilder::new()));
    Ok(Return::Object(builder))
}

fn builder_allow_experimental_options(
    call: &mut Invocation<'_>,
) -> Result<Return, InvocationError> {
    let allow = call.boolean(0)?;
    call.update_builder(|builder| builder.allow_experimental_options(allow))
}

fn builder_option(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    let key = call.string(0)?;
    let value = call.string(1)?;
    call.update_builder(|builder| builder.option(key, value))
}

fn builder_build(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    let builder = match call.receiver_object()? {
        HeapObject::ContextBuilder(builder) => builder.clone(),
        other => return Err(wrong_class(CONTEXT_BUILDER_CLASS, other)),
    };
    let context = builder
        .build()
        .map_err(|err| InvocationError::VmCall(err.to_string()))?;
    let built = call.vm.register_context(context.clone());
    if built > 1 {
        warn!(
            "guest context built {} times in VM {}; build it once per VM lifetime",
            built,
            call.vm.id()
        );
    }
    Ok(Return::Object(call.heap.alloc(HeapObject::Context(context))))
}

fn context_eval(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    let tag = call.string(0)?;
    let source = call.string(1)?;
    let context = match call.receiver_object()? {
        HeapObject::Context(context) => context.clone(),
        other => return Err(wrong_class(CONTEXT_CLASS, other)),
    };
    let language =
        Language::from_tag(&tag).map_err(|err| InvocationError::VmCall(err.to_string()))?;
    let value = context.eval(language, &source)?;
    Ok(Return::Object(call.heap.alloc(HeapObject::Value(value))))
}

fn context_close(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    match call.receiver_object()? {
        HeapObject::Context(context) => {
            context.close();
            Ok(Return::Void)
        }
        other => Err(wrong_class(CONTEXT_CLASS, other)),
    }
}

fn value_can_execute(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    Ok(Return::Boolean(call.receiver_value()?.can_execute()))
}

fn value_execute(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    let elements = match call.heap.get(call.object(0)?)? {
        HeapObject::Array(elements) => elements.clone(),
        other => return Err(wrong_class("[Lhost/lang/Object;", other)),
    };
    let mut args = Vec::with_capacity(elements.len());
    for element in elements {
        let arg = match call.heap.get(element)? {
            HeapObject::Double(value) => GuestValue::Float(*value),
            HeapObject::String(value) => GuestValue::String(value.as_str().into()),
            HeapObject::Value(value) => value.clone(),
            other => {
                return Err(InvocationError::VmCall(format!(
                    "{} cannot be passed to a guest function",
                    other.class_name()
                )));
            }
        };
        args.push(arg);
    }
    let result = call.receiver_value()?.execute(&args)?;
    Ok(Return::Object(call.heap.alloc(HeapObject::Value(result))))
}

fn value_as_double(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    Ok(Return::Double(call.receiver_value()?.as_double()?))
}

fn native_library_distance(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    Ok(Return::Double(haversine_distance(
        call.double(0)?,
        call.double(1)?,
        call.double(2)?,
        call.double(3)?,
    )))
}

fn native_library_ruby_distance(call: &mut Invocation<'_>) -> Result<Return, InvocationError> {
    let args = [
        call.double(0)?,
        call.double(1)?,
        call.double(2)?,
        call.double(3)?,
    ]
    .map(GuestValue::Float);
    let function = call.vm.library_ruby_distance()?;
    Ok(Return::Double(function.execute(&args)?.as_double()?))
}

#[cfg(test)]
#[path = "classes_test.rs"]
mod classes_test;
