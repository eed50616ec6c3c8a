use crate::error::SetupError;

use super::classes::{
    CONTEXT_BUILDER_CLASS, CONTEXT_CLASS, ClassId, ClassRegistry, DOUBLE_CLASS, MethodId,
    VALUE_CLASS,
};

/// Method ids the control interface needs on every call, resolved by name
/// once when the VM is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTable {
    pub double_value_of: MethodId,
    pub double_value: MethodId,
    pub context_new_builder: MethodId,
    pub context_eval: MethodId,
    pub context_close: MethodId,
    pub builder_allow_experimental_options: MethodId,
    pub builder_option: MethodId,
    pub builder_build: MethodId,
    pub value_can_execute: MethodId,
    pub value_execute: MethodId,
    pub value_as_double: MethodId,
}

impl BindingTable {
    pub(crate) fn resolve(registry: &ClassRegistry) -> Result<Self, SetupError> {
        let double = class(registry, DOUBLE_CLASS)?;
        let context = class(registry, CONTEXT_CLASS)?;
        let builder = class(registry, CONTEXT_BUILDER_CLASS)?;
        let value = class(registry, VALUE_CLASS)?;

        Ok(Self {
            double_value_of: method(
                registry,
                double,
                "valueOf",
                "(D)Lhost/lang/Double;",
                true,
            )?,
            double_value: method(registry, double, "doubleValue", "()D", false)?,
            context_new_builder: method(
                registry,
                context,
                "newBuilder",
                "([Lhost/lang/String;)Lpolyglot/Context$Builder;",
                true,
            )?,
            context_eval: method(
                registry,
                context,
                "eval",
                "(Lhost/lang/String;Lhost/lang/String;)Lpolyglot/Value;",
                false,
            )?,
            context_close: method(registry, context, "close", "()V", false)?,
            builder_allow_experimental_options: method(
                registry,
                builder,
                "allowExperimentalOptions",
                "(Z)Lpolyglot/Context$Builder;",
                false,
            )?,
            builder_option: method(
                registry,
                builder,
                "option",
                "(Lhost/lang/String;Lhost/lang/String;)Lpolyglot/Context$Builder;",
                false,
            )?,
            builder_build: method(registry, builder, "build", "()Lpolyglot/Context;", false)?,
            value_can_execute: method(registry, value, "canExecute", "()Z", false)?,
            value_execute: method(
                registry,
                value,
                "execute",
                "([Lhost/lang/Object;)Lpolyglot/Value;",
                false,
            )?,
            value_as_double: method(registry, value, "asDouble", "()D", false)?,
        })
    }
}

pub(crate) fn class(registry: &ClassRegistry, name: &str) -> Result<ClassId, SetupError> {
    registry
        .find_class(name)
        .ok_or_else(|| SetupError::ClassNotFound(name.to_string()))
}

pub(crate) fn method(
    registry: &ClassRegistry,
    class: ClassId,
    name: &str,
    descriptor: &str,
    is_static: bool,
) -> Result<MethodId, SetupError> {
    registry
        .find_method(class, name, descriptor, is_static)
        .ok_or_else(|| SetupError::MethodNotFound {
            class: registry.class_name(class).unwrap_or("?").to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
}
