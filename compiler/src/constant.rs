//! Constant assignment: checks that a lexical constant is assignable to a
//! target type and produces its linked form. Identifier constants resolve to
//! enum items when the target is an enum, and to named `const` definitions
//! otherwise; named constants must be declared before they are referenced.

use crate::ast::{ConstValue, ConstValueKind};
use crate::compiler::DeclKind;
use crate::error::CompileError;
use crate::loader::{Compiler, Filesystem};
use crate::spec::{
    ConstSpec, DefId, DefSpec, EnumSpec, ModuleId, Requiredness, StructKind, StructSpec, TypeSpec,
};

fn describe(kind: &ConstValueKind) -> &'static str {
    match kind {
        ConstValueKind::Bool(_) => "a bool literal",
        ConstValueKind::Int(_) => "an integer",
        ConstValueKind::Double(_) => "a double",
        ConstValueKind::String(_) => "a string",
        ConstValueKind::Identifier(_) => "an identifier",
        ConstValueKind::List(_) => "a list",
        ConstValueKind::Map(_) => "a map",
    }
}

fn mismatch(expected: &str, found: &ConstValueKind) -> CompileError {
    CompileError::UnassignableDefault(format!("expected {}, found {}", expected, describe(found)))
}

fn int_const(kind: &ConstValueKind, min: i64, max: i64, label: &str) -> Result<ConstSpec, CompileError> {
    match kind {
        ConstValueKind::Int(value) if *value >= min && *value <= max => Ok(ConstSpec::I64(*value)),
        ConstValueKind::Int(value) => Err(CompileError::UnassignableDefault(format!(
            "{} does not fit in {}",
            value, label
        ))),
        other => Err(mismatch(label, other)),
    }
}

impl<F: Filesystem> Compiler<F> {
    pub(crate) fn resolve_const(
        &self,
        module: ModuleId,
        ty: &TypeSpec,
        value: &ConstValue,
    ) -> Result<ConstSpec, CompileError> {
        let target = self.slot_unalias(ty);

        if let ConstValueKind::Identifier(name) = &value.kind {
            return self.resolve_identifier_const(module, target, name, value.line);
        }

        match target {
            TypeSpec::Bool => match &value.kind {
                ConstValueKind::Bool(v) => Ok(ConstSpec::Bool(*v)),
                other => Err(mismatch("bool", other)),
            },
            TypeSpec::I8 => int_const(&value.kind, i64::from(i8::MIN), i64::from(i8::MAX), "i8"),
            TypeSpec::I16 => int_const(&value.kind, i64::from(i16::MIN), i64::from(i16::MAX), "i16"),
            TypeSpec::I32 => int_const(&value.kind, i64::from(i32::MIN), i64::from(i32::MAX), "i32"),
            TypeSpec::I64 => int_const(&value.kind, i64::MIN, i64::MAX, "i64"),
            TypeSpec::Double => match &value.kind {
                ConstValueKind::Int(v) => Ok(ConstSpec::Double(*v as f64)),
                ConstValueKind::Double(v) => Ok(ConstSpec::Double(*v)),
                other => Err(mismatch("double", other)),
            },
            TypeSpec::String | TypeSpec::Binary => match &value.kind {
                ConstValueKind::String(v) => Ok(ConstSpec::Str(v.clone())),
                other => Err(mismatch("string", other)),
            },
            TypeSpec::List(elem) | TypeSpec::Set(elem) => match &value.kind {
                ConstValueKind::List(items) => items
                    .iter()
                    .map(|item| self.resolve_const(module, elem, item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(ConstSpec::List),
                other => Err(mismatch("a bracketed list", other)),
            },
            TypeSpec::Map(key_ty, value_ty) => match &value.kind {
                ConstValueKind::Map(entries) => entries
                    .iter()
                    .map(|(key, val)| {
                        Ok((
                            self.resolve_const(module, key_ty, key)?,
                            self.resolve_const(module, value_ty, val)?,
                        ))
                    })
                    .collect::<Result<Vec<_>, CompileError>>()
                    .map(ConstSpec::Map),
                other => Err(mismatch("a braced map", other)),
            },
            TypeSpec::Defined(id) => match &self.defs[id.0] {
                Some(DefSpec::Enum(spec)) => match &value.kind {
                    ConstValueKind::Int(v) => {
                        let item = i32::try_from(*v).ok().and_then(|v| spec.item_valued(v));
                        match item {
                            Some(item) => Ok(ConstSpec::EnumItem { def: *id, item }),
                            None => Err(CompileError::UnassignableDefault(format!(
                                "{} is not a value of enum {:?}",
                                v, spec.name
                            ))),
                        }
                    }
                    other => {
                        Err(mismatch(&format!("an item of enum {:?}", spec.name), other))
                    }
                },
                Some(DefSpec::Struct(spec)) => match &value.kind {
                    ConstValueKind::Map(entries) => {
                        self.resolve_struct_const(module, spec, entries)
                    }
                    other => Err(mismatch(&format!("a braced map for {:?}", spec.name), other)),
                },
                // Typedefs were stripped above; services and constants are
                // rejected in type position by the linker.
                _ => unreachable!(),
            },
        }
    }

    fn resolve_struct_const(
        &self,
        module: ModuleId,
        spec: &StructSpec,
        entries: &[(ConstValue, ConstValue)],
    ) -> Result<ConstSpec, CompileError> {
        let mut resolved: Vec<(String, ConstSpec)> = Vec::with_capacity(entries.len());

        for (key, val) in entries {
            let name = match &key.kind {
                ConstValueKind::String(name) => name.clone(),
                ConstValueKind::Identifier(name) => name.clone(),
                other => {
                    return Err(CompileError::UnassignableDefault(format!(
                        "keys of a {:?} constant must be field names, found {}",
                        spec.name,
                        describe(other)
                    )))
                }
            };

            let field = spec.fields.field_named(&name).ok_or_else(|| {
                CompileError::UnassignableDefault(format!(
                    "{:?} is not a field of {:?}",
                    name, spec.name
                ))
            })?;

            if resolved.iter().any(|(seen, _)| *seen == name) {
                return Err(CompileError::UnassignableDefault(format!(
                    "field {:?} is set twice",
                    name
                )));
            }

            let value = self.resolve_const(module, &field.ty, val)?;
            resolved.push((name, value));
        }

        if spec.kind == StructKind::Union {
            if resolved.len() != 1 {
                return Err(CompileError::UnassignableDefault(format!(
                    "a {:?} constant must set exactly one field, found {}",
                    spec.name,
                    resolved.len()
                )));
            }
        } else {
            for field in &spec.fields.fields {
                let present = resolved.iter().any(|(name, _)| *name == field.name);
                if field.required == Requiredness::Required && !present {
                    return Err(CompileError::UnassignableDefault(format!(
                        "required field {:?} of {:?} is missing",
                        field.name, spec.name
                    )));
                }
            }
        }

        Ok(ConstSpec::Struct(resolved))
    }

    fn resolve_identifier_const(
        &self,
        module: ModuleId,
        target: &TypeSpec,
        name: &str,
        line: usize,
    ) -> Result<ConstSpec, CompileError> {
        if let TypeSpec::Defined(id) = target {
            if let Some(DefSpec::Enum(spec)) = &self.defs[id.0] {
                if let Some(item) = self.resolve_enum_item(module, *id, spec, name, line) {
                    return Ok(ConstSpec::EnumItem { def: *id, item });
                }
            }
        }
        self.resolve_const_ref(module, target, name, line)
    }

    /// Accepts `Item`, `Enum.Item`, and `module.Enum.Item` spellings, all of
    /// which must land back on the target enum.
    fn resolve_enum_item(
        &self,
        module: ModuleId,
        def: DefId,
        spec: &EnumSpec,
        name: &str,
        line: usize,
    ) -> Option<usize> {
        let (prefix, item_name) = match name.rsplit_once('.') {
            Some((prefix, item_name)) => (Some(prefix), item_name),
            None => (None, name),
        };

        if let Some(prefix) = prefix {
            match self.resolve_name(module, prefix, line) {
                Ok(resolved) if resolved == def => {}
                _ => return None,
            }
        }

        spec.item_named(item_name)
    }

    fn resolve_const_ref(
        &self,
        module: ModuleId,
        target: &TypeSpec,
        name: &str,
        line: usize,
    ) -> Result<ConstSpec, CompileError> {
        let id = self.resolve_name(module, name, line)?;

        if self.decl_kinds[id.0] != DeclKind::Constant {
            return Err(CompileError::UnassignableDefault(format!(
                "{:?} does not name a constant",
                name
            )));
        }

        let spec = match &self.defs[id.0] {
            Some(DefSpec::Constant(spec)) => spec,
            // Constants resolve in declaration order.
            _ => {
                return Err(CompileError::UnassignableDefault(format!(
                    "constant {:?} is referenced before its definition",
                    name
                )))
            }
        };

        if self.slot_unalias(&spec.ty) != target {
            return Err(CompileError::UnassignableDefault(format!(
                "constant {:?} has a different type",
                name
            )));
        }

        Ok(ConstSpec::ConstRef(id))
    }
}
