//! The two-phase compiler. Phase 1 ("declare") interns every top-level name
//! of a module into the arena, computing enums entirely. Phase 2 ("link")
//! fills the per-id slots: typedefs first, then field groups, then constants
//! and default values, then services. Included modules are fully linked
//! before the including module enters phase 2, so cross-module references
//! always land on finished definitions.

use std::collections::HashSet;

use tracing::warn;

use crate::ast;
use crate::ast::{Requiredness, StructKind};
use crate::error::{cannot_compile, CompileError};
use crate::loader::{Compiler, Filesystem};
use crate::spec::{
    AnnotationSpec, DefId, DefSpec, EnumItemSpec, EnumSpec, FieldGroup, FieldSpec, FunctionSpec,
    ModuleId, ServiceSpec, StructSpec, TypeSpec, TypedefSpec,
};

/// What a name was declared as, known from phase 1 on. Lets the linker
/// classify references before the referent's slot is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclKind {
    Enum,
    Typedef,
    Struct,
    Union,
    Exception,
    Service,
    Constant,
}

impl DeclKind {
    fn is_type(self) -> bool {
        !matches!(self, DeclKind::Service | DeclKind::Constant)
    }

    fn breaks_reference_cycles(self) -> bool {
        matches!(
            self,
            DeclKind::Enum
                | DeclKind::Struct
                | DeclKind::Union
                | DeclKind::Exception
                | DeclKind::Service
        )
    }
}

fn decl_kind(definition: &ast::Definition) -> DeclKind {
    match definition {
        ast::Definition::Enum(_) => DeclKind::Enum,
        ast::Definition::Typedef(_) => DeclKind::Typedef,
        ast::Definition::Struct(decl) => match decl.kind {
            StructKind::Struct => DeclKind::Struct,
            StructKind::Union => DeclKind::Union,
            StructKind::Exception => DeclKind::Exception,
        },
        ast::Definition::Service(_) => DeclKind::Service,
        ast::Definition::Constant(_) => DeclKind::Constant,
    }
}

pub(crate) fn lower_annotations(annotations: &[ast::Annotation]) -> Vec<AnnotationSpec> {
    annotations
        .iter()
        .map(|annotation| AnnotationSpec {
            name:  annotation.name.clone(),
            value: annotation.value.clone(),
        })
        .collect()
}

impl<F: Filesystem> Compiler<F> {
    pub(crate) fn compile_module(
        &mut self,
        module: ModuleId,
        program: ast::Program,
    ) -> Result<(), CompileError> {
        // Phase 1: declare every top-level name, computing enums entirely.
        let mut pending: Vec<(DefId, ast::Definition)> = Vec::new();
        for definition in program.definitions {
            let name = definition.name().to_owned();
            if self.modules[module.0].symbols.contains_key(&name) {
                return Err(cannot_compile(&name, CompileError::Redefinition(name.clone())));
            }

            let id = DefId(self.defs.len());
            self.decl_kinds.push(decl_kind(&definition));
            match definition {
                ast::Definition::Enum(decl) => {
                    let spec = compile_enum(&decl)?;
                    self.defs.push(Some(DefSpec::Enum(spec)));
                }
                other => {
                    self.defs.push(None);
                    pending.push((id, other));
                }
            }

            let owner = &mut self.modules[module.0];
            owner.defs.push(id);
            owner.symbols.insert(name, id);
        }

        // Phase 2: link. Typedefs first so later phases can traverse them.
        for (id, definition) in &pending {
            if let ast::Definition::Typedef(decl) = definition {
                let target = self
                    .resolve_type(module, &decl.ty)
                    .map_err(|err| cannot_compile(&decl.name, err))?;
                self.defs[id.0] = Some(DefSpec::Typedef(TypedefSpec {
                    name:        decl.name.clone(),
                    target,
                    annotations: lower_annotations(&decl.annotations),
                }));
            }
        }
        for (id, definition) in &pending {
            if let ast::Definition::Typedef(decl) = definition {
                let mut path = HashSet::new();
                self.check_typedef_cycle(*id, &mut path)
                    .map_err(|err| cannot_compile(&decl.name, err))?;
            }
        }

        // Field groups of structs, unions, and exceptions.
        for (id, definition) in &pending {
            if let ast::Definition::Struct(decl) = definition {
                if decl.kind == StructKind::Union && decl.fields.len() < 2 {
                    return Err(cannot_compile(
                        &decl.name,
                        CompileError::UnionTooFewFields(decl.fields.len()),
                    ));
                }
                let fields = self.link_field_group(
                    module,
                    &decl.name,
                    &decl.fields,
                    decl.kind == StructKind::Union,
                )?;
                self.defs[id.0] = Some(DefSpec::Struct(StructSpec {
                    name:        decl.name.clone(),
                    kind:        decl.kind,
                    fields,
                    annotations: lower_annotations(&decl.annotations),
                }));
            }
        }

        // Constants in declaration order, then default values. Both run
        // after field groups so struct-typed constants can see their
        // target's fields.
        for (id, definition) in &pending {
            if let ast::Definition::Constant(decl) = definition {
                let ty = self
                    .resolve_type(module, &decl.ty)
                    .map_err(|err| cannot_compile(&decl.name, err))?;
                let value = self
                    .resolve_const(module, &ty, &decl.value)
                    .map_err(|err| cannot_compile(&decl.name, err))?;
                self.defs[id.0] = Some(DefSpec::Constant(crate::spec::ConstantSpec {
                    name:        decl.name.clone(),
                    ty,
                    value,
                    annotations: lower_annotations(&decl.annotations),
                }));
            }
        }
        for (id, definition) in &pending {
            if let ast::Definition::Struct(decl) = definition {
                self.resolve_group_defaults(module, &decl.name, &decl.fields, *id)?;
            }
        }

        // Services last: their parameter and exception groups may use any
        // type in the module.
        for (id, definition) in &pending {
            if let ast::Definition::Service(decl) = definition {
                let spec = self.link_service(module, decl)?;
                self.defs[id.0] = Some(DefSpec::Service(spec));
            }
        }
        for (id, definition) in &pending {
            if let ast::Definition::Service(decl) = definition {
                self.check_extends_cycle(*id)
                    .map_err(|err| cannot_compile(&decl.name, err))?;
            }
        }

        Ok(())
    }

    pub(crate) fn resolve_name(
        &self,
        module: ModuleId,
        name: &str,
        line: usize,
    ) -> Result<DefId, CompileError> {
        let owner = &self.modules[module.0];
        if let Some(id) = owner.symbols.get(name) {
            return Ok(*id);
        }
        if let Some((include, rest)) = name.split_once('.') {
            if let Some(target) = owner.includes.get(include) {
                if let Some(id) = self.modules[target.0].symbols.get(rest) {
                    return Ok(*id);
                }
            }
        }
        Err(CompileError::UnknownType { name: name.to_owned(), line })
    }

    pub(crate) fn resolve_type(
        &self,
        module: ModuleId,
        ty: &ast::TypeRef,
    ) -> Result<TypeSpec, CompileError> {
        Ok(match ty {
            ast::TypeRef::Base { base, .. } => match base {
                ast::BaseType::Bool => TypeSpec::Bool,
                ast::BaseType::I8 => TypeSpec::I8,
                ast::BaseType::I16 => TypeSpec::I16,
                ast::BaseType::I32 => TypeSpec::I32,
                ast::BaseType::I64 => TypeSpec::I64,
                ast::BaseType::Double => TypeSpec::Double,
                ast::BaseType::String => TypeSpec::String,
                ast::BaseType::Binary => TypeSpec::Binary,
            },
            ast::TypeRef::List { elem, .. } => {
                TypeSpec::List(Box::new(self.resolve_type(module, elem)?))
            }
            ast::TypeRef::Set { elem, .. } => {
                TypeSpec::Set(Box::new(self.resolve_type(module, elem)?))
            }
            ast::TypeRef::Map { key, value, .. } => TypeSpec::Map(
                Box::new(self.resolve_type(module, key)?),
                Box::new(self.resolve_type(module, value)?),
            ),
            ast::TypeRef::Named { name, line, .. } => {
                let id = self.resolve_name(module, name, *line)?;
                if !self.decl_kinds[id.0].is_type() {
                    return Err(CompileError::NotAType(name.clone()));
                }
                TypeSpec::Defined(id)
            }
        })
    }

    /// Strip typedef indirection using the partially filled arena. Every
    /// typedef slot is filled before the callers of this run.
    pub(crate) fn slot_unalias<'a>(&'a self, mut ty: &'a TypeSpec) -> &'a TypeSpec {
        while let TypeSpec::Defined(id) = ty {
            match &self.defs[id.0] {
                Some(DefSpec::Typedef(spec)) => ty = &spec.target,
                _ => break,
            }
        }
        ty
    }

    /// A typedef may not reach itself except through a definition that
    /// breaks reference cycles (an aggregate or enum).
    fn check_typedef_cycle(
        &self,
        id: DefId,
        path: &mut HashSet<usize>,
    ) -> Result<(), CompileError> {
        let spec = match &self.defs[id.0] {
            Some(DefSpec::Typedef(spec)) => spec,
            _ => return Ok(()),
        };
        if !path.insert(id.0) {
            return Err(CompileError::InvalidTypedef(spec.name.clone()));
        }
        self.check_type_cycle(&spec.target, path)?;
        path.remove(&id.0);
        Ok(())
    }

    fn check_type_cycle(
        &self,
        ty: &TypeSpec,
        path: &mut HashSet<usize>,
    ) -> Result<(), CompileError> {
        match ty {
            TypeSpec::List(elem) | TypeSpec::Set(elem) => self.check_type_cycle(elem, path),
            TypeSpec::Map(key, value) => {
                self.check_type_cycle(key, path)?;
                self.check_type_cycle(value, path)
            }
            TypeSpec::Defined(id) if !self.decl_kinds[id.0].breaks_reference_cycles() => {
                self.check_typedef_cycle(*id, path)
            }
            _ => Ok(()),
        }
    }

    /// Link one field group: resolve types, assign ids, enforce uniqueness.
    /// Defaults are resolved separately once every group in the module is
    /// linked.
    fn link_field_group(
        &self,
        module: ModuleId,
        owner: &str,
        fields: &[ast::Field],
        union: bool,
    ) -> Result<FieldGroup, CompileError> {
        let mut used_ids: Vec<i16> = Vec::new();
        let mut used_names: Vec<&str> = Vec::new();

        let explicit = fields.iter().filter(|field| field.id.is_some()).count();
        if explicit > 0 && explicit < fields.len() {
            warn!(
                owner,
                "mixing explicit and auto-assigned field ids; auto ids are negative and not \
                 wire-compatible with other Thrift implementations"
            );
        }

        // Explicit ids claim their slots before any auto assignment.
        for field in fields {
            let symbol = || format!("{}.{}", owner, field.name);
            if let Some(id) = field.id {
                if id < i16::MIN as i64 || id > i16::MAX as i64 {
                    return Err(cannot_compile(symbol(), CompileError::FieldIdOutOfRange(id)));
                }
                let id = id as i16;
                if used_ids.contains(&id) {
                    return Err(cannot_compile(symbol(), CompileError::DuplicateFieldId(id)));
                }
                used_ids.push(id);
            }
            if used_names.contains(&field.name.as_str()) {
                return Err(cannot_compile(
                    symbol(),
                    CompileError::DuplicateFieldName(field.name.clone()),
                ));
            }
            used_names.push(&field.name);
        }

        let mut next_auto: i16 = -1;
        let mut specs = Vec::with_capacity(fields.len());
        for field in fields {
            let id = match field.id {
                Some(id) => id as i16,
                None => {
                    while used_ids.contains(&next_auto) {
                        next_auto -= 1;
                    }
                    let id = next_auto;
                    used_ids.push(id);
                    id
                }
            };

            let required = if union {
                if field.requiredness == Requiredness::Required {
                    return Err(cannot_compile(
                        format!("{}.{}", owner, field.name),
                        CompileError::UnionRequiredField(field.name.clone()),
                    ));
                }
                Requiredness::Optional
            } else {
                field.requiredness
            };

            let ty = self
                .resolve_type(module, &field.ty)
                .map_err(|err| cannot_compile(format!("{}.{}", owner, field.name), err))?;

            specs.push(FieldSpec {
                id,
                required,
                name: field.name.clone(),
                ty,
                default: None,
                annotations: lower_annotations(&field.annotations),
            });
        }

        Ok(FieldGroup { fields: specs })
    }

    /// Resolve the default constants of a linked struct in place.
    fn resolve_group_defaults(
        &mut self,
        module: ModuleId,
        owner: &str,
        fields: &[ast::Field],
        id: DefId,
    ) -> Result<(), CompileError> {
        for (index, field) in fields.iter().enumerate() {
            let default = match &field.default {
                Some(default) => default,
                None => continue,
            };
            let ty = match &self.defs[id.0] {
                Some(DefSpec::Struct(spec)) => spec.fields.fields[index].ty.clone(),
                _ => unreachable!(),
            };
            let resolved = self
                .resolve_const(module, &ty, default)
                .map_err(|err| cannot_compile(format!("{}.{}", owner, field.name), err))?;
            if let Some(DefSpec::Struct(spec)) = &mut self.defs[id.0] {
                spec.fields.fields[index].default = Some(resolved);
            }
        }
        Ok(())
    }

    fn link_service(
        &mut self,
        module: ModuleId,
        decl: &ast::Service,
    ) -> Result<ServiceSpec, CompileError> {
        let extends = match &decl.extends {
            Some(parent) => {
                let id = self
                    .resolve_name(module, parent, decl.line)
                    .map_err(|err| cannot_compile(&decl.name, err))?;
                if self.decl_kinds[id.0] != DeclKind::Service {
                    return Err(cannot_compile(
                        &decl.name,
                        CompileError::NotAService(parent.clone()),
                    ));
                }
                Some(id)
            }
            None => None,
        };

        let mut functions = Vec::with_capacity(decl.functions.len());
        for function in &decl.functions {
            let symbol = format!("{}.{}", decl.name, function.name);

            if function.oneway && function.return_type.is_some() {
                return Err(cannot_compile(
                    &symbol,
                    CompileError::OnewayNotVoid(function.name.clone()),
                ));
            }

            let return_type = match &function.return_type {
                Some(ty) => Some(
                    self.resolve_type(module, ty)
                        .map_err(|err| cannot_compile(&symbol, err))?,
                ),
                None => None,
            };

            let mut params = self.link_field_group(module, &symbol, &function.params, false)?;
            self.resolve_field_defaults(module, &symbol, &function.params, &mut params)?;

            let exceptions = self.link_field_group(module, &symbol, &function.throws, false)?;
            for field in &exceptions.fields {
                let is_exception = matches!(
                    self.slot_unalias(&field.ty),
                    TypeSpec::Defined(target)
                        if self.decl_kinds[target.0] == DeclKind::Exception
                );
                if !is_exception {
                    return Err(cannot_compile(
                        &symbol,
                        CompileError::ThrowsNotException(field.name.clone()),
                    ));
                }
            }

            functions.push(FunctionSpec {
                name: function.name.clone(),
                oneway: function.oneway,
                return_type,
                params,
                exceptions,
                annotations: lower_annotations(&function.annotations),
            });
        }

        Ok(ServiceSpec {
            name:        decl.name.clone(),
            extends,
            functions,
            annotations: lower_annotations(&decl.annotations),
        })
    }

    /// Resolve parameter defaults for a freshly linked function group.
    fn resolve_field_defaults(
        &self,
        module: ModuleId,
        owner: &str,
        fields: &[ast::Field],
        group: &mut FieldGroup,
    ) -> Result<(), CompileError> {
        for (index, field) in fields.iter().enumerate() {
            if let Some(default) = &field.default {
                let resolved = self
                    .resolve_const(module, &group.fields[index].ty, default)
                    .map_err(|err| cannot_compile(format!("{}.{}", owner, field.name), err))?;
                group.fields[index].default = Some(resolved);
            }
        }
        Ok(())
    }

    /// Services form a single-inheritance chain; the chain must be acyclic.
    fn check_extends_cycle(&self, id: DefId) -> Result<(), CompileError> {
        let mut visited = HashSet::new();
        let mut current = id;
        loop {
            if !visited.insert(current.0) {
                let name = match &self.defs[current.0] {
                    Some(spec) => spec.name().to_owned(),
                    None => String::new(),
                };
                return Err(CompileError::CycleInExtends(name));
            }
            let parent = match &self.defs[current.0] {
                Some(DefSpec::Service(spec)) => spec.extends,
                _ => None,
            };
            match parent {
                Some(next) => current = next,
                None => return Ok(()),
            }
        }
    }
}

/// Compile an enum entirely: consecutive items without an explicit value
/// take the previous value plus one, and the first item defaults to zero.
fn compile_enum(decl: &ast::Enum) -> Result<EnumSpec, CompileError> {
    let mut items: Vec<EnumItemSpec> = Vec::with_capacity(decl.items.len());
    let mut next: i64 = 0;

    for item in &decl.items {
        let symbol = || format!("{}.{}", decl.name, item.name);

        if items.iter().any(|existing| existing.name == item.name) {
            return Err(cannot_compile(
                symbol(),
                CompileError::DuplicateEnumItem(item.name.clone()),
            ));
        }

        let value = item.value.unwrap_or(next);
        if value < i64::from(i32::MIN) || value > i64::from(i32::MAX) {
            return Err(cannot_compile(symbol(), CompileError::EnumValueOutOfRange(value)));
        }
        next = value + 1;

        items.push(EnumItemSpec {
            name:        item.name.clone(),
            value:       value as i32,
            annotations: lower_annotations(&item.annotations),
        });
    }

    Ok(EnumSpec {
        name:        decl.name.clone(),
        items,
        annotations: lower_annotations(&decl.annotations),
    })
}
