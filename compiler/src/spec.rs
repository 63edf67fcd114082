//! The linked form of a compiled module set. The compile session owns a flat
//! arena of definitions; every cross-reference is a [`DefId`] index into that
//! arena, never a pointer, so reference cycles through aggregates cannot
//! create ownership cycles. After compilation the graph is immutable.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use spindrift_wire::TypeCode;

pub use crate::ast::{Requiredness, StructKind};

/// Index of a module within a [`Compilation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModuleId(pub usize);

/// Index of a top-level definition within a [`Compilation`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DefId(pub usize);

/// The result of compiling a root file and everything it includes.
#[derive(Debug, Clone, Serialize)]
pub struct Compilation {
    pub modules: Vec<ModuleSpec>,
    pub defs:    Vec<DefSpec>,
    pub root:    ModuleId,
}

/// One compiled module: its own top-level definitions plus a table of
/// included modules indexed by short name.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSpec {
    pub name:         String,
    pub path:         PathBuf,
    pub includes:     HashMap<String, ModuleId>,
    pub namespaces:   Vec<(String, String)>,
    pub cpp_includes: Vec<String>,
    pub defs:         Vec<DefId>,
    pub symbols:      HashMap<String, DefId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DefSpec {
    Enum(EnumSpec),
    Typedef(TypedefSpec),
    Struct(StructSpec),
    Service(ServiceSpec),
    Constant(ConstantSpec),
}

impl DefSpec {
    pub fn name(&self) -> &str {
        match self {
            DefSpec::Enum(spec) => &spec.name,
            DefSpec::Typedef(spec) => &spec.name,
            DefSpec::Struct(spec) => &spec.name,
            DefSpec::Service(spec) => &spec.name,
            DefSpec::Constant(spec) => &spec.name,
        }
    }
}

/// One `key` or `key = "value"` annotation carried over from the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationSpec {
    pub name:  String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumSpec {
    pub name:        String,
    pub items:       Vec<EnumItemSpec>,
    pub annotations: Vec<AnnotationSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumItemSpec {
    pub name:        String,
    pub value:       i32,
    pub annotations: Vec<AnnotationSpec>,
}

impl EnumSpec {
    /// Look up an item by declared name.
    pub fn item_named(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|item| item.name == name)
    }

    /// Look up the first item carrying the given value.
    pub fn item_valued(&self, value: i32) -> Option<usize> {
        self.items.iter().position(|item| item.value == value)
    }
}

/// A transparent alias: distinct for naming, traversed when producing a
/// wire type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedefSpec {
    pub name:        String,
    pub target:      TypeSpec,
    pub annotations: Vec<AnnotationSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructSpec {
    pub name:        String,
    pub kind:        StructKind,
    pub fields:      FieldGroup,
    pub annotations: Vec<AnnotationSpec>,
}

/// An ordered collection of fields attached to a struct, union, exception,
/// or a function's parameter or exception list. Field ids and names are
/// unique within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldGroup {
    pub fields: Vec<FieldSpec>,
}

impl FieldGroup {
    pub fn field(&self, id: i16) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn field_named(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub id:          i16,
    pub required:    Requiredness,
    pub name:        String,
    pub ty:          TypeSpec,
    pub default:     Option<ConstSpec>,
    pub annotations: Vec<AnnotationSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSpec {
    pub name:        String,
    pub extends:     Option<DefId>,
    pub functions:   Vec<FunctionSpec>,
    pub annotations: Vec<AnnotationSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSpec {
    pub name:        String,
    pub oneway:      bool,
    /// `None` is a `void` return.
    pub return_type: Option<TypeSpec>,
    pub params:      FieldGroup,
    pub exceptions:  FieldGroup,
    pub annotations: Vec<AnnotationSpec>,
}

impl FunctionSpec {
    /// The implicit result union transported for a call: field 0 carries the
    /// successful return (absent for `void`), followed by the declared
    /// exceptions.
    pub fn result_fields(&self) -> FieldGroup {
        let mut fields = Vec::new();
        if let Some(return_type) = &self.return_type {
            fields.push(FieldSpec {
                id:          0,
                required:    Requiredness::Optional,
                name:        "success".to_owned(),
                ty:          return_type.clone(),
                default:     None,
                annotations: Vec::new(),
            });
        }
        fields.extend(self.exceptions.fields.iter().cloned());
        FieldGroup { fields }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantSpec {
    pub name:        String,
    pub ty:          TypeSpec,
    pub value:       ConstSpec,
    pub annotations: Vec<AnnotationSpec>,
}

/// A fully linked type: base types, parametric containers, or a reference
/// into the definition arena.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeSpec {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    List(Box<TypeSpec>),
    Set(Box<TypeSpec>),
    Map(Box<TypeSpec>, Box<TypeSpec>),
    Defined(DefId),
}

/// A resolved constant value, produced by constant assignment against a
/// target type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstSpec {
    Bool(bool),
    I64(i64),
    Double(f64),
    Str(String),
    /// A reference to one item of an enum definition.
    EnumItem { def: DefId, item: usize },
    /// A reference to a named `const` definition.
    ConstRef(DefId),
    List(Vec<ConstSpec>),
    Map(Vec<(ConstSpec, ConstSpec)>),
    /// Field-name keyed entries for a struct, union, or exception constant.
    Struct(Vec<(String, ConstSpec)>),
}

impl Compilation {
    pub fn root_module(&self) -> &ModuleSpec {
        &self.modules[self.root.0]
    }

    pub fn module(&self, id: ModuleId) -> &ModuleSpec {
        &self.modules[id.0]
    }

    pub fn def(&self, id: DefId) -> &DefSpec {
        &self.defs[id.0]
    }

    /// Resolve a possibly qualified name (`Name` or `module.Name`) against a
    /// module of the finished graph.
    pub fn find(&self, module: ModuleId, name: &str) -> Option<DefId> {
        let module = self.module(module);
        if let Some(id) = module.symbols.get(name) {
            return Some(*id);
        }
        let (include, rest) = name.split_once('.')?;
        let target = module.includes.get(include)?;
        self.module(*target).symbols.get(rest).copied()
    }

    /// The wire type used to transport instances of a type. Typedefs are
    /// traversed transparently; enums travel as `I32`, aggregates as
    /// `Struct`.
    pub fn type_code(&self, ty: &TypeSpec) -> TypeCode {
        match ty {
            TypeSpec::Bool => TypeCode::Bool,
            TypeSpec::I8 => TypeCode::I8,
            TypeSpec::I16 => TypeCode::I16,
            TypeSpec::I32 => TypeCode::I32,
            TypeSpec::I64 => TypeCode::I64,
            TypeSpec::Double => TypeCode::Double,
            TypeSpec::String | TypeSpec::Binary => TypeCode::Binary,
            TypeSpec::List(_) => TypeCode::List,
            TypeSpec::Set(_) => TypeCode::Set,
            TypeSpec::Map(..) => TypeCode::Map,
            TypeSpec::Defined(id) => match self.def(*id) {
                DefSpec::Enum(_) => TypeCode::I32,
                DefSpec::Struct(_) => TypeCode::Struct,
                DefSpec::Typedef(spec) => self.type_code(&spec.target),
                // The linker rejects services and constants in type position.
                DefSpec::Service(_) | DefSpec::Constant(_) => unreachable!(),
            },
        }
    }

    /// Strip typedef indirection, returning the underlying type.
    pub fn unalias<'a>(&'a self, mut ty: &'a TypeSpec) -> &'a TypeSpec {
        while let TypeSpec::Defined(id) = ty {
            match self.def(*id) {
                DefSpec::Typedef(spec) => ty = &spec.target,
                _ => break,
            }
        }
        ty
    }
}
