//! The AST source interface consumed by the constraint extractor (spec §6).
//!
//! Rather than a virtual-dispatch visitor, the tree is exposed as a
//! tagged-union: "visitor methods" on the consumer side become match arms
//! over `Expr`/`Decl`/`Stmt`. Concrete producers (the tree-sitter adapter in
//! this crate, or a hand-built tree in a test) only need to construct these
//! values; nothing about parsing leaks into the extractor.

use pointercore_core::Location;
use serde::{Deserialize, Serialize};

/// Static type information sufficient to decide whether a declaration or
/// assignment falls under the extractor's pointer-like gate (spec §4.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    pub is_pointer: bool,
    pub is_reference: bool,
    pub is_array: bool,
}

impl TypeInfo {
    /// Substring match against the smart-pointer whitelist. Brittle by
    /// design (per spec §9's design note) — callers needing a more precise
    /// canonical-type inspection must still recognize this exact set.
    pub fn is_smart_pointer(&self) -> bool {
        const SMART_POINTERS: &[&str] = &[
            "std::shared_ptr",
            "std::unique_ptr",
            "std::auto_ptr",
            "std::weak_ptr",
        ];
        SMART_POINTERS.iter().any(|s| self.name.contains(s))
    }

    /// The extractor's top-level gate: pointer, reference, array, or a
    /// recognized smart-pointer type.
    pub fn is_pointer_like(&self) -> bool {
        self.is_pointer || self.is_reference || self.is_array || self.is_smart_pointer()
    }
}

/// Where a declared entity lives, as observed from its declaration context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageClass {
    Local,
    Parameter,
    StaticLocal,
    StaticMember,
    FileScope,
}

/// A named, addressable entity: a variable, parameter, or field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub mangled_name: String,
    pub type_info: TypeInfo,
    pub storage: StorageClass,
    pub initializer: Option<Expr>,
    pub location: Location,
}

/// Assignment operator kinds the extractor reacts to (plain, compound, and
/// shift-compound all gate the same way per spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignKind {
    Plain,
    Compound,
    ShiftCompound,
}

/// Resolution state of a call's callee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Callee {
    /// Statically resolved to a named function, with its body available for
    /// return-flow inlining.
    Resolved {
        name: String,
        body: Option<Box<FunctionDecl>>,
    },
    /// Could not be resolved (e.g. through a function pointer) — the
    /// extractor conservatively emits nothing for such calls.
    Unresolved,
}

/// Expression nodes the side collector walks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// A reference to a named variable/parameter/field (`DeclRefExpr`).
    Ident {
        mangled_name: String,
        storage: StorageClass,
        is_reference_type: bool,
        location: Location,
    },
    /// `*expr`.
    UnaryDeref(Box<Expr>),
    /// `&expr`.
    UnaryAddrOf(Box<Expr>),
    /// `nullptr` / GNU `__null`. Each occurrence is a fresh per-location node.
    NullPtr { location: Location },
    /// A string literal. Each occurrence is a fresh per-location node.
    StringLiteral { location: Location },
    /// `new T(...)`. `operator_new_decl` names the resolved `operator new`
    /// when the call site itself has no usable source text to key a fresh
    /// node on.
    New {
        operator_new_decl: Option<String>,
        location: Location,
    },
    /// A constructor call: `T x(...)`, `T x{...}`, or a temporary `T(...)`.
    Construct {
        type_info: TypeInfo,
        args: Vec<Expr>,
        location: Location,
    },
    /// A function call.
    Call {
        callee: Callee,
        args: Vec<Expr>,
        location: Location,
    },
    /// `obj.member` / `obj->member`.
    Member {
        object: Box<Expr>,
        mangled_name: String,
        location: Location,
    },
    /// `lhs = rhs`, `lhs += rhs`, `lhs <<= rhs`, ...
    Assignment {
        kind: AssignKind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// One member initializer in a constructor initializer list:
/// `Member(init)`. `has_source_order` mirrors the reference system's
/// `getSourceOrder() != -1` check, which filters out compiler-synthesized
/// initializers that never appeared in source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberInit {
    pub member_mangled_name: String,
    pub init: Expr,
    pub has_source_order: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    pub var: VarDecl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub body: Option<Block>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructorDecl {
    pub type_name: String,
    pub initializers: Vec<MemberInit>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Expr),
    Return(Option<Expr>),
    Declaration(VarDecl),
    If {
        then_block: Box<Block>,
        else_block: Option<Box<Block>>,
    },
    While {
        body: Box<Block>,
    },
    For {
        body: Box<Block>,
    },
}

/// Top-level declarations a translation unit is made of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TopLevelDecl {
    Function(FunctionDecl),
    Constructor(ConstructorDecl),
    Variable(VarDecl),
}

/// One parsed translation unit, ready for the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub file: String,
    pub decls: Vec<TopLevelDecl>,
}

/// The AST source interface consumed by the extractor (spec §6). A producer
/// need only be able to answer "what are this translation unit's top-level
/// declarations" — traversal into statements/expressions happens on the
/// already-materialized `TopLevelDecl` tree, so there is exactly one trait
/// method.
pub trait AstSource: Send + Sync {
    fn translation_unit(&self) -> &TranslationUnit;
}

impl AstSource for TranslationUnit {
    fn translation_unit(&self) -> &TranslationUnit {
        self
    }
}
