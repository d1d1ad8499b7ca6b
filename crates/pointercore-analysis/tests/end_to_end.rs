//! End-to-end coverage for the eight scenarios named in the pointer-analysis
//! specification: parse (or hand-build) a small translation unit, extract its
//! constraints, and check both solvers' points-to results.
//!
//! Scenarios reachable through the tree-sitter adapter are driven from real
//! C++ source text; scenarios that need machinery the partial adapter does
//! not implement (smart-pointer construction, call-site parameter binding,
//! return-flow inlining through a resolved callee body) are hand-built
//! directly against the AST types, the same way the extractor's own unit
//! tests are built.

use pointercore_analysis::{extract, AndersenSolver, SteensgaardSolver};
use pointercore_ast::ast::{
    AssignKind, Block, Callee, ConstructorDecl, Expr, FunctionDecl, MemberInit, ParamDecl,
    StorageClass, Stmt, TopLevelDecl, TranslationUnit, TypeInfo, VarDecl,
};
use pointercore_ast::treesitter::TreeSitterAstSource;
use pointercore_ast::AstSource;
use pointercore_core::Location;
use pointercore_store::MangledNameCache;

fn loc(line: u32) -> Location {
    Location::new("scenario.cpp", line, 0)
}

fn ptr_to(name: &str) -> TypeInfo {
    TypeInfo {
        name: name.into(),
        is_pointer: true,
        is_reference: false,
        is_array: false,
    }
}

// --- Scenarios driven through the tree-sitter adapter -----------------

#[test]
fn scenario_1_direct_assignment() {
    let src = "void f() { int a; int* p = &a; }";
    let source = TreeSitterAstSource::parse(src, "t.cpp").unwrap();
    let cache = MangledNameCache::new();
    let out = extract(source.translation_unit(), &cache);

    assert_eq!(out.constraints.len(), 1);
    let c = &out.constraints[0];
    assert!(c.is_simple());

    let pts = AndersenSolver::new(out.constraints.clone()).run();
    assert!(pts.of(c.lhs.hash).contains(&c.rhs.hash));

    let classes = SteensgaardSolver::new(out.constraints).run();
    assert_eq!(
        classes.points_to(c.lhs.hash),
        Some(classes.class_of(c.rhs.hash))
    );
}

#[test]
fn scenario_2_null_init() {
    let src = "void f() { int* p = nullptr; }";
    let source = TreeSitterAstSource::parse(src, "t.cpp").unwrap();
    let cache = MangledNameCache::new();
    let out = extract(source.translation_unit(), &cache);

    assert_eq!(out.constraints.len(), 1);
    let c = &out.constraints[0];
    assert!(c.rhs.has_option(pointercore_core::StmtOption::NullPtr));

    let pts = AndersenSolver::new(out.constraints).run();
    assert!(pts.of(c.lhs.hash).contains(&c.rhs.hash));
}

#[test]
fn scenario_3_heap_allocation() {
    let src = "void f() { int* p = new int; }";
    let source = TreeSitterAstSource::parse(src, "t.cpp").unwrap();
    let cache = MangledNameCache::new();
    let out = extract(source.translation_unit(), &cache);

    assert_eq!(out.constraints.len(), 1);
    let c = &out.constraints[0];
    assert!(c.rhs.has_option(pointercore_core::StmtOption::HeapObj));

    let pts = AndersenSolver::new(out.constraints).run();
    assert!(pts.of(c.lhs.hash).contains(&c.rhs.hash));
}

#[test]
fn scenario_4_chained_pointers() {
    let src = "void f() { int a; int* p = &a; int** q = &p; }";
    let source = TreeSitterAstSource::parse(src, "t.cpp").unwrap();
    let cache = MangledNameCache::new();
    let out = extract(source.translation_unit(), &cache);
    assert_eq!(out.constraints.len(), 2);

    let a_hash = out
        .ast_nodes
        .iter()
        .find(|n| n.mangled_name == "a")
        .unwrap()
        .hash;
    let p_hash = out
        .ast_nodes
        .iter()
        .find(|n| n.mangled_name == "p")
        .unwrap()
        .hash;
    let q_hash = out
        .ast_nodes
        .iter()
        .find(|n| n.mangled_name == "q")
        .unwrap()
        .hash;

    let pts = AndersenSolver::new(out.constraints).run();
    assert!(pts.of(p_hash).contains(&a_hash));
    assert!(pts.of(q_hash).contains(&p_hash));
}

#[test]
fn scenario_6_move_is_transparent_through_parser() {
    let src = "void f() { int* q; int* p = std::move(q); }";
    let source = TreeSitterAstSource::parse(src, "t.cpp").unwrap();
    let cache = MangledNameCache::new();
    let out = extract(source.translation_unit(), &cache);

    // q has no initializer -> Undefined; p = move(q) -> identical to p = q.
    let move_constraint = out
        .constraints
        .iter()
        .find(|c| c.rhs.operators.is_empty() && !c.rhs.has_option(pointercore_core::StmtOption::Undefined));
    assert!(move_constraint.is_some(), "move(q) should collect transparently to q");
}

// --- Scenarios hand-built against the AST (tree-sitter adapter does not
// resolve call bodies or smart-pointer construction) --------------------

fn tu(decls: Vec<TopLevelDecl>) -> TranslationUnit {
    TranslationUnit {
        file: "scenario.cpp".into(),
        decls,
    }
}

#[test]
fn scenario_5_return_inlining() {
    // int* f(){ static int x; return &x; } int* p = f();
    let x = VarDecl {
        mangled_name: "x".into(),
        type_info: TypeInfo {
            name: "int".into(),
            is_pointer: false,
            is_reference: false,
            is_array: false,
        },
        storage: StorageClass::StaticLocal,
        initializer: None,
        location: loc(1),
    };
    let return_addr_x = Stmt::Return(Some(Expr::UnaryAddrOf(Box::new(Expr::Ident {
        mangled_name: "x".into(),
        storage: StorageClass::StaticLocal,
        is_reference_type: false,
        location: loc(1),
    }))));
    let f = FunctionDecl {
        name: "f".into(),
        params: vec![],
        body: Some(Block {
            statements: vec![Stmt::Declaration(x), return_addr_x],
        }),
        location: loc(1),
    };

    let p = VarDecl {
        mangled_name: "p".into(),
        type_info: ptr_to("int*"),
        storage: StorageClass::Local,
        initializer: Some(Expr::Call {
            callee: Callee::Resolved {
                name: "f".into(),
                body: Some(Box::new(f.clone())),
            },
            args: vec![],
            location: loc(2),
        }),
        location: loc(2),
    };

    let unit = tu(vec![TopLevelDecl::Function(f), TopLevelDecl::Variable(p)]);
    let cache = MangledNameCache::new();
    let out = extract(&unit, &cache);

    assert_eq!(out.constraints.len(), 1);
    let c = &out.constraints[0];
    assert_eq!(c.rhs.operators, "&");
    assert!(c.rhs.has_option(pointercore_core::StmtOption::Return));

    let pts = AndersenSolver::new(out.constraints).run();
    assert!(pts.of(c.lhs.hash).contains(&c.rhs.hash));
}

#[test]
fn scenario_7_smart_pointer_construction_unwraps_to_heap() {
    // std::shared_ptr<T> s(new T);
    let s = VarDecl {
        mangled_name: "s".into(),
        type_info: ptr_to("std::shared_ptr<T>"),
        storage: StorageClass::Local,
        initializer: Some(Expr::Construct {
            type_info: ptr_to("std::shared_ptr<T>"),
            args: vec![Expr::New {
                operator_new_decl: None,
                location: loc(1),
            }],
            location: loc(1),
        }),
        location: loc(1),
    };
    let unit = tu(vec![TopLevelDecl::Variable(s)]);
    let cache = MangledNameCache::new();
    let out = extract(&unit, &cache);

    assert_eq!(out.constraints.len(), 1);
    let c = &out.constraints[0];
    assert!(c.rhs.has_option(pointercore_core::StmtOption::HeapObj));
    assert!(!c.rhs.has_option(pointercore_core::StmtOption::StackObj));
}

#[test]
fn scenario_8_parameter_passing() {
    // void f(int* q); int a; f(&a);
    let q_param = ParamDecl {
        var: VarDecl {
            mangled_name: "q".into(),
            type_info: ptr_to("int*"),
            storage: StorageClass::Parameter,
            initializer: None,
            location: loc(1),
        },
    };
    let f = FunctionDecl {
        name: "f".into(),
        params: vec![q_param],
        body: None,
        location: loc(1),
    };

    let a = VarDecl {
        mangled_name: "a".into(),
        type_info: TypeInfo {
            name: "int".into(),
            is_pointer: false,
            is_reference: false,
            is_array: false,
        },
        storage: StorageClass::Local,
        initializer: None,
        location: loc(2),
    };

    let call = Stmt::Expr(Expr::Call {
        callee: Callee::Resolved {
            name: "f".into(),
            body: Some(Box::new(f.clone())),
        },
        args: vec![Expr::UnaryAddrOf(Box::new(Expr::Ident {
            mangled_name: "a".into(),
            storage: StorageClass::Local,
            is_reference_type: false,
            location: loc(2),
        }))],
        location: loc(2),
    });

    let caller = FunctionDecl {
        name: "caller".into(),
        params: vec![],
        body: Some(Block {
            statements: vec![Stmt::Declaration(a), call],
        }),
        location: loc(2),
    };

    let unit = tu(vec![
        TopLevelDecl::Function(f),
        TopLevelDecl::Function(caller),
    ]);
    let cache = MangledNameCache::new();
    let out = extract(&unit, &cache);

    let param_constraint = out
        .constraints
        .iter()
        .find(|c| c.rhs.operators == "&")
        .expect("parameter-binding constraint for f(&a)");

    let pts = AndersenSolver::new(out.constraints).run();
    assert!(pts.of(param_constraint.lhs.hash).contains(&param_constraint.rhs.hash));
}

#[test]
fn constructor_initializer_list_emits_member_constraint() {
    // struct S { int* m; S(int* p) : m(p) {} }
    let ctor = ConstructorDecl {
        type_name: "S".into(),
        initializers: vec![MemberInit {
            member_mangled_name: "S::m".into(),
            init: Expr::Ident {
                mangled_name: "p".into(),
                storage: StorageClass::Parameter,
                is_reference_type: false,
                location: loc(1),
            },
            has_source_order: true,
        }],
        location: loc(1),
    };
    let unit = tu(vec![TopLevelDecl::Constructor(ctor)]);
    let cache = MangledNameCache::new();
    let out = extract(&unit, &cache);

    assert_eq!(out.constraints.len(), 1);
    assert_eq!(out.constraints[0].rhs.operators, "");
}

// Not gated in this AST traversal — assignment kind is irrelevant to
// whether it's a constraint-emitting construct.
#[test]
fn compound_assignment_on_pointer_gates_like_plain_assignment() {
    let p = VarDecl {
        mangled_name: "p".into(),
        type_info: ptr_to("int*"),
        storage: StorageClass::Local,
        initializer: None,
        location: loc(1),
    };
    let assign = Stmt::Expr(Expr::Assignment {
        kind: AssignKind::Compound,
        lhs: Box::new(Expr::Ident {
            mangled_name: "p".into(),
            storage: StorageClass::Local,
            is_reference_type: false,
            location: loc(2),
        }),
        rhs: Box::new(Expr::NullPtr { location: loc(2) }),
    });
    let f = FunctionDecl {
        name: "f".into(),
        params: vec![],
        body: Some(Block {
            statements: vec![Stmt::Declaration(p), assign],
        }),
        location: loc(1),
    };
    let unit = tu(vec![TopLevelDecl::Function(f)]);
    let cache = MangledNameCache::new();
    let out = extract(&unit, &cache);

    // one from the undefined declaration, one from the compound assignment
    assert_eq!(out.constraints.len(), 2);
}
