//! The constraint extractor (C3): a single pass over a translation unit that
//! lowers declarations, assignments, calls, `new`, constructors, and returns
//! into constraints over statement sides.
//!
//! The "visitor" here is plain recursion over the tagged-union AST in
//! `pointercore_ast`; "leaf rules" below are match arms rather than overridden
//! visitor methods.

use pointercore_ast::ast::{
    AssignKind, Block, Callee, ConstructorDecl, Expr, FunctionDecl, Stmt, StorageClass,
    TopLevelDecl, TranslationUnit, TypeInfo, VarDecl,
};
use pointercore_core::{AstKind, AstNode, Constraint, Location, StmtOption, StmtSide, SymbolKind};
use pointercore_store::MangledNameCache;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Names recognized as allocator calls that should never be inlined through
/// the return collector (spec §4.1).
const ALLOCATORS: &[&str] = &["malloc", "calloc", "realloc"];

/// Bounds the number of descents into callee bodies a single side-collection
/// invocation may make before degrading to an opaque `FunctionCall` node
/// (spec §4.1, §9's "load-bearing" note).
const MAX_RETURN_DESCENTS: u32 = 5;

/// Constraints plus the AST nodes that back them, ready to persist (C2/C4).
#[derive(Debug, Default)]
pub struct ExtractionOutput {
    pub constraints: Vec<Constraint>,
    pub ast_nodes: Vec<AstNode>,
}

/// Extracts every constraint in `tu`, interning named entities through
/// `cache` (shared across translation units per spec §5).
pub fn extract(tu: &TranslationUnit, cache: &MangledNameCache) -> ExtractionOutput {
    let mut ctx = ExtractionContext::new(cache);
    for decl in &tu.decls {
        ctx.visit_top_level(decl);
    }
    debug!(
        file = %tu.file,
        constraints = ctx.constraints.len(),
        "extraction finished for translation unit"
    );
    ExtractionOutput {
        constraints: ctx.constraints,
        ast_nodes: ctx.ast_nodes,
    }
}

/// Per-call-expression state threaded through one `collect()` invocation.
/// Spec §4.1.A: fresh for every top-level side-collection call, never shared
/// across the two sides of a constraint.
struct CollectState {
    operators: String,
    is_return_type: bool,
    return_descents: u32,
}

impl CollectState {
    fn new() -> Self {
        Self {
            operators: String::new(),
            is_return_type: false,
            return_descents: 0,
        }
    }
}

struct ExtractionContext<'a> {
    cache: &'a MangledNameCache,
    ast_nodes: Vec<AstNode>,
    constraints: Vec<Constraint>,
    seen_constraint_ids: HashSet<u64>,
    /// A flat, whole-translation-unit symbol table (mangled name -> declared
    /// type). Real C++ scoping is out of scope; this is enough to gate
    /// assignments on a plain identifier LHS the way spec §4.1 describes.
    symtab: HashMap<String, TypeInfo>,
}

impl<'a> ExtractionContext<'a> {
    fn new(cache: &'a MangledNameCache) -> Self {
        Self {
            cache,
            ast_nodes: Vec::new(),
            constraints: Vec::new(),
            seen_constraint_ids: HashSet::new(),
            symtab: HashMap::new(),
        }
    }

    // ---- top level -----------------------------------------------------

    fn visit_top_level(&mut self, decl: &TopLevelDecl) {
        match decl {
            TopLevelDecl::Function(f) => self.visit_function(f),
            TopLevelDecl::Variable(v) => self.visit_var_decl(v),
            TopLevelDecl::Constructor(c) => self.visit_constructor(c),
        }
    }

    fn visit_function(&mut self, f: &FunctionDecl) {
        for p in &f.params {
            self.symtab
                .insert(p.var.mangled_name.clone(), p.var.type_info.clone());
        }
        if let Some(body) = &f.body {
            self.visit_block(body);
        }
    }

    fn visit_constructor(&mut self, c: &ConstructorDecl) {
        for mi in &c.initializers {
            if !mi.has_source_order {
                continue;
            }
            let lhs = self.collect_member(&mi.member_mangled_name);
            let rhs = self.collect(&mi.init);
            self.emit_cartesian(&lhs, &rhs);
            self.visit_expr_effects(&mi.init);
        }
    }

    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => self.visit_expr_effects(e),
            Stmt::Return(Some(e)) => self.visit_expr_effects(e),
            Stmt::Return(None) => {}
            Stmt::Declaration(v) => self.visit_var_decl(v),
            Stmt::If {
                then_block,
                else_block,
            } => {
                self.visit_block(then_block);
                if let Some(b) = else_block {
                    self.visit_block(b);
                }
            }
            Stmt::While { body } | Stmt::For { body } => self.visit_block(body),
        }
    }

    /// Variable declaration emission rule (spec §4.1). Runs regardless of
    /// the pointer-like gate so the symbol table stays complete, but only
    /// emits a constraint when the gate passes.
    fn visit_var_decl(&mut self, v: &VarDecl) {
        self.symtab
            .insert(v.mangled_name.clone(), v.type_info.clone());

        if let Some(init) = &v.initializer {
            self.visit_expr_effects(init);
        }

        if !v.type_info.is_pointer_like() {
            return;
        }

        match &v.initializer {
            Some(init) => {
                let lhs = self.collect_var(v);
                let rhs = self.collect(init);
                self.emit_cartesian(&lhs, &rhs);
            }
            None => {
                if v.storage != StorageClass::Parameter {
                    let hash = self.intern_anon("undefined", &v.location);
                    let mut rhs = BTreeMap::new();
                    rhs.insert(
                        hash,
                        StmtSide::new(hash, "", BTreeSet::from([StmtOption::Undefined])),
                    );
                    let lhs = self.collect_var(v);
                    self.emit_cartesian(&lhs, &rhs);
                }
            }
        }
    }

    /// Walks an expression looking for assignment and call constructs
    /// anywhere in its subtree (spec's "binary operator"/"call expression"
    /// rules fire wherever they occur, not only at statement top level).
    fn visit_expr_effects(&mut self, e: &Expr) {
        match e {
            Expr::Assignment { lhs, rhs, .. } => {
                if self.is_gated(lhs) {
                    let l = self.collect(lhs);
                    let r = self.collect(rhs);
                    self.emit_cartesian(&l, &r);
                }
                self.visit_expr_effects(lhs);
                self.visit_expr_effects(rhs);
            }
            Expr::Call { callee, args, .. } => {
                if let Callee::Resolved {
                    body: Some(fd), ..
                } = callee
                {
                    for (param, arg) in fd.params.iter().zip(args.iter()) {
                        let l = self.collect_var(&param.var);
                        let r = self.collect(arg);
                        self.emit_cartesian(&l, &r);
                    }
                }
                for a in args {
                    self.visit_expr_effects(a);
                }
            }
            Expr::UnaryDeref(inner) | Expr::UnaryAddrOf(inner) => self.visit_expr_effects(inner),
            Expr::Member { object, .. } => self.visit_expr_effects(object),
            Expr::Construct { args, .. } => {
                for a in args {
                    self.visit_expr_effects(a);
                }
            }
            Expr::Ident { .. } | Expr::NullPtr { .. } | Expr::StringLiteral { .. } | Expr::New { .. } => {}
        }
    }

    /// The pointer-like gate (spec §4.1) applied to an assignment's LHS.
    /// Only a bare identifier's declared type is actually recoverable from
    /// this tagged-union AST; compound lvalues (`*p`, `obj.m`) default to
    /// gated, which over-approximates rather than silently drops a real
    /// constraint (see DESIGN.md).
    fn is_gated(&self, lhs: &Expr) -> bool {
        match lhs {
            Expr::Ident { mangled_name, .. } => self
                .symtab
                .get(mangled_name)
                .map(TypeInfo::is_pointer_like)
                .unwrap_or(false),
            _ => true,
        }
    }

    // ---- side collection -------------------------------------------------

    fn collect(&mut self, expr: &Expr) -> BTreeMap<u64, StmtSide> {
        let mut out = BTreeMap::new();
        let mut state = CollectState::new();
        self.collect_into(expr, &mut state, &mut out);
        out
    }

    fn collect_into(&mut self, expr: &Expr, state: &mut CollectState, out: &mut BTreeMap<u64, StmtSide>) {
        match expr {
            Expr::Ident {
                mangled_name,
                storage,
                is_reference_type,
                location,
            } => {
                let hash = self.intern_named(
                    mangled_name,
                    mangled_name,
                    AstKind::Other,
                    symbol_kind_for(*storage),
                    Some(location.clone()),
                );
                let options = variable_options(*storage, *is_reference_type);
                self.emit(out, hash, state, options);
            }
            Expr::UnaryDeref(inner) => {
                state.operators.push('*');
                self.collect_into(inner, state, out);
                state.operators.pop();
            }
            Expr::UnaryAddrOf(inner) => {
                state.operators.push('&');
                self.collect_into(inner, state, out);
                state.operators.pop();
            }
            Expr::NullPtr { location } => {
                let hash = self.intern_anon("nullptr", location);
                self.emit(out, hash, state, BTreeSet::from([StmtOption::NullPtr]));
            }
            Expr::StringLiteral { location } => {
                let hash = self.intern_anon("string_literal", location);
                self.emit(
                    out,
                    hash,
                    state,
                    BTreeSet::from([StmtOption::Literal, StmtOption::GlobalObject]),
                );
            }
            Expr::New {
                operator_new_decl,
                location,
            } => {
                let name = operator_new_decl.as_deref().unwrap_or("new");
                let hash = self.intern_anon(name, location);
                self.emit(out, hash, state, BTreeSet::from([StmtOption::HeapObj]));
            }
            Expr::Construct {
                type_info,
                args,
                location,
            } => {
                if type_info.is_smart_pointer() {
                    match args.first() {
                        Some(first) => self.collect_into(first, state, out),
                        None => {
                            let hash = self.intern_anon("nullptr", location);
                            self.emit(out, hash, state, BTreeSet::from([StmtOption::NullPtr]));
                        }
                    }
                } else {
                    let hash = self.intern_anon(&type_info.name, location);
                    self.emit(out, hash, state, BTreeSet::from([StmtOption::StackObj]));
                }
            }
            Expr::Call { callee, args, location } => self.collect_call(callee, args, location, state, out),
            Expr::Member {
                mangled_name,
                location,
                ..
            } => {
                let hash = self.intern_named(
                    mangled_name,
                    mangled_name,
                    AstKind::Other,
                    SymbolKind::Member,
                    Some(location.clone()),
                );
                self.emit(out, hash, state, BTreeSet::from([StmtOption::Member]));
            }
            // Assignment never appears as a sub-expression the side
            // collector is asked to walk; it is handled by visit_expr_effects.
            Expr::Assignment { .. } => {}
        }
    }

    fn collect_call(
        &mut self,
        callee: &Callee,
        args: &[Expr],
        location: &Location,
        state: &mut CollectState,
        out: &mut BTreeMap<u64, StmtSide>,
    ) {
        let (name, callee_decl) = match callee {
            Callee::Unresolved => return,
            Callee::Resolved { name, body } => (name.as_str(), body),
        };

        if name == "move" {
            if let Some(first) = args.first() {
                self.collect_into(first, state, out);
            }
            return;
        }

        let mut returns = Vec::new();
        if let Some(fd) = callee_decl {
            if let Some(block) = &fd.body {
                collect_returns(block, &mut returns);
            }
        }

        state.return_descents += 1;
        if returns.is_empty()
            || state.return_descents > MAX_RETURN_DESCENTS
            || ALLOCATORS.contains(&name)
        {
            let hash = self.intern_anon(name, location);
            self.emit(out, hash, state, BTreeSet::from([StmtOption::FunctionCall]));
            return;
        }

        let saved_operators = state.operators.clone();
        let prev_is_return = state.is_return_type;
        state.is_return_type = true;
        for ret_expr in &returns {
            state.operators = saved_operators.clone();
            self.collect_into(ret_expr, state, out);
        }
        state.operators = saved_operators;
        state.is_return_type = prev_is_return;
    }

    fn emit(
        &mut self,
        out: &mut BTreeMap<u64, StmtSide>,
        hash: u64,
        state: &CollectState,
        mut options: BTreeSet<StmtOption>,
    ) {
        if hash == 0 {
            return;
        }
        if state.is_return_type {
            options.insert(StmtOption::Return);
        }
        out.entry(hash)
            .or_insert_with(|| StmtSide::new(hash, state.operators.clone(), options));
    }

    fn collect_var(&mut self, v: &VarDecl) -> BTreeMap<u64, StmtSide> {
        let hash = self.intern_named(
            &v.mangled_name,
            &v.mangled_name,
            AstKind::Declaration,
            symbol_kind_for(v.storage),
            Some(v.location.clone()),
        );
        let options = variable_options(v.storage, v.type_info.is_reference);
        let mut m = BTreeMap::new();
        m.insert(hash, StmtSide::new(hash, "", options));
        m
    }

    fn collect_member(&mut self, member_mangled_name: &str) -> BTreeMap<u64, StmtSide> {
        let hash = self.intern_named(
            member_mangled_name,
            member_mangled_name,
            AstKind::Other,
            SymbolKind::Member,
            None,
        );
        let mut m = BTreeMap::new();
        m.insert(hash, StmtSide::new(hash, "", BTreeSet::from([StmtOption::Member])));
        m
    }

    // ---- interning ---------------------------------------------------

    fn intern_named(
        &mut self,
        mangled_name: &str,
        ast_value: &str,
        kind: AstKind,
        symbol_kind: SymbolKind,
        location: Option<Location>,
    ) -> u64 {
        let hash = pointercore_core::mangled_name_hash(mangled_name, None);
        if self.cache.insert_if_new(mangled_name, hash) {
            self.ast_nodes
                .push(AstNode::new(mangled_name, ast_value, location, kind, symbol_kind, hash));
        }
        hash
    }

    fn intern_anon(&mut self, name: &str, location: &Location) -> u64 {
        let hash = pointercore_core::mangled_name_hash(name, Some(location));
        let key = format!("{name}@{location}");
        if self.cache.insert_if_new(key, hash) {
            self.ast_nodes.push(AstNode::new(
                name,
                name,
                Some(location.clone()),
                AstKind::Other,
                SymbolKind::Anonymous,
                hash,
            ));
        }
        hash
    }

    fn emit_cartesian(&mut self, lhs: &BTreeMap<u64, StmtSide>, rhs: &BTreeMap<u64, StmtSide>) {
        for l in lhs.values() {
            if l.hash == 0 {
                continue;
            }
            for r in rhs.values() {
                if r.hash == 0 {
                    continue;
                }
                let c = Constraint::new(l.clone(), r.clone());
                if self.seen_constraint_ids.insert(c.id) {
                    self.constraints.push(c);
                }
            }
        }
    }
}

fn symbol_kind_for(storage: StorageClass) -> SymbolKind {
    match storage {
        StorageClass::Parameter => SymbolKind::Parameter,
        _ => SymbolKind::Variable,
    }
}

/// `getVariableOptions` (spec §4.1). A static local gets both StackObj (it
/// is lexically local) and GlobalObject (it has static storage duration),
/// matching the reference system's two independent checks.
fn variable_options(storage: StorageClass, is_reference: bool) -> BTreeSet<StmtOption> {
    let mut opts = BTreeSet::new();
    if is_reference {
        opts.insert(StmtOption::Reference);
    }
    if storage == StorageClass::Parameter {
        opts.insert(StmtOption::Param);
    }
    let is_local = matches!(
        storage,
        StorageClass::Parameter | StorageClass::Local | StorageClass::StaticLocal
    );
    if is_local {
        opts.insert(StmtOption::StackObj);
    } else {
        opts.insert(StmtOption::GlobalObject);
    }
    if matches!(storage, StorageClass::StaticLocal | StorageClass::StaticMember) {
        opts.insert(StmtOption::GlobalObject);
    }
    opts
}

/// Gathers every `return` expression reachable without crossing into a
/// nested function, filtered to the kinds the reference system inlines
/// (spec §4.1): null/GNU-null, constructor, `new`, or a plain identifier.
/// `return &x` and `return *p` are recognized through their innermost
/// leaf — the outer `&`/`*` is pushed as-is so the side collector's normal
/// operator-prefix bookkeeping picks it up when it re-descends.
fn collect_returns<'e>(block: &'e Block, out: &mut Vec<&'e Expr>) {
    for stmt in &block.statements {
        match stmt {
            Stmt::Return(Some(e)) => {
                if is_inlinable_return(e) {
                    out.push(e);
                }
            }
            Stmt::Return(None) => {}
            Stmt::If {
                then_block,
                else_block,
            } => {
                collect_returns(then_block, out);
                if let Some(b) = else_block {
                    collect_returns(b, out);
                }
            }
            Stmt::While { body } | Stmt::For { body } => collect_returns(body, out),
            Stmt::Expr(_) | Stmt::Declaration(_) => {}
        }
    }
}

/// Whether `e` ultimately denotes one of the inlinable return kinds, looking
/// through any number of leading `&`/`*` wrappers (`return &x`, `return *p`).
fn is_inlinable_return(e: &Expr) -> bool {
    match e {
        Expr::NullPtr { .. } | Expr::Construct { .. } | Expr::New { .. } | Expr::Ident { .. } => true,
        Expr::UnaryAddrOf(inner) | Expr::UnaryDeref(inner) => is_inlinable_return(inner),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointercore_ast::ast::{FunctionDecl, ParamDecl, TranslationUnit};
    use pointercore_core::Location;

    fn loc(line: u32) -> Location {
        Location::new("t.cpp", line, 0)
    }

    fn ptr_type() -> TypeInfo {
        TypeInfo {
            name: "int*".into(),
            is_pointer: true,
            is_reference: false,
            is_array: false,
        }
    }

    fn var(name: &str, storage: StorageClass, init: Option<Expr>) -> VarDecl {
        VarDecl {
            mangled_name: name.into(),
            type_info: ptr_type(),
            storage,
            initializer: init,
            location: loc(1),
        }
    }

    fn ident(name: &str, storage: StorageClass) -> Expr {
        Expr::Ident {
            mangled_name: name.into(),
            storage,
            is_reference_type: false,
            location: loc(1),
        }
    }

    fn addr_of(name: &str) -> Expr {
        Expr::UnaryAddrOf(Box::new(ident(name, StorageClass::Local)))
    }

    fn tu_with(decls: Vec<TopLevelDecl>) -> TranslationUnit {
        TranslationUnit {
            file: "t.cpp".into(),
            decls,
        }
    }

    #[test]
    fn direct_assignment_emits_one_constraint() {
        // int a; int* p = &a;
        let p = var("p", StorageClass::Local, Some(addr_of("a")));
        let tu = tu_with(vec![TopLevelDecl::Variable(p)]);
        let cache = MangledNameCache::new();
        let out = extract(&tu, &cache);

        assert_eq!(out.constraints.len(), 1);
        let c = &out.constraints[0];
        assert_eq!(c.lhs.operators, "");
        assert_eq!(c.rhs.operators, "&");
        assert!(c.is_simple());
    }

    #[test]
    fn null_init_sets_nullptr_option() {
        let p = var("p", StorageClass::Local, Some(Expr::NullPtr { location: loc(1) }));
        let tu = tu_with(vec![TopLevelDecl::Variable(p)]);
        let cache = MangledNameCache::new();
        let out = extract(&tu, &cache);

        assert_eq!(out.constraints.len(), 1);
        assert!(out.constraints[0].rhs.has_option(StmtOption::NullPtr));
    }

    #[test]
    fn heap_allocation_sets_heapobj_option() {
        let p = var(
            "p",
            StorageClass::Local,
            Some(Expr::New {
                operator_new_decl: None,
                location: loc(1),
            }),
        );
        let tu = tu_with(vec![TopLevelDecl::Variable(p)]);
        let cache = MangledNameCache::new();
        let out = extract(&tu, &cache);

        assert_eq!(out.constraints.len(), 1);
        assert!(out.constraints[0].rhs.has_option(StmtOption::HeapObj));
    }

    #[test]
    fn move_is_transparent() {
        // T* p = std::move(q);
        let p = var(
            "p",
            StorageClass::Local,
            Some(Expr::Call {
                callee: Callee::Resolved {
                    name: "move".into(),
                    body: None,
                },
                args: vec![ident("q", StorageClass::Local)],
                location: loc(1),
            }),
        );
        let tu = tu_with(vec![TopLevelDecl::Variable(p)]);
        let cache = MangledNameCache::new();
        let out = extract(&tu, &cache);

        assert_eq!(out.constraints.len(), 1);
        assert_eq!(out.constraints[0].rhs.operators, "");
    }

    #[test]
    fn parameter_without_initializer_emits_nothing() {
        let p = var("p", StorageClass::Parameter, None);
        let f = FunctionDecl {
            name: "f".into(),
            params: vec![ParamDecl { var: p }],
            body: None,
            location: loc(1),
        };
        let tu = tu_with(vec![TopLevelDecl::Function(f)]);
        let cache = MangledNameCache::new();
        let out = extract(&tu, &cache);
        assert!(out.constraints.is_empty());
    }

    #[test]
    fn declaration_without_initializer_emits_undefined() {
        let p = var("p", StorageClass::Local, None);
        let tu = tu_with(vec![TopLevelDecl::Variable(p)]);
        let cache = MangledNameCache::new();
        let out = extract(&tu, &cache);

        assert_eq!(out.constraints.len(), 1);
        assert!(out.constraints[0].rhs.has_option(StmtOption::Undefined));
    }

    #[test]
    fn non_pointer_declaration_is_not_gated() {
        let v = VarDecl {
            mangled_name: "n".into(),
            type_info: TypeInfo {
                name: "int".into(),
                is_pointer: false,
                is_reference: false,
                is_array: false,
            },
            storage: StorageClass::Local,
            initializer: Some(Expr::NullPtr { location: loc(1) }),
            location: loc(1),
        };
        let tu = tu_with(vec![TopLevelDecl::Variable(v)]);
        let cache = MangledNameCache::new();
        let out = extract(&tu, &cache);
        assert!(out.constraints.is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let p = var("p", StorageClass::Local, Some(addr_of("a")));
        let tu = tu_with(vec![TopLevelDecl::Variable(p)]);
        let cache = MangledNameCache::new();
        let first = extract(&tu, &cache);
        let second = extract(&tu, &cache);
        assert_eq!(first.constraints.len(), second.constraints.len());
        assert_eq!(first.constraints[0].id, second.constraints[0].id);
    }
}
