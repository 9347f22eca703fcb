//! Variable assignment and substitution with brace-scoped visibility.

use super::ast::{NodeType, ScriptNode};
use super::objects::ObjectResolver;
use super::parser::{parse_with_mode, ParseMode};
use crate::error::{Diagnostic, ErrorKind, ErrorList};
use std::collections::BTreeMap;

type Scope = BTreeMap<String, String>;

/// Expands `$name` references. Entering `{` copies the enclosing scope, so
/// every lookup reads a single map and never sees later changes made to an
/// outer scope.
pub struct VariableResolver<'r, 't> {
    objects: &'r ObjectResolver<'t>,
    scopes: Vec<Scope>,
    /// Variables whose values are being expanded, innermost last.
    expanding: Vec<String>,
}

impl<'r, 't> VariableResolver<'r, 't> {
    pub fn new(objects: &'r ObjectResolver<'t>) -> Self {
        VariableResolver {
            objects,
            scopes: vec![Scope::new()],
            expanding: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.scopes.last().and_then(|s| s.get(name)).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), value.to_owned());
        }
    }

    fn push_scope(&mut self) {
        let copy = self.scopes.last().cloned().unwrap_or_default();
        self.scopes.push(copy);
    }

    fn pop_scope(&mut self, floor: usize) {
        if self.scopes.len() > floor.max(1) {
            self.scopes.pop();
        }
    }

    /// Processes one level of the tree. Assignments at this level are
    /// recorded and removed first; references are then replaced left to
    /// right. `mode` is how a variable's value is re-parsed at this level:
    /// statements in a body or at the top, arguments under a statement.
    pub fn process(
        &mut self,
        nodes: &mut Vec<ScriptNode>,
        top: Option<&[ScriptNode]>,
        mode: ParseMode,
        errors: &mut ErrorList,
    ) {
        let floor = self.scopes.len();

        let mut i = 0;
        while i < nodes.len() {
            if nodes[i].kind == NodeType::VariableAssign {
                if let Some((name, value)) = assignment(&nodes[i], errors) {
                    self.set(&name, &value);
                    nodes.remove(i);
                    continue;
                }
            }
            i += 1;
        }

        let mut i = 0;
        while i < nodes.len() {
            match nodes[i].kind {
                NodeType::Variable => {
                    if let Some(inserted) = self.expand(nodes, i, top, mode, errors) {
                        i += inserted;
                        continue;
                    }
                }
                NodeType::LBrace => self.push_scope(),
                NodeType::RBrace => self.pop_scope(floor),
                NodeType::VariableAssign | NodeType::Import => {
                    i += 1;
                    continue;
                }
                _ => {}
            }

            if !nodes[i].children.is_empty() {
                let child_mode = if nodes[i].kind == NodeType::LBrace {
                    ParseMode::Statements
                } else {
                    ParseMode::Arguments
                };
                let mut children = std::mem::take(&mut nodes[i].children);
                match top {
                    Some(t) => self.process(&mut children, Some(t), child_mode, errors),
                    None => self.process(&mut children, Some(&nodes[..]), child_mode, errors),
                }
                nodes[i].children = children;
            }
            i += 1;
        }

        // An unclosed `{` at this level does not leak its scope.
        self.scopes.truncate(floor);
    }

    /// Replaces the reference at `i` with its parsed, resolved value and
    /// returns how many nodes took its place. `None` leaves the reference
    /// where it is after reporting why.
    fn expand(
        &mut self,
        nodes: &mut Vec<ScriptNode>,
        i: usize,
        top: Option<&[ScriptNode]>,
        mode: ParseMode,
        errors: &mut ErrorList,
    ) -> Option<usize> {
        let reference = &nodes[i];
        let name = reference.token.clone();
        if self.expanding.contains(&name) {
            errors.push(error_at(
                ErrorKind::RecursiveVariable,
                reference,
                format!("variable '{}' refers to itself", name),
            ));
            return None;
        }
        let Some(value) = self.get(&name).map(str::to_owned) else {
            errors.push(error_at(
                ErrorKind::UndefinedVariable,
                reference,
                format!("undefined variable '{}'", name),
            ));
            return None;
        };

        let (file, line, column) = (reference.file.clone(), reference.line, reference.column);
        let mut fragment = parse_with_mode(&value, &file, mode, errors);
        for node in &mut fragment {
            node.relocate(&file, line, column);
        }

        self.expanding.push(name);
        {
            let scope_top: &[ScriptNode] = top.unwrap_or(&nodes[..]);
            self.objects.process(&mut fragment, Some(scope_top), errors);
            self.process(&mut fragment, Some(scope_top), mode, errors);
        }
        self.expanding.pop();

        let inserted = fragment.len();
        nodes.splice(i..i + 1, fragment);
        Some(inserted)
    }
}

/// Name and value of a well-formed assignment; reports and returns `None`
/// for a malformed one.
fn assignment(node: &ScriptNode, errors: &mut ErrorList) -> Option<(String, String)> {
    let name = match node.children.first() {
        Some(n) if n.kind == NodeType::Variable => n,
        Some(other) => {
            errors.push(error_at(ErrorKind::VariableExpected, other, "expected a variable name"));
            return None;
        }
        None => {
            errors.push(error_at(ErrorKind::VariableExpected, node, "expected a variable name"));
            return None;
        }
    };
    match node.children.get(1) {
        Some(v) if v.kind == NodeType::Quote => Some((name.token.clone(), v.token.clone())),
        Some(other) => {
            errors.push(error_at(
                ErrorKind::VariableValueExpected,
                other,
                "variable value must be a quoted string",
            ));
            None
        }
        None => {
            errors.push(error_at(
                ErrorKind::VariableValueExpected,
                node,
                format!("expected a value for variable '{}'", name.token),
            ));
            None
        }
    }
}

fn error_at(kind: ErrorKind, node: &ScriptNode, msg: impl Into<String>) -> Diagnostic {
    Diagnostic::new(kind, &node.file, node.line, Some(node.column), msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ast::render;
    use crate::script::parser::parse;

    fn resolve(src: &str) -> (Vec<ScriptNode>, ErrorList) {
        let mut errors = Vec::new();
        let mut nodes = parse(src, "t", &mut errors);
        assert!(errors.is_empty(), "{:?}", errors);
        let objects = ObjectResolver::new(&[], false);
        VariableResolver::new(&objects).process(
            &mut nodes,
            None,
            ParseMode::Statements,
            &mut errors,
        );
        (nodes, errors)
    }

    #[test]
    fn argument_values_splice_flat() {
        let (nodes, errors) = resolve("$c := \"1 0 0\"\nmaterial m { ambient $c }");
        assert!(errors.is_empty());
        assert_eq!(render(&nodes), "material m { ambient 1 0 0 }");
        let ambient = &nodes[0].children[1].children[0];
        assert_eq!(ambient.children.len(), 3);
    }

    #[test]
    fn statement_values_parse_as_statements() {
        let (nodes, errors) = resolve("$p := \"pass { lighting off }\"\nmaterial m { $p }");
        assert!(errors.is_empty());
        let body = &nodes[0].children[1];
        assert!(body.children[0].is_object);
        assert_eq!(render(&body.children), "pass { lighting off }");
        assert_eq!(body.children[0].line, 2);
    }

    #[test]
    fn inner_scope_shadows_and_closes() {
        let (nodes, errors) =
            resolve("$x := \"1\"\n{ $x := \"2\"\n a $x }\nb $x");
        assert!(errors.is_empty());
        assert_eq!(render(&nodes), "{ a 2 } b 1");
    }

    #[test]
    fn reference_before_assignment_at_same_level() {
        let (nodes, errors) = resolve("a $x\n$x := \"late\"");
        assert!(errors.is_empty());
        assert_eq!(render(&nodes), "a late");
    }

    #[test]
    fn sibling_scopes_do_not_share() {
        let (nodes, errors) = resolve("{ a $y }\n{ $y := \"v\" }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::UndefinedVariable);
        assert_eq!(render(&nodes), "{ a $y } { }");
    }

    #[test]
    fn undefined_reference_stays_in_place() {
        let (nodes, errors) = resolve("ambient $missing 1");
        assert_eq!(errors.len(), 1);
        assert_eq!((errors[0].line, errors[0].column), (1, Some(9)));
        assert_eq!(nodes[0].children[0].kind, NodeType::Variable);
        assert_eq!(render(&nodes), "ambient $missing 1");
    }

    #[test]
    fn malformed_assignments_stay() {
        let (nodes, errors) = resolve("$a := word\nset $b");
        let kinds: Vec<ErrorKind> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![ErrorKind::VariableValueExpected, ErrorKind::VariableValueExpected]
        );
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].kind, NodeType::VariableAssign);
    }

    #[test]
    fn self_reference_is_reported_once() {
        let (nodes, errors) = resolve("$a := \"x $b\"\n$b := \"$a\"\nuse $a");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::RecursiveVariable);
        assert_eq!(render(&nodes), "use x $a");
    }

    #[test]
    fn nested_values_expand_transitively() {
        let (nodes, errors) = resolve("$r := \"1\"\n$rgb := \"$r 0 0\"\ndiffuse $rgb");
        assert!(errors.is_empty());
        assert_eq!(render(&nodes), "diffuse 1 0 0");
    }
}
