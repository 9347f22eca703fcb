//! `import <name|*> from <path>` resolution.

use super::ast::{NodeType, ScriptNode};
use super::locate::locate;
use super::objects::ObjectResolver;
use crate::error::{Diagnostic, ErrorKind, ErrorList};

/// Loads and parses an imported script. `None` means the path could not be
/// opened; the import is then skipped.
pub trait ImportLoader {
    fn load(&mut self, path: &str, errors: &mut ErrorList) -> Option<Vec<ScriptNode>>;
}

const WILDCARD: &str = "*";

/// Import state for one compile: parsed files by path, the names requested
/// from each, and the resulting import table.
#[derive(Debug, Default)]
pub struct ImportResolver {
    /// Paths in first-encounter order. A file is entered before its own
    /// imports are processed, so cycles stop at the second visit.
    cache: Vec<(String, Vec<ScriptNode>)>,
    requests: Vec<(String, Vec<String>)>,
    table: Vec<ScriptNode>,
    allow_nontyped: bool,
}

impl ImportResolver {
    /// `root` is the name of the file being compiled. It is registered up
    /// front so a script importing itself loads nothing.
    pub fn new(root: Option<&str>, allow_nontyped: bool) -> Self {
        let mut resolver = ImportResolver {
            allow_nontyped,
            ..Default::default()
        };
        if let Some(root) = root {
            resolver.cache.push((root.to_owned(), Vec::new()));
        }
        resolver
    }

    /// Top-level objects made visible by the processed imports.
    pub fn table(&self) -> &[ScriptNode] {
        &self.table
    }

    pub fn into_table(self) -> Vec<ScriptNode> {
        self.table
    }

    pub fn is_cached(&self, path: &str) -> bool {
        self.cache.iter().any(|(p, _)| p == path)
    }

    /// Removes every top-level import node from `nodes`, loading each new
    /// path, then rebuilds the import table.
    pub fn process(
        &mut self,
        nodes: &mut Vec<ScriptNode>,
        loader: &mut dyn ImportLoader,
        errors: &mut ErrorList,
    ) {
        let mut i = 0;
        while i < nodes.len() {
            if nodes[i].kind != NodeType::Import {
                i += 1;
                continue;
            }
            let import = nodes.remove(i);
            let Some((target, path)) = import_parts(&import, errors) else {
                continue;
            };

            if !self.is_cached(&path) {
                self.cache.push((path.clone(), Vec::new()));
                if let Some(mut imported) = loader.load(&path, errors) {
                    self.process(&mut imported, loader, errors);
                    ObjectResolver::new(&self.table, self.allow_nontyped)
                        .process(&mut imported, None, errors);
                    if let Some(entry) = self.cache.iter_mut().find(|(p, _)| *p == path) {
                        entry.1 = imported;
                    }
                }
            }
            self.request(&path, &target);
        }
        self.rebuild_table();
    }

    /// A wildcard replaces every earlier request for the path; names asked
    /// for after a wildcard are dropped.
    fn request(&mut self, path: &str, target: &str) {
        let idx = match self.requests.iter().position(|(p, _)| p == path) {
            Some(idx) => idx,
            None => {
                self.requests.push((path.to_owned(), Vec::new()));
                self.requests.len() - 1
            }
        };
        let names = &mut self.requests[idx].1;
        if target == WILDCARD {
            names.clear();
            names.push(WILDCARD.to_owned());
        } else if names.first().map(String::as_str) != Some(WILDCARD)
            && !names.iter().any(|n| n == target)
        {
            names.push(target.to_owned());
        }
    }

    fn rebuild_table(&mut self) {
        let mut table = Vec::new();
        for (path, file_nodes) in &self.cache {
            let Some((_, names)) = self.requests.iter().find(|(p, _)| p == path) else {
                continue;
            };
            if names.first().map(String::as_str) == Some(WILDCARD) {
                table.extend(file_nodes.iter().filter(|n| n.is_object).cloned());
            } else {
                for name in names {
                    if let Some(found) = locate(file_nodes, name, self.allow_nontyped) {
                        table.push(found.clone());
                    }
                }
            }
        }
        self.table = table;
    }
}

fn import_parts(import: &ScriptNode, errors: &mut ErrorList) -> Option<(String, String)> {
    let Some(target) = import.children.first() else {
        errors.push(Diagnostic::new(
            ErrorKind::ImportTargetExpected,
            &import.file,
            import.line,
            Some(import.column),
            "expected an object name or '*' after import",
        ));
        return None;
    };
    let Some(path) = import.children.get(1) else {
        errors.push(Diagnostic::new(
            ErrorKind::ImportPathExpected,
            &import.file,
            import.line,
            Some(import.column),
            "expected 'from <path>' after the import target",
        ));
        return None;
    };
    Some((target.token.clone(), path.token.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ast::render;
    use crate::script::parser::parse;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapLoader {
        files: HashMap<&'static str, &'static str>,
        loads: Vec<String>,
    }

    impl ImportLoader for MapLoader {
        fn load(&mut self, path: &str, errors: &mut ErrorList) -> Option<Vec<ScriptNode>> {
            self.loads.push(path.to_owned());
            self.files.get(path).map(|text| parse(text, path, errors))
        }
    }

    fn loader(files: &[(&'static str, &'static str)]) -> MapLoader {
        MapLoader {
            files: files.iter().copied().collect(),
            loads: Vec::new(),
        }
    }

    fn run(src: &str, loader: &mut MapLoader) -> (Vec<ScriptNode>, ImportResolver, ErrorList) {
        let mut errors = Vec::new();
        let mut nodes = parse(src, "main", &mut errors);
        let mut resolver = ImportResolver::new(Some("main"), false);
        resolver.process(&mut nodes, loader, &mut errors);
        (nodes, resolver, errors)
    }

    const LIB: &str = "material a { x }\nmaterial b { y }\nambient 1";

    #[test]
    fn named_imports_pick_objects() {
        let mut l = loader(&[("lib", LIB)]);
        let (nodes, resolver, errors) = run("import b from lib\nmaterial m { }", &mut l);
        assert!(errors.is_empty());
        assert_eq!(nodes.len(), 1);
        assert_eq!(render(resolver.table()), "material b { y }");
    }

    #[test]
    fn wildcard_supersedes_earlier_names() {
        let mut l = loader(&[("lib", LIB)]);
        let (_, resolver, _) =
            run("import a from lib\nimport * from lib\nimport b from lib", &mut l);
        assert_eq!(render(resolver.table()), "material a { x } material b { y }");
        assert_eq!(l.loads, vec!["lib"]);
    }

    #[test]
    fn nested_imports_and_inheritance_resolve_before_caching() {
        let mut l = loader(&[
            ("lib", "import base from core\nmaterial a : base { x }"),
            ("core", "material base { lighting off }"),
        ]);
        let (_, resolver, errors) = run("import a from lib", &mut l);
        assert!(errors.is_empty(), "{:?}", errors);
        // Cache order: `lib` is entered before the `core` it imports.
        assert_eq!(
            render(resolver.table()),
            "material a { lighting off x } material base { lighting off }"
        );
    }

    #[test]
    fn cycles_and_self_imports_terminate() {
        let mut l = loader(&[
            ("lib", "import * from main\nimport * from lib\nmaterial a { x }"),
        ]);
        let (_, resolver, errors) = run("import * from lib", &mut l);
        assert!(errors.is_empty());
        assert_eq!(l.loads, vec!["lib"]);
        assert_eq!(render(resolver.table()), "material a { x }");
    }

    #[test]
    fn missing_file_is_skipped() {
        let mut l = loader(&[]);
        let (nodes, resolver, errors) = run("import * from nowhere\nmaterial m { }", &mut l);
        assert!(errors.is_empty());
        assert!(resolver.table().is_empty());
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn malformed_imports_are_reported_and_removed() {
        let mut l = loader(&[]);
        let (nodes, _, errors) = run("import\nimport a\nmaterial m { }", &mut l);
        assert_eq!(nodes.len(), 1);
        let kinds: Vec<ErrorKind> = errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::ImportTargetExpected, ErrorKind::ImportPathExpected]);
    }
}
