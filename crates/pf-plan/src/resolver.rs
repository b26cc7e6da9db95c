// resolver.rs — Dependency ordering for a file manifest.
//
// Edge A -> B means "A depends on B", so B is generated first. Kahn's
// algorithm with the ready set ordered by declaration index: whenever several
// files are ready, the one declared earliest wins. The output is therefore
// fully determined by the manifest.

use std::collections::{BTreeSet, HashMap};

use crate::error::PlanError;
use crate::manifest::FileManifestEntry;

/// Order `entries` so every file follows all of its dependencies.
///
/// Fails with `DuplicatePath` or `UnknownDependency` before ordering, and with
/// `Cycle` (naming every unresolvable path in declaration order) when the
/// graph is not acyclic. A file depending on itself is a cycle.
pub fn resolve(entries: &[FileManifestEntry]) -> Result<Vec<String>, PlanError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        if index.insert(entry.path.as_str(), i).is_some() {
            return Err(PlanError::DuplicatePath(entry.path.clone()));
        }
    }

    // dependents[b] lists every a with a -> b; in_degree[a] counts a's distinct deps.
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
    let mut in_degree: Vec<usize> = vec![0; entries.len()];
    for (a, entry) in entries.iter().enumerate() {
        let mut seen = BTreeSet::new();
        for dep in &entry.dependencies {
            let b = *index
                .get(dep.as_str())
                .ok_or_else(|| PlanError::UnknownDependency {
                    path: entry.path.clone(),
                    missing: dep.clone(),
                })?;
            if seen.insert(b) {
                dependents[b].push(a);
                in_degree[a] += 1;
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..entries.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(entries.len());

    while let Some(next) = ready.pop_first() {
        order.push(entries[next].path.clone());
        for &a in &dependents[next] {
            in_degree[a] -= 1;
            if in_degree[a] == 0 {
                ready.insert(a);
            }
        }
    }

    if order.len() < entries.len() {
        let cycle = entries
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, e)| e.path.clone())
            .collect();
        return Err(PlanError::Cycle { cycle });
    }

    tracing::debug!(files = order.len(), "resolved generation order");
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, deps: &[&str]) -> FileManifestEntry {
        deps.iter()
            .fold(FileManifestEntry::new(path, "a file"), |e, d| e.depends_on(*d))
    }

    fn position(order: &[String], path: &str) -> usize {
        order.iter().position(|p| p == path).unwrap()
    }

    #[test]
    fn dependency_comes_first() {
        let order = resolve(&[entry("b.ts", &["a.ts"]), entry("a.ts", &[])]).unwrap();
        assert_eq!(order, vec!["a.ts", "b.ts"]);
    }

    #[test]
    fn independent_files_keep_declaration_order() {
        let order = resolve(&[entry("c", &[]), entry("a", &[]), entry("b", &[])]).unwrap();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn every_edge_is_respected_in_a_diamond() {
        let entries = vec![
            entry("app", &["ui", "api"]),
            entry("ui", &["types"]),
            entry("api", &["types"]),
            entry("types", &[]),
        ];
        let order = resolve(&entries).unwrap();
        assert_eq!(order.len(), 4);
        for e in &entries {
            for dep in &e.dependencies {
                assert!(position(&order, dep) < position(&order, &e.path));
            }
        }
        // Ties among ready files break by declaration order.
        assert_eq!(order, vec!["types", "ui", "api", "app"]);
    }

    #[test]
    fn repeated_dependency_counts_once() {
        let order = resolve(&[entry("b", &["a", "a"]), entry("a", &[])]).unwrap();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn two_node_cycle_is_reported() {
        let err = resolve(&[entry("a", &["b"]), entry("b", &["a"])]).unwrap_err();
        assert_eq!(
            err,
            PlanError::Cycle {
                cycle: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = resolve(&[entry("a", &["a"])]).unwrap_err();
        assert!(matches!(err, PlanError::Cycle { cycle } if cycle == vec!["a"]));
    }

    #[test]
    fn cycle_names_only_unresolvable_paths() {
        let err = resolve(&[
            entry("root", &[]),
            entry("x", &["y", "root"]),
            entry("y", &["x"]),
        ])
        .unwrap_err();
        assert!(matches!(err, PlanError::Cycle { cycle } if cycle == vec!["x", "y"]));
    }

    #[test]
    fn unknown_dependency_names_both_paths() {
        let err = resolve(&[entry("a.ts", &["missing.ts"])]).unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownDependency {
                path: "a.ts".to_string(),
                missing: "missing.ts".to_string()
            }
        );
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let err = resolve(&[entry("a", &[]), entry("a", &[])]).unwrap_err();
        assert_eq!(err, PlanError::DuplicatePath("a".to_string()));
    }

    #[test]
    fn empty_manifest_resolves_to_nothing() {
        assert!(resolve(&[]).unwrap().is_empty());
    }
}
