use std::collections::{HashMap, HashSet};

use crate::error::ExecutorError;
use crate::executor::types::StageLike;

/// Stage dependency graph (DAG)
#[derive(Debug, Clone)]
pub struct StageGraph<T: StageLike> {
    /// Stage nodes: stage_id -> Stage
    pub nodes: HashMap<String, T>,

    /// Dependency edges: stage_id -> list of dependencies
    pub edges: HashMap<String, Vec<String>>,

    /// Reverse edges: stage_id -> stages that depend on it
    pub reverse_edges: HashMap<String, Vec<String>>,

    /// Declaration order (for stable sorting)
    insertion_order: Vec<String>,
}

impl<T: StageLike> StageGraph<T> {
    /// Construct the graph from stages in declaration order.
    pub fn from_stages(stages: &[T]) -> Result<Self, ExecutorError> {
        let mut nodes = HashMap::new();
        let mut edges = HashMap::new();
        let mut reverse_edges: HashMap<String, Vec<String>> = HashMap::new();
        let mut insertion_order = Vec::new();

        for stage in stages {
            let stage_id = stage.id().to_string();
            if stage_id.trim().is_empty() {
                return Err(ExecutorError::invalid(stage_id, "stage id must not be empty"));
            }
            if nodes.contains_key(&stage_id) {
                return Err(ExecutorError::DuplicateStageId(stage_id));
            }

            let dependencies = stage.dependencies().to_vec();
            for dep in &dependencies {
                reverse_edges
                    .entry(dep.clone())
                    .or_default()
                    .push(stage_id.clone());
            }

            nodes.insert(stage_id.clone(), stage.clone());
            edges.insert(stage_id.clone(), dependencies);
            insertion_order.push(stage_id);
        }

        Ok(Self {
            nodes,
            edges,
            reverse_edges,
            insertion_order,
        })
    }

    /// Validate dependency relationships.
    ///
    /// Unknown dependencies are reported before cycles, both in declaration
    /// order, so the same input always yields the same error.
    pub fn validate(&self) -> Result<(), ExecutorError> {
        for stage_id in &self.insertion_order {
            for dep in self.dependencies_of(stage_id) {
                if !self.nodes.contains_key(dep) {
                    return Err(ExecutorError::DependencyNotFound {
                        stage_id: stage_id.clone(),
                        missing_dep: dep.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = self.detect_cycle() {
            return Err(ExecutorError::CircularDependency(cycle));
        }

        Ok(())
    }

    /// Topological layering using Kahn's algorithm.
    ///
    /// Each wave holds the stages whose dependencies all sit in earlier
    /// waves, ordered by declaration.
    ///
    /// # Time Complexity
    ///
    /// O(V log V + E) where V = number of stages, E = number of dependencies
    pub fn waves(&self) -> Result<Vec<Vec<String>>, ExecutorError> {
        let position: HashMap<&str, usize> = self
            .insertion_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        // edges[A] = [B, C] means A depends on B and C, so A's in-degree = 2
        let mut in_degree: HashMap<&str, usize> = self
            .insertion_order
            .iter()
            .map(|id| (id.as_str(), self.dependencies_of(id).len()))
            .collect();

        let mut waves: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<&str> = self
            .insertion_order
            .iter()
            .map(String::as_str)
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut processed = 0;
        while !current.is_empty() {
            processed += current.len();

            let mut next = Vec::new();
            for stage_id in &current {
                for dependent in self.dependents_of(stage_id) {
                    let Some(degree) = in_degree.get_mut(dependent.as_str()) else {
                        continue;
                    };
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        next.push(dependent.as_str());
                    }
                }
            }
            next.sort_by_key(|id| position.get(id).copied().unwrap_or(usize::MAX));
            next.dedup();

            waves.push(current.iter().map(|id| id.to_string()).collect());
            current = next;
        }

        if processed != self.nodes.len() {
            let cycle = self
                .detect_cycle()
                .unwrap_or_else(|| "unable to complete topological sort".to_string());
            return Err(ExecutorError::CircularDependency(cycle));
        }

        Ok(waves)
    }

    /// Validate, then layer.
    pub fn plan(&self) -> Result<Vec<Vec<String>>, ExecutorError> {
        self.validate()?;
        self.waves()
    }

    pub fn stage(&self, stage_id: &str) -> Option<&T> {
        self.nodes.get(stage_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stage ids in declaration order.
    pub fn ids(&self) -> &[String] {
        &self.insertion_order
    }

    /// Every stage that depends on `stage_id` directly or transitively, in
    /// declaration order. The stage itself is not included.
    pub fn dependents_closure(&self, stage_id: &str) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![stage_id];
        while let Some(current) = stack.pop() {
            for dependent in self.dependents_of(current) {
                if seen.insert(dependent.as_str()) {
                    stack.push(dependent.as_str());
                }
            }
        }
        self.insertion_order
            .iter()
            .filter(|id| id.as_str() != stage_id && seen.contains(id.as_str()))
            .cloned()
            .collect()
    }

    /// Every stage `stage_id` needs, directly or transitively.
    pub fn dependencies_closure(&self, stage_id: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = vec![stage_id];
        while let Some(current) = stack.pop() {
            for dep in self.dependencies_of(current) {
                if seen.insert(dep.clone()) {
                    stack.push(dep.as_str());
                }
            }
        }
        seen
    }

    /// Restrict the graph to `roots`.
    ///
    /// With `with_dependencies` the transitive dependencies of every root are
    /// pulled in; otherwise dependencies outside the selection are pruned
    /// from the selected stages. Declaration order is preserved.
    pub fn select(&self, roots: &[String], with_dependencies: bool) -> Result<Self, ExecutorError> {
        let mut keep: HashSet<String> = HashSet::new();
        for root in roots {
            if !self.nodes.contains_key(root) {
                return Err(ExecutorError::UnknownStage(root.clone()));
            }
            keep.insert(root.clone());
            if with_dependencies {
                keep.extend(self.dependencies_closure(root));
            }
        }

        let selected: Vec<T> = self
            .insertion_order
            .iter()
            .filter(|id| keep.contains(id.as_str()))
            .filter_map(|id| self.nodes.get(id))
            .map(|stage| {
                let mut stage = stage.clone();
                stage.retain_dependencies(&|dep| keep.contains(dep));
                stage
            })
            .collect();

        Self::from_stages(&selected)
    }

    fn dependencies_of(&self, stage_id: &str) -> &[String] {
        self.edges.get(stage_id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn dependents_of(&self, stage_id: &str) -> &[String] {
        self.reverse_edges
            .get(stage_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Detect circular dependencies using DFS, starting from stages in
    /// declaration order.
    fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for stage_id in &self.insertion_order {
            if !visited.contains(stage_id) && self.dfs_cycle(stage_id, &mut visited, &mut stack) {
                return Some(format_cycle_path(&stack));
            }
        }

        None
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> bool {
        visited.insert(node.to_string());
        stack.push(node.to_string());

        for dep in self.dependencies_of(node) {
            if let Some(pos) = stack.iter().position(|x| x == dep) {
                stack.push(dep.clone());
                *stack = stack[pos..].to_vec();
                return true;
            }

            if self.nodes.contains_key(dep)
                && !visited.contains(dep)
                && self.dfs_cycle(dep, visited, stack)
            {
                return true;
            }
        }

        stack.pop();
        false
    }
}

fn format_cycle_path(stack: &[String]) -> String {
    stack.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::Stage;
    use crate::runner::ResolvedCommand;

    fn stage(id: &str, deps: &[&str]) -> Stage {
        Stage::new(id, ResolvedCommand::new("true", ".")).depends_on(deps.iter().copied())
    }

    fn graph(stages: Vec<Stage>) -> StageGraph<Stage> {
        StageGraph::from_stages(&stages).unwrap()
    }

    #[test]
    fn layers_follow_dependencies_and_declaration_order() {
        let g = graph(vec![
            stage("format", &[]),
            stage("lint", &[]),
            stage("typecheck", &[]),
            stage("test", &["format", "lint", "typecheck"]),
            stage("package", &["test"]),
        ]);
        assert_eq!(
            g.plan().unwrap(),
            vec![
                vec!["format", "lint", "typecheck"],
                vec!["test"],
                vec!["package"],
            ]
        );
    }

    #[test]
    fn wave_order_ignores_dependency_listing_order() {
        let g = graph(vec![
            stage("b", &[]),
            stage("a", &[]),
            stage("z", &["a"]),
            stage("y", &["b"]),
        ]);
        assert_eq!(g.plan().unwrap(), vec![vec!["b", "a"], vec!["z", "y"]]);
    }

    #[test]
    fn stage_lands_after_its_deepest_dependency() {
        let g = graph(vec![
            stage("a", &[]),
            stage("b", &["a"]),
            stage("c", &["a", "b"]),
        ]);
        assert_eq!(g.plan().unwrap(), vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn every_stage_appears_once_with_dependencies_earlier() {
        let g = graph(vec![
            stage("e", &["c", "d"]),
            stage("a", &[]),
            stage("d", &["b"]),
            stage("c", &["a"]),
            stage("b", &[]),
        ]);
        let waves = g.plan().unwrap();
        let wave_of: HashMap<&str, usize> = waves
            .iter()
            .enumerate()
            .flat_map(|(i, w)| w.iter().map(move |id| (id.as_str(), i)))
            .collect();
        assert_eq!(wave_of.len(), 5);
        assert_eq!(waves.iter().map(Vec::len).sum::<usize>(), 5);
        for id in g.ids() {
            for dep in g.stage(id).unwrap().dependencies() {
                assert!(wave_of[dep.as_str()] < wave_of[id.as_str()]);
            }
        }
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = StageGraph::from_stages(&[stage("lint", &[]), stage("lint", &[])]).unwrap_err();
        assert!(matches!(err, ExecutorError::DuplicateStageId(id) if id == "lint"));
    }

    #[test]
    fn unknown_dependency_rejected() {
        let g = graph(vec![stage("lint", &[]), stage("test", &["lnt"])]);
        match g.plan().unwrap_err() {
            ExecutorError::DependencyNotFound {
                stage_id,
                missing_dep,
            } => {
                assert_eq!(stage_id, "test");
                assert_eq!(missing_dep, "lnt");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cycle_reported_with_path() {
        let g = graph(vec![
            stage("a", &["c"]),
            stage("b", &["a"]),
            stage("c", &["b"]),
        ]);
        match g.plan().unwrap_err() {
            ExecutorError::CircularDependency(path) => assert_eq!(path, "a -> c -> b -> a"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            g.waves().unwrap_err(),
            ExecutorError::CircularDependency(_)
        ));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let g = graph(vec![stage("a", &["a"])]);
        match g.plan().unwrap_err() {
            ExecutorError::CircularDependency(path) => assert_eq!(path, "a -> a"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dependents_closure_is_transitive() {
        let g = graph(vec![
            stage("lint", &[]),
            stage("format", &[]),
            stage("test", &["lint"]),
            stage("package", &["test"]),
            stage("docs", &["format"]),
        ]);
        assert_eq!(g.dependents_closure("lint"), vec!["test", "package"]);
        assert!(g.dependents_closure("package").is_empty());
    }

    #[test]
    fn select_pulls_in_dependencies() {
        let g = graph(vec![
            stage("format", &[]),
            stage("lint", &[]),
            stage("test", &["lint"]),
            stage("package", &["test"]),
        ]);
        let sel = g.select(&["package".to_string()], true).unwrap();
        assert_eq!(sel.ids(), ["lint", "test", "package"]);
        assert_eq!(
            sel.plan().unwrap(),
            vec![vec!["lint"], vec!["test"], vec!["package"]]
        );
    }

    #[test]
    fn select_only_prunes_outside_dependencies() {
        let g = graph(vec![
            stage("lint", &[]),
            stage("test", &["lint"]),
            stage("package", &["test"]),
        ]);
        let sel = g
            .select(&["package".to_string(), "test".to_string()], false)
            .unwrap();
        assert_eq!(sel.ids(), ["test", "package"]);
        assert!(sel.stage("test").unwrap().dependencies().is_empty());
        assert_eq!(sel.plan().unwrap(), vec![vec!["test"], vec!["package"]]);
    }

    #[test]
    fn select_unknown_root_rejected() {
        let g = graph(vec![stage("lint", &[])]);
        assert!(matches!(
            g.select(&["nope".to_string()], true).unwrap_err(),
            ExecutorError::UnknownStage(id) if id == "nope"
        ));
    }
}
