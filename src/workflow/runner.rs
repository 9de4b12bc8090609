//! Resolve phases by name and run them in declaration order.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::WorkflowError;
use crate::workflow::phase::{Phase, RunData, RunFn};

/// Separator between a parent and child in a full phase name.
pub const PATH_SEPARATOR: char = '/';

/// One row of [`Runner::describe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSummary {
    pub name: String,
    pub aliases: Vec<&'static str>,
    pub short: &'static str,
    pub flags: Vec<&'static str>,
    pub depth: usize,
}

pub struct Runner {
    phases: Vec<Phase>,
    skip: HashSet<String>,
}

impl Runner {
    /// Build a runner, rejecting siblings that share a name.
    pub fn new(phases: Vec<Phase>) -> Result<Self, WorkflowError> {
        ensure_unique_names("", &phases)?;
        Ok(Self {
            phases,
            skip: HashSet::new(),
        })
    }

    /// Skip these full phase names (`parent/child`). Skipping a parent
    /// skips all of its children.
    pub fn with_skip_phases<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip.extend(names.into_iter().map(Into::into));
        self
    }

    /// Resolve `path` (names or aliases, each element may itself contain `/`)
    /// to a phase and its canonical full name.
    pub fn find(&self, path: &[String]) -> Result<(String, &Phase), WorkflowError> {
        let segments: Vec<&str> = path
            .iter()
            .flat_map(|p| p.split(PATH_SEPARATOR))
            .filter(|s| !s.is_empty())
            .collect();

        let unknown = || WorkflowError::UnknownPhase(segments.join("/"));

        let mut level = &self.phases;
        let mut found: Option<&Phase> = None;
        let mut names = Vec::with_capacity(segments.len());
        for segment in &segments {
            let phase = level
                .iter()
                .find(|p| p.answers_to(segment))
                .ok_or_else(unknown)?;
            names.push(phase.name);
            level = &phase.phases;
            found = Some(phase);
        }

        let phase = found.ok_or_else(unknown)?;
        Ok((names.join("/"), phase))
    }

    /// Runnable phases addressed by `path`, in execution order.
    ///
    /// An empty path selects every top-level phase.
    pub fn plan(&self, path: &[String]) -> Result<Vec<(String, RunFn)>, WorkflowError> {
        let mut planned = Vec::new();

        if path.iter().all(|p| p.trim_matches(PATH_SEPARATOR).is_empty()) {
            for phase in &self.phases {
                self.collect(phase.name.to_string(), phase, &mut planned);
            }
        } else {
            let (name, phase) = self.find(path)?;
            self.collect(name, phase, &mut planned);
        }

        Ok(planned)
    }

    fn collect(&self, name: String, phase: &Phase, planned: &mut Vec<(String, RunFn)>) {
        if self.skip.contains(&name) {
            debug!("Skipping phase {}", name);
            return;
        }
        if let Some(run) = phase.run {
            planned.push((name.clone(), run));
        }
        for child in &phase.phases {
            self.collect(format!("{}{}{}", name, PATH_SEPARATOR, child.name), child, planned);
        }
    }

    /// Run the phases addressed by `path`, stopping at the first failure.
    ///
    /// Returns the full names of the phases that ran.
    pub async fn run(
        &self,
        path: &[String],
        data: &dyn RunData,
    ) -> Result<Vec<String>, WorkflowError> {
        let planned = self.plan(path)?;
        let mut executed = Vec::with_capacity(planned.len());

        for (name, run) in planned {
            info!("Running phase {}", name);
            if let Err(source) = run(data).await {
                return Err(WorkflowError::Phase { name, source });
            }
            executed.push(name);
        }

        Ok(executed)
    }

    /// Flat, depth-first listing of the phase tree.
    pub fn describe(&self) -> Vec<PhaseSummary> {
        fn walk(prefix: &str, phases: &[Phase], depth: usize, out: &mut Vec<PhaseSummary>) {
            for phase in phases {
                let name = if prefix.is_empty() {
                    phase.name.to_string()
                } else {
                    format!("{}{}{}", prefix, PATH_SEPARATOR, phase.name)
                };
                out.push(PhaseSummary {
                    name: name.clone(),
                    aliases: phase.aliases.to_vec(),
                    short: phase.short,
                    flags: phase.cmd_flags.clone(),
                    depth,
                });
                walk(&name, &phase.phases, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        walk("", &self.phases, 0, &mut out);
        out
    }
}

fn ensure_unique_names(parent: &str, phases: &[Phase]) -> Result<(), WorkflowError> {
    let mut seen = HashSet::new();
    for phase in phases {
        let name = if parent.is_empty() {
            phase.name.to_string()
        } else {
            format!("{}{}{}", parent, PATH_SEPARATOR, phase.name)
        };
        let labels = std::iter::once(phase.name).chain(phase.aliases.iter().copied());
        for label in labels {
            if !seen.insert(label) {
                return Err(WorkflowError::DuplicatePhase { name });
            }
        }
        ensure_unique_names(&name, &phase.phases)?;
    }
    Ok(())
}
