//! Phase declarations.

use std::fmt;

use futures::future::BoxFuture;

use crate::error::PhaseError;
use crate::phases::upload_config::UploadConfigData;

/// Execution context handed to every run function.
///
/// Phases never see the concrete type. Each phase family asks for the
/// capability it needs through an accessor that returns `None` unless the
/// context provides it.
pub trait RunData: Send + Sync {
    fn upload_config_data(&self) -> Option<&dyn UploadConfigData> {
        None
    }
}

pub type RunFn = for<'a> fn(&'a dyn RunData) -> BoxFuture<'a, Result<(), PhaseError>>;

/// A named, independently invocable unit of work.
///
/// A phase with children is a pure grouping; leaves carry the run function.
/// Phases are plain data, built once and never mutated.
#[derive(Clone, Default)]
pub struct Phase {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub short: &'static str,
    pub long: &'static str,
    pub example: &'static str,
    /// Names of the command-line flags relevant to this phase.
    pub cmd_flags: Vec<&'static str>,
    pub run: Option<RunFn>,
    pub phases: Vec<Phase>,
}

impl Phase {
    /// True if `name` is this phase's name or one of its aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("cmd_flags", &self.cmd_flags)
            .field("runnable", &self.run.is_some())
            .field("phases", &self.phases)
            .finish()
    }
}
