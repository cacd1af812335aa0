//! The set of directories the engine reads from and writes to.
//!
//! Every path built from an externally influenced name goes through
//! [`crewview_paths::resolve_within`].

use std::path::{Path, PathBuf};

use crewview_paths::{ClaudePaths, NameKind, resolve_within};

use crate::errors::TeamsError;

pub const CONFIG_FILE: &str = "config.json";
pub const INBOXES_DIR: &str = "inboxes";
pub const OUTPUT_EXTENSION: &str = "output";

#[derive(Debug, Clone)]
pub struct DataRoots {
    pub teams: PathBuf,
    pub tasks: PathBuf,
    pub outputs: PathBuf,
    pub archive: PathBuf,
    pub projects: PathBuf,
}

impl DataRoots {
    /// Standard layout under a Claude directory plus explicit output and archive dirs.
    pub fn from_claude(claude: &ClaudePaths, outputs: PathBuf, archive: PathBuf) -> Self {
        Self {
            teams: claude.teams_dir(),
            tasks: claude.tasks_dir(),
            projects: claude.projects_dir(),
            outputs,
            archive,
        }
    }

    /// Everything under one base directory. Use in tests.
    pub fn under(base: &Path) -> Self {
        Self {
            teams: base.join("teams"),
            tasks: base.join("tasks"),
            outputs: base.join("outputs"),
            archive: base.join("archive"),
            projects: base.join("projects"),
        }
    }

    pub fn team_dir(&self, team: &str) -> Result<PathBuf, TeamsError> {
        Ok(resolve_within(&self.teams, team, NameKind::Identifier)?)
    }

    pub fn team_config(&self, team: &str) -> Result<PathBuf, TeamsError> {
        Ok(self.team_dir(team)?.join(CONFIG_FILE))
    }

    pub fn team_tasks_dir(&self, team: &str) -> Result<PathBuf, TeamsError> {
        Ok(resolve_within(&self.tasks, team, NameKind::Identifier)?)
    }

    pub fn inboxes_dir(&self, team: &str) -> Result<PathBuf, TeamsError> {
        Ok(self.team_dir(team)?.join(INBOXES_DIR))
    }

    pub fn inbox_file(&self, team: &str, agent: &str) -> Result<PathBuf, TeamsError> {
        let dir = self.inboxes_dir(team)?;
        let file = resolve_within(&dir, agent, NameKind::Identifier)?;
        Ok(file.with_extension("json"))
    }

    pub fn output_file(&self, id: &str) -> Result<PathBuf, TeamsError> {
        let file = resolve_within(&self.outputs, id, NameKind::Identifier)?;
        Ok(file.with_extension(OUTPUT_EXTENSION))
    }

    pub fn archive_file(&self, filename: &str) -> Result<PathBuf, TeamsError> {
        Ok(resolve_within(&self.archive, filename, NameKind::FileName)?)
    }

    pub fn project_dir(&self, project: &str) -> Result<PathBuf, TeamsError> {
        Ok(resolve_within(&self.projects, project, NameKind::Identifier)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots() -> DataRoots {
        DataRoots::under(Path::new("/data"))
    }

    #[test]
    fn test_layout() {
        let r = roots();
        assert_eq!(
            r.team_config("alpha").unwrap(),
            PathBuf::from("/data/teams/alpha/config.json")
        );
        assert_eq!(
            r.team_tasks_dir("alpha").unwrap(),
            PathBuf::from("/data/tasks/alpha")
        );
        assert_eq!(
            r.inbox_file("alpha", "worker-1").unwrap(),
            PathBuf::from("/data/teams/alpha/inboxes/worker-1.json")
        );
        assert_eq!(
            r.output_file("task_9").unwrap(),
            PathBuf::from("/data/outputs/task_9.output")
        );
        assert_eq!(
            r.archive_file("alpha_x.json").unwrap(),
            PathBuf::from("/data/archive/alpha_x.json")
        );
    }

    #[test]
    fn test_invalid_names_rejected() {
        let r = roots();
        assert!(r.team_dir("../etc").is_err());
        assert!(r.inbox_file("alpha", "../../x").is_err());
        assert!(r.output_file("a.b").is_err());
        assert!(r.archive_file("../alpha.json").is_err());
        assert!(r.project_dir(".ssh").is_err());
        assert!(r.team_dir("a/b").unwrap_err().is_invalid_input());
    }
}
