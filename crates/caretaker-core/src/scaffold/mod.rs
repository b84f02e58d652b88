//! Project scaffolding.
//!
//! Everything up to and including creation of the project directory is
//! fatal on failure. Every step after that is additive: a failure is
//! recorded as a warning and the remaining steps still run, with nothing
//! rolled back.

pub mod templates;

use crate::context::Context;
use crate::error::{CoreError, Result};
use crate::exec::Invocation;
use crate::outcome::Outcome;
use crate::paths::normalize;
use crate::retry::with_backoff;
use caretaker_schema::{Stage, Toolchain};
use serde::{Deserialize, Serialize};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Metadata file recording how a project was created.
pub const METADATA_FILE: &str = ".caretaker-project.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub root: PathBuf,
    pub toolchain: Toolchain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    pub toolchain: Toolchain,
    pub created_at: String,
}

/// Keep only ASCII letters, digits, `-` and `_`.
///
/// ```
/// assert_eq!(caretaker_core::scaffold::sanitize("test project!@#"), "testproject");
/// ```
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// The projects directory, corrected to the shared tree if the configured
/// one drifted.
pub fn projects_root(ctx: &Context) -> Outcome<PathBuf> {
    let expected = ctx.locations.projects_dir();
    let mut outcome = Outcome::clean(expected.clone());
    if let Some(configured) = &ctx.config.project.projects_dir {
        if normalize(configured) != normalize(&expected) {
            outcome.warn(
                "projects directory",
                format!(
                    "{} drifted from the shared location, using {}",
                    configured.display(),
                    expected.display()
                ),
            );
        }
    }
    outcome
}

/// Read a project's metadata, if it has any.
pub fn read_metadata(root: &Path) -> Option<ProjectMetadata> {
    let text = fs::read_to_string(root.join(METADATA_FILE)).ok()?;
    serde_json::from_str(&text).ok()
}

/// Create (or extend) a project named `name` using `toolchain`.
///
/// A name changed by sanitization must be confirmed first. An existing
/// project created with a different toolchain is rejected.
pub fn setup_project(ctx: &Context, name: &str, toolchain: Toolchain) -> Result<Outcome<Project>> {
    let clean = sanitize(name);
    if clean.is_empty() {
        return Err(CoreError::Validation(format!(
            "project name '{name}' has no usable characters (letters, digits, '-', '_')"
        )));
    }
    if clean != name
        && !ctx
            .prompt
            .confirm(&format!("Project name '{name}' will be created as '{clean}'. Continue?"))
    {
        return Err(CoreError::Cancelled(format!("project '{clean}' not created")));
    }

    let mut outcome = Outcome::clean(());
    let projects = outcome.absorb(projects_root(ctx));
    let root = projects.join(&clean);

    if let Some(existing) = read_metadata(&root) {
        if existing.toolchain != toolchain {
            return Err(CoreError::Validation(format!(
                "project '{clean}' already uses {}; the toolchain cannot be changed to {}",
                existing.toolchain.as_str(),
                toolchain.as_str()
            )));
        }
    }

    ctx.reporter.section(&format!("Project {clean} ({})", toolchain.as_str()));
    for dir in ["src", "public", "tests"] {
        fs::create_dir_all(root.join(dir)).map_err(|e| {
            CoreError::context("Failed to create project directory", format!("{}: {e}", root.display()))
        })?;
    }
    tracing::info!(project = %clean, root = %root.display(), toolchain = toolchain.as_str(), "scaffolding");

    let project = Project {
        name: clean,
        root,
        toolchain,
    };
    let mut s = Scaffold {
        ctx,
        project: &project,
        outcome,
    };

    s.step("layout", Scaffold::layout);
    s.step("environment", |s| match toolchain {
        Toolchain::Venv => s.venv(),
        Toolchain::Conda => s.conda(),
        Toolchain::Poetry => s.poetry(),
        Toolchain::Node => s.node(),
    });
    s.step("git", Scaffold::git);
    s.step("editor", Scaffold::editor);
    s.step("metadata", Scaffold::metadata);

    let Scaffold { outcome, .. } = s;
    Ok(outcome.map(|()| project))
}

struct Scaffold<'a> {
    ctx: &'a Context,
    project: &'a Project,
    outcome: Outcome<()>,
}

impl Scaffold<'_> {
    fn step(&mut self, name: &str, f: impl FnOnce(&mut Self) -> Result<()>) {
        self.ctx.reporter.step("Scaffolding", name);
        if let Err(e) = f(self) {
            self.outcome.warn(format!("scaffold {name}"), e);
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.project.root.join(rel)
    }

    fn write(&self, rel: &str, content: &str) -> Result<()> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(())
    }

    fn write_script(&self, rel: &str, content: &str) -> Result<()> {
        self.write(rel, content)?;
        fs::set_permissions(self.path(rel), fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    /// Run a command in the project root, retrying flaky ones.
    fn run_retried(&mut self, label: &str, inv: &Invocation) {
        let runner = &self.ctx.runner;
        let retried = with_backoff(label, self.ctx.retry_policy(), |_| runner.run_checked(inv));
        self.outcome.absorb(retried);
    }

    fn invocation(&self, program: &str) -> Invocation {
        Invocation::new(program).current_dir(&self.project.root)
    }

    fn layout(&mut self) -> Result<()> {
        let name = &self.project.name;
        let (entry, code) = templates::entry_point(self.project.toolchain, name);
        self.write(&format!("src/{entry}"), &code)?;
        self.write("public/index.html", &templates::index_html(name))?;
        self.write("tests/.gitkeep", "")
    }

    fn venv(&mut self) -> Result<()> {
        for stage in Stage::ALL {
            self.write(
                &format!("requirements/{}.txt", stage.as_str()),
                templates::requirements(stage),
            )?;
        }
        for stage in Stage::ALL {
            let env_dir = format!("envs/{}", stage.as_str());
            let create = self
                .invocation("python3")
                .args(["-m", "venv", env_dir.as_str()]);
            self.ctx.runner.run_checked(&create)?;

            let pip = self.path(&format!("{env_dir}/bin/pip"));
            let upgrade = self
                .invocation(&pip.to_string_lossy())
                .args(["install", "--upgrade", "pip"]);
            self.run_retried(&format!("pip upgrade ({})", stage.as_str()), &upgrade);
        }
        Ok(())
    }

    fn conda(&mut self) -> Result<()> {
        let name = &self.project.name;
        for stage in Stage::ALL {
            self.write(
                &format!("environment.{}.yml", stage.as_str()),
                &templates::conda_environment(name, stage),
            )?;
        }
        self.write_script("setup_conda.sh", &templates::conda_setup_script(name))?;

        // Environments are created by setup_conda.sh; only check the tool exists
        let probe = self.invocation("conda").arg("--version");
        if let Err(e) = self.ctx.runner.run_checked(&probe) {
            self.outcome
                .warn("conda", format!("conda not available, run setup_conda.sh later: {e}"));
        }
        Ok(())
    }

    fn poetry(&mut self) -> Result<()> {
        self.write("pyproject.toml", &templates::pyproject(&self.project.name))?;
        self.write("poetry.toml", templates::poetry_toml())?;

        let local = self
            .invocation("poetry")
            .args(["config", "virtualenvs.in-project", "true", "--local"]);
        self.ctx.runner.run_checked(&local)?;

        let lock = self.invocation("poetry").arg("lock");
        self.run_retried("poetry lock", &lock);
        Ok(())
    }

    fn node(&mut self) -> Result<()> {
        let name = &self.project.name;
        for stage in Stage::ALL {
            self.write(
                &format!(".env.{}", stage.node_env()),
                &templates::node_env_file(name, stage),
            )?;
        }
        self.write("package.json", &templates::package_json(name))?;

        let install = self.invocation("npm").arg("install");
        self.run_retried("npm install", &install);
        Ok(())
    }

    fn git(&mut self) -> Result<()> {
        self.write(".gitignore", templates::gitignore())?;
        if self.path(".git").exists() {
            tracing::debug!("repository already initialized");
            return Ok(());
        }
        let runner = &self.ctx.runner;
        runner.run_checked(&self.invocation("git").arg("init"))?;
        runner.run_checked(&self.invocation("git").args(["add", "-A"]))?;
        runner.run_checked(
            &self
                .invocation("git")
                .args(["commit", "-m", "Initial project skeleton"]),
        )?;
        Ok(())
    }

    fn editor(&mut self) -> Result<()> {
        let tc = self.project.toolchain;
        self.write(".vscode/settings.json", &templates::vscode_settings(tc))?;
        self.write(".vscode/extensions.json", &templates::vscode_extensions(tc))?;
        self.write_script(
            "open_project.sh",
            &templates::open_project_script(tc, &self.project.name, &self.ctx.config.app.name),
        )
    }

    fn metadata(&mut self) -> Result<()> {
        if read_metadata(&self.project.root).is_some() {
            return Ok(());
        }
        let meta = ProjectMetadata {
            name: self.project.name.clone(),
            toolchain: self.project.toolchain,
            created_at: chrono::Local::now().to_rfc3339(),
        };
        let text = serde_json::to_string_pretty(&meta)
            .map_err(|e| CoreError::context("Failed to encode project metadata", e))?;
        self.write(METADATA_FILE, &text)
    }
}
