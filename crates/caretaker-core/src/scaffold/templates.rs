//! File contents written by the scaffolder.

use caretaker_schema::{Stage, Toolchain};
use serde_json::json;

pub fn gitignore() -> &'static str {
    "# Python (venv, conda, poetry)\n\
     __pycache__/\n\
     *.py[cod]\n\
     envs/\n\
     .venv/\n\
     .pytest_cache/\n\
     .mypy_cache/\n\
     *.egg-info/\n\
     dist/\n\
     build/\n\
     \n\
     # Conda\n\
     .conda/\n\
     conda-meta/\n\
     \n\
     # Poetry\n\
     poetry.lock.bak\n\
     \n\
     # Node\n\
     node_modules/\n\
     npm-debug.log*\n\
     .npm/\n\
     .env.local\n\
     \n\
     # Editors and OS\n\
     .DS_Store\n\
     *.swp\n"
}

pub fn index_html(name: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"utf-8\">\n  <title>{name}</title>\n</head>\n<body>\n  <h1>{name}</h1>\n</body>\n</html>\n"
    )
}

/// Entry point placed in `src/`, as `(file name, contents)`.
pub fn entry_point(toolchain: Toolchain, name: &str) -> (&'static str, String) {
    match toolchain {
        Toolchain::Node => (
            "index.js",
            format!("console.log(`{name} running in ${{process.env.NODE_ENV}}`);\n"),
        ),
        _ => (
            "main.py",
            format!("def main() -> None:\n    print(\"{name}\")\n\n\nif __name__ == \"__main__\":\n    main()\n"),
        ),
    }
}

/// Pinned dependencies for one stage of a pip-based project.
pub fn requirements(stage: Stage) -> &'static str {
    match stage {
        Stage::Dev => "-r prod.txt\nblack\nruff\nipython\n",
        Stage::Test => "-r prod.txt\npytest\npytest-cov\n",
        Stage::Prod => "requests\n",
    }
}

pub fn conda_env_name(project: &str, stage: Stage) -> String {
    format!("{project}-{}", stage.as_str())
}

pub fn conda_environment(project: &str, stage: Stage) -> String {
    let extra = match stage {
        Stage::Dev => "  - black\n  - ipython\n",
        Stage::Test => "  - pytest\n",
        Stage::Prod => "",
    };
    format!(
        "name: {env}\nchannels:\n  - conda-forge\ndependencies:\n  - python=3.11\n  - pip\n  - requests\n{extra}",
        env = conda_env_name(project, stage)
    )
}

/// One script that creates or updates every stage environment.
pub fn conda_setup_script(project: &str) -> String {
    let mut out = String::from("#!/bin/bash\nset -e\ncd \"$(dirname \"$0\")\"\n\n");
    for stage in Stage::ALL {
        let env = conda_env_name(project, stage);
        out.push_str(&format!(
            "conda env update --name {env} --file environment.{s}.yml --prune || \\\n  conda env create --file environment.{s}.yml\n",
            s = stage.as_str()
        ));
    }
    out
}

pub fn pyproject(project: &str) -> String {
    format!(
        "[tool.poetry]\nname = \"{project}\"\nversion = \"0.1.0\"\ndescription = \"\"\nauthors = []\npackages = [{{ include = \"*\", from = \"src\" }}]\n\n\
         [tool.poetry.dependencies]\npython = \"^3.11\"\nrequests = \"^2.31\"\n\n\
         [tool.poetry.group.dev.dependencies]\nblack = \"*\"\nruff = \"*\"\n\n\
         [tool.poetry.group.test.dependencies]\npytest = \"*\"\n\n\
         [build-system]\nrequires = [\"poetry-core\"]\nbuild-backend = \"poetry.core.masonry.api\"\n"
    )
}

pub fn poetry_toml() -> &'static str {
    "[virtualenvs]\nin-project = true\n"
}

pub fn node_env_file(project: &str, stage: Stage) -> String {
    let port = match stage {
        Stage::Dev => 3000,
        Stage::Test => 3001,
        Stage::Prod => 8080,
    };
    format!(
        "NODE_ENV={}\nAPP_NAME={project}\nPORT={port}\n",
        stage.node_env()
    )
}

pub fn package_json(project: &str) -> String {
    let manifest = json!({
        "name": project.to_lowercase(),
        "version": "0.1.0",
        "private": true,
        "main": "src/index.js",
        "scripts": {
            "dev": "NODE_ENV=development node --env-file=.env.development src/index.js",
            "test": "NODE_ENV=test node --env-file=.env.test --test tests/",
            "start": "NODE_ENV=production node --env-file=.env.production src/index.js"
        },
        "devDependencies": {}
    });
    pretty(&manifest)
}

pub fn vscode_settings(toolchain: Toolchain) -> String {
    let settings = match toolchain {
        Toolchain::Node => json!({
            "editor.formatOnSave": true,
            "editor.defaultFormatter": "esbenp.prettier-vscode"
        }),
        Toolchain::Venv => json!({
            "editor.formatOnSave": true,
            "python.defaultInterpreterPath": "${workspaceFolder}/envs/dev/bin/python",
            "[python]": { "editor.defaultFormatter": "ms-python.black-formatter" }
        }),
        Toolchain::Poetry => json!({
            "editor.formatOnSave": true,
            "python.defaultInterpreterPath": "${workspaceFolder}/.venv/bin/python",
            "[python]": { "editor.defaultFormatter": "ms-python.black-formatter" }
        }),
        Toolchain::Conda => json!({
            "editor.formatOnSave": true,
            "python.condaPath": "conda",
            "[python]": { "editor.defaultFormatter": "ms-python.black-formatter" }
        }),
    };
    pretty(&settings)
}

pub fn vscode_extensions(toolchain: Toolchain) -> String {
    let recommendations: &[&str] = match toolchain {
        Toolchain::Node => &["dbaeumer.vscode-eslint", "esbenp.prettier-vscode"],
        _ => &[
            "ms-python.python",
            "ms-python.black-formatter",
            "charliermarsh.ruff",
        ],
    };
    pretty(&json!({ "recommendations": recommendations }))
}

/// Script that activates the `$STAGE` environment (default `dev`) and opens
/// the project in the editor.
pub fn open_project_script(toolchain: Toolchain, project: &str, app_name: &str) -> String {
    let activate = match toolchain {
        Toolchain::Venv => "source \"envs/$STAGE/bin/activate\"".to_string(),
        Toolchain::Conda => format!(
            "eval \"$(conda shell.bash hook)\"\nconda activate \"{project}-$STAGE\""
        ),
        Toolchain::Poetry => "source .venv/bin/activate".to_string(),
        Toolchain::Node => "case \"$STAGE\" in\n  dev) ENV_FILE=.env.development ;;\n  test) ENV_FILE=.env.test ;;\n  prod) ENV_FILE=.env.production ;;\nesac\nset -a\nsource \"$ENV_FILE\"\nset +a".to_string(),
    };
    format!(
        "#!/bin/bash\nset -e\ncd \"$(dirname \"$0\")\"\nSTAGE=\"${{STAGE:-dev}}\"\n\n{activate}\n\nopen -a \"{app_name}\" .\n"
    )
}

fn pretty(value: &serde_json::Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gitignore_covers_all_toolchains() {
        let text = gitignore();
        for needle in ["envs/", ".venv/", "conda-meta/", "node_modules/"] {
            assert!(text.contains(needle), "{needle}");
        }
    }

    #[test]
    fn test_package_json_has_stage_scripts() {
        let v: serde_json::Value = serde_json::from_str(&package_json("Demo")).unwrap();
        assert_eq!(v["name"], "demo");
        for script in ["dev", "test", "start"] {
            assert!(v["scripts"][script].is_string(), "{script}");
        }
    }

    #[test]
    fn test_conda_setup_mentions_every_stage() {
        let script = conda_setup_script("demo");
        for stage in Stage::ALL {
            assert!(script.contains(&format!("environment.{}.yml", stage.as_str())));
        }
        assert!(conda_environment("demo", Stage::Test).starts_with("name: demo-test\n"));
    }

    #[test]
    fn test_open_script_uses_stage() {
        let s = open_project_script(Toolchain::Venv, "demo", "Cursor");
        assert!(s.contains("envs/$STAGE/bin/activate"));
        assert!(s.contains("open -a \"Cursor\" ."));
    }
}
