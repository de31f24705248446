//! Test Fixtures
//!
//! Projects, targets and configurations shared by the integration tests

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use stup::config::{Config, DeploySettings, InitPolicy, ShellConfig};
use stup::deploy::{DeployOptions, DeployPlan};
use stup::models::{Project, ProjectType, SshConfig, Target};

/// A target with sensible defaults
pub fn create_test_target(branch: Option<&str>, protected: bool) -> Target {
    Target {
        description: "test target".to_string(),
        branch: branch.map(str::to_string),
        tag: "live".to_string(),
        ssh: SshConfig {
            url: "sftp://example.org/www".to_string(),
            user: "deploy".to_string(),
            key: "/keys/id_deploy".to_string(),
        },
        protected,
    }
}

/// A project with a single `live` target
pub fn create_test_project(path: &Path, project_type: ProjectType, target: Target) -> Project {
    let mut targets = BTreeMap::new();
    targets.insert("live".to_string(), target);
    Project {
        path: path.to_path_buf(),
        project_type,
        targets,
    }
}

/// Plan for a plain git repository at `/srv/site`
pub fn git_repo_plan(target: Target) -> DeployPlan {
    let project = create_test_project(Path::new("/srv/site"), ProjectType::GitRepo, target);
    let target = project.targets["live"].clone();
    DeployPlan::new("site", &project, "live", &target, "custom")
}

/// Plan for a stubegru checkout at `/srv/stubegru` with its `custom` folder
pub fn stubegru_plan(target: Target) -> DeployPlan {
    let project = create_test_project(Path::new("/srv/stubegru"), ProjectType::Stubegru, target);
    let target = project.targets["live"].clone();
    DeployPlan::new("stubegru", &project, "live", &target, "custom")
}

/// Options with the given policy
pub fn create_test_options(assume_yes: bool, init_policy: InitPolicy) -> DeployOptions {
    DeployOptions::new(
        DeploySettings {
            init_policy,
            ..DeploySettings::default()
        },
        assume_yes,
    )
}

/// Shell settings for a POSIX `sh` with short timeouts
pub fn create_sh_config() -> ShellConfig {
    ShellConfig {
        program: "sh".to_string(),
        response_timeout_secs: 10,
        shutdown_timeout_secs: 5,
        ..ShellConfig::default()
    }
}

/// A complete configuration for one git repository project
pub fn create_test_config(project_path: PathBuf) -> Config {
    let mut config = Config {
        shell: create_sh_config(),
        ..Config::default()
    };
    config.projects.insert(
        "site".to_string(),
        create_test_project(
            &project_path,
            ProjectType::GitRepo,
            create_test_target(None, false),
        ),
    );
    config
}

/// Write an executable `#!/bin/sh` script named `name` into `dir`
#[cfg(unix)]
pub fn write_fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write fake tool");
    let mut permissions = std::fs::metadata(&path)
        .expect("fake tool metadata")
        .permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).expect("make fake tool executable");
    path
}
