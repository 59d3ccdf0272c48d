//! Subcommand handlers.

use crate::cli::{CliError, Commands};
use qlrun_codeql::{CodeQl, python_setup};
use qlrun_core::{AnalysisLimits, Error, JobState, TokioProcessRunner, export_variable};
use qlrun_tools_bundle::{
    AcquireOptions, ActionRepository, BundleLocator, DirToolCache, LocatorConfig, ToolAcquirer,
    ToolSetup,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

/// Settings for the `setup` subcommand.
#[derive(Debug, Clone, Default)]
pub struct SetupArgs {
    /// Token for the GitHub servers hosting the bundle.
    pub token: String,
    /// Explicit bundle URL.
    pub tools: Option<String>,
    /// Current GitHub server.
    pub server_url: String,
    /// Explicit action repository.
    pub action_repository: Option<String>,
    /// Runner temp directory.
    pub runner_temp: Option<PathBuf>,
    /// Tool cache root.
    pub tool_cache: Option<PathBuf>,
}

/// Run one subcommand.
///
/// `codeql` is the command path from `--codeql`; without it the path is read
/// from `CODEQL_ACTION_CMD`.
///
/// # Errors
///
/// Returns the failure of the stage, mapped to a CLI error.
pub async fn execute(command: Commands, codeql: Option<PathBuf>) -> Result<(), CliError> {
    match command {
        Commands::Setup {
            token,
            tools,
            server_url,
            action_repository,
            runner_temp,
            tool_cache,
        } => {
            let args = SetupArgs {
                token,
                tools,
                server_url,
                action_repository,
                runner_temp,
                tool_cache,
            };
            let mut state = JobState::new();
            let setup = setup(&args, &mut state).await?;
            state.export()?;
            write_stdout(&setup.command_path.display().to_string())
        }
        Commands::Version => Ok(invoker(codeql)?.print_version().await?),
        Commands::TracerEnv {
            database,
            compiler_spec,
        } => {
            let env = invoker(codeql)?
                .get_tracer_env(&database, compiler_spec.as_deref())
                .await?;
            let json = serde_json::to_string_pretty(&env)
                .map_err(|e| CliError::stage(format!("JSON serialization failed: {e}")))?;
            write_stdout(&json)
        }
        Commands::Init {
            database,
            language,
            source_root,
        } => Ok(invoker(codeql)?
            .database_init(&database, &language, &source_root)
            .await?),
        Commands::Autobuild { language } => Ok(invoker(codeql)?.run_autobuild(&language).await?),
        Commands::Extract { database, language } => Ok(invoker(codeql)?
            .extract_scanned_language(&database, &language)
            .await?),
        Commands::Finalize { database } => Ok(invoker(codeql)?.finalize_database(&database).await?),
        Commands::ResolveQueries { queries } => {
            let output = invoker(codeql)?.resolve_queries(&queries).await?;
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| CliError::stage(format!("JSON serialization failed: {e}")))?;
            write_stdout(&json)
        }
        Commands::Analyze {
            database,
            sarif,
            suite,
            ram,
            threads,
        } => Ok(invoker(codeql)?
            .with_limits(AnalysisLimits::new(ram, threads))
            .database_analyze(&database, &sarif, &suite)
            .await?),
        Commands::PythonSetup { python } => {
            let setup = python_setup(&TokioProcessRunner, &python).await?;
            let mut lines = Vec::new();
            for (name, value) in setup.variables() {
                export_variable(name, value)?;
                lines.push(format!("{name}={value}"));
            }
            write_stdout(&lines.join("\n"))
        }
        Commands::DumpEnv { file } => Ok(qlrun_codeql::dump_env(&file)?),
    }
}

/// Acquire the bundle and record its command path in `state`.
///
/// # Errors
///
/// Returns a configuration error for an empty token, otherwise whatever
/// acquisition fails with.
pub async fn setup(args: &SetupArgs, state: &mut JobState) -> Result<ToolSetup, CliError> {
    if args.token.trim().is_empty() {
        return Err(CliError::config_with_help(
            "An access token is required to download the CodeQL bundle",
            "Pass --token or set INPUT_TOKEN",
        ));
    }

    let exe = std::env::current_exe().map_err(|e| Error::io_no_path(e, "current_exe"))?;
    let repository = ActionRepository::detect(
        args.action_repository.as_deref(),
        args.runner_temp.as_deref(),
        &exe,
    )?;
    info!(repository = %repository, server = %args.server_url, "Setting up CodeQL");

    let config = LocatorConfig::new(args.token.clone())
        .with_server_url(args.server_url.clone())
        .with_action_repository(repository);
    let locator = BundleLocator::new(config)?;
    let cache = args
        .tool_cache
        .as_deref()
        .map_or_else(DirToolCache::default, DirToolCache::new);
    let options = AcquireOptions::default().with_tools_url(args.tools.clone());

    let acquirer = ToolAcquirer::new(cache, locator, options);
    Ok(acquirer.acquire(state).await?)
}

fn invoker(codeql: Option<PathBuf>) -> Result<CodeQl, CliError> {
    let state = codeql.map_or_else(JobState::from_env, JobState::with_command_path);
    Ok(CodeQl::from_state(&state)?)
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}")
        .and_then(|()| stdout.flush())
        .map_err(|e| CliError::from(Error::io_no_path(e, "write stdout")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{EXIT_CLI, EXIT_EVAL, exit_code_for};

    #[tokio::test]
    async fn test_stage_without_codeql_path() {
        let err = temp_env::async_with_vars([("CODEQL_ACTION_CMD", None::<&str>)], async {
            execute(Commands::Version, None).await.unwrap_err()
        })
        .await;
        assert_eq!(exit_code_for(&err), EXIT_CLI);
        assert!(err.to_string().contains("CODEQL_ACTION_CMD"));
    }

    #[test]
    fn test_invoker_falls_back_to_exported_path() {
        temp_env::with_var("CODEQL_ACTION_CMD", Some("/t/codeql/codeql"), || {
            let codeql = invoker(None).unwrap();
            assert_eq!(codeql.command_path(), std::path::Path::new("/t/codeql/codeql"));
            let explicit = invoker(Some(PathBuf::from("/other/codeql"))).unwrap();
            assert_eq!(explicit.command_path(), std::path::Path::new("/other/codeql"));
        });
    }

    #[tokio::test]
    async fn test_setup_needs_runner_temp_without_repository() {
        let args = SetupArgs {
            token: "t".to_string(),
            server_url: "https://github.com".to_string(),
            ..SetupArgs::default()
        };
        let mut state = JobState::new();
        let err = setup(&args, &mut state).await.unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_CLI);
        assert!(err.to_string().contains("RUNNER_TEMP"));
    }

    #[tokio::test]
    async fn test_python_setup_with_missing_interpreter() {
        let err = execute(
            Commands::PythonSetup {
                python: PathBuf::from("/nonexistent/python3"),
            },
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_EVAL);
    }

    #[tokio::test]
    async fn test_setup_rejects_empty_token() {
        let args = SetupArgs {
            token: "  ".to_string(),
            ..SetupArgs::default()
        };
        let mut state = JobState::new();
        let err = setup(&args, &mut state).await.unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_CLI);
        assert!(state.command_path().is_err());
    }

    #[tokio::test]
    async fn test_dump_env_subcommand() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("env.json");
        execute(Commands::DumpEnv { file: file.clone() }, None)
            .await
            .unwrap();
        let content = std::fs::read_to_string(&file).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&content).unwrap().is_object());
    }
}
