//! The [`CodeQl`] invoker.

use qlrun_core::{
    AnalysisLimits, Error, JobState, ProcessOutput, ProcessRunner, ProcessSpec, Result,
    TokioProcessRunner,
};
use qlrun_tools_bundle::{PlatformTag, ToolSetup};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::autobuild::{JAVA_TOOL_OPTIONS_VAR, augment_java_tool_options};
use crate::queries::ResolveQueriesOutput;
use crate::tracer::{self, TracerEnv};

/// Hidden subcommand of the `qlrun` binary that writes the environment to a file.
const DUMP_ENV_SUBCOMMAND: &str = "dump-env";

/// Typed handle on one CodeQL executable.
///
/// Cheap to clone; the process runner is shared.
#[derive(Clone)]
pub struct CodeQl {
    cmd: PathBuf,
    platform: PlatformTag,
    runner: Arc<dyn ProcessRunner>,
    env_dumper: Vec<String>,
    temp_dir: PathBuf,
    limits: AnalysisLimits,
}

impl std::fmt::Debug for CodeQl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeQl")
            .field("cmd", &self.cmd)
            .field("platform", &self.platform)
            .field("env_dumper", &self.env_dumper)
            .field("temp_dir", &self.temp_dir)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl CodeQl {
    /// Create an invoker for the executable at `cmd` on the host platform.
    ///
    /// The environment dumper defaults to this executable's `dump-env`
    /// subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the host platform is unsupported or the current
    /// executable cannot be located.
    pub fn new(cmd: impl Into<PathBuf>) -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| Error::io_no_path(e, "current_exe"))?;
        Ok(Self {
            cmd: cmd.into(),
            platform: PlatformTag::current()?,
            runner: Arc::new(TokioProcessRunner),
            env_dumper: vec![
                exe.display().to_string(),
                DUMP_ENV_SUBCOMMAND.to_string(),
            ],
            temp_dir: std::env::temp_dir(),
            limits: AnalysisLimits::default(),
        })
    }

    /// Create an invoker for the path recorded by setup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPersistedState`] if setup has not run.
    pub fn from_state(state: &JobState) -> Result<Self> {
        Self::new(state.command_path()?)
    }

    /// Create an invoker for a freshly acquired distribution.
    ///
    /// # Errors
    ///
    /// Returns an error if the current executable cannot be located.
    pub fn from_setup(setup: &ToolSetup) -> Result<Self> {
        Ok(Self::new(&setup.command_path)?.with_platform(setup.platform))
    }

    /// Use a different process runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Override the platform used for script suffixes.
    #[must_use]
    pub fn with_platform(mut self, platform: PlatformTag) -> Self {
        self.platform = platform;
        self
    }

    /// Override the command run under the tracer to capture its environment.
    /// The env file path is appended as the final argument.
    #[must_use]
    pub fn with_env_dumper<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env_dumper = command.into_iter().map(Into::into).collect();
        self
    }

    /// Directory for scratch files such as the tracer env file.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Resource limits for `database analyze`.
    #[must_use]
    pub fn with_limits(mut self, limits: AnalysisLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Path of the CodeQL executable.
    #[must_use]
    pub fn command_path(&self) -> &Path {
        &self.cmd
    }

    fn dist_root(&self) -> &Path {
        self.cmd.parent().unwrap_or_else(|| Path::new("."))
    }

    fn command(&self) -> ProcessSpec {
        ProcessSpec::new(&self.cmd)
    }

    async fn run(&self, spec: ProcessSpec) -> Result<ProcessOutput> {
        debug!(program = %spec.program.display(), args = ?spec.args, "Invoking");
        self.runner.run(&spec).await?.check(&spec)
    }

    /// Print the CLI version to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if the process fails.
    pub async fn print_version(&self) -> Result<()> {
        self.run(self.command().arg("version")).await?;
        Ok(())
    }

    /// Capture the environment a traced build needs.
    ///
    /// # Errors
    ///
    /// Returns an error if the process fails or the environment dumper
    /// leaves no readable JSON behind.
    pub async fn get_tracer_env(
        &self,
        database: &Path,
        compiler_spec: Option<&str>,
    ) -> Result<TracerEnv> {
        let env_file = tracer::env_file_path(&self.temp_dir);
        let mut spec = self
            .command()
            .args(["database", "trace-command"])
            .arg(database.display().to_string());
        if let Some(compiler_spec) = compiler_spec {
            spec = spec.arg(format!("--compiler-spec={compiler_spec}"));
        }
        let spec = spec
            .args(self.env_dumper.iter().cloned())
            .arg(env_file.display().to_string());

        info!(database = %database.display(), "Capturing tracer environment");
        self.run(spec).await?;
        tracer::read_env_file(&env_file).await
    }

    /// Create an empty database for `language`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process fails.
    pub async fn database_init(
        &self,
        database: &Path,
        language: &str,
        source_root: &Path,
    ) -> Result<()> {
        info!(database = %database.display(), language, "Initializing database");
        let spec = self
            .command()
            .args(["database", "init"])
            .arg(database.display().to_string())
            .arg(format!("--language={language}"))
            .arg(format!("--source-root={}", source_root.display()));
        self.run(spec).await?;
        Ok(())
    }

    /// Run the language's bundled autobuild script.
    ///
    /// # Errors
    ///
    /// Returns an error if the script fails.
    pub async fn run_autobuild(&self, language: &str) -> Result<()> {
        let script = self
            .dist_root()
            .join(language)
            .join("tools")
            .join(format!("autobuild{}", self.platform.script_suffix()));
        let existing = std::env::var(JAVA_TOOL_OPTIONS_VAR).ok();
        let options = augment_java_tool_options(existing.as_deref());

        info!(language, script = %script.display(), "Running autobuild");
        self.run(ProcessSpec::new(script).env(JAVA_TOOL_OPTIONS_VAR, options))
            .await?;
        Ok(())
    }

    /// Extract a language that needs no build, such as JavaScript or Python.
    ///
    /// # Errors
    ///
    /// Returns an error if either process fails or the extractor location
    /// cannot be parsed.
    pub async fn extract_scanned_language(&self, database: &Path, language: &str) -> Result<()> {
        let resolve = self
            .command()
            .args(["resolve", "extractor", "--format=json"])
            .arg(format!("--language={language}"))
            .capture_stdout();
        let output = self.run(resolve).await?;
        let extractor: PathBuf = serde_json::from_str::<String>(output.stdout.trim())
            .map_err(|e| Error::output_parse("resolve extractor", e.to_string()))?
            .into();
        debug!(language, extractor = %extractor.display(), "Resolved extractor");

        let script = extractor
            .join("tools")
            .join(format!("autobuild{}", self.platform.script_suffix()));
        info!(database = %database.display(), language, "Extracting");
        let trace = self
            .command()
            .args(["database", "trace-command"])
            .arg(database.display().to_string())
            .arg("--")
            .arg(script.display().to_string());
        self.run(trace).await?;
        Ok(())
    }

    /// Finalize a populated database.
    ///
    /// # Errors
    ///
    /// Returns an error if the process fails.
    pub async fn finalize_database(&self, database: &Path) -> Result<()> {
        info!(database = %database.display(), "Finalizing database");
        let spec = self
            .command()
            .args(["database", "finalize"])
            .arg(database.display().to_string());
        self.run(spec).await?;
        Ok(())
    }

    /// Group `queries` by the language they target.
    ///
    /// # Errors
    ///
    /// Returns an error if the process fails or its output is malformed.
    pub async fn resolve_queries(&self, queries: &[String]) -> Result<ResolveQueriesOutput> {
        let spec = self
            .command()
            .args(["resolve", "queries"])
            .args(queries.iter().cloned())
            .arg("--format=bylanguage")
            .capture_stdout();
        let output = self.run(spec).await?;
        ResolveQueriesOutput::from_json(&output.stdout)
    }

    /// Run `query_suite` against a finalized database, writing SARIF to `sarif`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid limits, or an error if the
    /// process fails.
    pub async fn database_analyze(
        &self,
        database: &Path,
        sarif: &Path,
        query_suite: &str,
    ) -> Result<()> {
        let ram = self.limits.memory_flag()?;
        let threads = self.limits.threads_flag()?;
        info!(database = %database.display(), suite = query_suite, %ram, %threads, "Analyzing");
        let spec = self
            .command()
            .args(["database", "analyze"])
            .arg(ram)
            .arg(threads)
            .arg(database.display().to_string())
            .arg("--format=sarif-latest")
            .arg(format!("--output={}", sarif.display()))
            .arg("--no-sarif-add-snippets")
            .arg(query_suite);
        self.run(spec).await?;
        Ok(())
    }
}
