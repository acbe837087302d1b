//! Check command handler: compile a schema without validating instances

use super::{ensure_exists, open_session};
use crate::cli::CheckArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::{CheckReport, OutputWriter};
use schemagraph::FileLoader;
use tracing::{info, instrument};

/// Handle the check command
///
/// Meta-schema validation is always on; any compile error is returned and
/// ends the process with exit code 2.
#[instrument(skip(config, output), fields(schema = %args.schema.display()))]
pub fn handle_check(args: CheckArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let mut loader = open_session(args.loader_config(&config.loader), &args.loader.refs)?;
    ensure_exists(&args.schema)?;

    output.info(&format!("Checking schema: {}", args.schema.display()))?;
    let timer = Timer::with_details("check", &args.schema.display().to_string());
    let schema = loader.compile(&FileLoader::new(&args.schema))?;
    timer.finish();

    info!(nodes = schema.node_count(), "Schema is well formed");
    output.check_report(&CheckReport {
        schema: args.schema.display().to_string(),
        valid: true,
        nodes: schema.node_count(),
    })
}
