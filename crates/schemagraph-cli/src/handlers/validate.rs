//! Validation command handler

use super::{ensure_exists, open_session};
use crate::cli::ValidateArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::logging::timing::Timer;
use crate::output::{InstanceReport, OutputWriter, ValidationReport};
use schemagraph::{FileLoader, Schema};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Handle the validate command
///
/// The schema is compiled once; every instance is then validated against it
/// even when earlier ones fail.
#[instrument(skip(config, output), fields(schema = %args.schema.display(), instances = args.instances.len()))]
pub fn handle_validate(args: ValidateArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let loader_config = args.loader_config(&config.loader);
    debug!(config = ?loader_config, "Effective loader configuration");

    let mut loader = open_session(loader_config, &args.loader.refs)?;
    ensure_exists(&args.schema)?;

    output.info(&format!("Compiling schema: {}", args.schema.display()))?;
    let schema = {
        let _timer = Timer::with_details("compile", &args.schema.display().to_string());
        loader.compile(&FileLoader::new(&args.schema))?
    };
    info!(nodes = schema.node_count(), "Schema compiled");

    let mut report = ValidationReport::new(args.schema.display().to_string());
    {
        let _timer = Timer::new("validate_instances");
        for path in &args.instances {
            report.push(validate_instance(&schema, path)?);
        }
    }

    output.validation_report(&report)?;
    outcome(&report)
}

fn validate_instance(schema: &Schema, path: &Path) -> Result<InstanceReport> {
    let name = path.display().to_string();
    if !path.exists() {
        warn!(instance = %name, "Instance file not found");
        return Ok(InstanceReport::unreadable(name, "File not found"));
    }

    match schema.validate(&FileLoader::new(path)) {
        Ok(result) => {
            debug!(instance = %name, errors = result.len(), "Instance validated");
            Ok(InstanceReport::from_result(name, result))
        }
        Err(e) if e.is_instance_error() => {
            warn!(instance = %name, error = %e, "Instance could not be loaded");
            Ok(InstanceReport::unreadable(name, e.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Map a finished report onto the process outcome
fn outcome(report: &ValidationReport) -> Result<()> {
    let unreadable = report.unreadable_count();
    if unreadable > 0 {
        return Err(CliError::UnreadableInstances { count: unreadable });
    }

    let invalid = report.invalid_count();
    if invalid > 0 {
        return Err(CliError::InvalidInstances {
            invalid,
            total: report.instances.len(),
        });
    }
    Ok(())
}
