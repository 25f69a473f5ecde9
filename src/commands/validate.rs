//! Implementation of the `awflow validate` command.

use super::{discover_workflows, for_each_workflow};
use crate::cli::ValidateArgs;
use crate::compiler::Compiler;
use crate::context::RepoContext;
use crate::engine::EngineRegistry;
use crate::error::Result;
use tracing::info;

pub fn cmd_validate(args: ValidateArgs) -> Result<()> {
    let ctx = RepoContext::resolve()?;
    run(&ctx, &args)
}

pub(super) fn run(ctx: &RepoContext, args: &ValidateArgs) -> Result<()> {
    let compiler = Compiler::new(EngineRegistry::global(), &ctx.config);
    let workflows = discover_workflows(&args.paths, &ctx.workflows_dir(), &ctx.config)?;
    if workflows.is_empty() {
        info!("No workflows to validate");
        return Ok(());
    }

    for_each_workflow(&workflows, |path| {
        let checked = compiler.check_file(path)?;
        info!(
            source = %path.display(),
            name = %checked.name,
            engine = %checked.engine_id,
            "Workflow is valid"
        );
        Ok(())
    })
}
