//! Implementation of the `awflow compile` command.
//!
//! Each workflow document is compiled on its own and, unless `--no-emit` is
//! given, its pipeline is written atomically to `<stem>.lock.yml` next to it.

use super::{discover_workflows, for_each_workflow};
use crate::cli::CompileArgs;
use crate::compiler::{Compiler, lock_path};
use crate::context::RepoContext;
use crate::engine::EngineRegistry;
use crate::error::Result;
use crate::fs::atomic_write_file;
use std::path::Path;
use tracing::info;

pub fn cmd_compile(args: CompileArgs) -> Result<()> {
    let ctx = RepoContext::resolve()?;
    run(&ctx, &args)
}

pub(super) fn run(ctx: &RepoContext, args: &CompileArgs) -> Result<()> {
    let compiler = Compiler::new(EngineRegistry::global(), &ctx.config)
        .with_engine_override(args.engine.as_deref())?;

    let workflows = discover_workflows(&args.paths, &ctx.workflows_dir(), &ctx.config)?;
    if workflows.is_empty() {
        info!("No workflows to compile");
        return Ok(());
    }

    for_each_workflow(&workflows, |path: &Path| {
        let compiled = compiler.compile_file(path)?;
        if args.no_emit {
            info!(
                source = %path.display(),
                engine = %compiled.engine_id,
                "Compiled (not written)"
            );
            return Ok(());
        }

        let target = lock_path(path);
        atomic_write_file(&target, &compiled.yaml)?;
        info!(
            source = %path.display(),
            target = %target.display(),
            engine = %compiled.engine_id,
            "Compiled workflow"
        );
        Ok(())
    })
}
