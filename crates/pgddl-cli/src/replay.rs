use crate::cli::{OutputFormat, ReplayArgs};
use crate::render;
use crate::workflow;
use pgddl::SchemaSnapshot;

pub fn run(args: ReplayArgs) -> anyhow::Result<()> {
    let (project, plan) = workflow::plan(
        &args.config,
        args.dir,
        args.files,
        args.seed,
        args.to,
        args.strict,
    )?;

    let mut sim = plan.simulator()?;
    let report = plan.replay(&mut sim)?;
    for s in &report.skipped {
        eprintln!("[WARN] {}:{}: skipped unsupported statement: {}", s.source, s.line, s.head);
    }
    tracing::debug!(
        migrations = report.applied.len(),
        statements = report.statements,
        skipped = report.skipped.len(),
        "replay finished"
    );

    let format = match args.format {
        Some(f) => f,
        None => project
            .as_ref()
            .map(|p| p.format())
            .transpose()?
            .flatten()
            .unwrap_or(OutputFormat::Json),
    };
    let output = args
        .output
        .or_else(|| project.as_ref().and_then(|p| p.output_path()));

    let snapshot = SchemaSnapshot::new(report.applied, sim.into_state());

    if let Some(path) = output {
        snapshot.write(&path)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", snapshot.to_json()?),
        OutputFormat::Table => print!("{}", render::schema_tables(&snapshot.schema)),
    }
    Ok(())
}
