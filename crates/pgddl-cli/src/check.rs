use crate::cli::CheckArgs;
use crate::workflow;
use pgddl::{ReplayReport, SimError};

/// Where a replay error happened, when the error carries it.
fn location(err: &SimError) -> (Option<&str>, Option<usize>) {
    let mut file = None;
    let mut line = None;
    let mut cur = err;
    loop {
        match cur {
            SimError::InFile { file: f, source } => {
                file = Some(f.as_str());
                cur = source.as_ref();
            }
            SimError::Statement { line: l, source } => {
                line = Some(*l);
                cur = source.as_ref();
            }
            _ => return (file, line),
        }
    }
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let (_, plan) = workflow::plan(
        &args.config,
        args.dir,
        args.files,
        args.seed,
        None,
        args.strict,
    )?;

    let mut sim = plan.simulator()?;
    let mut report = ReplayReport::default();
    let mut failed = 0usize;

    let units = plan.units()?;
    for unit in &units {
        let Err(err) = pgddl::replay_sql(&mut sim, &unit.name, &unit.sql, plan.options, &mut report)
        else {
            continue;
        };
        failed += 1;
        let (file, line) = location(&err);
        let file = file.unwrap_or(&unit.name);
        match line {
            Some(line) => eprintln!("[ERROR] {file}:{line}: {}", err.root()),
            None => eprintln!("[ERROR] {file}: {}", err.root()),
        }
    }

    for s in &report.skipped {
        eprintln!("[WARN] {}:{}: skipped unsupported statement: {}", s.source, s.line, s.head);
    }

    if failed > 0 {
        anyhow::bail!("check failed: {failed} of {} scripts had errors", units.len());
    }
    println!(
        "ok: {} scripts, {} statements applied, {} skipped",
        units.len(),
        report.statements,
        report.skipped.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_unwraps_file_and_line() {
        let err = SimError::InFile {
            file: "V1__init".into(),
            source: Box::new(SimError::Statement {
                line: 7,
                source: Box::new(SimError::Io("boom".into())),
            }),
        };
        assert_eq!(location(&err), (Some("V1__init"), Some(7)));
        assert_eq!(location(&SimError::Io("x".into())), (None, None));
    }
}
