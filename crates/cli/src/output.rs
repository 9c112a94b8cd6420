use crate::error::CliError;
use mirror_core::store::EntityStats;
use model::report::{EntityOutcome, RunReport};
use serde_json::json;

pub fn print_run_report(report: &RunReport) {
    println!("Sync run '{}' ({} mode):", report.run_id, report.mode);
    println!("-----------------------------");
    for entity in &report.entities {
        let status = match &entity.outcome {
            EntityOutcome::Done => "done".to_string(),
            EntityOutcome::Failed { stage, window, error } => {
                let at = window
                    .map(|w| format!(" in {w}"))
                    .unwrap_or_default();
                format!("FAILED at {stage}{at}: {error}")
            }
            EntityOutcome::Interrupted => "interrupted".to_string(),
        };
        println!("[{}] {}", entity.entity.as_str().to_uppercase(), status);
        println!("{:<16} {}", "  Windows", entity.windows_completed);
        println!("{:<16} {}", "  Pages", entity.pages_fetched);
        println!(
            "{:<16} {} inserted, {} updated, {} unchanged, {} skipped",
            "  Records", entity.inserted, entity.updated, entity.unchanged, entity.skipped
        );
        let checkpoint = entity
            .checkpoint
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "n/a".to_string());
        println!("{:<16} {}", "  Checkpoint", checkpoint);
        println!("{:<16} {} ms", "  Duration", entity.duration_ms);
    }
    println!("-----------------------------");
    println!("Outcome: {:?}", report.outcome);
}

pub fn print_inspection_table(stats: &[EntityStats], db_size: Option<&str>) {
    for entry in stats {
        println!("[ {} RECORDS ]", entry.entity.as_str().to_uppercase());
        println!("-----------------------------");
        println!("{:<18} {}", "  Total records", entry.records);
        println!("{:<18} {}", "  First modified", fmt_ts(entry.earliest));
        println!("{:<18} {}", "  Last modified", fmt_ts(entry.latest));
        println!("{:<18} {}", "  Checkpoint", fmt_ts(entry.checkpoint));
    }
    println!("[ DATABASE ]");
    println!("-----------------------------");
    println!("{:<18} {}", "  Size", db_size.unwrap_or("n/a"));
}

pub fn print_inspection_json(
    stats: &[EntityStats],
    db_size: Option<&str>,
) -> Result<(), CliError> {
    let doc = json!({
        "entities": stats,
        "database_size": db_size,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn fmt_ts(ts: Option<chrono::DateTime<chrono::Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "(no records)".to_string())
}
