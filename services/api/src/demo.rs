use chrono::{Local, NaiveDate};
use clap::Args;

use care_audit::audits::export::write_rollup_csv;
use care_audit::audits::{
    LocationId, RollupEntity, ScheduleSuggestion, ServiceUserId, StaffId, Verdict,
};
use care_audit::error::AppError;

use crate::infra::{build_service, parse_date, Collaborators};

#[derive(Args, Debug)]
pub(crate) struct SchedulePreviewArgs {
    /// Location identifier to project for
    #[arg(long, default_value = "willow-lodge")]
    pub(crate) location: String,
    /// Start of the planning window (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) from: Option<NaiveDate>,
    /// Horizon length in months (defaults to the configured horizon)
    #[arg(long)]
    pub(crate) months: Option<u32>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Location identifier used throughout the demo
    #[arg(long, default_value = "willow-lodge")]
    pub(crate) location: String,
    /// Reporting date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the rollup snapshot as CSV at the end of the run
    #[arg(long)]
    pub(crate) export_csv: bool,
}

pub(crate) fn run_schedule_preview(args: SchedulePreviewArgs) -> Result<(), AppError> {
    let collaborators = build_service()?;
    let from = args.from.unwrap_or_else(|| Local::now().date_naive());
    let location = LocationId(args.location);

    let suggestions = collaborators
        .service
        .preview_schedule(&location, from, args.months)?;

    println!("Projected audit calendar for {location} (from {from})");
    if suggestions.is_empty() {
        println!("- no recurring audits fall inside the window");
    }
    for suggestion in &suggestions {
        println!("- {} | {}", suggestion.suggested_date, suggestion.audit_type);
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let location = LocationId(args.location.clone());
    let collaborators = build_service()?;
    seed_directory(&collaborators, &location);

    println!("Care audit engine demo");
    println!("Location: {location} (evaluated {today})");

    let suggestions = collaborators
        .service
        .preview_schedule(&location, today, None)?;
    println!("\nProjected calendar ({} suggestions)", suggestions.len());
    for suggestion in suggestions.iter().take(5) {
        println!("- {} | {}", suggestion.suggested_date, suggestion.audit_type);
    }

    // Accept a general audit and a person-scoped one to show the fan-out.
    let medication = collaborators.service.accept_suggestion(
        &ScheduleSuggestion {
            audit_type: "medication_management".to_string(),
            location: location.clone(),
            suggested_date: today,
        },
        "registered-manager",
    )?;
    let supervision = collaborators.service.accept_suggestion(
        &ScheduleSuggestion {
            audit_type: "staff_supervision".to_string(),
            location: location.clone(),
            suggested_date: today,
        },
        "registered-manager",
    )?;
    println!(
        "\nAccepted medication audit ({} instance) and staff supervision ({} instances via fan-out)",
        medication.created.len(),
        supervision.created.len()
    );

    // Record a mixed set of answers on the medication audit.
    let instance = &medication.created[0];
    for section in &instance.template.sections {
        for question in &section.questions {
            let verdict = if question.key == "mar_gaps" {
                Verdict::NonCompliant
            } else if question.key == "prn_protocols" {
                Verdict::Partial
            } else {
                Verdict::Compliant
            };
            collaborators.service.record_response(
                &instance.id,
                care_audit::audits::RecordResponseRequest {
                    question: question.key.clone(),
                    verdict,
                    note: None,
                    recorded_by: "lead-auditor".to_string(),
                    recorded_on: today,
                },
            )?;
        }
    }

    let outcome = collaborators
        .service
        .complete(&instance.id, Some("monthly medication audit".to_string()), today)?;
    println!(
        "\nCompleted {} with score {}% ({})",
        outcome.instance.id,
        outcome.instance.overall_score.unwrap_or_default(),
        outcome
            .instance
            .rag
            .map(|rag| rag.label())
            .unwrap_or("Unscored")
    );

    if outcome.spawned_actions.is_empty() {
        println!("Remedial actions: none");
    } else {
        println!("Remedial actions");
        for item in &outcome.spawned_actions {
            println!(
                "- [{}] {} (target {})",
                item.rag.label(),
                item.description,
                item.target_date
            );
        }
    }

    if outcome.alerts.is_empty() {
        println!("Threshold alerts: none");
    } else {
        println!("Threshold alerts");
        for alert in &outcome.alerts {
            println!("- [{}] {}", alert.severity.label(), alert.message);
        }
    }

    let dashboard = collaborators.service.location_dashboard(&location, today)?;
    println!("\nLocation dashboard");
    println!(
        "- sections assessed: {}/{} ({}%)",
        dashboard.location.assessed_sections,
        dashboard.location.total_sections,
        dashboard.location.percentage
    );
    println!(
        "- RAG: {} green / {} amber / {} red",
        dashboard.location.rag_counts.green,
        dashboard.location.rag_counts.amber,
        dashboard.location.rag_counts.red
    );
    println!("- overdue actions: {}", dashboard.overdue_actions.len());
    println!(
        "- events published: {}",
        collaborators.events.events().len()
    );

    if args.export_csv {
        let snapshot = collaborators
            .service
            .rollup_for(RollupEntity::Location(location), today)?;
        let mut rendered = Vec::new();
        write_rollup_csv(&mut rendered, &[snapshot])?;
        println!("\nRollup CSV");
        print!("{}", String::from_utf8_lossy(&rendered));
    }

    Ok(())
}

fn seed_directory(collaborators: &Collaborators, location: &LocationId) {
    collaborators.directory.assign_staff(
        location.clone(),
        (1..=4).map(|n| StaffId(format!("staff-{n:02}"))).collect(),
    );
    collaborators.directory.assign_service_users(
        location.clone(),
        (1..=3)
            .map(|n| ServiceUserId(format!("resident-{n:02}")))
            .collect(),
    );
}
