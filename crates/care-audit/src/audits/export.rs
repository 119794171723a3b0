//! Tabular export of rollup figures and action plans for the reporting and
//! dashboard consumers.

use std::io::Write;

use chrono::NaiveDate;

use super::domain::ActionPlanItem;
use super::rollup::RollupSnapshot;

pub fn write_rollup_csv<W: Write>(
    writer: W,
    snapshots: &[RollupSnapshot],
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "entity",
        "window_from",
        "window_to",
        "total_sections",
        "assessed_sections",
        "percentage",
        "green",
        "amber",
        "red",
        "overdue_actions",
    ])?;

    for snapshot in snapshots {
        csv_writer.write_record([
            snapshot.entity.label(),
            snapshot.window.from.to_string(),
            snapshot.window.to.to_string(),
            snapshot.total_sections.to_string(),
            snapshot.assessed_sections.to_string(),
            snapshot.percentage.to_string(),
            snapshot.rag_counts.green.to_string(),
            snapshot.rag_counts.amber.to_string(),
            snapshot.rag_counts.red.to_string(),
            snapshot.overdue_actions.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_actions_csv<W: Write>(
    writer: W,
    items: &[ActionPlanItem],
    today: NaiveDate,
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "id",
        "description",
        "owner",
        "location",
        "subject",
        "rag",
        "status",
        "opened_on",
        "target_date",
        "overdue",
    ])?;

    for item in items {
        csv_writer.write_record([
            item.id.0.clone(),
            item.description.clone(),
            item.owner.clone(),
            item.location.0.clone(),
            item.subject
                .as_ref()
                .map(|subject| subject.label())
                .unwrap_or_default(),
            item.rag.label().to_string(),
            item.status.label().to_string(),
            item.opened_on.to_string(),
            item.target_date.to_string(),
            item.is_overdue(today).to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
