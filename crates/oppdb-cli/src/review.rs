//! `status` and `comment` handlers: the two post-merge mutations.

use std::path::Path;

use oppdb_core::{Opportunity, OpportunityStatus};

use crate::files::{read_json, write_json};

pub(crate) fn set_status(file: &Path, id: &str, status: OpportunityStatus) -> anyhow::Result<()> {
    update_in_place(file, id, |opportunity| opportunity.set_status(status))?;
    tracing::info!(id, %status, "status updated");
    Ok(())
}

pub(crate) fn set_comments(file: &Path, id: &str, text: &str) -> anyhow::Result<()> {
    update_in_place(file, id, |opportunity| opportunity.set_comments(text))?;
    tracing::info!(id, "comments updated");
    Ok(())
}

fn update_in_place<F>(file: &Path, id: &str, mutate: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut Opportunity),
{
    let mut opportunities: Vec<Opportunity> = read_json(file)?;
    let opportunity = opportunities
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or_else(|| anyhow::anyhow!("opportunity '{id}' not found in {}", file.display()))?;
    mutate(opportunity);
    write_json(Some(file), &opportunities)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};
    use oppdb_core::{Category, Severity};

    use super::*;

    fn scratch_file(name: &str, opportunities: &[Opportunity]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("oppdb-{}-{name}.json", std::process::id()));
        write_json(Some(path.as_path()), &opportunities).unwrap();
        path
    }

    fn sample(id: &str) -> Opportunity {
        let at = Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap();
        Opportunity {
            id: id.to_string(),
            title: "Slow checkout".to_string(),
            description: "Payment step takes a minute".to_string(),
            category: Category::PainPoint,
            severity: Severity::High,
            frequency: 1,
            sources: vec!["row_1".to_string()],
            keywords: vec!["checkout".to_string()],
            created_at: at,
            updated_at: at,
            processing_date: at,
            status: OpportunityStatus::New,
            comments: String::new(),
            merged_from: Vec::new(),
        }
    }

    #[test]
    fn status_update_rewrites_only_the_target() {
        let path = scratch_file("status", &[sample("opp_a"), sample("opp_b")]);

        set_status(&path, "opp_b", OpportunityStatus::Blocked).unwrap();

        let stored: Vec<Opportunity> = read_json(&path).unwrap();
        assert_eq!(stored[0].status, OpportunityStatus::New);
        assert_eq!(stored[1].status, OpportunityStatus::Blocked);
        assert!(stored[1].updated_at > stored[1].created_at);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn comment_update_replaces_text() {
        let path = scratch_file("comment", &[sample("opp_a")]);

        set_comments(&path, "opp_a", "waiting on payments team").unwrap();

        let stored: Vec<Opportunity> = read_json(&path).unwrap();
        assert_eq!(stored[0].comments, "waiting on payments team");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unknown_id_is_an_error() {
        let path = scratch_file("missing", &[sample("opp_a")]);

        let err = set_status(&path, "opp_zzz", OpportunityStatus::Resolved).unwrap_err();

        assert!(err.to_string().contains("opp_zzz"));
        std::fs::remove_file(&path).ok();
    }
}
