//! Upstream campaign state → internal lifecycle.

use crate::db::CampaignStatus;
use adsync_schema::GraphCampaign;

const PAUSED_STATES: [&str; 7] = [
    "PAUSED",
    "CAMPAIGN_PAUSED",
    "ADSET_PAUSED",
    "PENDING_REVIEW",
    "IN_PROCESS",
    "WITH_ISSUES",
    "PENDING_BILLING_INFO",
];

/// Case-sensitive match on the trimmed upstream value. Unknown states are archived.
pub fn normalize_status(external: &str) -> CampaignStatus {
    let external = external.trim();
    if external == "ACTIVE" {
        CampaignStatus::Active
    } else if PAUSED_STATES.contains(&external) {
        CampaignStatus::Paused
    } else {
        CampaignStatus::Archived
    }
}

/// Uses `effective_status` when the node carries one, `status` otherwise.
pub fn campaign_status(campaign: &GraphCampaign) -> CampaignStatus {
    let raw = campaign
        .effective_status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .or(campaign.status.as_deref())
        .unwrap_or_default();
    normalize_status(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_is_the_only_active_state() {
        assert_eq!(normalize_status("ACTIVE"), CampaignStatus::Active);
        assert_eq!(normalize_status("  ACTIVE\n"), CampaignStatus::Active);
        assert_eq!(normalize_status("active"), CampaignStatus::Archived);
    }

    #[test]
    fn paused_family_maps_to_paused() {
        for s in PAUSED_STATES {
            assert_eq!(normalize_status(s), CampaignStatus::Paused, "{s}");
        }
    }

    #[test]
    fn everything_else_is_archived() {
        for s in ["", "ARCHIVED", "DELETED", "DISAPPROVED", "SOMETHING_NEW", "paused"] {
            assert_eq!(normalize_status(s), CampaignStatus::Archived, "{s:?}");
        }
    }

    #[test]
    fn effective_status_wins_over_status() {
        let campaign = GraphCampaign {
            id: "1".to_string(),
            status: Some("ACTIVE".to_string()),
            effective_status: Some("CAMPAIGN_PAUSED".to_string()),
            ..Default::default()
        };
        assert_eq!(campaign_status(&campaign), CampaignStatus::Paused);

        let campaign = GraphCampaign {
            id: "2".to_string(),
            status: Some("ACTIVE".to_string()),
            effective_status: None,
            ..Default::default()
        };
        assert_eq!(campaign_status(&campaign), CampaignStatus::Active);
    }
}
