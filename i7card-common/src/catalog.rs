//! The fixed catalog of target relations
//!
//! Every relation the importer writes is enumerated here so that the
//! verifier and the destructive clear tool operate on the same list the
//! importer populates, rather than each carrying its own table names.

use serde::{Deserialize, Serialize};

/// One of the relations the importer may populate.
///
/// Most card relations share the card id as their key; `SkillDetails` is
/// keyed by (card id, skill level 1..5); `Songs` is keyed by the sheet's
/// song id; `TeamCompositions` is keyed by the song it was scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRelation {
    Cards,
    CardStats,
    CardSkills,
    SkillDetails,
    ReleaseInfo,
    BroachInfo,
    SkillGuess,
    Songs,
    GroupCards,
    TeamCompositions,
}

impl TargetRelation {
    /// All relations, in creation order (parents before children)
    pub const ALL: [TargetRelation; 10] = [
        TargetRelation::Cards,
        TargetRelation::CardStats,
        TargetRelation::CardSkills,
        TargetRelation::SkillDetails,
        TargetRelation::ReleaseInfo,
        TargetRelation::BroachInfo,
        TargetRelation::SkillGuess,
        TargetRelation::Songs,
        TargetRelation::GroupCards,
        TargetRelation::TeamCompositions,
    ];

    /// SQL table name
    pub fn table_name(&self) -> &'static str {
        match self {
            TargetRelation::Cards => "cards",
            TargetRelation::CardStats => "card_stats",
            TargetRelation::CardSkills => "card_skills",
            TargetRelation::SkillDetails => "skill_details",
            TargetRelation::ReleaseInfo => "release_info",
            TargetRelation::BroachInfo => "broach_info",
            TargetRelation::SkillGuess => "skill_guess",
            TargetRelation::Songs => "songs",
            TargetRelation::GroupCards => "group_cards",
            TargetRelation::TeamCompositions => "team_compositions",
        }
    }

    /// Deletion order for destructive clears: children before parents
    pub fn clear_order() -> [TargetRelation; 10] {
        [
            TargetRelation::TeamCompositions,
            TargetRelation::GroupCards,
            TargetRelation::Songs,
            TargetRelation::SkillGuess,
            TargetRelation::BroachInfo,
            TargetRelation::ReleaseInfo,
            TargetRelation::SkillDetails,
            TargetRelation::CardSkills,
            TargetRelation::CardStats,
            TargetRelation::Cards,
        ]
    }
}

impl std::fmt::Display for TargetRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_order_covers_every_relation() {
        let order = TargetRelation::clear_order();
        for relation in TargetRelation::ALL {
            assert!(order.contains(&relation), "{relation} missing from clear order");
        }
    }

    #[test]
    fn children_cleared_before_parents() {
        let order = TargetRelation::clear_order();
        let pos = |r: TargetRelation| order.iter().position(|x| *x == r).unwrap();
        assert!(pos(TargetRelation::SkillDetails) < pos(TargetRelation::Cards));
        assert!(pos(TargetRelation::TeamCompositions) < pos(TargetRelation::Songs));
    }
}
