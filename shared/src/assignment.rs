use serde::{Deserialize, Serialize};

use crate::plot::{PlotId, TOTAL_PLOTS};

/// Score given to an assignment the admin placed by hand.
pub const MANUAL_ASSIGNMENT_SCORE: u32 = 0;

/// An optimizer-resolved member -> plot pairing.
///
/// `score` is the member's priority for the plot, or [`TOTAL_PLOTS`] when the member
/// never ranked it. Manual assignments score [`MANUAL_ASSIGNMENT_SCORE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub btag: String,
    #[serde(default)]
    pub char: String,
    pub plot: PlotId,
    #[serde(default)]
    pub score: u32,
}

impl Assignment {
    pub fn display_name(&self) -> &str {
        if self.char.is_empty() {
            &self.btag
        } else {
            &self.char
        }
    }

    /// Whether the member got a plot they never ranked.
    pub fn is_unranked(&self) -> bool {
        self.score >= TOTAL_PLOTS
    }

    pub fn is_manual(&self) -> bool {
        self.score == MANUAL_ASSIGNMENT_SCORE
    }
}

/// Body of the admin single-plot overwrite, `POST /community/assignments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverwriteAssignment {
    pub btag: String,
    pub char: String,
    pub plot: PlotId,
}

impl OverwriteAssignment {
    /// Parse admin input of the form `"<battletag> [character]"`. The character name
    /// defaults to the battletag when omitted.
    pub fn parse(input: &str, plot: PlotId) -> Option<Self> {
        let mut parts = input.split_whitespace();
        let btag = parts.next()?.to_string();
        let char = parts.next().map_or_else(|| btag.clone(), str::to_string);
        Some(Self { btag, char, plot })
    }

    pub fn into_assignment(self) -> Assignment {
        Assignment {
            btag: self.btag,
            char: self.char,
            plot: self.plot,
            score: MANUAL_ASSIGNMENT_SCORE,
        }
    }
}

/// Bulk assignment upload, `POST /community/upload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentUpload {
    #[serde(default)]
    pub members: Vec<UploadedMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedMember {
    pub assignment: Assignment,
}

impl AssignmentUpload {
    pub fn from_assignments(assignments: impl IntoIterator<Item = Assignment>) -> Self {
        Self {
            members: assignments
                .into_iter()
                .map(|assignment| UploadedMember { assignment })
                .collect(),
        }
    }

    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.members.iter().map(|member| &member.assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::{Assignment, AssignmentUpload, OverwriteAssignment};
    use crate::plot::PlotId;

    fn plot(id: u32) -> PlotId {
        PlotId::new(id).expect("valid plot")
    }

    #[test]
    fn assignment_parses_optimizer_payload() {
        let payload = r#"[{"btag":"Anna#1234","char":"Annabel","plot":12,"score":1},
                          {"btag":"Bert#5678","char":"","plot":3,"score":53}]"#;

        let parsed: Vec<Assignment> = serde_json::from_str(payload).expect("parse assignments");

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].plot, plot(12));
        assert_eq!(parsed[0].display_name(), "Annabel");
        assert!(!parsed[0].is_unranked());
        assert_eq!(parsed[1].display_name(), "Bert#5678");
        assert!(parsed[1].is_unranked());
    }

    #[test]
    fn overwrite_input_defaults_character_to_battletag() {
        let body = OverwriteAssignment::parse("  Anna#1234  ", plot(7)).expect("parse input");
        assert_eq!(body.btag, "Anna#1234");
        assert_eq!(body.char, "Anna#1234");

        let body = OverwriteAssignment::parse("Anna#1234 Annabel", plot(7)).expect("parse input");
        assert_eq!(body.char, "Annabel");

        assert!(OverwriteAssignment::parse("   ", plot(7)).is_none());
    }

    #[test]
    fn manual_assignment_scores_zero() {
        let assignment = OverwriteAssignment::parse("Anna#1234", plot(2))
            .expect("parse input")
            .into_assignment();
        assert!(assignment.is_manual());
        assert_eq!(assignment.plot, plot(2));
    }

    #[test]
    fn upload_body_wraps_each_assignment() {
        let upload = AssignmentUpload::from_assignments([Assignment {
            btag: "a".to_string(),
            char: "A".to_string(),
            plot: plot(1),
            score: 1,
        }]);

        let json = serde_json::to_value(&upload).expect("serialize upload");
        assert_eq!(json["members"][0]["assignment"]["btag"], "a");
        assert_eq!(json["members"][0]["assignment"]["plot"], 1);
        assert_eq!(upload.assignments().count(), 1);
    }
}
