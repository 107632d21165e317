use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Spiritual-health challenge categories covered by the interview.
/// Declaration order is the order in which the interview visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    PhysicalHealthAndSexualIssues,
    LossOfIndependence,
    LossOfCloseOnesAndFearOfDeath,
    LossOfSocialActivity,
    LossOfIncome,
    LossOfFamilyConnections,
    LifestyleChanges,
    LifeIntegrity,
    LossOfAspiration,
}

impl Subject {
    pub const ALL: [Subject; 9] = [
        Subject::PhysicalHealthAndSexualIssues,
        Subject::LossOfIndependence,
        Subject::LossOfCloseOnesAndFearOfDeath,
        Subject::LossOfSocialActivity,
        Subject::LossOfIncome,
        Subject::LossOfFamilyConnections,
        Subject::LifestyleChanges,
        Subject::LifeIntegrity,
        Subject::LossOfAspiration,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Subject::PhysicalHealthAndSexualIssues => "physical_health_and_sexual_issues",
            Subject::LossOfIndependence => "loss_of_independence",
            Subject::LossOfCloseOnesAndFearOfDeath => "loss_of_close_ones_and_fear_of_death",
            Subject::LossOfSocialActivity => "loss_of_social_activity",
            Subject::LossOfIncome => "loss_of_income",
            Subject::LossOfFamilyConnections => "loss_of_family_connections",
            Subject::LifestyleChanges => "lifestyle_changes",
            Subject::LifeIntegrity => "life_integrity",
            Subject::LossOfAspiration => "loss_of_aspiration",
        }
    }

    #[allow(dead_code)]
    pub fn from_id(id: &str) -> Option<Subject> {
        Subject::ALL.into_iter().find(|s| s.id() == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Main,
    FollowUp,
}

/// One question/answer pair with full attribution. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub interaction_id: Uuid,
    pub persona_id: String,
    pub model: String,
    /// `None` for the opening question, which precedes the subject groups.
    pub subject: Option<Subject>,
    pub question_id: String,
    pub question_type: QuestionType,
    /// Position of the question in the fixed interview order.
    pub sequence: usize,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}
