//! The fixed interview question battery.
//!
//! An opening group with no subject, then one group per subject in
//! enumeration order. Each group has a main question and ordered follow-ups.
//! Question ids: main `q3`, follow-ups `q3.1`, `q3.2`, …

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::interview::{QuestionType, Subject};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionGroup {
    pub id: String,
    /// `None` only for the opening group.
    pub subject: Option<Subject>,
    pub main: String,
    pub follow_ups: Vec<String>,
}

/// One question in interview order.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: String,
    pub group_id: String,
    pub subject: Option<Subject>,
    pub question_type: QuestionType,
    pub text: String,
    /// Zero-based position in the flattened interview order.
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionCounts {
    pub main: usize,
    pub follow_ups: usize,
}

impl QuestionCounts {
    pub fn total(&self) -> usize {
        self.main + self.follow_ups
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub groups: Vec<QuestionGroup>,
}

const FEELING: &str = "چه احساسی نسبت به این مساله دارید؟";
const OPINION: &str = "نظرتون در مورد این مساله چیست؟";
const ACTION: &str = "در این رابطه کاری هم انجام داده اید؟";

fn group(id: &str, subject: Option<Subject>, main: &str, follow_ups: &[&str]) -> QuestionGroup {
    QuestionGroup {
        id: id.to_string(),
        subject,
        main: main.to_string(),
        follow_ups: follow_ups.iter().map(|f| f.to_string()).collect(),
    }
}

impl QuestionSet {
    /// The Persian battery on spiritual-health challenges of old age.
    pub fn default_set() -> Self {
        use Subject::*;
        Self {
            groups: vec![
                group(
                    "starter",
                    None,
                    "به نظر شما مهمترین چالش و رنج دوران سالمندی چیه؟",
                    &[
                        "چی شده که این مساله به نظرتون مهمه؟",
                        "به نظرتون ریشه و دلیل ایجاد این رنج چیه؟",
                        FEELING,
                        "با این مسئله چه کار کردید؟",
                    ],
                ),
                group(
                    "q1",
                    Some(PhysicalHealthAndSexualIssues),
                    "در این دوره سنی توانمندی های انسان کاهش پیدا می کند. مثلا سلامت جسمی نسبت به جوانی کمتر میشود. برای شما این اتفاق افتاده؟",
                    &[
                        "چه احساسی نسبت به این فقدان دارید؟",
                        "نظرتون در مورد این کاهش سلامتی چیست؟",
                        ACTION,
                    ],
                ),
                group(
                    "q2",
                    Some(LossOfIndependence),
                    "بعضی از افراد در دوره سالمندی به دلیل کاهش توانمندی ها احساس می کنند استقلال کمتری دارند. نظر شما در این باره چیست؟",
                    &[FEELING, OPINION, ACTION],
                ),
                group(
                    "q3",
                    Some(LossOfCloseOnesAndFearOfDeath),
                    "آیا از دوستان و هم سن و سالان در اقوام کسی رو از دست داده اید؟",
                    &[
                        "چه احساسی نسبت به این فقدان دارید؟",
                        "نظرتون در مورد مرگ چیست؟",
                        ACTION,
                    ],
                ),
                group(
                    "q4",
                    Some(LossOfSocialActivity),
                    "شما احتمالا بازنشسته شده اید درست است؟ برای شما این فاصله گرفتن از فضای شغلی و اجتماعی چه طور بوده؟",
                    &[
                        "چه احساسی نسبت به بازنشستگی دارید؟",
                        "نظرتون در مورد بازنشستگی چیست؟",
                        ACTION,
                    ],
                ),
                group(
                    "q5",
                    Some(LossOfIncome),
                    "ایا به دلیل بازنشستگی و به دنبال کاهش فعالیت های شغلی با مشکلات اقتصادی هم مواجه شده اید؟ چالش های مالی هم داشته اید؟",
                    &[FEELING, OPINION, ACTION],
                ),
                group(
                    "q6",
                    Some(LossOfFamilyConnections),
                    "آیا در این دوره سنی رفت و آمدها و ارتباطات خانوادگی و اجتماعی شما نسبت به دوران جوانی کاهش یافته؟",
                    &[FEELING, OPINION, ACTION],
                ),
                group(
                    "q7",
                    Some(LifestyleChanges),
                    "ایا سبک کلی زندگی شما در این دوره از زندگی نسبت به دوره های قبل تغییر کرده؟",
                    &[FEELING, OPINION, ACTION],
                ),
                group(
                    "q8",
                    Some(LifeIntegrity),
                    "در مورد گذشته و مسیری که در زندگی طی کرده اید چه احساسی دارید؟ اگر به گذشته برمی گشتید همین مسیر را پیش می گرفتید؟",
                    &[FEELING, OPINION, ACTION],
                ),
                group(
                    "q9",
                    Some(LossOfAspiration),
                    "با چه انگیزه و امیدی صبح ها از خواب بیدار می شوید؟",
                    &[FEELING, OPINION, ACTION],
                ),
            ],
        }
    }

    /// Loads a question set from a JSON file and validates it.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)?;
        let set: QuestionSet = serde_json::from_str(&text).map_err(|e| {
            AppError::configuration(format!("question set {} is malformed: {e}", path.display()))
        })?;
        set.validate()?;
        Ok(set)
    }

    /// Flattens the groups into interview order: each main question followed
    /// by its follow-ups.
    pub fn questions(&self) -> Vec<Question> {
        let mut out = Vec::with_capacity(self.counts().total());
        for g in &self.groups {
            out.push(Question {
                id: g.id.clone(),
                group_id: g.id.clone(),
                subject: g.subject,
                question_type: QuestionType::Main,
                text: g.main.clone(),
                position: out.len(),
            });
            for (i, text) in g.follow_ups.iter().enumerate() {
                out.push(Question {
                    id: format!("{}.{}", g.id, i + 1),
                    group_id: g.id.clone(),
                    subject: g.subject,
                    question_type: QuestionType::FollowUp,
                    text: text.clone(),
                    position: out.len(),
                });
            }
        }
        out
    }

    pub fn counts(&self) -> QuestionCounts {
        QuestionCounts {
            main: self.groups.len(),
            follow_ups: self.groups.iter().map(|g| g.follow_ups.len()).sum(),
        }
    }

    /// Group ids are unique, no text is blank, subject-less groups only open
    /// the set, and subjects appear at most once in enumeration order.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.groups.is_empty() {
            return Err(AppError::configuration("question set is empty"));
        }

        let mut ids = HashSet::new();
        let mut last_subject: Option<Subject> = None;
        let mut seen_subject = false;

        for g in &self.groups {
            if g.id.trim().is_empty() || !ids.insert(g.id.as_str()) {
                return Err(AppError::configuration(format!(
                    "question group id '{}' is blank or duplicated",
                    g.id
                )));
            }
            if g.main.trim().is_empty() || g.follow_ups.iter().any(|f| f.trim().is_empty()) {
                return Err(AppError::configuration(format!(
                    "question group '{}' has blank question text",
                    g.id
                )));
            }
            match g.subject {
                None if seen_subject => {
                    return Err(AppError::configuration(format!(
                        "question group '{}' has no subject but follows subject groups",
                        g.id
                    )));
                }
                None => {}
                Some(subject) => {
                    if last_subject.is_some_and(|last| subject <= last) {
                        return Err(AppError::configuration(format!(
                            "question group '{}' ({}) is out of subject order",
                            g.id,
                            subject.id()
                        )));
                    }
                    last_subject = Some(subject);
                    seen_subject = true;
                }
            }
        }
        Ok(())
    }
}
