//! Stage Catalog: the fixed seven-stage mentoring program.
//!
//! Every stage has a summary. Only stages 4, 5 and 6 carry a multi-step flow;
//! the others are single-signal stages completed elsewhere in the product
//! (profile unlock, funnel, content publishing) and have no step sequence.
//!
//! The catalog is static data. It is never mutated at runtime.

pub mod handlers;

use serde::Serialize;

use crate::errors::ProgressionError;

pub const FIRST_STAGE: i16 = 1;
pub const LAST_STAGE: i16 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Intro,
    Collect,
    Process,
    Output,
    Confirm,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepDefinition {
    pub id: &'static str,
    pub title: &'static str,
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Key written into `stage_data` by a collect step. Required for collect steps.
    pub collect_field: Option<&'static str>,
    /// Key under which a process/output step stores what it produced.
    pub output_field: Option<&'static str>,
    pub prompt: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageDefinition {
    pub number: i16,
    pub title: &'static str,
    pub description: &'static str,
    pub steps: &'static [StepDefinition],
}

impl StageDefinition {
    pub fn last_step_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn step(&self, index: usize) -> Option<&'static StepDefinition> {
        self.steps.get(index)
    }
}

/// Lightweight listing entry for every stage, with or without a step flow.
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub number: i16,
    pub title: &'static str,
    pub description: &'static str,
    pub has_steps: bool,
    pub step_count: usize,
}

const fn step(id: &'static str, title: &'static str, step_type: StepType) -> StepDefinition {
    StepDefinition {
        id,
        title,
        step_type,
        collect_field: None,
        output_field: None,
        prompt: None,
    }
}

const fn collect(
    id: &'static str,
    title: &'static str,
    field: &'static str,
    prompt: &'static str,
) -> StepDefinition {
    StepDefinition {
        id,
        title,
        step_type: StepType::Collect,
        collect_field: Some(field),
        output_field: None,
        prompt: Some(prompt),
    }
}

const fn output(id: &'static str, title: &'static str, field: &'static str) -> StepDefinition {
    StepDefinition {
        id,
        title,
        step_type: StepType::Output,
        collect_field: None,
        output_field: Some(field),
        prompt: None,
    }
}

const INTERVIEW_STEPS: &[StepDefinition] = &[
    step("intro", "How interview preparation works", StepType::Intro),
    collect(
        "target_position",
        "Target position",
        "target_position",
        "Which position are you interviewing for?",
    ),
    collect(
        "interview_answers",
        "Practice answers",
        "interview_answers",
        "Answer the practice questions out loud or in writing.",
    ),
    step("analysis", "Answer analysis", StepType::Process),
    output("feedback", "Interview feedback", "interview_feedback"),
    step("confirm", "Confirm and finish", StepType::Confirm),
];

const CV_STEPS: &[StepDefinition] = &[
    step("intro", "Building your CV and cover letter", StepType::Intro),
    collect(
        "target_role",
        "Target role",
        "target_role",
        "What role are you applying for?",
    ),
    collect(
        "experience",
        "Experience summary",
        "experience",
        "Describe your recent experience and main achievements.",
    ),
    collect(
        "job_description",
        "Job description",
        "job_description",
        "Paste the job description you are targeting.",
    ),
    step("generate", "Drafting documents", StepType::Process),
    output("cv_draft", "CV draft", "cv_draft"),
    output("cover_letter", "Cover letter draft", "cover_letter"),
    step("confirm", "Approve your documents", StepType::Confirm),
];

const LINKEDIN_STEPS: &[StepDefinition] = &[
    step("intro", "Optimising your LinkedIn presence", StepType::Intro),
    collect(
        "current_headline",
        "Current headline",
        "current_headline",
        "What does your LinkedIn headline say today?",
    ),
    collect(
        "about_section",
        "About section",
        "about_section",
        "Paste your current About section.",
    ),
    step("rewrite", "Rewriting profile sections", StepType::Process),
    output("profile_proposal", "Proposed profile", "linkedin_profile"),
    step("confirm", "Confirm your new profile", StepType::Confirm),
];

static STAGES: [StageDefinition; 7] = [
    StageDefinition {
        number: 1,
        title: "Onboarding",
        description: "Get to know the program and your mentor.",
        steps: &[],
    },
    StageDefinition {
        number: 2,
        title: "Career positioning",
        description: "Define your professional goals with your mentor.",
        steps: &[],
    },
    StageDefinition {
        number: 3,
        title: "Opportunity funnel",
        description: "Map the companies and openings you want to pursue.",
        steps: &[],
    },
    StageDefinition {
        number: 4,
        title: "Interview preparation",
        description: "Practise interviews and get structured feedback.",
        steps: INTERVIEW_STEPS,
    },
    StageDefinition {
        number: 5,
        title: "CV and cover letter",
        description: "Produce a targeted CV and cover letter.",
        steps: CV_STEPS,
    },
    StageDefinition {
        number: 6,
        title: "LinkedIn profile",
        description: "Rework your LinkedIn profile for your target role.",
        steps: LINKEDIN_STEPS,
    },
    StageDefinition {
        number: 7,
        title: "Personal brand",
        description: "Publish content that builds your professional presence.",
        steps: &[],
    },
];

/// Returns the multi-step definition of a stage.
///
/// Fails with `StageNotFound` for numbers outside 1–7 and for stages that
/// have no step flow.
pub fn stage_definition(number: i16) -> Result<&'static StageDefinition, ProgressionError> {
    STAGES
        .iter()
        .find(|s| s.number == number && !s.steps.is_empty())
        .ok_or(ProgressionError::StageNotFound(number))
}

pub fn stage_summaries() -> Vec<StageSummary> {
    STAGES
        .iter()
        .map(|s| StageSummary {
            number: s.number,
            title: s.title,
            description: s.description,
            has_steps: !s.steps.is_empty(),
            step_count: s.steps.len(),
        })
        .collect()
}
