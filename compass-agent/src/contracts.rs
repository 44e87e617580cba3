//! Response contracts for each structured use case.
//!
//! Lists are wrapped in an object (`{"questions": [...]}`, `{"ideas": [...]}`)
//! so every reply has a named root the schema can require.

use compass_model::{Difficulty, PracticeQuestion, ProjectIdea};
use serde::Deserialize;

use crate::schema::Schema;

/// Roadmap: subject, goal and ordered milestones.
///
/// Milestone status is not requested; the path assigns it.
pub fn learning_path() -> Schema {
    let milestone = Schema::object()
        .required("id", Schema::string())
        .required("title", Schema::string())
        .required("description", Schema::string())
        .required("practicalActions", Schema::array(Schema::string()))
        .optional(
            "preventiveAdvice",
            Schema::string().describe("Advice to avoid mistakes before they happen."),
        );

    Schema::object()
        .required("subject", Schema::string())
        .required("goal", Schema::string())
        .required("milestones", Schema::array(milestone).min_items(1))
}

/// Concept map, three levels deep.
pub fn mind_map() -> Schema {
    let leaf = Schema::object().required("label", Schema::string());
    let branch = Schema::object()
        .required("label", Schema::string())
        .optional("children", Schema::array(leaf));

    Schema::object()
        .required("label", Schema::string().describe("The topic itself"))
        .required("children", Schema::array(branch).min_items(1))
}

/// Multiple-choice exam.
pub fn practice_exam() -> Schema {
    let question = Schema::object()
        .required("question", Schema::string())
        .required("options", Schema::array(Schema::string()).min_items(2))
        .required(
            "correctAnswer",
            Schema::integer().describe("Zero-based index into options"),
        )
        .required("explanation", Schema::string());

    Schema::object().required("questions", Schema::array(question).min_items(1))
}

pub fn study_notes() -> Schema {
    Schema::object()
        .required("title", Schema::string().describe("Short heading for the notes"))
        .required("content", Schema::string())
        .required("concepts", Schema::array(Schema::string()))
}

pub fn simplified_material() -> Schema {
    Schema::object()
        .required("summary", Schema::string())
        .required("keyPoints", Schema::array(Schema::string()))
        .optional("analogy", Schema::string())
}

/// Portfolio project ideas.
pub fn project_ideas() -> Schema {
    let idea = Schema::object()
        .required("title", Schema::string())
        .required("description", Schema::string())
        .required(
            "difficulty",
            Schema::enumeration(Difficulty::ALL.iter().map(|d| d.as_str())),
        )
        .required("whyThis", Schema::string());

    Schema::object().required("ideas", Schema::array(idea).min_items(1))
}

/// Root of a [`practice_exam`] reply.
#[derive(Debug, Deserialize)]
pub(crate) struct ExamEnvelope {
    pub questions: Vec<PracticeQuestion>,
}

/// Root of a [`project_ideas`] reply.
#[derive(Debug, Deserialize)]
pub(crate) struct IdeasEnvelope {
    pub ideas: Vec<ProjectIdea>,
}
