//! Prompt assembly for each generation use case.
//!
//! Every prompt is built from the student's profile so the model can pitch
//! guidance at the right stage and level.

use compass_model::StudentProfile;

/// Assembles instructions and system prompts.
pub struct PromptAssembler;

impl PromptAssembler {
    /// Instruction for a stage-aware roadmap on `subject`.
    pub fn learning_path(subject: &str, profile: &StudentProfile) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "Generate a STAGE-AWARE learning path for {}.\n",
            subject
        ));
        prompt.push_str(&format!(
            "Student Profile: {} year, {} level.\n",
            profile.stage, profile.skill_level
        ));
        prompt.push_str(&format!("Ultimate Goal: {}.\n\n", profile.primary_goal));

        prompt.push_str("Principles:\n");
        prompt.push_str("1. Clarity-First: Provide one clear focus per milestone.\n");
        prompt.push_str(
            "2. Action-Oriented: Focus on small, practical actions, not long theory.\n",
        );
        prompt.push_str(
            "3. Preventive: Include 'preventiveAdvice' for each milestone to help the student \
             avoid common wrong choices at this specific stage.\n",
        );
        prompt.push_str("4. Give every milestone a short id that is unique within the path.\n");

        prompt
    }

    /// System instruction for the mentor persona.
    pub fn mentor_system(profile: &StudentProfile) -> String {
        let mut prompt = String::new();

        prompt.push_str("You are Lumina, a Stage-Aware AI Learning Mentor.\n");
        prompt.push_str(&format!(
            "The student is a {} at a {} level.\n",
            profile.stage, profile.skill_level
        ));
        prompt.push_str(&format!("Their goal: {}.\n", profile.primary_goal));
        prompt.push_str("Your mission:\n");
        prompt.push_str("- Reduce Decision Fatigue: Give ONE clear best next step.\n");
        prompt.push_str(
            "- Comparison-Free: Never compare them to others. Focus on their personal growth.\n",
        );
        prompt.push_str(
            "- Preventive Guidance: Warn them about potential wrong turns based on their \
             current progress.\n",
        );
        prompt.push_str("- Keep it simple and action-oriented.\n");

        prompt
    }

    /// Instruction for study notes on a milestone topic.
    pub fn notes(topic: &str, profile: &StudentProfile) -> String {
        format!(
            "Write concise, high-signal study notes on \"{topic}\" for a {} student at a {} level.\n\
             Use short paragraphs and bullet points. Prefer worked examples over definitions.\n\
             Give the notes a short title and list the key concepts they cover.",
            profile.stage, profile.skill_level
        )
    }

    /// Instruction for a plain-language rewrite of a topic.
    pub fn simplified_material(topic: &str, profile: &StudentProfile) -> String {
        format!(
            "Explain \"{topic}\" in plain language for a {} student at a {} level.\n\
             Give a short summary, the key points to remember, and if it helps, one everyday analogy.",
            profile.stage, profile.skill_level
        )
    }

    /// Instruction for a three-level concept map.
    pub fn mind_map(topic: &str) -> String {
        format!(
            "Create a concept map for \"{topic}\".\n\
             The root label is the topic itself. Give it 3 to 5 main branches, and each branch \
             2 to 4 sub-concepts. Labels are short noun phrases. Go no deeper than three levels."
        )
    }

    /// Instruction for a multiple-choice practice exam.
    pub fn practice_exam(topic: &str) -> String {
        format!(
            "Create a 5-question multiple-choice practice exam on \"{topic}\".\n\
             Each question has exactly 4 options. 'correctAnswer' is the zero-based index of the \
             right option. Explain why that option is correct in one or two sentences.\n\
             Test understanding and application, not recall of trivia."
        )
    }

    /// Instruction for portfolio project ideas.
    pub fn project_ideas(profile: &StudentProfile, subject: &str) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "Suggest 3 portfolio project ideas in {} for a {} student at a {} level.\n",
            subject, profile.stage, profile.skill_level
        ));
        prompt.push_str(&format!("Their goal: {}.\n", profile.primary_goal));
        prompt.push_str("Each idea should be buildable in 1-4 weeks and show a hiring manager a real skill.\n");
        prompt.push_str(
            "Rate difficulty as Beginner, Intermediate or Advanced and explain in 'whyThis' \
             why the project suits this student now.\n",
        );

        prompt
    }

    /// Text handed to the speech model.
    pub fn speech(text: &str) -> String {
        format!("Say clearly and warmly: {text}")
    }

    /// Instruction for an illustrative image.
    pub fn vision_image(prompt: &str) -> String {
        format!(
            "A clean, modern educational illustration: {prompt}. \
             Clear composition, no text overlays."
        )
    }
}
