//! Prompt text for every LLM call the pipeline makes.

use super::types::{PlanningState, QuestionCounts, WeekAllocation};

/// Returned by the quality tool when the candidate set is not JSON.
pub const QUALITY_FORMAT_ERROR: &str =
    "questions JSON format error, please regenerate the questions";

fn topic_line(topics: &[String]) -> String {
    if topics.is_empty() {
        "(no key points provided)".to_string()
    } else {
        topics.join(", ")
    }
}

/// Budget planning request covering every week.
pub fn planning_prompt(state: &PlanningState) -> String {
    let mut weeks = String::new();
    for (i, topics) in state.weekly_topics.iter().enumerate() {
        weeks.push_str(&format!("- week{}: {}\n", i + 1, topic_line(topics)));
    }

    format!(
        "You are planning a practice exam that covers {total_weeks} weeks of lectures.\n\
        Distribute exactly {mcq} multiple choice questions and exactly {short} short answer \
        questions across the weeks. Give weeks with more material more questions, and give \
        every week at least one question of each kind.\n\n\
        Key points per week:\n{weeks}\n\
        Reply with a single JSON object in a ```json code block, keyed week1 to week{total_weeks}:\n\
        {{\"week1\": {{\"topics\": [\"...\"], \"assignedQuestions\": {{\"multipleChoice\": 2, \"shortAnswer\": 1}}}}}}\n\
        The multipleChoice values must add up to {mcq} and the shortAnswer values must add up to {short}.",
        total_weeks = state.total_weeks,
        mcq = state.target_counts.multiple_choice,
        short = state.target_counts.short_answer,
        weeks = weeks,
    )
}

/// System prompt for the weekly agent, followed by the tool catalogue.
pub fn weekly_system_prompt(tool_catalogue: &str) -> String {
    format!(
        "You are an exam author preparing one week's questions.\n\n\
        Work in this order:\n\
        1. Call generate_exam_questions to draft the questions.\n\
        2. Call check_questions_quality on the draft.\n\
        3. If the review finds problems, call generate_exam_questions again.\n\
        4. Finish by replying with the final question set only.\n\n\
        RULES:\n\
        - To call a tool, your ENTIRE response must be ONLY the JSON object, with no other text.\n\
        - Tool call format: {{\"function\": \"tool_name\", \"arguments\": {{...}}}}\n\
        - Your final reply must be the question set JSON with no commentary:\n\
        {{\"multiple_choice\": [{{\"question\": \"...\", \"options\": [{{\"option\": \"A. ...\", \"explanation\": \"...\"}}], \
        \"answer\": \"A\", \"hint\": \"...\"}}], \"short_answer\": [{{\"question\": \"...\", \"answer\": \"...\", \"hint\": \"...\"}}]}}\n\n\
        Available tools:\n{tool_catalogue}"
    )
}

/// Per-week task handed to the agent as the user message.
pub fn weekly_instruction(allocation: &WeekAllocation, content_preview: &str) -> String {
    format!(
        "Prepare questions for week {week}.\n\
        Topics: {topics}\n\
        Multiple choice questions required: {mcq}\n\
        Short answer questions required: {short}\n\n\
        Lecture excerpt:\n{content}",
        week = allocation.week_number,
        topics = topic_line(&allocation.topics),
        mcq = allocation.assigned.multiple_choice,
        short = allocation.assigned.short_answer,
        content = if content_preview.is_empty() {
            "(no lecture text available)"
        } else {
            content_preview
        },
    )
}

/// Question drafting request used by the generation tool.
pub fn generate_questions_prompt(topics: &[String], counts: QuestionCounts, content: &str) -> String {
    format!(
        "Write exam questions about: {topics}\n\n\
        Write exactly {mcq} multiple choice questions and exactly {short} short answer questions.\n\
        Each multiple choice question has four options labelled \"A. \" to \"D. \", each with an \
        explanation of why it is right or wrong. The answer is the letter of the correct option. \
        The hint must help without giving the answer away.\n\
        Each short answer question has a reference answer and a hint.\n\n\
        Lecture material:\n{content}\n\n\
        Reply with JSON only:\n\
        {{\"multiple_choice\": [{{\"question\": \"...\", \"options\": [{{\"option\": \"A. ...\", \"explanation\": \"...\"}}], \
        \"answer\": \"A\", \"hint\": \"...\"}}], \"short_answer\": [{{\"question\": \"...\", \"answer\": \"...\", \"hint\": \"...\"}}]}}",
        topics = topic_line(topics),
        mcq = counts.multiple_choice,
        short = counts.short_answer,
        content = content,
    )
}

/// Review request used by the quality tool.
pub fn quality_check_prompt(
    questions_json: &str,
    week_number: u32,
    topics: &[String],
    counts: QuestionCounts,
) -> String {
    format!(
        "Review this draft question set for week {week}.\n\
        Required topics: {topics}\n\
        Required counts: {mcq} multiple choice, {short} short answer\n\n\
        Check that:\n\
        1. Every question is relevant to the topics.\n\
        2. Every answer is unambiguous and correct.\n\
        3. The counts match exactly.\n\n\
        Start your reply with PASS or FAIL, then list any problems.\n\n\
        Draft:\n{questions}",
        week = week_number,
        topics = topic_line(topics),
        mcq = counts.multiple_choice,
        short = counts.short_answer,
        questions = questions_json,
    )
}

/// Lecture summary request for one week's extracted text.
pub fn summarize_lecture_prompt(lecture_text: &str) -> String {
    format!(
        "The text below is one week of university lecture slides.\n\
        Extract the lecture title, write a short abstract, and list the key points as short \
        phrases of one to three words.\n\n\
        Reply with JSON only, in this shape:\n\
        {{\"lectureTitle\": \"...\", \"abstract\": \"...\", \"keyPoints\": [\"...\", \"...\"]}}\n\n\
        Lecture text:\n{lecture_text}"
    )
}
