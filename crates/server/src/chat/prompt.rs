use std::collections::HashMap;

use crate::db::{CohortStudent, StudentChat};

pub const MENTOR_SYSTEM_PROMPT: &str = "You are a helpful, conversational assistant for a school mentor. \
Answer the mentor's question using only the student data in the provided context and no outside knowledge. \
Talk naturally and get to the point. Do not repeat facts or phrasing you have already used. \
For a general question such as \"how are my students doing?\" give a short overview of the whole group; \
for a question about one student, focus on that student. \
If the context does not contain the answer, say so plainly.";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You write progress notes for a school mentor. \
From the student's recent conversation with their AI tutor, reply with a single status summary of at most 25 words \
describing what the student is working on and where they seem to need help. Reply with the summary only.";

pub const SUMMARY_QUESTION: &str = "Summarize this student's current progress.";

/// Prior exchanges as `Q:`/`A:` blocks, oldest first.
/// `newest_first` is the order the store hands them back in.
pub fn format_history(newest_first: &[StudentChat]) -> String {
    newest_first
        .iter()
        .rev()
        .map(|chat| format!("Q: {}\nA: {}", chat.question, chat.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Transcript handed to the summarizer, oldest first.
pub fn format_transcript(newest_first: &[StudentChat]) -> String {
    newest_first
        .iter()
        .rev()
        .map(|chat| format!("Student: {}\nTutor: {}", chat.question, chat.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Group chats by owner, keeping each owner's questions in store order.
pub fn questions_by_owner(chats: Vec<StudentChat>) -> HashMap<i64, Vec<String>> {
    let mut grouped: HashMap<i64, Vec<String>> = HashMap::new();
    for chat in chats {
        grouped.entry(chat.user_id).or_default().push(chat.question);
    }
    grouped
}

pub fn format_mentor_context(
    school: &str,
    students: &[CohortStudent],
    questions: &HashMap<i64, Vec<String>>,
) -> String {
    let header = format!("List of students at {}:", school);
    if students.is_empty() {
        return format!("{}\n\nNo students are registered at this school yet.", header);
    }

    let blocks = students
        .iter()
        .map(|student| {
            let asked = questions
                .get(&student.user_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            format_student_block(student, asked)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{}\n\n{}", header, blocks)
}

fn format_student_block(student: &CohortStudent, questions: &[String]) -> String {
    let mut block = format!(
        "Student:\n  ID: {}\n  Name: {}\n  Grade: {}\n  Class: {}\n  Progress Summary: {}",
        student.id,
        student.full_name.as_deref().unwrap_or("N/A"),
        student.grade.as_deref().unwrap_or("N/A"),
        student.class_name.as_deref().unwrap_or("N/A"),
        student
            .progress_summary
            .as_deref()
            .unwrap_or("Not available"),
    );

    if questions.is_empty() {
        block.push_str("\n  Previous Questions: none");
    } else {
        block.push_str("\n  Previous Questions:");
        for question in questions {
            block.push_str("\n    - ");
            block.push_str(question);
        }
    }
    block
}
