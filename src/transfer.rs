//! CSV import and export for the question bank and the attempt log.
//!
//! Import contract: `question` and `answer` columns are required per row
//! (rows missing either are skipped, not errors); every column whose name
//! starts with "choice" (case-insensitive) contributes a choice, skipping
//! empty cells; `category`, `topic` and `explanation` are optional. A file
//! that cannot be parsed at all is a caller-visible error and nothing is
//! imported from it.

use csv::{ReaderBuilder, WriterBuilder};

use crate::domain::{AnswerHistory, Question};
use crate::store::StoreError;

/// Result of parsing an import file: the new questions (identity still
/// unassigned; the store fills it in) plus how many rows were skipped.
#[derive(Debug)]
pub struct ImportOutcome {
    pub questions: Vec<Question>,
    pub skipped: usize,
}

/// Parse CSV rows into new questions.
pub fn parse_questions_csv(data: &[u8]) -> Result<ImportOutcome, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let question_col = column("question");
    let answer_col = column("answer");
    let explanation_col = column("explanation");
    let category_col = column("category");
    let topic_col = column("topic");
    let choice_cols: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.to_lowercase().starts_with("choice"))
        .map(|(i, _)| i)
        .collect();

    let mut questions = Vec::new();
    let mut skipped = 0;
    for record in reader.records() {
        let record = record?;
        let field = |col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .map(str::trim)
                .unwrap_or("")
                .to_string()
        };

        let question = field(question_col);
        let answer = field(answer_col);
        if question.is_empty() || answer.is_empty() {
            skipped += 1;
            continue;
        }

        let choices: Vec<String> = choice_cols
            .iter()
            .filter_map(|&i| record.get(i))
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();

        questions.push(Question {
            qid: String::new(),
            id_num: 0,
            category: field(category_col),
            topic: field(topic_col),
            question,
            choices,
            answer,
            explanation: field(explanation_col),
            attachments: Vec::new(),
        });
    }

    Ok(ImportOutcome { questions, skipped })
}

/// Bank backup: one row per question, with as many `choiceN` columns as
/// the longest choice list needs. Shorter questions leave cells empty.
pub fn export_bank_csv(bank: &[Question]) -> Result<String, StoreError> {
    let max_choices = bank.iter().map(|q| q.choices.len()).max().unwrap_or(0);

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    let mut header: Vec<String> = ["id", "category", "topic", "question", "answer", "explanation"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    for i in 1..=max_choices {
        header.push(format!("choice{i}"));
    }
    writer.write_record(&header).map_err(csv_to_store)?;

    for q in bank {
        let mut row = vec![
            q.id_num.to_string(),
            q.category.clone(),
            q.topic.clone(),
            q.question.clone(),
            q.answer.clone(),
            q.explanation.clone(),
        ];
        for i in 0..max_choices {
            row.push(q.choices.get(i).cloned().unwrap_or_default());
        }
        writer.write_record(&row).map_err(csv_to_store)?;
    }

    finish(writer)
}

/// Attempt log backup. The display ordinal is resolved through the current
/// bank; attempts whose question was removed keep the row with "N/A".
pub fn export_attempts_csv(
    history: &AnswerHistory,
    bank: &[Question],
) -> Result<String, StoreError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(["question_id", "category", "topic", "correct", "timestamp", "qid"])
        .map_err(csv_to_store)?;

    for attempt in &history.attempts {
        let question = bank.iter().find(|q| q.qid == attempt.qid);
        let row = [
            question
                .map(|q| q.id_num.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            question.map(|q| q.category.clone()).unwrap_or_default(),
            question.map(|q| q.topic.clone()).unwrap_or_default(),
            attempt.correct.to_string(),
            attempt.ts.to_rfc3339(),
            attempt.qid.clone(),
        ];
        writer.write_record(&row).map_err(csv_to_store)?;
    }

    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, StoreError> {
    let buf = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn csv_to_store(e: csv::Error) -> StoreError {
    StoreError::Io(e.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::domain::Attempt;

    #[test]
    fn import_skips_rows_missing_question_or_answer() {
        let csv = "\
question,choice1,choice2,answer,category
What is 2+2?,4,5,4,math
,1,2,1,math
What is 3+3?,6,7,,math
What is 1+1?,2,3,2,math
";
        let outcome = parse_questions_csv(csv.as_bytes()).unwrap();
        assert_eq!(outcome.questions.len(), 2);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.questions[0].question, "What is 2+2?");
        assert_eq!(outcome.questions[0].category, "math");
        assert_eq!(outcome.questions[1].question, "What is 1+1?");
    }

    #[test]
    fn import_collects_choice_columns_case_insensitively() {
        let csv = "\
Question,CHOICE1,Choice B,choice_extra,Answer
Pick one,alpha,beta,,alpha
";
        let outcome = parse_questions_csv(csv.as_bytes()).unwrap();
        assert_eq!(outcome.skipped, 0);
        let q = &outcome.questions[0];
        // Empty choice cells are dropped, the rest keep column order.
        assert_eq!(q.choices, vec!["alpha".to_string(), "beta".to_string()]);
        assert_eq!(q.answer, "alpha");
    }

    #[test]
    fn import_rejects_an_unreadable_file() {
        // Invalid UTF-8 in a record fails the whole import.
        let bytes = b"question,answer\nbroken\xff\xfe,1\n";
        assert!(parse_questions_csv(bytes).is_err());
    }

    fn q(qid: &str, id_num: u64, choices: &[&str]) -> Question {
        Question {
            qid: qid.into(),
            id_num,
            category: "cat".into(),
            topic: "top".into(),
            question: format!("question {qid}"),
            choices: choices.iter().map(|c| c.to_string()).collect(),
            answer: choices.first().map(|c| c.to_string()).unwrap_or_default(),
            explanation: String::new(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn bank_export_pads_to_the_longest_choice_list() {
        let bank = vec![q("a", 1, &["x", "y", "z"]), q("b", 2, &["x"])];
        let csv = export_bank_csv(&bank).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,category,topic,question,answer,explanation,choice1,choice2,choice3"
        );
        let first: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(first[0], "1");
        assert_eq!(&first[6..], ["x", "y", "z"]);
        let second: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(&second[6..], ["x", "", ""]);
    }

    #[test]
    fn attempt_export_marks_removed_questions() {
        let bank = vec![q("kept", 4, &["x"])];
        let history = AnswerHistory {
            attempts: vec![
                Attempt { qid: "kept".into(), correct: true, ts: Utc::now() },
                Attempt { qid: "gone".into(), correct: false, ts: Utc::now() },
            ],
            ..AnswerHistory::default()
        };
        let csv = export_attempts_csv(&history, &bank).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "question_id,category,topic,correct,timestamp,qid");
        assert!(lines[1].starts_with("4,cat,top,true,"));
        assert!(lines[2].starts_with("N/A,,,false,"));
        assert!(lines[2].ends_with(",gone"));
    }
}
