#![allow(dead_code)]

use engine::{Document, EngineConfig, Field, SearchEngine};

pub fn doc(id: &str, question: &str, section: &str, text: &str, course: &str) -> Document {
    Document {
        id: id.into(),
        question: question.into(),
        section: section.into(),
        text: text.into(),
        course: course.into(),
    }
}

pub fn faq() -> Vec<Document> {
    vec![
        doc("d0", "How do I install python?", "Setup", "Download python from the website and run the installer", "de"),
        doc("d1", "How do I run docker containers?", "Setup", "Use docker run with the image name", "de"),
        doc("d2", "Where is the homework form?", "Homework", "The homework form link is in the course channel", "de"),
        doc("d3", "Can I use conda instead of pip?", "Setup", "Conda works fine for managing python packages", "ml"),
        doc("d4", "What is the deadline for the project?", "Projects", "Project deadlines are listed in the calendar", "ml"),
        doc("d5", "Kafka broker is not reachable", "Streaming", "Check the kafka broker port in docker compose", "de"),
        doc("d6", "How is the model evaluated?", "Evaluation", "We evaluate the model with cross validation", "ml"),
        doc("d7", "Spark job runs out of memory", "Batch", "Increase spark executor memory in the config", "de"),
    ]
}

pub fn small_config() -> EngineConfig {
    EngineConfig { svd_components: 4, nmf_components: 4, ..EngineConfig::default() }
}

pub fn engine() -> SearchEngine {
    SearchEngine::build(faq(), small_config(), None).unwrap()
}

pub fn ids(hits: &[engine::SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.result.document_id.as_str()).collect()
}

pub fn question_and_text() -> Vec<Field> {
    vec![Field::Question, Field::Text]
}
