use serde::Serialize;

/// One fixed-choice behavioural question. `id` doubles as the external field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub prompt: &'static str,
    pub helper: &'static str,
}

pub const QUESTION_COUNT: usize = 10;

pub const QUESTIONS: [Question; QUESTION_COUNT] = [
    Question {
        id: "A1_Score",
        prompt: "Does the child look at you when you call his/her name?",
        helper: "Observation of eye contact and response to auditory social stimuli.",
    },
    Question {
        id: "A2_Score",
        prompt: "How easy is it for you to get eye contact with the child?",
        helper: "Assessment of non-verbal social communication.",
    },
    Question {
        id: "A3_Score",
        prompt: "Does the child point to indicate that s/he wants something?",
        helper: "Assessment of proto-imperative pointing (e.g., pointing to a toy).",
    },
    Question {
        id: "A4_Score",
        prompt: "Does the child point to share interest with you?",
        helper: "Assessment of proto-declarative pointing (e.g., pointing to a bird in the sky).",
    },
    Question {
        id: "A5_Score",
        prompt: "Does the child pretend? (e.g., care for a doll, talk on a toy phone)",
        helper: "Assessment of imaginative and symbolic play.",
    },
    Question {
        id: "A6_Score",
        prompt: "Does the child follow where you are looking?",
        helper: "Assessment of joint attention.",
    },
    Question {
        id: "A7_Score",
        prompt: "If you or someone else in the family is visibly upset, does the child show signs of wanting to comfort them?",
        helper: "Assessment of early empathy and social awareness.",
    },
    Question {
        id: "A8_Score",
        prompt: "Would you describe the child's first words as being unusual?",
        helper: "Assessment of early language development patterns.",
    },
    Question {
        id: "A9_Score",
        prompt: "Does the child use simple gestures? (e.g., wave goodbye)",
        helper: "Assessment of non-verbal communication skills.",
    },
    Question {
        id: "A10_Score",
        prompt: "Does the child stare at nothing with no apparent purpose?",
        helper: "Observation of potentially repetitive or unusual behavioral patterns.",
    },
];

pub fn questions() -> &'static [Question] {
    &QUESTIONS
}

pub fn find(id: &str) -> Option<&'static Question> {
    QUESTIONS.iter().find(|question| question.id == id)
}
