//! Usability questionnaire: form state, validation and the answer map
//! posted to `/submit_feedback`.

use serde_json::{Map, Value};
use std::time::Duration;
use tokio::time::Instant;

/// How long a submission message stays on screen.
pub const MESSAGE_TTL: Duration = Duration::from_secs(5);

pub const SUBMIT_FAILED: &str = "Error al enviar el feedback.";
pub const CONNECTION_FAILED: &str = "Error de conexión. Inténtalo de nuevo más tarde.";

const YES: &str = "Sí";
const NO: &str = "No";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Choice(&'static [&'static str]),
    Text,
    /// Sí/No with a details field that must be filled when the answer is Sí.
    YesNoDetails {
        details_label: &'static str,
        missing_details: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Question {
    pub key: &'static str,
    pub text: &'static str,
    pub kind: QuestionKind,
}

impl Question {
    pub fn options(&self) -> &'static [&'static str] {
        match self.kind {
            QuestionKind::Choice(opts) => opts,
            QuestionKind::YesNoDetails { .. } => &[YES, NO],
            QuestionKind::Text => &[],
        }
    }
}

const YES_NO: &[&str] = &[YES, NO];
const YES_NO_PARTLY: &[&str] = &[YES, NO, "En parte"];
const HOW_MUCH: &[&str] = &["Nada", "Poco", "Bastante", "Mucho"];

pub const QUESTIONS: [Question; 11] = [
    Question {
        key: "q1",
        text: "¿Fue sencillo comenzar a usar la web?",
        kind: QuestionKind::Choice(YES_NO),
    },
    Question {
        key: "q2",
        text: "¿La pantalla y los menús de la aplicación son claros y fáciles de entender?",
        kind: QuestionKind::Choice(YES_NO_PARTLY),
    },
    Question {
        key: "q3",
        text: "¿Tuviste algún problema técnico importante mientras lo utilizabas?",
        kind: QuestionKind::YesNoDetails {
            details_label: "Detalles del problema técnico (si aplica)",
            missing_details: "Por favor, detalla el problema técnico.",
        },
    },
    Question {
        key: "q4",
        text: "¿Crees que cualquier persona, independientemente de su familiaridad con la tecnología, podría manejar este sistema sin problemas?",
        kind: QuestionKind::Choice(YES_NO),
    },
    Question {
        key: "q5",
        text: "¿Hay algo que, al modificarlo, haría que el dispositivo fuera aún más sencillo de usar?",
        kind: QuestionKind::Text,
    },
    Question {
        key: "q6",
        text: "¿La información sobre tus posturas fue correcta ?",
        kind: QuestionKind::Choice(YES_NO_PARTLY),
    },
    Question {
        key: "q7",
        text: "¿Cuánto te ayudó la información de la herramienta a detectar tus errores al ejecutar los movimientos?",
        kind: QuestionKind::Choice(HOW_MUCH),
    },
    Question {
        key: "q8",
        text: "¿Hubo algún momento en que sentiste que lo que se te indicaba sobre tu postura no era acertado?",
        kind: QuestionKind::YesNoDetails {
            details_label: "Detalles del acierto/error en postura (si aplica)",
            missing_details: "Por favor, especifica el ejercicio y el tipo de error.",
        },
    },
    Question {
        key: "q9",
        text: "¿La aplicacion contribuyó a mejorar tus posturas mientras te ejercitabas?",
        kind: QuestionKind::Choice(YES_NO_PARTLY),
    },
    Question {
        key: "q10",
        text: "¿Recomendarías esta web a otras personas interesadas en optimizar su técnica y postura al hacer ejercicio?",
        kind: QuestionKind::Choice(YES_NO),
    },
    Question {
        key: "q11",
        text: "¿Tienes algún otro comentario o sugerencia?",
        kind: QuestionKind::Text,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedbackError {
    /// A Sí answer without the required details; carries the prompt to show.
    #[error("{0}")]
    MissingDetails(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answer {
    pub choice: Option<usize>,
    /// Free text, or the details of a Sí/No question.
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct FormMessage {
    pub text: String,
    pub kind: MessageKind,
    pub shown_at: Instant,
}

#[derive(Debug, Clone)]
pub struct FeedbackForm {
    pub answers: Vec<Answer>,
    pub selected: usize,
    pub editing: bool,
    pub submitting: bool,
    pub message: Option<FormMessage>,
}

impl Default for FeedbackForm {
    fn default() -> Self {
        Self {
            answers: vec![Answer::default(); QUESTIONS.len()],
            selected: 0,
            editing: false,
            submitting: false,
            message: None,
        }
    }
}

impl FeedbackForm {
    pub fn selected_question(&self) -> &'static Question {
        &QUESTIONS[self.selected]
    }

    pub fn select_next(&mut self) {
        self.editing = false;
        self.selected = (self.selected + 1) % QUESTIONS.len();
    }

    pub fn select_prev(&mut self) {
        self.editing = false;
        self.selected = (self.selected + QUESTIONS.len() - 1) % QUESTIONS.len();
    }

    /// Move the selected question's option by `step`, wrapping around.
    /// Choosing No on a Sí/No question clears its details.
    pub fn cycle_option(&mut self, step: isize) {
        let q = self.selected_question();
        let n = q.options().len();
        if n == 0 {
            return;
        }
        let answer = &mut self.answers[self.selected];
        let next = match answer.choice {
            None if step >= 0 => 0,
            None => n - 1,
            Some(i) => (i as isize + step).rem_euclid(n as isize) as usize,
        };
        answer.choice = Some(next);
        if matches!(q.kind, QuestionKind::YesNoDetails { .. }) && q.options()[next] == NO {
            answer.text.clear();
        }
    }

    /// Whether the selected question currently accepts typed text.
    pub fn accepts_text(&self) -> bool {
        let q = self.selected_question();
        match q.kind {
            QuestionKind::Text => true,
            QuestionKind::YesNoDetails { .. } => self.answers[self.selected].choice == Some(0),
            QuestionKind::Choice(_) => false,
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing && self.accepts_text();
    }

    pub fn push_char(&mut self, c: char) {
        if self.editing {
            self.answers[self.selected].text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.editing {
            self.answers[self.selected].text.pop();
        }
    }

    pub fn set_message(&mut self, text: impl Into<String>, kind: MessageKind) {
        self.message = Some(FormMessage {
            text: text.into(),
            kind,
            shown_at: Instant::now(),
        });
    }

    /// Hide the message once it has been visible for `MESSAGE_TTL`.
    pub fn expire_message(&mut self, now: Instant) {
        if self
            .message
            .as_ref()
            .is_some_and(|m| now.duration_since(m.shown_at) >= MESSAGE_TTL)
        {
            self.message = None;
        }
    }

    /// Clear every answer, keeping the current message.
    pub fn reset(&mut self) {
        let message = self.message.take();
        *self = Self {
            message,
            ..Self::default()
        };
    }

    /// Build the question-text keyed map sent to the backend.
    pub fn to_payload(&self) -> Result<Map<String, Value>, FeedbackError> {
        let mut out = Map::new();
        for (q, a) in QUESTIONS.iter().zip(&self.answers) {
            match q.kind {
                QuestionKind::Text => {
                    out.insert(q.text.into(), Value::String(a.text.clone()));
                }
                QuestionKind::Choice(opts) => {
                    if let Some(opt) = a.choice.and_then(|i| opts.get(i)) {
                        out.insert(q.text.into(), Value::String((*opt).into()));
                    }
                }
                QuestionKind::YesNoDetails {
                    details_label,
                    missing_details,
                } => match a.choice.map(|i| q.options()[i]) {
                    Some(YES) => {
                        if a.text.trim().is_empty() {
                            return Err(FeedbackError::MissingDetails(missing_details));
                        }
                        out.insert(q.text.into(), Value::String(format!("{YES} ({})", a.text)));
                        out.insert(details_label.into(), Value::String(a.text.clone()));
                    }
                    Some(other) => {
                        out.insert(q.text.into(), Value::String(other.into()));
                    }
                    None => {}
                },
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(form: &mut FeedbackForm, key: &str, choice: Option<usize>, text: &str) {
        let idx = QUESTIONS.iter().position(|q| q.key == key).unwrap();
        form.answers[idx] = Answer {
            choice,
            text: text.into(),
        };
    }

    #[test]
    fn yes_with_details_is_inlined() {
        let mut form = FeedbackForm::default();
        answer(&mut form, "q1", Some(0), "");
        answer(&mut form, "q3", Some(0), "la cámara se congeló");
        answer(&mut form, "q8", Some(1), "");
        answer(&mut form, "q11", None, "Muy útil");

        let map = form.to_payload().unwrap();
        assert_eq!(map[QUESTIONS[0].text], "Sí");
        assert_eq!(map[QUESTIONS[2].text], "Sí (la cámara se congeló)");
        assert_eq!(
            map["Detalles del problema técnico (si aplica)"],
            "la cámara se congeló"
        );
        assert_eq!(map[QUESTIONS[7].text], "No");
        assert!(!map.contains_key("Detalles del acierto/error en postura (si aplica)"));
        assert_eq!(map[QUESTIONS[10].text], "Muy útil");
        // Unanswered choices are omitted, text questions are always present.
        assert!(!map.contains_key(QUESTIONS[1].text));
        assert_eq!(map[QUESTIONS[4].text], "");
    }

    #[test]
    fn yes_without_details_fails_validation() {
        let mut form = FeedbackForm::default();
        answer(&mut form, "q8", Some(0), "   ");
        assert_eq!(
            form.to_payload(),
            Err(FeedbackError::MissingDetails(
                "Por favor, especifica el ejercicio y el tipo de error."
            ))
        );
        answer(&mut form, "q3", Some(0), "");
        assert_eq!(
            form.to_payload().unwrap_err().to_string(),
            "Por favor, detalla el problema técnico."
        );
    }

    #[test]
    fn choosing_no_clears_details() {
        let mut form = FeedbackForm::default();
        form.selected = 2;
        form.cycle_option(1);
        assert!(form.accepts_text());
        form.toggle_editing();
        for c in "lag".chars() {
            form.push_char(c);
        }
        assert_eq!(form.answers[2].text, "lag");
        form.cycle_option(1);
        assert_eq!(form.answers[2].choice, Some(1));
        assert!(form.answers[2].text.is_empty());
        assert!(!form.accepts_text());
    }

    #[test]
    fn selection_wraps() {
        let mut form = FeedbackForm::default();
        form.select_prev();
        assert_eq!(form.selected, QUESTIONS.len() - 1);
        form.select_next();
        assert_eq!(form.selected, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn message_expires_after_ttl() {
        let mut form = FeedbackForm::default();
        form.set_message("ok", MessageKind::Success);
        tokio::time::advance(Duration::from_secs(4)).await;
        form.expire_message(Instant::now());
        assert!(form.message.is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        form.expire_message(Instant::now());
        assert!(form.message.is_none());
    }
}
