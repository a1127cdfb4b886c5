//! View state for the quiz screens. Every command consumes the state and
//! returns the next one; a failed round-trip leaves the data untouched and
//! only raises a [`Notice`].

use std::collections::BTreeMap;

use time::{Duration, OffsetDateTime};

use super::models::{Answer, Attempt, Question, QuestionType, Quiz, QuizType};
use super::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A toast for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn from_error(err: &ClientError) -> Self {
        let message = match err.kind() {
            "unauthorized" => "Please sign in again.".to_string(),
            "forbidden" => "You do not have access to this.".to_string(),
            "not_found" => "It no longer exists.".to_string(),
            "already_completed" => "This attempt was already submitted.".to_string(),
            "attempt_limit_exceeded" => "You have used all attempts for this quiz.".to_string(),
            "attempt_expired" => {
                "Time ran out. Your last saved answers were submitted.".to_string()
            }
            "quiz_unavailable" => "This quiz is not available right now.".to_string(),
            "too_many_requests" => "Too many tries. Wait a minute and retry.".to_string(),
            "network_error" => "Could not reach the server.".to_string(),
            _ => match err {
                ClientError::Api { detail, .. } => detail.clone(),
                ClientError::Transport(_) => "Something went wrong.".to_string(),
            },
        };
        Self { level: NoticeLevel::Error, message }
    }
}

/// When a quiz can be taken, as shown on the quiz list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Closed,
    Available,
    NotAvailableUntil(OffsetDateTime),
}

pub fn availability(quiz: &Quiz, now: OffsetDateTime) -> Availability {
    if let Some(until) = quiz.until_date {
        if now > until {
            return Availability::Closed;
        }
    }
    match quiz.available_date {
        Some(available) if now < available => Availability::NotAvailableUntil(available),
        _ => Availability::Available,
    }
}

const PENDING_PREFIX: &str = "pending:";

#[derive(Debug, Clone, PartialEq)]
pub struct QuizListState {
    pub course_id: String,
    pub quizzes: Vec<Quiz>,
    pub search: String,
    pub notice: Option<Notice>,
}

impl QuizListState {
    pub fn new(course_id: impl Into<String>) -> Self {
        Self { course_id: course_id.into(), quizzes: Vec::new(), search: String::new(), notice: None }
    }

    /// Authoritative replace after a fetch.
    pub fn loaded(self, quizzes: Vec<Quiz>) -> Self {
        Self { quizzes, notice: None, ..self }
    }

    pub fn searched(self, search: impl Into<String>) -> Self {
        Self { search: search.into(), ..self }
    }

    /// Quizzes whose title contains the search text, ignoring case.
    pub fn visible(&self) -> Vec<&Quiz> {
        let needle = self.search.trim().to_lowercase();
        self.quizzes
            .iter()
            .filter(|quiz| needle.is_empty() || quiz.title.to_lowercase().contains(&needle))
            .collect()
    }

    /// Appends a placeholder while the create call is in flight. Returns the
    /// placeholder id to settle it with.
    pub fn create_pending(mut self, title: &str) -> (Self, String) {
        let pending_id = format!("{PENDING_PREFIX}{}", self.quizzes.len());
        self.quizzes.push(placeholder_quiz(&pending_id, &self.course_id, title));
        (self, pending_id)
    }

    pub fn created(mut self, pending_id: &str, quiz: Quiz) -> Self {
        match self.quizzes.iter_mut().find(|item| item.id == pending_id) {
            Some(slot) => *slot = quiz,
            None => self.quizzes.push(quiz),
        }
        self
    }

    pub fn create_failed(mut self, pending_id: &str, err: &ClientError) -> Self {
        self.quizzes.retain(|quiz| quiz.id != pending_id);
        self.notice = Some(Notice::from_error(err));
        self
    }

    /// Swaps in the server's copy after a publish toggle or save.
    pub fn replaced(mut self, quiz: Quiz) -> Self {
        if let Some(slot) = self.quizzes.iter_mut().find(|item| item.id == quiz.id) {
            *slot = quiz;
        }
        self
    }

    pub fn removed(mut self, quiz_id: &str) -> Self {
        self.quizzes.retain(|quiz| quiz.id != quiz_id);
        self
    }

    pub fn failed(self, err: &ClientError) -> Self {
        Self { notice: Some(Notice::from_error(err)), ..self }
    }
}

fn placeholder_quiz(id: &str, course_id: &str, title: &str) -> Quiz {
    Quiz {
        id: id.to_string(),
        course: course_id.to_string(),
        title: title.to_string(),
        description: String::new(),
        quiz_type: QuizType::GradedQuiz,
        points: 0.0,
        assignment_group: super::models::AssignmentGroup::Quizzes,
        shuffle_answers: true,
        time_limit: Some(20),
        multiple_attempts: false,
        how_many_attempts: 1,
        show_correct_answers: false,
        access_code: None,
        requires_access_code: false,
        one_question_at_a_time: true,
        webcam_required: false,
        lock_questions_after_answering: false,
        due_date: None,
        available_date: None,
        until_date: None,
        published: false,
        questions: Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorTab {
    Details,
    Questions,
}

/// One change on the Details tab.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailsEdit {
    Title(String),
    Description(String),
    QuizType(QuizType),
    ShuffleAnswers(bool),
    TimeLimit(Option<i32>),
    MultipleAttempts(bool),
    HowManyAttempts(i32),
    ShowCorrectAnswers(bool),
    AccessCode(Option<String>),
    OneQuestionAtATime(bool),
    WebcamRequired(bool),
    LockQuestionsAfterAnswering(bool),
    DueDate(Option<OffsetDateTime>),
    AvailableDate(Option<OffsetDateTime>),
    UntilDate(Option<OffsetDateTime>),
    Published(bool),
}

/// One change to a question on the Questions tab.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionEdit {
    Title(String),
    Prompt(String),
    Points(f64),
    Type(QuestionType),
    AddChoice(String),
    RemoveChoice(usize),
    /// Marks a choice correct, or unmarks it when already correct.
    ToggleCorrect(String),
    /// Replaces the accepted answers of a fill-in-the-blank question.
    BlankAnswers(Vec<String>),
    /// Sets the true/false answer.
    Truth(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizEditorState {
    pub saved: Quiz,
    pub draft: Quiz,
    pub tab: EditorTab,
    pub notice: Option<Notice>,
}

impl QuizEditorState {
    pub fn open(quiz: Quiz) -> Self {
        Self { draft: quiz.clone(), saved: quiz, tab: EditorTab::Details, notice: None }
    }

    pub fn select_tab(self, tab: EditorTab) -> Self {
        Self { tab, ..self }
    }

    pub fn is_dirty(&self) -> bool {
        self.saved != self.draft
    }

    pub fn edit_details(mut self, edit: DetailsEdit) -> Self {
        let quiz = &mut self.draft;
        match edit {
            DetailsEdit::Title(title) => quiz.title = title,
            DetailsEdit::Description(description) => quiz.description = description,
            DetailsEdit::QuizType(quiz_type) => quiz.quiz_type = quiz_type,
            DetailsEdit::ShuffleAnswers(value) => quiz.shuffle_answers = value,
            DetailsEdit::TimeLimit(limit) => quiz.time_limit = limit.filter(|minutes| *minutes > 0),
            DetailsEdit::MultipleAttempts(value) => quiz.multiple_attempts = value,
            DetailsEdit::HowManyAttempts(count) => quiz.how_many_attempts = count.max(1),
            DetailsEdit::ShowCorrectAnswers(value) => quiz.show_correct_answers = value,
            DetailsEdit::AccessCode(code) => {
                quiz.access_code =
                    code.map(|code| code.trim().to_string()).filter(|code| !code.is_empty());
            }
            DetailsEdit::OneQuestionAtATime(value) => quiz.one_question_at_a_time = value,
            DetailsEdit::WebcamRequired(value) => quiz.webcam_required = value,
            DetailsEdit::LockQuestionsAfterAnswering(value) => {
                quiz.lock_questions_after_answering = value;
            }
            DetailsEdit::DueDate(date) => quiz.due_date = date,
            DetailsEdit::AvailableDate(date) => quiz.available_date = date,
            DetailsEdit::UntilDate(date) => quiz.until_date = date,
            DetailsEdit::Published(value) => quiz.published = value,
        }
        self
    }

    pub fn add_question(mut self) -> Self {
        self.draft.questions.push(Question::blank(QuestionType::MultipleChoice));
        self.draft.points = self.draft.question_points();
        self.tab = EditorTab::Questions;
        self
    }

    pub fn remove_question(mut self, index: usize) -> Self {
        if index < self.draft.questions.len() {
            self.draft.questions.remove(index);
            self.draft.points = self.draft.question_points();
        }
        self
    }

    /// Applies `edit` to the question at `index`. Out-of-range indexes are
    /// ignored.
    pub fn edit_question(mut self, index: usize, edit: QuestionEdit) -> Self {
        let Some(question) = self.draft.questions.get_mut(index) else {
            return self;
        };
        match edit {
            QuestionEdit::Title(title) => question.title = title,
            QuestionEdit::Prompt(prompt) => question.prompt = prompt,
            QuestionEdit::Points(points) => {
                question.points = if points.is_finite() { points.max(0.0) } else { 0.0 };
            }
            QuestionEdit::Type(question_type) => {
                if question.question_type != question_type {
                    question.retype(question_type);
                }
            }
            QuestionEdit::AddChoice(choice) => {
                let choice = choice.trim().to_string();
                if question.question_type == QuestionType::MultipleChoice
                    && !choice.is_empty()
                    && !question.choices.contains(&choice)
                {
                    question.choices.push(choice);
                }
            }
            QuestionEdit::RemoveChoice(position) => {
                if question.question_type == QuestionType::MultipleChoice
                    && position < question.choices.len()
                {
                    let removed = question.choices.remove(position);
                    question.correct_answers.retain(|answer| *answer != removed);
                }
            }
            QuestionEdit::ToggleCorrect(choice) => {
                if question.question_type == QuestionType::MultipleChoice
                    && question.choices.contains(&choice)
                {
                    if question.correct_answers.contains(&choice) {
                        question.correct_answers.retain(|answer| *answer != choice);
                    } else {
                        question.correct_answers.push(choice);
                    }
                }
            }
            QuestionEdit::BlankAnswers(answers) => {
                if question.question_type == QuestionType::FillInBlank {
                    question.correct_answers = answers
                        .into_iter()
                        .map(|answer| answer.trim().to_string())
                        .filter(|answer| !answer.is_empty())
                        .collect();
                }
            }
            QuestionEdit::Truth(value) => {
                if question.question_type == QuestionType::TrueFalse {
                    let label = if value { "True" } else { "False" };
                    question.correct_answers = vec![label.to_string()];
                }
            }
        }
        self.draft.points = self.draft.question_points();
        self
    }

    /// Drops unsaved edits.
    pub fn cancel(self) -> Self {
        Self { draft: self.saved.clone(), notice: None, ..self }
    }

    /// Takes the server's copy after a successful save.
    pub fn saved(self, quiz: Quiz) -> Self {
        Self {
            draft: quiz.clone(),
            saved: quiz,
            notice: Some(Notice::info("Quiz saved")),
            ..self
        }
    }

    pub fn failed(self, err: &ClientError) -> Self {
        Self { notice: Some(Notice::from_error(err)), ..self }
    }
}

/// What the countdown asks the screen to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Untimed,
    Running { seconds_left: i64 },
    /// Time is up; submit now.
    AutoSubmit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TakeQuizState {
    pub quiz: Quiz,
    pub attempt: Attempt,
    pub answers: BTreeMap<String, String>,
    pub current: usize,
    /// Local deadline anchored on the server's remaining seconds, so a
    /// skewed local clock still counts down the right amount.
    pub deadline: Option<OffsetDateTime>,
    pub notice: Option<Notice>,
}

impl TakeQuizState {
    pub fn begin(quiz: Quiz, attempt: Attempt, now: OffsetDateTime) -> Self {
        let answers = attempt
            .answers
            .iter()
            .filter_map(|answer| {
                answer.answer.first().map(|value| (answer.question_id.clone(), value.clone()))
            })
            .collect();
        let deadline = match attempt.seconds_remaining {
            Some(seconds) => Some(now + Duration::seconds(seconds)),
            None if attempt.completed => None,
            None => attempt.expires_at,
        };
        Self { quiz, attempt, answers, current: 0, deadline, notice: None }
    }

    pub fn is_submitted(&self) -> bool {
        self.attempt.completed
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.questions.get(self.current)
    }

    pub fn answer(mut self, question_id: &str, value: impl Into<String>) -> Self {
        if self.is_submitted() || self.is_locked(question_id) {
            return self;
        }
        let value = value.into();
        if value.is_empty() {
            self.answers.remove(question_id);
        } else {
            self.answers.insert(question_id.to_string(), value);
        }
        self
    }

    /// With "lock questions after answering", questions before the current
    /// one that already have an answer can no longer change.
    fn is_locked(&self, question_id: &str) -> bool {
        if !self.quiz.lock_questions_after_answering || !self.answers.contains_key(question_id) {
            return false;
        }
        self.quiz
            .questions
            .iter()
            .position(|question| question.id.as_deref() == Some(question_id))
            .is_some_and(|index| index < self.current)
    }

    pub fn go_to(mut self, index: usize) -> Self {
        let last = self.quiz.questions.len().saturating_sub(1);
        let target = index.min(last);
        if target < self.current && self.quiz.lock_questions_after_answering {
            return self;
        }
        self.current = target;
        self
    }

    pub fn next(self) -> Self {
        let index = self.current + 1;
        self.go_to(index)
    }

    pub fn previous(self) -> Self {
        let index = self.current.saturating_sub(1);
        self.go_to(index)
    }

    pub fn unanswered(&self) -> usize {
        self.quiz
            .questions
            .iter()
            .filter(|question| {
                question.id.as_deref().map_or(true, |id| !self.answers.contains_key(id))
            })
            .count()
    }

    pub fn countdown(&self, now: OffsetDateTime) -> Countdown {
        if self.is_submitted() {
            return Countdown::Untimed;
        }
        match self.deadline {
            None => Countdown::Untimed,
            Some(deadline) => {
                let left = (deadline - now).whole_seconds();
                if left <= 0 {
                    Countdown::AutoSubmit
                } else {
                    Countdown::Running { seconds_left: left }
                }
            }
        }
    }

    /// Answers in quiz order, ready for a draft save or submit.
    pub fn payload(&self) -> Vec<Answer> {
        self.quiz
            .questions
            .iter()
            .filter_map(|question| {
                let id = question.id.as_ref()?;
                self.answers
                    .get(id)
                    .map(|value| Answer { question_id: id.clone(), answer: vec![value.clone()] })
            })
            .collect()
    }

    /// Takes the server's copy of the attempt after a save or submit.
    pub fn synced(self, attempt: Attempt) -> Self {
        let notice = attempt.completed.then(|| Notice::info("Quiz submitted"));
        Self { attempt, notice, ..self }
    }

    pub fn failed(self, err: &ClientError) -> Self {
        Self { notice: Some(Notice::from_error(err)), ..self }
    }
}
