//! Typed HTTP client for the quiz and course endpoints, plus the view state
//! the quiz screens are driven by.
//!
//! The client keeps the session cookie between calls. Dropping a pending
//! call's future cancels the request.

pub mod models;
pub mod state;

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use models::{Answer, Attempt, Course, NewQuiz, Question, Quiz, SignupForm, User};

const DEFAULT_API_PREFIX: &str = "/api";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error body.
    #[error("{kind} ({status}): {detail}")]
    Api { status: u16, kind: String, detail: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Machine-readable error kind, `network_error` when the server was not
    /// reached or answered with something unreadable.
    pub fn kind(&self) -> &str {
        match self {
            ClientError::Api { kind, .. } => kind,
            ClientError::Transport(_) => "network_error",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|status| status.as_u16()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone)]
pub struct KambazClient {
    http: Client,
    base_url: String,
}

impl KambazClient {
    /// `base_url` is the server origin, e.g. `http://localhost:4000`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_prefix(base_url, DEFAULT_API_PREFIX)
    }

    pub fn with_prefix(base_url: &str, api_prefix: &str) -> Result<Self, ClientError> {
        let http = Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        let prefix = api_prefix.trim_end_matches('/');
        Ok(Self { http, base_url: format!("{}{prefix}", base_url.trim_end_matches('/')) })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{path}", self.base_url))
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = Self::checked(request).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(request: RequestBuilder) -> Result<(), ClientError> {
        Self::checked(request).await?;
        Ok(())
    }

    async fn checked(request: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.json::<ErrorBody>().await.ok();
        let (kind, detail) = match body {
            Some(ErrorBody { kind: Some(kind), detail }) => {
                (kind, detail.unwrap_or_else(|| status.to_string()))
            }
            _ => (fallback_kind(status).to_string(), status.to_string()),
        };
        tracing::debug!(status = status.as_u16(), kind = %kind, "API call failed");
        Err(ClientError::Api { status: status.as_u16(), kind, detail })
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<User, ClientError> {
        Self::send(self.request(Method::POST, "/users/signup").json(form)).await
    }

    pub async fn signin(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let credentials = Credentials { username, password };
        Self::send(self.request(Method::POST, "/users/signin").json(&credentials)).await
    }

    pub async fn signout(&self) -> Result<(), ClientError> {
        Self::send_empty(self.request(Method::POST, "/users/signout")).await
    }

    pub async fn profile(&self) -> Result<User, ClientError> {
        Self::send(self.request(Method::GET, "/users/profile")).await
    }

    pub async fn courses(&self) -> Result<Vec<Course>, ClientError> {
        Self::send(self.request(Method::GET, "/courses")).await
    }

    pub async fn my_courses(&self) -> Result<Vec<Course>, ClientError> {
        Self::send(self.request(Method::GET, "/users/current/courses")).await
    }

    pub async fn enroll(&self, course_id: &str) -> Result<(), ClientError> {
        let path = format!("/users/current/courses/{course_id}");
        Self::send_empty(self.request(Method::POST, &path)).await
    }

    pub async fn unenroll(&self, course_id: &str) -> Result<(), ClientError> {
        let path = format!("/users/current/courses/{course_id}");
        Self::send_empty(self.request(Method::DELETE, &path)).await
    }

    pub async fn quizzes(&self, course_id: &str) -> Result<Vec<Quiz>, ClientError> {
        Self::send(self.request(Method::GET, &format!("/courses/{course_id}/quizzes"))).await
    }

    pub async fn quiz(&self, quiz_id: &str) -> Result<Quiz, ClientError> {
        Self::send(self.request(Method::GET, &format!("/quizzes/{quiz_id}"))).await
    }

    pub async fn create_quiz(&self, course_id: &str, quiz: &NewQuiz) -> Result<Quiz, ClientError> {
        let path = format!("/courses/{course_id}/quizzes");
        Self::send(self.request(Method::POST, &path).json(quiz)).await
    }

    /// Saves the whole quiz, questions included.
    pub async fn save_quiz(&self, quiz: &Quiz) -> Result<Quiz, ClientError> {
        let path = format!("/quizzes/{}", quiz.id);
        Self::send(self.request(Method::PUT, &path).json(quiz)).await
    }

    pub async fn set_published(&self, quiz_id: &str, published: bool) -> Result<Quiz, ClientError> {
        let path = format!("/quizzes/{quiz_id}");
        Self::send(self.request(Method::PUT, &path).json(&json!({ "published": published }))).await
    }

    pub async fn delete_quiz(&self, quiz_id: &str) -> Result<(), ClientError> {
        Self::send_empty(self.request(Method::DELETE, &format!("/quizzes/{quiz_id}"))).await
    }

    pub async fn add_question(&self, quiz_id: &str, question: &Question) -> Result<Quiz, ClientError> {
        let path = format!("/quizzes/{quiz_id}/questions");
        Self::send(self.request(Method::POST, &path).json(question)).await
    }

    pub async fn update_question(
        &self,
        quiz_id: &str,
        question_id: &str,
        question: &Question,
    ) -> Result<Quiz, ClientError> {
        let path = format!("/quizzes/{quiz_id}/questions/{question_id}");
        Self::send(self.request(Method::PUT, &path).json(question)).await
    }

    pub async fn delete_question(&self, quiz_id: &str, question_id: &str) -> Result<Quiz, ClientError> {
        let path = format!("/quizzes/{quiz_id}/questions/{question_id}");
        Self::send(self.request(Method::DELETE, &path)).await
    }

    /// Starts an attempt, or resumes the one already in progress.
    pub async fn start_attempt(
        &self,
        quiz_id: &str,
        access_code: Option<&str>,
    ) -> Result<Attempt, ClientError> {
        let path = format!("/quizzes/{quiz_id}/attempts");
        let body = json!({ "accessCode": access_code });
        Self::send(self.request(Method::POST, &path).json(&body)).await
    }

    pub async fn attempts(&self, quiz_id: &str) -> Result<Vec<Attempt>, ClientError> {
        Self::send(self.request(Method::GET, &format!("/quizzes/{quiz_id}/attempts"))).await
    }

    pub async fn latest_attempt(&self, quiz_id: &str) -> Result<Option<Attempt>, ClientError> {
        Self::send(self.request(Method::GET, &format!("/quizzes/{quiz_id}/attempts/latest"))).await
    }

    pub async fn save_draft(
        &self,
        quiz_id: &str,
        attempt_id: &str,
        answers: &[Answer],
    ) -> Result<Attempt, ClientError> {
        let path = format!("/quizzes/{quiz_id}/attempts/{attempt_id}");
        Self::send(self.request(Method::PUT, &path).json(&json!({ "answers": answers }))).await
    }

    /// Submits the attempt. Without `answers` the last saved draft is graded.
    pub async fn submit_attempt(
        &self,
        quiz_id: &str,
        attempt_id: &str,
        answers: Option<&[Answer]>,
    ) -> Result<Attempt, ClientError> {
        let path = format!("/quizzes/{quiz_id}/attempts/{attempt_id}/submit");
        Self::send(self.request(Method::POST, &path).json(&json!({ "answers": answers }))).await
    }
}

fn fallback_kind(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "validation_error",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::CONFLICT => "conflict",
        StatusCode::TOO_MANY_REQUESTS => "too_many_requests",
        StatusCode::SERVICE_UNAVAILABLE => "service_unavailable",
        _ => "internal_error",
    }
}

#[cfg(test)]
mod tests;
