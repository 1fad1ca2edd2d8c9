//! Транспорт для тестов: записывает запросы и отдаёт заранее заданные ответы
//!
//! Доступен во всех сборках, чтобы им могли пользоваться интеграционные тесты.

use super::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавляет ответ в очередь; ответы отдаются в порядке добавления
    pub fn push_response(&self, status: u16, body: impl Into<String>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(HttpResponse::new(status, body));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl HttpTransport for MockTransport {
    fn execute(&self, request: &HttpRequest) -> AppResult<HttpResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| AppError::Protocol(format!("no scripted response for {}", request.url)))
    }
}
