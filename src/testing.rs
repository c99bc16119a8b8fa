//! Test doubles shared by unit tests.

use crate::error::{JournalError, JournalResult};
use crate::host::{frontmatter_time, DocumentService, MetadataService};
use crate::providers::{HttpRequest, HttpResponse, Transport};
use crate::storage::note::{parse_frontmatter, rewrite, split_frontmatter};
use crate::types::FM_CREATED;
use chrono::{DateTime, Local, TimeZone};
use serde_yaml::Mapping;
use std::cell::RefCell;
use std::collections::VecDeque;

enum Scripted {
    Reply(HttpResponse),
    NetworkFailure,
}

/// Transport that answers from a queue and records every request.
pub(crate) struct ScriptedTransport {
    replies: RefCell<VecDeque<Scripted>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            replies: RefCell::new(VecDeque::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn reply(self, status: u16, body: &str) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();
        self.replies.borrow_mut().push_back(Scripted::Reply(HttpResponse {
            status,
            status_text,
            body: body.to_string(),
        }));
        self
    }

    pub(crate) fn fail_network(self) -> Self {
        self.replies.borrow_mut().push_back(Scripted::NetworkFailure);
        self
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub(crate) fn single_request(&self) -> HttpRequest {
        let requests = self.requests.borrow();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests[0].clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> JournalResult<HttpResponse> {
        self.requests.borrow_mut().push(request.clone());
        match self.replies.borrow_mut().pop_front() {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::NetworkFailure) | None => Err(JournalError::Network {
                provider: request.provider.to_string(),
                detail: "connection refused".to_string(),
            }),
        }
    }
}

/// Note held in memory, with a fixed creation time. Counts its writes and
/// rejects any beyond `write_limit`.
pub(crate) struct InMemoryNote {
    pub(crate) text: String,
    pub(crate) created_at: DateTime<Local>,
    pub(crate) writes: usize,
    write_limit: Option<usize>,
}

impl InMemoryNote {
    pub(crate) fn new(text: &str) -> Self {
        let created_at = Local
            .with_ymd_and_hms(2026, 9, 7, 9, 0, 0)
            .single()
            .expect("valid creation time");
        Self {
            text: text.to_string(),
            created_at,
            writes: 0,
            write_limit: None,
        }
    }

    pub(crate) fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }
}

impl DocumentService for InMemoryNote {
    fn text(&self) -> JournalResult<String> {
        Ok(self.text.clone())
    }

    fn set_text(&mut self, text: &str) -> JournalResult<()> {
        if self.write_limit.is_some_and(|limit| self.writes >= limit) {
            return Err(JournalError::Io(std::io::Error::other("write rejected")));
        }
        self.writes += 1;
        self.text = text.to_string();
        Ok(())
    }

    fn replace_selection(&mut self, text: &str) -> JournalResult<()> {
        let appended = format!("{}{text}", self.text);
        self.set_text(&appended)
    }

    fn created_at(&self) -> JournalResult<DateTime<Local>> {
        let stamped = self
            .frontmatter()
            .ok()
            .and_then(|frontmatter| frontmatter_time(&frontmatter, FM_CREATED));
        Ok(stamped.unwrap_or(self.created_at))
    }
}

impl MetadataService for InMemoryNote {
    fn frontmatter(&self) -> JournalResult<Mapping> {
        let (yaml, _) = split_frontmatter(&self.text);
        parse_frontmatter(yaml)
    }

    fn mutate_and_append<F>(&mut self, apply: F, tail: &str) -> JournalResult<()>
    where
        F: FnOnce(&mut Mapping),
    {
        let rendered = rewrite(&self.text, apply, tail)?;
        self.set_text(&rendered)
    }
}
