use crate::error::PlannerError;
use crate::models::{Event, EventDraft, Task, TaskDraft};

pub const ROUTE_GET_EVENTS: &str = "/event/getEvents";
pub const ROUTE_CREATE_EVENT: &str = "/event/createEvent";
pub const ROUTE_UPDATE_EVENT: &str = "/event/updateEvent";
pub const ROUTE_DELETE_EVENT: &str = "/event/deleteEvent";
pub const ROUTE_GET_TASKS: &str = "/task/getTasks";
pub const ROUTE_CREATE_TASK: &str = "/task/createTask";
pub const ROUTE_UPDATE_TASK: &str = "/task/updateTask";
pub const ROUTE_DELETE_TASK: &str = "/task/deleteTask";

/// Backend-authoritative CRUD for events and tasks.
///
/// Identifiers are assigned by the backend. Callers re-fetch after every
/// successful mutation; nothing here retries.
#[allow(async_fn_in_trait)]
pub trait PlannerBackend {
    async fn fetch_events(&self) -> Result<Vec<Event>, PlannerError>;
    async fn create_event(&self, draft: &EventDraft) -> Result<(), PlannerError>;
    async fn update_event(&self, id: &str, draft: &EventDraft) -> Result<(), PlannerError>;
    async fn delete_event(&self, id: &str) -> Result<(), PlannerError>;

    async fn fetch_tasks(&self) -> Result<Vec<Task>, PlannerError>;
    async fn create_task(&self, draft: &TaskDraft) -> Result<(), PlannerError>;
    async fn update_task(&self, id: &str, draft: &TaskDraft) -> Result<(), PlannerError>;
    async fn delete_task(&self, id: &str) -> Result<(), PlannerError>;
}

pub fn endpoint(base_url: &str, route: &str) -> String {
    format!("{}{route}", base_url.trim_end_matches('/'))
}

pub fn entity_endpoint(base_url: &str, route: &str, id: &str) -> String {
    format!("{}/{id}", endpoint(base_url, route))
}

#[cfg(feature = "runtime")]
pub use http::HttpBackend;

#[cfg(feature = "runtime")]
mod http {
    use std::time::Duration;

    use reqwest::{Client, RequestBuilder};

    use super::*;
    use crate::models::{EventsEnvelope, Settings, TasksEnvelope};

    pub struct HttpBackend {
        client: Client,
        base_url: String,
    }

    impl HttpBackend {
        pub fn new(settings: &Settings) -> Result<Self, PlannerError> {
            let client = Client::builder()
                .timeout(Duration::from_secs(settings.request_timeout_secs))
                .build()
                .map_err(|err| {
                    PlannerError::upstream("build_client", format!("failed to build http client: {err}"))
                })?;
            Ok(Self {
                client,
                base_url: settings.api_base_url.clone(),
            })
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }

        async fn send(
            &self,
            operation: &'static str,
            request: RequestBuilder,
        ) -> Result<String, PlannerError> {
            let resp = request
                .send()
                .await
                .map_err(|err| PlannerError::upstream(operation, format!("request failed: {err}")))?;
            let status = resp.status();
            let text = resp.text().await.map_err(|err| {
                PlannerError::upstream(operation, format!("failed to read response: {err}"))
            })?;
            if !status.is_success() {
                log::warn!("backend: {operation} http {status}");
                return Err(PlannerError::upstream(operation, format!("http {status}: {text}")));
            }
            log::debug!("backend: {operation} ok bytes={}", text.len());
            Ok(text)
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(
        operation: &'static str,
        text: &str,
    ) -> Result<T, PlannerError> {
        serde_json::from_str(text)
            .map_err(|err| PlannerError::upstream(operation, format!("invalid json: {err}")))
    }

    impl PlannerBackend for HttpBackend {
        async fn fetch_events(&self) -> Result<Vec<Event>, PlannerError> {
            let url = endpoint(&self.base_url, ROUTE_GET_EVENTS);
            let text = self.send("fetch_events", self.client.get(url)).await?;
            let envelope: EventsEnvelope = decode("fetch_events", &text)?;
            Ok(envelope.events)
        }

        async fn create_event(&self, draft: &EventDraft) -> Result<(), PlannerError> {
            let url = endpoint(&self.base_url, ROUTE_CREATE_EVENT);
            self.send("create_event", self.client.post(url).json(draft))
                .await
                .map(|_| ())
        }

        async fn update_event(&self, id: &str, draft: &EventDraft) -> Result<(), PlannerError> {
            let url = entity_endpoint(&self.base_url, ROUTE_UPDATE_EVENT, id);
            self.send("update_event", self.client.put(url).json(draft))
                .await
                .map(|_| ())
        }

        async fn delete_event(&self, id: &str) -> Result<(), PlannerError> {
            let url = entity_endpoint(&self.base_url, ROUTE_DELETE_EVENT, id);
            self.send("delete_event", self.client.delete(url))
                .await
                .map(|_| ())
        }

        async fn fetch_tasks(&self) -> Result<Vec<Task>, PlannerError> {
            let url = endpoint(&self.base_url, ROUTE_GET_TASKS);
            let text = self.send("fetch_tasks", self.client.get(url)).await?;
            let envelope: TasksEnvelope = decode("fetch_tasks", &text)?;
            Ok(envelope.tasks)
        }

        async fn create_task(&self, draft: &TaskDraft) -> Result<(), PlannerError> {
            let url = endpoint(&self.base_url, ROUTE_CREATE_TASK);
            self.send("create_task", self.client.post(url).json(draft))
                .await
                .map(|_| ())
        }

        async fn update_task(&self, id: &str, draft: &TaskDraft) -> Result<(), PlannerError> {
            let url = entity_endpoint(&self.base_url, ROUTE_UPDATE_TASK, id);
            self.send("update_task", self.client.put(url).json(draft))
                .await
                .map(|_| ())
        }

        async fn delete_task(&self, id: &str) -> Result<(), PlannerError> {
            let url = entity_endpoint(&self.base_url, ROUTE_DELETE_TASK, id);
            self.send("delete_task", self.client.delete(url))
                .await
                .map(|_| ())
        }
    }

}
